//! Interactive force-directed view of a [`GraphDocument`](crate::graph::GraphDocument).
//!
//! The layers are split so everything but the canvas wiring runs natively:
//! [`GraphModel`] merges documents into simulation nodes, [`LayoutEngine`]
//! moves them, [`ForceGraphState`] owns the view and pointer handling, and
//! the component drives the animation loop.

mod component;
mod layout;
mod model;
mod render;
mod state;
mod types;

pub use component::ForceGraphCanvas;
pub use render::{edge_color, node_border, node_fill};
pub use types::{GraphEvent, GraphSettings, TypeVisibility};
