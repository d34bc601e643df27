//! Reusable UI pieces.

pub mod controls;
pub mod force_graph;
