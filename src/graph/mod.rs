//! Shared graph document, its wire messages and the agent contract.

pub mod contract;
mod document;
mod message;

pub use document::{DocumentError, Edge, EdgeKind, GraphDocument, Node, NodeKind, NodeStatus};
pub use message::ServerMessage;
