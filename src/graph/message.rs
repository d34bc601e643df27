//! Messages pushed from the server to connected viewers.

use serde::{Deserialize, Serialize};

use super::document::GraphDocument;

/// One message on the viewer transport.
///
/// Every change carries the full current document, never a delta.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
	/// The authoritative document changed.
	GraphUpdate {
		/// The complete document after the change.
		graph: GraphDocument,
	},
}

impl ServerMessage {
	/// Wrap a document in a `graph_update` message.
	pub fn graph_update(graph: GraphDocument) -> Self {
		ServerMessage::GraphUpdate { graph }
	}

	/// The document carried by the message.
	pub fn graph(&self) -> &GraphDocument {
		match self {
			ServerMessage::GraphUpdate { graph } => graph,
		}
	}

	/// Encode for the wire.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}

	/// Decode a text frame. Frames of other message types yield `None`.
	pub fn from_json(raw: &str) -> Option<Self> {
		let mut msg = serde_json::from_str::<Self>(raw).ok()?;
		let ServerMessage::GraphUpdate { graph } = &mut msg;
		*graph = std::mem::take(graph).validated();
		Some(msg)
	}
}
