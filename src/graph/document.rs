//! The shared knowledge-graph document and its load-time validation.
//!
//! The document is written by two parties that do not coordinate: the server
//! and an external agent process. Loading is therefore lenient. A document
//! with the wrong shape becomes an empty graph, an individual entry that does
//! not decode is dropped, later duplicates of a node id are rejected, and
//! edges whose endpoints are missing are pruned.

use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors produced while decoding a raw document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
	/// The input is not JSON at all.
	#[error("document is not valid JSON: {0}")]
	InvalidJson(#[from] serde_json::Error),

	/// The input is JSON but `nodes`/`edges` are not both arrays.
	#[error("document must be an object with `nodes` and `edges` arrays")]
	WrongShape,
}

/// What a node stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
	/// A file the agent created or modified.
	File,
	/// A feature, system or idea involved in the work.
	Concept,
	/// A unit of work the user requested.
	Task,
}

impl NodeKind {
	/// All kinds, in legend order.
	pub const ALL: [NodeKind; 3] = [NodeKind::File, NodeKind::Concept, NodeKind::Task];

	/// Wire name of the kind.
	pub fn as_str(self) -> &'static str {
		match self {
			NodeKind::File => "file",
			NodeKind::Concept => "concept",
			NodeKind::Task => "task",
		}
	}
}

/// Relationship carried by an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
	/// A file implements a concept.
	Implements,
	/// A task produced a file.
	Produces,
	/// One thing depends on another.
	Requires,
	/// Loose conceptual relationship.
	RelatesTo,
	/// A task modified an existing file.
	Modifies,
}

impl EdgeKind {
	/// All kinds, in legend order.
	pub const ALL: [EdgeKind; 5] = [
		EdgeKind::Implements,
		EdgeKind::Produces,
		EdgeKind::Requires,
		EdgeKind::RelatesTo,
		EdgeKind::Modifies,
	];
}

/// Lifecycle marker on a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
	/// Dispatched but not yet reported back by the agent.
	Pending,
	/// Finished unit of work.
	Completed,
	/// File created by the agent.
	Created,
	/// File modified by the agent.
	Modified,
}

impl NodeStatus {
	/// Wire name of the status.
	pub fn as_str(self) -> &'static str {
		match self {
			NodeStatus::Pending => "pending",
			NodeStatus::Completed => "completed",
			NodeStatus::Created => "created",
			NodeStatus::Modified => "modified",
		}
	}
}

/// A node as persisted in the shared document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
	/// Unique id within the document.
	pub id: String,
	/// Node kind, serialized as `type`.
	#[serde(rename = "type")]
	pub kind: NodeKind,
	/// Display string.
	#[serde(default)]
	pub label: String,
	/// Relative path, files only.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	/// Free text description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub summary: Option<String>,
	/// Optional lifecycle marker.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<NodeStatus>,
}

impl Node {
	/// Create a node with only the required fields set.
	pub fn new(id: impl Into<String>, kind: NodeKind, label: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			kind,
			label: label.into(),
			path: None,
			summary: None,
			status: None,
		}
	}

	/// Builder-style setter for `path`.
	pub fn with_path(mut self, path: impl Into<String>) -> Self {
		self.path = Some(path.into());
		self
	}

	/// Builder-style setter for `summary`.
	pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
		self.summary = Some(summary.into());
		self
	}

	/// Builder-style setter for `status`.
	pub fn with_status(mut self, status: NodeStatus) -> Self {
		self.status = Some(status);
		self
	}

	/// Label to show, falling back to the id when the label is empty.
	pub fn display_label(&self) -> &str {
		if self.label.is_empty() { &self.id } else { &self.label }
	}

	/// Whether the node should carry the completed check-mark.
	pub fn is_completed(&self) -> bool {
		self.status == Some(NodeStatus::Completed)
	}
}

/// A directed, typed edge between two node ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
	/// Id of the source node.
	pub source: String,
	/// Id of the target node.
	pub target: String,
	/// Edge kind, serialized as `type`.
	#[serde(rename = "type")]
	pub kind: EdgeKind,
}

impl Edge {
	/// Create an edge.
	pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			kind,
		}
	}

	/// Whether the edge touches the node with `id`.
	pub fn touches(&self, id: &str) -> bool {
		self.source == id || self.target == id
	}
}

/// The full node/edge graph of a session.
///
/// Order is insertion order. Multiple edges between the same pair are kept.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
	/// Nodes in insertion order.
	pub nodes: Vec<Node>,
	/// Edges in insertion order.
	pub edges: Vec<Edge>,
}

impl GraphDocument {
	/// An empty document.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Whether the document has no nodes and no edges.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.edges.is_empty()
	}

	/// Whether a node with `id` is present.
	pub fn contains_node(&self, id: &str) -> bool {
		self.nodes.iter().any(|n| n.id == id)
	}

	/// Look up a node by id.
	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Decode a raw document, dropping entries that violate the invariants.
	pub fn parse(raw: &str) -> Result<Self, DocumentError> {
		let value: Value = serde_json::from_str(raw)?;
		Self::from_value(value)
	}

	/// Decode a raw document, recovering any failure to an empty graph.
	pub fn load(raw: &str) -> Self {
		match Self::parse(raw) {
			Ok(doc) => doc,
			Err(err) => {
				warn!("invalid graph document, using empty graph: {err}");
				Self::empty()
			}
		}
	}

	/// Decode an already parsed JSON value.
	pub fn from_value(value: Value) -> Result<Self, DocumentError> {
		let Value::Object(mut map) = value else {
			return Err(DocumentError::WrongShape);
		};
		let (Some(Value::Array(raw_nodes)), Some(Value::Array(raw_edges))) =
			(map.remove("nodes"), map.remove("edges"))
		else {
			return Err(DocumentError::WrongShape);
		};

		let mut nodes = Vec::with_capacity(raw_nodes.len());
		for raw in raw_nodes {
			match serde_json::from_value::<Node>(raw) {
				Ok(node) => nodes.push(node),
				Err(err) => warn!("dropping malformed node entry: {err}"),
			}
		}

		let mut edges = Vec::with_capacity(raw_edges.len());
		for raw in raw_edges {
			match serde_json::from_value::<Edge>(raw) {
				Ok(edge) => edges.push(edge),
				Err(err) => warn!("dropping malformed edge entry: {err}"),
			}
		}

		Ok(Self { nodes, edges }.validated())
	}

	/// Enforce unique node ids and drop edges with missing endpoints.
	pub fn validated(mut self) -> Self {
		let mut seen = HashSet::with_capacity(self.nodes.len());
		self.nodes.retain(|n| {
			let fresh = seen.insert(n.id.clone());
			if !fresh {
				warn!("dropping duplicate node id {:?}", n.id);
			}
			fresh
		});
		self.edges
			.retain(|e| seen.contains(&e.source) && seen.contains(&e.target));
		self
	}

	/// Number of edges touching each node, keyed by node order.
	pub fn connection_counts(&self) -> Vec<usize> {
		self.nodes
			.iter()
			.map(|n| self.edges.iter().filter(|e| e.touches(&n.id)).count())
			.collect()
	}

	/// Compact serialized form, used to detect content changes.
	pub fn fingerprint(&self) -> String {
		serde_json::to_string(self).unwrap_or_default()
	}

	/// Pretty serialized form, as written to disk.
	pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string_pretty(self)
	}
}
