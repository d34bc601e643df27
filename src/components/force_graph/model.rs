//! The client's working copy of the document, augmented with physics state.
//!
//! Each authoritative snapshot is merged against the previous working copy
//! so nodes that survive keep their position and velocity, and the layout
//! does not jump when the agent appends to the graph.

use std::collections::HashMap;

use rand::Rng;

use crate::graph::{EdgeKind, GraphDocument, Node, NodeKind};

/// Spread of the square, centered on the viewport, where new nodes appear.
pub const SEED_SPREAD: f64 = 200.0;
/// Extra radius per connection.
pub const CONNECTION_FACTOR: f64 = 1.5;
/// Upper bound on the connection-derived extra radius.
pub const CONNECTION_CAP: f64 = 10.0;

/// Radius of a node with no connections.
pub fn base_radius(kind: NodeKind) -> f64 {
	match kind {
		NodeKind::File => 8.0,
		NodeKind::Concept => 14.0,
		NodeKind::Task => 10.0,
	}
}

/// Visual radius of a node with `connections` incident edges.
pub fn node_radius(kind: NodeKind, connections: usize) -> f64 {
	base_radius(kind) + (connections as f64 * CONNECTION_FACTOR).min(CONNECTION_CAP)
}

/// A node in the working copy.
#[derive(Clone, Debug, PartialEq)]
pub struct SimNode {
	pub node: Node,
	pub x: f64,
	pub y: f64,
	pub vx: f64,
	pub vy: f64,
	/// Pinned position, set while the node is dragged.
	pub fx: Option<f64>,
	pub fy: Option<f64>,
	connections: usize,
}

impl SimNode {
	fn seeded(node: Node, center: (f64, f64), rng: &mut impl Rng) -> Self {
		let half = SEED_SPREAD / 2.0;
		Self {
			node,
			x: center.0 + rng.gen_range(-half..half),
			y: center.1 + rng.gen_range(-half..half),
			vx: 0.0,
			vy: 0.0,
			fx: None,
			fy: None,
			connections: 0,
		}
	}

	pub fn id(&self) -> &str {
		&self.node.id
	}

	pub fn kind(&self) -> NodeKind {
		self.node.kind
	}

	/// Number of edges touching this node.
	pub fn connections(&self) -> usize {
		self.connections
	}

	/// Derived visual radius.
	pub fn radius(&self) -> f64 {
		node_radius(self.kind(), self.connections())
	}

	pub fn is_pinned(&self) -> bool {
		self.fx.is_some() || self.fy.is_some()
	}

	pub fn pin(&mut self, x: f64, y: f64) {
		self.fx = Some(x);
		self.fy = Some(y);
	}

	pub fn unpin(&mut self) {
		self.fx = None;
		self.fy = None;
	}
}

/// An edge resolved to node positions in the working copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimEdge {
	pub source: usize,
	pub target: usize,
	pub kind: EdgeKind,
}

/// How an incoming document related to the previous working copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeKind {
	/// No surviving ids: every node was freshly seeded.
	Reset,
	/// Surviving nodes kept their physics state.
	Incremental,
}

/// Outcome of [`GraphModel::replace`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeOutcome {
	pub kind: MergeKind,
	/// Whether the node or edge set differs from before.
	pub topology_changed: bool,
}

#[derive(Clone, Debug, Default)]
pub struct GraphModel {
	nodes: Vec<SimNode>,
	edges: Vec<SimEdge>,
	index: HashMap<String, usize>,
}

impl GraphModel {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn nodes(&self) -> &[SimNode] {
		&self.nodes
	}

	pub fn nodes_mut(&mut self) -> &mut [SimNode] {
		&mut self.nodes
	}

	pub fn edges(&self) -> &[SimEdge] {
		&self.edges
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn index_of(&self, id: &str) -> Option<usize> {
		self.index.get(id).copied()
	}

	pub fn get(&self, id: &str) -> Option<&SimNode> {
		self.index_of(id).map(|i| &self.nodes[i])
	}

	pub fn get_mut(&mut self, id: &str) -> Option<&mut SimNode> {
		self.index_of(id).map(|i| &mut self.nodes[i])
	}

	/// Rebuild the working copy from `document`.
	///
	/// If the previous copy was non-empty and shares no id with `document`,
	/// everything is reseeded around `center`. Otherwise surviving nodes keep
	/// position, velocity and any pin; new nodes are seeded around `center`
	/// at rest. Edges are rebuilt from `document`, dropping those whose
	/// endpoints are missing.
	pub fn replace(
		&mut self,
		document: &GraphDocument,
		center: (f64, f64),
		rng: &mut impl Rng,
	) -> MergeOutcome {
		let survives = document.nodes.iter().any(|n| self.index.contains_key(&n.id));
		let kind = if !self.nodes.is_empty() && !survives {
			MergeKind::Reset
		} else {
			MergeKind::Incremental
		};

		let previous = std::mem::take(&mut self.nodes);
		let previous_index = std::mem::take(&mut self.index);
		let previous_edges = std::mem::take(&mut self.edges);

		for node in &document.nodes {
			if self.index.contains_key(&node.id) {
				continue;
			}
			let carried = match kind {
				MergeKind::Incremental => previous_index.get(&node.id).map(|&i| &previous[i]),
				MergeKind::Reset => None,
			};
			let sim = match carried {
				Some(old) => SimNode {
					node: node.clone(),
					connections: 0,
					..old.clone()
				},
				None => SimNode::seeded(node.clone(), center, rng),
			};
			self.index.insert(node.id.clone(), self.nodes.len());
			self.nodes.push(sim);
		}

		for edge in &document.edges {
			let (Some(&source), Some(&target)) =
				(self.index.get(&edge.source), self.index.get(&edge.target))
			else {
				continue;
			};
			self.nodes[source].connections += 1;
			if target != source {
				self.nodes[target].connections += 1;
			}
			self.edges.push(SimEdge {
				source,
				target,
				kind: edge.kind,
			});
		}

		let same_nodes = previous.len() == self.nodes.len()
			&& previous.iter().zip(&self.nodes).all(|(a, b)| a.id() == b.id());
		let topology_changed = kind == MergeKind::Reset
			|| !same_nodes
			|| previous_edges != self.edges;

		MergeOutcome {
			kind,
			topology_changed,
		}
	}
}
