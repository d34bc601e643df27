use serde::{Deserialize, Serialize};

use crate::graph::{Node, NodeKind};

/// Per-type show/hide toggles. Affect painting and hit-testing only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeVisibility {
	/// Show file nodes.
	pub files: bool,
	/// Show concept nodes.
	pub concepts: bool,
	/// Show task nodes.
	pub tasks: bool,
}

impl Default for TypeVisibility {
	fn default() -> Self {
		Self {
			files: true,
			concepts: true,
			tasks: true,
		}
	}
}

impl TypeVisibility {
	/// Whether nodes of `kind` are shown.
	pub fn shows(&self, kind: NodeKind) -> bool {
		match kind {
			NodeKind::File => self.files,
			NodeKind::Concept => self.concepts,
			NodeKind::Task => self.tasks,
		}
	}

	/// Show or hide nodes of `kind`.
	pub fn set(&mut self, kind: NodeKind, shown: bool) {
		match kind {
			NodeKind::File => self.files = shown,
			NodeKind::Concept => self.concepts = shown,
			NodeKind::Task => self.tasks = shown,
		}
	}
}

/// Runtime inputs to the layout and painter, changeable at any time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
	/// Target separation of linked nodes.
	pub link_distance: f64,
	/// Many-body strength; negative repels.
	pub charge: f64,
	/// Which node kinds are painted and hit-tested.
	pub visibility: TypeVisibility,
}

impl Default for GraphSettings {
	fn default() -> Self {
		Self {
			link_distance: 100.0,
			charge: -300.0,
			visibility: TypeVisibility::default(),
		}
	}
}

impl GraphSettings {
	/// Whether switching from `self` to `other` changes the physics.
	pub fn forces_differ(&self, other: &GraphSettings) -> bool {
		self.link_distance != other.link_distance || self.charge != other.charge
	}
}

/// Something the user did that the host may want to react to.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
	/// The pointer moved onto a node, or off all nodes. Coordinates are
	/// canvas-relative screen pixels.
	Hover {
		/// The node under the pointer, if any.
		node: Option<Node>,
		/// Pointer x.
		x: f64,
		/// Pointer y.
		y: f64,
	},
	/// The selection changed.
	Select(Option<Node>),
}
