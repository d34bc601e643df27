use crate::graph::{GraphDocument, Node};

use super::layout::{LayoutConfig, LayoutEngine};
use super::model::{GraphModel, MergeKind, MergeOutcome, SimEdge, SimNode};
use super::types::{GraphEvent, GraphSettings};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 5.0;
/// Slack around a node's radius that still counts as a hit, in model units.
pub const HIT_TOLERANCE: f64 = 4.0;
/// Screen distance a press must travel before it counts as a drag.
pub const DRAG_THRESHOLD: f64 = 3.0;

/// Pan/zoom transform: `screen = model * k + (x, y)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

impl ViewTransform {
	pub fn invert(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	pub fn apply(&self, gx: f64, gy: f64) -> (f64, f64) {
		(gx * self.k + self.x, gy * self.k + self.y)
	}

	/// Scale by `factor` keeping the model point under `(sx, sy)` fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let (gx, gy) = self.invert(sx, sy);
		self.k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let (ax, ay) = self.apply(gx, gy);
		self.x += sx - ax;
		self.y += sy - ay;
	}
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_id: Option<String>,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// One view's layout, paint and interaction state.
///
/// Everything the canvas needs lives here; the component only forwards
/// browser events and paints after [`tick`](Self::tick).
pub struct ForceGraphState {
	pub model: GraphModel,
	pub layout: LayoutEngine,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub settings: GraphSettings,
	pub width: f64,
	pub height: f64,
	hovered: Option<String>,
	selected: Option<String>,
	dirty: bool,
	disposed: bool,
}

impl ForceGraphState {
	pub fn new(width: f64, height: f64, settings: GraphSettings, seed: u64) -> Self {
		let config = LayoutConfig {
			link_distance: settings.link_distance,
			charge: settings.charge,
			..LayoutConfig::default()
		};
		Self {
			model: GraphModel::new(),
			layout: LayoutEngine::new(config, (width / 2.0, height / 2.0), seed),
			transform: ViewTransform::default(),
			drag: DragState::default(),
			pan: PanState::default(),
			settings,
			width,
			height,
			hovered: None,
			selected: None,
			dirty: true,
			disposed: false,
		}
	}

	/// Merge a new authoritative document into the working copy.
	pub fn set_data(&mut self, document: &GraphDocument) -> MergeOutcome {
		let was_empty = self.model.is_empty();
		let center = self.layout.center();
		let outcome = self.model.replace(document, center, self.layout.rng());

		if outcome.kind == MergeKind::Reset || (was_empty && !self.model.is_empty()) {
			self.layout.restart();
		} else if outcome.topology_changed {
			let alpha = self.layout.config().reheat_alpha;
			self.layout.reheat(alpha);
		}

		let model = &self.model;
		let gone = |id: &Option<String>| id.as_deref().is_some_and(|id| model.get(id).is_none());
		if gone(&self.hovered) {
			self.hovered = None;
		}
		if gone(&self.selected) {
			self.selected = None;
		}
		if gone(&self.drag.node_id) {
			self.drag = DragState::default();
			self.layout.set_alpha_target(0.0);
		}
		self.dirty = true;
		outcome
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.layout.set_center((width / 2.0, height / 2.0));
		self.dirty = true;
	}

	/// Apply new runtime settings. Visibility changes never touch the physics.
	pub fn update_settings(&mut self, settings: GraphSettings) -> Option<GraphEvent> {
		if self.settings.forces_differ(&settings) {
			self.layout.set_forces(settings.link_distance, settings.charge);
		}
		self.settings = settings;
		self.dirty = true;

		let hidden = self
			.hovered
			.as_deref()
			.and_then(|id| self.model.get(id))
			.is_some_and(|n| !self.is_visible(n));
		if hidden {
			self.hovered = None;
			return Some(GraphEvent::Hover {
				node: None,
				x: 0.0,
				y: 0.0,
			});
		}
		None
	}

	/// Advance the simulation one step. Returns whether positions changed.
	pub fn tick(&mut self) -> bool {
		if self.disposed || !self.layout.is_running() {
			return false;
		}
		self.layout.tick(&mut self.model)
	}

	/// Whether something other than a tick asked for a repaint since last call.
	pub fn take_dirty(&mut self) -> bool {
		std::mem::take(&mut self.dirty)
	}

	/// Stop the simulation for good.
	pub fn dispose(&mut self) {
		self.disposed = true;
		self.layout.stop();
		self.drag = DragState::default();
		self.pan = PanState::default();
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed
	}

	pub fn is_visible(&self, node: &SimNode) -> bool {
		self.settings.visibility.shows(node.kind())
	}

	/// Nodes that are painted and hit-tested, in draw order.
	pub fn visible_nodes(&self) -> impl Iterator<Item = &SimNode> {
		self.model.nodes().iter().filter(|n| self.is_visible(n))
	}

	/// Edges whose two endpoints are both visible.
	pub fn visible_edges(&self) -> impl Iterator<Item = (&SimEdge, &SimNode, &SimNode)> {
		let nodes = self.model.nodes();
		self.model.edges().iter().filter_map(move |e| {
			let (s, t) = (&nodes[e.source], &nodes[e.target]);
			(self.is_visible(s) && self.is_visible(t)).then_some((e, s, t))
		})
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		self.transform.invert(sx, sy)
	}

	/// Index of the topmost visible node under a screen position.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<usize> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		self.model
			.nodes()
			.iter()
			.enumerate()
			.rev()
			.filter(|(_, n)| self.is_visible(n))
			.find(|(_, n)| {
				let (dx, dy) = (n.x - gx, n.y - gy);
				let reach = n.radius() + HIT_TOLERANCE;
				dx * dx + dy * dy < reach * reach
			})
			.map(|(i, _)| i)
	}

	pub fn is_hovered(&self, id: &str) -> bool {
		self.hovered.as_deref() == Some(id)
	}

	pub fn is_selected(&self, id: &str) -> bool {
		self.selected.as_deref() == Some(id)
	}

	pub fn hovered_node(&self) -> Option<&Node> {
		self.hovered.as_deref().and_then(|id| self.model.get(id)).map(|n| &n.node)
	}

	pub fn selected_node(&self) -> Option<&Node> {
		self.selected.as_deref().and_then(|id| self.model.get(id)).map(|n| &n.node)
	}

	/// Whether an edge touches the selected node.
	pub fn is_edge_highlighted(&self, edge: &SimEdge) -> bool {
		let Some(selected) = self.selected.as_deref().and_then(|id| self.model.index_of(id)) else {
			return false;
		};
		edge.source == selected || edge.target == selected
	}

	/// Press: pin and start dragging a node, or start panning the background.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		if self.disposed {
			return;
		}
		if let Some(idx) = self.node_at_position(sx, sy) {
			let node = &mut self.model.nodes_mut()[idx];
			let (x, y) = (node.x, node.y);
			node.pin(x, y);
			self.drag = DragState {
				active: true,
				node_id: Some(node.id().to_string()),
				moved: false,
				start_x: sx,
				start_y: sy,
				node_start_x: x,
				node_start_y: y,
			};
			let target = self.layout.config().drag_alpha_target;
			self.layout.set_alpha_target(target);
		} else {
			self.pan = PanState {
				active: true,
				moved: false,
				start_x: sx,
				start_y: sy,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			};
		}
		self.dirty = true;
	}

	/// Move: drag the pinned node, pan, or update hover.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) -> Option<GraphEvent> {
		if self.disposed {
			return None;
		}
		if self.drag.active {
			let (dx, dy) = (sx - self.drag.start_x, sy - self.drag.start_y);
			if dx.hypot(dy) > DRAG_THRESHOLD {
				self.drag.moved = true;
			}
			let k = self.transform.k;
			let (nx, ny) = (self.drag.node_start_x + dx / k, self.drag.node_start_y + dy / k);
			if let Some(node) = self.drag.node_id.as_deref().and_then(|id| self.model.get_mut(id)) {
				node.pin(nx, ny);
			}
			self.dirty = true;
			return None;
		}
		if self.pan.active {
			let (dx, dy) = (sx - self.pan.start_x, sy - self.pan.start_y);
			if dx.hypot(dy) > DRAG_THRESHOLD {
				self.pan.moved = true;
			}
			self.transform.x = self.pan.transform_start_x + dx;
			self.transform.y = self.pan.transform_start_y + dy;
			self.dirty = true;
			return None;
		}

		let hit = self
			.node_at_position(sx, sy)
			.map(|i| self.model.nodes()[i].id().to_string());
		if hit == self.hovered {
			return None;
		}
		self.hovered = hit;
		self.dirty = true;
		Some(GraphEvent::Hover {
			node: self.hovered_node().cloned(),
			x: sx,
			y: sy,
		})
	}

	/// Release: unpin a dragged node, or treat a press without motion as a click.
	pub fn pointer_up(&mut self, _sx: f64, _sy: f64) -> Option<GraphEvent> {
		if self.drag.active {
			let drag = std::mem::take(&mut self.drag);
			let id = drag.node_id?;
			if let Some(node) = self.model.get_mut(&id) {
				node.unpin();
			}
			self.layout.set_alpha_target(0.0);
			self.dirty = true;
			return (!drag.moved).then(|| self.toggle_selection(id));
		}
		if self.pan.active {
			let pan = std::mem::take(&mut self.pan);
			if !pan.moved && self.selected.is_some() {
				self.selected = None;
				self.dirty = true;
				return Some(GraphEvent::Select(None));
			}
		}
		None
	}

	/// The pointer left the canvas: end any gesture and clear hover.
	pub fn pointer_leave(&mut self) -> Option<GraphEvent> {
		if let Some(id) = std::mem::take(&mut self.drag).node_id {
			if let Some(node) = self.model.get_mut(&id) {
				node.unpin();
			}
			self.layout.set_alpha_target(0.0);
		}
		self.pan = PanState::default();
		self.dirty = true;
		self.hovered.take().map(|_| GraphEvent::Hover {
			node: None,
			x: 0.0,
			y: 0.0,
		})
	}

	/// Zoom toward the pointer; positive `delta_y` zooms out.
	pub fn wheel(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		self.transform.zoom_at(sx, sy, factor);
		self.dirty = true;
	}

	fn toggle_selection(&mut self, id: String) -> GraphEvent {
		self.selected = if self.selected.as_deref() == Some(id.as_str()) {
			None
		} else {
			Some(id)
		};
		GraphEvent::Select(self.selected_node().cloned())
	}
}
