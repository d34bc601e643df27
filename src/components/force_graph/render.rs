use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use crate::graph::{EdgeKind, NodeKind};

use super::model::SimNode;
use super::state::ForceGraphState;

const BACKGROUND: &str = "#0d1117";
const LABEL_COLOR: &str = "#c9d1d9";
const LABEL_ACTIVE_COLOR: &str = "#ffffff";
const CHECK_COLOR: &str = "#0d1117";

/// Characters of a label shown before it is cut with an ellipsis.
pub const LABEL_MAX_CHARS: usize = 20;
const ARROW_SIZE: f64 = 5.0;
const ARROW_GAP: f64 = 4.0;
const LABEL_GAP: f64 = 4.0;

pub fn node_fill(kind: NodeKind) -> &'static str {
	match kind {
		NodeKind::File => "#58a6ff",
		NodeKind::Concept => "#d2a8ff",
		NodeKind::Task => "#3fb950",
	}
}

pub fn node_border(kind: NodeKind) -> &'static str {
	match kind {
		NodeKind::File => "#388bfd",
		NodeKind::Concept => "#bc8cff",
		NodeKind::Task => "#2ea043",
	}
}

pub fn edge_color(kind: EdgeKind) -> &'static str {
	match kind {
		EdgeKind::Implements => "#79c0ff",
		EdgeKind::Produces => "#7ee787",
		EdgeKind::Requires => "#d29922",
		EdgeKind::RelatesTo => "#484f58",
		EdgeKind::Modifies => "#e3b341",
	}
}

/// Cut `label` to [`LABEL_MAX_CHARS`] characters, marking the cut with `...`.
pub fn truncate_label(label: &str) -> String {
	match label.char_indices().nth(LABEL_MAX_CHARS) {
		Some((cut, _)) => format!("{}...", &label[..cut]),
		None => label.to_string(),
	}
}

/// Label size in model units: shrinks as the view zooms in, never below 9.
pub fn label_font_size(k: f64) -> f64 {
	(11.0 / k).max(9.0)
}

/// Triangle of an arrowhead pointing at the target, pulled back so it sits
/// outside the target's glyph. `None` for coincident endpoints.
pub fn arrowhead(
	(x1, y1): (f64, f64),
	(x2, y2): (f64, f64),
	target_radius: f64,
) -> Option<[(f64, f64); 3]> {
	let (dx, dy) = (x2 - x1, y2 - y1);
	if dx.hypot(dy) < 0.001 {
		return None;
	}
	let angle = dy.atan2(dx);
	let tip = (
		x2 - angle.cos() * (target_radius + ARROW_GAP),
		y2 - angle.sin() * (target_radius + ARROW_GAP),
	);
	let wing = |offset: f64| {
		(
			tip.0 - ARROW_SIZE * (angle + offset).cos(),
			tip.1 - ARROW_SIZE * (angle + offset).sin(),
		)
	};
	Some([tip, wing(-PI / 6.0), wing(PI / 6.0)])
}

pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn draw_edges(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	for (edge, source, target) in state.visible_edges() {
		let color = edge_color(edge.kind);
		let style = if state.is_edge_highlighted(edge) {
			ctx.set_line_width(2.0);
			color.to_string()
		} else {
			ctx.set_line_width(0.8);
			format!("{color}66")
		};
		ctx.set_stroke_style_str(&style);
		ctx.begin_path();
		ctx.move_to(source.x, source.y);
		ctx.line_to(target.x, target.y);
		ctx.stroke();

		let Some([tip, left, right]) =
			arrowhead((source.x, source.y), (target.x, target.y), target.radius())
		else {
			continue;
		};
		ctx.set_fill_style_str(&style);
		ctx.begin_path();
		ctx.move_to(tip.0, tip.1);
		ctx.line_to(left.0, left.1);
		ctx.line_to(right.0, right.1);
		ctx.close_path();
		ctx.fill();
	}
}

fn trace_shape(node: &SimNode, r: f64, ctx: &CanvasRenderingContext2d) {
	let (x, y) = (node.x, node.y);
	ctx.begin_path();
	match node.kind() {
		NodeKind::Concept => {
			for i in 0..6 {
				let angle = PI / 3.0 * i as f64 - PI / 6.0;
				let (px, py) = (x + r * angle.cos(), y + r * angle.sin());
				if i == 0 {
					ctx.move_to(px, py);
				} else {
					ctx.line_to(px, py);
				}
			}
			ctx.close_path();
		}
		NodeKind::Task => {
			let (s, corner) = (r * 0.8, 3.0);
			ctx.move_to(x - s + corner, y - s);
			let _ = ctx.arc_to(x + s, y - s, x + s, y + s, corner);
			let _ = ctx.arc_to(x + s, y + s, x - s, y + s, corner);
			let _ = ctx.arc_to(x - s, y + s, x - s, y - s, corner);
			let _ = ctx.arc_to(x - s, y - s, x + s, y - s, corner);
			ctx.close_path();
		}
		NodeKind::File => {
			let _ = ctx.arc(x, y, r, 0.0, 2.0 * PI);
		}
	}
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let font_size = label_font_size(state.transform.k);
	ctx.set_text_align("center");
	ctx.set_text_baseline("top");

	for node in state.visible_nodes() {
		let (x, y, r) = (node.x, node.y, node.radius());
		let kind = node.kind();
		let hovered = state.is_hovered(node.id()) || node.is_pinned();
		let selected = state.is_selected(node.id());

		trace_shape(node, r, ctx);
		if selected {
			ctx.set_fill_style_str(node_fill(kind));
		} else {
			ctx.set_fill_style_str(&format!("{}cc", node_fill(kind)));
		}
		ctx.fill();
		ctx.set_stroke_style_str(if hovered || selected {
			LABEL_ACTIVE_COLOR
		} else {
			node_border(kind)
		});
		ctx.set_line_width(if selected {
			2.5
		} else if hovered {
			2.0
		} else {
			1.0
		});
		ctx.stroke();

		if node.node.is_completed() {
			ctx.set_stroke_style_str(CHECK_COLOR);
			ctx.set_line_width(2.0);
			ctx.begin_path();
			ctx.move_to(x - 3.0, y);
			ctx.line_to(x - 1.0, y + 3.0);
			ctx.line_to(x + 4.0, y - 3.0);
			ctx.stroke();
		}

		let weight = if selected { "bold " } else { "" };
		ctx.set_font(&format!("{weight}{font_size}px -apple-system, sans-serif"));
		ctx.set_fill_style_str(if hovered || selected {
			LABEL_ACTIVE_COLOR
		} else {
			LABEL_COLOR
		});
		let _ = ctx.fill_text(&truncate_label(node.node.display_label()), x, y + r + LABEL_GAP);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn labels_are_cut_at_twenty_chars() {
		assert_eq!(truncate_label("short"), "short");
		assert_eq!(truncate_label(&"x".repeat(20)), "x".repeat(20));
		assert_eq!(
			truncate_label("implement the authentication flow"),
			"implement the authen..."
		);
		assert_eq!(truncate_label(&"ü".repeat(25)), format!("{}...", "ü".repeat(20)));
	}

	#[test]
	fn label_size_has_a_floor() {
		assert_eq!(label_font_size(1.0), 11.0);
		assert_eq!(label_font_size(0.5), 22.0);
		assert_eq!(label_font_size(4.0), 9.0);
	}

	#[test]
	fn arrowhead_sits_outside_target() {
		let [tip, left, right] = arrowhead((0.0, 0.0), (100.0, 0.0), 10.0).unwrap();
		assert!((tip.0 - 86.0).abs() < 1e-9 && tip.1.abs() < 1e-9);
		assert!(left.0 < tip.0 && right.0 < tip.0);
		assert!((left.1 + right.1).abs() < 1e-9);
		assert!(arrowhead((5.0, 5.0), (5.0, 5.0), 10.0).is_none());
	}

	#[test]
	fn colors_are_distinct_per_kind() {
		let nodes: std::collections::HashSet<_> = NodeKind::ALL.iter().map(|k| node_fill(*k)).collect();
		let edges: std::collections::HashSet<_> = EdgeKind::ALL.iter().map(|k| edge_color(*k)).collect();
		assert_eq!(nodes.len(), 3);
		assert_eq!(edges.len(), 5);
	}
}
