use leptos::prelude::*;

use super::force_graph::{GraphSettings, edge_color, node_border, node_fill};
use crate::graph::{EdgeKind, NodeKind};

/// Bounds of the charge slider.
pub const CHARGE_RANGE: (f64, f64) = (-1000.0, -50.0);
/// Bounds of the link distance slider.
pub const DISTANCE_RANGE: (f64, f64) = (30.0, 300.0);

/// Read a slider value, clamped to its range. `None` if it is not a number.
pub fn slider_value(raw: &str, (min, max): (f64, f64)) -> Option<f64> {
	raw.trim()
		.parse::<f64>()
		.ok()
		.filter(|v| v.is_finite())
		.map(|v| v.clamp(min, max))
}

fn kind_title(kind: NodeKind) -> &'static str {
	match kind {
		NodeKind::File => "Files",
		NodeKind::Concept => "Concepts",
		NodeKind::Task => "Tasks",
	}
}

fn edge_title(kind: EdgeKind) -> &'static str {
	match kind {
		EdgeKind::Implements => "Implements",
		EdgeKind::Produces => "Produces",
		EdgeKind::Requires => "Requires",
		EdgeKind::RelatesTo => "Relates to",
		EdgeKind::Modifies => "Modifies",
	}
}

/// Type toggles plus charge and distance sliders bound to `settings`.
#[component]
pub fn GraphControls(settings: RwSignal<GraphSettings>) -> impl IntoView {
	let toggles = NodeKind::ALL
		.into_iter()
		.map(|kind| {
			view! {
				<label>
					<input
						type="checkbox"
						prop:checked=move || settings.get().visibility.shows(kind)
						on:change=move |ev| {
							let shown = event_target_checked(&ev);
							settings.update(|s| s.visibility.set(kind, shown));
						}
					/>
					{kind_title(kind)}
				</label>
			}
		})
		.collect_view();

	view! {
		<div class="graph-controls">
			{toggles}
			<span class="graph-controls-sep">"|"</span>
			<label>
				"Charge"
				<input
					type="range"
					min="-1000"
					max="-50"
					prop:value=move || settings.get().charge.to_string()
					on:input=move |ev| {
						if let Some(v) = slider_value(&event_target_value(&ev), CHARGE_RANGE) {
							settings.update(|s| s.charge = v);
						}
					}
				/>
			</label>
			<label>
				"Distance"
				<input
					type="range"
					min="30"
					max="300"
					prop:value=move || settings.get().link_distance.to_string()
					on:input=move |ev| {
						if let Some(v) = slider_value(&event_target_value(&ev), DISTANCE_RANGE) {
							settings.update(|s| s.link_distance = v);
						}
					}
				/>
			</label>
		</div>
	}
}

/// Key to node colours and edge colours.
#[component]
pub fn GraphLegend() -> impl IntoView {
	let nodes = NodeKind::ALL
		.into_iter()
		.map(|kind| {
			let swatch = format!(
				"background: {}; border: 1px solid {};",
				node_fill(kind),
				node_border(kind)
			);
			view! {
				<li>
					<span class="legend-swatch" style=swatch></span>
					{kind_title(kind)}
				</li>
			}
		})
		.collect_view();
	let edges = EdgeKind::ALL
		.into_iter()
		.map(|kind| {
			let line = format!("border-top: 2px solid {};", edge_color(kind));
			view! {
				<li>
					<span class="legend-line" style=line></span>
					{edge_title(kind)}
				</li>
			}
		})
		.collect_view();

	view! {
		<div class="graph-legend">
			<h4>"Nodes"</h4>
			<ul>{nodes}</ul>
			<h4>"Edges"</h4>
			<ul>{edges}</ul>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sliders_clamp_to_their_ranges() {
		assert_eq!(slider_value("-300", CHARGE_RANGE), Some(-300.0));
		assert_eq!(slider_value("-5000", CHARGE_RANGE), Some(-1000.0));
		assert_eq!(slider_value("0", CHARGE_RANGE), Some(-50.0));
		assert_eq!(slider_value(" 120 ", DISTANCE_RANGE), Some(120.0));
		assert_eq!(slider_value("10", DISTANCE_RANGE), Some(30.0));
		assert_eq!(slider_value("abc", DISTANCE_RANGE), None);
		assert_eq!(slider_value("NaN", DISTANCE_RANGE), None);
	}

	#[test]
	fn default_settings_sit_inside_slider_ranges() {
		let s = GraphSettings::default();
		assert!((CHARGE_RANGE.0..=CHARGE_RANGE.1).contains(&s.charge));
		assert!((DISTANCE_RANGE.0..=DISTANCE_RANGE.1).contains(&s.link_distance));
	}
}
