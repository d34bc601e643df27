use leptos::prelude::*;

use crate::components::controls::{GraphControls, GraphLegend};
use crate::components::force_graph::{ForceGraphCanvas, GraphEvent, GraphSettings};
use crate::graph::Node;
use crate::transport::{ConnectionStatus, use_graph_feed};

/// Second tooltip line: kind, then status when present.
fn tooltip_kind(node: &Node) -> String {
	match node.status {
		Some(status) => format!("{} - {}", node.kind.as_str(), status.as_str()),
		None => node.kind.as_str().to_string(),
	}
}

/// One-line summary of the selected node's attributes.
fn detail_line(node: &Node) -> String {
	let status = node.status.map_or("n/a", |s| s.as_str());
	let mut line = format!("Type: {} | Status: {}", node.kind.as_str(), status);
	if let Some(path) = &node.path {
		line.push_str(" | Path: ");
		line.push_str(path);
	}
	line
}

fn status_text(status: ConnectionStatus) -> &'static str {
	match status {
		ConnectionStatus::Connecting => "Connecting...",
		ConnectionStatus::Open => "Live",
		ConnectionStatus::Closed => "Disconnected, retrying",
	}
}

/// Live knowledge graph of the current session.
#[component]
pub fn Home() -> impl IntoView {
	let feed = use_graph_feed();
	let settings = RwSignal::new(GraphSettings::default());
	let (tooltip, set_tooltip) = signal(None::<(Node, f64, f64)>);
	let (selected, set_selected) = signal(None::<Node>);

	let on_event = Callback::new(move |event: GraphEvent| match event {
		GraphEvent::Hover { node, x, y } => set_tooltip.set(node.map(|n| (n, x, y))),
		GraphEvent::Select(node) => set_selected.set(node),
	});
	let has_nodes = move || feed.graph.with(|g| !g.nodes.is_empty());

	view! {
		<div class="fullscreen-graph">
			<ForceGraphCanvas data=feed.graph settings=settings on_event=on_event fullscreen=true />

			<div class="graph-overlay">
				<h1>"Knowledge Graph"</h1>
				<p class="subtitle">{move || status_text(feed.status.get())}</p>
				<GraphControls settings=settings />
			</div>

			<Show
				when=has_nodes
				fallback=|| {
					view! {
						<div class="graph-empty">
							<h3>"Knowledge Graph"</h3>
							<p>"Send tasks to the agent to build the graph"</p>
						</div>
					}
				}
			>
				<GraphLegend />
			</Show>

			{move || {
				tooltip
					.get()
					.map(|(node, x, y)| {
						let position = format!("left: {}px; top: {}px;", x + 12.0, y - 10.0);
						view! {
							<div class="graph-tooltip visible" style=position>
								<div class="graph-tooltip-label">{node.display_label().to_string()}</div>
								<div class="graph-tooltip-type">{tooltip_kind(&node)}</div>
								{node.path.clone().map(|p| view! { <div class="graph-tooltip-summary">{p}</div> })}
								{node.summary.clone().map(|s| view! { <div class="graph-tooltip-summary">{s}</div> })}
							</div>
						}
					})
			}}

			{move || {
				selected
					.get()
					.map(|node| {
						view! {
							<div class="graph-detail">
								<div class="graph-detail-label">{node.display_label().to_string()}</div>
								<div class="graph-detail-meta">{detail_line(&node)}</div>
								{node.summary.clone().map(|s| view! { <div class="graph-detail-summary">{s}</div> })}
							</div>
						}
					})
			}}
		</div>
	}
}
