use knowledge_graph_canvas::{GraphEvent, GraphSettings, Node, NodeKind, TypeVisibility};

#[test]
fn settings_toggle_kinds_independently() {
	let mut settings = GraphSettings::default();
	assert_eq!(settings.visibility, TypeVisibility::default());
	assert!(NodeKind::ALL.iter().all(|k| settings.visibility.shows(*k)));

	settings.visibility.set(NodeKind::Concept, false);
	assert!(!settings.visibility.shows(NodeKind::Concept));
	assert!(settings.visibility.shows(NodeKind::File));
	assert!(!settings.forces_differ(&GraphSettings::default()));
}

#[test]
fn settings_load_with_defaults() {
	let settings: GraphSettings = serde_json::from_str(r#"{"charge": -500, "visibility": {"tasks": false}}"#).unwrap();
	assert_eq!(settings.charge, -500.0);
	assert_eq!(settings.link_distance, 100.0);
	assert!(settings.visibility.files && !settings.visibility.tasks);
}

#[test]
fn hover_event_carries_node_and_position() {
	let node = Node::new("file_1", NodeKind::File, "auth.js");
	let event = GraphEvent::Hover {
		node: Some(node.clone()),
		x: 12.0,
		y: 34.0,
	};
	let GraphEvent::Hover { node: Some(hovered), x, y } = event else {
		panic!("expected a hover event");
	};
	assert_eq!((hovered, x, y), (node, 12.0, 34.0));
}
