#![cfg(not(target_arch = "wasm32"))]

use std::collections::BTreeSet;
use std::sync::Arc;

use knowledge_graph_canvas::graph::{Edge, EdgeKind, GraphDocument, Node, NodeKind};
use knowledge_graph_canvas::store::{Broadcaster, GraphStore, MemoryStorage};
use proptest::prelude::*;

struct Silent;

impl Broadcaster for Silent {
	fn broadcast(&self, _document: &GraphDocument) {}
}

fn kind(i: usize) -> NodeKind {
	NodeKind::ALL[i % NodeKind::ALL.len()]
}

fn edge_kind(i: usize) -> EdgeKind {
	EdgeKind::ALL[i % EdgeKind::ALL.len()]
}

fn build(ids: &BTreeSet<usize>, edges: &[(usize, usize, usize)]) -> GraphDocument {
	GraphDocument {
		nodes: ids
			.iter()
			.map(|i| Node::new(format!("n{i}"), kind(*i), format!("node {i}")))
			.collect(),
		edges: edges
			.iter()
			.map(|(s, t, k)| Edge::new(format!("n{s}"), format!("n{t}"), edge_kind(*k)))
			.collect(),
	}
}

proptest! {
	#[test]
	fn append_of_existing_id_changes_nothing(
		ids in proptest::collection::btree_set(0..12usize, 1..8),
		edges in proptest::collection::vec((0..12usize, 0..12usize, 0..5usize), 0..16),
		pick in 0..8usize,
	) {
		let doc = build(&ids, &edges).validated();
		let raw = serde_json::to_string(&doc).unwrap();
		let mut store = GraphStore::initialize(MemoryStorage::with_contents(raw.clone()), Arc::new(Silent)).unwrap();
		let before = store.snapshot().clone();

		let existing = doc.nodes[pick % doc.nodes.len()].id.clone();
		let appended = store.append(Node::new(existing, NodeKind::Task, "again")).unwrap();

		prop_assert!(!appended);
		prop_assert_eq!(store.snapshot(), &before);
		prop_assert_eq!(store.storage().contents(), Some(raw));
	}

	#[test]
	fn validation_drops_exactly_the_dangling_edges(
		ids in proptest::collection::btree_set(0..12usize, 0..8),
		edges in proptest::collection::vec((0..12usize, 0..12usize, 0..5usize), 0..16),
	) {
		let doc = build(&ids, &edges);
		let kept: Vec<Edge> = doc
			.edges
			.iter()
			.filter(|e| doc.contains_node(&e.source) && doc.contains_node(&e.target))
			.cloned()
			.collect();

		let validated = doc.clone().validated();
		prop_assert_eq!(&validated.nodes, &doc.nodes);
		prop_assert_eq!(&validated.edges, &kept);

		let reparsed = GraphDocument::parse(&serde_json::to_string(&doc).unwrap()).unwrap();
		prop_assert_eq!(reparsed, validated);
	}
}

#[test]
fn empty_document_survives_validation() {
	assert_eq!(GraphDocument::empty().validated(), GraphDocument::empty());
}
