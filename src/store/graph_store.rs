//! The authoritative graph document for the active session.

use std::sync::Arc;

use log::{debug, error, info};

use super::broadcast::Broadcaster;
use super::error::StoreError;
use super::storage::DocumentStorage;
use crate::graph::{GraphDocument, Node};

/// Holds the single authoritative document and mediates every read and write.
///
/// Mutations take `&mut self`; callers that share a store across tasks must
/// serialize access, as [`GraphService`](super::GraphService) does.
pub struct GraphStore<S> {
	storage: S,
	document: GraphDocument,
	fingerprint: String,
	broadcaster: Arc<dyn Broadcaster>,
}

impl<S: DocumentStorage> GraphStore<S> {
	/// Load the stored document, creating an empty one if none exists.
	///
	/// A malformed or unreadable document is recovered to an empty graph.
	pub fn initialize(storage: S, broadcaster: Arc<dyn Broadcaster>) -> Result<Self, StoreError> {
		let document = match storage.read() {
			Ok(Some(raw)) => GraphDocument::load(&raw),
			Ok(None) => {
				let empty = GraphDocument::empty();
				storage.write(&empty.to_json_pretty()?)?;
				empty
			}
			Err(err) => {
				error!("failed to read graph document, starting empty: {err}");
				GraphDocument::empty()
			}
		};
		Ok(Self {
			storage,
			fingerprint: document.fingerprint(),
			document,
			broadcaster,
		})
	}

	/// The current document. No I/O.
	pub fn snapshot(&self) -> &GraphDocument {
		&self.document
	}

	/// The backing storage.
	pub fn storage(&self) -> &S {
		&self.storage
	}

	/// Replace the document with an empty graph and persist it.
	///
	/// Does not notify; a session start announces itself to each viewer.
	pub fn reset(&mut self) -> Result<(), StoreError> {
		self.persist(GraphDocument::empty())?;
		info!("graph reset");
		Ok(())
	}

	/// Add `node` unless a node with the same id exists.
	///
	/// Returns whether the node was added. On success the document is
	/// persisted and a notification fires.
	pub fn append(&mut self, node: Node) -> Result<bool, StoreError> {
		if self.document.contains_node(&node.id) {
			debug!("node {:?} already present, append ignored", node.id);
			return Ok(false);
		}
		let mut next = self.document.clone();
		next.nodes.push(node);
		self.persist(next)?;
		self.announce();
		Ok(true)
	}

	/// Accept a document written by someone else.
	///
	/// Returns whether it differed from the current one. A changed document
	/// replaces the current one and a notification fires.
	pub fn on_external_change(&mut self, raw: &str) -> bool {
		let incoming = GraphDocument::load(raw);
		let fingerprint = incoming.fingerprint();
		if fingerprint == self.fingerprint {
			debug!("graph document rewritten without changes");
			return false;
		}
		self.document = incoming;
		self.fingerprint = fingerprint;
		self.announce();
		true
	}

	/// Re-read the storage and feed it through [`Self::on_external_change`].
	///
	/// Read failures and a missing document count as "no change this cycle".
	pub fn refresh(&mut self) -> bool {
		match self.storage.read() {
			Ok(Some(raw)) => self.on_external_change(&raw),
			Ok(None) => {
				debug!("graph document missing, waiting for the next write");
				false
			}
			Err(err) => {
				error!("failed to read graph document: {err}");
				false
			}
		}
	}

	fn persist(&mut self, next: GraphDocument) -> Result<(), StoreError> {
		self.storage.write(&next.to_json_pretty()?)?;
		self.fingerprint = next.fingerprint();
		self.document = next;
		Ok(())
	}

	fn announce(&self) {
		info!(
			"graph updated: {} nodes, {} edges",
			self.document.nodes.len(),
			self.document.edges.len()
		);
		self.broadcaster.broadcast(&self.document);
	}
}

#[cfg(test)]
mod tests {
	use std::io;

	use parking_lot::Mutex;

	use super::*;
	use crate::graph::{Edge, EdgeKind, NodeKind};
	use crate::store::MemoryStorage;

	#[derive(Default)]
	struct Recorder(Mutex<Vec<GraphDocument>>);

	impl Broadcaster for Recorder {
		fn broadcast(&self, document: &GraphDocument) {
			self.0.lock().push(document.clone());
		}
	}

	impl Recorder {
		fn count(&self) -> usize {
			self.0.lock().len()
		}

		fn last(&self) -> Option<GraphDocument> {
			self.0.lock().last().cloned()
		}
	}

	struct Unreadable;

	impl DocumentStorage for Unreadable {
		fn read(&self) -> io::Result<Option<String>> {
			Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
		}

		fn write(&self, _contents: &str) -> io::Result<()> {
			Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
		}
	}

	fn store_over(storage: MemoryStorage) -> (GraphStore<MemoryStorage>, Arc<Recorder>) {
		let recorder = Arc::new(Recorder::default());
		let store = GraphStore::initialize(storage, recorder.clone()).unwrap();
		(store, recorder)
	}

	const WITH_FILE: &str = r#"{
		"nodes": [
			{"id": "task_1", "type": "task", "label": "Add login"},
			{"id": "file_1", "type": "file", "label": "auth.js"}
		],
		"edges": [{"source": "task_1", "target": "file_1", "type": "produces"}]
	}"#;

	#[test]
	fn initialize_creates_missing_document() {
		let storage = MemoryStorage::new();
		let (store, _) = store_over(storage.clone());
		assert!(store.snapshot().is_empty());
		let written = storage.contents().unwrap();
		assert_eq!(GraphDocument::parse(&written).unwrap(), GraphDocument::empty());
	}

	#[test]
	fn initialize_recovers_malformed_document() {
		let (store, _) = store_over(MemoryStorage::with_contents(r#"{"nodes": "oops"}"#));
		assert!(store.snapshot().is_empty());
	}

	#[test]
	fn initialize_loads_existing_document() {
		let (store, recorder) = store_over(MemoryStorage::with_contents(WITH_FILE));
		assert_eq!(store.snapshot().nodes.len(), 2);
		assert_eq!(store.snapshot().edges.len(), 1);
		assert_eq!(recorder.count(), 0);
	}

	#[test]
	fn initialize_survives_unreadable_storage() {
		let store = GraphStore::initialize(Unreadable, Arc::new(Recorder::default())).unwrap();
		assert!(store.snapshot().is_empty());
	}

	#[test]
	fn session_start_then_append() {
		let storage = MemoryStorage::with_contents(WITH_FILE);
		let (mut store, recorder) = store_over(storage.clone());

		store.reset().unwrap();
		assert_eq!(store.snapshot(), &GraphDocument::empty());
		assert_eq!(recorder.count(), 0);

		let added = store
			.append(Node::new("task_1", NodeKind::Task, "Add login"))
			.unwrap();
		assert!(added);
		assert_eq!(store.snapshot().nodes.len(), 1);
		assert_eq!(recorder.count(), 1);
		assert!(recorder.last().unwrap().contains_node("task_1"));

		let persisted = GraphDocument::parse(&storage.contents().unwrap()).unwrap();
		assert_eq!(&persisted, store.snapshot());
	}

	#[test]
	fn duplicate_append_is_a_silent_no_op() {
		let (mut store, recorder) = store_over(MemoryStorage::with_contents(WITH_FILE));
		let before = store.snapshot().clone();
		let added = store
			.append(Node::new("file_1", NodeKind::Concept, "something else"))
			.unwrap();
		assert!(!added);
		assert_eq!(store.snapshot(), &before);
		assert_eq!(recorder.count(), 0);
	}

	#[test]
	fn failed_write_leaves_document_untouched() {
		let mut store = GraphStore {
			storage: Unreadable,
			document: GraphDocument::empty(),
			fingerprint: GraphDocument::empty().fingerprint(),
			broadcaster: Arc::new(Recorder::default()),
		};
		let err = store.append(Node::new("t", NodeKind::Task, "t")).unwrap_err();
		assert!(matches!(err, StoreError::Io(_)));
		assert!(store.snapshot().is_empty());
	}

	#[test]
	fn external_change_replaces_and_notifies_once() {
		let (mut store, recorder) = store_over(MemoryStorage::new());
		store
			.append(Node::new("task_1", NodeKind::Task, "Add login"))
			.unwrap();

		assert!(store.on_external_change(WITH_FILE));
		assert_eq!(store.snapshot().nodes.len(), 2);
		assert_eq!(
			store.snapshot().edges,
			vec![Edge::new("task_1", "file_1", EdgeKind::Produces)]
		);
		assert_eq!(recorder.count(), 2);

		// Same content, different formatting.
		let compact = serde_json::to_string(store.snapshot()).unwrap();
		assert!(!store.on_external_change(&compact));
		assert_eq!(recorder.count(), 2);
	}

	#[test]
	fn own_write_read_back_is_suppressed() {
		let storage = MemoryStorage::new();
		let (mut store, recorder) = store_over(storage);
		store.append(Node::new("t", NodeKind::Task, "t")).unwrap();
		assert!(!store.refresh());
		assert_eq!(recorder.count(), 1);
	}

	#[test]
	fn malformed_external_write_recovers_to_empty() {
		let (mut store, recorder) = store_over(MemoryStorage::with_contents(WITH_FILE));
		assert!(store.on_external_change("{\"nodes\": [ {\"id\": "));
		assert!(store.snapshot().is_empty());
		assert_eq!(recorder.count(), 1);
	}

	#[test]
	fn refresh_treats_read_failure_as_no_change() {
		let mut store = GraphStore {
			storage: Unreadable,
			document: GraphDocument::empty(),
			fingerprint: GraphDocument::empty().fingerprint(),
			broadcaster: Arc::new(Recorder::default()),
		};
		assert!(!store.refresh());
	}
}
