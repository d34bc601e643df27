#![cfg(not(target_arch = "wasm32"))]

use std::time::Duration;

use knowledge_graph_canvas::graph::{Edge, EdgeKind, GraphDocument, Node, NodeKind};
use knowledge_graph_canvas::store::{GraphService, MemoryStorage, PushSource, StoreConfig, StoreError};
use tokio::time::{Instant, sleep, timeout};

fn task_1() -> Node {
	Node::new("task_1", NodeKind::Task, "Add login")
}

fn agent_output() -> GraphDocument {
	GraphDocument {
		nodes: vec![task_1(), Node::new("file_1", NodeKind::File, "auth.js")],
		edges: vec![Edge::new("task_1", "file_1", EdgeKind::Produces)],
	}
}

fn memory_config() -> StoreConfig {
	StoreConfig {
		stability_window_ms: 200,
		..StoreConfig::default()
	}
}

#[tokio::test(start_paused = true)]
async fn session_start_appends_one_task() {
	let storage = MemoryStorage::new();
	let (source, _trigger) = PushSource::new();
	let handle = GraphService::spawn(storage.clone(), source, &memory_config()).unwrap();

	let mut viewer = handle.connect_viewer().await.unwrap();
	let first = viewer.recv().await.unwrap();
	assert!(first.graph().is_empty());

	assert!(handle.append(task_1()).await.unwrap());
	let snapshot = handle.snapshot();
	assert_eq!(snapshot.nodes, vec![task_1()]);

	let update = viewer.recv().await.unwrap();
	assert_eq!(update.graph(), &snapshot);
	assert!(viewer.try_recv().is_none());

	let stored = GraphDocument::parse(&storage.contents().unwrap()).unwrap();
	assert_eq!(stored, snapshot);
}

#[tokio::test(start_paused = true)]
async fn external_writes_are_read_once_after_settling() {
	let storage = MemoryStorage::new();
	let (source, trigger) = PushSource::new();
	let handle = GraphService::spawn(storage.clone(), source, &memory_config()).unwrap();

	let mut viewer = handle.connect_viewer().await.unwrap();
	viewer.recv().await.unwrap();
	handle.append(task_1()).await.unwrap();
	viewer.recv().await.unwrap();

	let expected = agent_output();
	let start = Instant::now();
	storage.set(r#"{"nodes":[{"id":"task_1","type":"task","label":"Add login"}],"edges":[]}"#);
	assert!(trigger.fire());
	sleep(Duration::from_millis(50)).await;
	storage.set(r#"{"nodes":[{"id":"task_1","type":"task","label":"Add login"},"#);
	assert!(trigger.fire());
	sleep(Duration::from_millis(50)).await;
	storage.set(serde_json::to_string(&expected).unwrap());
	assert!(trigger.fire());

	sleep(Duration::from_millis(150)).await;
	assert!(viewer.try_recv().is_none(), "read before the writes settled");

	let update = timeout(Duration::from_secs(1), viewer.recv())
		.await
		.unwrap()
		.unwrap();
	assert!(start.elapsed() >= Duration::from_millis(300));
	assert_eq!(update.graph(), &expected);
	assert_eq!(handle.snapshot(), expected);

	sleep(Duration::from_secs(1)).await;
	assert!(viewer.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn append_inside_settle_window_keeps_external_write() {
	let storage = MemoryStorage::new();
	let (source, trigger) = PushSource::new();
	let handle = GraphService::spawn(storage.clone(), source, &memory_config()).unwrap();
	let mut viewer = handle.connect_viewer().await.unwrap();
	viewer.recv().await.unwrap();

	let external = agent_output();
	storage.set(serde_json::to_string(&external).unwrap());
	assert!(trigger.fire());
	sleep(Duration::from_millis(50)).await;

	let task_2 = Node::new("task_2", NodeKind::Task, "Add logout");
	assert!(handle.append(task_2.clone()).await.unwrap());
	assert!(trigger.fire());

	let mut expected = external.clone();
	expected.nodes.push(task_2);
	assert_eq!(handle.snapshot(), expected);
	let stored = GraphDocument::parse(&storage.contents().unwrap()).unwrap();
	assert_eq!(stored, expected);

	assert_eq!(viewer.recv().await.unwrap().graph(), &external);
	assert_eq!(viewer.recv().await.unwrap().graph(), &expected);
	sleep(Duration::from_secs(1)).await;
	assert!(viewer.try_recv().is_none());
	assert_eq!(handle.snapshot(), expected);
}

#[tokio::test(start_paused = true)]
async fn connecting_a_viewer_resets_the_session() {
	let storage = MemoryStorage::with_contents(serde_json::to_string(&agent_output()).unwrap());
	let (source, _trigger) = PushSource::new();
	let handle = GraphService::spawn(storage.clone(), source, &memory_config()).unwrap();
	assert_eq!(handle.snapshot().nodes.len(), 2);

	let mut viewer = handle.connect_viewer().await.unwrap();
	assert!(viewer.recv().await.unwrap().graph().is_empty());
	assert!(handle.snapshot().is_empty());
	assert!(GraphDocument::parse(&storage.contents().unwrap()).unwrap().is_empty());
	assert_eq!(handle.viewer_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn duplicate_append_is_silent() {
	let (source, _trigger) = PushSource::new();
	let handle = GraphService::spawn(MemoryStorage::new(), source, &memory_config()).unwrap();
	let mut viewer = handle.connect_viewer().await.unwrap();
	viewer.recv().await.unwrap();

	assert!(handle.append(task_1()).await.unwrap());
	assert!(!handle.append(Node::new("task_1", NodeKind::Task, "Other")).await.unwrap());
	assert_eq!(handle.snapshot().nodes, vec![task_1()]);

	viewer.recv().await.unwrap();
	assert!(viewer.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn a_silent_viewer_does_not_hold_back_others() {
	let config = StoreConfig {
		viewer_capacity: 2,
		..memory_config()
	};
	let (source, _trigger) = PushSource::new();
	let handle = GraphService::spawn(MemoryStorage::new(), source, &config).unwrap();
	let mut silent = handle.connect_viewer().await.unwrap();
	let mut active = handle.connect_viewer().await.unwrap();
	active.recv().await.unwrap();

	for i in 0..4 {
		handle
			.append(Node::new(format!("task_{i}"), NodeKind::Task, "work"))
			.await
			.unwrap();
		let update = active.recv().await.unwrap();
		assert_eq!(update.graph().nodes.len(), i + 1);
	}

	assert!(silent.recv().await.unwrap().graph().is_empty());
	let caught_up = silent.recv().await.unwrap();
	assert_eq!(caught_up.graph().nodes.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_the_handle() {
	let (source, trigger) = PushSource::new();
	let handle = GraphService::spawn(MemoryStorage::new(), source, &memory_config()).unwrap();
	handle.shutdown().await;

	let result = handle.append(task_1()).await;
	assert!(matches!(result, Err(StoreError::Closed)));
	sleep(Duration::from_millis(10)).await;
	assert!(!trigger.fire());
}

#[tokio::test]
async fn polled_file_reports_only_foreign_writes() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("knowledge_graph.json");
	let config = StoreConfig {
		stability_window_ms: 50,
		poll_interval_ms: 10,
		..StoreConfig::at(&path)
	};
	let handle = GraphService::open(&config).unwrap();
	assert!(path.exists());

	let mut viewer = handle.connect_viewer().await.unwrap();
	assert!(viewer.recv().await.unwrap().graph().is_empty());

	handle.append(task_1()).await.unwrap();
	let own = viewer.recv().await.unwrap();
	assert_eq!(own.graph().nodes, vec![task_1()]);

	let expected = agent_output();
	std::fs::write(&path, serde_json::to_string_pretty(&expected).unwrap()).unwrap();
	let update = timeout(Duration::from_secs(5), viewer.recv())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(update.graph(), &expected);

	assert!(timeout(Duration::from_millis(300), viewer.recv()).await.is_err());
	handle.shutdown().await;
}
