//! Single-writer access to a [`GraphStore`] shared by many callers.
//!
//! Programmatic writes arrive on a bounded command queue and change signals
//! on an unbounded one; one task drains both, so no notification ever sees a
//! half-applied mutation. Change signals are debounced: the document is read
//! once the stability window has passed without further signals.

use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Duration, Instant};

use super::broadcast::{Broadcaster, ViewerFeed, ViewerHub};
use super::change_source::{ChangeSignal, ChangeSink, ChangeSource, PollingFileSource};
use super::config::StoreConfig;
use super::error::StoreError;
use super::graph_store::GraphStore;
use super::storage::{DocumentStorage, FileStorage};
use crate::graph::{GraphDocument, Node, ServerMessage};

enum Command {
	Append {
		node: Node,
		reply: oneshot::Sender<Result<bool, StoreError>>,
	},
	Reset {
		reply: oneshot::Sender<Result<(), StoreError>>,
	},
	Connect {
		reply: oneshot::Sender<Result<ViewerFeed, StoreError>>,
	},
	Shutdown,
}

/// Publishes a committed document: first to synchronous readers, then to viewers.
struct Publisher {
	current: Arc<RwLock<GraphDocument>>,
	hub: ViewerHub,
}

impl Broadcaster for Publisher {
	fn broadcast(&self, document: &GraphDocument) {
		*self.current.write() = document.clone();
		self.hub.broadcast(document);
	}
}

/// Starts the writer task for a store.
pub struct GraphService;

impl GraphService {
	/// Serve the document at `config.path`, watching it by polling.
	///
	/// Must be called inside a Tokio runtime.
	pub fn open(config: &StoreConfig) -> Result<GraphHandle, StoreError> {
		let source = PollingFileSource::new(&config.path, config.poll_interval());
		Self::spawn(FileStorage::new(&config.path), source, config)
	}

	/// Serve a document held by `storage`, learning of external writes from `source`.
	///
	/// Must be called inside a Tokio runtime.
	pub fn spawn<S, C>(storage: S, source: C, config: &StoreConfig) -> Result<GraphHandle, StoreError>
	where
		S: DocumentStorage,
		C: ChangeSource,
	{
		let hub = ViewerHub::new(config.viewer_capacity);
		let current = Arc::new(RwLock::new(GraphDocument::empty()));
		let publisher = Arc::new(Publisher {
			current: current.clone(),
			hub: hub.clone(),
		});
		let store = GraphStore::initialize(storage, publisher)?;
		*current.write() = store.snapshot().clone();

		let (commands_tx, commands_rx) = mpsc::channel(config.command_capacity.max(1));
		let (changes_tx, changes_rx) = mpsc::unbounded_channel();
		source.subscribe(ChangeSink::new(changes_tx));

		let writer = Writer {
			store,
			hub: hub.clone(),
			current: current.clone(),
			window: config.stability_window(),
		};
		tokio::spawn(writer.run(commands_rx, changes_rx));

		Ok(GraphHandle {
			commands: commands_tx,
			current,
			hub,
		})
	}
}

/// Cheap, cloneable access to a running graph service.
#[derive(Clone)]
pub struct GraphHandle {
	commands: mpsc::Sender<Command>,
	current: Arc<RwLock<GraphDocument>>,
	hub: ViewerHub,
}

impl GraphHandle {
	/// The last committed document. Never waits on the writer.
	pub fn snapshot(&self) -> GraphDocument {
		self.current.read().clone()
	}

	/// Add a node unless its id exists; see [`GraphStore::append`].
	pub async fn append(&self, node: Node) -> Result<bool, StoreError> {
		self.request(|reply| Command::Append { node, reply }).await?
	}

	/// Start a fresh session with an empty document.
	pub async fn reset(&self) -> Result<(), StoreError> {
		self.request(|reply| Command::Reset { reply }).await?
	}

	/// Reset the session and subscribe a viewer.
	///
	/// The feed's first message is the empty document; every later change
	/// follows in order.
	pub async fn connect_viewer(&self) -> Result<ViewerFeed, StoreError> {
		self.request(|reply| Command::Connect { reply }).await?
	}

	/// Number of connected viewers.
	pub fn viewer_count(&self) -> usize {
		self.hub.viewer_count()
	}

	/// Stop the writer. Pending commands ahead of this one still run.
	pub async fn shutdown(&self) {
		let _ = self.commands.send(Command::Shutdown).await;
	}

	async fn request<T>(
		&self,
		command: impl FnOnce(oneshot::Sender<T>) -> Command,
	) -> Result<T, StoreError> {
		let (reply, response) = oneshot::channel();
		self.commands
			.send(command(reply))
			.await
			.map_err(|_| StoreError::Closed)?;
		response.await.map_err(|_| StoreError::Closed)
	}
}

struct Writer<S> {
	store: GraphStore<S>,
	hub: ViewerHub,
	current: Arc<RwLock<GraphDocument>>,
	window: Duration,
}

impl<S: DocumentStorage> Writer<S> {
	async fn run(
		mut self,
		mut commands: mpsc::Receiver<Command>,
		mut changes: mpsc::UnboundedReceiver<ChangeSignal>,
	) {
		let mut settle_at: Option<Instant> = None;
		let mut watching = true;
		loop {
			tokio::select! {
				command = commands.recv() => match command {
					Some(Command::Shutdown) | None => break,
					Some(command) => {
						self.settle_pending(&mut settle_at, &mut changes);
						self.apply(command);
					}
				},
				signal = changes.recv(), if watching => match signal {
					Some(ChangeSignal) => settle_at = Some(Instant::now() + self.window),
					None => watching = false,
				},
				() = time::sleep_until(settle_at.unwrap_or_else(Instant::now)), if settle_at.is_some() => {
					settle_at = None;
					self.store.refresh();
				}
			}
		}
		debug!("graph writer stopped");
	}

	/// Take in external writes that are still inside the stability window.
	///
	/// A programmatic write builds on the in-memory document and overwrites
	/// the stored one, so anything written to storage since the last refresh
	/// has to be read first or it would be lost.
	fn settle_pending(
		&mut self,
		settle_at: &mut Option<Instant>,
		changes: &mut mpsc::UnboundedReceiver<ChangeSignal>,
	) {
		let mut pending = settle_at.take().is_some();
		while changes.try_recv().is_ok() {
			pending = true;
		}
		if pending {
			debug!("reading unsettled external write before a programmatic one");
			self.store.refresh();
		}
	}

	fn apply(&mut self, command: Command) {
		match command {
			Command::Append { node, reply } => {
				let _ = reply.send(self.store.append(node));
			}
			Command::Reset { reply } => {
				let result = self.store.reset();
				self.sync();
				let _ = reply.send(result);
			}
			Command::Connect { reply } => {
				let result = self.store.reset().map(|()| {
					self.sync();
					self.hub
						.subscribe()
						.starting_with(ServerMessage::graph_update(GraphDocument::empty()))
				});
				let _ = reply.send(result);
			}
			Command::Shutdown => {}
		}
	}

	fn sync(&self) {
		*self.current.write() = self.store.snapshot().clone();
	}
}
