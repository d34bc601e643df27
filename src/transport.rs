//! Browser side of the graph feed: a WebSocket that keeps a signal holding
//! the latest document and reconnects when the server goes away.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use leptos::prelude::*;
use log::{debug, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

use crate::graph::{GraphDocument, ServerMessage};

/// Port the graph server listens on.
pub const GRAPH_SOCKET_PORT: u16 = 3001;
/// Pause between a dropped connection and the next attempt.
pub const RECONNECT_DELAY_MS: i32 = 2000;

/// Where the feed connects for a page served from `hostname`.
pub fn socket_url(hostname: &str) -> String {
	format!("ws://{hostname}:{GRAPH_SOCKET_PORT}/ws")
}

/// The graph carried by one text frame, or `None` for frames of other types.
pub fn decode_frame(text: &str) -> Option<GraphDocument> {
	ServerMessage::from_json(text).map(|msg| match msg {
		ServerMessage::GraphUpdate { graph } => graph,
	})
}

/// State of the socket as shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
	Connecting,
	Open,
	Closed,
}

/// Reactive view of the feed.
#[derive(Clone, Copy)]
pub struct GraphFeed {
	pub graph: ReadSignal<GraphDocument>,
	pub status: ReadSignal<ConnectionStatus>,
}

struct SocketHandlers {
	open: Closure<dyn FnMut()>,
	message: Closure<dyn FnMut(MessageEvent)>,
	close: Closure<dyn FnMut(CloseEvent)>,
	error: Closure<dyn FnMut(Event)>,
}

struct Connection {
	url: String,
	socket: RefCell<Option<WebSocket>>,
	handlers: RefCell<Option<SocketHandlers>>,
	retry: RefCell<Option<Closure<dyn FnMut()>>>,
	retry_handle: Cell<Option<i32>>,
	stopped: Cell<bool>,
	set_graph: WriteSignal<GraphDocument>,
	set_status: WriteSignal<ConnectionStatus>,
}

impl Connection {
	fn connect(self: &Rc<Self>) {
		if self.stopped.get() {
			return;
		}
		self.retry_handle.set(None);
		self.set_status.set(ConnectionStatus::Connecting);
		let socket = match WebSocket::new(&self.url) {
			Ok(socket) => socket,
			Err(err) => {
				warn!("cannot open {}: {err:?}", self.url);
				self.schedule_reconnect();
				return;
			}
		};

		let weak = Rc::downgrade(self);
		let handlers = SocketHandlers {
			open: Closure::new({
				let weak = weak.clone();
				move || {
					if let Some(this) = weak.upgrade() {
						info!("graph feed connected to {}", this.url);
						this.set_status.set(ConnectionStatus::Open);
					}
				}
			}),
			message: Closure::new({
				let weak = weak.clone();
				move |ev: MessageEvent| {
					let Some(text) = ev.data().as_string() else {
						return;
					};
					match (decode_frame(&text), weak.upgrade()) {
						(Some(graph), Some(this)) => this.set_graph.set(graph),
						(None, _) => debug!("ignoring non-graph frame"),
						_ => {}
					}
				}
			}),
			close: Closure::new({
				let weak = weak.clone();
				move |_: CloseEvent| {
					if let Some(this) = weak.upgrade() {
						info!("graph feed disconnected");
						this.set_status.set(ConnectionStatus::Closed);
						this.schedule_reconnect();
					}
				}
			}),
			error: Closure::new(move |_: Event| {
				if let Some(this) = weak.upgrade() {
					warn!("graph feed socket error");
					if let Some(socket) = this.socket.borrow().as_ref() {
						let _ = socket.close();
					}
				}
			}),
		};
		socket.set_onopen(Some(handlers.open.as_ref().unchecked_ref()));
		socket.set_onmessage(Some(handlers.message.as_ref().unchecked_ref()));
		socket.set_onclose(Some(handlers.close.as_ref().unchecked_ref()));
		socket.set_onerror(Some(handlers.error.as_ref().unchecked_ref()));

		self.detach();
		*self.socket.borrow_mut() = Some(socket);
		*self.handlers.borrow_mut() = Some(handlers);
	}

	fn schedule_reconnect(&self) {
		if self.stopped.get() || self.retry_handle.get().is_some() {
			return;
		}
		let Some(window) = web_sys::window() else {
			return;
		};
		if let Some(cb) = self.retry.borrow().as_ref() {
			self.retry_handle.set(
				window
					.set_timeout_with_callback_and_timeout_and_arguments_0(
						cb.as_ref().unchecked_ref(),
						RECONNECT_DELAY_MS,
					)
					.ok(),
			);
		}
	}

	/// Unhook the previous socket so its late events never reach dropped closures.
	fn detach(&self) {
		if let Some(old) = self.socket.borrow_mut().take() {
			old.set_onopen(None);
			old.set_onmessage(None);
			old.set_onclose(None);
			old.set_onerror(None);
			let _ = old.close();
		}
		self.handlers.borrow_mut().take();
	}

	fn stop(&self) {
		self.stopped.set(true);
		if let (Some(handle), Some(window)) = (self.retry_handle.take(), web_sys::window()) {
			window.clear_timeout_with_handle(handle);
		}
		self.detach();
		self.retry.borrow_mut().take();
		debug!("graph feed stopped");
	}
}

/// Open the graph feed for the page's host and keep it open until the
/// calling owner is cleaned up.
pub fn use_graph_feed() -> GraphFeed {
	let (graph, set_graph) = signal(GraphDocument::empty());
	let (status, set_status) = signal(ConnectionStatus::Connecting);

	let hostname = web_sys::window()
		.and_then(|w| w.location().hostname().ok())
		.filter(|h| !h.is_empty())
		.unwrap_or_else(|| "localhost".to_string());

	let connection = Rc::new(Connection {
		url: socket_url(&hostname),
		socket: RefCell::new(None),
		handlers: RefCell::new(None),
		retry: RefCell::new(None),
		retry_handle: Cell::new(None),
		stopped: Cell::new(false),
		set_graph,
		set_status,
	});
	let weak: Weak<Connection> = Rc::downgrade(&connection);
	*connection.retry.borrow_mut() = Some(Closure::new(move || {
		if let Some(this) = weak.upgrade() {
			this.connect();
		}
	}));
	connection.connect();

	let owned = StoredValue::new_local(connection);
	on_cleanup(move || {
		owned.try_with_value(|c| c.stop());
	});

	GraphFeed { graph, status }
}
