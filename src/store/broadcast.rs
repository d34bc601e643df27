//! Fan-out of change notifications to connected viewers.

use log::{debug, warn};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::graph::{GraphDocument, ServerMessage};

/// Receives every authoritative change as a full document.
pub trait Broadcaster: Send + Sync {
	/// Deliver `document` to all current listeners. Must not block on any one.
	fn broadcast(&self, document: &GraphDocument);
}

/// Best-effort fan-out over a bounded broadcast channel.
///
/// Each viewer has its own cursor into the channel, so a stalled viewer only
/// falls behind itself. There are no acknowledgements and no retries.
#[derive(Clone, Debug)]
pub struct ViewerHub {
	tx: broadcast::Sender<ServerMessage>,
}

impl ViewerHub {
	/// A hub buffering up to `capacity` updates per viewer.
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity.max(1));
		Self { tx }
	}

	/// Start receiving updates sent from now on.
	pub fn subscribe(&self) -> ViewerFeed {
		ViewerFeed {
			initial: None,
			rx: self.tx.subscribe(),
		}
	}

	/// Number of connected viewers.
	pub fn viewer_count(&self) -> usize {
		self.tx.receiver_count()
	}
}

impl Broadcaster for ViewerHub {
	fn broadcast(&self, document: &GraphDocument) {
		match self.tx.send(ServerMessage::graph_update(document.clone())) {
			Ok(viewers) => debug!("graph update sent to {viewers} viewer(s)"),
			Err(_) => debug!("graph update dropped, no viewers connected"),
		}
	}
}

/// One viewer's stream of updates.
#[derive(Debug)]
pub struct ViewerFeed {
	initial: Option<ServerMessage>,
	rx: broadcast::Receiver<ServerMessage>,
}

impl ViewerFeed {
	pub(crate) fn starting_with(mut self, message: ServerMessage) -> Self {
		self.initial = Some(message);
		self
	}

	/// Next update, or `None` once the hub is gone.
	///
	/// A viewer that fell behind skips to the oldest update still buffered;
	/// every update is a full snapshot, so the newest one is always complete.
	pub async fn recv(&mut self) -> Option<ServerMessage> {
		if let Some(message) = self.initial.take() {
			return Some(message);
		}
		loop {
			match self.rx.recv().await {
				Ok(message) => return Some(message),
				Err(RecvError::Lagged(skipped)) => warn!("viewer lagged, skipped {skipped} update(s)"),
				Err(RecvError::Closed) => return None,
			}
		}
	}

	/// Next update if one is already buffered.
	pub fn try_recv(&mut self) -> Option<ServerMessage> {
		if let Some(message) = self.initial.take() {
			return Some(message);
		}
		loop {
			match self.rx.try_recv() {
				Ok(message) => return Some(message),
				Err(TryRecvError::Lagged(skipped)) => warn!("viewer lagged, skipped {skipped} update(s)"),
				Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::{Node, NodeKind};

	fn doc_with(id: &str) -> GraphDocument {
		GraphDocument {
			nodes: vec![Node::new(id, NodeKind::Task, id)],
			edges: vec![],
		}
	}

	#[test]
	fn every_viewer_gets_the_update() {
		let hub = ViewerHub::new(4);
		let mut a = hub.subscribe();
		let mut b = hub.subscribe();
		hub.broadcast(&doc_with("t1"));
		assert_eq!(a.try_recv().unwrap().graph(), &doc_with("t1"));
		assert_eq!(b.try_recv().unwrap().graph(), &doc_with("t1"));
		assert!(a.try_recv().is_none());
	}

	#[test]
	fn stalled_viewer_does_not_hold_back_others() {
		let hub = ViewerHub::new(2);
		let mut slow = hub.subscribe();
		let mut fast = hub.subscribe();
		for i in 0..5 {
			hub.broadcast(&doc_with(&format!("t{i}")));
			assert_eq!(fast.try_recv().unwrap().graph(), &doc_with(&format!("t{i}")));
		}
		// Only the newest buffered updates survive for the slow viewer.
		assert_eq!(slow.try_recv().unwrap().graph(), &doc_with("t3"));
		assert_eq!(slow.try_recv().unwrap().graph(), &doc_with("t4"));
		assert!(slow.try_recv().is_none());
	}

	#[test]
	fn broadcasting_without_viewers_is_harmless() {
		let hub = ViewerHub::new(1);
		hub.broadcast(&GraphDocument::empty());
		assert_eq!(hub.viewer_count(), 0);
	}

	#[test]
	fn initial_message_comes_first() {
		let hub = ViewerHub::new(4);
		let mut feed = hub
			.subscribe()
			.starting_with(ServerMessage::graph_update(GraphDocument::empty()));
		hub.broadcast(&doc_with("t1"));
		assert!(feed.try_recv().unwrap().graph().is_empty());
		assert_eq!(feed.try_recv().unwrap().graph(), &doc_with("t1"));
	}
}
