//! Detection of writes made to the document outside the store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use log::debug;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

/// A notice that the backing document may have changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangeSignal;

/// Where a [`ChangeSource`] delivers its signals.
#[derive(Clone, Debug)]
pub struct ChangeSink {
	tx: mpsc::UnboundedSender<ChangeSignal>,
}

impl ChangeSink {
	pub(crate) fn new(tx: mpsc::UnboundedSender<ChangeSignal>) -> Self {
		Self { tx }
	}

	/// Report a change. Returns `false` once nobody is listening.
	pub fn notify(&self) -> bool {
		self.tx.send(ChangeSignal).is_ok()
	}

	/// Whether the listener has gone away.
	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}
}

/// Something that can tell the store the document was written externally.
///
/// Sources report raw events only; settling of bursts happens in the store's
/// writer. A source stops once its sink is closed.
pub trait ChangeSource: Send + 'static {
	/// Begin delivering change signals to `sink`.
	fn subscribe(self, sink: ChangeSink);
}

/// Watches a file by polling its modification time and length.
#[derive(Clone, Debug)]
pub struct PollingFileSource {
	path: PathBuf,
	interval: Duration,
}

impl PollingFileSource {
	/// Poll `path` every `interval`. Must be subscribed inside a Tokio runtime.
	pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
		Self {
			path: path.into(),
			interval,
		}
	}
}

type Stamp = Option<(Option<SystemTime>, u64)>;

async fn stamp(path: &std::path::Path) -> Stamp {
	let meta = tokio::fs::metadata(path).await.ok()?;
	Some((meta.modified().ok(), meta.len()))
}

impl ChangeSource for PollingFileSource {
	fn subscribe(self, sink: ChangeSink) {
		tokio::spawn(async move {
			// Changes that happened before subscribing are not reported.
			let mut last = stamp(&self.path).await;
			let mut ticker = time::interval(self.interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				ticker.tick().await;
				if sink.is_closed() {
					break;
				}
				let current = stamp(&self.path).await;
				if current != last {
					last = current;
					if !sink.notify() {
						break;
					}
				}
			}
			debug!("stopped watching {}", self.path.display());
		});
	}
}

/// A source driven by the host: call [`PushTrigger::fire`] whenever the
/// document is known to have changed (an event from another watcher, a
/// synthetic event in tests).
#[derive(Debug, Default)]
pub struct PushSource {
	slot: Arc<Mutex<Option<ChangeSink>>>,
}

/// Fires signals into a subscribed [`PushSource`].
#[derive(Clone, Debug)]
pub struct PushTrigger {
	slot: Arc<Mutex<Option<ChangeSink>>>,
}

impl PushSource {
	/// A source and the trigger that feeds it.
	pub fn new() -> (Self, PushTrigger) {
		let slot = Arc::new(Mutex::new(None));
		(
			Self { slot: slot.clone() },
			PushTrigger { slot },
		)
	}
}

impl ChangeSource for PushSource {
	fn subscribe(self, sink: ChangeSink) {
		*self.slot.lock() = Some(sink);
	}
}

impl PushTrigger {
	/// Report a change. Returns `false` if not subscribed or no longer listened to.
	pub fn fire(&self) -> bool {
		self.slot.lock().as_ref().is_some_and(ChangeSink::notify)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn trigger_is_inert_until_subscribed() {
		let (source, trigger) = PushSource::new();
		assert!(!trigger.fire());

		let (tx, mut rx) = mpsc::unbounded_channel();
		source.subscribe(ChangeSink::new(tx));
		assert!(trigger.fire());
		assert_eq!(rx.try_recv().unwrap(), ChangeSignal);

		drop(rx);
		assert!(!trigger.fire());
	}

	#[tokio::test]
	async fn polling_reports_writes_after_subscribing() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("graph.json");
		std::fs::write(&path, "{}").unwrap();

		let (tx, mut rx) = mpsc::unbounded_channel();
		PollingFileSource::new(&path, Duration::from_millis(5)).subscribe(ChangeSink::new(tx));
		time::sleep(Duration::from_millis(30)).await;
		assert!(rx.try_recv().is_err());

		std::fs::write(&path, "{\"nodes\":[],\"edges\":[]}").unwrap();
		let signal = time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
		assert_eq!(signal, Some(ChangeSignal));
	}
}
