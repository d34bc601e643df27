//! Tunables of the graph store, loadable from any serde format.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::graph::contract::GRAPH_FILE_NAME;

/// Settings for the server-side graph authority.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
	/// Location of the shared document.
	pub path: PathBuf,
	/// Quiet period after the last observed write before the document is read.
	pub stability_window_ms: u64,
	/// How often the polling source checks the document's metadata.
	pub poll_interval_ms: u64,
	/// Updates buffered per viewer before a slow viewer starts skipping.
	pub viewer_capacity: usize,
	/// Pending programmatic writes before callers wait.
	pub command_capacity: usize,
}

impl Default for StoreConfig {
	fn default() -> Self {
		Self {
			path: PathBuf::from("workspace").join(GRAPH_FILE_NAME),
			stability_window_ms: 200,
			poll_interval_ms: 100,
			viewer_capacity: 64,
			command_capacity: 32,
		}
	}
}

impl StoreConfig {
	/// Config for a document at `path`, other settings default.
	pub fn at(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			..Self::default()
		}
	}

	/// The write-settle debounce window.
	pub fn stability_window(&self) -> Duration {
		Duration::from_millis(self.stability_window_ms)
	}

	/// The metadata polling interval.
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms.max(1))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_config_keeps_defaults() {
		let config: StoreConfig =
			serde_json::from_str(r#"{"path": "/tmp/g.json", "stability_window_ms": 50}"#).unwrap();
		assert_eq!(config.path, PathBuf::from("/tmp/g.json"));
		assert_eq!(config.stability_window(), Duration::from_millis(50));
		assert_eq!(config.poll_interval(), Duration::from_millis(100));
		assert_eq!(config.viewer_capacity, 64);
	}
}
