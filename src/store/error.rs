//! Errors returned to callers of programmatic store writes.

use thiserror::Error;

/// Failures surfaced by programmatic writes to the graph store.
///
/// The change-detection path never returns these; it logs and recovers.
#[derive(Debug, Error)]
pub enum StoreError {
	/// Reading or writing the backing document failed.
	#[error("graph storage I/O failed: {0}")]
	Io(#[from] std::io::Error),

	/// The document could not be serialized.
	#[error("graph serialization failed: {0}")]
	Serialize(#[from] serde_json::Error),

	/// The writer task is gone.
	#[error("graph writer has shut down")]
	Closed,
}
