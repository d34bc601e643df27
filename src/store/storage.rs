//! Where the authoritative document lives between reads.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Backing storage for the shared document.
pub trait DocumentStorage: Send + 'static {
	/// Raw contents, or `None` when no document exists yet.
	fn read(&self) -> io::Result<Option<String>>;

	/// Replace the stored contents.
	fn write(&self, contents: &str) -> io::Result<()>;
}

/// A JSON file on disk, shared with the external agent.
#[derive(Clone, Debug)]
pub struct FileStorage {
	path: PathBuf,
}

impl FileStorage {
	/// Storage backed by the file at `path`.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Location of the document.
	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl DocumentStorage for FileStorage {
	fn read(&self) -> io::Result<Option<String>> {
		match fs::read_to_string(&self.path) {
			Ok(text) => Ok(Some(text)),
			Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
			Err(err) => Err(err),
		}
	}

	fn write(&self, contents: &str) -> io::Result<()> {
		if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
			fs::create_dir_all(dir)?;
		}
		let tmp = self.path.with_extension("json.tmp");
		fs::write(&tmp, contents)?;
		fs::rename(tmp, &self.path)
	}
}

/// In-process storage. Clones share the same contents, so one clone can play
/// the external writer while another backs the store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
	contents: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
	/// Empty storage: no document exists yet.
	pub fn new() -> Self {
		Self::default()
	}

	/// Storage that already holds `contents`.
	pub fn with_contents(contents: impl Into<String>) -> Self {
		let storage = Self::new();
		storage.set(contents);
		storage
	}

	/// Overwrite the contents, as an external writer would.
	pub fn set(&self, contents: impl Into<String>) {
		*self.contents.lock() = Some(contents.into());
	}

	/// Current contents.
	pub fn contents(&self) -> Option<String> {
		self.contents.lock().clone()
	}
}

impl DocumentStorage for MemoryStorage {
	fn read(&self) -> io::Result<Option<String>> {
		Ok(self.contents())
	}

	fn write(&self, contents: &str) -> io::Result<()> {
		self.set(contents);
		Ok(())
	}
}
