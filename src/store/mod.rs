//! Server-side authority over the shared graph document.
//!
//! [`GraphStore`] is the synchronous core. [`GraphService`] runs it behind a
//! single writer task, wires a [`ChangeSource`] to it with write-settle
//! debouncing, and fans changes out to viewers through a [`ViewerHub`].

mod broadcast;
mod change_source;
mod config;
mod error;
mod graph_store;
mod service;
mod storage;

pub use broadcast::{Broadcaster, ViewerFeed, ViewerHub};
pub use change_source::{ChangeSignal, ChangeSink, ChangeSource, PollingFileSource, PushSource, PushTrigger};
pub use config::StoreConfig;
pub use error::StoreError;
pub use graph_store::GraphStore;
pub use service::{GraphHandle, GraphService};
pub use storage::{DocumentStorage, FileStorage, MemoryStorage};
