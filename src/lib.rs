//! Live knowledge graph of an agent session.
//!
//! [`graph`] holds the shared document and its wire format. On native targets
//! [`store`] owns the document on disk and fans changes out to viewers. In the
//! browser the Leptos app draws it as a force-directed graph.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

mod components;
pub mod graph;
mod pages;
#[cfg(not(target_arch = "wasm32"))]
pub mod store;
mod transport;

use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

pub use components::force_graph::{ForceGraphCanvas, GraphEvent, GraphSettings, TypeVisibility};
pub use graph::{Edge, EdgeKind, GraphDocument, Node, NodeKind, NodeStatus, ServerMessage};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// Router with the graph page and a 404 fallback.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="Knowledge Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
	}
}
