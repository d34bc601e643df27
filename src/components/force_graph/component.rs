use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::render;
use super::state::ForceGraphState;
use super::types::{GraphEvent, GraphSettings};
use crate::graph::GraphDocument;

type SharedState = Rc<RefCell<Option<ForceGraphState>>>;
type SharedClosure = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Everything that must be released when the canvas unmounts.
struct Teardown {
	state: SharedState,
	animate: SharedClosure,
	resize_cb: SharedClosure,
	frame: Rc<Cell<Option<i32>>>,
}

impl Teardown {
	fn run(&self) {
		if let Some(ref mut s) = *self.state.borrow_mut() {
			s.dispose();
		}
		if let Some(window) = web_sys::window() {
			if let Some(id) = self.frame.take() {
				let _ = window.cancel_animation_frame(id);
			}
			if let Some(cb) = self.resize_cb.borrow_mut().take() {
				let _ = window
					.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}
		self.animate.borrow_mut().take();
		debug!("force graph canvas disposed");
	}
}

fn measure(
	canvas: &HtmlCanvasElement,
	fullscreen: bool,
	width: Option<f64>,
	height: Option<f64>,
) -> (f64, f64) {
	let window_dim = |dim: Result<JsValue, JsValue>| dim.ok().and_then(|v| v.as_f64());
	if fullscreen {
		if let Some(window) = web_sys::window() {
			if let (Some(w), Some(h)) = (
				window_dim(window.inner_width()),
				window_dim(window.inner_height()),
			) {
				return (w, h);
			}
		}
	}
	let parent = canvas.parent_element();
	(
		width.unwrap_or_else(|| {
			parent
				.as_ref()
				.map(|p| p.client_width() as f64)
				.filter(|w| *w > 0.0)
				.unwrap_or(800.0)
		}),
		height.unwrap_or_else(|| {
			parent
				.as_ref()
				.map(|p| p.client_height() as f64)
				.filter(|h| *h > 0.0)
				.unwrap_or(600.0)
		}),
	)
}

fn local_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?;
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn emit(on_event: Option<Callback<GraphEvent>>, event: Option<GraphEvent>) {
	if let (Some(cb), Some(event)) = (on_event, event) {
		cb.run(event);
	}
}

fn cursor_for(s: &ForceGraphState) -> &'static str {
	if s.drag.active {
		"grabbing"
	} else if s.hovered_node().is_some() {
		"pointer"
	} else {
		"grab"
	}
}

/// Live, interactive canvas for a knowledge graph.
///
/// Every change of `data` is merged into the running layout; `settings` can
/// change at any time. Hover and selection changes are reported through
/// `on_event`.
#[component]
pub fn ForceGraphCanvas(
	/// The document to show.
	#[prop(into)]
	data: Signal<GraphDocument>,
	/// Forces and per-kind visibility.
	#[prop(into, optional)]
	settings: Signal<GraphSettings>,
	/// Receives hover and selection changes.
	#[prop(optional)]
	on_event: Option<Callback<GraphEvent>>,
	/// Fill the window instead of the parent element.
	#[prop(default = false)]
	fullscreen: bool,
	/// Fixed width; defaults to the parent's.
	#[prop(default = None)]
	width: Option<f64>,
	/// Fixed height; defaults to the parent's.
	#[prop(default = None)]
	height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let (cursor, set_cursor) = signal("grab");
	let state: SharedState = Rc::new(RefCell::new(None));
	let animate: SharedClosure = Rc::new(RefCell::new(None));
	let resize_cb: SharedClosure = Rc::new(RefCell::new(None));
	let frame = Rc::new(Cell::new(None::<i32>));

	let teardown = StoredValue::new_local(Teardown {
		state: state.clone(),
		animate: animate.clone(),
		resize_cb: resize_cb.clone(),
		frame: frame.clone(),
	});
	on_cleanup(move || {
		teardown.try_with_value(Teardown::run);
	});

	let (state_init, animate_init, resize_cb_init, frame_init) =
		(state.clone(), animate.clone(), resize_cb.clone(), frame.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if state_init.borrow().is_some() {
			return;
		}
		let Some(window) = web_sys::window() else {
			return;
		};
		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			log::error!("2d canvas context unavailable");
			return;
		};

		let (w, h) = measure(&canvas, fullscreen, width, height);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		let mut initial = ForceGraphState::new(w, h, settings.get_untracked(), js_sys::Date::now() as u64);
		initial.set_data(&data.get_untracked());
		*state_init.borrow_mut() = Some(initial);

		let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let (nw, nh) = measure(&canvas_resize, fullscreen, width, height);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			if let Some(ref mut s) = *state_resize.borrow_mut() {
				s.resize(nw, nh);
			}
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (state_anim, animate_inner, frame_inner) =
			(state_init.clone(), animate_init.clone(), frame_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			frame_inner.set(None);
			let mut keep_going = false;
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				keep_going = !s.is_disposed();
				let ticked = s.tick();
				let dirty = s.take_dirty();
				if ticked || dirty {
					render::render(s, &ctx);
				}
			}
			if !keep_going {
				return;
			}
			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				frame_inner.set(win.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			frame_init.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		}
	});

	let state_data = state.clone();
	Effect::new(move |_| {
		let doc = data.get();
		if let Some(ref mut s) = *state_data.borrow_mut() {
			let outcome = s.set_data(&doc);
			debug!(
				"graph merged: {:?}, {} nodes, alpha {:.3} toward {}",
				outcome.kind,
				doc.nodes.len(),
				s.layout.alpha(),
				s.layout.alpha_target()
			);
		}
	});

	let state_settings = state.clone();
	Effect::new(move |_| {
		let next = settings.get();
		let event = state_settings
			.borrow_mut()
			.as_mut()
			.and_then(|s| s.update_settings(next));
		emit(on_event, event);
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pointer_down(x, y);
			set_cursor.set(cursor_for(s));
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		let event = state_mm.borrow_mut().as_mut().and_then(|s| {
			let event = s.pointer_move(x, y);
			set_cursor.set(cursor_for(s));
			event
		});
		emit(on_event, event);
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		let event = state_mu.borrow_mut().as_mut().and_then(|s| {
			let event = s.pointer_up(x, y);
			set_cursor.set(cursor_for(s));
			event
		});
		emit(on_event, event);
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		let event = state_ml.borrow_mut().as_mut().and_then(|s| s.pointer_leave());
		set_cursor.set("grab");
		emit(on_event, event);
	};

	let state_wh = state;
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			s.wheel(x, y, ev.delta_y());
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			aria-label="Knowledge graph visualization"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block;"
			style:cursor=move || cursor.get()
		/>
	}
}
