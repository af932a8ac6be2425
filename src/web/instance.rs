//! One carousel embedded in one host DOM element.
//!
//! The instance owns the injected canvas, the carousel, and every JS closure
//! wired to the page (pointer events, the host "api" event, observers, and
//! the requestAnimationFrame loop). Dropping the instance is not supported;
//! instances live for the page.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    CustomEvent, CustomEventInit, Element, HtmlCanvasElement, HtmlElement, IntersectionObserver,
    IntersectionObserverEntry, MouseEvent, ResizeObserver,
};

use vitrine_gpu::GpuContext;

use crate::carousel::{subscribe_shared, Carousel};
use crate::data::CarouselData;
use crate::index::{Action, IndexCell};
use crate::render::CarouselRenderer;
use crate::web::loader::WebMediaLoader;

const DATA_ATTRIBUTE: &str = "data-vitrine-data";
const INITIATED_ATTRIBUTE: &str = "data-vitrine-initiated";
const LOADED_ATTRIBUTE: &str = "data-vitrine-loaded";

/// A live carousel bound to a host element.
pub struct WebInstance {
    host: HtmlElement,
    canvas: HtmlCanvasElement,
    carousel: Rc<RefCell<Carousel>>,
    index: IndexCell,
    // Closures must outlive the page wiring they are registered with.
    _listeners: Vec<Closure<dyn FnMut(web_sys::Event)>>,
    _mouse_listeners: Vec<Closure<dyn FnMut(MouseEvent)>>,
    _resize_observer: (ResizeObserver, Closure<dyn FnMut(js_sys::Array)>),
    _intersection_observer: (IntersectionObserver, Closure<dyn FnMut(js_sys::Array)>),
}

impl WebInstance {
    /// Read the host payload, inject a canvas, bring up the GPU, and wire all
    /// page events. Fails if the payload is missing or malformed.
    pub async fn attach(host: HtmlElement) -> Result<Rc<RefCell<Self>>, JsValue> {
        let payload = host
            .get_attribute(DATA_ATTRIBUTE)
            .ok_or_else(|| JsValue::from_str("missing carousel data attribute"))?;
        let data = CarouselData::from_json(&payload)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        let canvas = create_canvas(&host)?;
        let rect = host.get_bounding_client_rect();
        let dpr = device_pixel_ratio();
        canvas.set_width(((rect.width() as f32) * dpr).round().max(1.0) as u32);
        canvas.set_height(((rect.height() as f32) * dpr).round().max(1.0) as u32);

        let gpu_ctx = GpuContext::for_canvas(canvas.clone())
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        let dimensions = data
            .items
            .iter()
            .map(|item| (item.video.width, item.video.height))
            .collect();
        let loader = WebMediaLoader::new(
            gpu_ctx.device.clone(),
            gpu_ctx.queue.clone(),
            dimensions,
        );
        let descriptors = data.items.clone();

        let index = IndexCell::new(0);
        let mut carousel = Carousel::new(data, index.clone(), Box::new(loader));
        carousel.attach_renderer(CarouselRenderer::new(gpu_ctx, &descriptors));
        carousel.resize(rect.width() as f32, rect.height() as f32, dpr);

        {
            let host = host.clone();
            carousel.set_on_loaded(move || {
                let _ = host.set_attribute(LOADED_ATTRIBUTE, "true");
                dispatch(&host, "loaded");
            });
        }

        let carousel = Rc::new(RefCell::new(carousel));
        subscribe_shared(&carousel, &index);

        let mut instance = Self {
            host: host.clone(),
            canvas,
            carousel: Rc::clone(&carousel),
            index,
            _listeners: Vec::new(),
            _mouse_listeners: Vec::new(),
            _resize_observer: observe_resize(&host, &carousel)?,
            _intersection_observer: observe_intersection(&host, &carousel)?,
        };
        instance.wire_pointer_events()?;
        instance.wire_api_events()?;

        host.set_attribute(INITIATED_ATTRIBUTE, "true")?;
        dispatch(&host, "initiated");

        let instance = Rc::new(RefCell::new(instance));
        start_frame_loop(&carousel);
        Ok(instance)
    }

    /// Pointer position normalized to `[-1, 1]²` over the host rect, reset to
    /// center when the pointer leaves.
    fn wire_pointer_events(&mut self) -> Result<(), JsValue> {
        let host = self.host.clone();
        let carousel = Rc::clone(&self.carousel);
        let on_move = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            let rect = host.get_bounding_client_rect();
            if rect.width() <= 0.0 || rect.height() <= 0.0 {
                return;
            }
            let x = (-0.5 + (event.client_x() as f64 - rect.left()) / rect.width()) * 2.0;
            let y = (-0.5 + (event.client_y() as f64 - rect.top()) / rect.height()) * 2.0;
            carousel
                .borrow_mut()
                .set_pointer(Vec2::new(x as f32, y as f32));
        });
        self.host
            .add_event_listener_with_callback("mousemove", on_move.as_ref().unchecked_ref())?;
        self._mouse_listeners.push(on_move);

        let carousel = Rc::clone(&self.carousel);
        let on_leave = Closure::<dyn FnMut(MouseEvent)>::new(move |_: MouseEvent| {
            carousel.borrow_mut().set_pointer(Vec2::ZERO);
        });
        self.host
            .add_event_listener_with_callback("mouseleave", on_leave.as_ref().unchecked_ref())?;
        self._mouse_listeners.push(on_leave);
        Ok(())
    }

    /// The host drives the carousel with `api` CustomEvents carrying
    /// `{action: "prev"|"next"|"go", index?}`. Unknown actions are ignored.
    fn wire_api_events(&mut self) -> Result<(), JsValue> {
        let index = self.index.clone();
        let on_api = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
            let Ok(custom) = event.dyn_into::<CustomEvent>() else {
                return;
            };
            let detail = custom.detail();
            let action = js_sys::Reflect::get(&detail, &JsValue::from_str("action"))
                .ok()
                .and_then(|v| v.as_string());
            let target = js_sys::Reflect::get(&detail, &JsValue::from_str("index"))
                .ok()
                .and_then(|v| v.as_f64())
                .map(|v| v as i64);
            if let Some(action) = action.and_then(|a| Action::from_api(&a, target)) {
                action.apply(&index);
            }
        });
        self.host
            .add_event_listener_with_callback("api", on_api.as_ref().unchecked_ref())?;
        self._listeners.push(on_api);
        Ok(())
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

fn create_canvas(host: &HtmlElement) -> Result<HtmlCanvasElement, JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
    canvas.set_attribute("data-vitrine-role", "canvas")?;
    host.append_child(&canvas)?;
    Ok(canvas)
}

fn device_pixel_ratio() -> f32 {
    web_sys::window()
        .map(|w| w.device_pixel_ratio() as f32)
        .unwrap_or(1.0)
}

fn dispatch(host: &HtmlElement, name: &str) {
    let init = CustomEventInit::new();
    init.set_bubbles(true);
    if let Ok(event) = CustomEvent::new_with_event_init_dict(name, &init) {
        let _ = host.dispatch_event(&event);
    }
}

/// Keep the surface and camera in step with the host element's CSS size.
fn observe_resize(
    host: &HtmlElement,
    carousel: &Rc<RefCell<Carousel>>,
) -> Result<(ResizeObserver, Closure<dyn FnMut(js_sys::Array)>), JsValue> {
    let target: Element = host.clone().into();
    let observed = host.clone();
    let carousel = Rc::clone(carousel);
    let callback = Closure::<dyn FnMut(js_sys::Array)>::new(move |_entries: js_sys::Array| {
        let rect = observed.get_bounding_client_rect();
        carousel.borrow_mut().resize(
            rect.width() as f32,
            rect.height() as f32,
            device_pixel_ratio(),
        );
    });
    let observer = ResizeObserver::new(callback.as_ref().unchecked_ref())?;
    observer.observe(&target);
    Ok((observer, callback))
}

/// Pause the frame loop while the carousel is scrolled out of the viewport.
fn observe_intersection(
    host: &HtmlElement,
    carousel: &Rc<RefCell<Carousel>>,
) -> Result<(IntersectionObserver, Closure<dyn FnMut(js_sys::Array)>), JsValue> {
    let target: Element = host.clone().into();
    let carousel = Rc::clone(carousel);
    let callback = Closure::<dyn FnMut(js_sys::Array)>::new(move |entries: js_sys::Array| {
        for entry in entries.iter() {
            let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() else {
                continue;
            };
            let mut carousel = carousel.borrow_mut();
            if entry.is_intersecting() {
                carousel.start();
            } else {
                carousel.stop();
            }
        }
    });
    let observer = IntersectionObserver::new(callback.as_ref().unchecked_ref())?;
    observer.observe(&target);
    Ok((observer, callback))
}

/// Recursive requestAnimationFrame loop. Ticks are cheap while the carousel
/// is stopped, so the loop itself never pauses.
fn start_frame_loop(carousel: &Rc<RefCell<Carousel>>) {
    let carousel = Rc::clone(carousel);
    let handle: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let handle_clone = Rc::clone(&handle);

    *handle.borrow_mut() = Some(Closure::new(move || {
        carousel.borrow_mut().tick();
        if let Some(callback) = handle_clone.borrow().as_ref() {
            request_animation_frame(callback);
        }
    }));

    if let Some(callback) = handle.borrow().as_ref() {
        request_animation_frame(callback);
    }
    // The closure holds a clone of its own cell, keeping the loop alive for
    // the page's lifetime.
}

fn request_animation_frame(callback: &Closure<dyn FnMut()>) {
    if let Some(window) = web_sys::window() {
        let _ = window.request_animation_frame(callback.as_ref().unchecked_ref());
    }
}
