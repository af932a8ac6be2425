//! Media loading through HTML video and image elements.
//!
//! The GL backend cannot import external browser images directly, so both
//! videos and stills go through a 2D canvas readback: draw the element,
//! read the pixels, upload them with the ordinary texture path. Videos repeat
//! the readback every frame.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, HtmlVideoElement, Response,
};

use vitrine_gpu::Texture;

use crate::media::{LoadDelivery, LoadRequest, MediaError, MediaLoader, MediaRole, MediaSource};

/// Readback canvas plus its 2D context, shared by video and image sources.
struct Readback {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    width: u32,
    height: u32,
}

impl Readback {
    fn new(width: u32, height: u32) -> Result<Self, MediaError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| MediaError::Playback("no document".into()))?;
        let canvas: HtmlCanvasElement = document
            .create_element("canvas")
            .map_err(js_error)?
            .dyn_into()
            .map_err(|_| MediaError::Playback("canvas element cast failed".into()))?;
        canvas.set_width(width);
        canvas.set_height(height);
        let context: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .map_err(js_error)?
            .ok_or_else(|| MediaError::Playback("no 2d context".into()))?
            .dyn_into()
            .map_err(|_| MediaError::Playback("2d context cast failed".into()))?;
        Ok(Self {
            canvas,
            context,
            width,
            height,
        })
    }

    fn read_pixels(&self) -> Result<Vec<u8>, MediaError> {
        let image_data = self
            .context
            .get_image_data(0.0, 0.0, self.width as f64, self.height as f64)
            .map_err(js_error)?;
        Ok(image_data.data().0)
    }
}

fn js_error(value: JsValue) -> MediaError {
    MediaError::Playback(format!("{value:?}"))
}

/// A playing HTML video mirrored into a GPU texture frame by frame.
struct WebVideoSource {
    video: Option<HtmlVideoElement>,
    readback: Readback,
    texture: Option<Texture>,
}

impl MediaSource for WebVideoSource {
    fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    fn refresh(&mut self, queue: &wgpu::Queue) {
        let (Some(video), Some(texture)) = (&self.video, &self.texture) else {
            return;
        };
        if video.ready_state() < 2 {
            return;
        }
        if self
            .readback
            .context
            .draw_image_with_html_video_element_and_dw_and_dh(
                video,
                0.0,
                0.0,
                self.readback.width as f64,
                self.readback.height as f64,
            )
            .is_err()
        {
            return;
        }
        if let Ok(pixels) = self.readback.read_pixels() {
            if let Err(e) = texture.write(queue, &pixels) {
                log::warn!("video frame upload failed: {e}");
            }
        }
    }

    fn dispose(&mut self) {
        if let Some(video) = self.video.take() {
            let _ = video.pause();
            video.remove_attribute("src").ok();
            video.load();
        }
        if let Some(texture) = self.texture.take() {
            texture.destroy();
        }
    }
}

/// A still preview image, uploaded once.
struct WebImageSource {
    texture: Option<Texture>,
}

impl MediaSource for WebImageSource {
    fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    fn dispose(&mut self) {
        if let Some(texture) = self.texture.take() {
            texture.destroy();
        }
    }
}

/// Await a single named event on a target, resolving false if "error" fires
/// first.
async fn await_event(target: &web_sys::EventTarget, event: &str) -> bool {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let on_event = Closure::once_into_js({
            let resolve = resolve.clone();
            move || {
                let _ = resolve.call1(&JsValue::NULL, &JsValue::TRUE);
            }
        });
        let on_error = Closure::once_into_js(move || {
            let _ = resolve.call1(&JsValue::NULL, &JsValue::FALSE);
        });
        let _ = target
            .add_event_listener_with_callback(event, on_event.unchecked_ref());
        let _ = target.add_event_listener_with_callback("error", on_error.unchecked_ref());
    });
    matches!(JsFuture::from(promise).await, Ok(value) if value.is_truthy())
}

/// Follow redirects up front so the media element gets the final URL.
async fn resolve_redirected_url(url: &str) -> Result<String, MediaError> {
    let window =
        web_sys::window().ok_or_else(|| MediaError::Network("no window".into()))?;
    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| MediaError::Network(format!("{e:?}")))?
        .dyn_into()
        .map_err(|_| MediaError::Network("fetch returned a non-response".into()))?;
    if !response.ok() {
        return Err(MediaError::Network(format!(
            "fetch {url}: status {}",
            response.status()
        )));
    }
    Ok(response.url())
}

async fn load_video(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    request: &LoadRequest,
    width: u32,
    height: u32,
) -> Result<Box<dyn MediaSource>, MediaError> {
    let url = resolve_redirected_url(&request.url).await?;

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| MediaError::Playback("no document".into()))?;
    let video: HtmlVideoElement = document
        .create_element("video")
        .map_err(js_error)?
        .dyn_into()
        .map_err(|_| MediaError::Playback("video element cast failed".into()))?;
    video.set_cross_origin(Some("anonymous"));
    video.set_muted(true);
    video.set_loop(true);
    video
        .set_attribute("playsinline", "")
        .map_err(js_error)?;
    video.set_src(&url);

    if !await_event(&video, "canplay").await {
        return Err(MediaError::Network(format!("video failed to load: {url}")));
    }

    // Autoplay rejection (browser policy) is logged but not fatal: the first
    // frame is still presentable and playback resumes on user gesture.
    match video.play() {
        Ok(promise) => {
            if let Err(e) = JsFuture::from(promise).await {
                log::warn!("video autoplay rejected: {e:?}");
            }
        }
        Err(e) => log::warn!("video play() failed: {e:?}"),
    }

    let readback = Readback::new(width, height)?;
    let blank = vec![0u8; (width * height * 4) as usize];
    let texture = Texture::from_rgba8(device, queue, &blank, width, height)
        .map_err(|e| MediaError::Playback(e.to_string()))?;

    Ok(Box::new(WebVideoSource {
        video: Some(video),
        readback,
        texture: Some(texture),
    }))
}

async fn load_preview(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    request: &LoadRequest,
    width: u32,
    height: u32,
) -> Result<Box<dyn MediaSource>, MediaError> {
    let image = HtmlImageElement::new().map_err(js_error)?;
    image.set_cross_origin(Some("anonymous"));
    image.set_src(&request.url);

    if !await_event(&image, "load").await {
        return Err(MediaError::Network(format!(
            "preview failed to load: {}",
            request.url
        )));
    }

    let readback = Readback::new(width, height)?;
    readback
        .context
        .draw_image_with_html_image_element_and_dw_and_dh(
            &image,
            0.0,
            0.0,
            width as f64,
            height as f64,
        )
        .map_err(js_error)?;
    let pixels = readback.read_pixels()?;
    let texture = Texture::from_rgba8(device, queue, &pixels, width, height)
        .map_err(|e| MediaError::Playback(e.to_string()))?;

    Ok(Box::new(WebImageSource {
        texture: Some(texture),
    }))
}

/// Texture dimensions used for the canvas readback path. Media is resampled
/// to a bounded size so per-frame readback stays cheap.
const READBACK_MAX_DIM: u32 = 1024;

fn readback_size(width: u32, height: u32) -> (u32, u32) {
    let longest = width.max(height).max(1);
    if longest <= READBACK_MAX_DIM {
        return (width.max(1), height.max(1));
    }
    let scale = READBACK_MAX_DIM as f32 / longest as f32;
    (
        ((width as f32 * scale) as u32).max(1),
        ((height as f32 * scale) as u32).max(1),
    )
}

/// Loads media asynchronously via browser elements and queues deliveries for
/// the frame loop to drain.
pub struct WebMediaLoader {
    device: wgpu::Device,
    queue: wgpu::Queue,
    /// Intrinsic dimensions per item, for readback sizing.
    dimensions: Vec<(u32, u32)>,
    deliveries: Rc<RefCell<Vec<LoadDelivery>>>,
}

impl WebMediaLoader {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, dimensions: Vec<(u32, u32)>) -> Self {
        Self {
            device,
            queue,
            dimensions,
            deliveries: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl MediaLoader for WebMediaLoader {
    fn request(&mut self, request: LoadRequest) {
        let device = self.device.clone();
        let queue = self.queue.clone();
        let deliveries = Rc::clone(&self.deliveries);
        let (width, height) = self
            .dimensions
            .get(request.item_index)
            .copied()
            .map(|(w, h)| readback_size(w, h))
            .unwrap_or((1, 1));

        wasm_bindgen_futures::spawn_local(async move {
            let result = match request.role {
                MediaRole::Video => load_video(&device, &queue, &request, width, height).await,
                MediaRole::Preview => {
                    load_preview(&device, &queue, &request, width, height).await
                }
            };
            deliveries.borrow_mut().push(LoadDelivery {
                item_index: request.item_index,
                role: request.role,
                generation: request.generation,
                result,
            });
        });
    }

    fn poll(&mut self) -> Vec<LoadDelivery> {
        std::mem::take(&mut self.deliveries.borrow_mut())
    }
}
