//! Native demo: runs the carousel in a winit window with procedural test
//! patterns standing in for real media.
//!
//! Controls: left/right arrows change the current item, the mouse tilts it.

use std::sync::Arc;

use glam::Vec2;
use winit::{
    event::{ElementState, Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

use vitrine_gpu::{GpuContext, Texture};

use crate::carousel::Carousel;
use crate::data::CarouselData;
use crate::index::{Action, IndexCell};
use crate::media::{
    LoadDelivery, LoadRequest, MediaError, MediaLoader, MediaRole, MediaSource,
};
use crate::render::CarouselRenderer;
use crate::test_pattern;

/// Simulated load latency, in poll calls (one per frame).
const LOAD_LATENCY_TICKS: u32 = 30;

const PATTERN_WIDTH: u32 = 256;
const PATTERN_HEIGHT: u32 = 256;

/// An animated test-pattern texture standing in for a video.
struct PatternSource {
    texture: Option<Texture>,
    variant: usize,
    frame: u32,
    animated: bool,
}

impl MediaSource for PatternSource {
    fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    fn refresh(&mut self, queue: &wgpu::Queue) {
        if !self.animated {
            return;
        }
        self.frame = self.frame.wrapping_add(1);
        // Regenerating every frame is fine at this size for a demo.
        let phase = self.frame as f32 / 30.0;
        let data = test_pattern::generate_rgba(PATTERN_WIDTH, PATTERN_HEIGHT, self.variant, phase);
        if let Some(texture) = &self.texture {
            if let Err(e) = texture.write(queue, &data) {
                log::warn!("pattern frame upload failed: {e}");
            }
        }
    }

    fn dispose(&mut self) {
        if let Some(texture) = self.texture.take() {
            texture.destroy();
        }
    }
}

struct PendingLoad {
    request: LoadRequest,
    remaining_ticks: u32,
}

/// Loader that resolves every request to a procedural pattern after a fixed
/// simulated latency, exercising the same delayed-delivery path as a real
/// network loader.
pub struct TestPatternLoader {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pending: Vec<PendingLoad>,
}

impl TestPatternLoader {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            pending: Vec::new(),
        }
    }

    fn resolve(&self, request: &LoadRequest) -> Result<Box<dyn MediaSource>, MediaError> {
        let data = test_pattern::generate_rgba(
            PATTERN_WIDTH,
            PATTERN_HEIGHT,
            request.item_index,
            0.0,
        );
        let texture = Texture::from_rgba8(
            &self.device,
            &self.queue,
            &data,
            PATTERN_WIDTH,
            PATTERN_HEIGHT,
        )
        .map_err(|e| MediaError::Network(e.to_string()))?;
        Ok(Box::new(PatternSource {
            texture: Some(texture),
            variant: request.item_index,
            frame: 0,
            // Previews are stills; only the video stand-in animates.
            animated: request.role == MediaRole::Video,
        }))
    }
}

impl MediaLoader for TestPatternLoader {
    fn request(&mut self, request: LoadRequest) {
        self.pending.push(PendingLoad {
            request,
            remaining_ticks: LOAD_LATENCY_TICKS,
        });
    }

    fn poll(&mut self) -> Vec<LoadDelivery> {
        let mut ready = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].remaining_ticks == 0 {
                ready.push(self.pending.swap_remove(index).request);
            } else {
                self.pending[index].remaining_ticks -= 1;
                index += 1;
            }
        }
        ready
            .into_iter()
            .map(|request| {
                let result = self.resolve(&request);
                LoadDelivery {
                    item_index: request.item_index,
                    role: request.role,
                    generation: request.generation,
                    result,
                }
            })
            .collect()
    }
}

fn demo_data(item_count: usize) -> CarouselData {
    let items: Vec<String> = (0..item_count)
        .map(|i| {
            let (width, height) = if i % 2 == 0 { (1920, 1080) } else { (1080, 1920) };
            format!(
                r#"{{"id": "demo-{i}", "video": {{"combined": "pattern://{i}", "thumbnail": "pattern://{i}.still", "width": {width}, "height": {height}}}}}"#
            )
        })
        .collect();
    let payload = format!(r#"{{"items": [{}]}}"#, items.join(","));
    // The payload above is well-formed by construction.
    CarouselData::from_json(&payload).unwrap_or(CarouselData { items: vec![] })
}

pub fn run() {
    println!("Vitrine - carousel demo");
    println!("Controls: left/right arrows to switch items, move the mouse to tilt");
    println!();

    let event_loop = EventLoop::new().expect("couldn't create event loop");

    let window = WindowBuilder::new()
        .with_title("Vitrine Demo")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720))
        .with_transparent(true)
        .build(&event_loop)
        .expect("couldn't create window");

    let window = Arc::new(window);

    let gpu_ctx = match pollster::block_on(GpuContext::for_window(window.clone())) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("GPU initialization failed: {e}");
            return;
        }
    };

    let loader = TestPatternLoader::new(gpu_ctx.device.clone(), gpu_ctx.queue.clone());
    let data = demo_data(5);
    let descriptors = data.items.clone();
    let index = IndexCell::new(0);

    let mut carousel = Carousel::new(data, index.clone(), Box::new(loader));
    carousel.attach_renderer(CarouselRenderer::new(gpu_ctx, &descriptors));
    carousel.set_on_loaded(|| println!("first item media ready"));

    let size = window.inner_size();
    let dpr = window.scale_factor() as f32;
    carousel.resize(
        size.width as f32 / dpr,
        size.height as f32 / dpr,
        dpr,
    );
    carousel.start();

    // The carousel is moved into the event loop, so index writes are applied
    // just before each tick instead of through a cell subscription.
    let mut index_dirty = false;
    let mut last_seen_index = index.get();

    let _ = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    carousel.destroy();
                    elwt.exit();
                }
                WindowEvent::Resized(new_size) => {
                    let dpr = window.scale_factor() as f32;
                    carousel.resize(
                        new_size.width as f32 / dpr,
                        new_size.height as f32 / dpr,
                        dpr,
                    );
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let size = window.inner_size();
                    if size.width > 0 && size.height > 0 {
                        let x = (-0.5 + position.x as f32 / size.width as f32) * 2.0;
                        let y = (-0.5 + position.y as f32 / size.height as f32) * 2.0;
                        carousel.set_pointer(Vec2::new(x, y));
                    }
                }
                WindowEvent::CursorLeft { .. } => {
                    carousel.set_pointer(Vec2::ZERO);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed {
                        let action = match event.physical_key {
                            PhysicalKey::Code(KeyCode::ArrowLeft) => Some(Action::Prev),
                            PhysicalKey::Code(KeyCode::ArrowRight) => Some(Action::Next),
                            _ => None,
                        };
                        if let Some(action) = action {
                            action.apply(&index);
                            index_dirty = true;
                        }
                    }
                }
                WindowEvent::RedrawRequested => {
                    if index_dirty || index.get() != last_seen_index {
                        last_seen_index = index.get();
                        index_dirty = false;
                        carousel.on_current_index_change();
                    }
                    carousel.tick();
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    });
}
