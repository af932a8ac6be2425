//! GPU-side carousel rendering.
//!
//! Holds per-item GPU state (plane geometry, uniform buffer, cached texture
//! bind group) and draws every visible item in one pass per frame. The
//! texture bind group is rebuilt lazily whenever the item's media revision
//! moves, so texture swaps (preview to video, unload, reload) need no
//! explicit renderer notification.

use vitrine_gpu::{
    Camera, GpuContext, ItemUniform, PlaneDraw, PlaneGeometry, PlanePipeline, PLANE_DIVISIONS,
};

use crate::data::ItemDescriptor;
use crate::item::VisualItem;

struct ItemRenderState {
    geometry: PlaneGeometry,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group: Option<wgpu::BindGroup>,
    /// Media revision the cached texture bind group was built from.
    texture_revision: u64,
}

pub struct CarouselRenderer {
    ctx: GpuContext,
    pipeline: PlanePipeline,
    items: Vec<ItemRenderState>,
}

impl CarouselRenderer {
    pub fn new(ctx: GpuContext, descriptors: &[ItemDescriptor]) -> Self {
        let pipeline = PlanePipeline::new(&ctx.device, ctx.surface_config.format);
        let items = descriptors
            .iter()
            .map(|descriptor| {
                let geometry =
                    PlaneGeometry::new(&ctx.device, descriptor.aspect(), PLANE_DIVISIONS);
                let (uniform_buffer, uniform_bind_group) =
                    pipeline.create_item_uniform(&ctx.device);
                ItemRenderState {
                    geometry,
                    uniform_buffer,
                    uniform_bind_group,
                    texture_bind_group: None,
                    texture_revision: 0,
                }
            })
            .collect();
        Self {
            ctx,
            pipeline,
            items,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.ctx.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.ctx.queue
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    /// Draw one frame of the carousel.
    pub fn draw(&mut self, camera: &Camera, items: &mut [VisualItem]) {
        let view_proj = camera.view_proj();

        // Upload current video frames and refresh per-item GPU state before
        // opening the render pass.
        for (item, state) in items.iter_mut().zip(self.items.iter_mut()) {
            if !item.is_visible() {
                continue;
            }
            if let Some(source) = item.media_mut().applied_source_mut() {
                source.refresh(&self.ctx.queue);
            }

            let revision = item.media().revision();
            if state.texture_revision != revision {
                state.texture_bind_group = item
                    .media()
                    .applied_texture()
                    .map(|texture| self.pipeline.create_texture_bind_group(&self.ctx.device, texture));
                state.texture_revision = revision;
            }

            let uniform = ItemUniform {
                mvp: (view_proj * item.model_matrix()).to_cols_array_2d(),
                opacity: item.opacity(),
                is_vertical: if item.descriptor().is_portrait() {
                    1.0
                } else {
                    0.0
                },
                _pad: [0.0; 2],
            };
            self.pipeline
                .update_item(&self.ctx.queue, &state.uniform_buffer, uniform);
        }

        let frame = match self.ctx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.ctx.reconfigure();
                return;
            }
            Err(error) => {
                log::error!("failed to acquire surface frame: {error}");
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let draws: Vec<PlaneDraw<'_>> = items
            .iter()
            .zip(self.items.iter())
            .filter(|(item, _)| item.is_visible())
            .filter_map(|(_, state)| {
                let texture_bind_group = state.texture_bind_group.as_ref()?;
                Some(PlaneDraw {
                    geometry: &state.geometry,
                    uniform_bind_group: &state.uniform_bind_group,
                    texture_bind_group,
                })
            })
            .collect();

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Carousel Encoder"),
            });
        self.pipeline
            .render(&mut encoder, &view, self.ctx.config.clear_color, &draws);
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}
