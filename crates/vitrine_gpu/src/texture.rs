use crate::config::TextureConfig;
use crate::error::{GpuError, Result};

/// GPU texture wrapper.
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a texture from RGBA8 bytes with default configuration.
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Self> {
        Self::from_rgba8_with_config(device, queue, data, width, height, TextureConfig::default())
    }

    /// Create a texture from RGBA8 bytes with custom configuration.
    pub fn from_rgba8_with_config(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
        width: u32,
        height: u32,
        config: TextureConfig,
    ) -> Result<Self> {
        let expected_size = (width * height * 4) as usize;
        if data.len() != expected_size {
            return Err(GpuError::Texture(format!(
                "Invalid data size: expected {} bytes for {}x{} RGBA8, got {}",
                expected_size,
                width,
                height,
                data.len()
            )));
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Item Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            texture.as_image_copy(),
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Item Sampler"),
            address_mode_u: config.address_mode,
            address_mode_v: config.address_mode,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: config.mag_filter,
            min_filter: config.min_filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
            width,
            height,
        })
    }

    /// Rewrite the full texture contents. Used by video sources that refresh
    /// the current frame every tick.
    pub fn write(&self, queue: &wgpu::Queue, data: &[u8]) -> Result<()> {
        let expected_size = (self.width * self.height * 4) as usize;
        if data.len() != expected_size {
            return Err(GpuError::Texture(format!(
                "Invalid frame size: expected {} bytes, got {}",
                expected_size,
                data.len()
            )));
        }

        queue.write_texture(
            self.texture.as_image_copy(),
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    /// Release the underlying GPU texture. The wrapper must not be used for
    /// rendering afterwards; calling this more than once is harmless.
    pub fn destroy(&self) {
        self.texture.destroy();
    }

    /// Get aspect ratio.
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}
