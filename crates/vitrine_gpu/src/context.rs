//! wgpu device, queue, and surface management.
//!
//! The context can target either a winit window (native demo) or an HTML
//! canvas embedded in a host page (wasm32). Initialization is async to
//! support both backends; on native, wrap it in `pollster::block_on()`.

use crate::config::GpuConfig;
use crate::error::Result;

/// Main GPU context managing wgpu device, queue, and surface.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub config: GpuConfig,
}

impl GpuContext {
    /// Initialize a GPU context rendering into a winit window.
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn for_window(window: std::sync::Arc<winit::window::Window>) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;
        Self::finish_init(instance, surface, size.width, size.height, GpuConfig::default()).await
    }

    /// Initialize a GPU context rendering into an HTML canvas element.
    ///
    /// The widget appends its own canvas to the host element, so the surface
    /// targets the canvas directly rather than a window.
    #[cfg(target_arch = "wasm32")]
    pub async fn for_canvas(canvas: web_sys::HtmlCanvasElement) -> Result<Self> {
        let width = canvas.width();
        let height = canvas.height();

        // WebGPU surface creation can taint the canvas when WebGL fallback is
        // needed afterwards, so the GL backend is used unconditionally.
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::GL,
            ..Default::default()
        });
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas))?;
        Self::finish_init(instance, surface, width, height, GpuConfig::default()).await
    }

    /// Complete initialization once a surface exists.
    async fn finish_init(
        instance: wgpu::Instance,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
        config: GpuConfig,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        // WebGL has no compute support, so derive limits from the downlevel
        // defaults rather than Limits::default().
        let limits = wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Vitrine Device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let present_mode = if surface_caps.present_modes.contains(&config.present_mode) {
            config.present_mode
        } else {
            wgpu::PresentMode::Fifo
        };

        // The widget fades items over the page background, so prefer an alpha
        // mode that actually composites.
        let alpha_mode = if surface_caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            surface_caps.alpha_modes[0]
        };

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: config.max_frame_latency,
        };

        surface.configure(&device, &surface_config);

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            config,
        })
    }

    /// Handle surface resize. Safe to call at any time, including before the
    /// first render.
    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        self.surface_config.width = new_width.max(1);
        self.surface_config.height = new_height.max(1);
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Reconfigure the surface with its current dimensions (after a Lost or
    /// Outdated frame).
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Current surface width in pixels.
    pub fn width(&self) -> u32 {
        self.surface_config.width
    }

    /// Current surface height in pixels.
    pub fn height(&self) -> u32 {
        self.surface_config.height
    }

    /// Surface aspect ratio.
    pub fn aspect_ratio(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height as f32
    }
}
