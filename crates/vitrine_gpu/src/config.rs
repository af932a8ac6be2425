//! Configuration structs for GPU settings.

/// Configuration for GPU context initialization.
#[derive(Debug, Clone)]
pub struct GpuConfig {
    /// Power preference for adapter selection.
    pub power_preference: wgpu::PowerPreference,
    /// Present mode (VSync behavior).
    pub present_mode: wgpu::PresentMode,
    /// Maximum frames in flight.
    pub max_frame_latency: u32,
    /// Clear color for the render pass. The carousel composites over the
    /// host page, so the default is fully transparent.
    pub clear_color: ClearColor,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::default(),
            present_mode: wgpu::PresentMode::Fifo,
            max_frame_latency: 2,
            clear_color: ClearColor::TRANSPARENT,
        }
    }
}

impl GpuConfig {
    /// Set power preference.
    pub fn with_power_preference(mut self, pref: wgpu::PowerPreference) -> Self {
        self.power_preference = pref;
        self
    }

    /// Set the clear color.
    pub fn with_clear_color(mut self, color: ClearColor) -> Self {
        self.clear_color = color;
        self
    }
}

/// Configuration for texture creation and sampling.
#[derive(Debug, Clone)]
pub struct TextureConfig {
    /// Magnification filter mode.
    pub mag_filter: wgpu::FilterMode,
    /// Minification filter mode.
    pub min_filter: wgpu::FilterMode,
    /// Address mode for U and V coordinates.
    pub address_mode: wgpu::AddressMode,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            address_mode: wgpu::AddressMode::ClampToEdge,
        }
    }
}

/// Clear color for render passes.
#[derive(Debug, Clone, Copy)]
pub struct ClearColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ClearColor {
    /// Transparent (default for an embedded widget).
    pub const TRANSPARENT: ClearColor = ClearColor {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };
    /// Black.
    pub const BLACK: ClearColor = ClearColor {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    /// Create a custom clear color.
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

impl From<ClearColor> for wgpu::Color {
    fn from(c: ClearColor) -> Self {
        wgpu::Color {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}
