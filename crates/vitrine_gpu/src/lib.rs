//! GPU layer for the vitrine carousel.
//!
//! Wraps wgpu device/queue/surface management, texture upload, the perspective
//! camera, and the textured-plane render pipeline. The carousel core never
//! talks to wgpu directly except through the types exported here.

pub mod camera;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod plane;
pub mod texture;

pub use camera::Camera;
pub use config::{ClearColor, GpuConfig, TextureConfig};
pub use context::GpuContext;
pub use error::{GpuError, Result};
pub use pipeline::{ItemUniform, PlaneDraw, PlanePipeline};
pub use plane::{PlaneGeometry, Vertex, PLANE_DIVISIONS};
pub use texture::Texture;
