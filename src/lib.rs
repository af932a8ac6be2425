//! Vitrine - interactive 3D media carousel
//!
//! A GPU-accelerated carousel of video-textured planes, embeddable in a host
//! web page or run natively for development.

pub mod carousel;
pub mod clock;
pub mod data;
pub mod index;
pub mod item;
pub mod math;
pub mod media;
pub mod render;
pub mod test_pattern;

#[cfg(not(target_arch = "wasm32"))]
pub mod demo;

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::start;

#[cfg(test)]
mod test_support;

pub use carousel::Carousel;
pub use data::{CarouselData, ItemDescriptor};
pub use index::{Action, IndexCell};
pub use item::VisualItem;
pub use media::{MediaLoader, MediaSource};
