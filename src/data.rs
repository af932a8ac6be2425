//! Static carousel input data.
//!
//! The host provides one JSON payload per carousel instance (on the web, in
//! the element's data attribute). It is parsed once at construction and never
//! mutated afterwards.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("invalid carousel payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("item `{id}`: width and height must be positive")]
    InvalidDimensions { id: String },
}

/// Media locations and intrinsic dimensions for one item.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoSource {
    /// Video URL.
    pub combined: String,
    /// Optional preview still shown until the video is ready.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Intrinsic pixel width.
    pub width: u32,
    /// Intrinsic pixel height.
    pub height: u32,
}

/// One carousel entry, as provided by the host.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemDescriptor {
    pub id: String,
    pub video: VideoSource,
}

impl ItemDescriptor {
    /// Intrinsic aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.video.width as f32 / self.video.height as f32
    }

    /// Whether the media is taller than wide.
    pub fn is_portrait(&self) -> bool {
        self.video.height > self.video.width
    }
}

/// The full, immutable item list for one carousel.
#[derive(Debug, Clone, Deserialize)]
pub struct CarouselData {
    pub items: Vec<ItemDescriptor>,
}

impl CarouselData {
    /// Parse and validate a host JSON payload.
    pub fn from_json(payload: &str) -> Result<Self, DataError> {
        let data: CarouselData = serde_json::from_str(payload)?;
        for item in &data.items {
            if item.video.width == 0 || item.video.height == 0 {
                return Err(DataError::InvalidDimensions {
                    id: item.id.clone(),
                });
            }
        }
        Ok(data)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
