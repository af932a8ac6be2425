//! Media resource ownership and the async load pipeline.
//!
//! Each item owns one [`MediaHandle`]. Loads are issued through a
//! [`MediaLoader`] and complete on later ticks as [`LoadDelivery`] values
//! drained by the carousel. There is no true cancellation: a load that is no
//! longer wanted is detected at delivery time (the request's generation no
//! longer matches the item's) and its result is disposed instead of applied.

use thiserror::Error;
use vitrine_gpu::Texture;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("playback failure: {0}")]
    Playback(String),
}

/// Which of an item's two media slots a load targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaRole {
    /// The playable video.
    Video,
    /// The still preview image shown until the video is ready.
    Preview,
}

/// Whether an item's media is present, on its way, or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Unloaded,
    Loading,
    Loaded,
}

/// A loaded media resource (video frames or a still image) with exclusive
/// ownership of its native and GPU resources.
pub trait MediaSource {
    /// The GPU texture to render with, if one has been uploaded.
    fn texture(&self) -> Option<&Texture>;

    /// Refresh per-frame contents. Video sources upload the current frame
    /// here; still images do nothing.
    fn refresh(&mut self, _queue: &wgpu::Queue) {}

    /// Release all owned resources. Must be idempotent and safe on a
    /// partially initialized source.
    fn dispose(&mut self);
}

/// A load issued by an item. `generation` is the item's generation at issue
/// time; deliveries carrying an older generation are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub item_index: usize,
    pub role: MediaRole,
    pub url: String,
    pub generation: u64,
}

/// A completed load, routed back to its item by the carousel.
pub struct LoadDelivery {
    pub item_index: usize,
    pub role: MediaRole,
    pub generation: u64,
    pub result: Result<Box<dyn MediaSource>, MediaError>,
}

impl LoadDelivery {
    /// Dispose the carried source without applying it (stale or unroutable
    /// deliveries).
    pub fn discard(self) {
        if let Ok(mut source) = self.result {
            source.dispose();
        }
    }
}

/// Issues media loads and hands back completed deliveries.
///
/// `poll()` is called once per tick; implementations push completions into an
/// internal queue from wherever their async machinery runs.
pub trait MediaLoader {
    fn request(&mut self, request: LoadRequest);
    fn poll(&mut self) -> Vec<LoadDelivery>;
}

/// Owns an item's media: at most one video source, at most one preview
/// source, and at most one of them applied for rendering at any instant.
pub struct MediaHandle {
    video: Option<Box<dyn MediaSource>>,
    preview: Option<Box<dyn MediaSource>>,
    loading_video: bool,
    loading_preview: bool,
    applied: Option<MediaRole>,
    /// Bumped whenever the applied texture changes, so the renderer can
    /// invalidate cached bind groups.
    revision: u64,
}

impl MediaHandle {
    pub fn new() -> Self {
        Self {
            video: None,
            preview: None,
            loading_video: false,
            loading_preview: false,
            applied: None,
            revision: 0,
        }
    }

    pub fn resource_state(&self) -> ResourceState {
        if self.video.is_some() || self.preview.is_some() {
            ResourceState::Loaded
        } else if self.loading_video || self.loading_preview {
            ResourceState::Loading
        } else {
            ResourceState::Unloaded
        }
    }

    /// Mark a role as in flight. Returns false when a load for that role is
    /// already in flight or already resolved (the duplicate is dropped).
    pub fn mark_loading(&mut self, role: MediaRole) -> bool {
        match role {
            MediaRole::Video => {
                if self.loading_video || self.video.is_some() {
                    return false;
                }
                self.loading_video = true;
            }
            MediaRole::Preview => {
                if self.loading_preview || self.preview.is_some() {
                    return false;
                }
                self.loading_preview = true;
            }
        }
        true
    }

    /// Clear a role's in-flight flag (on delivery of a current-generation
    /// result; stale deliveries never touch the flags).
    pub fn clear_loading(&mut self, role: MediaRole) {
        match role {
            MediaRole::Video => self.loading_video = false,
            MediaRole::Preview => self.loading_preview = false,
        }
    }

    /// Accept a resolved video source. The video always wins: an incumbent
    /// video disposes the newcomer; otherwise the video is stored and applied
    /// (disposing a previously applied preview). Returns true when the
    /// applied texture changed.
    pub fn accept_video(&mut self, mut source: Box<dyn MediaSource>) -> bool {
        if self.video.is_some() {
            source.dispose();
            return false;
        }
        self.video = Some(source);
        self.apply(MediaRole::Video);
        true
    }

    /// Accept a resolved preview source. A preview that arrives after the
    /// video (or after another preview) is disposed immediately and never
    /// applied. Returns true when the applied texture changed.
    pub fn accept_preview(&mut self, mut source: Box<dyn MediaSource>) -> bool {
        if self.video.is_some() || self.preview.is_some() {
            source.dispose();
            return false;
        }
        self.preview = Some(source);
        self.apply(MediaRole::Preview);
        true
    }

    /// Bind a role's texture for rendering, disposing whatever was applied
    /// before in the same operation.
    fn apply(&mut self, role: MediaRole) {
        if let Some(previous) = self.applied {
            if previous != role {
                let slot = match previous {
                    MediaRole::Video => &mut self.video,
                    MediaRole::Preview => &mut self.preview,
                };
                if let Some(mut old) = slot.take() {
                    old.dispose();
                }
            }
        }
        self.applied = Some(role);
        self.revision += 1;
    }

    /// The currently applied texture, if any.
    pub fn applied_texture(&self) -> Option<&Texture> {
        self.applied_source().and_then(|s| s.texture())
    }

    fn applied_source(&self) -> Option<&Box<dyn MediaSource>> {
        match self.applied? {
            MediaRole::Video => self.video.as_ref(),
            MediaRole::Preview => self.preview.as_ref(),
        }
    }

    /// Mutable access to the applied source, for per-frame refresh.
    pub fn applied_source_mut(&mut self) -> Option<&mut Box<dyn MediaSource>> {
        match self.applied? {
            MediaRole::Video => self.video.as_mut(),
            MediaRole::Preview => self.preview.as_mut(),
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Synchronously dispose everything and reset to Unloaded. Idempotent.
    pub fn dispose_all(&mut self) {
        if let Some(mut video) = self.video.take() {
            video.dispose();
        }
        if let Some(mut preview) = self.preview.take() {
            preview.dispose();
        }
        if self.applied.take().is_some() {
            self.revision += 1;
        }
        self.loading_video = false;
        self.loading_preview = false;
    }
}

impl Default for MediaHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tracked_source;

    #[test]
    fn test_initial_state_is_unloaded() {
        let handle = MediaHandle::new();
        assert_eq!(handle.resource_state(), ResourceState::Unloaded);
        assert!(handle.applied_texture().is_none());
    }

    #[test]
    fn test_mark_loading_drops_duplicates() {
        let mut handle = MediaHandle::new();
        assert!(handle.mark_loading(MediaRole::Video));
        assert!(!handle.mark_loading(MediaRole::Video));
        // Independent role still allowed.
        assert!(handle.mark_loading(MediaRole::Preview));
        assert_eq!(handle.resource_state(), ResourceState::Loading);
    }

    #[test]
    fn test_video_applies_and_disposes_preview() {
        let mut handle = MediaHandle::new();
        let (preview, preview_disposed) = tracked_source();
        let (video, video_disposed) = tracked_source();

        assert!(handle.accept_preview(preview));
        let revision_after_preview = handle.revision();

        assert!(handle.accept_video(video));
        assert!(preview_disposed.get(), "preview must be disposed on video apply");
        assert!(!video_disposed.get());
        assert!(handle.revision() > revision_after_preview);
        assert_eq!(handle.resource_state(), ResourceState::Loaded);
    }

    #[test]
    fn test_late_preview_is_disposed_never_applied() {
        let mut handle = MediaHandle::new();
        let (video, _) = tracked_source();
        handle.accept_video(video);
        let revision = handle.revision();

        let (late_preview, disposed) = tracked_source();
        assert!(!handle.accept_preview(late_preview));
        assert!(disposed.get());
        assert_eq!(handle.revision(), revision, "late preview must not rebind");
    }

    #[test]
    fn test_duplicate_video_keeps_incumbent() {
        let mut handle = MediaHandle::new();
        let (first, first_disposed) = tracked_source();
        let (second, second_disposed) = tracked_source();

        handle.accept_video(first);
        assert!(!handle.accept_video(second));
        assert!(!first_disposed.get());
        assert!(second_disposed.get());
    }

    #[test]
    fn test_dispose_all_is_idempotent() {
        let mut handle = MediaHandle::new();
        let (video, disposed) = tracked_source();
        handle.accept_video(video);

        handle.dispose_all();
        assert!(disposed.get());
        assert_eq!(handle.resource_state(), ResourceState::Unloaded);

        // Second call must be harmless.
        handle.dispose_all();
        assert_eq!(handle.resource_state(), ResourceState::Unloaded);
    }

    #[test]
    fn test_dispose_all_clears_in_flight_flags() {
        let mut handle = MediaHandle::new();
        handle.mark_loading(MediaRole::Video);
        handle.dispose_all();
        assert_eq!(handle.resource_state(), ResourceState::Unloaded);
        // The role can be requested again afterwards.
        assert!(handle.mark_loading(MediaRole::Video));
    }
}
