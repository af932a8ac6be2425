//! A single carousel item: activation state, media lifecycle, and the
//! per-frame transform chain.

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

use crate::data::ItemDescriptor;
use crate::math::damp;
use crate::media::{
    LoadDelivery, LoadRequest, MediaHandle, MediaLoader, MediaRole, ResourceState,
};

/// Base plane scale for portrait media.
pub const SCALE_PORTRAIT: f32 = 5.0;
/// Base plane scale for landscape media.
pub const SCALE_LANDSCAPE: f32 = 9.0;

/// Where a hidden item's transition rests: shrunk at the origin, invisible.
const TRANSITION_OUT_POSITION: Vec3 = Vec3::ZERO;
const TRANSITION_OUT_SCALE: Vec3 = Vec3::splat(3.0);
const TRANSITION_OUT_OPACITY: f32 = 0.0;

/// Per-target-rate-frame blend factors.
const LERP_INPUT_ROTATION: f32 = 0.005;
const LERP_TRANSITION: f32 = 0.06;

/// Radians of idle sway on each axis.
const AUTO_ROTATION_AMPLITUDE: f32 = 0.2;
/// Radians of pointer-driven tilt at the viewport edge.
const POINTER_ROTATION_RANGE: f32 = 0.6;

/// How close an item is to the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Outside the neighbor window: no resources, not rendered.
    Dormant,
    /// Adjacent to the current item: resources warm, not shown.
    Near,
    /// The current item: shown.
    Current,
}

/// The item's animated transform state. Every component eases toward its
/// target independently; the model matrix composes them in a fixed order.
#[derive(Debug, Clone)]
pub struct TransformChain {
    pub transition_position: Vec3,
    pub transition_scale: Vec3,
    /// Pointer-driven tilt (x, y), in radians.
    pub input_rotation: Vec2,
    /// Idle sway, in radians, driven directly from elapsed time.
    pub auto_rotation: Vec3,
    pub base_scale: f32,
}

impl TransformChain {
    fn new(base_scale: f32) -> Self {
        Self {
            transition_position: TRANSITION_OUT_POSITION,
            transition_scale: TRANSITION_OUT_SCALE,
            input_rotation: Vec2::ZERO,
            auto_rotation: Vec3::ZERO,
            base_scale,
        }
    }

    /// Compose translation, transition scale, pointer tilt, idle sway, and
    /// base scale into one model matrix.
    pub fn model_matrix(&self) -> Mat4 {
        let input = Quat::from_euler(
            EulerRot::XYZ,
            self.input_rotation.x,
            self.input_rotation.y,
            0.0,
        );
        let auto = Quat::from_euler(
            EulerRot::XYZ,
            self.auto_rotation.x,
            self.auto_rotation.y,
            self.auto_rotation.z,
        );
        Mat4::from_translation(self.transition_position)
            * Mat4::from_scale(self.transition_scale)
            * Mat4::from_quat(input)
            * Mat4::from_quat(auto)
            * Mat4::from_scale(Vec3::splat(self.base_scale))
    }
}

/// FNV-1a hash of the item id, folded into `[0, 1)`. Gives each item a
/// stable, distinct idle-sway phase without a random number generator.
fn seed_from_id(id: &str) -> f32 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in id.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % 10_000) as f32 / 10_000.0
}

/// One carousel entry with its full lifecycle: built once, activated and
/// shown as the current index moves, media loaded and unloaded with the
/// neighbor window, destroyed at teardown.
pub struct VisualItem {
    descriptor: ItemDescriptor,
    index: usize,
    seed: f32,
    activation: Activation,
    /// Whether the transition targets are the shown ones.
    shown: bool,
    /// Whether the item participates in rendering at all.
    visible: bool,
    built: bool,
    destroyed: bool,
    /// Bumped on every unload/destroy; deliveries from older generations are
    /// disposed instead of applied.
    generation: u64,
    media: MediaHandle,
    chain: TransformChain,
    opacity: f32,
    /// Latest normalized pointer position in `[-1, 1]²`.
    pointer: Vec2,
}

impl VisualItem {
    pub fn new(descriptor: ItemDescriptor, index: usize) -> Self {
        let base_scale = if descriptor.is_portrait() {
            SCALE_PORTRAIT
        } else {
            SCALE_LANDSCAPE
        };
        let seed = seed_from_id(&descriptor.id);
        Self {
            descriptor,
            index,
            seed,
            activation: Activation::Dormant,
            shown: false,
            visible: false,
            built: false,
            destroyed: false,
            generation: 0,
            media: MediaHandle::new(),
            chain: TransformChain::new(base_scale),
            opacity: TRANSITION_OUT_OPACITY,
            pointer: Vec2::ZERO,
        }
    }

    /// One-time setup. Later calls are no-ops, so activation changes can call
    /// it unconditionally.
    pub fn build(&mut self) {
        if self.built {
            return;
        }
        self.built = true;
    }

    pub fn set_activation(&mut self, activation: Activation) {
        self.activation = activation;
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Begin transitioning in. The easing happens over subsequent frames.
    pub fn show(&mut self) {
        self.shown = true;
    }

    /// Begin transitioning out.
    pub fn hide(&mut self) {
        self.shown = false;
    }

    /// Enter the rendered set.
    pub fn activate(&mut self) {
        self.visible = true;
    }

    /// Leave the rendered set immediately.
    pub fn deactivate(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Request the item's media. Idempotent per role: a role already loading
    /// or loaded is not requested again.
    pub fn load(&mut self, loader: &mut dyn MediaLoader) {
        if self.destroyed {
            return;
        }
        if self.media.mark_loading(MediaRole::Video) {
            loader.request(LoadRequest {
                item_index: self.index,
                role: MediaRole::Video,
                url: self.descriptor.video.combined.clone(),
                generation: self.generation,
            });
        }
        if let Some(thumbnail) = self.descriptor.video.thumbnail.clone() {
            if self.media.mark_loading(MediaRole::Preview) {
                loader.request(LoadRequest {
                    item_index: self.index,
                    role: MediaRole::Preview,
                    url: thumbnail,
                    generation: self.generation,
                });
            }
        }
    }

    /// Route a completed load to this item. Returns true when the delivery
    /// changed the applied texture. Deliveries from a previous generation, or
    /// arriving after destroy, are disposed without being applied.
    pub fn deliver(&mut self, delivery: LoadDelivery) -> bool {
        if self.destroyed || delivery.generation != self.generation {
            log::debug!(
                "item {}: disposing stale {:?} delivery (generation {} != {})",
                self.index,
                delivery.role,
                delivery.generation,
                self.generation
            );
            delivery.discard();
            return false;
        }
        self.media.clear_loading(delivery.role);
        match delivery.result {
            Ok(source) => match delivery.role {
                MediaRole::Video => self.media.accept_video(source),
                MediaRole::Preview => self.media.accept_preview(source),
            },
            Err(error) => {
                log::warn!(
                    "item {}: {:?} load failed: {}",
                    self.index,
                    delivery.role,
                    error
                );
                false
            }
        }
    }

    /// Release all media and invalidate in-flight loads. Safe to call while
    /// loads are pending and safe to call repeatedly.
    pub fn unload(&mut self) {
        self.generation += 1;
        self.media.dispose_all();
    }

    /// Final teardown. The item accepts no further loads or deliveries.
    pub fn destroy(&mut self) {
        self.unload();
        self.deactivate();
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn set_pointer(&mut self, pointer: Vec2) {
        self.pointer = pointer;
    }

    /// Advance the animated state by one frame.
    ///
    /// `elapsed` is total running seconds (drives the idle sway directly);
    /// `delta_norm` is the frame-rate normalization factor for the eased
    /// components.
    pub fn on_frame(&mut self, elapsed: f32, delta_norm: f32) {
        // Idle sway: absolute function of time, phase-shifted per item.
        let phase = self.seed * 10.0;
        self.chain.auto_rotation = Vec3::new(
            (elapsed).sin() * AUTO_ROTATION_AMPLITUDE,
            (elapsed + phase + 12.0).sin() * AUTO_ROTATION_AMPLITUDE,
            (elapsed + phase + 3.0).sin() * AUTO_ROTATION_AMPLITUDE,
        );

        // Pointer tilt eases slowly toward the pointer; y is inverted so the
        // plane leans toward the cursor.
        let tilt_target = Vec2::new(
            self.pointer.x * POINTER_ROTATION_RANGE,
            self.pointer.y * -POINTER_ROTATION_RANGE,
        );
        self.chain.input_rotation.x = damp(
            self.chain.input_rotation.x,
            tilt_target.x,
            LERP_INPUT_ROTATION,
            delta_norm,
        );
        self.chain.input_rotation.y = damp(
            self.chain.input_rotation.y,
            tilt_target.y,
            LERP_INPUT_ROTATION,
            delta_norm,
        );

        // Show/hide transition eases faster.
        let (position_target, scale_target, opacity_target) = if self.shown {
            (Vec3::ZERO, Vec3::ONE, 1.0)
        } else {
            (
                TRANSITION_OUT_POSITION,
                TRANSITION_OUT_SCALE,
                TRANSITION_OUT_OPACITY,
            )
        };
        for axis in 0..3 {
            self.chain.transition_position[axis] = damp(
                self.chain.transition_position[axis],
                position_target[axis],
                LERP_TRANSITION,
                delta_norm,
            );
            self.chain.transition_scale[axis] = damp(
                self.chain.transition_scale[axis],
                scale_target[axis],
                LERP_TRANSITION,
                delta_norm,
            );
        }
        self.opacity = damp(self.opacity, opacity_target, LERP_TRANSITION, delta_norm);
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.chain.model_matrix()
    }

    pub fn resource_state(&self) -> ResourceState {
        self.media.resource_state()
    }

    pub fn descriptor(&self) -> &ItemDescriptor {
        &self.descriptor
    }

    pub fn seed(&self) -> f32 {
        self.seed
    }

    pub fn media(&self) -> &MediaHandle {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut MediaHandle {
        &mut self.media
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaError;
    use crate::test_support::{tracked_source, FakeLoader};

    fn descriptor(id: &str, thumbnail: bool) -> ItemDescriptor {
        let payload = if thumbnail {
            format!(
                r#"{{"id": "{id}", "video": {{"combined": "v.mp4", "thumbnail": "t.jpg", "width": 16, "height": 9}}}}"#
            )
        } else {
            format!(
                r#"{{"id": "{id}", "video": {{"combined": "v.mp4", "width": 9, "height": 16}}}}"#
            )
        };
        serde_json::from_str(&payload).unwrap()
    }

    #[test]
    fn test_base_scale_follows_orientation() {
        let landscape = VisualItem::new(descriptor("a", true), 0);
        let portrait = VisualItem::new(descriptor("b", false), 1);
        assert_eq!(landscape.chain.base_scale, SCALE_LANDSCAPE);
        assert_eq!(portrait.chain.base_scale, SCALE_PORTRAIT);
    }

    #[test]
    fn test_load_issues_one_request_per_role() {
        let mut loader = FakeLoader::new();
        let mut item = VisualItem::new(descriptor("a", true), 0);
        item.load(&mut loader);
        item.load(&mut loader);

        let requests = loader.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].role, MediaRole::Video);
        assert_eq!(requests[1].role, MediaRole::Preview);
    }

    #[test]
    fn test_no_preview_request_without_thumbnail() {
        let mut loader = FakeLoader::new();
        let mut item = VisualItem::new(descriptor("a", false), 0);
        item.load(&mut loader);
        assert_eq!(loader.requests().len(), 1);
        assert_eq!(loader.requests()[0].role, MediaRole::Video);
    }

    #[test]
    fn test_unload_mid_flight_disposes_late_delivery() {
        let mut loader = FakeLoader::new();
        let mut item = VisualItem::new(descriptor("a", true), 0);
        item.load(&mut loader);
        let request = loader.requests()[0].clone();

        item.unload();

        let (source, disposed) = tracked_source();
        let applied = item.deliver(LoadDelivery {
            item_index: request.item_index,
            role: request.role,
            generation: request.generation,
            result: Ok(source),
        });
        assert!(!applied);
        assert!(disposed.get());
        assert_eq!(item.resource_state(), ResourceState::Unloaded);
    }

    #[test]
    fn test_reload_after_unload_uses_new_generation() {
        let mut loader = FakeLoader::new();
        let mut item = VisualItem::new(descriptor("a", false), 0);
        item.load(&mut loader);
        item.unload();
        item.load(&mut loader);

        let requests = loader.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].generation > requests[0].generation);

        let (source, disposed) = tracked_source();
        assert!(item.deliver(LoadDelivery {
            item_index: 0,
            role: MediaRole::Video,
            generation: requests[1].generation,
            result: Ok(source),
        }));
        assert!(!disposed.get());
        assert_eq!(item.resource_state(), ResourceState::Loaded);
    }

    #[test]
    fn test_destroyed_item_discards_deliveries_and_loads() {
        let mut loader = FakeLoader::new();
        let mut item = VisualItem::new(descriptor("a", false), 0);
        item.destroy();
        item.load(&mut loader);
        assert!(loader.requests().is_empty());

        let (source, disposed) = tracked_source();
        assert!(!item.deliver(LoadDelivery {
            item_index: 0,
            role: MediaRole::Video,
            generation: item.generation,
            result: Ok(source),
        }));
        assert!(disposed.get());
    }

    #[test]
    fn test_failed_load_allows_retry() {
        let mut loader = FakeLoader::new();
        let mut item = VisualItem::new(descriptor("a", false), 0);
        item.load(&mut loader);

        item.deliver(LoadDelivery {
            item_index: 0,
            role: MediaRole::Video,
            generation: 0,
            result: Err(MediaError::Network("offline".into())),
        });
        assert_eq!(item.resource_state(), ResourceState::Unloaded);

        item.load(&mut loader);
        assert_eq!(loader.requests().len(), 2);
    }

    #[test]
    fn test_seed_is_stable_and_distinct() {
        let a1 = seed_from_id("alpha");
        let a2 = seed_from_id("alpha");
        let b = seed_from_id("beta");
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert!((0.0..1.0).contains(&a1));
    }

    #[test]
    fn test_show_transition_approaches_full_opacity() {
        let mut item = VisualItem::new(descriptor("a", false), 0);
        item.show();
        for frame in 0..600 {
            item.on_frame(frame as f32 / 60.0, 1.0);
        }
        assert!(item.opacity() > 0.99);
        let position = item.chain.transition_position;
        assert!(position.length() < 0.01);
        assert!((item.chain.transition_scale.x - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_hide_transition_returns_to_rest() {
        let mut item = VisualItem::new(descriptor("a", false), 0);
        item.show();
        for frame in 0..600 {
            item.on_frame(frame as f32 / 60.0, 1.0);
        }
        item.hide();
        for frame in 600..1200 {
            item.on_frame(frame as f32 / 60.0, 1.0);
        }
        assert!(item.opacity() < 0.01);
        assert!((item.chain.transition_scale.x - TRANSITION_OUT_SCALE.x).abs() < 0.01);
    }

    #[test]
    fn test_pointer_tilt_is_bounded() {
        let mut item = VisualItem::new(descriptor("a", false), 0);
        item.set_pointer(Vec2::new(1.0, 1.0));
        for frame in 0..6000 {
            item.on_frame(frame as f32 / 60.0, 1.0);
        }
        assert!(item.chain.input_rotation.x <= POINTER_ROTATION_RANGE + 1e-3);
        // y is inverted.
        assert!(item.chain.input_rotation.y < 0.0);
    }
}
