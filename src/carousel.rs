//! Carousel orchestration: the neighbor window, the frame loop, and routing
//! between the index cell, the media loader, and the items.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use glam::Vec2;
use vitrine_gpu::Camera;

use crate::clock::Clock;
use crate::data::CarouselData;
use crate::index::{circular_distance, wrap, IndexCell};
use crate::item::{Activation, VisualItem};
use crate::math::delta_norm;
use crate::media::MediaLoader;
use crate::render::CarouselRenderer;

/// Device-pixel-ratio cap for the drawing surface.
pub const MAX_DPR: f32 = 2.0;

/// One carousel instance: all items, the shared index cell, the loader, and
/// (when attached) the renderer.
pub struct Carousel {
    items: Vec<VisualItem>,
    index: IndexCell,
    loader: Box<dyn MediaLoader>,
    clock: Clock,
    camera: Camera,
    pointer: Vec2,
    running: bool,
    renderer: Option<CarouselRenderer>,
    /// Set once the first item media has been applied.
    loaded_fired: bool,
    on_loaded: Option<Box<dyn FnMut()>>,
}

impl Carousel {
    pub fn new(data: CarouselData, index: IndexCell, loader: Box<dyn MediaLoader>) -> Self {
        let items = data
            .items
            .into_iter()
            .enumerate()
            .map(|(i, descriptor)| VisualItem::new(descriptor, i))
            .collect();
        let mut carousel = Self {
            items,
            index,
            loader,
            clock: Clock::new(),
            camera: Camera::default(),
            pointer: Vec2::ZERO,
            running: false,
            renderer: None,
            loaded_fired: false,
            on_loaded: None,
        };
        carousel.on_current_index_change();
        carousel
    }

    /// Attach the GPU renderer. Construction stays renderer-free so the state
    /// machine can run headless.
    pub fn attach_renderer(&mut self, renderer: CarouselRenderer) {
        self.renderer = Some(renderer);
    }

    /// Callback fired once, when the first media texture is applied.
    pub fn set_on_loaded(&mut self, callback: impl FnMut() + 'static) {
        self.on_loaded = Some(Box::new(callback));
    }

    /// Recompute every item's activation from the current index value.
    ///
    /// The current item and its two ring neighbors are the warm window;
    /// everything else releases its media.
    pub fn on_current_index_change(&mut self) {
        let n = self.items.len();
        if n == 0 {
            return;
        }
        let current = wrap(self.index.get(), n);
        let Self { items, loader, .. } = self;
        for (position, item) in items.iter_mut().enumerate() {
            let activation = match circular_distance(position, current, n) {
                0 => Activation::Current,
                1 => Activation::Near,
                _ => Activation::Dormant,
            };
            item.set_activation(activation);
            match activation {
                Activation::Current => {
                    item.build();
                    item.load(loader.as_mut());
                    item.activate();
                    item.show();
                }
                Activation::Near => {
                    item.build();
                    item.load(loader.as_mut());
                    item.activate();
                    item.hide();
                }
                Activation::Dormant => {
                    item.hide();
                    item.unload();
                    item.deactivate();
                }
            }
        }
    }

    /// Drain the loader and route each delivery to its item. Stale or
    /// out-of-range deliveries are disposed.
    pub fn pump_loader(&mut self) {
        for delivery in self.loader.poll() {
            match self.items.get_mut(delivery.item_index) {
                Some(item) => {
                    let applied = item.deliver(delivery);
                    if applied && !self.loaded_fired {
                        self.loaded_fired = true;
                        if let Some(callback) = self.on_loaded.as_mut() {
                            callback();
                        }
                    }
                }
                None => delivery.discard(),
            }
        }
    }

    /// Start the frame loop clock. Idempotent.
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.clock.start();
        }
    }

    /// Pause the frame loop clock. Idempotent.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.clock.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// One frame: drain deliveries, advance every item, draw.
    /// No-op while stopped.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        self.pump_loader();

        let delta = self.clock.delta();
        let elapsed = self.clock.elapsed();
        let delta_norm = delta_norm(delta);
        for item in &mut self.items {
            item.set_pointer(self.pointer);
            item.on_frame(elapsed, delta_norm);
        }

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.draw(&self.camera, &mut self.items);
        }
    }

    /// Resize the drawing surface to CSS pixels times a capped device pixel
    /// ratio, and update the camera aspect from the CSS size.
    pub fn resize(&mut self, css_width: f32, css_height: f32, dpr: f32) {
        if css_width <= 0.0 || css_height <= 0.0 {
            return;
        }
        let dpr = dpr.clamp(1.0, MAX_DPR);
        let width = (css_width * dpr).round() as u32;
        let height = (css_height * dpr).round() as u32;
        self.camera.set_aspect(css_width / css_height);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(width, height);
        }
    }

    /// Latest normalized pointer position in `[-1, 1]²`, forwarded to every
    /// item on the next tick.
    pub fn set_pointer(&mut self, pointer: Vec2) {
        self.pointer = pointer;
    }

    /// Tear everything down. The carousel accepts no further work.
    pub fn destroy(&mut self) {
        self.stop();
        for item in &mut self.items {
            item.destroy();
        }
        self.renderer = None;
    }

    /// Ring position of the current item.
    pub fn current_position(&self) -> usize {
        wrap(self.index.get(), self.items.len())
    }

    pub fn item(&self, position: usize) -> Option<&VisualItem> {
        self.items.get(position)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Subscribe a shared carousel to its own index cell. Held weakly, so the
/// subscription does not keep the carousel alive.
pub fn subscribe_shared(carousel: &Rc<RefCell<Carousel>>, index: &IndexCell) {
    let weak: Weak<RefCell<Carousel>> = Rc::downgrade(carousel);
    index.subscribe(move |_| {
        if let Some(carousel) = weak.upgrade() {
            carousel.borrow_mut().on_current_index_change();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ResourceState;
    use crate::test_support::FakeLoader;

    fn data(n: usize) -> CarouselData {
        let items: Vec<String> = (0..n)
            .map(|i| {
                format!(
                    r#"{{"id": "item-{i}", "video": {{"combined": "v{i}.mp4", "width": 16, "height": 9}}}}"#
                )
            })
            .collect();
        let payload = format!(r#"{{"items": [{}]}}"#, items.join(","));
        CarouselData::from_json(&payload).unwrap()
    }

    fn carousel(n: usize, initial: i64) -> (Rc<RefCell<Carousel>>, FakeLoader, IndexCell) {
        let loader = FakeLoader::new();
        let index = IndexCell::new(initial);
        let carousel = Rc::new(RefCell::new(Carousel::new(
            data(n),
            index.clone(),
            Box::new(loader.clone()),
        )));
        subscribe_shared(&carousel, &index);
        (carousel, loader, index)
    }

    fn activations(carousel: &Carousel) -> Vec<Activation> {
        (0..carousel.len())
            .map(|i| carousel.item(i).unwrap().activation())
            .collect()
    }

    #[test]
    fn test_neighbor_window_around_index_zero() {
        let (carousel, _, _) = carousel(5, 0);
        let carousel = carousel.borrow();
        assert_eq!(
            activations(&carousel),
            vec![
                Activation::Current,
                Activation::Near,
                Activation::Dormant,
                Activation::Dormant,
                Activation::Near,
            ]
        );
        assert_eq!(
            carousel.item(2).unwrap().resource_state(),
            ResourceState::Unloaded
        );
        assert_eq!(
            carousel.item(0).unwrap().resource_state(),
            ResourceState::Loading
        );
    }

    #[test]
    fn test_window_size_for_small_rings() {
        for n in 1..=4 {
            let (carousel, _, _) = carousel(n, 0);
            let carousel = carousel.borrow();
            let warm = activations(&carousel)
                .iter()
                .filter(|a| **a != Activation::Dormant)
                .count();
            assert_eq!(warm, n.min(3), "ring of {n}");
            let current = activations(&carousel)
                .iter()
                .filter(|a| **a == Activation::Current)
                .count();
            assert_eq!(current, 1, "ring of {n}");
        }
    }

    #[test]
    fn test_negative_and_large_indices_wrap() {
        let (carousel, _, index) = carousel(5, 0);
        index.set(-1);
        assert_eq!(carousel.borrow().current_position(), 4);
        index.set(12);
        assert_eq!(carousel.borrow().current_position(), 2);
        let carousel = carousel.borrow();
        let current = activations(&carousel)
            .iter()
            .filter(|a| **a == Activation::Current)
            .count();
        assert_eq!(current, 1);
    }

    #[test]
    fn test_empty_carousel_is_inert() {
        let (carousel, loader, index) = carousel(0, 0);
        index.set(5);
        carousel.borrow_mut().start();
        carousel.borrow_mut().tick();
        assert!(loader.requests().is_empty());
        assert!(carousel.borrow().is_empty());
    }

    #[test]
    fn test_advance_evicts_far_item_and_disposes_stale_load() {
        let (carousel, loader, index) = carousel(5, 0);

        // Item 4 (a neighbor of 0) has a video load in flight.
        let request = loader
            .requests()
            .iter()
            .find(|r| r.item_index == 4)
            .cloned()
            .unwrap();
        let disposed = loader.queue_success(&request);

        // Move far enough that item 4 leaves the window before delivery.
        index.set(2);
        {
            let mut carousel = carousel.borrow_mut();
            carousel.start();
            carousel.tick();
        }

        assert!(disposed.get(), "stale delivery must be disposed");
        let carousel = carousel.borrow();
        assert_eq!(carousel.item(4).unwrap().activation(), Activation::Dormant);
        assert_eq!(
            carousel.item(4).unwrap().resource_state(),
            ResourceState::Unloaded
        );
    }

    #[test]
    fn test_current_delivery_is_applied_and_fires_loaded_once() {
        let (carousel, loader, _) = carousel(3, 0);
        let fired = Rc::new(std::cell::Cell::new(0));
        {
            let fired = Rc::clone(&fired);
            carousel
                .borrow_mut()
                .set_on_loaded(move || fired.set(fired.get() + 1));
        }

        let requests = loader.requests();
        for request in &requests {
            loader.queue_success(request);
        }
        {
            let mut carousel = carousel.borrow_mut();
            carousel.start();
            carousel.tick();
            carousel.tick();
        }

        assert_eq!(fired.get(), 1);
        assert_eq!(
            carousel.borrow().item(0).unwrap().resource_state(),
            ResourceState::Loaded
        );
    }

    #[test]
    fn test_returning_item_reloads() {
        let (carousel, loader, index) = carousel(5, 0);
        let before = loader
            .requests()
            .iter()
            .filter(|r| r.item_index == 0)
            .count();

        index.set(2); // evicts item 0
        index.set(0); // brings it back

        let after: Vec<_> = loader
            .requests()
            .into_iter()
            .filter(|r| r.item_index == 0)
            .collect();
        assert!(after.len() > before);
        // The re-request carries the bumped generation.
        assert!(after.last().unwrap().generation > after.first().unwrap().generation);
    }

    #[test]
    fn test_start_stop_idempotent_and_tick_gated() {
        let (carousel, _, _) = carousel(3, 0);
        let mut carousel = carousel.borrow_mut();
        carousel.tick(); // not running yet: no-op
        assert!(!carousel.is_running());

        carousel.start();
        carousel.start();
        assert!(carousel.is_running());

        carousel.stop();
        carousel.stop();
        assert!(!carousel.is_running());
    }

    #[test]
    fn test_destroy_discards_everything() {
        let (carousel, loader, _) = carousel(3, 0);
        let requests = loader.requests();
        let disposed = loader.queue_success(&requests[0]);

        let mut carousel = carousel.borrow_mut();
        carousel.start();
        carousel.destroy();
        assert!(!carousel.is_running());

        // A late delivery after destroy is disposed, not applied.
        carousel.start();
        carousel.tick();
        assert!(disposed.get());
        assert_eq!(
            carousel.item(0).unwrap().resource_state(),
            ResourceState::Unloaded
        );
    }

    #[test]
    fn test_pointer_forwarded_to_items() {
        let (carousel, _, _) = carousel(1, 0);
        let mut carousel = carousel.borrow_mut();
        carousel.set_pointer(Vec2::new(1.0, 0.0));
        carousel.start();
        for _ in 0..2000 {
            carousel.tick();
        }
        // With the pointer pinned right, the current item tilts.
        assert!(carousel.item(0).unwrap().model_matrix() != glam::Mat4::IDENTITY);
    }
}
