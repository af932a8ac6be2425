//! Headless fakes for exercising the item/carousel state machine without a
//! GPU or any real media.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::media::{LoadDelivery, LoadRequest, MediaLoader, MediaSource};

/// A media source that only tracks whether it has been disposed.
pub struct FakeSource {
    disposed: Rc<Cell<bool>>,
}

impl MediaSource for FakeSource {
    fn texture(&self) -> Option<&vitrine_gpu::Texture> {
        None
    }

    fn dispose(&mut self) {
        self.disposed.set(true);
    }
}

/// A boxed fake source plus a flag observing its disposal.
pub fn tracked_source() -> (Box<dyn MediaSource>, Rc<Cell<bool>>) {
    let disposed = Rc::new(Cell::new(false));
    let source = FakeSource {
        disposed: Rc::clone(&disposed),
    };
    (Box::new(source), disposed)
}

#[derive(Default)]
pub struct FakeLoaderState {
    pub requests: Vec<LoadRequest>,
    pub pending: Vec<LoadDelivery>,
}

/// A loader that records requests and delivers whatever the test has queued.
#[derive(Clone, Default)]
pub struct FakeLoader {
    pub state: Rc<RefCell<FakeLoaderState>>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful delivery answering `request`, returning the flag
    /// observing the carried source's disposal.
    pub fn queue_success(&self, request: &LoadRequest) -> Rc<Cell<bool>> {
        let (source, disposed) = tracked_source();
        self.state.borrow_mut().pending.push(LoadDelivery {
            item_index: request.item_index,
            role: request.role,
            generation: request.generation,
            result: Ok(source),
        });
        disposed
    }

    pub fn requests(&self) -> Vec<LoadRequest> {
        self.state.borrow().requests.clone()
    }
}

impl MediaLoader for FakeLoader {
    fn request(&mut self, request: LoadRequest) {
        self.state.borrow_mut().requests.push(request);
    }

    fn poll(&mut self) -> Vec<LoadDelivery> {
        std::mem::take(&mut self.state.borrow_mut().pending)
    }
}
