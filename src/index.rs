//! The shared current-index cell.
//!
//! One cell exists per carousel. The host controller writes it (prev/next/go
//! requests); the carousel subscribes and recomputes per-item activation on
//! every write. The raw value is an unbounded integer; consumers map it to an
//! item position with [`wrap`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Map an unbounded index into `0..n` with mathematical modulo (always
/// non-negative, also for negative indices).
pub fn wrap(index: i64, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let n = n as i64;
    (((index % n) + n) % n) as usize
}

/// Circular distance between two positions in a ring of `n` items.
pub fn circular_distance(a: usize, b: usize, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let d = a.abs_diff(b);
    d.min(n - d)
}

type Subscriber = Box<dyn FnMut(i64)>;

struct IndexInner {
    value: Cell<i64>,
    subscribers: RefCell<Vec<Subscriber>>,
}

/// Observable integer cell with synchronous notification.
///
/// Cloning yields another handle to the same cell. Subscribers run on every
/// `set`, even when the value did not change, so they must be idempotent.
/// Subscribers must not call `set` or `subscribe` re-entrantly.
#[derive(Clone)]
pub struct IndexCell {
    inner: Rc<IndexInner>,
}

impl IndexCell {
    pub fn new(initial: i64) -> Self {
        Self {
            inner: Rc::new(IndexInner {
                value: Cell::new(initial),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn get(&self) -> i64 {
        self.inner.value.get()
    }

    /// Write the value and notify every subscriber synchronously.
    pub fn set(&self, value: i64) {
        self.inner.value.set(value);
        for subscriber in self.inner.subscribers.borrow_mut().iter_mut() {
            subscriber(value);
        }
    }

    pub fn subscribe(&self, subscriber: impl FnMut(i64) + 'static) {
        self.inner
            .subscribers
            .borrow_mut()
            .push(Box::new(subscriber));
    }
}

impl std::fmt::Debug for IndexCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexCell")
            .field("value", &self.get())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish()
    }
}

/// Index-change request from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Prev,
    Next,
    Go(i64),
}

impl Action {
    /// Parse a host "api" request. Unrecognized actions yield `None` and are
    /// ignored silently; `go` without an index is likewise ignored.
    pub fn from_api(action: &str, index: Option<i64>) -> Option<Self> {
        match action {
            "prev" => Some(Action::Prev),
            "next" => Some(Action::Next),
            "go" => index.map(Action::Go),
            _ => None,
        }
    }

    /// Apply this request to the shared cell.
    pub fn apply(self, cell: &IndexCell) {
        match self {
            Action::Prev => cell.set(cell.get() - 1),
            Action::Next => cell.set(cell.get() + 1),
            Action::Go(index) => cell.set(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_is_mathematical_modulo() {
        assert_eq!(wrap(0, 5), 0);
        assert_eq!(wrap(7, 5), 2);
        assert_eq!(wrap(-1, 5), 4);
        assert_eq!(wrap(-6, 5), 4);
        assert_eq!(wrap(5, 5), 0);
        assert_eq!(wrap(i64::MIN + 1, 3), wrap((i64::MIN + 1) % 3 + 3, 3));
    }

    #[test]
    fn test_wrap_empty_list() {
        assert_eq!(wrap(42, 0), 0);
    }

    #[test]
    fn test_circular_distance() {
        assert_eq!(circular_distance(0, 4, 5), 1);
        assert_eq!(circular_distance(4, 0, 5), 1);
        assert_eq!(circular_distance(0, 2, 5), 2);
        assert_eq!(circular_distance(1, 1, 5), 0);
        assert_eq!(circular_distance(0, 1, 2), 1);
    }

    #[test]
    fn test_set_notifies_even_when_unchanged() {
        let cell = IndexCell::new(3);
        let count = Rc::new(Cell::new(0));
        let count_clone = Rc::clone(&count);
        cell.subscribe(move |_| count_clone.set(count_clone.get() + 1));

        cell.set(3);
        cell.set(3);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_clone_shares_state() {
        let cell = IndexCell::new(0);
        let other = cell.clone();
        other.set(9);
        assert_eq!(cell.get(), 9);
    }

    #[test]
    fn test_action_round_trip() {
        let cell = IndexCell::new(0);
        Action::Go(7).apply(&cell);
        assert_eq!(wrap(cell.get(), 5), 2);

        let before = wrap(cell.get(), 5);
        Action::Prev.apply(&cell);
        Action::Next.apply(&cell);
        assert_eq!(wrap(cell.get(), 5), before);
    }

    #[test]
    fn test_action_prev_goes_negative_and_wraps() {
        let cell = IndexCell::new(0);
        Action::Prev.apply(&cell);
        assert_eq!(cell.get(), -1);
        assert_eq!(wrap(cell.get(), 5), 4);
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!(Action::from_api("prev", None), Some(Action::Prev));
        assert_eq!(Action::from_api("next", None), Some(Action::Next));
        assert_eq!(Action::from_api("go", Some(3)), Some(Action::Go(3)));
        assert_eq!(Action::from_api("go", None), None);
        assert_eq!(Action::from_api("shuffle", Some(1)), None);
    }
}
