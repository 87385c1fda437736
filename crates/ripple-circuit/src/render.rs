//! The two capabilities a render-cycle adapter needs from a signal: a
//! per-binding "changed since last render" predicate, and a render-state
//! accessor that triggers a one-time initialization hook when no value
//! exists yet.

use std::cell::RefCell;
use std::collections::HashMap;

use ripple_core::signal::Signal;

type InitFn<V> = Box<dyn FnOnce(&Signal<V>)>;

/// Wraps a signal for consumption by a render cycle. The adapter itself
/// (redraw scheduling, component wiring) lives outside this crate.
pub struct RenderGate<V> {
    signal: Signal<V>,
    init: RefCell<Option<InitFn<V>>>,
    seen: RefCell<HashMap<String, V>>,
}

impl<V: Clone + PartialEq + 'static> RenderGate<V> {
    /// `init` runs at most once, the first time [`view_state`] finds an empty
    /// cell; it typically feeds the signal its initial input.
    ///
    /// [`view_state`]: RenderGate::view_state
    pub fn new(signal: Signal<V>, init: impl FnOnce(&Signal<V>) + 'static) -> Self {
        Self {
            signal,
            init: RefCell::new(Some(Box::new(init))),
            seen: RefCell::new(HashMap::new()),
        }
    }

    /// Has the signal value changed since this binding last looked? Each
    /// binding tracks its own last-seen value, so independent sections of a
    /// view can be dirtied independently. An empty cell is never dirty.
    pub fn dirty(&self, binding: &str) -> bool {
        let current = match self.signal.value() {
            Some(v) => v,
            None => return false,
        };
        let mut seen = self.seen.borrow_mut();
        match seen.get(binding) {
            Some(prev) if *prev == current => false,
            _ => {
                seen.insert(binding.to_string(), current);
                true
            }
        }
    }

    /// The current render state. If no value exists yet the one-time
    /// initialization hook runs first, then the cell is re-read.
    pub fn view_state(&self) -> Option<V> {
        if self.signal.value().is_none() {
            if let Some(init) = self.init.borrow_mut().take() {
                init(&self.signal);
            }
        }
        self.signal.value()
    }

    /// The wrapped signal, for feeding values in.
    pub fn signal(&self) -> &Signal<V> {
        &self.signal
    }
}
