//! The circuit: an application-level signal factory.
//!
//! Extensions registered on a circuit are installed, in registration order,
//! on every signal the circuit creates. Because installation also records the
//! registration in the signal's own extension log, instances spawned from
//! those signals inherit the same flavor.

use std::cell::RefCell;

use ripple_core::extend::{Descriptor, Extension};
use ripple_core::flow::Flow;
use ripple_core::signal::Signal;

pub struct Circuit<V> {
    extensions: RefCell<Vec<Extension<V>>>,
}

impl<V: Clone + 'static> Circuit<V> {
    pub fn new() -> Self {
        Self {
            extensions: RefCell::new(Vec::new()),
        }
    }

    /// Register an unbound extension for every future signal.
    pub fn extend(&self, descriptor: Descriptor<V>) -> &Self {
        self.register(Extension::unbound(descriptor))
    }

    /// Register a bound extension for every future signal.
    pub fn bind(&self, descriptor: Descriptor<V>) -> &Self {
        self.register(Extension::bound(descriptor))
    }

    /// Register an unbound factory extension, invoked with each new instance.
    pub fn extend_with(&self, factory: impl Fn(&Signal<V>) -> Descriptor<V> + 'static) -> &Self {
        self.register(Extension::unbound_with(factory))
    }

    pub fn bind_with(&self, factory: impl Fn(&Signal<V>) -> Descriptor<V> + 'static) -> &Self {
        self.register(Extension::bound_with(factory))
    }

    fn register(&self, extension: Extension<V>) -> &Self {
        self.extensions.borrow_mut().push(extension);
        self
    }

    /// Create a signal carrying every registered extension.
    pub fn signal(&self) -> Signal<V> {
        let signal = Signal::new();
        for extension in self.extensions.borrow().iter() {
            signal.install(extension);
        }
        signal
    }

    /// Create a signal with an initial map step.
    pub fn signal_from<R>(&self, f: impl Fn(V) -> R + 'static) -> Signal<V>
    where
        R: Into<Flow<V>>,
    {
        let signal = self.signal();
        signal.map(f);
        signal
    }

    pub fn extension_count(&self) -> usize {
        self.extensions.borrow().len()
    }
}

impl<V: Clone + 'static> Default for Circuit<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_circuit_has_no_extensions() {
        let circuit = Circuit::<i32>::new();
        assert_eq!(circuit.extension_count(), 0);
    }

    #[test]
    fn test_registrations_accumulate() {
        let circuit = Circuit::<i32>::new();
        circuit
            .extend(Descriptor::new().value("a", 1))
            .bind(Descriptor::new().value("b", 2));
        assert_eq!(circuit.extension_count(), 2);
    }
}
