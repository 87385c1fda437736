//! Extension descriptors: named capabilities attached to a signal instance.
//!
//! A [`Descriptor`] is an ordered tree of named entries. Plain values become
//! properties, functions become invocable methods, and nested groups are
//! flattened recursively. An [`Extension`] records one registration (a
//! descriptor or a factory producing one, plus the bound/unbound mode) so it
//! can be replayed onto children spawned from the same instance.

use std::rc::Rc;

use crate::signal::Signal;
use crate::state::Scratch;

/// Error from invoking an attached capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    #[error("no method named '{name}' attached to this signal")]
    UnknownMethod { name: String },
}

/// An attached method. Receives the owning signal, a scratch record (private
/// and persistent for bound methods, ephemeral otherwise) and the call
/// arguments.
pub type MethodFn<V> = Rc<dyn Fn(&Signal<V>, &mut Scratch<V>, &[V]) -> Option<V>>;

/// A descriptor factory: invoked with the instance being extended, its result
/// is applied as a descriptor. This is how a reusable signal flavor closes
/// over the instance it decorates.
pub type FactoryFn<V> = Rc<dyn Fn(&Signal<V>) -> Descriptor<V>>;

/// One named capability in a descriptor.
#[derive(Clone)]
pub enum Capability<V> {
    /// Plain value, attached as a property.
    Value(V),
    /// Invocable method.
    Method(MethodFn<V>),
    /// Nested descriptor; its entries are attached recursively.
    Group(Descriptor<V>),
}

/// Ordered, named capability entries.
#[derive(Clone)]
pub struct Descriptor<V> {
    entries: Vec<(String, Capability<V>)>,
}

impl<V> Descriptor<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn value(mut self, name: impl Into<String>, value: V) -> Self {
        self.entries.push((name.into(), Capability::Value(value)));
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Signal<V>, &mut Scratch<V>, &[V]) -> Option<V> + 'static,
    ) -> Self {
        self.entries
            .push((name.into(), Capability::Method(Rc::new(f))));
        self
    }

    pub fn group(mut self, name: impl Into<String>, inner: Descriptor<V>) -> Self {
        self.entries.push((name.into(), Capability::Group(inner)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &[(String, Capability<V>)] {
        &self.entries
    }
}

impl<V> Default for Descriptor<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// The source of one extension registration.
#[derive(Clone)]
pub enum ExtensionSource<V> {
    Descriptor(Descriptor<V>),
    Factory(FactoryFn<V>),
}

/// One replayable extension registration: a source plus the attachment mode.
#[derive(Clone)]
pub struct Extension<V> {
    bound: bool,
    source: ExtensionSource<V>,
}

impl<V> Extension<V> {
    /// Unbound registration: methods run with a throwaway scratch record.
    pub fn unbound(descriptor: Descriptor<V>) -> Self {
        Self {
            bound: false,
            source: ExtensionSource::Descriptor(descriptor),
        }
    }

    /// Bound registration: each method gets a private scratch record
    /// persisted in the signal's state under the method name.
    pub fn bound(descriptor: Descriptor<V>) -> Self {
        Self {
            bound: true,
            source: ExtensionSource::Descriptor(descriptor),
        }
    }

    pub fn unbound_with(factory: impl Fn(&Signal<V>) -> Descriptor<V> + 'static) -> Self {
        Self {
            bound: false,
            source: ExtensionSource::Factory(Rc::new(factory)),
        }
    }

    pub fn bound_with(factory: impl Fn(&Signal<V>) -> Descriptor<V> + 'static) -> Self {
        Self {
            bound: true,
            source: ExtensionSource::Factory(Rc::new(factory)),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn source(&self) -> &ExtensionSource<V> {
        &self.source
    }
}
