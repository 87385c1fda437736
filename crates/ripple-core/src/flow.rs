//! Control sentinels and step-result classification.
//!
//! Every step in a signal's chain produces a [`Flow`]: an ordinary value that
//! continues the round, a [`Halt`] that suspends or silently ends it, or a
//! [`Fail`] that terminates it as an error. Ordinary steps stay pure
//! value-to-value functions; the sentinels carry all exceptional control flow,
//! so no coroutine or generator machinery is needed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::deferred::Deferred;
use crate::signal::Resume;

/// Failure sentinel. Terminates a round immediately; the cell is never
/// updated by a failure. Routed exclusively to registered fail listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("propagation failed: {message}")]
pub struct Fail {
    message: String,
}

impl Fail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A resume callback: invoked by the engine with a [`Resume`] handle bound to
/// the suspension point.
pub struct Thunk<V>(Box<dyn FnOnce(Resume<V>)>);

impl<V> Thunk<V> {
    pub fn new(f: impl FnOnce(Resume<V>) + 'static) -> Self {
        Self(Box::new(f))
    }

    pub(crate) fn call(self, resume: Resume<V>) {
        (self.0)(resume)
    }
}

impl<V> fmt::Debug for Thunk<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Thunk")
    }
}

/// Suspension sentinel. Ends or defers the current round without error.
///
/// The four variants are checked by construction rather than by field
/// priority; classification is the variant itself.
#[derive(Debug)]
pub enum Halt<V> {
    /// Suspend; the thunk receives a resume handle bound to the next index.
    Thunk(Thunk<V>),
    /// Suspend until the deferred cell settles. Rejection becomes [`Fail`].
    Deferred(Deferred<V>),
    /// Soft update: the value is written to the cell, no listener fires.
    Value(V),
    /// The round simply ends; cell unchanged, no listener fires. This is the
    /// idiom for "reject this input".
    Empty,
}

/// The three-way classification of a step result.
#[derive(Debug)]
pub enum Flow<V> {
    /// Ordinary value; propagation continues.
    Next(V),
    /// Round suspended or silently ended.
    Halt(Halt<V>),
    /// Round terminated as a failure.
    Fail(Fail),
}

impl<V> Flow<V> {
    /// Empty halt: discard the current round.
    pub fn halt() -> Self {
        Flow::Halt(Halt::Empty)
    }

    /// Forced value: write `value` to the cell without firing feed listeners.
    pub fn force(value: V) -> Self {
        Flow::Halt(Halt::Value(value))
    }

    /// Suspend the round; `f` receives a resume handle bound to the
    /// suspension point.
    pub fn suspend(f: impl FnOnce(Resume<V>) + 'static) -> Self {
        Flow::Halt(Halt::Thunk(Thunk::new(f)))
    }

    /// Suspend the round until `deferred` settles.
    pub fn wait(deferred: &Deferred<V>) -> Self {
        Flow::Halt(Halt::Deferred(deferred.clone()))
    }

    /// Terminate the round as a failure carrying `message`.
    pub fn fail(message: impl Into<String>) -> Self {
        Flow::Fail(Fail::new(message))
    }

    pub fn is_ordinary(&self) -> bool {
        matches!(self, Flow::Next(_))
    }
}

impl<V> From<V> for Flow<V> {
    fn from(value: V) -> Self {
        Flow::Next(value)
    }
}
