//! Value cell and per-method auxiliary records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Private scratch record for one bound method or stateful step.
///
/// Named value slots hold whatever the method accumulates between
/// invocations; `hits` is maintained by the engine and counts bound
/// invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scratch<V> {
    pub slots: HashMap<String, V>,
    pub hits: u64,
}

impl<V> Default for Scratch<V> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            hits: 0,
        }
    }
}

/// The full state record of a signal: the current value plus auxiliary
/// scratch records keyed by method or step identity.
///
/// Mutated only by the propagation engine, or directly through the bypass
/// operations (`prime` / `set_state`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State<V> {
    pub value: Option<V>,
    pub aux: HashMap<String, Scratch<V>>,
}

impl<V> State<V> {
    pub fn with_value(value: V) -> Self {
        Self {
            value: Some(value),
            aux: HashMap::new(),
        }
    }
}

impl<V> Default for State<V> {
    fn default() -> Self {
        Self {
            value: None,
            aux: HashMap::new(),
        }
    }
}
