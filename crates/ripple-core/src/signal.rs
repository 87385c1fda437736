//! The signal: a value cell plus an ordered chain of transformation steps,
//! re-run on every pushed value.
//!
//! A round walks a contiguous suffix of the step chain starting at a cursor
//! (0 for `input`, arbitrary for resume handles), classifies each step result
//! against the control sentinels, and resolves: ordinary values update the
//! cell and fire feed listeners, failures fire fail listeners, halts suspend
//! or silently end the round.
//!
//! Everything is single-threaded. At most one synchronous round is logically
//! in flight per signal; a suspension extends that round's lifetime, and the
//! engine provides no queuing for a second round started before an
//! asynchronous resume arrives. Overlapping rounds race on the shared cell
//! and avoiding that is the caller's responsibility.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::extend::{Capability, Descriptor, Extension, ExtensionSource, InvokeError, MethodFn};
use crate::flow::{Fail, Flow, Halt};
use crate::state::{Scratch, State};

// Diagnostic instance ids.
static NEXT_SIGNAL_ID: AtomicU64 = AtomicU64::new(1);

type StepFn<V> = Rc<dyn Fn(V) -> Flow<V>>;
type StatefulFn<V> = Rc<dyn Fn(V, &mut Scratch<V>) -> Flow<V>>;
type FeedFn<V> = Rc<dyn Fn(&V)>;
type FailFn = Rc<dyn Fn(&Fail)>;

/// A middleware layer around per-step dispatch. `next(value)` invokes the
/// next inner layer (ultimately the raw step) and returns `true` iff the
/// dispatch produced an ordinary value. A layer that never calls `next`
/// suppresses the step for that invocation.
pub type MiddlewareFn<V> = Rc<dyn Fn(&mut dyn FnMut(V) -> bool, V) -> bool>;

/// One transformation step in the chain.
enum Step<V> {
    /// Pure value-to-value function.
    Plain(StepFn<V>),
    /// Step whose scratch lives in the owning signal's state, keyed by the
    /// step's identity. Clones of the signal get independent scratch.
    Stateful { key: String, f: StatefulFn<V> },
    /// Nested child signal: the input is forwarded to the child and the step
    /// yields an empty halt; the parent resumes when the child feeds a value
    /// back through a cursor-bound resume handle (wired at registration).
    Delegate(Signal<V>),
}

impl<V> Clone for Step<V> {
    fn clone(&self) -> Self {
        match self {
            Step::Plain(f) => Step::Plain(Rc::clone(f)),
            Step::Stateful { key, f } => Step::Stateful {
                key: key.clone(),
                f: Rc::clone(f),
            },
            Step::Delegate(child) => Step::Delegate(child.handle()),
        }
    }
}

#[derive(Clone)]
struct AttachedMethod<V> {
    f: MethodFn<V>,
    bound: bool,
}

struct Core<V> {
    id: u64,
    /// Shared with clones; the chain itself is append-only.
    steps: Rc<RefCell<Vec<Step<V>>>>,
    state: RefCell<State<V>>,
    feeds: RefCell<Vec<FeedFn<V>>>,
    fails: RefCell<Vec<FailFn>>,
    /// Install order; dispatch walks it newest-first.
    middleware: RefCell<Vec<MiddlewareFn<V>>>,
    pulse: RefCell<Option<V>>,
    props: RefCell<HashMap<String, V>>,
    methods: RefCell<HashMap<String, AttachedMethod<V>>>,
    /// Extension registrations, replayed in order onto spawned children.
    log: RefCell<Vec<Extension<V>>>,
}

impl<V> Core<V> {
    fn with_steps(steps: Rc<RefCell<Vec<Step<V>>>>) -> Self {
        Self {
            id: NEXT_SIGNAL_ID.fetch_add(1, Ordering::Relaxed),
            steps,
            state: RefCell::new(State::default()),
            feeds: RefCell::new(Vec::new()),
            fails: RefCell::new(Vec::new()),
            middleware: RefCell::new(Vec::new()),
            pulse: RefCell::new(None),
            props: RefCell::new(HashMap::new()),
            methods: RefCell::new(HashMap::new()),
            log: RefCell::new(Vec::new()),
        }
    }
}

/// A reactive value-flow instance. Exclusively owned by its creator; see the
/// module docs for the concurrency contract.
pub struct Signal<V> {
    core: Rc<Core<V>>,
}

impl<V> Signal<V> {
    /// Internal handle to the same instance (listener wiring, delegate steps).
    fn handle(&self) -> Signal<V> {
        Signal {
            core: Rc::clone(&self.core),
        }
    }

    /// Diagnostic instance id.
    pub fn id(&self) -> u64 {
        self.core.id
    }
}

impl<V: Clone + 'static> Signal<V> {
    pub fn new() -> Self {
        Signal {
            core: Rc::new(Core::with_steps(Rc::new(RefCell::new(Vec::new())))),
        }
    }

    // ── Propagation ──────────────────────────────────────────────────

    /// Push a value into the signal: starts a round at index 0. The value
    /// undergoes normal classification, so a `Flow::fail` routes straight to
    /// the fail listeners.
    pub fn input(&self, value: impl Into<Flow<V>>) {
        run_round(&self.core, 0, value.into());
    }

    /// A resume handle bound past everything registered so far. Sending a
    /// value through it starts a round that runs no steps, updates the cell
    /// and fires feed listeners; steps registered afterwards run normally.
    pub fn next(&self) -> Resume<V> {
        self.resume_at(self.core.steps.borrow().len())
    }

    /// A resume handle bound to an arbitrary chain index.
    pub fn resume_at(&self, index: usize) -> Resume<V> {
        Resume {
            core: Rc::downgrade(&self.core),
            index,
        }
    }

    // ── Step registration ────────────────────────────────────────────

    /// Append a transformation step. The closure may return a plain value or
    /// any [`Flow`] sentinel.
    pub fn map<R>(&self, f: impl Fn(V) -> R + 'static) -> &Self
    where
        R: Into<Flow<V>>,
    {
        self.push_step(Step::Plain(Rc::new(move |v| f(v).into())));
        self
    }

    /// Append a delegating step: inputs are forwarded to `child`, and this
    /// signal resumes after the delegate step whenever `child` completes a
    /// round.
    pub fn map_signal(&self, child: &Signal<V>) -> &Self {
        let resume = self.resume_at(self.core.steps.borrow().len() + 1);
        child.feed(move |v| resume.send(v.clone()));
        self.push_step(Step::Delegate(child.handle()));
        self
    }

    /// Append a predicate step: a rejected value ends the round with an
    /// empty halt (cell unchanged, no listener fires).
    pub fn filter(&self, pred: impl Fn(&V) -> bool + 'static) -> &Self {
        self.map(move |v| {
            if pred(&v) {
                Flow::Next(v)
            } else {
                Flow::halt()
            }
        })
    }

    /// Append a folding step: accumulates `f(acc, v)` across rounds, starting
    /// from `seed`. The accumulator lives in this instance's state under the
    /// step's identity key, so a clone re-seeds independently.
    pub fn fold(&self, f: impl Fn(V, V) -> V + 'static, seed: V) -> &Self {
        let key = format!("fold@{}", self.core.steps.borrow().len());
        self.push_step(Step::Stateful {
            key,
            f: Rc::new(move |v, scratch: &mut Scratch<V>| {
                let acc = scratch
                    .slots
                    .remove("acc")
                    .unwrap_or_else(|| seed.clone());
                let next = f(acc, v);
                scratch.slots.insert("acc".to_string(), next.clone());
                Flow::Next(next)
            }),
        });
        self
    }

    /// Append a side-effect step that passes its input through unchanged.
    pub fn tap(&self, f: impl Fn(&V) + 'static) -> &Self {
        self.map(move |v| {
            f(&v);
            v
        })
    }

    fn push_step(&self, step: Step<V>) {
        self.core.steps.borrow_mut().push(step);
    }

    // ── Listeners ────────────────────────────────────────────────────

    /// Register a success observer, called after every ordinary round
    /// completion with the new value. Append-only.
    pub fn feed(&self, f: impl Fn(&V) + 'static) -> &Self {
        self.core.feeds.borrow_mut().push(Rc::new(f));
        self
    }

    /// Register a failure observer. A failure with no registered observer is
    /// silently dropped.
    pub fn fail(&self, f: impl Fn(&Fail) + 'static) -> &Self {
        self.core.fails.borrow_mut().push(Rc::new(f));
        self
    }

    /// Forward every ordinary completion into another signal's input.
    pub fn feed_into(&self, other: &Signal<V>) -> &Self {
        let other = other.handle();
        self.feed(move |v| other.input(v.clone()))
    }

    /// Forward every failure into another signal's input.
    pub fn fail_into(&self, other: &Signal<V>) -> &Self {
        let other = other.handle();
        self.fail(move |f| other.input(Flow::Fail(f.clone())))
    }

    // ── Cell access ──────────────────────────────────────────────────

    /// Set the cell value directly, bypassing propagation. No listener fires.
    pub fn prime(&self, value: V) -> &Self {
        self.core.state.borrow_mut().value = Some(value);
        self
    }

    /// Replace the whole state record, bypassing propagation.
    pub fn set_state(&self, state: State<V>) -> &Self {
        *self.core.state.borrow_mut() = state;
        self
    }

    /// The current cell value, if any round (or bypass) has produced one.
    pub fn value(&self) -> Option<V> {
        self.core.state.borrow().value.clone()
    }

    /// Snapshot of the full state record.
    pub fn get_state(&self) -> State<V> {
        self.core.state.borrow().clone()
    }

    /// Register an auto-reset value: after every ordinary round completion
    /// (feed listeners included) the cell is overwritten with `value`.
    /// Supports self-resetting "event" signals that are only meaningfully
    /// true for the duration of one round.
    pub fn pulse(&self, value: V) -> &Self {
        *self.core.pulse.borrow_mut() = Some(value);
        self
    }

    // ── Middleware ───────────────────────────────────────────────────

    /// Install a middleware layer around per-step dispatch. The most
    /// recently installed layer sees each dispatch first and decides whether
    /// to call through.
    pub fn apply_middleware(
        &self,
        mw: impl Fn(&mut dyn FnMut(V) -> bool, V) -> bool + 'static,
    ) -> &Self {
        self.core.middleware.borrow_mut().push(Rc::new(mw));
        self
    }

    // ── Extension / clone ────────────────────────────────────────────

    /// Attach a descriptor's capabilities to this instance (unbound).
    pub fn extend(&self, descriptor: Descriptor<V>) -> &Self {
        self.install(&Extension::unbound(descriptor))
    }

    /// Attach capabilities produced by a factory invoked with this instance.
    pub fn extend_with(&self, factory: impl Fn(&Signal<V>) -> Descriptor<V> + 'static) -> &Self {
        self.install(&Extension::unbound_with(factory))
    }

    /// Like [`extend`](Signal::extend), but each attached method receives a
    /// private scratch record persisted in this instance's state, keyed by
    /// method name.
    pub fn bind(&self, descriptor: Descriptor<V>) -> &Self {
        self.install(&Extension::bound(descriptor))
    }

    pub fn bind_with(&self, factory: impl Fn(&Signal<V>) -> Descriptor<V> + 'static) -> &Self {
        self.install(&Extension::bound_with(factory))
    }

    /// Apply one extension registration and record it for replay onto
    /// children created by [`spawn`](Signal::spawn).
    pub fn install(&self, extension: &Extension<V>) -> &Self {
        self.core.log.borrow_mut().push(extension.clone());
        let descriptor = match extension.source() {
            ExtensionSource::Descriptor(d) => d.clone(),
            ExtensionSource::Factory(f) => f(self),
        };
        self.attach(&descriptor, extension.is_bound());
        self
    }

    fn attach(&self, descriptor: &Descriptor<V>, bound: bool) {
        for (name, capability) in descriptor.entries() {
            match capability {
                Capability::Value(v) => {
                    self.core.props.borrow_mut().insert(name.clone(), v.clone());
                }
                Capability::Method(f) => {
                    self.core.methods.borrow_mut().insert(
                        name.clone(),
                        AttachedMethod {
                            f: Rc::clone(f),
                            bound,
                        },
                    );
                }
                Capability::Group(inner) => self.attach(inner, bound),
            }
        }
    }

    /// Read a property attached by an extension.
    pub fn get_prop(&self, name: &str) -> Option<V> {
        self.core.props.borrow().get(name).cloned()
    }

    /// Invoke a method attached by an extension. Bound methods receive their
    /// persistent scratch record and have their hit counter incremented.
    pub fn invoke(&self, name: &str, args: &[V]) -> Result<Option<V>, InvokeError> {
        let attached = self
            .core
            .methods
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| InvokeError::UnknownMethod {
                name: name.to_string(),
            })?;
        if attached.bound {
            let mut scratch = self
                .core
                .state
                .borrow_mut()
                .aux
                .remove(name)
                .unwrap_or_default();
            scratch.hits += 1;
            let out = (attached.f)(self, &mut scratch, args);
            self.core
                .state
                .borrow_mut()
                .aux
                .insert(name.to_string(), scratch);
            Ok(out)
        } else {
            let mut scratch = Scratch::default();
            Ok((attached.f)(self, &mut scratch, args))
        }
    }

    /// Create a child signal, replaying this instance's extension
    /// registrations onto it in order. Steps, listeners, state and pulse are
    /// not inherited.
    pub fn spawn(&self) -> Signal<V> {
        let child = Signal::new();
        let log = self.core.log.borrow().clone();
        for extension in &log {
            child.install(extension);
        }
        child
    }

    /// Duplicate this signal into a fresh, independent instance: empty cell,
    /// no listeners, no middleware, no extensions. The ordered step list is
    /// shared by reference, so steps must not depend on chain-global mutable
    /// state.
    pub fn clone(&self) -> Signal<V> {
        Signal {
            core: Rc::new(Core::with_steps(Rc::clone(&self.core.steps))),
        }
    }
}

impl<V: Clone + 'static> Default for Signal<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for Signal<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.core.id)
            .field("steps", &self.core.steps.borrow().len())
            .field("value", &self.core.state.borrow().value)
            .finish()
    }
}

/// A positional resume function: starts a fresh round at a fixed chain index.
///
/// Holds only a weak reference; sending into a dropped signal is a no-op, so
/// a pending resume never keeps an instance alive.
pub struct Resume<V> {
    core: Weak<Core<V>>,
    index: usize,
}

impl<V: Clone + 'static> Resume<V> {
    /// Start a round at the bound index. The value undergoes the same
    /// classification as `input`, so a `Flow::fail` routes to fail listeners.
    pub fn send(&self, value: impl Into<Flow<V>>) {
        if let Some(core) = self.core.upgrade() {
            run_round(&core, self.index, value.into());
        }
    }

    /// Resume with a failure carrying `message`.
    pub fn fail(&self, message: impl Into<String>) {
        self.send(Flow::fail(message));
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<V> Clone for Resume<V> {
    fn clone(&self) -> Self {
        Resume {
            core: Weak::clone(&self.core),
            index: self.index,
        }
    }
}

impl<V> fmt::Debug for Resume<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resume").field("index", &self.index).finish()
    }
}

// ── Engine ───────────────────────────────────────────────────────────
//
// The engine never holds a RefCell borrow across a user callback (step,
// middleware, listener, thunk), so steps are free to re-enter the signal.

fn run_round<V: Clone + 'static>(core: &Rc<Core<V>>, cursor: usize, entry: Flow<V>) {
    let mut i = cursor;
    let mut flow = entry;
    loop {
        match flow {
            Flow::Next(v) => {
                let step = core.steps.borrow().get(i).cloned();
                match step {
                    Some(step) => {
                        flow = dispatch(core, &step, v);
                        i += 1;
                    }
                    None => {
                        flow = Flow::Next(v);
                        break;
                    }
                }
            }
            other => {
                flow = other;
                break;
            }
        }
    }
    resolve(core, flow, i);
}

/// Run one step, through the middleware stack if installed.
fn dispatch<V: Clone + 'static>(core: &Rc<Core<V>>, step: &Step<V>, value: V) -> Flow<V> {
    let layers: Vec<MiddlewareFn<V>> = {
        let middleware = core.middleware.borrow();
        middleware.iter().rev().cloned().collect()
    };
    if layers.is_empty() {
        return apply(core, step, value);
    }

    let mut result: Option<Flow<V>> = None;
    {
        let mut innermost = |v: V| -> bool {
            let out = apply(core, step, v);
            let ordinary = out.is_ordinary();
            result = Some(out);
            ordinary
        };
        run_layers(&layers, &mut innermost, value);
    }
    // A layer that never called through suppresses the step.
    result.unwrap_or_else(|| Flow::Halt(Halt::Empty))
}

fn run_layers<V>(layers: &[MiddlewareFn<V>], inner: &mut dyn FnMut(V) -> bool, value: V) -> bool {
    match layers.split_first() {
        None => inner(value),
        Some((layer, rest)) => layer(&mut |v| run_layers(rest, &mut *inner, v), value),
    }
}

/// Raw step application.
fn apply<V: Clone + 'static>(core: &Rc<Core<V>>, step: &Step<V>, value: V) -> Flow<V> {
    match step {
        Step::Plain(f) => f(value),
        Step::Stateful { key, f } => {
            let mut scratch = core
                .state
                .borrow_mut()
                .aux
                .remove(key)
                .unwrap_or_default();
            let out = f(value, &mut scratch);
            core.state.borrow_mut().aux.insert(key.clone(), scratch);
            out
        }
        Step::Delegate(child) => {
            child.input(value);
            Flow::Halt(Halt::Empty)
        }
    }
}

/// Classify the round result and finish it.
fn resolve<V: Clone + 'static>(core: &Rc<Core<V>>, flow: Flow<V>, index: usize) {
    match flow {
        Flow::Fail(failure) => {
            let listeners: Vec<FailFn> = core.fails.borrow().clone();
            for listener in listeners {
                listener(&failure);
            }
        }
        Flow::Halt(Halt::Thunk(thunk)) => {
            let resume = Resume {
                core: Rc::downgrade(core),
                index,
            };
            thunk.call(resume);
        }
        Flow::Halt(Halt::Deferred(deferred)) => {
            let resume = Resume {
                core: Rc::downgrade(core),
                index,
            };
            deferred.on_settle(move |outcome| match outcome {
                Ok(v) => resume.send(v),
                Err(failure) => resume.send(Flow::Fail(failure)),
            });
        }
        Flow::Halt(Halt::Value(v)) => {
            // Soft update: no listener, no pulse.
            core.state.borrow_mut().value = Some(v);
        }
        Flow::Halt(Halt::Empty) => {}
        Flow::Next(v) => {
            core.state.borrow_mut().value = Some(v.clone());
            let listeners: Vec<FeedFn<V>> = core.feeds.borrow().clone();
            for listener in listeners {
                listener(&v);
            }
            let pulse = core.pulse.borrow().clone();
            if let Some(p) = pulse {
                core.state.borrow_mut().value = Some(p);
            }
        }
    }
}
