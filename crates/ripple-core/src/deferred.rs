//! One-shot deferred settlement cell.
//!
//! The single-threaded stand-in for a promise: a round suspended on a
//! [`Deferred`] resumes when the cell is resolved, and a rejection is
//! translated into a [`Fail`] routed to the signal's fail listeners. There is
//! no scheduler; settlement runs the continuation on the settling caller's
//! stack.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::flow::Fail;

/// Error returned when settling a cell that has already been settled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettleError {
    #[error("deferred cell already settled")]
    AlreadySettled,
}

type Waiter<V> = Box<dyn FnOnce(Result<V, Fail>)>;

struct Inner<V> {
    outcome: Option<Result<V, Fail>>,
    waiter: Option<Waiter<V>>,
    delivered: bool,
}

/// A shared, single-settlement cell. Cloning shares the cell.
pub struct Deferred<V> {
    inner: Rc<RefCell<Inner<V>>>,
}

impl<V> Deferred<V> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                outcome: None,
                waiter: None,
                delivered: false,
            })),
        }
    }

    /// Settle the cell with a value. The suspended round, if any, resumes
    /// immediately on this call stack.
    pub fn resolve(&self, value: V) -> Result<(), SettleError> {
        self.settle(Ok(value))
    }

    /// Settle the cell with a failure.
    pub fn reject(&self, message: impl Into<String>) -> Result<(), SettleError> {
        self.settle(Err(Fail::new(message)))
    }

    pub fn is_settled(&self) -> bool {
        let inner = self.inner.borrow();
        inner.delivered || inner.outcome.is_some()
    }

    fn settle(&self, outcome: Result<V, Fail>) -> Result<(), SettleError> {
        let ready = {
            let mut inner = self.inner.borrow_mut();
            if inner.delivered || inner.outcome.is_some() {
                return Err(SettleError::AlreadySettled);
            }
            match inner.waiter.take() {
                Some(waiter) => {
                    inner.delivered = true;
                    Some(waiter)
                }
                None => {
                    inner.outcome = Some(outcome);
                    return Ok(());
                }
            }
        };
        if let Some(waiter) = ready {
            waiter(outcome);
        }
        Ok(())
    }

    /// Attach the continuation. If the cell is already settled, it runs
    /// immediately. The engine attaches exactly one continuation per
    /// suspension; a second attachment replaces the first.
    pub(crate) fn on_settle(&self, f: impl FnOnce(Result<V, Fail>) + 'static) {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            match inner.outcome.take() {
                Some(outcome) => {
                    inner.delivered = true;
                    Some(outcome)
                }
                None => None,
            }
        };
        match pending {
            Some(outcome) => f(outcome),
            None => self.inner.borrow_mut().waiter = Some(Box::new(f)),
        }
    }
}

impl<V> Clone for Deferred<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V> Default for Deferred<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Deferred<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("settled", &self.is_settled())
            .finish()
    }
}
