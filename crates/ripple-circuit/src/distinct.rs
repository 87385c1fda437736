//! Change-gated propagation: middleware that lets a value through only when
//! it differs from the last one seen, per an injected comparison.
//!
//! Intended as an entry gate on short chains (install it on a signal whose
//! first step should only run on fresh values); with a multi-step chain the
//! single last-seen slot applies to every dispatch of that signal.

use std::cell::RefCell;

/// Middleware passing a value through only when `diff` reports it changed.
/// `diff` receives the last value that passed (if any) and the candidate.
pub fn changed<V, F>(diff: F) -> impl Fn(&mut dyn FnMut(V) -> bool, V) -> bool
where
    V: Clone + 'static,
    F: Fn(Option<&V>, &V) -> bool + 'static,
{
    let last = RefCell::new(None::<V>);
    move |next, v| {
        let differs = {
            let seen = last.borrow();
            diff(seen.as_ref(), &v)
        };
        if differs {
            *last.borrow_mut() = Some(v.clone());
            next(v)
        } else {
            false
        }
    }
}

/// [`changed`] with plain inequality as the comparison.
pub fn changed_eq<V>() -> impl Fn(&mut dyn FnMut(V) -> bool, V) -> bool
where
    V: Clone + PartialEq + 'static,
{
    changed(|seen, v| seen.map_or(true, |s| s != v))
}
