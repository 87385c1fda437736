use std::cell::RefCell;
use std::rc::Rc;

use ripple_core::flow::Flow;
use ripple_core::signal::Signal;

#[test]
fn test_middleware_passes_through() {
    let signal = Signal::new();
    signal.map(|x: i32| x + 1);
    signal.apply_middleware(|next, v| next(v));

    signal.input(1);
    assert_eq!(signal.value(), Some(2));
}

#[test]
fn test_middleware_can_transform_the_value() {
    let signal = Signal::new();
    signal.map(|x: i32| x * 2);
    signal.apply_middleware(|next, v: i32| next(v + 1));

    signal.input(1);
    assert_eq!(signal.value(), Some(4));
}

#[test]
fn test_middleware_suppression_acts_as_empty_halt() {
    let signal = Signal::new();
    signal.map(|x: i32| x + 1);
    let fed = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&fed);
    signal.feed(move |_: &i32| *sink.borrow_mut() += 1);
    signal.apply_middleware(|next, v: i32| if v >= 0 { next(v) } else { false });

    signal.prime(9);
    signal.input(-5);

    assert_eq!(signal.value(), Some(9));
    assert_eq!(*fed.borrow(), 0);

    signal.input(5);
    assert_eq!(signal.value(), Some(6));
    assert_eq!(*fed.borrow(), 1);
}

#[test]
fn test_newest_layer_sees_dispatch_first() {
    let signal = Signal::new();
    signal.map(|x: i32| x);
    let order = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&order);
    signal.apply_middleware(move |next, v: i32| {
        sink.borrow_mut().push("inner");
        next(v)
    });
    let sink = Rc::clone(&order);
    signal.apply_middleware(move |next, v: i32| {
        sink.borrow_mut().push("outer");
        next(v)
    });

    signal.input(1);
    assert_eq!(*order.borrow(), vec!["outer", "inner"]);
}

#[test]
fn test_next_reports_whether_dispatch_was_ordinary() {
    let signal = Signal::new();
    signal.map(|v: i32| if v > 0 { Flow::Next(v) } else { Flow::halt() });
    let reports = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&reports);
    signal.apply_middleware(move |next, v: i32| {
        let ordinary = next(v);
        sink.borrow_mut().push(ordinary);
        ordinary
    });

    signal.input(3);
    signal.input(-3);

    assert_eq!(*reports.borrow(), vec![true, false]);
}

#[test]
fn test_middleware_wraps_every_step_of_the_chain() {
    let signal = Signal::new();
    signal.map(|x: i32| x + 1).map(|x| x * 2);
    let calls = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&calls);
    signal.apply_middleware(move |next, v: i32| {
        *sink.borrow_mut() += 1;
        next(v)
    });

    signal.input(1);
    assert_eq!(*calls.borrow(), 2);
    assert_eq!(signal.value(), Some(4));
}

#[test]
fn test_outer_layer_can_stop_inner_layers() {
    let signal = Signal::new();
    signal.map(|x: i32| x);
    let inner_calls = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&inner_calls);
    signal.apply_middleware(move |next, v: i32| {
        *sink.borrow_mut() += 1;
        next(v)
    });
    signal.apply_middleware(|_next, _v: i32| false);

    signal.input(1);
    assert_eq!(*inner_calls.borrow(), 0);
    assert_eq!(signal.value(), None);
}
