use std::cell::RefCell;
use std::rc::Rc;

use ripple_core::extend::{Descriptor, InvokeError};
use ripple_core::signal::Signal;

#[test]
fn test_extend_attaches_value_property() {
    let signal = Signal::new();
    signal.extend(Descriptor::new().value("threshold", 10));

    assert_eq!(signal.get_prop("threshold"), Some(10));
    assert_eq!(signal.get_prop("missing"), None);
}

#[test]
fn test_extend_attaches_invocable_method() {
    let signal = Signal::new();
    signal.extend(Descriptor::new().method("double", |_signal, _scratch, args: &[i32]| {
        Some(args[0] * 2)
    }));

    assert_eq!(signal.invoke("double", &[21]), Ok(Some(42)));
}

#[test]
fn test_invoke_unknown_method_errors() {
    let signal = Signal::<i32>::new();
    assert_eq!(
        signal.invoke("nope", &[]),
        Err(InvokeError::UnknownMethod {
            name: "nope".to_string()
        })
    );
}

#[test]
fn test_methods_can_read_the_owning_signal() {
    let signal = Signal::new();
    signal.extend(Descriptor::new().method("current", |owner, _scratch, _args| owner.value()));

    signal.input(7);
    assert_eq!(signal.invoke("current", &[]), Ok(Some(7)));
}

#[test]
fn test_bind_scratch_persists_across_invocations() {
    let signal = Signal::new();
    signal.bind(Descriptor::new().method("total", |_signal, scratch, args: &[i32]| {
        let total = scratch.slots.get("sum").copied().unwrap_or(0) + args[0];
        scratch.slots.insert("sum".to_string(), total);
        Some(total)
    }));

    assert_eq!(signal.invoke("total", &[3]), Ok(Some(3)));
    assert_eq!(signal.invoke("total", &[4]), Ok(Some(7)));

    let state = signal.get_state();
    let scratch = state.aux.get("total").unwrap();
    assert_eq!(scratch.slots.get("sum"), Some(&7));
    assert_eq!(scratch.hits, 2);
}

#[test]
fn test_unbound_method_scratch_is_ephemeral() {
    let signal = Signal::new();
    signal.extend(Descriptor::new().method("count", |_signal, scratch, _args: &[i32]| {
        let n = scratch.slots.get("n").copied().unwrap_or(0) + 1;
        scratch.slots.insert("n".to_string(), n);
        Some(n)
    }));

    assert_eq!(signal.invoke("count", &[]), Ok(Some(1)));
    assert_eq!(signal.invoke("count", &[]), Ok(Some(1)));
    assert!(signal.get_state().aux.is_empty());
}

#[test]
fn test_group_entries_flatten_into_instance() {
    let signal = Signal::new();
    signal.extend(
        Descriptor::new().group(
            "limits",
            Descriptor::new().value("low", 0).value("high", 100),
        ),
    );

    assert_eq!(signal.get_prop("low"), Some(0));
    assert_eq!(signal.get_prop("high"), Some(100));
    assert_eq!(signal.get_prop("limits"), None);
}

#[test]
fn test_factory_extension_sees_the_instance() {
    let signal = Signal::<i32>::new();
    signal.prime(5);
    signal.extend_with(|owner| {
        let snapshot = owner.value().unwrap_or(0);
        Descriptor::new().value("seen_at_install", snapshot)
    });

    assert_eq!(signal.get_prop("seen_at_install"), Some(5));
}

#[test]
fn test_spawn_replays_extensions_in_order() {
    let signal = Signal::new();
    signal.extend(Descriptor::new().value("mode", 1));
    signal.extend(Descriptor::new().value("mode", 2));
    signal.bind(Descriptor::new().method("hits", |_signal, scratch, _args: &[i32]| {
        Some(scratch.hits as i32)
    }));

    let child = signal.spawn();

    // Later registration wins, same as on the parent.
    assert_eq!(child.get_prop("mode"), Some(2));
    assert_eq!(child.invoke("hits", &[]), Ok(Some(1)));
}

#[test]
fn test_spawn_replays_factories_against_each_child() {
    let parent = Signal::<i32>::new();
    let installs = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&installs);
    parent.extend_with(move |owner| {
        *sink.borrow_mut() += 1;
        Descriptor::new().value("id_seen", owner.id() as i32)
    });

    let child = parent.spawn();

    assert_eq!(*installs.borrow(), 2);
    assert_eq!(child.get_prop("id_seen"), Some(child.id() as i32));
}

#[test]
fn test_spawn_does_not_inherit_steps_or_state() {
    let signal = Signal::new();
    signal.map(|x: i32| x + 1);
    signal.input(1);

    let child = signal.spawn();
    assert_eq!(child.value(), None);
    child.input(1);
    assert_eq!(child.value(), Some(1));
}

#[test]
fn test_clone_drops_extensions() {
    let signal = Signal::new();
    signal.extend(Descriptor::new().value("flavor", 1));

    let copy = signal.clone();
    assert_eq!(copy.get_prop("flavor"), None);
}

#[test]
fn test_bound_scratch_survives_rounds() {
    let signal = Signal::new();
    signal.map(|x: i32| x + 1);
    signal.bind(Descriptor::new().method("last_seen", |owner, scratch, _args: &[i32]| {
        if let Some(v) = owner.value() {
            scratch.slots.insert("v".to_string(), v);
        }
        scratch.slots.get("v").copied()
    }));

    signal.input(1);
    assert_eq!(signal.invoke("last_seen", &[]), Ok(Some(2)));

    signal.input(10);
    assert_eq!(signal.invoke("last_seen", &[]), Ok(Some(11)));
}
