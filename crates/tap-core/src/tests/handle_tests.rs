use super::*;
use crate::callback::Callback;
use crate::commit::Cleanup;
use crate::error::ResourceError;
use crate::hooks::tap_effect;
use std::cell::Cell;

#[derive(Clone, Debug, PartialEq)]
struct Counter {
    n: i32,
    inc: Callback,
}

fn counter(step: i32) -> Counter {
    let (n, set) = tap_state(|| 0);
    Counter {
        n,
        inc: Callback::new(move |()| set.update(|value| value + step)),
    }
}

type Pair = (i32, StateSetter<i32>);

fn pair(_: ()) -> Pair {
    tap_state(|| 0)
}

fn counting_listener(handle: &ResourceHandle<(), Pair>) -> (Subscription, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let subscription = handle.subscribe(move || counter.set(counter.get() + 1));
    (subscription, calls)
}

#[test]
fn counter_increments_are_batched_into_one_flush() {
    let runtime = Runtime::default();
    let handle = runtime
        .create_resource(resource(counter).element(2))
        .expect("create");
    assert_eq!(handle.get_state().n, 0);

    let inc = handle.get_state().inc;
    inc.call(());
    inc.call(());
    assert_eq!(handle.get_state().n, 0);
    assert!(handle.is_dirty());

    assert_eq!(runtime.flush(), Ok(1));
    assert_eq!(handle.get_state().n, 4);
}

#[test]
fn subscribers_only_hear_real_changes() {
    let runtime = Runtime::default();
    let handle = runtime
        .create_resource(resource(pair).element(()))
        .expect("create");
    let (_subscription, calls) = counting_listener(&handle);
    let set = handle.get_state().1;

    set.set(0);
    assert_eq!(runtime.flush(), Ok(0));
    assert_eq!(calls.get(), 0);

    set.set(1);
    runtime.flush().expect("flush");
    assert_eq!(calls.get(), 1);
    assert_eq!(handle.get_state().0, 1);

    // A rerender that produces an equal value stays silent.
    handle.update_input(());
    assert_eq!(runtime.flush(), Ok(1));
    assert_eq!(calls.get(), 1);
}

#[test]
fn unsubscribed_listeners_stop_hearing() {
    let runtime = Runtime::default();
    let handle = runtime
        .create_resource(resource(pair).element(()))
        .expect("create");
    let (subscription, calls) = counting_listener(&handle);
    let set = handle.get_state().1;

    set.set(1);
    runtime.flush().expect("flush");
    subscription.unsubscribe();
    set.set(2);
    runtime.flush().expect("flush");
    assert_eq!(calls.get(), 1);
}

#[test]
fn listeners_read_the_new_state() {
    let runtime = Runtime::default();
    let handle = runtime
        .create_resource(resource(pair).element(()))
        .expect("create");
    let seen = Rc::new(Cell::new(None));
    let record = seen.clone();
    let reader = handle.clone();
    let subscription = handle.subscribe(move || record.set(Some(reader.get_state().0)));

    handle.get_state().1.set(7);
    runtime.flush().expect("flush");
    assert_eq!(seen.get(), Some(7));
    subscription.unsubscribe();
}

#[test]
fn update_input_applies_on_flush() {
    let runtime = Runtime::default();
    let handle = runtime
        .create_resource(resource(|value: i32| value * 2).element(1))
        .expect("create");
    assert_eq!(handle.get_state(), 2);

    handle.update_input(5);
    assert_eq!(handle.get_state(), 2);
    runtime.flush().expect("flush");
    assert_eq!(handle.get_state(), 10);
}

#[test]
fn effects_can_schedule_follow_up_updates() {
    let runtime = Runtime::default();
    let handle = runtime
        .create_resource(
            resource(|_: ()| {
                let (value, set) = tap_state(|| 0);
                tap_effect(move || {
                    if value == 0 {
                        set.set(1);
                    }
                });
                value
            })
            .element(()),
        )
        .expect("create");
    assert_eq!(handle.get_state(), 0);
    assert!(handle.is_dirty());
    assert_eq!(runtime.flush(), Ok(1));
    assert_eq!(handle.get_state(), 1);
}

#[test]
fn dispose_runs_cleanups_once() {
    let runtime = Runtime::default();
    let cleanups = Rc::new(Cell::new(0));
    let counter = cleanups.clone();
    let handle = runtime
        .create_resource(
            resource(move |_: ()| {
                let counter = counter.clone();
                tap_effect_with((), move || {
                    Cleanup::new(move || counter.set(counter.get() + 1))
                });
            })
            .element(()),
        )
        .expect("create");

    handle.dispose().expect("dispose");
    handle.dispose().expect("dispose again");
    assert!(handle.is_disposed());
    assert_eq!(cleanups.get(), 1);

    handle.update_input(());
    assert_eq!(runtime.flush(), Ok(0));
}

#[test]
fn dropping_the_last_clone_disposes() {
    let runtime = Runtime::default();
    let cleanups = Rc::new(Cell::new(0));
    let counter = cleanups.clone();
    let handle = runtime
        .create_resource(
            resource(move |_: ()| {
                let counter = counter.clone();
                tap_effect_with((), move || {
                    Cleanup::new(move || counter.set(counter.get() + 1))
                });
            })
            .element(()),
        )
        .expect("create");
    let clone = handle.clone();
    assert_eq!(handle, clone);

    drop(handle);
    assert_eq!(cleanups.get(), 0);
    drop(clone);
    assert_eq!(cleanups.get(), 1);
}

#[test]
fn render_errors_surface_from_create() {
    let runtime = Runtime::default();
    let result = runtime.create_resource(
        resource(|_: ()| {
            let (value, set) = tap_state(|| 0);
            set.set(value + 1);
        })
        .element(()),
    );
    assert_eq!(result.err(), Some(ResourceError::UpdatedDuringRender));
}

#[test]
fn resources_created_during_render_join_the_active_runtime() {
    let runtime = Runtime::default();
    let seen = Rc::new(RefCell::new(None));
    let record = seen.clone();
    let _handle = runtime
        .create_resource(
            resource(move |_: ()| {
                *record.borrow_mut() = Some(Runtime::current());
            })
            .element(()),
        )
        .expect("create");
    let seen = seen.borrow_mut().take().expect("rendered");
    assert!(seen.ptr_eq(&runtime));
}
