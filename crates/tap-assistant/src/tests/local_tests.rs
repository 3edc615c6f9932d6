use super::*;
use crate::permissions::permissions_store;
use std::cell::RefCell;
use tap_testing::{init_logging, CallLog, ResourceTester};

type Tester = ResourceTester<LocalThreadProps, ThreadOutput>;

fn mount(props: LocalThreadProps) -> Tester {
    ResourceTester::mount(resource(local_thread).element(props)).expect("mount thread")
}

/// Keeps every sink so tests can stream at their own pace.
#[derive(Clone, Default)]
struct DeferredBackend {
    sinks: Rc<RefCell<Vec<StreamSink>>>,
}

impl DeferredBackend {
    fn sink(&self, index: usize) -> StreamSink {
        self.sinks.borrow()[index].clone()
    }
}

impl ChatBackend for DeferredBackend {
    fn run(&self, _history: Vec<UiMessage>, sink: StreamSink) {
        self.sinks.borrow_mut().push(sink);
    }
}

fn reply(tester: &Tester) -> UiMessage {
    let messages = tester.state().state.messages;
    let last = messages.last().cloned().expect("a reply");
    assert_eq!(last.role, Role::Assistant);
    last
}

#[test]
fn scripted_reply_streams_into_the_thread() {
    init_logging();
    let tester = mount(LocalThreadProps::new(
        |history: Vec<UiMessage>, sink: StreamSink| {
            assert_eq!(history.last().map(UiMessage::text).as_deref(), Some("hi"));
            sink.append_text("Hel");
            sink.append_text("lo");
            sink.finish();
        },
    ));

    tester.state().actions.get().send("hi");
    tester.settle().expect("settle");

    let state = tester.state().state;
    assert!(!state.is_running);
    assert_eq!(state.messages.len(), 2);
    assert_eq!(
        reply(&tester).parts,
        [UiPart::Text {
            text: "Hello".to_owned(),
            streaming: false
        }]
    );
}

#[test]
fn running_flag_follows_the_run() {
    init_logging();
    let backend = DeferredBackend::default();
    let tester = mount(LocalThreadProps::new(backend.clone()));

    tester.state().actions.get().send("hi");
    tester.settle().expect("settle");
    assert!(tester.state().state.is_running);

    let sink = backend.sink(0);
    sink.append_text("partial");
    tester.settle().expect("settle");
    assert_eq!(
        reply(&tester).parts,
        [UiPart::Text {
            text: "partial".to_owned(),
            streaming: true
        }]
    );

    assert!(sink.finish());
    tester.settle().expect("settle");
    assert!(!tester.state().state.is_running);
    assert!(!sink.append_text("late"), "finished runs reject output");
}

#[test]
fn cancel_stops_the_active_run() {
    init_logging();
    let backend = DeferredBackend::default();
    let tester = mount(LocalThreadProps::new(backend.clone()));
    let actions = tester.state().actions.get();

    actions.send("hi");
    backend.sink(0).append_text("par");
    assert_eq!(actions.cancel(), Ok(()));
    tester.settle().expect("settle");

    assert!(!backend.sink(0).is_active());
    assert!(!backend.sink(0).append_text("tial"));
    let state = tester.state().state;
    assert!(!state.is_running);
    assert_eq!(reply(&tester).text(), "par");
}

#[test]
fn a_new_message_replaces_the_active_run() {
    init_logging();
    let backend = DeferredBackend::default();
    let tester = mount(LocalThreadProps::new(backend.clone()));
    let actions = tester.state().actions.get();

    actions.send("first");
    actions.send("second");
    tester.settle().expect("settle");

    assert!(!backend.sink(0).is_active());
    assert!(backend.sink(1).is_active());
    assert_ne!(backend.sink(0).run_id(), backend.sink(1).run_id());
    assert!(tester.state().state.is_running);
}

#[test]
fn unmount_cancels_the_active_run() {
    init_logging();
    let backend = DeferredBackend::default();
    let tester = mount(LocalThreadProps::new(backend.clone()));

    tester.state().actions.get().send("hi");
    tester.settle().expect("settle");
    tester.dispose().expect("dispose");

    assert!(!backend.sink(0).is_active());
}

#[test]
fn failures_are_recorded_on_the_thread() {
    init_logging();
    let tester = mount(LocalThreadProps::new(
        |history: Vec<UiMessage>, sink: StreamSink| {
            if history.len() == 1 {
                sink.fail("backend unavailable");
            } else {
                sink.finish();
            }
        },
    ));

    tester.state().actions.get().send("hi");
    tester.settle().expect("settle");
    let state = tester.state().state;
    assert!(!state.is_running);
    assert_eq!(state.error.as_deref(), Some("backend unavailable"));

    // The next run clears the error.
    tester.state().actions.get().send("again");
    tester.settle().expect("settle");
    let state = tester.state().state;
    assert_eq!(state.error, None);
    assert_eq!(state.messages.len(), 2);
}

#[test]
fn tool_approval_resolves_through_the_permissions_store() {
    init_logging();
    let permissions = ResourceTester::mount(permissions_store().element(())).expect("mount");
    let decisions = CallLog::new();
    let backend = {
        let decisions = decisions.clone();
        move |_: Vec<UiMessage>, sink: StreamSink| {
            let decisions = decisions.clone();
            sink.request_approval("call-1", "shell", "ls", move |decision| {
                decisions.push(format!("{decision:?}"))
            });
        }
    };
    let tester = ResourceTester::mount_on(
        permissions.runtime().clone(),
        resource(local_thread)
            .element(LocalThreadProps::new(backend).with_permissions(permissions.state())),
    )
    .expect("mount thread");

    tester.state().actions.get().send("list files");
    tester.settle().expect("settle");
    let pending = permissions.state().get_state().pending;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "perm-1");
    assert_eq!(pending[0].tool_call_id, "call-1");
    assert_eq!(
        reply(&tester).parts[0],
        UiPart::tool("call-1", "shell", "ls", ToolCallState::PendingApproval)
    );

    tester
        .state()
        .actions
        .get()
        .dispatch
        .call(vec![UiCommand::AddToolApproval {
            tool_call_id: "call-1".to_owned(),
            decision: Decision::Approve,
        }]);
    tester.settle().expect("settle");

    assert_eq!(decisions.entries(), ["Approve"]);
    assert!(permissions.state().get_state().pending.is_empty());
    assert_eq!(
        reply(&tester).parts[0],
        UiPart::tool("call-1", "shell", "ls", ToolCallState::InputAvailable)
    );
}

#[test]
fn approvals_without_a_permissions_store_are_ignored() {
    init_logging();
    let tester = mount(LocalThreadProps::new(|_: Vec<UiMessage>, sink: StreamSink| {
        sink.request_approval("call-1", "shell", "ls", |_| {});
    }));
    let actions = tester.state().actions.get();

    actions.send("list files");
    actions.dispatch.call(vec![UiCommand::AddToolApproval {
        tool_call_id: "call-1".to_owned(),
        decision: Decision::Approve,
    }]);
    tester.settle().expect("settle");

    assert_eq!(
        reply(&tester).parts[0],
        UiPart::tool("call-1", "shell", "ls", ToolCallState::PendingApproval)
    );
}
