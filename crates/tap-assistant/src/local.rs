//! A thread that keeps its messages locally and streams replies from a
//! [`ChatBackend`].

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tap_core::{
    resource, tap_effect_with, tap_ref, tap_resource, tap_state, Callback, Cleanup, MutableRef,
    StateSetter,
};

use crate::command::{Decision, UiCommand};
use crate::message::{Role, ToolCallState, UiMessage, UiPart};
use crate::permissions::{NewPermissionRequest, PermissionsStore};
use crate::thread::{base_thread, ThreadOutput, ThreadProps, ThreadSnapshot};

/// Produces assistant replies.
///
/// `run` may write to the sink before returning or keep it and stream later.
/// Once the run is cancelled or replaced every sink operation is a no-op.
pub trait ChatBackend {
    fn run(&self, history: Vec<UiMessage>, sink: StreamSink);
}

impl<F> ChatBackend for F
where
    F: Fn(Vec<UiMessage>, StreamSink),
{
    fn run(&self, history: Vec<UiMessage>, sink: StreamSink) {
        self(history, sink)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum RunStatus {
    Running,
    Finished,
    Aborted,
}

#[derive(Debug)]
struct RunControl {
    id: u64,
    status: Cell<RunStatus>,
}

impl RunControl {
    fn new(id: u64) -> Self {
        Self {
            id,
            status: Cell::new(RunStatus::Running),
        }
    }

    fn is_running(&self) -> bool {
        self.status.get() == RunStatus::Running
    }

    /// Returns `false` if the run had already ended.
    fn abort(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.status.set(RunStatus::Aborted);
        true
    }
}

type CurrentRun = MutableRef<Option<Rc<RunControl>>>;

/// Writes one run's output into the thread.
#[derive(Clone)]
pub struct StreamSink {
    run: Rc<RunControl>,
    snapshot: StateSetter<ThreadSnapshot>,
    permissions: Option<PermissionsStore>,
}

impl StreamSink {
    pub fn run_id(&self) -> u64 {
        self.run.id
    }

    /// Whether output is still accepted.
    pub fn is_active(&self) -> bool {
        self.run.is_running()
    }

    fn apply(&self, f: impl FnOnce(&mut ThreadSnapshot)) -> bool {
        if !self.run.is_running() {
            log::debug!("run {} is closed, dropping output", self.run.id);
            return false;
        }
        self.snapshot.update(|snapshot| {
            let mut next = snapshot.clone();
            f(&mut next);
            next
        });
        true
    }

    fn apply_to_reply(&self, f: impl FnOnce(&mut UiMessage)) -> bool {
        self.apply(|snapshot| f(reply_mut(&mut snapshot.messages)))
    }

    /// Extend the streaming text part of the reply, starting one if needed.
    pub fn append_text(&self, delta: &str) -> bool {
        self.apply_to_reply(|reply| match reply.parts.last_mut() {
            Some(UiPart::Text {
                text,
                streaming: true,
            }) => text.push_str(delta),
            _ => reply.parts.push(UiPart::Text {
                text: delta.to_owned(),
                streaming: true,
            }),
        })
    }

    pub fn push_part(&self, part: UiPart) -> bool {
        self.apply_to_reply(|reply| {
            close_streaming(reply);
            reply.parts.push(part);
        })
    }

    /// Returns `false` if the run is closed or no part has this call id.
    pub fn set_tool_state(&self, tool_call_id: &str, state: ToolCallState) -> bool {
        let mut found = false;
        let applied = self.apply(|snapshot| {
            if let Some(UiPart::Tool { state: current, .. }) = snapshot
                .messages
                .iter_mut()
                .rev()
                .find_map(|message| message.tool_part_mut(tool_call_id))
            {
                *current = state;
                found = true;
            }
        });
        applied && found
    }

    /// Add a tool call awaiting approval and register it with the
    /// permissions store. `on_decision` runs once the request is resolved
    /// while the run is still active.
    pub fn request_approval(
        &self,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: impl Into<String>,
        on_decision: impl Fn(Decision) + 'static,
    ) -> bool {
        let tool_call_id = tool_call_id.into();
        let tool_name = tool_name.into();
        let input = input.into();
        let part = UiPart::tool(
            tool_call_id.clone(),
            tool_name.clone(),
            input.clone(),
            ToolCallState::PendingApproval,
        );
        if !self.push_part(part) {
            return false;
        }
        let Some(permissions) = &self.permissions else {
            log::warn!("no permissions store: tool call `{tool_call_id}` stays pending");
            return true;
        };

        let sink = self.clone();
        let call_id = tool_call_id.clone();
        let on_decision = Callback::new(move |decision: Decision| {
            let state = match decision {
                Decision::Approve => ToolCallState::InputAvailable,
                Decision::Reject => ToolCallState::OutputError {
                    error: "rejected by user".to_owned(),
                },
            };
            if sink.set_tool_state(&call_id, state) {
                on_decision(decision);
            }
        });
        permissions
            .actions()
            .get()
            .add_request
            .call(NewPermissionRequest {
                tool_call_id,
                tool_name,
                input,
                on_decision,
            });
        true
    }

    /// End the run successfully.
    pub fn finish(&self) -> bool {
        let applied = self.apply(|snapshot| {
            close_all_streaming(snapshot);
            snapshot.is_running = false;
        });
        if applied {
            self.run.status.set(RunStatus::Finished);
            log::debug!("run {} finished", self.run.id);
        }
        applied
    }

    /// End the run with an error.
    pub fn fail(&self, error: impl fmt::Display) -> bool {
        let error = error.to_string();
        log::warn!("run {} failed: {error}", self.run.id);
        let applied = self.apply(|snapshot| {
            close_all_streaming(snapshot);
            snapshot.is_running = false;
            snapshot.error = Some(error);
        });
        if applied {
            self.run.status.set(RunStatus::Finished);
        }
        applied
    }
}

impl fmt::Debug for StreamSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSink")
            .field("run", &self.run.id)
            .field("status", &self.run.status.get())
            .finish_non_exhaustive()
    }
}

/// The trailing assistant message, appended if the thread does not end with one.
fn reply_mut(messages: &mut Vec<UiMessage>) -> &mut UiMessage {
    if messages.last().map(|message| message.role) != Some(Role::Assistant) {
        messages.push(UiMessage::assistant(Vec::new()));
    }
    match messages.last_mut() {
        Some(reply) => reply,
        None => unreachable!("a reply was just pushed"),
    }
}

fn close_streaming(message: &mut UiMessage) {
    for part in &mut message.parts {
        if let UiPart::Text { streaming, .. } = part {
            *streaming = false;
        }
    }
}

fn close_all_streaming(snapshot: &mut ThreadSnapshot) {
    snapshot.messages.iter_mut().for_each(close_streaming);
}

#[derive(Clone)]
pub struct LocalThreadProps {
    pub backend: Rc<dyn ChatBackend>,
    pub permissions: Option<PermissionsStore>,
    pub initial_messages: Vec<UiMessage>,
}

impl LocalThreadProps {
    pub fn new(backend: impl ChatBackend + 'static) -> Self {
        Self {
            backend: Rc::new(backend),
            permissions: None,
            initial_messages: Vec::new(),
        }
    }

    pub fn with_permissions(mut self, permissions: PermissionsStore) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn with_messages(mut self, messages: Vec<UiMessage>) -> Self {
        self.initial_messages = messages;
        self
    }
}

impl fmt::Debug for LocalThreadProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalThreadProps")
            .field("permissions", &self.permissions)
            .field("initial_messages", &self.initial_messages.len())
            .finish_non_exhaustive()
    }
}

fn abort_run(current_run: &CurrentRun, snapshot: &StateSetter<ThreadSnapshot>) {
    let Some(run) = current_run.take() else {
        return;
    };
    if run.abort() {
        log::debug!("run {} cancelled", run.id);
        snapshot.update(|snapshot| {
            let mut next = snapshot.clone();
            close_all_streaming(&mut next);
            next.is_running = false;
            next
        });
    }
}

fn resolve_approval(
    permissions: Option<&PermissionsStore>,
    tool_call_id: String,
    decision: Decision,
) {
    let Some(permissions) = permissions else {
        log::warn!("approval for tool call `{tool_call_id}` ignored: no permissions store");
        return;
    };
    let resolve = permissions.actions().get().resolve_tool_call;
    if !resolve.call((tool_call_id.clone(), decision)) {
        log::warn!("no pending permission request for tool call `{tool_call_id}`");
    }
}

/// A thread whose messages live in this fiber.
///
/// Adding a message cancels the active run and starts a new one on the
/// backend. Unmounting cancels the active run.
pub fn local_thread(props: LocalThreadProps) -> ThreadOutput {
    let LocalThreadProps {
        backend,
        permissions,
        initial_messages,
    } = props;

    let (snapshot, set_snapshot) = tap_state(|| ThreadSnapshot {
        messages: initial_messages,
        ..ThreadSnapshot::default()
    });
    let current_run: CurrentRun = tap_ref(|| None);
    let next_run_id = tap_ref(|| 1_u64);

    {
        let current_run = current_run.clone();
        tap_effect_with((), move || {
            Cleanup::new(move || {
                if let Some(run) = current_run.take() {
                    if run.abort() {
                        log::debug!("run {} cancelled on unmount", run.id);
                    }
                }
            })
        });
    }

    let on_cancel = {
        let current_run = current_run.clone();
        let set_snapshot = set_snapshot.clone();
        Callback::new(move |()| abort_run(&current_run, &set_snapshot))
    };

    let on_dispatch = Callback::new(move |commands: Vec<UiCommand>| {
        for command in commands {
            match command {
                UiCommand::AddMessage { message } => {
                    abort_run(&current_run, &set_snapshot);
                    let run = Rc::new(RunControl::new(next_run_id.replace(next_run_id.get() + 1)));
                    current_run.set(Some(Rc::clone(&run)));

                    set_snapshot.update(|snapshot| {
                        let mut next = snapshot.clone();
                        next.messages.push(message);
                        next.is_running = true;
                        next.error = None;
                        next
                    });
                    let history = set_snapshot.current().messages;
                    log::debug!("run {} started with {} messages", run.id, history.len());
                    backend.run(
                        history,
                        StreamSink {
                            run,
                            snapshot: set_snapshot.clone(),
                            permissions: permissions.clone(),
                        },
                    );
                }
                UiCommand::AddToolApproval {
                    tool_call_id,
                    decision,
                } => resolve_approval(permissions.as_ref(), tool_call_id, decision),
                UiCommand::Cancel => abort_run(&current_run, &set_snapshot),
            }
        }
    });

    tap_resource(resource(base_thread).element(ThreadProps {
        snapshot,
        on_dispatch,
        on_cancel: Some(on_cancel),
    }))
}

#[cfg(test)]
#[path = "tests/local_tests.rs"]
mod tests;
