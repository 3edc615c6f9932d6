use tap_assistant::prelude::*;
use tap_assistant::{AssistantState, PermissionsStore, ToolCallState};
use tap_core::{resource, ResourceHandle};
use tap_runtime_std::StdRuntime;

const SCRIPT: &[&str] = &["hello tap", "what time is it", "   ", "thanks"];

/// Echoes the user and asks for a clock tool when the message mentions time.
fn scripted_backend() -> impl ChatBackend {
    move |history: Vec<UiMessage>, sink: StreamSink| {
        let prompt = history.last().map(UiMessage::text).unwrap_or_default();
        if prompt.contains("time") {
            let reply = sink.clone();
            sink.request_approval("call-clock", "clock", "{}", move |decision| {
                match decision {
                    Decision::Approve => {
                        reply.set_tool_state(
                            "call-clock",
                            ToolCallState::OutputAvailable {
                                output: "12:00".to_owned(),
                            },
                        );
                        reply.append_text("It is noon.");
                    }
                    Decision::Reject => {
                        reply.append_text("Okay, I won't check.");
                    }
                }
                reply.finish();
            });
            return;
        }
        for word in prompt.split_whitespace() {
            sink.append_text(&format!("{word} "));
        }
        sink.finish();
    }
}

fn print_thread(state: &AssistantState) {
    for message in &state.thread.messages {
        let mut line = format!("{:>9}: {}", message.role, message.text());
        for part in &message.parts {
            if let UiPart::Tool {
                tool_name, state, ..
            } = part
            {
                line.push_str(&format!(" [{tool_name}: {state:?}]"));
            }
        }
        println!("{line}");
    }
    if let Some(error) = &state.thread.error {
        println!("    error: {error}");
    }
    println!();
}

fn approve_all(permissions: &PermissionsStore) {
    let actions = permissions.actions().get();
    for request in permissions.get_state().pending {
        println!("approving {} ({})", request.id, request.tool_name);
        actions.resolve.call((request.id, Decision::Approve));
    }
}

fn main() {
    env_logger::init();

    println!("=== tap chat demo ===");
    println!();

    let host = StdRuntime::new();
    host.set_flush_waker(|| log::trace!("flush requested"));
    let runtime = host.runtime();

    let permissions: ResourceHandle<(), PermissionsStore> =
        match runtime.create_resource(permissions_store().element(())) {
            Ok(handle) => handle,
            Err(err) => {
                log::error!("failed to mount permissions: {err}");
                return;
            }
        };
    let thread = LocalThreadProps::new(scripted_backend())
        .with_permissions(permissions.get_state());
    let client_handle = match runtime.create_resource(assistant_client_store().element(
        AssistantClientProps {
            thread: resource(local_thread).element(thread),
        },
    )) {
        Ok(handle) => handle,
        Err(err) => {
            log::error!("failed to mount assistant client: {err}");
            return;
        }
    };
    let client = client_handle.get_state();
    let _subscription = client.subscribe(|| log::debug!("assistant state changed"));

    let composer = client.actions().get().composer.get();
    for input in SCRIPT {
        println!("> {input}");
        composer.set_text.call((*input).to_owned());
        composer.send.call(());
        if let Err(err) = host.run_until_idle() {
            log::error!("flush failed: {err}");
            return;
        }
        approve_all(&permissions.get_state());
        if let Err(err) = host.run_until_idle() {
            log::error!("flush failed: {err}");
            return;
        }
    }

    print_thread(&client.get_state());

    for handle_result in [client_handle.dispose(), permissions.dispose()] {
        if let Err(err) = handle_result {
            log::error!("failed to dispose: {err}");
        }
    }
}
