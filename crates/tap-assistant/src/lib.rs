//! Assistant stores: a chat thread with a composer, a local streaming thread
//! driven by a pluggable backend, tool permissions and the client that ties
//! them together.

pub mod client;
pub mod command;
pub mod composer;
pub mod error;
pub mod local;
pub mod message;
pub mod permissions;
pub mod thread;

pub use client::{
    assistant_client, assistant_client_store, AssistantActions, AssistantClient,
    AssistantClientProps, AssistantState,
};
pub use command::{Decision, SendInput, UiCommand};
pub use composer::{composer, ComposerActions, ComposerOutput, ComposerProps, ComposerState};
pub use error::ThreadError;
pub use local::{local_thread, ChatBackend, LocalThreadProps, StreamSink};
pub use message::{Role, ToolCallState, UiMessage, UiPart};
pub use permissions::{
    permissions, permissions_store, NewPermissionRequest, PermissionRequest, PermissionsActions,
    PermissionsState, PermissionsStore,
};
pub use thread::{base_thread, ThreadActions, ThreadOutput, ThreadProps, ThreadSnapshot, ThreadState};

pub mod prelude {
    pub use crate::client::{assistant_client_store, AssistantClient, AssistantClientProps};
    pub use crate::command::{Decision, SendInput, UiCommand};
    pub use crate::local::{local_thread, ChatBackend, LocalThreadProps, StreamSink};
    pub use crate::message::{Role, UiMessage, UiPart};
    pub use crate::permissions::permissions_store;
}
