use tap_core::{resource, tap_memo, tap_resource, Callback};
use tap_store::{tap_actions, Actions, StoreOutput};

use crate::command::{SendInput, UiCommand};
use crate::composer::{composer, ComposerActions, ComposerProps, ComposerState};
use crate::error::ThreadError;
use crate::message::UiMessage;

/// Thread data owned by whoever drives the thread.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThreadSnapshot {
    pub messages: Vec<UiMessage>,
    pub is_running: bool,
    /// Message of the last failed run, cleared when a new run starts.
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThreadState {
    pub messages: Vec<UiMessage>,
    pub is_running: bool,
    pub error: Option<String>,
    pub composer: ComposerState,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThreadActions {
    pub composer: Actions<ComposerActions>,
    pub dispatch: Callback<Vec<UiCommand>>,
    pub send: Callback<SendInput>,
    pub cancel: Callback<(), Result<(), ThreadError>>,
}

impl ThreadActions {
    pub fn send(&self, input: impl Into<SendInput>) {
        self.send.call(input.into());
    }

    pub fn cancel(&self) -> Result<(), ThreadError> {
        self.cancel.call(())
    }
}

#[derive(Clone, Debug)]
pub struct ThreadProps {
    pub snapshot: ThreadSnapshot,
    pub on_dispatch: Callback<Vec<UiCommand>>,
    pub on_cancel: Option<Callback>,
}

pub type ThreadOutput = StoreOutput<ThreadState, Actions<ThreadActions>>;

/// Presents a [`ThreadSnapshot`] with a composer attached and turns every
/// kind of input into commands for `on_dispatch`.
pub fn base_thread(props: ThreadProps) -> ThreadOutput {
    let ThreadProps {
        snapshot,
        on_dispatch,
        on_cancel,
    } = props;

    let composer = tap_resource(resource(composer).element(ComposerProps {
        on_send: {
            let on_dispatch = on_dispatch.clone();
            Callback::new(move |message: UiMessage| {
                on_dispatch.call(vec![UiCommand::AddMessage { message }])
            })
        },
    }));

    let actions = tap_actions(ThreadActions {
        composer: composer.actions.clone(),
        dispatch: on_dispatch.clone(),
        send: Callback::new(move |input: SendInput| on_dispatch.call(input.into_commands())),
        cancel: Callback::new(move |()| match &on_cancel {
            Some(cancel) => {
                cancel.call(());
                Ok(())
            }
            None => Err(ThreadError::CancelUnsupported),
        }),
    });

    let state = tap_memo((snapshot.clone(), composer.state.clone()), || ThreadState {
        messages: snapshot.messages,
        is_running: snapshot.is_running,
        error: snapshot.error,
        composer: composer.state,
    });

    StoreOutput::new(state, actions)
}
