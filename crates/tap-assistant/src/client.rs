use tap_core::{tap_memo, tap_resource, Resource, ResourceElement};
use tap_store::{store, tap_actions, Actions, Store, StoreOutput};

use crate::composer::{ComposerActions, ComposerState};
use crate::thread::{ThreadActions, ThreadOutput, ThreadState};

#[derive(Clone, Debug)]
pub struct AssistantClientProps<P> {
    pub thread: ResourceElement<P, ThreadOutput>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssistantState {
    pub thread: ThreadState,
    pub composer: ComposerState,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssistantActions {
    pub thread: Actions<ThreadActions>,
    pub composer: Actions<ComposerActions>,
}

pub type AssistantClient = Store<AssistantState, Actions<AssistantActions>>;

/// Hosts a thread and lifts its composer to the top level.
pub fn assistant_client<P>(
    props: AssistantClientProps<P>,
) -> StoreOutput<AssistantState, Actions<AssistantActions>>
where
    P: Clone + 'static,
{
    let thread = tap_resource(props.thread);

    let state = tap_memo(thread.state.clone(), || AssistantState {
        composer: thread.state.composer.clone(),
        thread: thread.state.clone(),
    });
    let actions = tap_actions(AssistantActions {
        composer: thread.actions.get().composer,
        thread: thread.actions.clone(),
    });

    StoreOutput::new(state, actions)
}

pub fn assistant_client_store<P>() -> Resource<AssistantClientProps<P>, AssistantClient>
where
    P: Clone + 'static,
{
    store(assistant_client::<P>)
}
