use tap_core::{tap_memo, tap_state, Callback};
use tap_store::{tap_actions, Actions, StoreOutput};

use crate::message::UiMessage;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComposerState {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComposerActions {
    pub set_text: Callback<String>,
    pub send: Callback,
}

#[derive(Clone, Debug)]
pub struct ComposerProps {
    /// Receives the composed user message.
    pub on_send: Callback<UiMessage>,
}

pub type ComposerOutput = StoreOutput<ComposerState, Actions<ComposerActions>>;

/// Draft text plus a `send` action that posts it as a user message.
///
/// `send` reads the latest draft, so it may follow `set_text` without a flush
/// in between. Blank drafts are not sent.
pub fn composer(props: ComposerProps) -> ComposerOutput {
    let (text, set_text) = tap_state(String::new);
    let state = tap_memo(text.clone(), || ComposerState { text });

    let actions = tap_actions(ComposerActions {
        set_text: {
            let set_text = set_text.clone();
            Callback::new(move |text: String| set_text.set(text))
        },
        send: Callback::new(move |()| {
            let text = set_text.current();
            if text.trim().is_empty() {
                log::trace!("composer: nothing to send");
                return;
            }
            props.on_send.call(UiMessage::user(text));
            set_text.set(String::new());
        }),
    });

    StoreOutput::new(state, actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tap_core::resource;
    use tap_testing::{init_logging, CallLog, ResourceTester};

    fn mount(sent: &CallLog) -> ResourceTester<ComposerProps, ComposerOutput> {
        let sent = sent.clone();
        ResourceTester::mount(resource(composer).element(ComposerProps {
            on_send: Callback::new(move |message: UiMessage| sent.push(message.text())),
        }))
        .expect("mount composer")
    }

    #[test]
    fn send_posts_the_draft_and_clears_it() {
        init_logging();
        let sent = CallLog::new();
        let tester = mount(&sent);
        let actions = tester.state().actions.get();

        actions.set_text.call("hello".to_owned());
        actions.send.call(());
        tester.settle().expect("settle");

        assert_eq!(sent.entries(), ["hello"]);
        assert_eq!(tester.state().state.text, "");
    }

    #[test]
    fn blank_drafts_are_not_sent() {
        init_logging();
        let sent = CallLog::new();
        let tester = mount(&sent);
        let actions = tester.state().actions.get();

        actions.send.call(());
        actions.set_text.call("   ".to_owned());
        actions.send.call(());
        tester.settle().expect("settle");

        assert!(sent.is_empty());
        assert_eq!(tester.state().state.text, "   ");
    }
}
