use crate::message::UiMessage;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

/// Instructions a thread receives from the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiCommand {
    AddMessage { message: UiMessage },
    AddToolApproval { tool_call_id: String, decision: Decision },
    Cancel,
}

/// Anything `send` accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendInput {
    Text(String),
    Message(UiMessage),
    Commands(Vec<UiCommand>),
}

impl SendInput {
    pub fn into_commands(self) -> Vec<UiCommand> {
        match self {
            SendInput::Text(text) => vec![UiCommand::AddMessage {
                message: UiMessage::user(text),
            }],
            SendInput::Message(message) => vec![UiCommand::AddMessage { message }],
            SendInput::Commands(commands) => commands,
        }
    }
}

impl From<&str> for SendInput {
    fn from(text: &str) -> Self {
        SendInput::Text(text.to_owned())
    }
}

impl From<String> for SendInput {
    fn from(text: String) -> Self {
        SendInput::Text(text)
    }
}

impl From<UiMessage> for SendInput {
    fn from(message: UiMessage) -> Self {
        SendInput::Message(message)
    }
}

impl From<Vec<UiCommand>> for SendInput {
    fn from(commands: Vec<UiCommand>) -> Self {
        SendInput::Commands(commands)
    }
}
