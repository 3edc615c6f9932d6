use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// Lifecycle of a tool call part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolCallState {
    InputAvailable,
    PendingApproval,
    OutputAvailable { output: String },
    OutputError { error: String },
}

impl ToolCallState {
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ToolCallState::OutputAvailable { .. } | ToolCallState::OutputError { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiPart {
    Text {
        text: String,
        streaming: bool,
    },
    Tool {
        tool_call_id: String,
        tool_name: String,
        input: String,
        state: ToolCallState,
    },
}

impl UiPart {
    pub fn text(text: impl Into<String>) -> Self {
        UiPart::Text {
            text: text.into(),
            streaming: false,
        }
    }

    pub fn tool(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: impl Into<String>,
        state: ToolCallState,
    ) -> Self {
        UiPart::Tool {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            input: input.into(),
            state,
        }
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            UiPart::Tool { tool_call_id, .. } => Some(tool_call_id),
            UiPart::Text { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UiMessage {
    pub role: Role,
    pub parts: Vec<UiPart>,
}

impl UiMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![UiPart::text(text)],
        }
    }

    pub fn assistant(parts: Vec<UiPart>) -> Self {
        Self {
            role: Role::Assistant,
            parts,
        }
    }

    /// Concatenated text of every text part.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                UiPart::Text { text, .. } => Some(text.as_str()),
                UiPart::Tool { .. } => None,
            })
            .collect()
    }

    pub fn tool_part_mut(&mut self, tool_call_id: &str) -> Option<&mut UiPart> {
        self.parts
            .iter_mut()
            .find(|part| part.tool_call_id() == Some(tool_call_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_skips_tool_parts() {
        let message = UiMessage::assistant(vec![
            UiPart::text("Hello, "),
            UiPart::tool("call-1", "search", "{}", ToolCallState::InputAvailable),
            UiPart::text("world"),
        ]);
        assert_eq!(message.text(), "Hello, world");
    }

    #[test]
    fn tool_parts_are_found_by_call_id() {
        let mut message = UiMessage::assistant(vec![UiPart::tool(
            "call-1",
            "search",
            "{}",
            ToolCallState::PendingApproval,
        )]);
        assert!(message.tool_part_mut("call-2").is_none());
        let Some(UiPart::Tool { state, .. }) = message.tool_part_mut("call-1") else {
            panic!("tool part");
        };
        *state = ToolCallState::OutputAvailable {
            output: "done".into(),
        };
        assert!(state.is_settled());
    }
}
