//! Conversation history for one session.

use crate::types::Turn;

/// Ordered log of turns exchanged in a session.
///
/// Turns are never reordered or deduplicated. After a model call the whole
/// sequence is replaced with the history the model returned, which may
/// contain tool bookkeeping turns hidden from [`Conversation::transcript`].
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Replace the stored sequence with the model's full updated history.
    pub fn replace(&mut self, turns: Vec<Turn>) {
        self.turns = turns;
    }

    pub fn reset(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// An owned copy of the full history.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// User-visible turns only.
    pub fn transcript(&self) -> Vec<Turn> {
        self.turns.iter().filter(|t| t.is_visible()).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, ToolCall};

    #[test]
    fn push_preserves_call_order_and_duplicates() {
        let mut conversation = Conversation::new();
        conversation.push(Turn::user("same"));
        conversation.push(Turn::user("same"));
        conversation.push(Turn::assistant("reply"));
        let roles: Vec<_> = conversation.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::User, Role::Assistant]);
    }

    #[test]
    fn replace_swaps_in_model_history_and_transcript_filters_tools() {
        let mut conversation = Conversation::new();
        conversation.push(Turn::user("stale"));
        conversation.replace(vec![
            Turn::user("weather?"),
            Turn::assistant_tool_calls(
                "",
                vec![ToolCall {
                    id: "c1".into(),
                    name: "forecast".into(),
                    arguments: serde_json::json!({}),
                }],
            ),
            Turn::tool_result("c1", "sunny"),
            Turn::assistant("It is sunny."),
        ]);
        assert_eq!(conversation.len(), 4);
        let transcript: Vec<_> = conversation
            .transcript()
            .into_iter()
            .map(|t| t.content)
            .collect();
        assert_eq!(transcript, vec!["weather?", "It is sunny."]);
    }

    #[test]
    fn reset_empties_history() {
        let mut conversation = Conversation::new();
        conversation.push(Turn::user("hi"));
        conversation.reset();
        assert!(conversation.is_empty());
        assert!(conversation.snapshot().is_empty());
    }
}
