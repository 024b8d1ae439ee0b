//! Ordered message memory owned by one conversation.

use crate::core::types::Message;

/// Append-mostly sequence of conversation turns.
///
/// Insertion order is turn order. The only non-append mutations are
/// [`ConversationMemory::rollback_last_two`] (used by reply recovery) and
/// [`ConversationMemory::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationMemory {
    messages: Vec<Message>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop the newest request/reply pair. Returns how many messages were removed.
    pub fn rollback_last_two(&mut self) -> usize {
        let keep = self.messages.len().saturating_sub(2);
        let removed = self.messages.len() - keep;
        self.messages.truncate(keep);
        removed
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_removes_newest_pair() {
        let mut memory = ConversationMemory::new();
        memory.push(Message::user("teach"));
        memory.push(Message::user("ask"));
        memory.push(Message::assistant("garbage"));

        assert_eq!(memory.rollback_last_two(), 2);
        assert_eq!(memory.messages(), &[Message::user("teach")]);
    }

    #[test]
    fn rollback_on_short_memory_removes_what_exists() {
        let mut memory = ConversationMemory::new();
        memory.push(Message::user("only"));
        assert_eq!(memory.rollback_last_two(), 1);
        assert!(memory.is_empty());
        assert_eq!(memory.rollback_last_two(), 0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut memory = ConversationMemory::new();
        memory.push(Message::user("a"));
        memory.push(Message::assistant("b"));
        memory.reset();
        assert_eq!(memory.len(), 0);
    }
}
