//! Model-facing agents built on a shared [`conversation::Conversation`].

pub mod coder;
pub mod conversation;
pub mod dependencies;
pub mod reviewer;
