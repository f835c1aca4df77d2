//! Messaging platform abstraction.
//!
//! The core never talks to Discord directly; it drives this trait and
//! consumes the [`Event`] stream the adapter emits. That keeps the consent
//! flow and the scheduled jobs testable without a live connection.

use async_trait::async_trait;

use crate::error::Result;

/// Presence status the bot can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Online,
    Idle,
    Dnd,
}

impl Presence {
    /// Status string as the Discord gateway expects it.
    pub fn api_name(&self) -> &'static str {
        match self {
            Presence::Online => "online",
            Presence::Idle => "idle",
            Presence::Dnd => "dnd",
        }
    }
}

/// A prefixed command parsed out of a channel message.
#[derive(Debug, Clone)]
pub struct CommandEvent {
    pub sender_id: String,
    pub channel_id: String,
    /// Id of the message that carried the command, so it can be deleted
    /// once the flow finishes.
    pub message_id: String,
    pub name: String,
    pub args: Vec<String>,
}

/// A reaction added to some message.
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub user_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub emoji: String,
}

/// Inbound events the core consumes.
#[derive(Debug, Clone)]
pub enum Event {
    /// Session established, caches warm. Scheduled jobs start after this.
    Ready,
    Command(CommandEvent),
    Reaction(ReactionEvent),
}

/// Outbound operations the core performs against the chat platform.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Send a plain message, returning the new message's id.
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<String>;

    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<()>;

    /// Delete a message (the bot's own or a user's command message).
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()>;

    /// Resolve a user id to a mention string, verifying the user exists.
    async fn mention_user(&self, user_id: &str) -> Result<String>;

    /// Whether the given channel id resolves on the platform.
    async fn channel_exists(&self, channel_id: &str) -> bool;

    async fn set_presence(&self, status: Presence, activity: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_api_names() {
        assert_eq!(Presence::Online.api_name(), "online");
        assert_eq!(Presence::Idle.api_name(), "idle");
        assert_eq!(Presence::Dnd.api_name(), "dnd");
    }
}
