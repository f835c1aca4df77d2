//! Pending consent sessions, keyed by prompt message id.

use std::collections::HashMap;

use jubilee_core::ReactionEvent;
use tokio::sync::{Mutex, oneshot};

use crate::{ACCEPT_EMOJI, DECLINE_EMOJI};

/// Terminal result of one awaited consent prompt.
///
/// Decline and timeout are expected outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    Accepted,
    Declined,
    TimedOut,
}

struct PendingConsent {
    requester_id: String,
    resolver: oneshot::Sender<ConsentOutcome>,
}

/// Sessions currently awaiting a reaction. Concurrent sessions for
/// distinct users are independent; each resolves at most once.
#[derive(Default)]
pub struct ConsentRegistry {
    pending: Mutex<HashMap<String, PendingConsent>>,
}

impl ConsentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for `prompt_id`. The returned receiver fires on
    /// the first qualifying reaction; the caller owns the timeout.
    pub async fn register(
        &self,
        prompt_id: impl Into<String>,
        requester_id: impl Into<String>,
    ) -> oneshot::Receiver<ConsentOutcome> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(
            prompt_id.into(),
            PendingConsent {
                requester_id: requester_id.into(),
                resolver: tx,
            },
        );
        rx
    }

    /// Route a reaction event. Only the original requester reacting ✅ or ❌
    /// on the prompt message resolves the session; anything else is ignored.
    /// Returns whether a session was resolved.
    pub async fn handle_reaction(&self, event: &ReactionEvent) -> bool {
        let outcome = match event.emoji.as_str() {
            ACCEPT_EMOJI => ConsentOutcome::Accepted,
            DECLINE_EMOJI => ConsentOutcome::Declined,
            _ => return false,
        };

        let mut pending = self.pending.lock().await;
        let qualifies = pending
            .get(&event.message_id)
            .is_some_and(|session| session.requester_id == event.user_id);
        if !qualifies {
            return false;
        }

        if let Some(session) = pending.remove(&event.message_id) {
            // Receiver may already be gone if the timeout won the race.
            let _ = session.resolver.send(outcome);
            return true;
        }
        false
    }

    /// Drop a session that timed out without a qualifying reaction.
    pub async fn discard(&self, prompt_id: &str) {
        self.pending.lock().await.remove(prompt_id);
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
