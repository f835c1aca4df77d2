//! Registration flow driver.

use std::sync::Arc;

use chrono::Local;
use jubilee_core::{BirthDate, CommandEvent, Error, Platform, ReactionEvent, Result};
use jubilee_store::SharedStore;

use crate::session::{ConsentOutcome, ConsentRegistry};
use crate::{ACCEPT_EMOJI, CONSENT_TIMEOUT, DECLINE_EMOJI, NOTICE_TTL};

/// Drives `set_birthday` attempts from the entry guards through a terminal
/// state. One instance serves all users; sessions are tracked per prompt.
pub struct ConsentFlow {
    platform: Arc<dyn Platform>,
    store: SharedStore,
    registry: ConsentRegistry,
    registration_channel: String,
}

impl ConsentFlow {
    pub fn new(
        platform: Arc<dyn Platform>,
        store: SharedStore,
        registration_channel: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            store,
            registry: ConsentRegistry::new(),
            registration_channel: registration_channel.into(),
        }
    }

    /// Route a reaction event to the pending session it may resolve.
    pub async fn handle_reaction(&self, event: &ReactionEvent) -> bool {
        self.registry.handle_reaction(event).await
    }

    /// Number of prompts currently awaiting a reaction.
    pub async fn pending_sessions(&self) -> usize {
        self.registry.pending_count().await
    }

    /// Run one registration attempt to completion.
    pub async fn run(&self, cmd: &CommandEvent) -> Result<()> {
        // Entry guards: no session, no prompt, no side effects on the store.
        if cmd.channel_id != self.registration_channel {
            self.platform
                .send_message(
                    &cmd.channel_id,
                    "Birthday commands only work in the registration channel.",
                )
                .await?;
            return Ok(());
        }

        let mention = self.platform.mention_user(&cmd.sender_id).await?;

        if let Some(existing) = self.store.lock().await.get(&cmd.sender_id) {
            self.platform
                .send_message(
                    &cmd.channel_id,
                    &format!(
                        "{mention}, your birthday is already set to {existing}. \
                         Remove it with remove_birthday first if you want to change it."
                    ),
                )
                .await?;
            return Ok(());
        }

        // Validation runs before any consent prompt exists.
        let parsed = match cmd.args.first() {
            Some(arg) => BirthDate::parse_checked(arg, Local::now().date_naive()),
            None => Err(Error::validation("usage: set_birthday DD.MM.YYYY")),
        };
        let date = match parsed {
            Ok(date) => date,
            Err(Error::Validation(reason)) => {
                self.transient_notice(&cmd.channel_id, &format!("{mention}, {reason}"))
                    .await;
                self.delete_quietly(&cmd.channel_id, &cmd.message_id).await;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        // AwaitingConsent: prompt with both affordances, then a cancellable
        // 60s wait that the first qualifying reaction resolves early.
        let prompt_id = self
            .platform
            .send_message(
                &cmd.channel_id,
                &format!(
                    "📜 {mention}, do you consent to your birthdate being stored and used \
                     for birthday announcements? React {ACCEPT_EMOJI} to accept \
                     or {DECLINE_EMOJI} to decline."
                ),
            )
            .await?;
        // Session exists before the affordances appear, so even an instant
        // reaction finds it.
        let resolved = self
            .registry
            .register(prompt_id.clone(), cmd.sender_id.clone())
            .await;
        for emoji in [ACCEPT_EMOJI, DECLINE_EMOJI] {
            if let Err(e) = self.platform.add_reaction(&cmd.channel_id, &prompt_id, emoji).await {
                self.registry.discard(&prompt_id).await;
                self.delete_quietly(&cmd.channel_id, &prompt_id).await;
                return Err(e);
            }
        }
        let outcome = match tokio::time::timeout(CONSENT_TIMEOUT, resolved).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) | Err(_) => {
                self.registry.discard(&prompt_id).await;
                ConsentOutcome::TimedOut
            }
        };

        match outcome {
            ConsentOutcome::Accepted => self.commit(cmd, &mention, date).await,
            ConsentOutcome::Declined => {
                self.transient_notice(
                    &cmd.channel_id,
                    &format!("{mention}, you declined. Your birthdate was not saved."),
                )
                .await;
            }
            ConsentOutcome::TimedOut => {
                self.transient_notice(
                    &cmd.channel_id,
                    &format!("{mention}, you did not react in time. Please try again."),
                )
                .await;
            }
        }

        // Prompt and original command go away in every terminal state.
        self.delete_quietly(&cmd.channel_id, &prompt_id).await;
        self.delete_quietly(&cmd.channel_id, &cmd.message_id).await;
        Ok(())
    }

    /// Write the record. If another attempt for the same user finished
    /// while this prompt was pending, this one loses.
    async fn commit(&self, cmd: &CommandEvent, mention: &str, date: BirthDate) {
        let saved = {
            let mut store = self.store.lock().await;
            if store.get(&cmd.sender_id).is_some() {
                None
            } else {
                Some(store.set(cmd.sender_id.clone(), date))
            }
        };

        let notice = match saved {
            Some(Ok(())) => format!("{mention}, your birthday has been saved!"),
            Some(Err(e)) => {
                tracing::error!("birthday save failed for {}: {e}", cmd.sender_id);
                format!("{mention}, your birthday could not be saved. Please try again later.")
            }
            None => format!("{mention}, your birthday was already registered."),
        };
        self.transient_notice(&cmd.channel_id, &notice).await;
    }

    /// Post a status message that cleans itself up after [`NOTICE_TTL`].
    /// Deletion is fire-and-forget; the flow never blocks on it.
    async fn transient_notice(&self, channel_id: &str, content: &str) {
        match self.platform.send_message(channel_id, content).await {
            Ok(notice_id) => {
                let platform = Arc::clone(&self.platform);
                let channel = channel_id.to_string();
                tokio::spawn(async move {
                    tokio::time::sleep(NOTICE_TTL).await;
                    if let Err(e) = platform.delete_message(&channel, &notice_id).await {
                        tracing::debug!("notice cleanup failed: {e}");
                    }
                });
            }
            Err(e) => tracing::warn!("failed to send notice: {e}"),
        }
    }

    async fn delete_quietly(&self, channel_id: &str, message_id: &str) {
        if let Err(e) = self.platform.delete_message(channel_id, message_id).await {
            tracing::debug!("message delete failed: {e}");
        }
    }
}
