//! Notification engine: scan the store, announce matches.

use std::sync::Arc;

use jubilee_core::{BirthDate, Error, MonthDay, Platform, Result};
use jubilee_store::SharedStore;

/// Which announcement template to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceKind {
    /// Same-day: broadcast to the whole channel.
    Today,
    /// Next-day: heads-up mentioning only the matched users.
    Tomorrow,
}

impl AnnounceKind {
    fn render(&self, mentions: &str) -> String {
        match self {
            AnnounceKind::Today => format!(
                "@everyone 🎉 Today is the birthday of {mentions}! 🎂 Don't forget to congratulate them!"
            ),
            AnnounceKind::Tomorrow => format!("🔔 Tomorrow is the birthday of {mentions}! 🎉"),
        }
    }
}

/// User ids whose stored date matches `target` by month+day, year ignored.
pub fn matching_users(records: &[(String, BirthDate)], target: MonthDay) -> Vec<String> {
    records
        .iter()
        .filter(|(_, date)| date.month_day() == target)
        .map(|(id, _)| id.clone())
        .collect()
}

/// Emits birthday announcements into the announcement channel.
#[derive(Clone)]
pub struct Notifier {
    platform: Arc<dyn Platform>,
    store: SharedStore,
    announcement_channel: String,
}

impl Notifier {
    pub fn new(
        platform: Arc<dyn Platform>,
        store: SharedStore,
        announcement_channel: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            store,
            announcement_channel: announcement_channel.into(),
        }
    }

    /// Announce every record matching `target`. Sends nothing when there
    /// are no matches — quiet days stay quiet.
    pub async fn announce_matching(&self, target: MonthDay, kind: AnnounceKind) -> Result<()> {
        // One lock acquisition for the whole scan.
        let records = self.store.lock().await.snapshot();
        let matched = matching_users(&records, target);
        if matched.is_empty() {
            tracing::debug!("no birthdays matching {target}");
            return Ok(());
        }

        if !self.platform.channel_exists(&self.announcement_channel).await {
            return Err(Error::ChannelNotFound(self.announcement_channel.clone()));
        }

        let mut mentions = Vec::with_capacity(matched.len());
        for user_id in &matched {
            mentions.push(self.platform.mention_user(user_id).await?);
        }

        self.platform
            .send_message(&self.announcement_channel, &kind.render(&mentions.join(", ")))
            .await?;
        tracing::info!("announced {} birthday(s) for {target}", matched.len());
        Ok(())
    }
}
