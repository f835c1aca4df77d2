//! Job engine: spawns the three recurring jobs.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use jubilee_core::Platform;
use jubilee_store::SharedStore;
use tokio::task::JoinHandle;

use crate::announce::{AnnounceKind, Notifier};
use crate::clock;
use crate::presence::PresenceCycle;

/// Fixed repeat interval of both daily jobs after midnight alignment.
pub const DAILY_INTERVAL: Duration = Duration::from_secs(24 * 3600);

/// Presence rotation interval. No alignment phase.
pub const PRESENCE_INTERVAL: Duration = Duration::from_secs(60);

/// Owns the recurring jobs. Construct once, call [`SchedulerEngine::start`]
/// after the platform signals readiness.
pub struct SchedulerEngine {
    platform: Arc<dyn Platform>,
    notifier: Notifier,
    /// Activity text shown alongside the rotating status.
    activity: String,
}

impl SchedulerEngine {
    pub fn new(
        platform: Arc<dyn Platform>,
        store: SharedStore,
        announcement_channel: impl Into<String>,
        activity: impl Into<String>,
    ) -> Self {
        let notifier = Notifier::new(Arc::clone(&platform), store, announcement_channel);
        Self {
            platform,
            notifier,
            activity: activity.into(),
        }
    }

    /// Spawn the daily check, the upcoming-birthday notice, and the
    /// presence rotation. A failed run is logged and skipped; the next
    /// scheduled tick is the retry mechanism.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        vec![
            self.spawn_daily("birthday check", AnnounceKind::Today),
            self.spawn_daily("upcoming notice", AnnounceKind::Tomorrow),
            self.spawn_presence(),
        ]
    }

    fn spawn_daily(&self, job: &'static str, kind: AnnounceKind) -> JoinHandle<()> {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            let alignment = clock::until_next_midnight(Local::now().naive_local());
            tracing::info!("{job}: first run in {}s", alignment.as_secs());
            tokio::time::sleep(alignment).await;

            let mut ticker = tokio::time::interval(DAILY_INTERVAL);
            loop {
                ticker.tick().await;
                let today = Local::now().date_naive();
                let target = match kind {
                    AnnounceKind::Today => clock::target_today(today),
                    AnnounceKind::Tomorrow => clock::target_tomorrow(today),
                };
                if let Err(e) = notifier.announce_matching(target, kind).await {
                    tracing::warn!("{job} skipped: {e}");
                }
            }
        })
    }

    fn spawn_presence(&self) -> JoinHandle<()> {
        let platform = Arc::clone(&self.platform);
        let activity = self.activity.clone();
        tokio::spawn(async move {
            let mut cycle = PresenceCycle::standard();
            let mut ticker = tokio::time::interval(PRESENCE_INTERVAL);
            loop {
                ticker.tick().await;
                let status = cycle.advance();
                if let Err(e) = platform.set_presence(status, &activity).await {
                    tracing::warn!("presence update failed: {e}");
                }
            }
        })
    }
}
