//! Event dispatch and the thin command surface around the core.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use jubilee_consent::ConsentFlow;
use jubilee_core::{BirthDate, CommandEvent, Config, Event, Platform, Presence};
use jubilee_scheduler::SchedulerEngine;
use jubilee_store::SharedStore;

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

pub struct Bot {
    platform: Arc<dyn Platform>,
    store: SharedStore,
    consent: Arc<ConsentFlow>,
    scheduler: SchedulerEngine,
    config: Config,
    jobs_started: AtomicBool,
}

impl Bot {
    pub fn new(platform: Arc<dyn Platform>, store: SharedStore, config: Config) -> Self {
        let consent = Arc::new(ConsentFlow::new(
            Arc::clone(&platform),
            Arc::clone(&store),
            config.registration_channel.clone(),
        ));
        let scheduler = SchedulerEngine::new(
            Arc::clone(&platform),
            Arc::clone(&store),
            config.announcement_channel.clone(),
            format!("{}set_birthday", config.command_prefix),
        );
        Self {
            platform,
            store,
            consent,
            scheduler,
            config,
            jobs_started: AtomicBool::new(false),
        }
    }

    pub async fn handle_event(&self, event: Event) {
        match event {
            Event::Ready => self.on_ready().await,
            Event::Command(cmd) => self.on_command(cmd).await,
            Event::Reaction(reaction) => {
                self.consent.handle_reaction(&reaction).await;
            }
        }
    }

    /// Scheduled jobs start on the first READY only; a gateway reconnect
    /// re-delivers READY but must not double-schedule.
    async fn on_ready(&self) {
        if self.jobs_started.swap(true, Ordering::SeqCst) {
            tracing::debug!("gateway resumed, jobs already running");
            return;
        }
        tracing::info!("ready; starting scheduled jobs");
        let activity = format!("{}set_birthday", self.config.command_prefix);
        if let Err(e) = self.platform.set_presence(Presence::Online, &activity).await {
            tracing::warn!("initial presence failed: {e}");
        }
        self.scheduler.start();
    }

    async fn on_command(&self, cmd: CommandEvent) {
        tracing::debug!("command '{}' from {}", cmd.name, cmd.sender_id);
        match cmd.name.as_str() {
            // Blocks on consent for up to 60s, so it runs detached —
            // reactions must keep flowing through the event loop meanwhile.
            "set_birthday" => {
                let consent = Arc::clone(&self.consent);
                tokio::spawn(async move {
                    if let Err(e) = consent.run(&cmd).await {
                        tracing::error!("registration attempt failed: {e}");
                    }
                });
            }
            "list" => self.list_birthdays(&cmd).await,
            "remove_birthday" => self.remove_birthday(&cmd).await,
            other => tracing::trace!("unknown command: {other}"),
        }
    }

    async fn list_birthdays(&self, cmd: &CommandEvent) {
        let records = self.store.lock().await.snapshot();
        let body = render_list(&records)
            .unwrap_or_else(|| "The birthday list is empty.".to_string());
        if let Err(e) = self.platform.send_message(&cmd.channel_id, &body).await {
            tracing::warn!("list reply failed: {e}");
        }
    }

    async fn remove_birthday(&self, cmd: &CommandEvent) {
        if cmd.channel_id != self.config.registration_channel {
            let _ = self
                .platform
                .send_message(
                    &cmd.channel_id,
                    "Birthday commands only work in the registration channel.",
                )
                .await;
            return;
        }

        let result = self.store.lock().await.delete(&cmd.sender_id);
        let reply = match result {
            Ok(true) => format!("<@{}>, your birthday has been removed.", cmd.sender_id),
            Ok(false) => format!("<@{}>, you have not added a birthday yet.", cmd.sender_id),
            Err(e) => {
                tracing::error!("remove failed for {}: {e}", cmd.sender_id);
                format!("<@{}>, removal failed. Please try again later.", cmd.sender_id)
            }
        };
        if let Err(e) = self.platform.send_message(&cmd.channel_id, &reply).await {
            tracing::warn!("remove reply failed: {e}");
        }
    }
}

/// Render all records grouped by month, chronological by date-in-year.
/// None when the store is empty.
fn render_list(records: &[(String, BirthDate)]) -> Option<String> {
    if records.is_empty() {
        return None;
    }

    let mut sorted: Vec<_> = records.to_vec();
    sorted.sort_by_key(|(_, date)| (date.month(), date.day()));

    let mut out = String::from("📅 **Birthday list**");
    let mut current_month = 0;
    for (user_id, date) in &sorted {
        if date.month() != current_month {
            current_month = date.month();
            let name = MONTH_NAMES[(current_month - 1) as usize];
            out.push_str(&format!("\n\n**{name}**"));
        }
        out.push_str(&format!("\n<@{user_id}> — {date}"));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jubilee_core::{ReactionEvent, Result};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;

    fn bd(s: &str) -> BirthDate {
        BirthDate::parse(s).expect("valid test date")
    }

    #[derive(Default)]
    struct MockPlatform {
        sent: StdMutex<Vec<String>>,
        presence_calls: AtomicUsize,
        next_id: AtomicUsize,
    }

    #[async_trait]
    impl Platform for MockPlatform {
        async fn send_message(&self, _channel_id: &str, content: &str) -> Result<String> {
            self.sent.lock().expect("lock").push(content.to_string());
            Ok(format!("m{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
        }

        async fn add_reaction(&self, _c: &str, _m: &str, _e: &str) -> Result<()> {
            Ok(())
        }

        async fn delete_message(&self, _c: &str, _m: &str) -> Result<()> {
            Ok(())
        }

        async fn mention_user(&self, user_id: &str) -> Result<String> {
            Ok(format!("<@{user_id}>"))
        }

        async fn channel_exists(&self, _channel_id: &str) -> bool {
            true
        }

        async fn set_presence(&self, _status: Presence, _activity: &str) -> Result<()> {
            self.presence_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_config() -> Config {
        Config {
            bot_token: "token".into(),
            registration_channel: "reg".into(),
            announcement_channel: "announce".into(),
            command_prefix: "!".into(),
            data_file: None,
        }
    }

    fn setup() -> (Arc<MockPlatform>, SharedStore, Bot, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store: SharedStore = Arc::new(tokio::sync::Mutex::new(
            jubilee_store::BirthdayStore::load(dir.path().join("b.json")).expect("store"),
        ));
        let platform = Arc::new(MockPlatform::default());
        let bot = Bot::new(
            platform.clone() as Arc<dyn Platform>,
            Arc::clone(&store),
            test_config(),
        );
        (platform, store, bot, dir)
    }

    fn command(sender: &str, channel: &str, name: &str, args: &[&str]) -> Event {
        Event::Command(CommandEvent {
            sender_id: sender.into(),
            channel_id: channel.into(),
            message_id: "cmd".into(),
            name: name.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[tokio::test]
    async fn test_remove_existing_record() {
        let (platform, store, bot, _dir) = setup();
        store.lock().await.set("alice", bd("25.12.1990")).expect("seed");

        bot.handle_event(command("alice", "reg", "remove_birthday", &[])).await;

        assert!(store.lock().await.is_empty());
        let sent = platform.sent.lock().expect("lock").clone();
        assert!(sent[0].contains("has been removed"));
    }

    #[tokio::test]
    async fn test_remove_without_record() {
        let (platform, store, bot, _dir) = setup();

        bot.handle_event(command("alice", "reg", "remove_birthday", &[])).await;

        assert!(store.lock().await.is_empty());
        let sent = platform.sent.lock().expect("lock").clone();
        assert!(sent[0].contains("not added a birthday"));
    }

    #[tokio::test]
    async fn test_list_renders_records() {
        let (platform, store, bot, _dir) = setup();
        store.lock().await.set("alice", bd("25.12.1990")).expect("seed");

        bot.handle_event(command("bob", "anywhere", "list", &[])).await;

        let sent = platform.sent.lock().expect("lock").clone();
        assert!(sent[0].contains("**December**"));
        assert!(sent[0].contains("<@alice> — 25.12.1990"));
    }

    #[tokio::test]
    async fn test_list_empty_store() {
        let (platform, _store, bot, _dir) = setup();

        bot.handle_event(command("bob", "anywhere", "list", &[])).await;

        let sent = platform.sent.lock().expect("lock").clone();
        assert_eq!(sent[0], "The birthday list is empty.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_starts_jobs_once() {
        let (platform, _store, bot, _dir) = setup();

        bot.handle_event(Event::Ready).await;
        bot.handle_event(Event::Ready).await;
        // Let the spawned presence job take its first tick.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        // One initial presence on the first READY plus one rotation tick.
        // A double-started engine would show a third call here.
        assert_eq!(platform.presence_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reaction_without_session_is_ignored() {
        let (_platform, store, bot, _dir) = setup();

        bot.handle_event(Event::Reaction(ReactionEvent {
            user_id: "alice".into(),
            channel_id: "reg".into(),
            message_id: "nope".into(),
            emoji: "✅".into(),
        }))
        .await;

        assert!(store.lock().await.is_empty());
    }

    #[test]
    fn test_render_empty_is_none() {
        assert!(render_list(&[]).is_none());
    }

    #[test]
    fn test_render_groups_by_month_in_year_order() {
        let records = vec![
            ("c".to_string(), bd("03.07.1992")),
            ("a".to_string(), bd("15.02.1990")),
            ("b".to_string(), bd("01.02.1985")),
        ];
        let text = render_list(&records).expect("non-empty");

        let feb = text.find("**February**").expect("february header");
        let jul = text.find("**July**").expect("july header");
        assert!(feb < jul);

        // Within February: the 1st before the 15th, regardless of year.
        let b = text.find("<@b>").expect("b");
        let a = text.find("<@a>").expect("a");
        assert!(b < a);
        assert!(text.contains("<@a> — 15.02.1990"));
    }
}
