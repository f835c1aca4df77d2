//! # Jubilee Gateway
//! Discord adapter — REST API + Gateway WebSocket.
//!
//! Implements the core [`Platform`] trait over the REST API and feeds the
//! bot's event loop from the Gateway WebSocket (READY, commands parsed out
//! of MESSAGE_CREATE, MESSAGE_REACTION_ADD). Presence updates travel back
//! to the socket task over an internal channel, since they are a gateway
//! op, not a REST call.
//!
//! Auto-reconnects on disconnect with capped exponential backoff.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::Stream;
use jubilee_core::{CommandEvent, Error, Event, Platform, Presence, ReactionEvent, Result};
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://discord.com/api/v10";

/// Discord connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// Prefix that marks a channel message as a command.
    #[serde(default = "default_prefix")]
    pub command_prefix: String,
    /// Gateway intents bitmask.
    #[serde(default = "default_intents")]
    pub intents: u64,
}

fn default_prefix() -> String {
    "!".into()
}

fn default_intents() -> u64 {
    // GUILDS | GUILD_MESSAGES | GUILD_MESSAGE_REACTIONS | MESSAGE_CONTENT
    (1 << 0) | (1 << 9) | (1 << 10) | (1 << 15)
}

impl DiscordConfig {
    pub fn new(bot_token: impl Into<String>, command_prefix: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            command_prefix: command_prefix.into(),
            intents: default_intents(),
        }
    }
}

/// Discord platform adapter. Cheap to clone; clones share the HTTP client
/// and the presence channel.
#[derive(Clone)]
pub struct DiscordPlatform {
    config: DiscordConfig,
    client: reqwest::Client,
    presence_tx: tokio::sync::mpsc::UnboundedSender<serde_json::Value>,
    presence_rx:
        std::sync::Arc<std::sync::Mutex<Option<tokio::sync::mpsc::UnboundedReceiver<serde_json::Value>>>>,
}

impl DiscordPlatform {
    pub fn new(config: DiscordConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Authorization",
            format!("Bot {}", config.bot_token)
                .parse()
                .map_err(|_| Error::config("bot token contains invalid header characters"))?,
        );
        headers.insert(
            "User-Agent",
            "Jubilee/0.3"
                .parse()
                .map_err(|_| Error::platform("bad user agent"))?,
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::platform(format!("http client: {e}")))?;

        let (presence_tx, presence_rx) = tokio::sync::mpsc::unbounded_channel();
        Ok(Self {
            config,
            client,
            presence_tx,
            presence_rx: std::sync::Arc::new(std::sync::Mutex::new(Some(presence_rx))),
        })
    }

    /// Verify the token by fetching the bot's own user.
    pub async fn identify_self(&self) -> Result<DiscordUser> {
        let response = self
            .client
            .get(format!("{API_BASE}/users/@me"))
            .send()
            .await
            .map_err(|e| Error::platform(format!("getMe failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::platform(format!("login failed: {}", response.status())));
        }
        response
            .json()
            .await
            .map_err(|e| Error::platform(format!("invalid user response: {e}")))
    }

    async fn get_gateway_url(&self) -> Result<String> {
        let response = self
            .client
            .get(format!("{API_BASE}/gateway/bot"))
            .send()
            .await
            .map_err(|e| Error::platform(format!("gateway request failed: {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::platform(format!("invalid gateway response: {e}")))?;

        body["url"]
            .as_str()
            .map(|s| format!("{s}/?v=10&encoding=json"))
            .ok_or_else(|| Error::platform("no gateway URL"))
    }

    /// Start the Gateway WebSocket connection — returns the bot's inbound
    /// event stream. Call once.
    pub fn start_gateway(&self) -> DiscordEventStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let mut presence_rx = self
            .presence_rx
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .unwrap_or_else(|| {
                // Second start: presence updates will only reach the first socket.
                tracing::warn!("gateway started twice; presence channel already taken");
                tokio::sync::mpsc::unbounded_channel().1
            });

        let adapter = self.clone();
        tokio::spawn(async move {
            let mut backoff_secs: u64 = 5;

            loop {
                tracing::info!("Discord Gateway connecting...");

                let gateway_url = match adapter.get_gateway_url().await {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::error!("failed to get gateway URL: {e}, retrying in {backoff_secs}s");
                        tokio::time::sleep(tokio::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let (mut ws, _) = match tokio_tungstenite::connect_async(&gateway_url).await {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!("gateway WebSocket failed: {e}, retrying in {backoff_secs}s");
                        tokio::time::sleep(tokio::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                backoff_secs = 5;
                tracing::info!("Discord Gateway connected");

                use futures::{SinkExt, StreamExt};
                use tokio_tungstenite::tungstenite::Message as WsMsg;

                let default_beat = tokio::time::Duration::from_millis(41250);
                let mut heartbeat =
                    tokio::time::interval_at(tokio::time::Instant::now() + default_beat, default_beat);
                let mut seq: Option<u64> = None;
                let mut identified = false;

                loop {
                    tokio::select! {
                        msg = ws.next() => {
                            match msg {
                                Some(Ok(WsMsg::Text(text))) => {
                                    let payload: serde_json::Value = match serde_json::from_str(&text) {
                                        Ok(v) => v,
                                        Err(_) => continue,
                                    };

                                    let op = payload["op"].as_u64().unwrap_or(0);
                                    if let Some(s) = payload["s"].as_u64() {
                                        seq = Some(s);
                                    }

                                    match op {
                                        10 => {
                                            let interval_ms = payload["d"]["heartbeat_interval"]
                                                .as_u64().unwrap_or(41250);
                                            let beat = tokio::time::Duration::from_millis(interval_ms);
                                            heartbeat = tokio::time::interval_at(
                                                tokio::time::Instant::now() + beat, beat);
                                            heartbeat.set_missed_tick_behavior(
                                                tokio::time::MissedTickBehavior::Delay);
                                            tracing::debug!("Gateway Hello: heartbeat={interval_ms}ms");

                                            if !identified {
                                                let identify = serde_json::json!({
                                                    "op": 2,
                                                    "d": {
                                                        "token": adapter.config.bot_token,
                                                        "intents": adapter.config.intents,
                                                        "properties": {
                                                            "os": std::env::consts::OS,
                                                            "browser": "jubilee",
                                                            "device": "jubilee"
                                                        }
                                                    }
                                                });
                                                let _ = ws.send(WsMsg::Text(identify.to_string())).await;
                                                identified = true;
                                            }
                                        }
                                        11 => { tracing::trace!("heartbeat ACK"); }
                                        0 => {
                                            let event_name = payload["t"].as_str().unwrap_or("");
                                            if let Some(event) = adapter.map_event(event_name, &payload["d"]) {
                                                if tx.send(event).is_err() {
                                                    tracing::info!("event stream closed (receiver dropped)");
                                                    return;
                                                }
                                            }
                                        }
                                        7 => {
                                            tracing::warn!("gateway requesting reconnect");
                                            break;
                                        }
                                        9 => {
                                            tracing::warn!("invalid session, re-identifying");
                                            identified = false;
                                        }
                                        _ => {}
                                    }
                                }
                                Some(Ok(WsMsg::Close(_))) => {
                                    tracing::warn!("gateway closed by server");
                                    break;
                                }
                                Some(Err(e)) => {
                                    tracing::error!("gateway error: {e}");
                                    break;
                                }
                                None => break,
                                _ => {}
                            }
                        }
                        update = presence_rx.recv() => {
                            if let Some(payload) = update {
                                if ws.send(WsMsg::Text(payload.to_string())).await.is_err() {
                                    tracing::warn!("presence send failed");
                                    break;
                                }
                            }
                        }
                        _ = heartbeat.tick() => {
                            let beat = serde_json::json!({ "op": 1, "d": seq });
                            if ws.send(WsMsg::Text(beat.to_string())).await.is_err() {
                                tracing::error!("heartbeat send failed");
                                break;
                            }
                            tracing::trace!("heartbeat sent (seq={seq:?})");
                        }
                    }
                }

                tracing::info!("Discord Gateway disconnected, reconnecting in {backoff_secs}s");
                tokio::time::sleep(tokio::time::Duration::from_secs(backoff_secs)).await;
                backoff_secs = (backoff_secs * 2).min(60);
            }
        });

        DiscordEventStream { rx }
    }

    /// Translate a dispatch payload into a core event, if it is one the
    /// bot cares about.
    fn map_event(&self, event_name: &str, d: &serde_json::Value) -> Option<Event> {
        match event_name {
            "READY" => {
                let user = d["user"]["username"].as_str().unwrap_or("unknown");
                tracing::info!("Discord Gateway READY as {user}");
                Some(Event::Ready)
            }
            "MESSAGE_CREATE" => {
                if d["author"]["bot"].as_bool().unwrap_or(false) {
                    return None;
                }
                let content = d["content"].as_str().unwrap_or("");
                let (name, args) = parse_command(&self.config.command_prefix, content)?;
                Some(Event::Command(CommandEvent {
                    sender_id: d["author"]["id"].as_str().unwrap_or("").into(),
                    channel_id: d["channel_id"].as_str().unwrap_or("").into(),
                    message_id: d["id"].as_str().unwrap_or("").into(),
                    name,
                    args,
                }))
            }
            "MESSAGE_REACTION_ADD" => Some(Event::Reaction(ReactionEvent {
                user_id: d["user_id"].as_str().unwrap_or("").into(),
                channel_id: d["channel_id"].as_str().unwrap_or("").into(),
                message_id: d["message_id"].as_str().unwrap_or("").into(),
                emoji: d["emoji"]["name"].as_str().unwrap_or("").into(),
            })),
            other => {
                tracing::trace!("ignoring event: {other}");
                None
            }
        }
    }

    async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::platform(format!("{what}: {status} {text}")));
        }
        Ok(response)
    }
}

/// Parse `content` as a prefixed command. Returns lowercase command name
/// and whitespace-separated args, or None for ordinary chatter.
pub fn parse_command(prefix: &str, content: &str) -> Option<(String, Vec<String>)> {
    let rest = content.strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    let name = words.next()?.to_lowercase();
    let args = words.map(String::from).collect();
    Some((name, args))
}

#[async_trait]
impl Platform for DiscordPlatform {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{API_BASE}/channels/{channel_id}/messages"))
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| Error::platform(format!("send failed: {e}")))?;
        let response = Self::check_status(response, "send").await?;

        let message: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::platform(format!("invalid message response: {e}")))?;
        message["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| Error::platform("message response missing id"))
    }

    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<()> {
        let encoded = urlencoding::encode(emoji);
        let response = self
            .client
            .put(format!(
                "{API_BASE}/channels/{channel_id}/messages/{message_id}/reactions/{encoded}/@me"
            ))
            .send()
            .await
            .map_err(|e| Error::platform(format!("reaction failed: {e}")))?;
        Self::check_status(response, "reaction").await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{API_BASE}/channels/{channel_id}/messages/{message_id}"))
            .send()
            .await
            .map_err(|e| Error::platform(format!("delete failed: {e}")))?;
        Self::check_status(response, "delete").await?;
        Ok(())
    }

    async fn mention_user(&self, user_id: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{API_BASE}/users/{user_id}"))
            .send()
            .await
            .map_err(|e| Error::platform(format!("user fetch failed: {e}")))?;
        let response = Self::check_status(response, "user fetch").await?;

        let user: DiscordUser = response
            .json()
            .await
            .map_err(|e| Error::platform(format!("invalid user response: {e}")))?;
        Ok(format!("<@{}>", user.id))
    }

    async fn channel_exists(&self, channel_id: &str) -> bool {
        match self
            .client
            .get(format!("{API_BASE}/channels/{channel_id}"))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("channel lookup failed: {e}");
                false
            }
        }
    }

    async fn set_presence(&self, status: Presence, activity: &str) -> Result<()> {
        let payload = serde_json::json!({
            "op": 3,
            "d": {
                "since": null,
                "activities": [{ "name": activity, "type": 0 }],
                "status": status.api_name(),
                "afk": false
            }
        });
        self.presence_tx
            .send(payload)
            .map_err(|_| Error::platform("gateway not running, presence update dropped"))
    }
}

/// Stream of inbound bot events from the Gateway.
pub struct DiscordEventStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<Event>,
}

impl Stream for DiscordEventStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Unpin for DiscordEventStream {}

// --- Discord API Types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    pub discriminator: Option<String>,
    pub bot: Option<bool>,
}
