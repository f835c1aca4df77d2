//! Bot configuration, loaded from a TOML file.
//!
//! The bot token may come from the config file or the `DISCORD_TOKEN`
//! environment variable (the env var wins). Startup fails fast when the
//! token or either channel id is missing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_prefix() -> String {
    "!".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Discord bot token. Overridable via `DISCORD_TOKEN`.
    #[serde(default)]
    pub bot_token: String,

    /// Channel where `set_birthday` / `remove_birthday` are accepted.
    pub registration_channel: String,

    /// Channel where birthday announcements are posted.
    pub announcement_channel: String,

    #[serde(default = "default_prefix")]
    pub command_prefix: String,

    /// Path of the birthdays store. Defaults to `~/.jubilee/birthdays.json`.
    #[serde(default)]
    pub data_file: Option<PathBuf>,
}

impl Config {
    /// Load and validate configuration from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let mut config: Config =
            toml::from_str(&text).map_err(|e| Error::config(format!("{}: {e}", path.display())))?;

        if let Ok(token) = std::env::var("DISCORD_TOKEN") {
            if !token.trim().is_empty() {
                config.bot_token = token;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Resolved store path.
    pub fn data_path(&self) -> PathBuf {
        self.data_file
            .clone()
            .unwrap_or_else(|| Self::home_dir().join("birthdays.json"))
    }

    fn home_dir() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".jubilee")
    }

    fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            return Err(Error::config(
                "bot token missing (set bot_token or DISCORD_TOKEN)",
            ));
        }
        if self.registration_channel.trim().is_empty() {
            return Err(Error::config("registration_channel is not set"));
        }
        if self.announcement_channel.trim().is_empty() {
            return Err(Error::config("announcement_channel is not set"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).expect("create config");
        f.write_all(contents.as_bytes()).expect("write config");
        (dir, path)
    }

    #[test]
    fn test_load_full_config() {
        let (_dir, path) = write_config(
            r#"
bot_token = "abc123"
registration_channel = "111"
announcement_channel = "222"
command_prefix = "?"
"#,
        );
        let config = Config::load(&path).expect("should load");
        assert_eq!(config.registration_channel, "111");
        assert_eq!(config.command_prefix, "?");
    }

    #[test]
    fn test_missing_file_fails() {
        let err = Config::load(Path::new("/nonexistent/config.toml"));
        assert!(matches!(err, Err(Error::ConfigNotFound(_))));
    }

    #[test]
    fn test_missing_channels_fail_validation() {
        let (_dir, path) = write_config(r#"bot_token = "abc""#);
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_prefix_defaults_to_bang() {
        let (_dir, path) = write_config(
            r#"
bot_token = "abc123"
registration_channel = "111"
announcement_channel = "222"
"#,
        );
        let config = Config::load(&path).expect("should load");
        assert_eq!(config.command_prefix, "!");
    }
}
