use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

use phantom_client::{RevealGesture, ViewConfig};
use phantom_types::models::User;

/// Process configuration, read from `PHANTOM_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` keeps the cache in memory (`PHANTOM_DB_PATH=:memory:`).
    pub db_path: Option<PathBuf>,
    pub user_id: String,
    pub nickname: String,
    pub view: ViewConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let db_path = var("PHANTOM_DB_PATH", "phantom.db");
        let db_path = (db_path != ":memory:").then(|| PathBuf::from(db_path));

        let poll_ms: u64 = var("PHANTOM_POLL_INTERVAL_MS", "3000")
            .parse()
            .context("PHANTOM_POLL_INTERVAL_MS must be a number of milliseconds")?;
        if poll_ms == 0 {
            bail!("PHANTOM_POLL_INTERVAL_MS must be greater than zero");
        }

        let default_expires_in: u32 = var("PHANTOM_DEFAULT_EXPIRES_IN", "10")
            .parse()
            .context("PHANTOM_DEFAULT_EXPIRES_IN must be a number of seconds")?;
        if default_expires_in == 0 {
            bail!("PHANTOM_DEFAULT_EXPIRES_IN must be greater than zero");
        }

        let raw_gesture = var("PHANTOM_REVEAL_GESTURE", "tap");
        let Some(gesture) = RevealGesture::parse(&raw_gesture) else {
            bail!("PHANTOM_REVEAL_GESTURE must be 'tap' or 'hold', got '{}'", raw_gesture);
        };

        Ok(Self {
            db_path,
            user_id: var("PHANTOM_USER_ID", "local-user"),
            nickname: var("PHANTOM_NICKNAME", "me"),
            view: ViewConfig {
                default_expires_in,
                poll_interval: Duration::from_millis(poll_ms),
                gesture,
                ..ViewConfig::default()
            },
        })
    }

    /// The signed-in user this process acts as.
    pub fn user(&self) -> User {
        User {
            id: self.user_id.clone(),
            name: self.nickname.clone(),
            nickname: self.nickname.clone(),
            email: String::new(),
            phone: String::new(),
            avatar: String::new(),
            is_online: true,
            last_seen: None,
        }
    }
}
