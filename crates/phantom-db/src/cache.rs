//! Typed local cache.
//!
//! Everything the client keeps offline goes through [`LocalCache`]: message
//! snapshots per conversation, the conversation list per user, and the
//! tutorial stage per user. Implementors only provide raw string storage; the
//! typed accessors are shared and never fail a read. A blob that does not
//! decode is logged, cleared, and treated as absent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use phantom_types::models::{Conversation, Message, TutorialStage};

use crate::Database;

const MESSAGES_PREFIX: &str = "phantom-messages-";
const CONVERSATIONS_PREFIX: &str = "phantom-conversations-";
const TUTORIAL_STAGE_PREFIX: &str = "phantom-tutorial-stage-";

pub fn messages_key(conversation_key: &str) -> String {
    format!("{MESSAGES_PREFIX}{conversation_key}")
}

pub fn conversations_key(user_id: &str) -> String {
    format!("{CONVERSATIONS_PREFIX}{user_id}")
}

pub fn tutorial_stage_key(user_id: &str) -> String {
    format!("{TUTORIAL_STAGE_PREFIX}{user_id}")
}

pub trait LocalCache: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>>;
    fn put_raw(&self, key: &str, value: &str) -> Result<()>;
    fn remove_raw(&self, key: &str) -> Result<()>;

    // -- Messages --

    fn load_messages(&self, conversation_key: &str) -> Vec<Message> {
        load_json(self, &messages_key(conversation_key)).unwrap_or_default()
    }

    fn save_messages(&self, conversation_key: &str, messages: &[Message]) -> Result<()> {
        save_json(self, &messages_key(conversation_key), &messages)
    }

    fn clear_messages(&self, conversation_key: &str) -> Result<()> {
        self.remove_raw(&messages_key(conversation_key))
    }

    // -- Conversations --

    fn load_conversations(&self, user_id: &str) -> Option<Vec<Conversation>> {
        load_json(self, &conversations_key(user_id))
    }

    fn save_conversations(&self, user_id: &str, conversations: &[Conversation]) -> Result<()> {
        save_json(self, &conversations_key(user_id), &conversations)
    }

    // -- Tutorial --

    fn load_tutorial_stage(&self, user_id: &str) -> TutorialStage {
        let key = tutorial_stage_key(user_id);
        let raw = match self.get_raw(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return TutorialStage::default(),
            Err(e) => {
                warn!("Failed to read tutorial stage for {}: {}", user_id, e);
                return TutorialStage::default();
            }
        };

        match TutorialStage::parse(raw.trim()) {
            Some(stage) => stage,
            None => {
                warn!("Unknown tutorial stage '{}' for {}, resetting", raw, user_id);
                if let Err(e) = self.remove_raw(&key) {
                    warn!("Failed to clear tutorial stage for {}: {}", user_id, e);
                }
                TutorialStage::default()
            }
        }
    }

    fn save_tutorial_stage(&self, user_id: &str, stage: TutorialStage) -> Result<()> {
        self.put_raw(&tutorial_stage_key(user_id), stage.as_str())
    }

    fn clear_tutorial_stage(&self, user_id: &str) -> Result<()> {
        self.remove_raw(&tutorial_stage_key(user_id))
    }
}

fn load_json<C, T>(cache: &C, key: &str) -> Option<T>
where
    C: LocalCache + ?Sized,
    T: DeserializeOwned,
{
    let raw = match cache.get_raw(key) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!("Cache read failed for {}: {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Malformed cache entry {} ({}), clearing", key, e);
            if let Err(e) = cache.remove_raw(key) {
                warn!("Failed to clear {}: {}", key, e);
            }
            None
        }
    }
}

fn save_json<C, T>(cache: &C, key: &str, value: &T) -> Result<()>
where
    C: LocalCache + ?Sized,
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(value)?;
    cache.put_raw(key, &json)
}

/// SQLite-backed cache. Survives restarts.
pub struct SqliteCache {
    db: Arc<Database>,
}

impl SqliteCache {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl LocalCache for SqliteCache {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.db.get_value(key)
    }

    fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        self.db.put_value(key, value)
    }

    fn remove_raw(&self, key: &str) -> Result<()> {
        self.db.delete_value(key).map(|_| ())
    }
}

/// Process-local cache with the same semantics as [`SqliteCache`].
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("cache lock poisoned: {}", e))?;
        Ok(entries.get(key).cloned())
    }

    fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("cache lock poisoned: {}", e))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("cache lock poisoned: {}", e))?;
        entries.remove(key);
        Ok(())
    }
}
