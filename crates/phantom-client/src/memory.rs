use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use tracing::debug;
use uuid::Uuid;

use phantom_core::clock::{Clock, SystemClock};
use phantom_types::api::SendMessageRequest;
use phantom_types::models::{Conversation, Message, MessageKind, ProfilePatch, RequestStatus, User};

use crate::error::{ClientError, Result};
use crate::store::{AuthService, MessageStore};

/// In-process stand-in for the backend service.
///
/// Behaves like the hosted backend as far as the client can tell: new
/// messages start hidden, reveal stamps `expires_at`, loads come back oldest
/// first. `set_offline(true)` makes every call fail the way a dropped network
/// would.
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    offline: AtomicBool,
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    current_user: Option<String>,
    users: HashMap<String, User>,
    messages: Vec<Message>,
    deleted: Vec<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            offline: AtomicBool::new(false),
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn insert_user(&self, user: User) {
        self.lock().users.insert(user.id.clone(), user);
    }

    pub fn sign_in(&self, user_id: &str) {
        self.lock().current_user = Some(user_id.to_string());
    }

    /// Put a message in storage as-is, bypassing send defaults.
    pub fn seed(&self, message: Message) {
        let mut state = self.lock();
        state.messages.push(message);
        state.messages.sort_by_key(|m| m.timestamp);
    }

    pub fn message(&self, message_id: &str) -> Option<Message> {
        self.lock().messages.iter().find(|m| m.id == message_id).cloned()
    }

    /// Ids passed to successful `delete_message` calls, in call order.
    pub fn deleted_ids(&self) -> Vec<String> {
        self.lock().deleted.clone()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ClientError::Remote("backend unreachable".into()));
        }
        Ok(())
    }
}

impl MessageStore for MemoryStore {
    async fn send_message(&self, request: SendMessageRequest) -> Result<Message> {
        self.ensure_online()?;

        let expires_in = request.effective_expires_in();
        let message = Message {
            id: Uuid::new_v4().to_string(),
            content: request.content,
            sender_id: request.sender_id,
            receiver_id: request.receiver_id,
            timestamp: self.clock.now(),
            is_read: false,
            is_revealed: false,
            expires_in: Some(expires_in),
            expires_at: None,
            kind: request.kind,
        };

        self.lock().messages.push(message.clone());
        debug!("Stored message {} ({} -> {})", message.id, message.sender_id, message.receiver_id);
        Ok(message)
    }

    async fn load_messages(&self, user_a: &str, user_b: &str) -> Result<Vec<Message>> {
        self.ensure_online()?;
        let state = self.lock();
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.is_between(user_a, user_b))
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    async fn reveal_message(&self, message_id: &str) -> Result<()> {
        self.ensure_online()?;
        let now = self.clock.now();
        let mut state = self.lock();
        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| ClientError::NotFound(message_id.to_string()))?;

        if !message.is_revealed {
            let expires_in = message.expires_in.unwrap_or(phantom_types::api::DEFAULT_EXPIRES_IN);
            message.is_revealed = true;
            message.is_read = true;
            message.expires_at = Some(now + Duration::seconds(i64::from(expires_in)));
        }
        Ok(())
    }

    async fn delete_message(&self, message_id: &str) -> Result<()> {
        self.ensure_online()?;
        let mut state = self.lock();
        state.messages.retain(|m| m.id != message_id);
        state.deleted.push(message_id.to_string());
        Ok(())
    }

    async fn update_request_status(&self, message_id: &str, status: RequestStatus) -> Result<()> {
        self.ensure_online()?;
        let mut state = self.lock();
        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| ClientError::NotFound(message_id.to_string()))?;

        match &mut message.kind {
            MessageKind::Request { metadata } => {
                metadata.status = status;
                Ok(())
            }
            _ => Err(ClientError::Remote(format!("{} is not a request", message_id))),
        }
    }

    async fn user_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        self.ensure_online()?;
        let state = self.lock();

        let mut by_peer: HashMap<&str, Conversation> = HashMap::new();
        for message in &state.messages {
            let peer_id = if message.sender_id == user_id {
                message.receiver_id.as_str()
            } else if message.receiver_id == user_id {
                message.sender_id.as_str()
            } else {
                continue;
            };

            let conversation = by_peer.entry(peer_id).or_insert_with(|| Conversation {
                id: format!("conv-{}", peer_id),
                user: state.users.get(peer_id).cloned().unwrap_or_else(|| placeholder(peer_id)),
                last_message: None,
                unread_count: 0,
            });

            if message.receiver_id == user_id && !message.is_read {
                conversation.unread_count += 1;
            }
            let newer = conversation
                .last_message
                .as_ref()
                .is_none_or(|last| last.timestamp <= message.timestamp);
            if newer {
                conversation.last_message = Some(message.clone());
            }
        }

        let mut conversations: Vec<Conversation> = by_peer.into_values().collect();
        conversations.sort_by(|a, b| {
            let at = a.last_message.as_ref().map(|m| m.timestamp);
            let bt = b.last_message.as_ref().map(|m| m.timestamp);
            bt.cmp(&at)
        });
        Ok(conversations)
    }
}

impl AuthService for MemoryStore {
    async fn current_user(&self) -> Result<Option<User>> {
        self.ensure_online()?;
        let state = self.lock();
        Ok(state
            .current_user
            .as_ref()
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn update_user_profile(&self, user_id: &str, patch: ProfilePatch) -> Result<User> {
        self.ensure_online()?;
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| ClientError::NotFound(user_id.to_string()))?;
        user.apply(patch);
        Ok(user.clone())
    }

    async fn search_user_by_nickname(&self, handle: &str) -> Result<Option<User>> {
        self.ensure_online()?;
        let wanted = handle.trim().trim_start_matches('@').to_lowercase();
        let state = self.lock();
        Ok(state
            .users
            .values()
            .find(|u| u.nickname.to_lowercase() == wanted)
            .cloned())
    }
}

fn placeholder(user_id: &str) -> User {
    User {
        id: user_id.to_string(),
        name: user_id.to_string(),
        nickname: user_id.to_string(),
        email: String::new(),
        phone: String::new(),
        avatar: String::new(),
        is_online: false,
        last_seen: None,
    }
}
