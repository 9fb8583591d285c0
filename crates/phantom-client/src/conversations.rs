use std::sync::Arc;

use tracing::{debug, info, warn};

use phantom_bus::UserSubscription;
use phantom_core::tutorial::{TUTORIAL_CONVERSATION_ID, TutorialEngine, tutorial_conversation};
use phantom_types::events::ChatEvent;
use phantom_types::models::{Conversation, User};

use crate::chat::ChatContext;
use crate::error::Result;
use crate::store::{AuthService, MessageStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    /// The tutorial moved on; the bot entry may look different.
    Updated,
    /// The tutorial finished and the bot entry is gone.
    BotPurged,
}

/// The signed-in user's conversation list, with the tutorial bot pinned on
/// top until the tutorial completes.
pub struct ConversationList<S> {
    ctx: ChatContext<S>,
    viewer_id: String,
    tutorial: Option<Arc<TutorialEngine>>,
    conversations: Vec<Conversation>,
    bus: UserSubscription,
}

impl<S: MessageStore> ConversationList<S> {
    pub fn new(ctx: ChatContext<S>, viewer_id: impl Into<String>, tutorial: Option<Arc<TutorialEngine>>) -> Self {
        let viewer_id = viewer_id.into();
        let bus = ctx.bus.subscribe_user(viewer_id.clone());
        Self {
            ctx,
            viewer_id,
            tutorial,
            conversations: Vec::new(),
            bus,
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn has_bot(&self) -> bool {
        self.conversations.iter().any(|c| c.id == TUTORIAL_CONVERSATION_ID)
    }

    /// Cached list first, then the remote one. A remote failure is only an
    /// error when there was nothing cached to fall back on.
    pub async fn load(&mut self) -> Result<&[Conversation]> {
        let cached = self.ctx.cache.load_conversations(&self.viewer_id);
        let had_cache = cached.is_some();
        if let Some(cached) = cached {
            self.conversations = cached;
            self.sync_bot();
        }

        match self.ctx.store.user_conversations(&self.viewer_id).await {
            Ok(remote) => {
                debug!("Loaded {} conversations for {}", remote.len(), self.viewer_id);
                self.conversations = remote;
                self.sync_bot();
                self.persist();
            }
            Err(e) if had_cache => {
                warn!("Using cached conversations for {}: {}", self.viewer_id, e);
            }
            Err(e) => return Err(e),
        }
        Ok(&self.conversations)
    }

    pub async fn refresh(&mut self) -> Result<&[Conversation]> {
        self.load().await
    }

    /// Drop the bot entry here and in the cache. True if there was one.
    pub fn purge_bot(&mut self) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != TUTORIAL_CONVERSATION_ID);
        if self.conversations.len() == before {
            return false;
        }
        info!("Removed tutorial bot from {}'s conversations", self.viewer_id);
        self.persist();
        true
    }

    /// Wait for the next bus event that changes the list. `None` once the
    /// bus is gone.
    pub async fn next_event(&mut self) -> Option<ListEvent> {
        loop {
            let event = self.bus.recv().await?;
            if let Some(change) = self.handle_event(event) {
                return Some(change);
            }
        }
    }

    pub fn handle_event(&mut self, event: ChatEvent) -> Option<ListEvent> {
        match event {
            ChatEvent::TutorialStageChanged { .. } => Some(ListEvent::Updated),
            ChatEvent::TutorialCompleted { .. } => {
                self.purge_bot();
                Some(ListEvent::BotPurged)
            }
        }
    }

    fn sync_bot(&mut self) {
        let Some(tutorial) = &self.tutorial else {
            return;
        };
        if tutorial.is_completed() {
            self.purge_bot();
            return;
        }
        if !self.has_bot() {
            let bot = tutorial_conversation(&self.viewer_id, self.ctx.clock.now());
            self.conversations.insert(0, bot);
        }
    }

    fn persist(&self) {
        if let Err(e) = self.ctx.cache.save_conversations(&self.viewer_id, &self.conversations) {
            warn!("Failed to cache conversations for {}: {}", self.viewer_id, e);
        }
    }
}

impl<S: MessageStore + AuthService> ConversationList<S> {
    /// Look up a contact by `@handle` to start a new conversation.
    pub async fn find_user(&self, handle: &str) -> Result<Option<User>> {
        self.ctx.store.search_user_by_nickname(handle).await
    }
}
