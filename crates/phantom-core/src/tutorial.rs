//! Scripted onboarding bot.
//!
//! The bot is not a real participant. Its conversation is re-derived from the
//! persisted [`TutorialStage`] every time it is read, and the stage only ever
//! moves forward:
//!
//! ```text
//! greeting --(opened, 500ms)--> test-message --(test expired, 500ms)-->
//! congratulations --(5000ms)--> completed
//! ```
//!
//! `completed` tears the bot down and tells every listener to forget it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, info, warn};

use phantom_bus::EventBus;
use phantom_db::LocalCache;
use phantom_types::events::ChatEvent;
use phantom_types::models::{Conversation, Message, TutorialStage, User};

use crate::scheduler::TaskHandle;

pub const TUTORIAL_BOT_ID: &str = "bot-tutorial";
pub const TUTORIAL_CONVERSATION_ID: &str = "conv-bot-tutorial";

pub const GREETING_ID: &str = "tutorial-greeting";
pub const INSTRUCTIONS_ID: &str = "tutorial-instructions";
pub const TEST_MESSAGE_ID: &str = "tutorial-test-message";
pub const CONGRATULATIONS_ID: &str = "tutorial-congratulations";

pub const TEST_MESSAGE_EXPIRES_IN: u32 = 5;

const GREETING_TEXT: &str = "Hi! I'm the Tutorial Bot.\n\n\
    I'm here to show you how Phantom works.\n\n\
    Messages here are SECRET and stay blurred until you reveal them.";
const INSTRUCTIONS_TEXT: &str = "Next I'll send you a BLURRED test message.\n\n\
    Tap it (or press and hold) to reveal it.\n\n\
    Once revealed it stays visible for only 5 seconds, then it disappears.\n\n\
    Ready? Here it comes...";
const TEST_MESSAGE_TEXT: &str = "You did it! You revealed a secret message.\n\n\
    Simple, right? It will vanish in 5 seconds...";
const CONGRATULATIONS_TEXT: &str = "Congratulations!\n\n\
    You finished the tutorial.\n\n\
    Welcome to Phantom! Add contacts with @ and start sending secret messages.\n\n\
    See you!";

#[derive(Debug, Clone, Copy)]
pub struct TutorialTiming {
    /// Greeting shown, conversation opened: wait this long before the test message.
    pub open_delay: Duration,
    /// Test message expired: wait this long before congratulating.
    pub congratulate_delay: Duration,
    /// Congratulations shown: wait this long before the bot leaves.
    pub farewell_delay: Duration,
}

impl Default for TutorialTiming {
    fn default() -> Self {
        Self {
            open_delay: Duration::from_millis(500),
            congratulate_delay: Duration::from_millis(500),
            farewell_delay: Duration::from_millis(5000),
        }
    }
}

pub fn tutorial_bot() -> User {
    User {
        id: TUTORIAL_BOT_ID.to_string(),
        name: "Tutorial Bot".to_string(),
        nickname: "tutorial".to_string(),
        email: "tutorial@phantom.chat".to_string(),
        phone: String::new(),
        avatar: "\u{1F916}".to_string(),
        is_online: true,
        last_seen: None,
    }
}

pub fn tutorial_conversation(viewer_id: &str, now: DateTime<Utc>) -> Conversation {
    Conversation {
        id: TUTORIAL_CONVERSATION_ID.to_string(),
        user: tutorial_bot(),
        last_message: Some(greeting(viewer_id, now)),
        unread_count: 1,
    }
}

fn bot_message(id: &str, viewer_id: &str, content: &str, at: DateTime<Utc>) -> Message {
    let mut msg = Message::text(id, TUTORIAL_BOT_ID, viewer_id, content);
    msg.timestamp = at;
    msg.is_revealed = true;
    msg
}

fn greeting(viewer_id: &str, now: DateTime<Utc>) -> Message {
    bot_message(GREETING_ID, viewer_id, GREETING_TEXT, now - ChronoDuration::seconds(60))
}

/// The bot conversation as it looks at `stage`. Pure: same stage, same list.
pub fn tutorial_messages(stage: TutorialStage, viewer_id: &str, now: DateTime<Utc>) -> Vec<Message> {
    if stage == TutorialStage::Completed {
        return Vec::new();
    }

    let mut messages = vec![greeting(viewer_id, now)];
    if stage == TutorialStage::Greeting {
        return messages;
    }

    messages.push(bot_message(
        INSTRUCTIONS_ID,
        viewer_id,
        INSTRUCTIONS_TEXT,
        now - ChronoDuration::seconds(50),
    ));

    if stage == TutorialStage::Congratulations {
        // The test message has expired by now; it never comes back.
        messages.push(bot_message(
            CONGRATULATIONS_ID,
            viewer_id,
            CONGRATULATIONS_TEXT,
            now - ChronoDuration::seconds(10),
        ));
        return messages;
    }

    let mut test = Message::text(TEST_MESSAGE_ID, TUTORIAL_BOT_ID, viewer_id, TEST_MESSAGE_TEXT);
    test.timestamp = now - ChronoDuration::seconds(40);
    test.expires_in = Some(TEST_MESSAGE_EXPIRES_IN);
    messages.push(test);
    messages
}

/// Persisted stage plus the side effects of moving it. Cheap to clone into
/// timer tasks.
#[derive(Clone)]
struct StageStore {
    user_id: String,
    cache: Arc<dyn LocalCache>,
    bus: EventBus,
}

impl StageStore {
    fn current(&self) -> TutorialStage {
        self.cache.load_tutorial_stage(&self.user_id)
    }

    /// Move forward to `next`. Refuses to move backwards or sideways.
    fn advance(&self, next: TutorialStage) -> bool {
        let current = self.current();
        if next <= current {
            debug!("Tutorial for {} already at {}, not moving to {}", self.user_id, current, next);
            return false;
        }
        if let Err(e) = self.cache.save_tutorial_stage(&self.user_id, next) {
            warn!("Failed to persist tutorial stage {} for {}: {}", next, self.user_id, e);
            return false;
        }
        info!("Tutorial for {}: {} -> {}", self.user_id, current, next);
        true
    }

    fn announce_stage(&self, stage: TutorialStage) {
        self.bus.publish(ChatEvent::TutorialStageChanged {
            user_id: self.user_id.clone(),
            stage,
        });
    }

    fn complete(&self) {
        if !self.advance(TutorialStage::Completed) {
            return;
        }
        self.tear_down();
        self.bus.publish(ChatEvent::TutorialCompleted {
            user_id: self.user_id.clone(),
        });
    }

    fn tear_down(&self) {
        if let Err(e) = self.cache.clear_messages(TUTORIAL_BOT_ID) {
            warn!("Failed to clear tutorial messages for {}: {}", self.user_id, e);
        }
        if let Some(mut conversations) = self.cache.load_conversations(&self.user_id) {
            let before = conversations.len();
            conversations.retain(|c| c.id != TUTORIAL_CONVERSATION_ID);
            if conversations.len() != before {
                if let Err(e) = self.cache.save_conversations(&self.user_id, &conversations) {
                    warn!("Failed to drop tutorial conversation for {}: {}", self.user_id, e);
                }
            }
        }
    }
}

#[derive(Default)]
struct Timers {
    open: Option<TaskHandle>,
    finale: Option<TaskHandle>,
}

/// Drives the tutorial for one user. Dropping the engine cancels any pending
/// stage change.
pub struct TutorialEngine {
    store: StageStore,
    timing: TutorialTiming,
    timers: Mutex<Timers>,
}

impl TutorialEngine {
    pub fn new(user_id: impl Into<String>, cache: Arc<dyn LocalCache>, bus: EventBus) -> Self {
        Self::with_timing(user_id, cache, bus, TutorialTiming::default())
    }

    pub fn with_timing(
        user_id: impl Into<String>,
        cache: Arc<dyn LocalCache>,
        bus: EventBus,
        timing: TutorialTiming,
    ) -> Self {
        Self {
            store: StageStore {
                user_id: user_id.into(),
                cache,
                bus,
            },
            timing,
            timers: Mutex::new(Timers::default()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.store.user_id
    }

    pub fn stage(&self) -> TutorialStage {
        self.store.current()
    }

    pub fn is_completed(&self) -> bool {
        self.stage() == TutorialStage::Completed
    }

    pub fn messages(&self, now: DateTime<Utc>) -> Vec<Message> {
        tutorial_messages(self.stage(), &self.store.user_id, now)
    }

    /// The user opened the bot conversation. Only the first open, while still
    /// at the greeting, schedules the test message.
    ///
    /// A tutorial left at `congratulations` by an earlier session has no
    /// farewell pending; opening it schedules one.
    pub fn conversation_opened(&self) {
        let stage = self.stage();
        if stage == TutorialStage::Congratulations {
            self.resume_farewell();
            return;
        }
        if stage != TutorialStage::Greeting {
            return;
        }
        let Ok(mut timers) = self.timers.lock() else {
            return;
        };
        if timers.open.as_ref().is_some_and(TaskHandle::is_active) {
            return;
        }

        let store = self.store.clone();
        timers.open = Some(TaskHandle::after(self.timing.open_delay, async move {
            if store.current() == TutorialStage::Greeting && store.advance(TutorialStage::TestMessage) {
                store.announce_stage(TutorialStage::TestMessage);
            }
        }));
    }

    pub fn message_revealed(&self, message_id: &str) {
        // Nothing advances on reveal; the script waits for expiry.
        debug!("Tutorial message revealed: {}", message_id);
    }

    /// A bot message finished its countdown. The test message expiring is the
    /// cue for the finale.
    pub fn message_expired(&self, message_id: &str) {
        if message_id != TEST_MESSAGE_ID || self.stage() != TutorialStage::TestMessage {
            return;
        }
        let Ok(mut timers) = self.timers.lock() else {
            return;
        };
        if timers.finale.as_ref().is_some_and(TaskHandle::is_active) {
            return;
        }

        let store = self.store.clone();
        let timing = self.timing;
        timers.finale = Some(TaskHandle::spawn(async move {
            tokio::time::sleep(timing.congratulate_delay).await;
            if !store.advance(TutorialStage::Congratulations) {
                return;
            }
            store.announce_stage(TutorialStage::Congratulations);

            tokio::time::sleep(timing.farewell_delay).await;
            store.complete();
        }));
    }

    fn resume_farewell(&self) {
        let Ok(mut timers) = self.timers.lock() else {
            return;
        };
        if timers.finale.as_ref().is_some_and(TaskHandle::is_active) {
            return;
        }
        debug!("Tutorial for {} resuming farewell", self.store.user_id);
        let store = self.store.clone();
        timers.finale = Some(TaskHandle::after(self.timing.farewell_delay, async move {
            store.complete();
        }));
    }

    /// Start over: forget the stage and the cached bot conversation.
    pub fn reset(&self) {
        if let Ok(mut timers) = self.timers.lock() {
            *timers = Timers::default();
        }
        if let Err(e) = self.store.cache.clear_tutorial_stage(&self.store.user_id) {
            warn!("Failed to reset tutorial for {}: {}", self.store.user_id, e);
        }
        if let Err(e) = self.store.cache.clear_messages(TUTORIAL_BOT_ID) {
            warn!("Failed to clear tutorial messages: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phantom_db::MemoryCache;

    /// Reads come back empty and every write fails.
    struct BrokenCache;

    impl LocalCache for BrokenCache {
        fn get_raw(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        fn put_raw(&self, key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk full writing {}", key)
        }

        fn remove_raw(&self, _key: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn ids(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    fn engine() -> (TutorialEngine, Arc<MemoryCache>, EventBus) {
        let cache = Arc::new(MemoryCache::new());
        let bus = EventBus::new();
        let engine = TutorialEngine::new("alice", cache.clone(), bus.clone());
        (engine, cache, bus)
    }

    #[test]
    fn messages_are_a_function_of_stage() {
        let now = Utc::now();
        assert_eq!(ids(&tutorial_messages(TutorialStage::Greeting, "u", now)), vec![GREETING_ID]);
        assert_eq!(
            ids(&tutorial_messages(TutorialStage::TestMessage, "u", now)),
            vec![GREETING_ID, INSTRUCTIONS_ID, TEST_MESSAGE_ID]
        );
        assert_eq!(
            ids(&tutorial_messages(TutorialStage::Instructions, "u", now)),
            vec![GREETING_ID, INSTRUCTIONS_ID, TEST_MESSAGE_ID]
        );
        assert_eq!(
            ids(&tutorial_messages(TutorialStage::Congratulations, "u", now)),
            vec![GREETING_ID, INSTRUCTIONS_ID, CONGRATULATIONS_ID]
        );
        assert!(tutorial_messages(TutorialStage::Completed, "u", now).is_empty());

        let test = &tutorial_messages(TutorialStage::TestMessage, "u", now)[2];
        assert!(!test.is_revealed);
        assert_eq!(test.expires_in, Some(TEST_MESSAGE_EXPIRES_IN));
        assert_eq!(test.receiver_id, "u");
    }

    #[tokio::test(start_paused = true)]
    async fn opening_twice_schedules_once() {
        let (engine, _cache, bus) = engine();
        let mut rx = bus.subscribe();

        engine.conversation_opened();
        engine.conversation_opened();
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(engine.stage(), TutorialStage::Greeting);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(engine.stage(), TutorialStage::TestMessage);
        assert_eq!(
            rx.try_recv().unwrap(),
            ChatEvent::TutorialStageChanged {
                user_id: "alice".into(),
                stage: TutorialStage::TestMessage
            }
        );
        assert!(rx.try_recv().is_err());

        // Re-entering later does nothing.
        engine.conversation_opened();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn finale_runs_after_test_message_expires() {
        let (engine, cache, bus) = engine();
        cache.save_tutorial_stage("alice", TutorialStage::TestMessage).unwrap();
        cache
            .save_conversations("alice", &[tutorial_conversation("alice", Utc::now())])
            .unwrap();
        cache
            .save_messages(TUTORIAL_BOT_ID, &engine.messages(Utc::now()))
            .unwrap();
        let mut rx = bus.subscribe();

        engine.message_expired(GREETING_ID);
        engine.message_expired(TEST_MESSAGE_ID);
        engine.message_expired(TEST_MESSAGE_ID);

        tokio::time::sleep(Duration::from_millis(501)).await;
        assert_eq!(engine.stage(), TutorialStage::Congratulations);
        assert!(matches!(
            rx.try_recv(),
            Ok(ChatEvent::TutorialStageChanged { stage: TutorialStage::Congratulations, .. })
        ));

        tokio::time::sleep(Duration::from_millis(4998)).await;
        assert_eq!(engine.stage(), TutorialStage::Congratulations);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(engine.is_completed());
        assert_eq!(
            rx.try_recv().unwrap(),
            ChatEvent::TutorialCompleted {
                user_id: "alice".into()
            }
        );
        assert!(rx.try_recv().is_err());
        assert!(cache.load_messages(TUTORIAL_BOT_ID).is_empty());
        assert_eq!(cache.load_conversations("alice"), Some(vec![]));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_outside_test_stage_is_ignored() {
        let (engine, _cache, bus) = engine();
        let mut rx = bus.subscribe();
        engine.message_expired(TEST_MESSAGE_ID);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(engine.stage(), TutorialStage::Greeting);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_engine_cancels_pending_stage_change() {
        let (engine, cache, _bus) = engine();
        engine.conversation_opened();
        drop(engine);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(cache.load_tutorial_stage("alice"), TutorialStage::Greeting);
    }

    #[tokio::test(start_paused = true)]
    async fn reopening_at_congratulations_finishes_the_tutorial() {
        let (engine, cache, bus) = engine();
        cache.save_tutorial_stage("alice", TutorialStage::Congratulations).unwrap();
        let mut rx = bus.subscribe();

        engine.conversation_opened();
        engine.conversation_opened();
        tokio::time::sleep(Duration::from_millis(5001)).await;

        assert!(engine.is_completed());
        assert_eq!(
            rx.try_recv().unwrap(),
            ChatEvent::TutorialCompleted {
                user_id: "alice".into()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stage_never_moves_backwards() {
        let (engine, cache, _bus) = engine();
        cache.save_tutorial_stage("alice", TutorialStage::Congratulations).unwrap();
        assert!(!engine.store.advance(TutorialStage::TestMessage));
        assert!(!engine.store.advance(TutorialStage::Congratulations));
        assert!(engine.store.advance(TutorialStage::Completed));
        assert!(engine.is_completed());

        engine.reset();
        assert_eq!(engine.stage(), TutorialStage::Greeting);
    }

    #[tokio::test(start_paused = true)]
    async fn unsaved_stage_is_never_announced() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let engine = TutorialEngine::new("alice", Arc::new(BrokenCache), bus.clone());

        assert!(!engine.store.advance(TutorialStage::TestMessage));
        engine.conversation_opened();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(engine.stage(), TutorialStage::Greeting);
        assert!(rx.try_recv().is_err());
    }
}
