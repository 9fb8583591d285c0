//! Integration tests: whole-conversation flows against the in-memory backend
//! with tokio's clock paused, so every countdown runs to the millisecond.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::Instant;

use phantom_bus::EventBus;
use phantom_client::{
    ChatContext, ChatView, ConversationList, ListEvent, MemoryStore, RevealGesture, ViewConfig,
    ViewEvent,
};
use phantom_core::{Clock, ManualClock};
use phantom_core::access::ImageAccess;
use phantom_core::hold::HoldOutcome;
use phantom_core::request::{Decision, RequestView};
use phantom_core::reveal::RevealState;
use phantom_core::tutorial::{
    CONGRATULATIONS_ID, GREETING_ID, INSTRUCTIONS_ID, TEST_MESSAGE_ID, TUTORIAL_BOT_ID, TutorialEngine,
};
use phantom_db::{LocalCache, MemoryCache};
use phantom_types::api::SendMessageRequest;
use phantom_types::models::{Message, MessageKind, RequestMetadata, RequestStatus, TutorialStage, User};

struct World {
    ctx: ChatContext<MemoryStore>,
    store: Arc<MemoryStore>,
    cache: Arc<MemoryCache>,
    clock: Arc<ManualClock>,
}

fn world(config: ViewConfig) -> World {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let store = Arc::new(MemoryStore::new(clock.clone()));
    let cache = Arc::new(MemoryCache::new());
    let ctx = ChatContext {
        store: store.clone(),
        cache: cache.clone(),
        bus: EventBus::new(),
        clock: clock.clone(),
        config,
    };
    World {
        ctx,
        store,
        cache,
        clock,
    }
}

fn user(id: &str) -> User {
    User {
        id: id.into(),
        name: id.into(),
        nickname: id.into(),
        email: format!("{}@example.com", id),
        phone: String::new(),
        avatar: String::new(),
        is_online: true,
        last_seen: None,
    }
}

fn secret(id: &str, from: &str, to: &str, expires_in: u32) -> Message {
    let mut msg = Message::text(id, from, to, "meet at noon");
    msg.expires_in = Some(expires_in);
    msg
}

fn assert_at(start: Instant, ms: u64) {
    let elapsed = start.elapsed();
    let expected = Duration::from_millis(ms);
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(5),
        "expected ~{:?}, got {:?}",
        expected,
        elapsed
    );
}

async fn until_removed(view: &mut ChatView<MemoryStore>, id: &str) -> Vec<ViewEvent> {
    let mut seen = Vec::new();
    while let Some(event) = view.next_event().await {
        let done = event == ViewEvent::Removed { id: id.into() };
        seen.push(event);
        if done {
            break;
        }
    }
    seen
}

#[tokio::test(start_paused = true)]
async fn revealed_message_expires_once_after_countdown_and_grace() {
    let w = world(ViewConfig::default());
    w.store.seed(secret("m1", "bob", "alice", 5));
    let mut view = ChatView::open(w.ctx.clone(), user("alice"), "bob", None).await;

    let start = Instant::now();
    assert_eq!(view.tap("m1"), Some(5));
    let events = until_removed(&mut view, "m1").await;
    assert_at(start, 5300);

    let ticks: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            ViewEvent::Ticked { remaining, .. } => Some(*remaining),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec![4, 3, 2, 1]);
    assert!(events.contains(&ViewEvent::Expiring { id: "m1".into() }));

    // Let the fire-and-forget delete land, then keep polling for a while.
    tokio::time::sleep(Duration::from_secs(7)).await;
    view.refresh().await.unwrap();
    assert_eq!(w.store.deleted_ids(), vec!["m1".to_string()]);
    assert!(view.message("m1").is_none());
}

#[tokio::test(start_paused = true)]
async fn reload_past_expiry_removes_immediately() {
    let w = world(ViewConfig::default());
    let mut msg = secret("m1", "bob", "alice", 10);
    msg.is_revealed = true;
    msg.expires_at = Some(w.clock.now() - ChronoDuration::seconds(2));
    w.store.seed(msg);

    let start = Instant::now();
    let mut view = ChatView::open(w.ctx.clone(), user("alice"), "bob", None).await;
    assert_eq!(view.next_event().await, Some(ViewEvent::Removed { id: "m1".into() }));
    assert_at(start, 0);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(w.store.deleted_ids(), vec!["m1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn reload_mid_countdown_resumes_from_server_expiry() {
    let w = world(ViewConfig::default());
    let mut msg = secret("m1", "bob", "alice", 10);
    msg.is_revealed = true;
    msg.expires_at = Some(w.clock.now() + ChronoDuration::milliseconds(3200));
    w.store.seed(msg);

    let mut view = ChatView::open(w.ctx.clone(), user("alice"), "bob", None).await;
    assert_eq!(view.state("m1"), Some(RevealState::Counting { remaining: 4 }));
    assert_eq!(view.tap("m1"), None);
}

#[tokio::test(start_paused = true)]
async fn hold_must_last_the_full_threshold() {
    let w = world(ViewConfig {
        gesture: RevealGesture::Hold,
        ..ViewConfig::default()
    });
    w.store.seed(secret("m1", "bob", "alice", 5));
    let mut view = ChatView::open(w.ctx.clone(), user("alice"), "bob", None).await;

    assert!(view.press("m1"));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!((view.hold_progress("m1") - 0.5).abs() < 0.01);
    assert_eq!(view.release("m1"), HoldOutcome::Cancelled);
    assert_eq!(view.hold_progress("m1"), 0.0);
    assert_eq!(view.state("m1"), Some(RevealState::Hidden));
    assert!(!view.message("m1").unwrap().is_revealed);

    let start = Instant::now();
    assert!(view.press("m1"));
    assert_eq!(
        view.next_event().await,
        Some(ViewEvent::Revealed {
            id: "m1".into(),
            expires_in: 5
        })
    );
    assert_at(start, 600);
    assert_eq!(view.state("m1"), Some(RevealState::Counting { remaining: 5 }));
    assert_eq!(view.release("m1"), HoldOutcome::Idle);
}

#[tokio::test(start_paused = true)]
async fn restricted_image_is_withheld_from_unlisted_viewers() {
    let w = world(ViewConfig::default());
    let photo = |id: &str, to: &str| {
        let mut msg = secret(id, "carol", to, 10);
        msg.kind = MessageKind::Image {
            image_url: "https://cdn.example.com/p.jpg".into(),
            allowed_nicknames: vec!["Alice".into()],
        };
        msg
    };
    w.store.seed(photo("to-bob", "bob"));
    w.store.seed(photo("to-alice", "alice"));

    let mut bob = ChatView::open(w.ctx.clone(), user("bob"), "carol", None).await;
    let shown = bob.bubble_view("to-bob").unwrap();
    assert!(shown.image.is_withheld());
    assert_eq!(shown.image.label().as_deref(), Some("Image visible only to @alice"));
    assert_eq!(bob.tap("to-bob"), None);
    assert_eq!(bob.state("to-bob"), Some(RevealState::Hidden));

    let mut alice = ChatView::open(w.ctx.clone(), user("alice"), "carol", None).await;
    assert_eq!(alice.bubble_view("to-alice").unwrap().image, ImageAccess::Granted);
    assert_eq!(alice.tap("to-alice"), Some(10));
}

#[tokio::test(start_paused = true)]
async fn request_is_answered_once_and_sender_sees_it() {
    let w = world(ViewConfig::default());
    let mut alice = ChatView::open(w.ctx.clone(), user("alice"), "bob", None).await;

    let mut ask = SendMessageRequest::text("alice", "bob", "Can I see your screen?");
    ask.kind = MessageKind::Request {
        metadata: RequestMetadata::default(),
    };
    let sent = alice.send(ask).await.unwrap();
    assert_eq!(alice.state(&sent.id), Some(RevealState::Visible));

    let mut bob = ChatView::open(w.ctx.clone(), user("bob"), "alice", None).await;
    let view = bob.bubble_view(&sent.id).unwrap();
    assert_eq!(view.request, Some(RequestView::Actions));
    assert!(!view.blurred);

    assert_eq!(bob.respond(&sent.id, Decision::Accept), Some(RequestStatus::Accepted));
    assert_eq!(bob.respond(&sent.id, Decision::Accept), None);
    assert_eq!(bob.respond(&sent.id, Decision::Reject), None);
    assert_eq!(
        bob.bubble_view(&sent.id).unwrap().request,
        Some(RequestView::Answered(RequestStatus::Accepted))
    );

    assert_eq!(alice.next_event().await, Some(ViewEvent::Refreshed));
    assert_eq!(
        alice.bubble_view(&sent.id).unwrap().request,
        Some(RequestView::Status(RequestStatus::Accepted))
    );
    assert_eq!(
        w.store.message(&sent.id).unwrap().request_status(),
        Some(RequestStatus::Accepted)
    );
}

#[tokio::test(start_paused = true)]
async fn tutorial_runs_from_greeting_to_removal() {
    let w = world(ViewConfig::default());
    let tutorial = Arc::new(TutorialEngine::new("alice", w.cache.clone(), w.ctx.bus.clone()));

    let mut list = ConversationList::new(w.ctx.clone(), "alice", Some(tutorial.clone()));
    list.load().await.unwrap();
    assert!(list.has_bot());

    let start = Instant::now();
    let mut bot = ChatView::open(w.ctx.clone(), user("alice"), TUTORIAL_BOT_ID, Some(tutorial.clone())).await;
    assert_eq!(bot.message_ids(), vec![GREETING_ID]);
    assert_eq!(bot.state(GREETING_ID), Some(RevealState::Visible));

    assert_eq!(
        bot.next_event().await,
        Some(ViewEvent::TutorialStage(TutorialStage::TestMessage))
    );
    assert_at(start, 500);
    assert_eq!(bot.message_ids(), vec![GREETING_ID, INSTRUCTIONS_ID, TEST_MESSAGE_ID]);
    assert!(bot.bubble_view(TEST_MESSAGE_ID).unwrap().blurred);

    assert_eq!(bot.tap(TEST_MESSAGE_ID), Some(5));
    until_removed(&mut bot, TEST_MESSAGE_ID).await;
    assert_at(start, 5800);

    assert_eq!(
        bot.next_event().await,
        Some(ViewEvent::TutorialStage(TutorialStage::Congratulations))
    );
    assert_at(start, 6300);
    assert_eq!(bot.message_ids(), vec![GREETING_ID, INSTRUCTIONS_ID, CONGRATULATIONS_ID]);

    assert_eq!(bot.next_event().await, Some(ViewEvent::NavigateAway));
    assert_at(start, 11300);
    assert!(bot.is_closed());
    assert_eq!(bot.next_event().await, None);

    assert_eq!(list.next_event().await, Some(ListEvent::Updated));
    assert_eq!(list.next_event().await, Some(ListEvent::Updated));
    assert_eq!(list.next_event().await, Some(ListEvent::BotPurged));
    assert!(!list.has_bot());

    assert!(tutorial.is_completed());
    assert!(w.cache.load_messages(TUTORIAL_BOT_ID).is_empty());
    assert!(w.cache.load_conversations("alice").unwrap().is_empty());
    // Bot messages are never deleted from the remote store.
    assert!(w.store.deleted_ids().is_empty());

    // Coming back later finds nothing to show.
    let mut again = ChatView::open(w.ctx.clone(), user("alice"), TUTORIAL_BOT_ID, Some(tutorial)).await;
    assert_eq!(again.next_event().await, Some(ViewEvent::NavigateAway));
    assert!(again.message_ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn revealed_test_message_stays_revealed_across_reopen() {
    let w = world(ViewConfig::default());
    let tutorial = Arc::new(TutorialEngine::new("alice", w.cache.clone(), w.ctx.bus.clone()));

    let mut bot = ChatView::open(w.ctx.clone(), user("alice"), TUTORIAL_BOT_ID, Some(tutorial.clone())).await;
    assert_eq!(
        bot.next_event().await,
        Some(ViewEvent::TutorialStage(TutorialStage::TestMessage))
    );
    assert_eq!(bot.tap(TEST_MESSAGE_ID), Some(5));
    bot.close();

    // Back two seconds later: the countdown picks up where it left off.
    w.clock.advance(ChronoDuration::seconds(2));
    let mut bot = ChatView::open(w.ctx.clone(), user("alice"), TUTORIAL_BOT_ID, Some(tutorial.clone())).await;
    assert_eq!(bot.message(TEST_MESSAGE_ID).map(|m| m.is_revealed), Some(true));
    assert_eq!(bot.state(TEST_MESSAGE_ID), Some(RevealState::Counting { remaining: 3 }));
    assert_eq!(bot.tap(TEST_MESSAGE_ID), None);
    bot.close();

    // Back well after expiry: the message goes at once and the finale runs.
    w.clock.advance(ChronoDuration::seconds(30));
    let start = Instant::now();
    let mut bot = ChatView::open(w.ctx.clone(), user("alice"), TUTORIAL_BOT_ID, Some(tutorial.clone())).await;
    assert_eq!(bot.next_event().await, Some(ViewEvent::Removed { id: TEST_MESSAGE_ID.into() }));
    assert_at(start, 0);
    assert_eq!(
        bot.next_event().await,
        Some(ViewEvent::TutorialStage(TutorialStage::Congratulations))
    );
    assert_at(start, 500);
    assert_eq!(bot.message_ids(), vec![GREETING_ID, INSTRUCTIONS_ID, CONGRATULATIONS_ID]);
}
