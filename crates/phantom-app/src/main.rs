mod config;

use std::sync::Arc;

use tracing::{info, warn};

use phantom_bus::EventBus;
use phantom_client::{ChatContext, ChatView, ConversationList, MemoryStore, RevealGesture, ViewEvent};
use phantom_core::reveal::RevealState;
use phantom_core::tutorial::{TUTORIAL_BOT_ID, TutorialEngine};
use phantom_core::{Clock, SystemClock};
use phantom_db::{Database, LocalCache, SqliteCache};
use phantom_types::models::Conversation;

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "phantom=debug,phantom_client=debug,phantom_core=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;

    // Local cache
    let db = match &config.db_path {
        Some(path) => Database::open(path)?,
        None => Database::open_in_memory()?,
    };
    let cache: Arc<dyn LocalCache> = Arc::new(SqliteCache::new(Arc::new(db)));

    // Backend stand-in, seeded with the configured user
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(MemoryStore::new(clock.clone()));
    let me = config.user();
    store.insert_user(me.clone());
    store.sign_in(&me.id);

    let bus = EventBus::new();
    let ctx = ChatContext {
        store,
        cache: cache.clone(),
        bus: bus.clone(),
        clock,
        config: config.view.clone(),
    };
    let tutorial = Arc::new(TutorialEngine::new(me.id.clone(), cache, bus));

    let mut list = ConversationList::new(ctx.clone(), me.id.clone(), Some(tutorial.clone()));
    print_conversations("Conversations", list.load().await?);

    if tutorial.is_completed() {
        info!("Tutorial already completed for {}", me.id);
        return Ok(());
    }

    info!("Starting tutorial for @{} (stage: {})", me.nickname, tutorial.stage());
    let mut view = ChatView::open(ctx, me, TUTORIAL_BOT_ID, Some(tutorial)).await;
    walk_tutorial(&mut view, config.view.gesture).await;

    print_conversations("Conversations after tutorial", list.refresh().await?);
    Ok(())
}

/// Play the part of a first-time user: reveal every hidden bot message as it
/// shows up, until the bot leaves.
async fn walk_tutorial(view: &mut ChatView<MemoryStore>, gesture: RevealGesture) {
    reveal_hidden(view, gesture);

    while let Some(event) = view.next_event().await {
        match &event {
            ViewEvent::TutorialStage(stage) => {
                info!("Tutorial stage: {}", stage);
                reveal_hidden(view, gesture);
            }
            ViewEvent::NavigateAway => {
                info!("Tutorial bot left the conversation");
                break;
            }
            ViewEvent::Notice(notice) => warn!("{}", notice),
            other => info!("{:?}", other),
        }
    }
}

fn reveal_hidden(view: &mut ChatView<MemoryStore>, gesture: RevealGesture) {
    let hidden: Vec<String> = view
        .visible()
        .into_iter()
        .filter(|b| b.state == RevealState::Hidden && !b.image.is_withheld())
        .map(|b| b.id)
        .collect();

    for id in hidden {
        if let Some(message) = view.message(&id) {
            info!("Revealing: {}", message.content.replace('\n', " "));
        }
        match gesture {
            RevealGesture::Tap => {
                view.tap(&id);
            }
            RevealGesture::Hold => {
                view.press(&id);
            }
        }
    }
}

fn print_conversations(title: &str, conversations: &[Conversation]) {
    info!("{} ({}):", title, conversations.len());
    for conv in conversations {
        info!("  {} @{} unread={}", conv.user.name, conv.user.nickname, conv.unread_count);
    }
}
