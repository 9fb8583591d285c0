//! Per-conversation controller.
//!
//! A [`ChatView`] owns every message bubble of one open conversation together
//! with the timers that drive them. Timer tasks never touch view state; they
//! post a [`TimerEvent`] back over an mpsc channel and the owner applies it on
//! its next [`ChatView::next_event`] call. Dropping the view drops every
//! bubble, and with them every pending countdown, grace and hold timer.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use phantom_bus::{EventBus, UserSubscription};
use phantom_core::access::{ImageAccess, image_access};
use phantom_core::clock::Clock;
use phantom_core::hold::{HOLD_THRESHOLD, HoldGesture, HoldOutcome};
use phantom_core::request::{self, Decision, RequestView};
use phantom_core::reveal::{EXIT_GRACE, RevealMachine, RevealState, TICK_INTERVAL, Tick};
use phantom_core::scheduler::TaskHandle;
use phantom_core::tutorial::{TUTORIAL_BOT_ID, TutorialEngine};
use phantom_db::LocalCache;
use phantom_types::api::{DEFAULT_EXPIRES_IN, SendMessageRequest};
use phantom_types::events::ChatEvent;
use phantom_types::models::{Message, RequestStatus, TutorialStage, User};

use crate::error::{ClientError, Result};
use crate::store::MessageStore;

/// Id prefix of messages the remote store never accepted.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Which gesture reveals a hidden message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealGesture {
    #[default]
    Tap,
    Hold,
}

impl RevealGesture {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tap" => Some(Self::Tap),
            "hold" => Some(Self::Hold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Countdown applied when a message carries no usable `expires_in`.
    pub default_expires_in: u32,
    pub poll_interval: Duration,
    pub gesture: RevealGesture,
    pub hold_threshold: Duration,
    pub tick: Duration,
    pub exit_grace: Duration,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_expires_in: DEFAULT_EXPIRES_IN,
            poll_interval: Duration::from_secs(3),
            gesture: RevealGesture::Tap,
            hold_threshold: HOLD_THRESHOLD,
            tick: TICK_INTERVAL,
            exit_grace: EXIT_GRACE,
        }
    }
}

/// Collaborators shared by every view and list of one signed-in user.
pub struct ChatContext<S> {
    pub store: Arc<S>,
    pub cache: Arc<dyn LocalCache>,
    pub bus: EventBus,
    pub clock: Arc<dyn Clock>,
    pub config: ViewConfig,
}

impl<S> Clone for ChatContext<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            bus: self.bus.clone(),
            clock: self.clock.clone(),
            config: self.config.clone(),
        }
    }
}

/// Cache key for the message snapshot of a conversation. Order-independent.
pub fn conversation_key(user_a: &str, user_b: &str) -> String {
    if user_a == TUTORIAL_BOT_ID || user_b == TUTORIAL_BOT_ID {
        return TUTORIAL_BOT_ID.to_string();
    }
    let (lo, hi) = if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };
    format!("{}:{}", lo, hi)
}

/// Posted by timer and remote-call tasks to the owning view.
#[derive(Debug)]
enum TimerEvent {
    Tick(String),
    Expire(String),
    HoldElapsed(String),
    RemoteFailed(String),
}

/// Something the embedding UI should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Ticked { id: String, remaining: u32 },
    /// Countdown hit zero; exit animation starts.
    Expiring { id: String },
    Removed { id: String },
    /// A hold completed while the finger was still down.
    Revealed { id: String, expires_in: u32 },
    /// A poll changed the message list.
    Refreshed,
    /// Non-fatal failure worth showing to the user.
    Notice(String),
    TutorialStage(TutorialStage),
    /// The conversation no longer exists; leave it.
    NavigateAway,
}

/// Read-only snapshot of one bubble, for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct BubbleView {
    pub id: String,
    pub state: RevealState,
    pub blurred: bool,
    pub remaining: Option<u32>,
    pub hold_progress: f32,
    pub image: ImageAccess,
    pub request: Option<RequestView>,
}

struct Bubble {
    message: Message,
    machine: RevealMachine,
    hold: HoldGesture,
    countdown: Option<TaskHandle>,
    grace: Option<TaskHandle>,
    hold_timer: Option<TaskHandle>,
}

enum Wake {
    Timer(TimerEvent),
    Bus(Option<ChatEvent>),
    Poll,
}

pub struct ChatView<S: MessageStore> {
    ctx: ChatContext<S>,
    viewer: User,
    peer_id: String,
    cache_key: String,
    tutorial: Option<Arc<TutorialEngine>>,
    bubbles: Vec<Bubble>,
    /// Ids that expired or vanished here. They never come back.
    tombstones: HashSet<String>,
    pending: VecDeque<ViewEvent>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    bus: UserSubscription,
    bus_open: bool,
    poll: Option<Interval>,
    closed: bool,
}

impl<S: MessageStore> ChatView<S> {
    /// Open the conversation between `viewer` and `peer_id`.
    ///
    /// Shows the cached snapshot first, then whatever the remote store
    /// returns. The tutorial bot conversation is derived from `tutorial`
    /// instead and is never polled. Load failures are reported as a
    /// [`ViewEvent::Notice`], never as an error.
    pub async fn open(
        ctx: ChatContext<S>,
        viewer: User,
        peer_id: impl Into<String>,
        tutorial: Option<Arc<TutorialEngine>>,
    ) -> Self {
        let peer_id = peer_id.into();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let bus = ctx.bus.subscribe_user(viewer.id.clone());
        let is_bot = peer_id == TUTORIAL_BOT_ID;

        let poll = (!is_bot).then(|| {
            let period = ctx.config.poll_interval;
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        let mut view = Self {
            cache_key: conversation_key(&viewer.id, &peer_id),
            ctx,
            viewer,
            peer_id,
            tutorial,
            bubbles: Vec::new(),
            tombstones: HashSet::new(),
            pending: VecDeque::new(),
            timer_tx,
            timer_rx,
            bus,
            bus_open: true,
            poll,
            closed: false,
        };

        if is_bot {
            view.open_tutorial();
        } else {
            let cached = view.ctx.cache.load_messages(&view.cache_key);
            if !cached.is_empty() {
                debug!("Showing {} cached messages for {}", cached.len(), view.cache_key);
                view.merge(cached);
            }
            if let Err(e) = view.refresh().await {
                warn!("Initial load of {} failed: {}", view.cache_key, e);
                view.pending
                    .push_back(ViewEvent::Notice("Could not load messages".into()));
            }
        }

        info!("Opened conversation {} for {}", view.cache_key, view.viewer.id);
        view
    }

    pub fn viewer_id(&self) -> &str {
        &self.viewer.id
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn is_bot(&self) -> bool {
        self.peer_id == TUTORIAL_BOT_ID
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.bubble(message_id).map(|b| &b.message)
    }

    /// Active messages, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.bubbles.iter().map(|b| &b.message)
    }

    pub fn message_ids(&self) -> Vec<&str> {
        self.bubbles.iter().map(|b| b.message.id.as_str()).collect()
    }

    pub fn state(&self, message_id: &str) -> Option<RevealState> {
        self.bubble(message_id).map(|b| b.machine.state())
    }

    pub fn bubble_view(&self, message_id: &str) -> Option<BubbleView> {
        self.bubble(message_id).map(|b| self.render(b))
    }

    pub fn visible(&self) -> Vec<BubbleView> {
        self.bubbles.iter().map(|b| self.render(b)).collect()
    }

    pub fn hold_progress(&self, message_id: &str) -> f32 {
        self.bubble(message_id)
            .map_or(0.0, |b| b.hold.progress(Instant::now()))
    }

    // -- Gestures --

    /// Tap-to-reveal. Returns the countdown that was started, if any.
    pub fn tap(&mut self, message_id: &str) -> Option<u32> {
        if self.ctx.config.gesture != RevealGesture::Tap {
            return None;
        }
        self.reveal(message_id)
    }

    /// Start a press-and-hold on a hidden message.
    pub fn press(&mut self, message_id: &str) -> bool {
        if self.ctx.config.gesture != RevealGesture::Hold {
            return false;
        }
        let Some(idx) = self.position(message_id) else {
            return false;
        };
        if self.access(&self.bubbles[idx].message).is_withheld() {
            return false;
        }

        let tx = self.timer_tx.clone();
        let bubble = &mut self.bubbles[idx];
        if !bubble.machine.begin_hold() {
            return false;
        }
        bubble.hold.press(Instant::now());

        let id = message_id.to_string();
        bubble.hold_timer = Some(TaskHandle::after(bubble.hold.threshold(), async move {
            let _ = tx.send(TimerEvent::HoldElapsed(id));
        }));
        true
    }

    /// Finger lifted. An early release puts the message back to hidden.
    pub fn release(&mut self, message_id: &str) -> HoldOutcome {
        let outcome = {
            let Some(bubble) = self.bubble_mut(message_id) else {
                return HoldOutcome::Idle;
            };
            bubble.hold_timer = None;
            let outcome = bubble.hold.release(Instant::now());
            if outcome == HoldOutcome::Cancelled {
                bubble.machine.cancel_hold();
            }
            outcome
        };

        if outcome == HoldOutcome::Completed {
            self.reveal(message_id);
        }
        outcome
    }

    /// Answer a request addressed to the viewer. Only the first answer counts.
    pub fn respond(&mut self, message_id: &str, decision: Decision) -> Option<RequestStatus> {
        let viewer_id = self.viewer.id.clone();
        let bubble = self.bubble_mut(message_id)?;
        let status = request::respond(&mut bubble.message, &viewer_id, decision)?;
        info!("Request {} answered: {:?}", message_id, status);
        self.persist();

        let store = self.ctx.store.clone();
        let id = message_id.to_string();
        self.remote("answer", message_id, async move {
            store.update_request_status(&id, status).await
        });
        Some(status)
    }

    // -- Sending --

    pub async fn send_text(&mut self, content: &str) -> Result<Message> {
        let request = SendMessageRequest::text(&self.viewer.id, &self.peer_id, content)
            .with_expires_in(self.ctx.config.default_expires_in);
        self.send(request).await
    }

    /// Send through the remote store. If the store is unreachable the
    /// message is still shown, as a local-only copy, and the error is
    /// returned alongside a notice.
    pub async fn send(&mut self, request: SendMessageRequest) -> Result<Message> {
        if self.is_bot() {
            return Err(ClientError::Remote("the tutorial bot does not take replies".into()));
        }

        let result = self.ctx.store.send_message(request.clone()).await;
        let message = match &result {
            Ok(message) => message.clone(),
            Err(e) => {
                warn!("Failed to send to {}: {}", self.peer_id, e);
                self.pending
                    .push_back(ViewEvent::Notice("Message not delivered".into()));
                self.local_copy(request)
            }
        };

        let bubble = self.new_bubble(message);
        self.bubbles.push(bubble);
        self.persist();
        result
    }

    // -- Lifecycle --

    /// Remove a message for good. Non-bot messages are also deleted remotely.
    /// Returns false if it was already gone.
    pub fn expire(&mut self, message_id: &str) -> bool {
        if self.tombstones.contains(message_id) {
            return false;
        }
        let Some(idx) = self.position(message_id) else {
            return false;
        };
        self.bubbles.remove(idx);
        self.tombstones.insert(message_id.to_string());
        info!("Message {} expired", message_id);
        self.persist();

        if self.is_bot() {
            if let Some(tutorial) = &self.tutorial {
                tutorial.message_expired(message_id);
            }
        } else {
            let store = self.ctx.store.clone();
            let id = message_id.to_string();
            self.remote("delete", message_id, async move { store.delete_message(&id).await });
        }
        true
    }

    /// Pull the conversation from the remote store and merge it in. Local
    /// reveal and countdown state survives the merge.
    pub async fn refresh(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if self.is_bot() {
            self.derive_tutorial();
            return Ok(());
        }

        let remote = self
            .ctx
            .store
            .load_messages(&self.viewer.id, &self.peer_id)
            .await?;
        if self.merge(remote) {
            self.pending.push_back(ViewEvent::Refreshed);
        }
        Ok(())
    }

    /// Stop every timer and stop listening. Further events are dropped.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.persist();
        self.closed = true;
        self.bubbles.clear();
        self.poll = None;
        debug!("Closed conversation {}", self.cache_key);
    }

    /// Wait for the next thing worth showing. `None` once the view is closed.
    pub async fn next_event(&mut self) -> Option<ViewEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.closed {
                return None;
            }

            let wake = tokio::select! {
                Some(event) = self.timer_rx.recv() => Wake::Timer(event),
                event = self.bus.recv(), if self.bus_open => Wake::Bus(event),
                _ = poll_tick(&mut self.poll) => Wake::Poll,
            };

            match wake {
                Wake::Timer(event) => {
                    if let Some(event) = self.on_timer(event) {
                        return Some(event);
                    }
                }
                Wake::Bus(Some(event)) => {
                    if let Some(event) = self.on_bus(event) {
                        return Some(event);
                    }
                }
                Wake::Bus(None) => {
                    debug!("Event bus closed for {}", self.viewer.id);
                    self.bus_open = false;
                }
                Wake::Poll => {
                    if let Err(e) = self.refresh().await {
                        warn!("Poll of {} failed: {}", self.cache_key, e);
                        return Some(ViewEvent::Notice("Connection problem, retrying".into()));
                    }
                }
            }
        }
    }

    fn on_timer(&mut self, event: TimerEvent) -> Option<ViewEvent> {
        match event {
            TimerEvent::Tick(id) => self.on_tick(id),
            TimerEvent::Expire(id) => self
                .expire(&id)
                .then_some(ViewEvent::Removed { id }),
            TimerEvent::HoldElapsed(id) => {
                let now = Instant::now();
                let completed = self
                    .bubble_mut(&id)
                    .is_some_and(|b| b.hold.complete(now));
                if !completed {
                    return None;
                }
                self.reveal(&id)
                    .map(|expires_in| ViewEvent::Revealed { id, expires_in })
            }
            TimerEvent::RemoteFailed(notice) => Some(ViewEvent::Notice(notice)),
        }
    }

    fn on_tick(&mut self, id: String) -> Option<ViewEvent> {
        let grace = self.ctx.config.exit_grace;
        let tx = self.timer_tx.clone();
        let bubble = self.bubble_mut(&id)?;

        match bubble.machine.tick()? {
            Tick::Remaining(remaining) => Some(ViewEvent::Ticked { id, remaining }),
            Tick::Expiring => {
                bubble.countdown = None;
                let expire_id = id.clone();
                bubble.grace = Some(TaskHandle::after(grace, async move {
                    let _ = tx.send(TimerEvent::Expire(expire_id));
                }));
                debug!("Message {} expiring", id);
                Some(ViewEvent::Expiring { id })
            }
        }
    }

    fn on_bus(&mut self, event: ChatEvent) -> Option<ViewEvent> {
        if !self.is_bot() {
            return None;
        }
        match event {
            ChatEvent::TutorialStageChanged { stage, .. } => {
                self.derive_tutorial();
                Some(ViewEvent::TutorialStage(stage))
            }
            ChatEvent::TutorialCompleted { .. } => {
                info!("Tutorial finished, leaving bot conversation");
                self.close();
                Some(ViewEvent::NavigateAway)
            }
        }
    }

    fn open_tutorial(&mut self) {
        let Some(tutorial) = self.tutorial.clone() else {
            warn!("Bot conversation opened without a tutorial engine");
            return;
        };
        if tutorial.is_completed() {
            self.closed = true;
            self.pending.push_back(ViewEvent::NavigateAway);
            return;
        }
        self.derive_tutorial();
        tutorial.conversation_opened();
    }

    fn derive_tutorial(&mut self) {
        let Some(tutorial) = self.tutorial.clone() else {
            return;
        };
        let cached = self.ctx.cache.load_messages(&self.cache_key);
        let mut messages = tutorial.messages(self.ctx.clock.now());
        // A reveal from an earlier session sticks; the countdown resumes
        // from the stored expiry.
        for message in messages.iter_mut().filter(|m| !m.is_revealed) {
            if let Some(seen) = cached.iter().find(|c| c.id == message.id && c.is_revealed) {
                message.is_revealed = true;
                message.is_read = true;
                message.expires_at = seen.expires_at;
            }
        }
        self.merge(messages);
    }

    /// One-way reveal of a hidden (or held) message.
    fn reveal(&mut self, message_id: &str) -> Option<u32> {
        let idx = self.position(message_id)?;
        if self.access(&self.bubbles[idx].message).is_withheld() {
            return None;
        }

        let now = self.ctx.clock.now();
        let tick = self.ctx.config.tick;
        let tx = self.timer_tx.clone();
        let bubble = &mut self.bubbles[idx];
        let expires_in = bubble.machine.reveal()?;

        bubble.hold_timer = None;
        bubble.message.is_revealed = true;
        bubble.message.is_read = true;
        bubble.message.expires_at = Some(now + ChronoDuration::seconds(i64::from(expires_in)));
        bubble.countdown = Some(countdown(message_id, tick, tx));
        info!("Message {} revealed, {}s left", message_id, expires_in);
        self.persist();

        if self.is_bot() {
            if let Some(tutorial) = &self.tutorial {
                tutorial.message_revealed(message_id);
            }
        } else {
            let store = self.ctx.store.clone();
            let id = message_id.to_string();
            self.remote("reveal", message_id, async move { store.reveal_message(&id).await });
        }
        Some(expires_in)
    }

    /// Replace the bubble list with `incoming`, keeping the live state of
    /// bubbles that are already shown. Returns true if anything changed.
    fn merge(&mut self, incoming: Vec<Message>) -> bool {
        let mut previous: HashMap<String, Bubble> = self
            .bubbles
            .drain(..)
            .map(|b| (b.message.id.clone(), b))
            .collect();
        let mut changed = false;
        let mut due = Vec::new();

        for message in incoming {
            if self.tombstones.contains(&message.id) {
                continue;
            }
            match previous.remove(&message.id) {
                Some(mut bubble) => {
                    if let Some(status) = message.request_status() {
                        if request::sync_status(&mut bubble.message, status) {
                            debug!("Request {} is now {:?}", message.id, status);
                            changed = true;
                        }
                    }
                    self.bubbles.push(bubble);
                }
                None => {
                    let bubble = self.new_bubble(message);
                    if bubble.machine.state() == RevealState::Expiring {
                        due.push(bubble.message.id.clone());
                    }
                    self.bubbles.push(bubble);
                    changed = true;
                }
            }
        }

        // Local-only copies were never stored remotely; keep them.
        let (mut unsent, gone): (Vec<Bubble>, Vec<Bubble>) = previous
            .into_values()
            .partition(|b| b.message.id.starts_with(LOCAL_ID_PREFIX));
        unsent.sort_by_key(|b| b.message.timestamp);
        for bubble in unsent {
            let at = self
                .bubbles
                .iter()
                .position(|b| b.message.timestamp > bubble.message.timestamp)
                .unwrap_or(self.bubbles.len());
            self.bubbles.insert(at, bubble);
        }

        for bubble in gone {
            let id = bubble.message.id;
            debug!("Message {} is gone remotely", id);
            self.tombstones.insert(id.clone());
            self.pending.push_back(ViewEvent::Removed { id });
            changed = true;
        }

        // Revealed in an earlier session and already past expiry.
        for id in due {
            if self.expire(&id) {
                self.pending.push_back(ViewEvent::Removed { id });
            }
        }

        if changed {
            self.persist();
        }
        changed
    }

    fn local_copy(&self, request: SendMessageRequest) -> Message {
        let expires_in = request.effective_expires_in();
        Message {
            id: format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4()),
            content: request.content,
            sender_id: request.sender_id,
            receiver_id: request.receiver_id,
            timestamp: self.ctx.clock.now(),
            is_read: false,
            is_revealed: false,
            expires_in: Some(expires_in),
            expires_at: None,
            kind: request.kind,
        }
    }

    fn new_bubble(&self, message: Message) -> Bubble {
        let config = &self.ctx.config;
        let machine = RevealMachine::for_message(
            &message,
            &self.viewer.id,
            config.default_expires_in,
            self.ctx.clock.now(),
        );
        let countdown = machine
            .is_counting()
            .then(|| countdown(&message.id, config.tick, self.timer_tx.clone()));

        Bubble {
            message,
            machine,
            hold: HoldGesture::new(config.hold_threshold),
            countdown,
            grace: None,
            hold_timer: None,
        }
    }

    fn render(&self, bubble: &Bubble) -> BubbleView {
        BubbleView {
            id: bubble.message.id.clone(),
            state: bubble.machine.state(),
            blurred: bubble.machine.is_blurred(),
            remaining: bubble.machine.remaining(),
            hold_progress: bubble.hold.progress(Instant::now()),
            image: self.access(&bubble.message),
            request: request::request_view(&bubble.message, &self.viewer.id),
        }
    }

    fn access(&self, message: &Message) -> ImageAccess {
        let nickname = Some(self.viewer.nickname.as_str()).filter(|n| !n.is_empty());
        image_access(message, &self.viewer.id, nickname)
    }

    fn persist(&self) {
        if self.closed {
            return;
        }
        if self.is_bot() && self.tutorial.as_ref().is_none_or(|t| t.is_completed()) {
            return;
        }
        let snapshot: Vec<Message> = self.bubbles.iter().map(|b| b.message.clone()).collect();
        if let Err(e) = self.ctx.cache.save_messages(&self.cache_key, &snapshot) {
            warn!("Failed to cache messages for {}: {}", self.cache_key, e);
        }
    }

    /// Fire-and-forget remote call. Failures come back as a notice.
    fn remote<F>(&self, action: &'static str, message_id: &str, call: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let tx = self.timer_tx.clone();
        let message_id = message_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = call.await {
                warn!("Failed to {} message {}: {}", action, message_id, e);
                let _ = tx.send(TimerEvent::RemoteFailed(format!("Could not {} message", action)));
            }
        });
    }

    fn position(&self, message_id: &str) -> Option<usize> {
        self.bubbles.iter().position(|b| b.message.id == message_id)
    }

    fn bubble(&self, message_id: &str) -> Option<&Bubble> {
        self.bubbles.iter().find(|b| b.message.id == message_id)
    }

    fn bubble_mut(&mut self, message_id: &str) -> Option<&mut Bubble> {
        self.bubbles.iter_mut().find(|b| b.message.id == message_id)
    }
}

fn countdown(message_id: &str, tick: Duration, tx: mpsc::UnboundedSender<TimerEvent>) -> TaskHandle {
    let id = message_id.to_string();
    TaskHandle::every(tick, move || tx.send(TimerEvent::Tick(id.clone())).is_ok())
}

async fn poll_tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
