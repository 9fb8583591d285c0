use std::time::Duration;

use chrono::{DateTime, Utc};

use phantom_types::models::Message;

use crate::clock::seconds_until;

/// Countdown granularity.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Delay between hitting zero and removal, long enough for the exit animation.
pub const EXIT_GRACE: Duration = Duration::from_millis(300);

/// Where a single message sits in its reveal/expiry lifecycle, from the
/// viewer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    /// Never blurred and never counted down here: the viewer's own copy, a
    /// request, or an already revealed message with no expiry attached.
    Visible,
    /// Blurred, waiting for a gesture.
    Hidden,
    /// Press-and-hold in progress. Still blurred.
    Holding,
    /// Content shown, seconds left before expiry.
    Counting { remaining: u32 },
    /// Countdown finished; exit animation running.
    Expiring,
    /// Gone from the active set. Terminal.
    Removed,
}

/// Result of advancing the countdown by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Remaining(u32),
    Expiring,
}

#[derive(Debug, Clone)]
pub struct RevealMachine {
    state: RevealState,
    expires_in: u32,
}

impl RevealMachine {
    /// Derive the starting state for `message` as seen by `viewer_id`.
    ///
    /// Server-provided `expires_at` wins on load: a message revealed in an
    /// earlier session resumes with whatever is left, or goes straight to
    /// `Expiring` if that is nothing.
    pub fn for_message(
        message: &Message,
        viewer_id: &str,
        default_expires_in: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let expires_in = message
            .expires_in
            .filter(|s| *s > 0)
            .unwrap_or(default_expires_in.max(1));

        let state = if message.is_own(viewer_id) || message.kind.is_request() {
            RevealState::Visible
        } else if !message.is_revealed {
            RevealState::Hidden
        } else if let Some(expires_at) = message.expires_at {
            match seconds_until(expires_at, now) {
                0 => RevealState::Expiring,
                remaining => RevealState::Counting { remaining },
            }
        } else if message.expires_in.is_some() {
            // Revealed but the expiry stamp never made it to storage.
            RevealState::Counting {
                remaining: expires_in,
            }
        } else {
            RevealState::Visible
        };

        Self { state, expires_in }
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    pub fn expires_in(&self) -> u32 {
        self.expires_in
    }

    pub fn remaining(&self) -> Option<u32> {
        match self.state {
            RevealState::Counting { remaining } => Some(remaining),
            RevealState::Expiring => Some(0),
            _ => None,
        }
    }

    /// Content must be obscured in these states.
    pub fn is_blurred(&self) -> bool {
        matches!(self.state, RevealState::Hidden | RevealState::Holding)
    }

    pub fn is_counting(&self) -> bool {
        matches!(self.state, RevealState::Counting { .. })
    }

    pub fn begin_hold(&mut self) -> bool {
        if self.state != RevealState::Hidden {
            return false;
        }
        self.state = RevealState::Holding;
        true
    }

    /// Released before the threshold: back to hidden, nothing revealed.
    pub fn cancel_hold(&mut self) -> bool {
        if self.state != RevealState::Holding {
            return false;
        }
        self.state = RevealState::Hidden;
        true
    }

    /// One-way reveal. Returns the countdown length that was started, or
    /// `None` if the message was not in a revealable state.
    pub fn reveal(&mut self) -> Option<u32> {
        match self.state {
            RevealState::Hidden | RevealState::Holding => {
                self.state = RevealState::Counting {
                    remaining: self.expires_in,
                };
                Some(self.expires_in)
            }
            _ => None,
        }
    }

    pub fn tick(&mut self) -> Option<Tick> {
        let RevealState::Counting { remaining } = self.state else {
            return None;
        };

        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.state = RevealState::Expiring;
            Some(Tick::Expiring)
        } else {
            self.state = RevealState::Counting { remaining };
            Some(Tick::Remaining(remaining))
        }
    }

    /// Grace period over. True exactly once.
    pub fn finish(&mut self) -> bool {
        if self.state != RevealState::Expiring {
            return false;
        }
        self.state = RevealState::Removed;
        true
    }

    /// Drop out of the lifecycle from any state, e.g. the message vanished
    /// from the remote store.
    pub fn discard(&mut self) -> bool {
        if self.state == RevealState::Removed {
            return false;
        }
        self.state = RevealState::Removed;
        true
    }
}
