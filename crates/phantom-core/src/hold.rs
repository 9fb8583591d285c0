use std::time::Duration;

use tokio::time::Instant;

/// How long a press must last before it counts as a reveal.
pub const HOLD_THRESHOLD: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldOutcome {
    /// There was no press to release.
    Idle,
    /// Released early; progress is back to zero.
    Cancelled,
    /// Held long enough.
    Completed,
}

/// Press-and-hold tracker for one message bubble.
#[derive(Debug, Clone)]
pub struct HoldGesture {
    threshold: Duration,
    pressed_at: Option<Instant>,
}

impl Default for HoldGesture {
    fn default() -> Self {
        Self::new(HOLD_THRESHOLD)
    }
}

impl HoldGesture {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            pressed_at: None,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }

    /// Returns false if a press is already in progress.
    pub fn press(&mut self, at: Instant) -> bool {
        if self.pressed_at.is_some() {
            return false;
        }
        self.pressed_at = Some(at);
        true
    }

    /// Fraction of the threshold covered so far, in `[0, 1]`.
    pub fn progress(&self, at: Instant) -> f32 {
        let Some(start) = self.pressed_at else {
            return 0.0;
        };
        if self.threshold.is_zero() {
            return 1.0;
        }
        let held = at.saturating_duration_since(start);
        (held.as_secs_f32() / self.threshold.as_secs_f32()).min(1.0)
    }

    pub fn release(&mut self, at: Instant) -> HoldOutcome {
        let Some(start) = self.pressed_at.take() else {
            return HoldOutcome::Idle;
        };
        if at.saturating_duration_since(start) >= self.threshold {
            HoldOutcome::Completed
        } else {
            HoldOutcome::Cancelled
        }
    }

    /// Called when the hold timer fires. Completes the press if the threshold
    /// really has elapsed.
    pub fn complete(&mut self, at: Instant) -> bool {
        match self.pressed_at {
            Some(start) if at.saturating_duration_since(start) >= self.threshold => {
                self.pressed_at = None;
                true
            }
            _ => false,
        }
    }
}
