//! Phantom core state machines.
//!
//! Everything here is client-side and timer-driven: the per-message
//! reveal/expiry machine and its two gesture front-ends, the image access
//! check, the request accept/reject machine, and the scripted tutorial bot.
//! Pure transitions live in plain structs; timing lives in [`scheduler`].

pub mod access;
pub mod clock;
pub mod hold;
pub mod request;
pub mod reveal;
pub mod scheduler;
pub mod tutorial;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::TaskHandle;
