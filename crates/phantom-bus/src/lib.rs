pub mod dispatcher;

pub use dispatcher::{EventBus, UserSubscription};
