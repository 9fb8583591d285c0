pub mod chat;
pub mod conversations;
pub mod error;
pub mod memory;
pub mod store;

pub use chat::{BubbleView, ChatContext, ChatView, RevealGesture, ViewConfig, ViewEvent};
pub use conversations::{ConversationList, ListEvent};
pub use error::{ClientError, Result};
pub use memory::MemoryStore;
pub use store::{AuthService, MessageStore};
