use std::future::Future;

use phantom_types::api::SendMessageRequest;
use phantom_types::models::{Conversation, Message, ProfilePatch, RequestStatus, User};

use crate::error::Result;

/// Remote message storage owned by the backend service.
pub trait MessageStore: Send + Sync + 'static {
    fn send_message(&self, request: SendMessageRequest) -> impl Future<Output = Result<Message>> + Send;

    /// Every message between `user_a` and `user_b`, oldest first.
    fn load_messages(&self, user_a: &str, user_b: &str) -> impl Future<Output = Result<Vec<Message>>> + Send;

    /// Mark revealed and read. The backend stamps the authoritative `expires_at`.
    fn reveal_message(&self, message_id: &str) -> impl Future<Output = Result<()>> + Send;

    fn delete_message(&self, message_id: &str) -> impl Future<Output = Result<()>> + Send;

    fn update_request_status(
        &self,
        message_id: &str,
        status: RequestStatus,
    ) -> impl Future<Output = Result<()>> + Send;

    fn user_conversations(&self, user_id: &str) -> impl Future<Output = Result<Vec<Conversation>>> + Send;
}

/// Account and profile lookups owned by the backend service.
pub trait AuthService: Send + Sync + 'static {
    fn current_user(&self) -> impl Future<Output = Result<Option<User>>> + Send;

    fn update_user_profile(&self, user_id: &str, patch: ProfilePatch) -> impl Future<Output = Result<User>> + Send;

    fn search_user_by_nickname(&self, handle: &str) -> impl Future<Output = Result<Option<User>>> + Send;
}
