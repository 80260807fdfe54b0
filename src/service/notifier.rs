use async_trait::async_trait;

use crate::error::NotifyError;
use crate::models::message::Message;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Answers one inbound event. A reply token is single-use.
    async fn reply(&self, reply_token: &str, message: &Message) -> Result<(), NotifyError>;

    /// Sends a message to an entity outside of any inbound event.
    async fn push(&self, entity_id: &str, message: &Message) -> Result<(), NotifyError>;
}
