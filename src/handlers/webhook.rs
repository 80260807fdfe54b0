use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::service::notifier::Notifier;
use crate::service::routing::CommandService;

#[derive(Debug, Default, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: EventSource,
    pub message: Option<EventMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub room_id: Option<String>,
}

impl EventSource {
    /// Groups and rooms own their reminders; a 1:1 chat falls back to the user.
    pub fn entity_id(&self) -> Option<&str> {
        [&self.group_id, &self.room_id, &self.user_id]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|id| !id.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    Ignored,
    Replied,
    ReplyFailed { error: String },
}

struct TextEvent<'a> {
    entity_id: &'a str,
    reply_token: &'a str,
    text: &'a str,
}

fn text_event(event: &WebhookEvent) -> Option<TextEvent<'_>> {
    if event.kind != "message" {
        return None;
    }
    let message = event.message.as_ref()?;
    if message.kind != "text" {
        return None;
    }
    Some(TextEvent {
        entity_id: event.source.entity_id()?,
        reply_token: event.reply_token.as_deref()?,
        text: message.text.as_deref()?,
    })
}

pub struct WebhookHandler {
    commands: Arc<CommandService>,
    notifier: Arc<dyn Notifier>,
}

impl WebhookHandler {
    pub fn new(commands: Arc<CommandService>, notifier: Arc<dyn Notifier>) -> Self {
        Self { commands, notifier }
    }

    /// Handles events in delivery order. A failed reply only affects its own
    /// event.
    pub async fn handle_events(&self, body: WebhookBody) -> Vec<EventOutcome> {
        let mut outcomes = Vec::with_capacity(body.events.len());
        for event in &body.events {
            outcomes.push(self.handle_event(event).await);
        }
        outcomes
    }

    pub async fn handle_event(&self, event: &WebhookEvent) -> EventOutcome {
        let Some(text_event) = text_event(event) else {
            debug!(kind = %event.kind, "ignoring non-text event");
            return EventOutcome::Ignored;
        };
        let TextEvent {
            entity_id,
            reply_token,
            text,
        } = text_event;

        let reply = self
            .commands
            .handle(entity_id, text, self.commands.today())
            .await;
        match self.notifier.reply(reply_token, &reply).await {
            Ok(()) => EventOutcome::Replied,
            Err(err) => {
                warn!(entity_id, error = %err, "failed to reply");
                EventOutcome::ReplyFailed {
                    error: err.to_string(),
                }
            }
        }
    }
}
