use async_trait::async_trait;
use serde::Serialize;

use crate::error::NotifyError;
use crate::models::message::Message;
use crate::service::notifier::Notifier;

pub const DEFAULT_API_BASE: &str = "https://api.line.me";

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [&'a Message; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [&'a Message; 1],
}

/// Messaging API client authenticated with a channel access token.
pub struct LineClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl LineClient {
    pub fn new(api_base: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for LineClient {
    async fn reply(&self, reply_token: &str, message: &Message) -> Result<(), NotifyError> {
        if reply_token.trim().is_empty() {
            return Err(NotifyError::Destination("empty reply token".to_string()));
        }
        let body = ReplyRequest {
            reply_token,
            messages: [message],
        };
        self.post("/v2/bot/message/reply", &body).await
    }

    async fn push(&self, entity_id: &str, message: &Message) -> Result<(), NotifyError> {
        if entity_id.trim().is_empty() {
            return Err(NotifyError::Destination("empty entity id".to_string()));
        }
        let body = PushRequest {
            to: entity_id,
            messages: [message],
        };
        self.post("/v2/bot/message/push", &body).await
    }
}
