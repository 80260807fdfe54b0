use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::error::ReminderError;
use crate::models::eat_out::{EatOutStatus, local_date};
use crate::models::message::Message;
use crate::service::notifier::Notifier;
use crate::service::status_resolver;
use crate::service::status_store::StatusStore;
use crate::tasks::recurrence::ScheduledJob;

pub const EATING_OUT_NOTICE: &str = "今日は外で食べる予定です。";
pub const STAYING_IN_NOTICE: &str = "今日は家で食べる予定です。";
pub const UNDECIDED_PROMPT: &str = "今日は外で食べる？";

/// The message pushed for a resolved status.
pub fn reminder_message(status: EatOutStatus) -> Message {
    match status {
        EatOutStatus::EatingOut => Message::text(EATING_OUT_NOTICE),
        EatOutStatus::StayingIn => Message::text(STAYING_IN_NOTICE),
        EatOutStatus::Undecided => Message::eat_out_prompt(UNDECIDED_PROMPT),
    }
}

/// Daily work bound to an entity: resolve today's status, push one message.
pub struct ReminderJob {
    store: Arc<dyn StatusStore>,
    notifier: Arc<dyn Notifier>,
    tz: Tz,
}

impl ReminderJob {
    pub fn new(store: Arc<dyn StatusStore>, notifier: Arc<dyn Notifier>, tz: Tz) -> Self {
        Self {
            store,
            notifier,
            tz,
        }
    }

    /// Sends exactly one push once the status is known. When the store read
    /// fails nothing is pushed and the error is returned.
    pub async fn fire(&self, entity_id: &str, date: NaiveDate) -> Result<EatOutStatus, ReminderError> {
        let status = status_resolver::resolve(self.store.as_ref(), entity_id, date).await?;
        self.notifier
            .push(entity_id, &reminder_message(status))
            .await?;
        Ok(status)
    }
}

#[async_trait]
impl ScheduledJob for ReminderJob {
    async fn run(&self, entity_id: &str) {
        let today = local_date(Utc::now(), &self.tz);
        match self.fire(entity_id, today).await {
            Ok(status) => info!(entity_id, %today, ?status, "sent daily reminder"),
            Err(err) => warn!(entity_id, %today, error = %err, "daily reminder failed"),
        }
    }
}
