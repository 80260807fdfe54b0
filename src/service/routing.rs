use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::error::StoreError;
use crate::models::eat_out::{EatOutStatus, local_date};
use crate::models::message::{ANSWER_EATING_OUT, ANSWER_STAYING_IN, Message};
use crate::models::time_spec::{TimeSpec, ZeroComponents};
use crate::service::status_resolver;
use crate::service::status_store::{ScheduleStore, StatusStore};
use crate::tasks::recurrence::{RecurrenceRegistry, ScheduledJob};

pub const STATUS_CHECK_KEYWORD: &str = "確認";
pub const REGISTER_LINK_KEYWORD: &str = "登録";
pub const REMIND_KEYWORD: &str = "リマインド";
pub const REMIND_KEYWORD_ALIAS: &str = "set";
pub const CANCEL_REMIND_KEYWORD: &str = "リマインド解除";

pub const UNRECOGNIZED_REPLY: &str = "正しく入力してください";
pub const TIME_FORMAT_REPLY: &str =
    "時間は半角数字、「:」区切りで入力してください。\n[例] 15:30";
pub const SCHEDULING_FAILED_REPLY: &str =
    "リマインドを設定できませんでした。しばらくしてからもう一度お試しください";
pub const STORE_FAILED_REPLY: &str =
    "予定を確認できませんでした。しばらくしてからもう一度お試しください";
pub const ANSWER_FAILED_REPLY: &str =
    "予定を登録できませんでした。しばらくしてからもう一度お試しください";
pub const EATING_OUT_REPLY: &str = "今日は外で食べる予定だよ";
pub const STAYING_IN_REPLY: &str = "今日は家で食べる予定だよ";
pub const UNDECIDED_REPLY: &str = "まだ決まってないよ";
pub const CANCELLED_REPLY: &str = "リマインドを解除しました";
pub const NOTHING_TO_CANCEL_REPLY: &str = "リマインドは設定されていません";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CheckStatus,
    RegisterLink,
    Answer { will_eat_out: bool },
    SetReminder { time: String },
    CancelReminder,
    Unrecognized,
}

/// Classifies one inbound text. Full-width spaces count as separators.
pub fn route_command(text: &str) -> Command {
    let normalized = text.replace('\u{3000}', " ");
    let trimmed = normalized.trim();
    match trimmed {
        STATUS_CHECK_KEYWORD => return Command::CheckStatus,
        REGISTER_LINK_KEYWORD => return Command::RegisterLink,
        CANCEL_REMIND_KEYWORD => return Command::CancelReminder,
        ANSWER_EATING_OUT => return Command::Answer { will_eat_out: true },
        ANSWER_STAYING_IN => return Command::Answer { will_eat_out: false },
        _ => {}
    }

    let words: Vec<&str> = trimmed.split(' ').collect();
    match words.as_slice() {
        [action, time] if *action == REMIND_KEYWORD || *action == REMIND_KEYWORD_ALIAS => {
            Command::SetReminder {
                time: time.to_string(),
            }
        }
        _ => Command::Unrecognized,
    }
}

pub fn status_reply(status: EatOutStatus) -> &'static str {
    match status {
        EatOutStatus::EatingOut => EATING_OUT_REPLY,
        EatOutStatus::StayingIn => STAYING_IN_REPLY,
        EatOutStatus::Undecided => UNDECIDED_REPLY,
    }
}

pub fn reminder_set_reply(spec: TimeSpec) -> String {
    format!("毎日{}にリマインドを送ります", spec)
}

pub fn answer_reply(will_eat_out: bool) -> String {
    let answer = if will_eat_out {
        ANSWER_EATING_OUT
    } else {
        ANSWER_STAYING_IN
    };
    format!("今日は「{}」で登録しました", answer)
}

pub fn register_link_reply(calendar_url: &str, entity_id: &str) -> String {
    format!(
        "こちらから予定を登録してください\n{}?id={}",
        calendar_url.trim_end_matches('/'),
        entity_id
    )
}

/// Turns inbound text into a reply, driving the parser, registry and store.
pub struct CommandService {
    store: Arc<dyn StatusStore>,
    schedules: Arc<dyn ScheduleStore>,
    registry: Arc<RecurrenceRegistry>,
    job: Arc<dyn ScheduledJob>,
    calendar_url: String,
    zeros: ZeroComponents,
}

impl CommandService {
    pub fn new(
        store: Arc<dyn StatusStore>,
        schedules: Arc<dyn ScheduleStore>,
        registry: Arc<RecurrenceRegistry>,
        job: Arc<dyn ScheduledJob>,
        calendar_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            schedules,
            registry,
            job,
            calendar_url: calendar_url.into(),
            zeros: ZeroComponents::default(),
        }
    }

    pub fn with_zero_components(mut self, zeros: ZeroComponents) -> Self {
        self.zeros = zeros;
        self
    }

    /// Today's date in the reminder time zone.
    pub fn today(&self) -> NaiveDate {
        local_date(Utc::now(), &self.registry.timezone())
    }

    pub async fn handle(&self, entity_id: &str, text: &str, today: NaiveDate) -> Message {
        let reply = match route_command(text) {
            Command::CheckStatus => self.check_status(entity_id, today).await,
            Command::RegisterLink => register_link_reply(&self.calendar_url, entity_id),
            Command::Answer { will_eat_out } => self.answer(entity_id, today, will_eat_out).await,
            Command::SetReminder { time } => self.set_reminder(entity_id, &time).await,
            Command::CancelReminder => self.cancel_reminder(entity_id).await,
            Command::Unrecognized => UNRECOGNIZED_REPLY.to_string(),
        };
        Message::text(reply)
    }

    async fn check_status(&self, entity_id: &str, today: NaiveDate) -> String {
        match status_resolver::resolve(self.store.as_ref(), entity_id, today).await {
            Ok(status) => status_reply(status).to_string(),
            Err(_) => STORE_FAILED_REPLY.to_string(),
        }
    }

    async fn answer(&self, entity_id: &str, today: NaiveDate, will_eat_out: bool) -> String {
        match self.store.set_status(entity_id, today, will_eat_out).await {
            Ok(_) => answer_reply(will_eat_out),
            Err(err) => {
                warn!(entity_id, %today, error = %err, "failed to store answer");
                ANSWER_FAILED_REPLY.to_string()
            }
        }
    }

    async fn set_reminder(&self, entity_id: &str, time: &str) -> String {
        let spec = match TimeSpec::parse_with(time, self.zeros) {
            Ok(spec) => spec,
            Err(err) => {
                info!(entity_id, time, error = %err, "rejected reminder time");
                return TIME_FORMAT_REPLY.to_string();
            }
        };
        if let Err(err) = self.registry.register(entity_id, spec, self.job.clone()) {
            warn!(entity_id, at = %spec, error = %err, "failed to register reminder");
            return SCHEDULING_FAILED_REPLY.to_string();
        }
        if let Err(err) = self.schedules.save_schedule(entity_id, spec).await {
            warn!(entity_id, at = %spec, error = %err, "reminder active but not persisted");
        }
        reminder_set_reply(spec)
    }

    async fn cancel_reminder(&self, entity_id: &str) -> String {
        let cancelled = match self.registry.cancel(entity_id) {
            Ok(cancelled) => cancelled,
            Err(err) => {
                warn!(entity_id, error = %err, "failed to cancel reminder");
                return SCHEDULING_FAILED_REPLY.to_string();
            }
        };
        if let Err(err) = self.schedules.delete_schedule(entity_id).await {
            warn!(entity_id, error = %err, "failed to delete persisted reminder");
        }
        if cancelled {
            CANCELLED_REPLY.to_string()
        } else {
            NOTHING_TO_CANCEL_REPLY.to_string()
        }
    }

    /// Re-registers every persisted schedule. Returns how many are active.
    pub async fn restore_schedules(&self) -> Result<usize, StoreError> {
        let schedules = self.schedules.load_schedules().await?;
        let mut restored = 0;
        for (entity_id, spec) in schedules {
            match self.registry.register(&entity_id, spec, self.job.clone()) {
                Ok(()) => restored += 1,
                Err(err) => {
                    warn!(entity_id = %entity_id, at = %spec, error = %err, "failed to restore reminder")
                }
            }
        }
        info!(restored, "restored persisted reminders");
        Ok(restored)
    }
}
