use thiserror::Error;

/// Malformed command text or an unparseable reminder time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputFormatError {
    #[error("expected HH:MM, got {0:?}")]
    Shape(String),

    #[error("time component is not a number: {0:?}")]
    NotNumeric(String),

    #[error("time component is zero: {0:?}")]
    Zero(String),

    #[error("hour {0} is out of range")]
    HourOutOfRange(u32),

    #[error("minute {0} is out of range")]
    MinuteOutOfRange(u32),

    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    Date(String),

    #[error("entity id is empty")]
    MissingEntity,
}

/// Persistence failure. Never a stand-in for "no record".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
    #[error("no async runtime available to drive reminders")]
    NoRuntime,

    #[error("reminder capacity of {0} entities reached")]
    Capacity(usize),

    #[error("invalid schedule {expression:?}: {reason}")]
    InvalidSchedule { expression: String, reason: String },

    #[error("registry lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("messaging API rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid destination: {0}")]
    Destination(String),
}

/// Outcome of a failed reminder firing.
#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("failed to read status: {0}")]
    Store(#[from] StoreError),

    #[error("failed to push reminder: {0}")]
    Notify(#[from] NotifyError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("invalid config line {line}: {content}")]
    Line { line: usize, content: String },

    #[error("invalid value for {key}: {value:?}")]
    Value { key: String, value: String },

    #[error("{0} must be set")]
    Missing(String),
}
