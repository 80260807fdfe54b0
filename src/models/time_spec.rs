use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InputFormatError;

/// How a literal zero hour or minute is treated by [`TimeSpec::parse_with`].
///
/// `Reject` is the default: a zero component counts as a missing value, so
/// `00:00` and every `H:00` cannot be scheduled. `Allow` lifts that boundary
/// and only range checks apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZeroComponents {
    #[default]
    Reject,
    Allow,
}

/// A validated time of day that fires once per day in the registry's zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSpec {
    hour: u32,
    minute: u32,
}

impl TimeSpec {
    pub fn new(hour: u32, minute: u32, zeros: ZeroComponents) -> Result<Self, InputFormatError> {
        if zeros == ZeroComponents::Reject {
            if hour == 0 {
                return Err(InputFormatError::Zero("hour".to_string()));
            }
            if minute == 0 {
                return Err(InputFormatError::Zero("minute".to_string()));
            }
        }
        if hour >= 24 {
            return Err(InputFormatError::HourOutOfRange(hour));
        }
        if minute >= 60 {
            return Err(InputFormatError::MinuteOutOfRange(minute));
        }
        Ok(Self { hour, minute })
    }

    /// Parses `H:M` with the default zero policy.
    pub fn parse(input: &str) -> Result<Self, InputFormatError> {
        Self::parse_with(input, ZeroComponents::Reject)
    }

    pub fn parse_with(input: &str, zeros: ZeroComponents) -> Result<Self, InputFormatError> {
        let parts: Vec<&str> = input.split(':').collect();
        let [hour, minute] = parts.as_slice() else {
            return Err(InputFormatError::Shape(input.to_string()));
        };
        let hour = parse_component(hour)?;
        let minute = parse_component(minute)?;
        Self::new(hour, minute, zeros)
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Six-field expression (sec min hour dom month dow) for the `cron` crate.
    pub fn cron_expression(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }
}

fn parse_component(raw: &str) -> Result<u32, InputFormatError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(InputFormatError::NotNumeric(raw.to_string()));
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| InputFormatError::NotNumeric(raw.to_string()))
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.hour, self.minute)
    }
}
