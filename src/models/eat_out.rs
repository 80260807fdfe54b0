use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InputFormatError;

/// A user, group or room id as delivered by the messaging channel.
pub type EntityId = String;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One stored answer for an entity on a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EatOutRecord {
    pub entity_id: EntityId,
    pub date: NaiveDate,
    pub will_eat_out: bool,
}

/// Resolved status for an entity on a date. A missing record is `Undecided`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EatOutStatus {
    EatingOut,
    StayingIn,
    Undecided,
}

impl From<Option<bool>> for EatOutStatus {
    fn from(stored: Option<bool>) -> Self {
        match stored {
            Some(true) => EatOutStatus::EatingOut,
            Some(false) => EatOutStatus::StayingIn,
            None => EatOutStatus::Undecided,
        }
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, InputFormatError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| InputFormatError::Date(raw.to_string()))
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Calendar day of `now` as seen in `tz`.
pub fn local_date<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    now.with_timezone(tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Tokyo;

    #[test]
    fn stored_values_map_to_three_states() {
        assert_eq!(EatOutStatus::from(Some(true)), EatOutStatus::EatingOut);
        assert_eq!(EatOutStatus::from(Some(false)), EatOutStatus::StayingIn);
        assert_eq!(EatOutStatus::from(None), EatOutStatus::Undecided);
    }

    #[test]
    fn local_date_follows_the_zone() {
        // 16:00 UTC is already the next day in Tokyo.
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 16, 0, 0).unwrap();
        assert_eq!(
            local_date(now, &Tokyo),
            NaiveDate::from_ymd_opt(2026, 2, 11).unwrap()
        );
        assert_eq!(
            local_date(now, &Utc),
            NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
        );
    }

    #[test]
    fn dates_round_trip_through_the_wire_format() {
        let date = parse_date("2026-03-05").unwrap();
        assert_eq!(format_date(&date), "2026-03-05");
        assert!(parse_date("2026/03/05").is_err());
        assert!(parse_date("2026-02-30").is_err());
    }
}
