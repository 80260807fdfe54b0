use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreError;
use crate::models::eat_out::EatOutRecord;
use crate::models::time_spec::TimeSpec;

/// Read/write access to eat-out answers keyed by (entity, date).
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// `Ok(None)` means no record; failures are always `Err`.
    async fn get_status(&self, entity_id: &str, date: NaiveDate) -> Result<Option<bool>, StoreError>;

    /// Update-or-insert. Returns the number of rows affected.
    async fn set_status(
        &self,
        entity_id: &str,
        date: NaiveDate,
        will_eat_out: bool,
    ) -> Result<usize, StoreError>;

    /// All records for one entity, ordered by date.
    async fn list_statuses(&self, entity_id: &str) -> Result<Vec<EatOutRecord>, StoreError>;
}

/// Durable copy of the reminder times, reloaded when the service starts.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn save_schedule(&self, entity_id: &str, spec: TimeSpec) -> Result<(), StoreError>;

    /// Returns whether a schedule was removed.
    async fn delete_schedule(&self, entity_id: &str) -> Result<bool, StoreError>;

    async fn load_schedules(&self) -> Result<Vec<(String, TimeSpec)>, StoreError>;
}
