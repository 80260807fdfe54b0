use chrono::NaiveDate;
use tracing::warn;

use crate::error::StoreError;
use crate::models::eat_out::EatOutStatus;
use crate::service::status_store::StatusStore;

/// Reads the entity's record for `date` and maps it to a status.
///
/// Queries the store on every call. A read failure is returned as-is and is
/// never reported as `Undecided`.
pub async fn resolve<S: StatusStore + ?Sized>(
    store: &S,
    entity_id: &str,
    date: NaiveDate,
) -> Result<EatOutStatus, StoreError> {
    match store.get_status(entity_id, date).await {
        Ok(stored) => Ok(EatOutStatus::from(stored)),
        Err(err) => {
            warn!(entity_id, %date, error = %err, "failed to read eat-out status");
            Err(err)
        }
    }
}
