//! Calendar-facing read and write paths for eat-out records.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::error::{InputFormatError, StoreError};
use crate::models::eat_out::{EatOutRecord, format_date, parse_date};
use crate::service::status_store::StatusStore;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub user_id: String,
    pub date: String,
    pub will_eatout: bool,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct RegisterResponse {
    pub rows_affected: usize,
}

#[derive(Debug, Deserialize)]
pub struct MyDataRequest {
    pub user_id: String,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyDataEntry {
    pub date: String,
    pub will_eatout: bool,
}

impl From<EatOutRecord> for MyDataEntry {
    fn from(record: EatOutRecord) -> Self {
        Self {
            date: format_date(&record.date),
            will_eatout: record.will_eat_out,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("invalid request: {0}")]
    Input(#[from] InputFormatError),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

/// Writes one answer for (entity, date), updating an existing record.
pub async fn register<S: StatusStore + ?Sized>(
    store: &S,
    request: RegisterRequest,
) -> Result<RegisterResponse, RegistrationError> {
    let entity_id = request.user_id.trim();
    if entity_id.is_empty() {
        return Err(InputFormatError::MissingEntity.into());
    }
    let date = parse_date(&request.date)?;
    let rows_affected = store.set_status(entity_id, date, request.will_eatout).await?;
    info!(entity_id, %date, will_eat_out = request.will_eatout, "registered eat-out answer");
    Ok(RegisterResponse { rows_affected })
}

pub async fn my_data<S: StatusStore + ?Sized>(
    store: &S,
    request: MyDataRequest,
) -> Result<Vec<MyDataEntry>, RegistrationError> {
    let entity_id = request.user_id.trim();
    if entity_id.is_empty() {
        return Err(InputFormatError::MissingEntity.into());
    }
    let records = store.list_statuses(entity_id).await?;
    Ok(records.into_iter().map(MyDataEntry::from).collect())
}
