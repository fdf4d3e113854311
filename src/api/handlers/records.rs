use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::require_present;
use crate::api::response::{ApiError, AppJson, AppQuery, MessageBody};
use crate::auth::AuthUser;
use crate::storage::models::{DataRecord, RecordFields};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordResponse {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service: String,
    /// `YYYY-MM-DD`
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordIdParams {
    pub id: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn save_record(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    AppJson(fields): AppJson<RecordFields>,
) -> Result<(StatusCode, Json<RecordResponse>), ApiError> {
    validate(&fields)?;

    let record = state
        .db
        .run(move |db| db.insert_record(user_id, &fields))
        .await?;

    tracing::debug!(record_id = record.id, user_id, "Saved record");
    Ok((StatusCode::CREATED, Json(record_to_response(&record))))
}

pub async fn get_records(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<Json<Vec<RecordResponse>>, ApiError> {
    let records = state
        .db
        .run(move |db| db.list_records(user_id))
        .await?;
    Ok(Json(records.iter().map(record_to_response).collect()))
}

pub async fn update_record(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    AppQuery(params): AppQuery<RecordIdParams>,
    AppJson(fields): AppJson<RecordFields>,
) -> Result<Json<MessageBody>, ApiError> {
    validate(&fields)?;

    let id = params.id;
    let updated = state
        .db
        .run(move |db| db.update_record(id, user_id, &fields))
        .await?;
    if !updated {
        return Err(ApiError::not_found("Record not found"));
    }

    tracing::debug!(record_id = params.id, user_id, "Updated record");
    Ok(MessageBody::json("Record updated successfully"))
}

pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    AppQuery(params): AppQuery<RecordIdParams>,
) -> Result<Json<MessageBody>, ApiError> {
    let id = params.id;
    if !state
        .db
        .run(move |db| db.delete_record(id, user_id))
        .await?
    {
        return Err(ApiError::not_found("Record not found"));
    }

    tracing::debug!(record_id = params.id, user_id, "Deleted record");
    Ok(MessageBody::json("Record deleted successfully"))
}

// ============================================================================
// Helpers
// ============================================================================

fn validate(fields: &RecordFields) -> Result<(), ApiError> {
    require_present(&[
        ("name", fields.name.as_str()),
        ("email", fields.email.as_str()),
        ("phone", fields.phone.as_str()),
        ("service", fields.service.as_str()),
    ])
}

fn record_to_response(record: &DataRecord) -> RecordResponse {
    RecordResponse {
        id: record.id,
        name: record.name.clone(),
        email: record.email.clone(),
        phone: record.phone.clone(),
        service: record.service.clone(),
        date: record.date.format("%Y-%m-%d").to_string(),
    }
}
