use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::error::RosterError;
use crate::models::{DoctorFields, DoctorId, ServiceSlot};
use crate::services::{
    views::{self, AgendaFilter, DoctorFilter},
    DoctorEditor, RosterSession, SupabaseRosterStore,
};

#[derive(Debug, Deserialize)]
pub struct SaveDoctorRequest {
    pub doctor: DoctorFields,
    #[serde(default)]
    pub slots: Vec<ServiceSlot>,
}

#[derive(Debug, Deserialize)]
pub struct ReferenceRequest {
    pub name: String,
}

/// Loads the caller's roster, acting with the caller's own access token.
async fn open_session(state: &AppConfig, user: User, token: &str) -> Result<RosterSession, AppError> {
    let store = Arc::new(SupabaseRosterStore::new(state, token));
    Ok(RosterSession::open(store, user).await?)
}

/// Body for a doctor write that reached storage. `doctor` is null when the
/// roster could not be reloaded afterwards.
fn saved_doctor(session: &RosterSession, doctor_id: DoctorId, details: Option<views::DoctorDetails>) -> Value {
    debug!("Doctor {} saved for {}", doctor_id, session.owner_id());
    let stale = details.is_none();
    json!({
        "id": doctor_id,
        "doctor": details,
        "stale": stale
    })
}

/// Runs a doctor write. A reload failure after the write committed is
/// reported as saved with stale details, so clients do not repeat the write.
async fn write_doctor(session: &RosterSession, editor: DoctorEditor) -> Result<Value, AppError> {
    match session.submit(editor).await {
        Ok(doctor_id) => {
            let details = views::doctor_details(&session.snapshot().await, doctor_id)?;
            Ok(saved_doctor(session, doctor_id, Some(details)))
        }
        Err(RosterError::RefreshFailed { doctor_id, message }) => {
            warn!("Returning stale result for doctor {}: {}", doctor_id, message);
            Ok(saved_doctor(session, doctor_id, None))
        }
        Err(err) => Err(err.into()),
    }
}

// ==============================================================================
// READ HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_roster(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let session = open_session(&state, user, auth.token()).await?;
    let snapshot = session.snapshot().await;

    Ok(Json(json!({
        "doctors": snapshot.doctors,
        "schedules": snapshot.schedules,
        "specialties": snapshot.specialties,
        "neighborhoods": snapshot.neighborhoods,
        "filters": views::filter_options(&snapshot),
    })))
}

#[axum::debug_handler]
pub async fn get_agenda(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(filter): Query<AgendaFilter>,
) -> Result<Json<Value>, AppError> {
    let session = open_session(&state, user, auth.token()).await?;
    let entries = views::agenda(&session.snapshot().await, &filter);

    Ok(Json(json!({
        "entries": entries,
        "total": entries.len()
    })))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(filter): Query<DoctorFilter>,
) -> Result<Json<Value>, AppError> {
    let session = open_session(&state, user, auth.token()).await?;
    let cards = views::doctor_cards(&session.snapshot().await, &filter);

    Ok(Json(json!({
        "doctors": cards,
        "total": cards.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let session = open_session(&state, user, auth.token()).await?;
    let details = views::doctor_details(&session.snapshot().await, doctor_id)?;

    Ok(Json(json!(details)))
}

#[axum::debug_handler]
pub async fn get_doctor_editor(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<DoctorEditor>, AppError> {
    let session = open_session(&state, user, auth.token()).await?;
    Ok(Json(session.editor(Some(doctor_id)).await?))
}

// ==============================================================================
// WRITE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<SaveDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    // Validate before loading anything.
    request.doctor.validate().map_err(RosterError::Validation)?;

    let session = open_session(&state, user, auth.token()).await?;
    let editor = DoctorEditor::from_parts(None, request.doctor, request.slots);
    let body = write_doctor(&session, editor).await?;

    Ok((StatusCode::CREATED, Json(body)))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<SaveDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    request.doctor.validate().map_err(RosterError::Validation)?;

    let session = open_session(&state, user, auth.token()).await?;
    let editor = DoctorEditor::from_parts(Some(doctor_id), request.doctor, request.slots);

    Ok(Json(write_doctor(&session, editor).await?))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let session = open_session(&state, user, auth.token()).await?;
    let stale = match session.delete_doctor(doctor_id).await {
        Ok(()) => false,
        Err(RosterError::RefreshFailed { message, .. }) => {
            warn!("Doctor {} deleted but roster reload failed: {}", doctor_id, message);
            true
        }
        Err(err) => return Err(err.into()),
    };

    Ok(Json(json!({
        "success": true,
        "message": "Doctor deleted",
        "stale": stale
    })))
}

#[axum::debug_handler]
pub async fn add_specialty(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<ReferenceRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let session = open_session(&state, user, auth.token()).await?;
    let specialty = session.add_specialty(&request.name).await?;

    Ok((StatusCode::CREATED, Json(json!(specialty))))
}

#[axum::debug_handler]
pub async fn add_neighborhood(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<ReferenceRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let session = open_session(&state, user, auth.token()).await?;
    let neighborhood = session.add_neighborhood(&request.name).await?;

    Ok((StatusCode::CREATED, Json(json!(neighborhood))))
}
