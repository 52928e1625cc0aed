use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::SupabaseError;
use shared_models::auth::{Profile, User};
use shared_models::error::AppError;

use crate::models::{AvatarUpload, SignInRequest, SignUpRequest};
use crate::services::{profile_for, AuthService, AvatarService};

/// Maps a service failure to an HTTP error. Rejections by the auth
/// collaborator keep their message; anything else is an upstream failure.
fn collaborator_error(err: anyhow::Error, rejected: fn(String) -> AppError) -> AppError {
    match err.downcast_ref::<SupabaseError>() {
        Some(SupabaseError::Auth(message)) => AppError::Auth(message.clone()),
        Some(SupabaseError::Api { status, message, .. }) if (400..500).contains(status) => {
            rejected(message.clone())
        }
        Some(other) => AppError::ExternalService(other.to_string()),
        None => AppError::BadRequest(err.to_string()),
    }
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn sign_in(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<Value>, AppError> {
    let auth_service = AuthService::new(&state);

    let session = auth_service
        .sign_in(&request.email, &request.password)
        .await
        .map_err(|e| collaborator_error(e, AppError::Auth))?;

    let profile = profile_for(&User::from(session.user.clone()));
    Ok(Json(json!({
        "session": session,
        "profile": profile
    })))
}

#[axum::debug_handler]
pub async fn sign_up(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let auth_service = AuthService::new(&state);

    let outcome = auth_service
        .sign_up(&request.email, &request.password, &request.name)
        .await
        .map_err(|e| collaborator_error(e, AppError::BadRequest))?;

    Ok((StatusCode::CREATED, Json(json!(outcome))))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn sign_out(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let auth_service = AuthService::new(&state);

    auth_service
        .sign_out(auth.token())
        .await
        .map_err(|e| collaborator_error(e, AppError::Auth))?;

    Ok(Json(json!({
        "success": true,
        "message": "Signed out"
    })))
}

#[axum::debug_handler]
pub async fn get_profile(
    Extension(user): Extension<User>,
) -> Result<Json<Profile>, AppError> {
    debug!("Getting profile for user: {}", user.id);
    Ok(Json(profile_for(&user)))
}

#[axum::debug_handler]
pub async fn upload_avatar(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(upload): Json<AvatarUpload>,
) -> Result<Json<Profile>, AppError> {
    let avatar_service = AvatarService::new(&state);

    let public_url = avatar_service
        .update_profile_avatar(&user.id, &upload, auth.token())
        .await
        .map_err(|e| collaborator_error(e, AppError::BadRequest))?;

    let mut profile = profile_for(&user);
    profile.avatar_url = Some(public_url);
    Ok(Json(profile))
}
