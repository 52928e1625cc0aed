use serde::{Deserialize, Serialize};

use shared_models::auth::{AuthSession, AuthUser};

#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    /// Display name, stored as `full_name` in the account metadata.
    pub name: String,
}

/// Result of creating an account. Projects that require e-mail confirmation
/// return the account without a session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignUpOutcome {
    SignedIn { session: AuthSession },
    ConfirmationPending { user: AuthUser },
}

/// Avatar image sent by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct AvatarUpload {
    /// Original file name; only its extension is used.
    pub file_name: Option<String>,
    /// Base64 payload, optionally as a `data:image/...;base64,` URL.
    pub file_data: String,
}
