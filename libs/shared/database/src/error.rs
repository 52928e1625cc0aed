use serde::Deserialize;
use thiserror::Error;

/// Postgres `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl SupabaseError {
    /// Builds the error for a non-success response, reading whichever message
    /// field the collaborator used (PostgREST, GoTrue and Storage differ).
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let code = parsed.code.and_then(|code| match code {
            serde_json::Value::String(code) => Some(code),
            serde_json::Value::Number(code) => Some(code.to_string()),
            _ => None,
        });
        let message = parsed
            .message
            .or(parsed.error_description)
            .or(parsed.msg)
            .or(parsed.error)
            .unwrap_or_else(|| body.to_string());

        match status {
            401 | 403 => SupabaseError::Auth(message),
            404 => SupabaseError::NotFound(message),
            _ => SupabaseError::Api { status, code, message },
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            SupabaseError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        match self {
            SupabaseError::Api { code, message, .. } => {
                code.as_deref() == Some(UNIQUE_VIOLATION)
                    || message.contains("duplicate key")
                    || message.contains("unique constraint")
            }
            _ => false,
        }
    }

    /// Collaborator message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            SupabaseError::Auth(message) | SupabaseError::NotFound(message) => message.clone(),
            SupabaseError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<serde_json::Value>,
    message: Option<String>,
    msg: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn postgrest_unique_violation_is_detected() {
        let body = r#"{"code":"23505","details":"Key (name)=(Centro) already exists.","hint":null,"message":"duplicate key value violates unique constraint \"neighborhoods_name_key\""}"#;
        let err = SupabaseError::from_response(409, body);

        assert_eq!(err.code(), Some("23505"));
        assert!(err.is_unique_violation());
    }

    #[test]
    fn gotrue_error_description_is_used() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        let err = SupabaseError::from_response(400, body);

        assert_matches!(err, SupabaseError::Api { status: 400, ref message, .. } if message == "Invalid login credentials");
    }

    #[test]
    fn auth_statuses_map_to_auth_variant() {
        let err = SupabaseError::from_response(403, r#"{"code":"42501","message":"permission denied for table doctors"}"#);
        assert_matches!(err, SupabaseError::Auth(ref message) if message.contains("permission denied"));
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn plain_text_body_is_kept() {
        let err = SupabaseError::from_response(500, "upstream timeout");
        assert_eq!(err.message(), "upstream timeout");
    }
}
