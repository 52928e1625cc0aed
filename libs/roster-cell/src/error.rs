use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use shared_database::SupabaseError;
use shared_models::error::AppError;

/// Form-level validation messages keyed by field name (`name`, `specialty`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Old schedule rows are gone but the new ones were not written.
    /// Saving the doctor again repairs it.
    #[error("Schedules of doctor {doctor_id} could not be saved: {message}")]
    PartialSave { doctor_id: Uuid, message: String },

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("A save is already in progress")]
    SaveInProgress,

    /// The write reached storage but the roster could not be reloaded
    /// afterwards. Saving again would repeat the write.
    #[error("Doctor {doctor_id} was saved but the roster could not be reloaded: {message}")]
    RefreshFailed { doctor_id: Uuid, message: String },

    #[error("Invalid {table} row: {reason}")]
    InvalidRow { table: &'static str, reason: String },
}

impl From<SupabaseError> for RosterError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::Auth(message) => RosterError::Unauthorized(message),
            SupabaseError::NotFound(message) => RosterError::NotFound(message),
            other if other.is_unique_violation() => RosterError::Duplicate(other.message()),
            other => RosterError::Storage(other.message()),
        }
    }
}

impl From<RosterError> for AppError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::Validation(fields) => AppError::FieldValidation(fields.into_inner()),
            RosterError::Storage(message) => AppError::Database(message),
            err @ RosterError::PartialSave { .. } => AppError::Database(err.to_string()),
            RosterError::Unauthorized(message) => AppError::Forbidden(message),
            RosterError::NotFound(message) => AppError::NotFound(message),
            RosterError::Duplicate(message) => AppError::Conflict(message),
            err @ RosterError::SaveInProgress => AppError::Conflict(err.to_string()),
            err @ RosterError::RefreshFailed { .. } => AppError::Database(err.to_string()),
            err @ RosterError::InvalidRow { .. } => AppError::Internal(err.to_string()),
        }
    }
}
