//! The hosted data service as seen by the rest of the application.
//!
//! Everything durable lives behind [`Backend`]: password auth, sign-up and
//! row-level table access. [`crate::client::SupabaseClient`] is the HTTP
//! implementation; tests use an in-memory fake.

use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::models::Identity;
use crate::query::{Filter, Query};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// The stored login could not be renewed; the user has to sign in again.
    #[error("session expired; log out and sign in again")]
    SessionExpired,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    #[error("unexpected response shape: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(value: serde_json::Error) -> Self {
        BackendError::Decode(value.to_string())
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for BackendError {
    fn from(value: serde_path_to_error::Error<serde_json::Error>) -> Self {
        BackendError::Decode(format!("at {}: {}", value.path(), value.inner()))
    }
}

pub trait Backend {
    /// Password sign-in. On success the backend acts as this identity for
    /// subsequent table calls.
    fn sign_in_with_password(&self, email: &str, password: &SecretString) -> Result<Identity, BackendError>;

    /// Registers a new identity. The backend's provisioning trigger creates
    /// the matching `profiles` row.
    fn sign_up(&self, email: &str, password: &SecretString) -> Result<Identity, BackendError>;

    /// Forget the signed-in identity.
    fn sign_out(&self);

    fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, BackendError>;

    /// Inserts one row and returns the stored representation.
    fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>, BackendError>;

    /// Applies `patch` to every row matching `filters`; returns updated rows.
    fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>, BackendError>;
}

/// Decode JSON rows, reporting the failing path.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, BackendError> {
    rows.into_iter()
        .map(|row| serde_path_to_error::deserialize(row).map_err(BackendError::from))
        .collect()
}

pub fn select_as<T: DeserializeOwned>(backend: &dyn Backend, table: &str, query: &Query) -> Result<Vec<T>, BackendError> {
    decode_rows(backend.select(table, query)?)
}

/// Inserts `row` and decodes the single returned representation.
pub fn insert_as<R: Serialize, T: DeserializeOwned>(backend: &dyn Backend, table: &str, row: &R) -> Result<T, BackendError> {
    let value = serde_json::to_value(row)?;
    decode_rows::<T>(backend.insert(table, value)?)?
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::Decode(format!("insert into {} returned no row", table)))
}
