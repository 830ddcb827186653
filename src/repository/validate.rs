//! Shared validation for dashboard writes.

use crate::backend::BackendError;
use crate::models::{ActivityCategory, FarmId};

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("please fill in {0}")]
    MissingField(&'static str),

    #[error("{field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("farm {0} is not one of your farms")]
    FarmNotOwned(FarmId),

    #[error("{activity_type} is not a {category} activity (expected one of {})", .category.subtypes().join(", "))]
    InvalidActivityType {
        category: ActivityCategory,
        activity_type: String,
    },

    #[error("{0}")]
    Backend(#[from] BackendError),
}

/// Trimmed value of a required text field.
pub fn required(field: &'static str, value: &str) -> Result<String, DashboardError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DashboardError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn present<T>(field: &'static str, value: Option<T>) -> Result<T, DashboardError> {
    value.ok_or(DashboardError::MissingField(field))
}

pub fn non_negative(field: &'static str, value: f64) -> Result<f64, DashboardError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(DashboardError::InvalidValue {
            field,
            reason: format!("must be a number >= 0, got {}", value),
        })
    }
}

pub fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
