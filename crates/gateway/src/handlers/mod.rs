//! Route handlers

pub mod api;
pub mod health;
pub mod page;
pub mod session;

use validator::Validate;

use rabbithole_common::errors::{AppError, Result};

/// Reject a request body or query that fails its declared constraints
pub(crate) fn validated<T: Validate>(input: T) -> Result<T> {
    input.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: e.field_errors().keys().next().map(|field| field.to_string()),
    })?;
    Ok(input)
}
