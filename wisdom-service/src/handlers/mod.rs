//! HTTP handlers for wisdom-service.

pub mod answer;
pub mod health;
pub mod metrics;
pub mod quote;

use axum::{extract::rejection::JsonRejection, Json};
use service_core::error::AppError;
use validator::Validate;

use crate::services::WisdomError;

pub use answer::answer_question;
pub use health::health_check;
pub use quote::get_quote;

impl From<WisdomError> for AppError {
    fn from(err: WisdomError) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

/// Unwrap and validate a JSON body. Malformed or invalid bodies all map to a
/// 400 carrying `message`.
fn validated<T: Validate>(
    payload: Result<Json<T>, JsonRejection>,
    message: &str,
) -> Result<T, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        AppError::BadRequest(message.to_string())
    })?;

    request
        .validate()
        .map_err(|_| AppError::BadRequest(message.to_string()))?;

    Ok(request)
}

/// Take a field that validation has already marked `required`. `None` can
/// only reach here if the DTO loses its `#[validate(required)]` attribute.
fn required<T>(field: Option<T>, message: &str) -> Result<T, AppError> {
    field.ok_or_else(|| AppError::BadRequest(message.to_string()))
}
