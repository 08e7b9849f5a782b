use axum::{extract::rejection::JsonRejection, extract::State, Json};
use service_core::error::AppError;

use super::{required, validated};
use crate::dtos::{QuoteRequest, QuoteResponse};
use crate::startup::AppState;

pub const SEED_REQUIRED: &str = "Seed word is required.";

/// `POST /api/getquote`: closest passage to the seed word, as a short quote.
#[tracing::instrument(skip(state, payload), fields(seed_len))]
pub async fn get_quote(
    State(state): State<AppState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<QuoteResponse>, AppError> {
    let request = validated(payload, SEED_REQUIRED)?;
    let seed = required(request.seed, SEED_REQUIRED)?;
    tracing::Span::current().record("seed_len", seed.len());

    let outcome = state.wisdom.quote(&seed).await?;

    tracing::info!(outcome = outcome.label(), "Quote served");

    Ok(Json(QuoteResponse {
        quote: outcome.into_quote(),
    }))
}
