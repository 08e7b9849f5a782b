use axum::{extract::rejection::JsonRejection, extract::State, Json};
use service_core::error::AppError;

use super::{required, validated};
use crate::dtos::{AnswerRequest, AnswerResponse};
use crate::startup::AppState;

pub const QUESTION_REQUIRED: &str = "Question is required.";

/// `POST /api`: answer a question from the retrieved passages only.
#[tracing::instrument(skip(state, payload), fields(question_len))]
pub async fn answer_question(
    State(state): State<AppState>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, AppError> {
    let request = validated(payload, QUESTION_REQUIRED)?;
    let question = required(request.question, QUESTION_REQUIRED)?;
    tracing::Span::current().record("question_len", question.len());

    let answer = state.wisdom.answer(&question).await?;

    tracing::info!(answer_len = answer.len(), "Answer served");

    Ok(Json(AnswerResponse { answer }))
}
