//! Request and response bodies.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct QuoteRequest {
    #[validate(required, length(min = 1))]
    pub seed: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub quote: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    #[validate(required, length(min = 1))]
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}
