//! Retrieval pipeline: embed → search → (optionally) generate.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use super::metrics;
use super::prompts::{answer_prompt, build_context, condense_prompt};
use super::providers::{
    EmbeddingProvider, GenerationParams, ProviderError, QueryRequest, TextProvider, VectorIndex,
};
use super::text::{clean_passage, tidy_condensed_quote};
use crate::config::WisdomSettings;
use crate::models::Match;

/// Failure of a pipeline stage. Each one surfaces as a 500.
#[derive(Debug, Error)]
pub enum WisdomError {
    #[error("embedding failed: {0}")]
    Embedding(#[source] ProviderError),

    #[error("index query failed: {0}")]
    Search(#[source] ProviderError),

    #[error("answer generation failed: {0}")]
    Generation(#[source] ProviderError),

    #[error("model returned an empty answer")]
    EmptyAnswer,
}

/// How a quote request was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteOutcome {
    /// The model rewrote the passage.
    Condensed(String),
    /// Condensation failed; the passage was cleaned locally instead.
    FallbackCleaned(String),
    /// Condensation is turned off; the cleaned passage is returned.
    Passthrough(String),
    /// The index had nothing usable.
    NoMatch(String),
}

impl QuoteOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            QuoteOutcome::Condensed(_) => "condensed",
            QuoteOutcome::FallbackCleaned(_) => "fallback_cleaned",
            QuoteOutcome::Passthrough(_) => "passthrough",
            QuoteOutcome::NoMatch(_) => "no_match",
        }
    }

    pub fn into_quote(self) -> String {
        match self {
            QuoteOutcome::Condensed(q)
            | QuoteOutcome::FallbackCleaned(q)
            | QuoteOutcome::Passthrough(q)
            | QuoteOutcome::NoMatch(q) => q,
        }
    }
}

/// Stateless request pipeline over shared, read-only client handles.
#[derive(Clone)]
pub struct WisdomService {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn TextProvider>,
    settings: WisdomSettings,
    namespace: String,
}

impl WisdomService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn TextProvider>,
        settings: WisdomSettings,
        namespace: String,
    ) -> Self {
        Self {
            embedder,
            index,
            generator,
            settings,
            namespace,
        }
    }

    /// Closest passage for `seed`, condensed to a one-liner when possible.
    pub async fn quote(&self, seed: &str) -> Result<QuoteOutcome, WisdomError> {
        let matches = self.retrieve(seed, 1).await?;

        let outcome = match matches.iter().find_map(Match::text) {
            None => QuoteOutcome::NoMatch(self.settings.no_match_quote()),
            Some(passage) if !self.settings.condense_quotes => {
                QuoteOutcome::Passthrough(clean_passage(passage))
            }
            Some(passage) => self.condense(passage).await,
        };

        metrics::record_quote_outcome(outcome.label());
        Ok(outcome)
    }

    /// Grounded answer to `question` from the top-K passages.
    pub async fn answer(&self, question: &str) -> Result<String, WisdomError> {
        let matches = self.retrieve(question, self.settings.answer_top_k).await?;
        let context = build_context(&matches);

        tracing::debug!(
            matches = matches.len(),
            context_len = context.len(),
            "Built answer context"
        );

        let prompt = answer_prompt(&self.settings.author, &context, question);
        let params = GenerationParams {
            temperature: self.settings.answer_temperature,
            max_tokens: self.settings.max_output_tokens,
        };
        let response = timed("gemini", "generate", self.generator.generate(&prompt, &params))
            .await
            .map_err(WisdomError::Generation)?;

        tracing::info!(
            model = %self.generator.model(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            finish_reason = response.finish_reason.as_str(),
            "Answer generated"
        );

        response
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(WisdomError::EmptyAnswer)
    }

    async fn retrieve(&self, text: &str, top_k: u32) -> Result<Vec<Match>, WisdomError> {
        let vector = timed("gemini", "embed", self.embedder.embed(text))
            .await
            .map_err(WisdomError::Embedding)?;

        let request = QueryRequest {
            vector,
            top_k,
            namespace: self.namespace.clone(),
        };

        let matches = timed("pinecone", "query", self.index.query(&request))
            .await
            .map_err(WisdomError::Search)?;

        tracing::info!(
            top_k,
            namespace = %self.namespace,
            matches = matches.len(),
            "Retrieved passages"
        );

        Ok(matches)
    }

    /// Rewrite via the model; any failure falls back to the cleaned passage.
    async fn condense(&self, passage: &str) -> QuoteOutcome {
        let prompt = condense_prompt(&self.settings.author, passage);
        let params = GenerationParams {
            temperature: self.settings.condense_temperature,
            max_tokens: self.settings.max_output_tokens,
        };
        let result = timed("gemini", "generate", self.generator.generate(&prompt, &params)).await;

        match result {
            Ok(response) => match response.text.as_deref().and_then(tidy_condensed_quote) {
                Some(quote) => {
                    tracing::debug!(
                        input_tokens = response.input_tokens,
                        output_tokens = response.output_tokens,
                        "Quote condensed"
                    );
                    QuoteOutcome::Condensed(quote)
                }
                None => {
                    tracing::warn!(
                        model = %self.generator.model(),
                        finish_reason = response.finish_reason.as_str(),
                        "Condensation returned no text, using cleaned passage"
                    );
                    QuoteOutcome::FallbackCleaned(clean_passage(passage))
                }
            },
            Err(e) => {
                tracing::warn!(
                    model = %self.generator.model(),
                    error = %e,
                    "Condensation failed, using cleaned passage"
                );
                QuoteOutcome::FallbackCleaned(clean_passage(passage))
            }
        }
    }
}

/// Await an upstream call, recording its latency and any error.
async fn timed<T, F>(provider: &str, operation: &str, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    let start = Instant::now();
    let result = call.await;
    metrics::record_upstream_call(provider, operation, start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        metrics::record_upstream_error(provider, e.kind());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::{
        MockEmbeddingProvider, MockReply, MockTextProvider, MockVectorIndex,
    };

    const PASSAGE: &str = "Our favorite holding period\n\n is   forever.";

    fn settings(condense: bool) -> WisdomSettings {
        WisdomSettings {
            author: "Warren Buffett".to_string(),
            answer_top_k: 4,
            condense_quotes: condense,
            ..WisdomSettings::default()
        }
    }

    fn service(
        index: MockVectorIndex,
        generator: Arc<MockTextProvider>,
        condense: bool,
    ) -> WisdomService {
        WisdomService::new(
            Arc::new(MockEmbeddingProvider::new(true)),
            Arc::new(index),
            generator,
            settings(condense),
            "buffett-wisdom-namespace".to_string(),
        )
    }

    #[tokio::test]
    async fn quote_is_condensed_when_generation_succeeds() {
        let generator = Arc::new(MockTextProvider::replying(
            "\"Our favorite holding period is forever.\"",
        ));
        let svc = service(
            MockVectorIndex::new(vec![Match::with_text("p1", PASSAGE)]),
            generator.clone(),
            true,
        );

        let outcome = svc.quote("patience").await.unwrap();

        assert_eq!(
            outcome,
            QuoteOutcome::Condensed("Our favorite holding period is forever.".to_string())
        );
        assert_eq!(generator.prompts().len(), 1);
        assert!(generator.prompts()[0].contains(PASSAGE));
    }

    #[tokio::test]
    async fn quote_falls_back_to_cleaned_passage_on_generation_failure() {
        let svc = service(
            MockVectorIndex::new(vec![Match::with_text("p1", PASSAGE)]),
            Arc::new(MockTextProvider::new(MockReply::Fail)),
            true,
        );

        let outcome = svc.quote("patience").await.unwrap();

        assert_eq!(
            outcome,
            QuoteOutcome::FallbackCleaned("Our favorite holding period is forever.".to_string())
        );
    }

    #[tokio::test]
    async fn quote_falls_back_when_model_returns_nothing() {
        let svc = service(
            MockVectorIndex::new(vec![Match::with_text("p1", PASSAGE)]),
            Arc::new(MockTextProvider::new(MockReply::Empty)),
            true,
        );

        let outcome = svc.quote("patience").await.unwrap();
        assert_eq!(outcome.label(), "fallback_cleaned");
    }

    #[tokio::test]
    async fn quote_without_matches_skips_generation() {
        let generator = Arc::new(MockTextProvider::replying("unused"));
        let svc = service(MockVectorIndex::new(Vec::new()), generator.clone(), true);

        let outcome = svc.quote("zebra").await.unwrap();

        assert_eq!(
            outcome.into_quote(),
            "No relevant Warren Buffett text found. Please try again."
        );
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn quote_passthrough_when_condensing_disabled() {
        let generator = Arc::new(MockTextProvider::replying("unused"));
        let svc = service(
            MockVectorIndex::new(vec![Match::with_text("p1", PASSAGE)]),
            generator.clone(),
            false,
        );

        let outcome = svc.quote("patience").await.unwrap();

        assert_eq!(
            outcome,
            QuoteOutcome::Passthrough("Our favorite holding period is forever.".to_string())
        );
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn quote_queries_a_single_neighbour_in_namespace() {
        let index = Arc::new(MockVectorIndex::new(vec![
            Match::with_text("p1", "one"),
            Match::with_text("p2", "two"),
        ]));
        let svc = WisdomService::new(
            Arc::new(MockEmbeddingProvider::new(true)),
            index.clone(),
            Arc::new(MockTextProvider::replying("one")),
            settings(true),
            "buffett-wisdom-namespace".to_string(),
        );

        svc.quote("seed").await.unwrap();

        let requests = index.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].top_k, 1);
        assert_eq!(requests[0].namespace, "buffett-wisdom-namespace");
    }

    #[tokio::test]
    async fn seed_and_question_are_embedded_verbatim() {
        let embedder = Arc::new(MockEmbeddingProvider::new(true));
        let svc = WisdomService::new(
            embedder.clone(),
            Arc::new(MockVectorIndex::new(vec![Match::with_text("p1", PASSAGE)])),
            Arc::new(MockTextProvider::replying("Hold forever.")),
            settings(true),
            "buffett-wisdom-namespace".to_string(),
        );

        svc.quote("patience").await.unwrap();
        svc.answer("How long should I hold?").await.unwrap();

        assert_eq!(
            embedder.inputs(),
            vec!["patience".to_string(), "How long should I hold?".to_string()]
        );
    }

    #[tokio::test]
    async fn generation_uses_configured_params_per_call() {
        let generator = Arc::new(MockTextProvider::replying("Hold forever."));
        let svc = WisdomService::new(
            Arc::new(MockEmbeddingProvider::new(true)),
            Arc::new(MockVectorIndex::new(vec![Match::with_text("p1", PASSAGE)])),
            generator.clone(),
            WisdomSettings {
                condense_temperature: Some(0.9),
                answer_temperature: Some(0.2),
                max_output_tokens: Some(256),
                ..settings(true)
            },
            "buffett-wisdom-namespace".to_string(),
        );

        svc.quote("patience").await.unwrap();
        svc.answer("How long should I hold?").await.unwrap();

        assert_eq!(
            generator.params(),
            vec![
                GenerationParams {
                    temperature: Some(0.9),
                    max_tokens: Some(256),
                },
                GenerationParams {
                    temperature: Some(0.2),
                    max_tokens: Some(256),
                },
            ]
        );
    }

    #[tokio::test]
    async fn default_settings_leave_generation_params_unset() {
        let generator = Arc::new(MockTextProvider::replying("Hold forever."));
        let svc = service(
            MockVectorIndex::new(vec![Match::with_text("p1", PASSAGE)]),
            generator.clone(),
            true,
        );

        svc.answer("Why?").await.unwrap();

        assert_eq!(generator.params(), vec![GenerationParams::default()]);
    }

    #[tokio::test]
    async fn answer_sends_grounded_prompt_with_all_passages() {
        let generator = Arc::new(MockTextProvider::replying("  Buy wonderful businesses.  "));
        let svc = service(
            MockVectorIndex::new(vec![
                Match::with_text("a", "Passage A."),
                Match::with_text("b", "Passage B."),
            ]),
            generator.clone(),
            true,
        );

        let answer = svc.answer("What should I buy?").await.unwrap();

        assert_eq!(answer, "Buy wonderful businesses.");
        let prompt = &generator.prompts()[0];
        assert!(prompt.contains("Passage A.\n\n---\n\nPassage B."));
        assert!(prompt.contains("What should I buy?"));
    }

    #[tokio::test]
    async fn answer_surfaces_generation_failure() {
        let svc = service(
            MockVectorIndex::new(vec![Match::with_text("a", "Passage A.")]),
            Arc::new(MockTextProvider::new(MockReply::Fail)),
            true,
        );

        let err = svc.answer("Why?").await.unwrap_err();
        assert!(matches!(err, WisdomError::Generation(_)));
    }

    #[tokio::test]
    async fn answer_rejects_empty_model_reply() {
        let svc = service(
            MockVectorIndex::new(vec![Match::with_text("a", "Passage A.")]),
            Arc::new(MockTextProvider::new(MockReply::Empty)),
            true,
        );

        let err = svc.answer("Why?").await.unwrap_err();
        assert!(matches!(err, WisdomError::EmptyAnswer));
    }

    #[tokio::test]
    async fn search_failure_is_an_error() {
        let svc = service(
            MockVectorIndex::failing(),
            Arc::new(MockTextProvider::replying("unused")),
            true,
        );

        let err = svc.quote("seed").await.unwrap_err();
        assert!(matches!(err, WisdomError::Search(_)));
    }
}
