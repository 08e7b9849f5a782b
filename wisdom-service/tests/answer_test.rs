mod common;

use common::{assert_cors, passages, post_json, router_with, state_with};
use std::sync::Arc;
use wisdom_service::services::prompts::CONTEXT_SEPARATOR;
use wisdom_service::services::providers::mock::{MockReply, MockTextProvider, MockVectorIndex};
use wisdom_service::startup::build_router;

#[tokio::test]
async fn missing_question_is_bad_request() {
    for body in [
        r#"{}"#,
        r#"{"question": ""}"#,
        r#"{"seed": "wrong field"}"#,
        r#"{"question": null}"#,
        r#"not json"#,
        r#"{"question": 7}"#,
    ] {
        let router = router_with(
            MockVectorIndex::new(passages(&["a"])),
            MockTextProvider::replying("unused"),
        );

        let response = post_json(router, "/api", body).await;

        assert_eq!(response.status, 400, "body {body}");
        assert_eq!(response.json()["error"], "Question is required.");
        assert_cors(&response.headers);
    }
}

#[tokio::test]
async fn answer_alias_rejects_bad_bodies_the_same_way() {
    for body in [r#"not json"#, r#"{"question": null}"#] {
        let router = router_with(
            MockVectorIndex::new(passages(&["a"])),
            MockTextProvider::replying("unused"),
        );

        let response = post_json(router, "/api/answer", body).await;

        assert_eq!(response.status, 400, "body {body}");
        assert_eq!(response.json()["error"], "Question is required.");
    }
}

#[tokio::test]
async fn answers_from_generated_text() {
    let router = router_with(
        MockVectorIndex::new(passages(&["Be fearful when others are greedy."])),
        MockTextProvider::replying("\u{201C}Be fearful when others are greedy.\u{201D}"),
    );

    let response = post_json(router, "/api", r#"{"question": "When should I buy?"}"#).await;

    assert_eq!(response.status, 200);
    assert_cors(&response.headers);
    assert_eq!(
        response.json()["answer"],
        "\u{201C}Be fearful when others are greedy.\u{201D}"
    );
}

#[tokio::test]
async fn context_contains_top_k_passages_in_search_order() {
    let texts = ["First.", "Second.", "Third.", "Fourth.", "Fifth.", "Sixth."];
    let index = Arc::new(MockVectorIndex::new(passages(&texts)));
    let generator = Arc::new(MockTextProvider::replying("ok"));
    let router = build_router(state_with(index.clone(), generator.clone()));

    let response = post_json(router, "/api/answer", r#"{"question": "Order?"}"#).await;
    assert_eq!(response.status, 200);

    // settings() in common uses K = 4
    assert_eq!(index.requests()[0].top_k, 4);
    let expected_context = texts[..4].join(CONTEXT_SEPARATOR);
    let prompt = &generator.prompts()[0];
    assert!(prompt.contains(&format!("==CONTEXT==\n{}\n\n==USER QUESTION==", expected_context)));
    assert!(!prompt.contains("Fifth."));
}

#[tokio::test]
async fn generation_failure_is_internal_error() {
    let router = router_with(
        MockVectorIndex::new(passages(&["a"])),
        MockTextProvider::new(MockReply::Fail),
    );

    let response = post_json(router, "/api", r#"{"question": "Why?"}"#).await;

    assert_eq!(response.status, 500);
    assert_eq!(response.json()["error"], "An internal error occurred.");
    assert_cors(&response.headers);
}
