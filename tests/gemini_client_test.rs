// ABOUTME: Integration tests for the Gemini client and the vision recognizer
// ABOUTME: Uses a mock HTTP server to exercise success, rate-limit, and parse paths
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

mod common;

use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use nutriscan::llm::GeminiClient;
use nutriscan::models::SourceMethod;
use nutriscan::recognizers::{AttemptOutcome, Recognizer, ScanInput, VisionModelIdentify};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-2.0-flash-001";

fn client_for(server: &MockServer) -> GeminiClient {
    GeminiClient::new("test-key", MODEL).with_base_url(server.uri())
}

fn model_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "text": text }]
            }
        }]
    })
}

fn fixture_image() -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, image::Rgba([30, 180, 60, 255])))
}

#[tokio::test]
async fn generate_text_returns_first_candidate_text() {
    common::init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/models/{MODEL}:generateContent")))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply("hello there")))
        .mount(&server)
        .await;

    let text = client_for(&server)
        .generate_text("say hello", Some(50))
        .await
        .unwrap();
    assert_eq!(text, "hello there");
}

#[tokio::test]
async fn rate_limit_surfaces_the_quota_retry_hint() {
    common::init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/models/{MODEL}:generateContent")))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "Resource has been exhausted. Please retry in 6.406453963s.",
                "status": "RESOURCE_EXHAUSTED"
            }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generate_text("anything", None)
        .await
        .unwrap_err();
    assert_eq!(err.code, nutriscan::ErrorCode::ExternalRateLimited);
    assert!(err.message.contains("7 seconds"));
}

#[tokio::test]
async fn empty_candidates_are_an_error_not_empty_text() {
    common::init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/models/{MODEL}:generateContent")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generate_text("anything", None)
        .await
        .unwrap_err();
    assert_eq!(err.code, nutriscan::ErrorCode::ExternalServiceError);
}

#[tokio::test]
async fn vision_recognizer_accepts_fenced_model_json() {
    common::init_test_logging();
    let server = MockServer::start().await;

    let fenced = "```json\n{\"product_name\": \"Granny Smith Apple\", \
                  \"brand\": \"null\", \"category\": \"fruit\", \
                  \"confidence\": 0.88}\n```";
    Mock::given(method("POST"))
        .and(path(format!("/models/{MODEL}:generateContent")))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply(fenced)))
        .mount(&server)
        .await;

    let recognizer = VisionModelIdentify::new(Some(Arc::new(client_for(&server))));
    let image = fixture_image();
    let outcome = recognizer
        .attempt(&ScanInput::Image {
            image: &image,
            hint: None,
        })
        .await;

    let AttemptOutcome::Product(product) = outcome else {
        panic!("expected a product outcome");
    };
    assert_eq!(product.name, "Granny Smith Apple");
    assert_eq!(product.source_method, SourceMethod::VisionModel);
    assert!((product.confidence - 0.88).abs() < f64::EPSILON);
    // A literal "null" brand string is not a brand.
    assert!(product.brand.is_none());
    assert_eq!(product.category.as_deref(), Some("fruit"));
}

#[tokio::test]
async fn vision_recognizer_flags_unparsable_output_as_malformed() {
    common::init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/models/{MODEL}:generateContent")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(model_reply("I think this is an apple, probably")),
        )
        .mount(&server)
        .await;

    let recognizer = VisionModelIdentify::new(Some(Arc::new(client_for(&server))));
    let image = fixture_image();
    let outcome = recognizer
        .attempt(&ScanInput::Image {
            image: &image,
            hint: None,
        })
        .await;

    let AttemptOutcome::Malformed { raw, .. } = outcome else {
        panic!("expected a malformed outcome");
    };
    assert!(raw.contains("probably"));
}

#[tokio::test]
async fn vision_recognizer_without_key_is_unavailable() {
    common::init_test_logging();
    let recognizer = VisionModelIdentify::new(None);
    let image = fixture_image();
    let outcome = recognizer
        .attempt(&ScanInput::Image {
            image: &image,
            hint: None,
        })
        .await;
    assert!(matches!(outcome, AttemptOutcome::Unavailable { .. }));
}

#[tokio::test]
async fn detailed_scan_repairs_truncated_model_json() {
    common::init_test_logging();
    let server = MockServer::start().await;

    // Closing braces are missing, as when the model ran out of tokens.
    let truncated = "{\"total_products\": 1, \"analysis_confidence\": 0.8, \
                     \"products\": [{\"name\": \"banana\", \"category\": \"fruit\", \
                     \"estimated_weight_grams\": 118, \"confidence\": 0.9";
    Mock::given(method("POST"))
        .and(path(format!("/models/{MODEL}:generateContent")))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply(truncated)))
        .mount(&server)
        .await;

    let recognizer = VisionModelIdentify::new(Some(Arc::new(client_for(&server))));
    let scan = recognizer
        .analyze_products_with_weights(&fixture_image())
        .await
        .unwrap();

    assert!(scan.json_repaired);
    assert_eq!(scan.total_products, 1);
    assert_eq!(scan.products.len(), 1);
    assert_eq!(scan.products[0].name, "banana");
    assert!(scan.products[0].is_food);
}
