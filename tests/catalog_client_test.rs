// ABOUTME: Integration tests for the remote catalog client and lookup recognizer
// ABOUTME: Exercises barcode lookup, nutriment mapping, quality scoring, and search
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutriscan Contributors

mod common;

use nutriscan::config::ServerConfig;
use nutriscan::models::SourceMethod;
use nutriscan::recognizers::catalog::{CatalogClient, CatalogLookup};
use nutriscan::recognizers::{AttemptOutcome, Recognizer, RemoteCatalogLookup, ScanInput};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> CatalogClient {
    CatalogClient::new(&ServerConfig::default()).with_base_url(server.uri())
}

#[tokio::test]
async fn barcode_lookup_maps_nutriments_and_scores_quality() {
    common::init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/product/3017620422003.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 1,
            "product": {
                "product_name": "Nutella",
                "brands": "Ferrero",
                "categories": "Spreads, Sweet spreads, Hazelnut spreads",
                "ingredients_text": "Sugar, palm oil, hazelnuts",
                "image_url": "https://images.example/nutella.jpg",
                "nutriscore_grade": "e",
                "allergens": "en:milk, en:nuts",
                "additives_tags": ["en:e322", "en:e476-polyglycerol-polyricinoleate"],
                "nutriments": {
                    "energy-kcal_100g": 539,
                    "proteins_100g": "6.3",
                    "carbohydrates_100g": 57.5,
                    "fat_100g": 30.9,
                    "sugars_100g": 56.3
                }
            }
        })))
        .mount(&server)
        .await;

    let lookup = client_for(&server)
        .product_by_barcode("3017620422003")
        .await
        .unwrap();
    let CatalogLookup::Found(product) = lookup else {
        panic!("expected a catalog hit");
    };

    assert_eq!(product.name, "Nutella");
    assert_eq!(product.brand.as_deref(), Some("Ferrero"));
    assert_eq!(product.categories.len(), 3);
    assert_eq!(product.nutriscore_grade.as_deref(), Some("E"));
    assert_eq!(product.allergens, vec!["en:milk", "en:nuts"]);
    assert_eq!(
        product.additives,
        vec!["E322", "E476 Polyglycerol Polyricinoleate"]
    );

    // String-typed nutriments parse; unmapped keys are dropped; absent
    // fields are never fabricated.
    assert_eq!(product.nutrition_per_100g["calories"], json!(539.0));
    assert_eq!(product.nutrition_per_100g["protein_g"], json!(6.3));
    assert_eq!(product.nutrition_per_100g["sugar_g"], json!(56.3));
    assert!(!product.nutrition_per_100g.contains_key("fiber_g"));

    // Every weighted field is present: full marks.
    assert_eq!(product.data_quality.score, 10);
    assert_eq!(product.data_quality.level, "excellent");
    assert!(product.data_quality.missing_fields.is_empty());
}

#[tokio::test]
async fn unknown_barcode_is_not_found_rather_than_error() {
    common::init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/product/40084015.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 0,
            "status_verbose": "product not found"
        })))
        .mount(&server)
        .await;

    let lookup = client_for(&server)
        .product_by_barcode("40084015")
        .await
        .unwrap();
    assert!(matches!(lookup, CatalogLookup::NotFound));
}

#[tokio::test]
async fn server_error_is_a_transport_error() {
    common::init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/product/40084015.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .product_by_barcode("40084015")
        .await
        .unwrap_err();
    assert_eq!(err.code, nutriscan::ErrorCode::ExternalServiceError);
}

#[tokio::test]
async fn nameless_product_gets_a_barcode_placeholder_name() {
    common::init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/product/12345678.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 1,
            "product": { "nutriments": {} }
        })))
        .mount(&server)
        .await;

    let lookup = client_for(&server)
        .product_by_barcode("12345678")
        .await
        .unwrap();
    let CatalogLookup::Found(product) = lookup else {
        panic!("expected a catalog hit");
    };
    assert_eq!(product.name, "Product 12345678");
    assert_eq!(product.data_quality.level, "poor");
    assert!(product
        .data_quality
        .missing_fields
        .contains(&"product_name".to_owned()));
}

#[tokio::test]
async fn search_clamps_paging_and_summarizes_hits() {
    common::init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("search_terms", "yogurt"))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "products": [
                {
                    "code": "11111111",
                    "product_name": "Greek Yogurt",
                    "brands": "Fage",
                    "nutriscore_grade": "a"
                },
                {
                    "product_name": "hit without a code is dropped"
                }
            ]
        })))
        .mount(&server)
        .await;

    // Page 0 clamps to 1, oversized page_size clamps to 50.
    let page = client_for(&server)
        .search_products("yogurt", 0, Some(500))
        .await
        .unwrap();

    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 50);
    assert_eq!(page.total, 2);
    assert_eq!(page.products.len(), 1);
    assert_eq!(page.products[0].barcode, "11111111");
    assert_eq!(page.products[0].nutriscore_grade.as_deref(), Some("A"));
}

#[tokio::test]
async fn short_search_query_is_rejected() {
    common::init_test_logging();
    let server = MockServer::start().await;
    let err = client_for(&server)
        .search_products("a", 1, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, nutriscan::ErrorCode::InvalidInput);
}

#[tokio::test]
async fn lookup_recognizer_normalizes_a_catalog_hit() {
    common::init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/product/737628064502.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 1,
            "product": {
                "product_name": "Rice Noodles",
                "brands": "Thai Kitchen",
                "categories": "Noodles, Rice noodles",
                "allergens": "en:gluten",
                "additives_tags": ["en:e415"]
            }
        })))
        .mount(&server)
        .await;

    let recognizer = RemoteCatalogLookup::new(client_for(&server));
    let outcome = recognizer
        .attempt(&ScanInput::Barcode("737628064502"))
        .await;

    let AttemptOutcome::Product(product) = outcome else {
        panic!("expected a product outcome");
    };
    assert_eq!(product.name, "Rice Noodles");
    assert_eq!(product.source_method, SourceMethod::RemoteCatalog);
    assert!((product.confidence - 0.95).abs() < f64::EPSILON);
    assert_eq!(product.category.as_deref(), Some("noodles"));
    assert_eq!(
        product.raw_attributes["barcode"],
        json!("737628064502")
    );
    assert_eq!(product.raw_attributes["allergens"], json!(["en:gluten"]));
    assert_eq!(product.raw_attributes["additives"], json!(["E415"]));
}

#[tokio::test]
async fn lookup_recognizer_misses_on_unknown_barcode() {
    common::init_test_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/product/99999999.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": 0 })))
        .mount(&server)
        .await;

    let recognizer = RemoteCatalogLookup::new(client_for(&server));
    let outcome = recognizer.attempt(&ScanInput::Barcode("99999999")).await;
    assert!(matches!(outcome, AttemptOutcome::Miss { .. }));
}
