// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the classification endpoint

mod common;

use axum::http::StatusCode;
use common::{COMPLETIONS_PATH, TestApp, image_data_url};
use serde_json::{Value, json};
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{body_string_contains, method, path},
};

#[tokio::test]
async fn confident_answer_is_returned_normalized() {
    let app = TestApp::spawn().await;
    app.backend_answers(&json!({
        "category": "Recycle",
        "confidence": 0.92,
        "itemGuess": "Aluminum can",
        "explanation": "Clean aluminum cans are accepted in curbside recycling.",
        "prepSteps": ["Rinse", 7, "Leave the tab on"],
        "localNote": "Portland accepts cans curbside."
    }))
    .await;

    let response = app
        .post_json(
            "/api/classify",
            &json!({"image": image_data_url(), "region": "Portland, OR"}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body.get("error").is_none());

    let data = &body["data"];
    assert_eq!(data["category"], "Recycle");
    assert_eq!(data["confidence"], 0.92);
    assert_eq!(data["itemGuess"], "Aluminum can");
    assert_eq!(data["prepSteps"], json!(["Rinse", "Leave the tab on"]));
    assert_eq!(data["localNote"], "Portland accepts cans curbside.");
}

#[tokio::test]
async fn region_reaches_the_prompt() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(body_string_contains("Bergen, Norway"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::completion(
            &json!({"category": "Compost", "confidence": 0.8}).to_string(),
        )))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app
        .post_json(
            "/api/classify",
            &json!({"image": image_data_url(), "region": "  Bergen, Norway  "}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn low_confidence_becomes_special() {
    let app = TestApp::spawn().await;
    app.backend_answers(&json!({
        "category": "Recycle",
        "confidence": 0.3,
        "itemGuess": "Plastic film",
        "explanation": "Probably recyclable."
    }))
    .await;

    let response = app
        .post_json("/api/classify", &json!({"image": image_data_url()}))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["category"], "Special");
    assert_eq!(body["data"]["confidence"], 0.3);
    assert!(
        body["data"]["explanation"]
            .as_str()
            .unwrap()
            .starts_with("Not sure about this item.")
    );
}

#[tokio::test]
async fn garbage_backend_answer_is_safe() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::completion("I think it's a can")),
        )
        .mount(&app.backend)
        .await;

    let response = app
        .post_json("/api/classify", &json!({"image": image_data_url()}))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["category"], "Special");
    assert_eq!(body["data"]["itemGuess"], "Unknown item");
}

#[tokio::test]
async fn missing_image_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app.post_json("/api/classify", &json!({})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No image provided");
}

#[tokio::test]
async fn tiny_image_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json("/api/classify", &json!({"image": "data:image/png;base64,AAAA"}))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Image appears to be invalid or too small");
}

#[tokio::test]
async fn backend_failure_is_not_leaked() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided: test-key", "type": "invalid_request_error"}
        })))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app
        .post_json("/api/classify", &json!({"image": image_data_url()}))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = response.text().await.unwrap();
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Failed to classify image. Please try again.");
    assert!(!text.contains("API key"));
}

#[tokio::test]
async fn requests_over_the_limit_are_throttled() {
    let app = TestApp::spawn_with_limit(3).await;
    app.backend_answers(&json!({"category": "Landfill", "confidence": 0.9}))
        .await;
    let body = json!({"image": image_data_url()});

    for _ in 0..3 {
        let response = app.post_json("/api/classify", &body).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.post_json("/api/classify", &body).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 60);
    let error: Value = response.json().await.unwrap();
    assert_eq!(
        error["error"],
        "Too many requests. Please wait a minute before trying again."
    );
}

#[tokio::test]
async fn forwarded_clients_are_limited_separately() {
    let app = TestApp::spawn_with_limit(1).await;
    app.backend_answers(&json!({"category": "Landfill", "confidence": 0.9}))
        .await;
    let body = json!({"image": image_data_url()});

    let send = |client_ip: &'static str| {
        app.client
            .post(app.url("/api/classify"))
            .header("x-forwarded-for", client_ip)
            .json(&body)
            .send()
    };

    assert_eq!(send("198.51.100.1").await.unwrap().status(), StatusCode::OK);
    assert_eq!(
        send("198.51.100.1").await.unwrap().status(),
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(send("198.51.100.2").await.unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn disabled_rate_limiting_admits_everything() {
    let app = TestApp::spawn_with(|config| {
        config.rate_limiting.enabled = false;
        config.rate_limiting.max_requests = api::config::RequestLimit::new(1).unwrap();
    })
    .await;
    app.backend_answers(&json!({"category": "Landfill", "confidence": 0.9}))
        .await;
    let body = json!({"image": image_data_url()});

    for _ in 0..3 {
        let response = app.post_json("/api/classify", &body).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn get_is_not_allowed() {
    let app = TestApp::spawn().await;

    let response = app.client.get(app.url("/api/classify")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn rejected_methods_do_not_use_quota() {
    let app = TestApp::spawn_with_limit(1).await;
    app.backend_answers(&json!({"category": "Landfill", "confidence": 0.9}))
        .await;

    for _ in 0..3 {
        let response = app.client.get(app.url("/api/classify")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    let body = json!({"image": image_data_url()});
    let response = app.post_json("/api/classify", &body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.post_json("/api/classify", &body).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn malformed_json_gets_envelope() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url("/api/classify"))
        .header("content-type", "application/json")
        .body("{\"image\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("JSON"));
}
