// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use api::{Server, ServerConfig, ShutdownConfig, config::RequestLimit};
use feedback_store::{FeedbackSink, InMemoryFeedbackStore};
use serde_json::{Value, json};
use shared_types::FeedbackRecord;
use tokio_util::sync::CancellationToken;
use waste_classifier::{OpenAiVisionClient, ResultNormalizer, WasteClassifier};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Path of the chat completions endpoint on the mock backend
pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// A running server backed by a mock OpenAI API and in-memory feedback
pub struct TestApp {
    pub addr: SocketAddr,
    pub backend: MockServer,
    pub feedback: Arc<FeedbackSink>,
    pub client: reqwest::Client,
    shutdown: CancellationToken,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with_limit(max_requests: u32) -> Self {
        Self::spawn_with(|config| {
            config.rate_limiting.max_requests = RequestLimit::new(max_requests).unwrap();
        })
        .await
    }

    pub async fn spawn_with(customize: impl FnOnce(&mut ServerConfig)) -> Self {
        let backend = MockServer::start().await;

        let mut config = ServerConfig::for_testing();
        config.classifier.base_url = Some(format!("{}/v1/", backend.uri()).parse().unwrap());
        customize(&mut config);

        let openai = OpenAiVisionClient::new(&config.classifier.openai_config()).unwrap();
        let normalizer = ResultNormalizer::new(config.classifier.normalization_policy().unwrap());
        let classifier = WasteClassifier::new(openai, normalizer);
        let feedback = Arc::new(FeedbackSink::from(InMemoryFeedbackStore::new()));

        let (addr, shutdown) = Server::with_dependencies(
            config,
            ShutdownConfig::default(),
            classifier,
            Arc::clone(&feedback),
        )
        .expect("Failed to create server")
        .run_for_testing()
        .await
        .expect("Failed to start test server");

        Self {
            addr,
            backend,
            feedback,
            client: reqwest::Client::new(),
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Make the backend answer every completion with `content`
    pub async fn backend_answers(&self, content: &Value) {
        Mock::given(method("POST"))
            .and(path(COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(&content.to_string())))
            .mount(&self.backend)
            .await;
    }

    pub async fn feedback_records(&self) -> Vec<FeedbackRecord> {
        match self.feedback.as_ref() {
            FeedbackSink::InMemory(store) => store.records().await,
            FeedbackSink::JsonLines(store) => store.read_all().await.unwrap(),
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Chat completion body whose message content is `content`
pub fn completion(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-5",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

/// A data URL that passes the size check
pub fn image_data_url() -> String {
    format!("data:image/jpeg;base64,{}", "A".repeat(256))
}
