//! Ollama embedding adapter (`POST /api/embed`).

use super::{EmbeddingClient, EmbeddingClientError, http_client};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Embedding client backed by a local Ollama runtime.
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaClient {
    /// Construct a client targeting `base_url` with the given embedding model.
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http: http_client("mindgap/embed"),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url)
    }
}

#[async_trait]
impl EmbeddingClient for OllamaClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let input_count = texts.len();
        let response = self
            .http
            .post(self.endpoint())
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::Unavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, model = %self.model, "Ollama embedding request failed");
            return Err(EmbeddingClientError::Unavailable(format!(
                "Ollama responded with {status}: {body}"
            )));
        }

        let payload: EmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::Unavailable(format!("malformed Ollama response: {error}"))
        })?;
        tracing::debug!(
            model = %self.model,
            inputs = input_count,
            vectors = payload.embeddings.len(),
            "Ollama embeddings received"
        );
        Ok(payload.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn posts_batch_and_returns_vectors_in_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .json_body(json!({ "model": "all-minilm", "input": ["first", "second"] }));
                then.status(200)
                    .json_body(json!({ "embeddings": [[0.1, 0.2], [0.3, 0.4]] }));
            })
            .await;

        let client = OllamaClient::new(&format!("{}/", server.base_url()), "all-minilm");
        let vectors = client
            .generate_embeddings(vec!["first".into(), "second".into()])
            .await
            .expect("embeddings");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn server_error_is_reported_as_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(500).body("model not loaded");
            })
            .await;

        let client = OllamaClient::new(&server.base_url(), "all-minilm");
        let error = client
            .generate_embeddings(vec!["hello".into()])
            .await
            .unwrap_err();
        match error {
            EmbeddingClientError::Unavailable(message) => {
                assert!(message.contains("model not loaded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_reported_as_unavailable() {
        let client = OllamaClient::new("http://127.0.0.1:9", "all-minilm");
        let error = client
            .generate_embeddings(vec!["hello".into()])
            .await
            .unwrap_err();
        assert!(matches!(error, EmbeddingClientError::Unavailable(_)));
    }
}
