//! OpenAI-compatible embedding adapter (`POST {base}/embeddings`).

use super::{EmbeddingClient, EmbeddingClientError, http_client};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Embedding client for any service speaking the OpenAI embeddings protocol.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl OpenAiClient {
    /// Construct a client for `base_url` (for example `https://api.openai.com/v1`).
    pub fn new(base_url: &str, api_key: String, model: &str) -> Self {
        Self {
            http: http_client("mindgap/embed"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::Unavailable(format!(
                    "failed to reach embeddings API at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, model = %self.model, "Embeddings API request failed");
            return Err(EmbeddingClientError::Unavailable(format!(
                "embeddings API responded with {status}: {body}"
            )));
        }

        let payload: EmbeddingsResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::Unavailable(format!("malformed embeddings response: {error}"))
        })?;

        // The protocol allows out-of-order items; `index` restores input order.
        let mut items = payload.data;
        items.sort_by_key(|item| item.index.unwrap_or(usize::MAX));
        Ok(items.into_iter().map(|item| item.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn sends_bearer_token_and_restores_input_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/embeddings")
                    .header("authorization", "Bearer sk-test")
                    .json_body(json!({
                        "model": "text-embedding-3-small",
                        "input": ["alpha", "beta"]
                    }));
                then.status(200).json_body(json!({
                    "object": "list",
                    "data": [
                        { "object": "embedding", "index": 1, "embedding": [0.0, 1.0] },
                        { "object": "embedding", "index": 0, "embedding": [1.0, 0.0] }
                    ]
                }));
            })
            .await;

        let client = OpenAiClient::new(
            &format!("{}/v1", server.base_url()),
            "sk-test".into(),
            "text-embedding-3-small",
        );
        let vectors = client
            .generate_embeddings(vec!["alpha".into(), "beta".into()])
            .await
            .expect("embeddings");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn unauthorized_response_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(401).body("invalid api key");
            })
            .await;

        let client = OpenAiClient::new(&server.base_url(), "bad".into(), "m");
        let error = client
            .generate_embeddings(vec!["x".into()])
            .await
            .unwrap_err();
        assert!(matches!(error, EmbeddingClientError::Unavailable(message) if message.contains("401")));
    }
}
