//! Managed Qdrant collection behind the [`VectorIndex`] interface.

use crate::config::RemoteIndexSettings;
use crate::index::{
    VectorIndex,
    payload::{build_payload, current_timestamp_rfc3339, point_id},
    types::{CountResponse, IndexEntry, IndexError, IndexMatch, QueryResponse, QueryResponseResult},
};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

/// Lightweight HTTP client for a single Qdrant collection.
pub struct QdrantIndex {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) collection: String,
}

impl QdrantIndex {
    /// Construct a client from remote index settings. No request is issued.
    pub fn new(settings: &RemoteIndexSettings) -> Result<Self, IndexError> {
        let client = Client::builder().user_agent("mindgap/0.1").build()?;
        let base_url = normalize_base_url(&settings.url).map_err(IndexError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            collection = %settings.collection,
            has_api_key = !settings.api_key.is_empty(),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: Some(settings.api_key.clone()),
            collection: settings.collection.clone(),
        })
    }

    /// Create the collection with cosine distance when it does not exist yet.
    pub async fn ensure_index(&self, dimension: usize) -> Result<(), IndexError> {
        if self.collection_exists().await? {
            tracing::debug!(collection = %self.collection, "Collection already present");
            return Ok(());
        }

        tracing::info!(
            collection = %self.collection,
            dimension,
            "Creating collection"
        );
        let body = json!({
            "vectors": {
                "size": dimension,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{}", self.collection))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = %self.collection, "Collection created");
        })
        .await
    }

    async fn collection_exists(&self) -> Result<bool, IndexError> {
        let response = self
            .request(Method::GET, &format!("collections/{}", self.collection))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = IndexError::UnexpectedStatus { status, body };
                tracing::error!(collection = %self.collection, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), IndexError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = IndexError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        if entries.is_empty() {
            return Ok(());
        }

        let now = current_timestamp_rfc3339();
        let points: Vec<Value> = entries
            .iter()
            .map(|entry| {
                json!({
                    "id": point_id(&entry.id),
                    "vector": entry.vector,
                    "payload": build_payload(entry, &now),
                })
            })
            .collect();

        let point_count = points.len();
        let response = self
            .request(
                Method::PUT,
                &format!("collections/{}/points", self.collection),
            )
            .query(&[("wait", true)])
            .json(&json!({ "points": points }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = %self.collection,
                points = point_count,
                "Points upserted"
            );
        })
        .await
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, IndexError> {
        if top_k == 0 {
            return Err(IndexError::InvalidTopK(top_k));
        }

        let body = json!({
            "query": vector,
            "limit": top_k,
            "with_payload": true,
        });

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/query", self.collection),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = IndexError::UnexpectedStatus { status, body };
            tracing::error!(collection = %self.collection, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };

        Ok(points
            .into_iter()
            .filter_map(|point| {
                let text = match point.payload?.remove("text") {
                    Some(Value::String(text)) => text,
                    _ => return None,
                };
                Some(IndexMatch {
                    id: stringify_point_id(point.id),
                    text,
                    score: point.score,
                })
            })
            .take(top_k)
            .collect())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/count", self.collection),
            )
            .json(&json!({ "exact": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::UnexpectedStatus { status, body });
        }

        let CountResponse { result } = response.json().await?;
        Ok(result.count)
    }

    fn backend_name(&self) -> &'static str {
        "qdrant"
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
