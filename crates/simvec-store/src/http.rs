use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use simvec_core::{SimvecError, SimvecResult};

use crate::embedding::EmbeddingProvider;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Embedding provider backed by an OpenAI-compatible `/v1/embeddings`
/// endpoint.
///
/// Works with OpenAI, Ollama, and any other server implementing the
/// same API shape. The whole batch goes out as one request, every
/// request carries a timeout, and all failures (transport, status,
/// malformed body, unexpected dimension) surface as
/// [`SimvecError::Provider`].
pub struct HttpEmbedder {
    base_url: String,
    model: String,
    dimension: usize,
    api_key: Option<String>,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Creates a client for `base_url` (the API root, without the
    /// `/v1/embeddings` path) producing vectors of `dimension`
    /// components, with a 30 second request timeout.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> SimvecResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| SimvecError::Provider(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimension,
            api_key: None,
            http,
        })
    }

    /// Sends `Authorization: Bearer <key>` with every request.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Replaces the default request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> SimvecResult<Self> {
        self.http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SimvecError::Provider(e.to_string()))?;
        Ok(self)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    async fn embed(&self, text: &str) -> SimvecResult<Vec<f32>> {
        let mut batch = self.embed_batch(&[text]).await?;
        batch
            .pop()
            .ok_or_else(|| SimvecError::Provider("server returned no embedding".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> SimvecResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(SimvecError::Provider(
                "cannot embed empty text".to_string(),
            ));
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let resp = request
            .send()
            .await
            .map_err(|e| SimvecError::Provider(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(SimvecError::Provider(format!(
                "embeddings API error {status}: {error_body}"
            )));
        }

        let parsed: EmbeddingsResponse = resp
            .json()
            .await
            .map_err(|e| SimvecError::Provider(e.to_string()))?;
        if parsed.data.len() != texts.len() {
            return Err(SimvecError::Provider(format!(
                "server returned {} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        // The API may answer out of order; the index field is binding.
        let mut items = parsed.data;
        items.sort_by_key(|item| item.index);

        let mut embeddings = Vec::with_capacity(items.len());
        for item in items {
            if item.embedding.len() != self.dimension {
                return Err(SimvecError::Provider(format!(
                    "model returned dimension {}, expected {}",
                    item.embedding.len(),
                    self.dimension
                )));
            }
            embeddings.push(item.embedding);
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embeddings_json(items: &[(usize, Vec<f32>)]) -> serde_json::Value {
        serde_json::json!({
            "object": "list",
            "data": items
                .iter()
                .map(|(index, embedding)| serde_json::json!({
                    "object": "embedding",
                    "index": index,
                    "embedding": embedding,
                }))
                .collect::<Vec<_>>(),
            "model": "test-model",
        })
    }

    #[tokio::test]
    async fn test_embed_hits_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "input": ["hello"],
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(embeddings_json(&[(0, vec![1.0, 0.0, 0.0, 0.0])])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(server.uri(), "test-model", 4).unwrap();
        let vector = embedder.embed("hello").await.unwrap();
        assert_eq!(vector, vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_batch_is_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(embeddings_json(&[
                (0, vec![1.0, 0.0]),
                (1, vec![0.0, 1.0]),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(server.uri(), "test-model", 2).unwrap();
        let batch = embedder.embed_batch(&["first", "second"]).await.unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_order_items_are_reordered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(embeddings_json(&[
                (1, vec![0.0, 1.0]),
                (0, vec![1.0, 0.0]),
            ])))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(server.uri(), "test-model", 2).unwrap();
        let batch = embedder.embed_batch(&["first", "second"]).await.unwrap();
        assert_eq!(batch[0], vec![1.0, 0.0]);
        assert_eq!(batch[1], vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_api_key_is_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("Authorization", "Bearer sk-secret"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(embeddings_json(&[(0, vec![0.5, 0.5])])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(server.uri(), "test-model", 2)
            .unwrap()
            .with_api_key("sk-secret");
        embedder.embed("hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_server_error_maps_to_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(server.uri(), "test-model", 2).unwrap();
        let err = embedder.embed("hello").await.unwrap_err();
        match err {
            SimvecError::Provider(message) => {
                assert!(message.contains("500"), "{message}");
                assert!(message.contains("quota exceeded"), "{message}");
            }
            other => panic!("expected Provider, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unexpected_dimension_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(embeddings_json(&[(0, vec![1.0, 0.0, 0.0])])),
            )
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(server.uri(), "test-model", 4).unwrap();
        assert!(matches!(
            embedder.embed("hello").await,
            Err(SimvecError::Provider(_))
        ));
    }

    #[tokio::test]
    async fn test_short_reply_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(embeddings_json(&[(0, vec![1.0, 0.0])])),
            )
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(server.uri(), "test-model", 2).unwrap();
        assert!(embedder.embed_batch(&["first", "second"]).await.is_err());
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(embeddings_json(&[(0, vec![1.0, 0.0])]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(server.uri(), "test-model", 2)
            .unwrap()
            .with_timeout(Duration::from_millis(50))
            .unwrap();
        assert!(matches!(
            embedder.embed("hello").await,
            Err(SimvecError::Provider(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_text_fails_before_any_request() {
        let server = MockServer::start().await;
        // No mock mounted: a request would 404 and fail differently.
        let embedder = HttpEmbedder::new(server.uri(), "test-model", 2).unwrap();
        let err = embedder.embed("   ").await.unwrap_err();
        assert!(matches!(err, SimvecError::Provider(_)));
    }
}
