use std::time::Duration;

use reqwest::Client as HttpClient;

use crate::{
    error::{AppError, AppResult},
    models::{PreferenceVector, RecommenderResponse},
};

/// External similarity-scoring service
///
/// Implementations must fail with [`AppError::RecommendationUnavailable`]
/// rather than return an empty ranking.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(&self, vector: &PreferenceVector) -> AppResult<RecommenderResponse>;
}

/// Recommender reached over HTTP: `POST {base_url}/recommend` with the
/// preference vector as the JSON body.
#[derive(Clone)]
pub struct HttpRecommender {
    http_client: HttpClient,
    endpoint: String,
}

impl HttpRecommender {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/recommend", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl Recommender for HttpRecommender {
    #[tracing::instrument(skip(self, vector), fields(endpoint = %self.endpoint))]
    async fn recommend(&self, vector: &PreferenceVector) -> AppResult<RecommenderResponse> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(vector)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, timeout = e.is_timeout(), "Recommender call failed");
                AppError::RecommendationUnavailable(format!("recommender unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "Recommender returned error status");
            return Err(AppError::RecommendationUnavailable(format!(
                "recommender returned {}",
                status
            )));
        }

        let body: RecommenderResponse = response.json().await.map_err(|e| {
            AppError::RecommendationUnavailable(format!("malformed recommender response: {}", e))
        })?;

        if body.recommended_properties.is_empty() {
            return Err(AppError::RecommendationUnavailable(
                "recommender returned no properties".to_string(),
            ));
        }

        tracing::debug!(
            count = body.recommended_properties.len(),
            max_type = ?body.max_type,
            "Recommender responded"
        );

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    /// Serves `router` on an ephemeral port and returns its base URL
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_endpoint_joins_path() {
        let recommender = HttpRecommender::new("http://recommend:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(recommender.endpoint(), "http://recommend:8000/recommend");
    }

    #[tokio::test]
    async fn test_recommend_forwards_vector_and_parses_response() {
        let router = Router::new().route(
            "/recommend",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["transportScore"], 0.8);
                Json(json!({
                    "recommended_properties": [{"propertyId": 42, "similarity": 0.9}],
                    "maxType": "transport"
                }))
            }),
        );
        let recommender = HttpRecommender::new(&serve(router).await, Duration::from_secs(2)).unwrap();

        let vector = PreferenceVector {
            transport_score: Some(0.8),
            ..Default::default()
        };
        let response = recommender.recommend(&vector).await.unwrap();

        assert_eq!(response.recommended_properties[0].property_id, 42);
        assert_eq!(response.max_type.as_deref(), Some("transport"));
    }

    #[tokio::test]
    async fn test_empty_ranking_is_unavailable() {
        let router = Router::new().route(
            "/recommend",
            post(|| async { Json(json!({ "recommended_properties": [] })) }),
        );
        let recommender = HttpRecommender::new(&serve(router).await, Duration::from_secs(2)).unwrap();

        let result = recommender.recommend(&PreferenceVector::default()).await;
        assert!(matches!(result, Err(AppError::RecommendationUnavailable(_))));
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let router = Router::new().route(
            "/recommend",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let recommender = HttpRecommender::new(&serve(router).await, Duration::from_secs(2)).unwrap();

        let err = recommender
            .recommend(&PreferenceVector::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "RECOMMENDATION_UNAVAILABLE");
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_slow_recommender_times_out() {
        let router = Router::new().route(
            "/recommend",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({ "recommended_properties": [] }))
            }),
        );
        let recommender =
            HttpRecommender::new(&serve(router).await, Duration::from_millis(100)).unwrap();

        let result = recommender.recommend(&PreferenceVector::default()).await;
        assert!(matches!(result, Err(AppError::RecommendationUnavailable(_))));
    }
}
