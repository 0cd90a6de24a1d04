use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// The external recommender was unreachable, failed, or returned nothing.
    /// Retryable by the caller.
    #[error("Recommendation unavailable: {0}")]
    RecommendationUnavailable(String),

    #[error("Invalid cell bounds: {0}")]
    InvalidCellBounds(String),

    #[error("Popularity store unavailable: {0}")]
    PopularityStoreUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Cache(_) => "CACHE_ERROR",
            AppError::HttpClient(_) => "UPSTREAM_ERROR",
            AppError::RecommendationUnavailable(_) => "RECOMMENDATION_UNAVAILABLE",
            AppError::InvalidCellBounds(_) => "INVALID_CELL_BOUNDS",
            AppError::PopularityStoreUnavailable(_) => "POPULARITY_STORE_UNAVAILABLE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) | AppError::InvalidCellBounds(_) => StatusCode::BAD_REQUEST,
            AppError::RecommendationUnavailable(_) | AppError::PopularityStoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
