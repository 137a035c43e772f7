use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::db::StoreError;

/// Errors surfaced at the HTTP layer. Almost everything rides inside the
/// GraphQL response instead; this only covers failures before a request
/// reaches the schema, like session lookup.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Store(e) => {
                tracing::error!("Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}
