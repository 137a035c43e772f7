//! API-level error taxonomy. Every error a resolver raises carries a `code`
//! extension; storage faults are logged in full server-side and surfaced to
//! clients as an opaque INTERNAL error.

use async_graphql::{Error, ErrorExtensions};

use crate::auth::request_context::NotLoggedIn;
use crate::db::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadInput(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadInput(_) => "BAD_USER_INPUT",
        }
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        let code = err.code();
        Error::new(err.to_string()).extend_with(|_, e| e.set("code", code))
    }
}

impl From<NotLoggedIn> for Error {
    fn from(_: NotLoggedIn) -> Self {
        ApiError::Unauthenticated.into()
    }
}

/// Map a store error where `NotFound` is meaningful to the client; anything
/// else becomes opaque.
pub fn not_found_or_fault(what: &'static str) -> impl FnOnce(StoreError) -> Error {
    move |err| match err {
        StoreError::NotFound => ApiError::NotFound(what).into(),
        other => storage_fault(other),
    }
}

/// Log a storage fault and hide the detail from the client.
pub fn storage_fault(err: StoreError) -> Error {
    tracing::error!(error = %err, "storage fault");
    internal()
}

pub fn internal() -> Error {
    Error::new("internal server error").extend_with(|_, e| e.set("code", "INTERNAL"))
}
