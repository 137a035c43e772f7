pub mod graphql;

/// Liveness probe.
pub async fn index() -> &'static str {
    "ok"
}
