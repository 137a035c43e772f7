// Library exports for Agora
// This allows integration tests and external code to use Agora modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod graphql;
pub mod routes;
pub mod state;
