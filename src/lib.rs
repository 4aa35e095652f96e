// Library entry point for ReelPay.
// Exposes modules for integration tests while main.rs stays the binary entry point.

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod services;

pub use error::ApiError;
pub use models::AppState;
