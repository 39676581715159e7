//! RecipeGuard Common Library
//!
//! Shared code for the RecipeGuard services including:
//! - Database models and repository patterns
//! - Edit reconciliation core (ingredients, instructions)
//! - Image store abstraction
//! - Recommendation model clients
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod detail;
pub mod errors;
pub mod metrics;
pub mod recommend;
pub mod reconcile;
pub mod storage;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};
pub use storage::ImageStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
