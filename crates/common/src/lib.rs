//! Paperflow Common Library
//!
//! Shared code for the Paperflow services:
//! - Paper entity and the verification workflow engine
//! - Database models, repository, and the paper-store seam
//! - Blob store client
//! - Error types and handling
//! - Configuration management
//! - Identity extraction and the role model
//! - Metrics

pub mod auth;
pub mod blob;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod workflow;

// Re-export commonly used types
pub use auth::{Role, UserIdentity};
pub use config::AppConfig;
pub use db::{models::PaperStatus, MemoryStore, PaperStore, Repository};
pub use errors::{AppError, Result};
pub use workflow::VerificationService;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
