//! Paper store seam
//!
//! The workflow engine talks to the document store through this trait so the
//! store client is an explicitly constructed, injected object. Two
//! implementations exist: [`crate::db::Repository`] (Postgres via SeaORM) and
//! [`crate::db::MemoryStore`] (tests and local development).

use crate::db::models::{Paper, PaperStatus};
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sort order for listing queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaperOrder {
    /// `published_at` DESC (nulls last), then `updated_at` DESC - dashboards
    #[default]
    PublishedThenUpdated,
    /// `updated_at` DESC - search results
    UpdatedOnly,
}

/// Filterable, paginated paper query
#[derive(Debug, Clone, Default)]
pub struct PaperQuery {
    /// Case-insensitive substring matched against title, abstract, keywords,
    /// author name, and co-author names (OR across fields)
    pub text: Option<String>,

    pub status: Option<PaperStatus>,

    pub author_id: Option<Uuid>,

    /// 1-based page number
    pub page: u64,

    pub page_size: u64,

    pub order: PaperOrder,
}

/// One page of query results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperPage {
    pub papers: Vec<Paper>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl PaperPage {
    /// Total number of pages
    pub fn pages(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            self.total.div_ceil(self.page_size)
        }
    }
}

/// Document-store operations required by the workflow engine
///
/// `update_if_status` is the conditional write backing every transition:
/// the record is replaced only if its stored status still equals `expected`.
/// Exactly one of two racing transitions can succeed.
#[async_trait]
pub trait PaperStore: Send + Sync {
    /// Insert a freshly created paper
    async fn insert(&self, paper: Paper) -> Result<Paper>;

    /// Find a paper by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Paper>>;

    /// Compare-and-swap write: persist `paper` only if the stored status for
    /// `paper.id` still equals `expected`. Returns false on a CAS miss
    /// (including a concurrently deleted record).
    async fn update_if_status(&self, paper: &Paper, expected: PaperStatus) -> Result<bool>;

    /// Delete a paper record. Returns false if it did not exist.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;

    /// Run a filtered, paginated query
    async fn query(&self, query: &PaperQuery) -> Result<PaperPage>;
}
