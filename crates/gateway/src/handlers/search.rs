//! Search handlers
//!
//! Free-text search across published and in-flight papers. Unauthenticated
//! callers use `status=public`, which the engine rewrites to PUBLISHED.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::papers::{Pagination, PaperResponse};
use crate::AppState;
use paperflow_common::{errors::Result, workflow::SearchParams};

/// Search query parameters
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Free-text query, matched case-insensitively across title, abstract,
    /// keywords, author name, and co-author names
    pub q: Option<String>,

    pub status: Option<String>,

    pub author_id: Option<Uuid>,

    #[serde(default = "default_page")]
    pub page: u64,

    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<PaperResponse>,
    pub pagination: Pagination,
}

/// Run a paper search
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let page = state
        .service
        .search(SearchParams {
            text: query.q,
            status: query.status,
            author_id: query.author_id,
            page: query.page,
            page_size: query.limit,
        })
        .await?;

    let pagination = Pagination {
        total: page.total,
        page: page.page,
        limit: page.page_size,
        pages: page.pages(),
    };

    Ok(Json(SearchResponse {
        results: page.papers.into_iter().map(Into::into).collect(),
        pagination,
    }))
}
