//! Paper and verification handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use paperflow_common::{
    auth::UserIdentity,
    db::models::{Paper, PaperStatus, VerificationEntry},
    db::PaperPage,
    errors::{AppError, Result},
    workflow::{PaperInput, ReviewDecision},
};

/// Request to create or update a paper
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaperRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(rename = "abstract")]
    #[validate(length(min = 1, max = 50000))]
    pub abstract_text: String,

    #[validate(length(min = 1))]
    pub pdf_url: String,

    #[serde(default)]
    pub pdf_filename: String,

    #[serde(default)]
    pub link: Option<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub doi: Option<String>,
}

impl From<PaperRequest> for PaperInput {
    fn from(request: PaperRequest) -> Self {
        PaperInput {
            title: request.title,
            abstract_text: request.abstract_text,
            pdf_url: request.pdf_url,
            pdf_filename: request.pdf_filename,
            link: request.link,
            keywords: request.keywords,
            authors: request.authors,
            doi: request.doi,
        }
    }
}

/// Reviewer decision body for approve/reject
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(default)]
    pub comments: Option<String>,

    #[serde(default)]
    pub verify_link: bool,
}

/// Author snapshot in API responses
#[derive(Serialize)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Full paper representation in API responses
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperResponse {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub author: AuthorResponse,
    pub status: String,
    pub pdf_url: String,
    pub pdf_filename: String,
    pub link: Option<String>,
    pub link_verified: bool,
    pub keywords: Vec<String>,
    pub authors: Vec<String>,
    pub doi: Option<String>,
    pub verification_history: Vec<VerificationEntry>,
    pub created_at: String,
    pub updated_at: String,
    pub published_at: Option<String>,
}

impl From<Paper> for PaperResponse {
    fn from(paper: Paper) -> Self {
        PaperResponse {
            id: paper.id,
            title: paper.title,
            abstract_text: paper.abstract_text,
            author: AuthorResponse {
                id: paper.author_id,
                name: paper.author_name,
                email: paper.author_email,
            },
            status: paper.status,
            pdf_url: paper.pdf_url,
            pdf_filename: paper.pdf_filename,
            link: paper.link,
            link_verified: paper.link_verified,
            keywords: paper.keywords.0,
            authors: paper.authors.0,
            doi: paper.doi,
            verification_history: paper.verification_history.0,
            created_at: paper.created_at.to_rfc3339(),
            updated_at: paper.updated_at.to_rfc3339(),
            published_at: paper.published_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

/// Pagination block mirrored on every listing response
#[derive(Serialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

#[derive(Serialize)]
pub struct PaperListResponse {
    pub papers: Vec<PaperResponse>,
    pub pagination: Pagination,
}

impl From<PaperPage> for PaperListResponse {
    fn from(page: PaperPage) -> Self {
        let pagination = Pagination {
            total: page.total,
            page: page.page,
            limit: page.page_size,
            pages: page.pages(),
        };
        PaperListResponse {
            papers: page.papers.into_iter().map(Into::into).collect(),
            pagination,
        }
    }
}

/// Listing query parameters
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
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

/// Create a new research paper in DRAFT
pub async fn create_paper(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<PaperRequest>,
) -> Result<(StatusCode, Json<PaperResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let paper = state
        .service
        .create_paper(&identity, request.into())
        .await?;

    Ok((StatusCode::CREATED, Json(paper.into())))
}

/// Get a paper by ID (public)
pub async fn get_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<PaperResponse>> {
    let paper = state.service.get_paper(paper_id).await?;
    Ok(Json(paper.into()))
}

/// List papers filtered by status and/or author
pub async fn list_papers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaperListResponse>> {
    let status = params
        .status
        .as_deref()
        .map(|raw| {
            PaperStatus::parse(raw)
                .ok_or_else(|| AppError::validation(format!("Unknown status filter: {}", raw)))
        })
        .transpose()?;

    let page = state
        .service
        .list(status, params.author_id, params.page, params.limit)
        .await?;

    Ok(Json(page.into()))
}

/// Replace the editable fields of a DRAFT paper (author only)
pub async fn update_paper(
    State(state): State<AppState>,
    identity: UserIdentity,
    Path(paper_id): Path<Uuid>,
    Json(request): Json<PaperRequest>,
) -> Result<Json<PaperResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let paper = state
        .service
        .update_draft(paper_id, identity.id, request.into())
        .await?;

    Ok(Json(paper.into()))
}

/// Delete a paper and its stored PDF (Super-Admin only)
pub async fn delete_paper(
    State(state): State<AppState>,
    identity: UserIdentity,
    Path(paper_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.service.delete_paper(paper_id, &identity).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit a DRAFT paper for verification (author only)
pub async fn submit_paper(
    State(state): State<AppState>,
    identity: UserIdentity,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<PaperResponse>> {
    let paper = state.service.submit(paper_id, &identity).await?;
    Ok(Json(paper.into()))
}

/// Approve the pending stage matching the caller's role
pub async fn approve_paper(
    State(state): State<AppState>,
    identity: UserIdentity,
    Path(paper_id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<PaperResponse>> {
    let decision = ReviewDecision {
        comments: request.comments,
        verify_link: request.verify_link,
    };

    let paper = state.service.approve(paper_id, &identity, decision).await?;
    Ok(Json(paper.into()))
}

/// Reject the pending stage matching the caller's role (feedback required)
pub async fn reject_paper(
    State(state): State<AppState>,
    identity: UserIdentity,
    Path(paper_id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<PaperResponse>> {
    let paper = state
        .service
        .reject(paper_id, &identity, request.comments)
        .await?;
    Ok(Json(paper.into()))
}
