//! Verification workflow engine
//!
//! Moves a paper through role-gated verification stages until publication or
//! rejection, appending one audit entry per transition. Guard order is fixed:
//! authorization first, then the state guard, then a conditional write
//! against the store. The conditional write ("only if the stored status still
//! equals the expected from-state") makes each transition atomic: of two
//! racing callers exactly one succeeds and the other gets an
//! `InvalidState` error to surface back to the stale UI.

mod transitions;

pub use transitions::{rule_for, TransitionRule, WorkflowOp};

use crate::auth::{Role, UserIdentity};
use crate::blob::BlobStore;
use crate::db::models::{Paper, PaperStatus, VerificationEntry, VerificationHistory};
use crate::db::{PaperOrder, PaperPage, PaperQuery, PaperStore};
use crate::errors::{AppError, Result};
use metrics::counter;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Editable paper fields, as accepted by create and draft update
#[derive(Debug, Clone, Default)]
pub struct PaperInput {
    pub title: String,
    pub abstract_text: String,
    pub pdf_url: String,
    pub pdf_filename: String,
    pub link: Option<String>,
    pub keywords: Vec<String>,
    pub authors: Vec<String>,
    pub doi: Option<String>,
}

/// Reviewer input for an approve transition
#[derive(Debug, Clone, Default)]
pub struct ReviewDecision {
    pub comments: Option<String>,
    /// Request link verification (honored only for a DRO approval of a
    /// paper with a non-empty link)
    pub verify_link: bool,
}

/// Search parameters, as received from the API
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub text: Option<String>,
    /// Raw status filter; `"public"` is rewritten to PUBLISHED
    pub status: Option<String>,
    pub author_id: Option<Uuid>,
    pub page: u64,
    pub page_size: u64,
}

const DEFAULT_PAGE_SIZE: u64 = 20;

/// The workflow engine
///
/// Holds injected store clients; all state lives in the store.
pub struct VerificationService {
    store: Arc<dyn PaperStore>,
    blobs: Arc<dyn BlobStore>,
}

impl VerificationService {
    pub fn new(store: Arc<dyn PaperStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    // ========================================================================
    // Paper record
    // ========================================================================

    /// Create a paper in DRAFT with the caller as its author snapshot
    pub async fn create_paper(&self, identity: &UserIdentity, input: PaperInput) -> Result<Paper> {
        validate_input(&input)?;

        let now = chrono::Utc::now();
        let paper = Paper {
            id: Uuid::new_v4(),
            title: input.title,
            abstract_text: input.abstract_text,
            author_id: identity.id,
            author_name: identity.name.clone(),
            author_email: identity.email.clone(),
            status: PaperStatus::Draft.into(),
            pdf_url: input.pdf_url,
            pdf_filename: input.pdf_filename,
            link: input.link,
            link_verified: false,
            keywords: input.keywords.into(),
            authors: input.authors.into(),
            doi: input.doi,
            verification_history: VerificationHistory::default(),
            created_at: now.into(),
            updated_at: now.into(),
            published_at: None,
        };

        let paper = self.store.insert(paper).await?;

        counter!("paperflow_papers_created_total").increment(1);
        info!(
            paper_id = %paper.id,
            author_id = %paper.author_id,
            title = %paper.title,
            "Paper created"
        );

        Ok(paper)
    }

    /// Fetch a paper by id
    pub async fn get_paper(&self, paper_id: Uuid) -> Result<Paper> {
        self.store
            .find_by_id(paper_id)
            .await?
            .ok_or_else(|| AppError::PaperNotFound {
                id: paper_id.to_string(),
            })
    }

    /// Replace the editable fields of a DRAFT paper
    ///
    /// Only the author may edit, and only while the paper is a draft. Status
    /// and history are never touched here.
    pub async fn update_draft(
        &self,
        paper_id: Uuid,
        caller_id: Uuid,
        input: PaperInput,
    ) -> Result<Paper> {
        let mut paper = self.get_paper(paper_id).await?;

        if !paper.is_authored_by(caller_id) {
            return Err(AppError::forbidden(
                "You are not authorized to update this research paper",
            ));
        }

        if paper.paper_status() != PaperStatus::Draft {
            return Err(AppError::invalid_state(
                "Only draft research papers can be updated",
            ));
        }

        validate_input(&input)?;

        paper.title = input.title;
        paper.abstract_text = input.abstract_text;
        paper.pdf_url = input.pdf_url;
        paper.pdf_filename = input.pdf_filename;
        paper.link = input.link;
        paper.keywords = input.keywords.into();
        paper.authors = input.authors.into();
        paper.doi = input.doi;
        paper.updated_at = chrono::Utc::now().into();

        // Conditional on DRAFT so an edit cannot race a submit
        if !self.store.update_if_status(&paper, PaperStatus::Draft).await? {
            return Err(AppError::invalid_state(
                "Only draft research papers can be updated",
            ));
        }

        Ok(paper)
    }

    /// Delete a paper and, best-effort, its stored PDF. Super-Admin only.
    pub async fn delete_paper(&self, paper_id: Uuid, identity: &UserIdentity) -> Result<()> {
        identity.require_role(&[Role::SuperAdmin])?;

        let paper = self.get_paper(paper_id).await?;

        // Blob deletion failure must not block record deletion
        if !paper.pdf_filename.is_empty() {
            if let Err(e) = self.blobs.delete(&paper.pdf_filename).await {
                warn!(
                    paper_id = %paper_id,
                    pdf_filename = %paper.pdf_filename,
                    error = %e,
                    "Failed to delete PDF blob, continuing with record deletion"
                );
            }
        }

        self.store.delete_by_id(paper_id).await?;

        counter!("paperflow_papers_deleted_total").increment(1);
        info!(paper_id = %paper_id, deleted_by = %identity.id, "Paper deleted");

        Ok(())
    }

    // ========================================================================
    // Verification state machine
    // ========================================================================

    /// Submit a DRAFT paper for verification
    ///
    /// A Lecturer's paper enters PENDING_DRO; a DRO's own paper enters
    /// PENDING_ADMIN directly.
    pub async fn submit(&self, paper_id: Uuid, identity: &UserIdentity) -> Result<Paper> {
        let paper = self.get_paper(paper_id).await?;

        if !paper.is_authored_by(identity.id) {
            return Err(AppError::forbidden(
                "You are not authorized to submit this paper for verification",
            ));
        }

        let rule = rule_for(identity.role, WorkflowOp::Submit)
            .ok_or_else(|| AppError::forbidden("Invalid role for verification submission"))?;

        let entry = VerificationEntry {
            status: rule.to,
            date: chrono::Utc::now().into(),
            role: identity.role.as_str().to_string(),
            verifier_id: None,
            verifier_name: None,
            comments: None,
        };

        self.apply_transition(
            paper,
            rule,
            entry,
            "Only draft papers can be submitted for verification",
        )
        .await
    }

    /// Approve the pending stage matching the caller's role
    ///
    /// A DRO moves PENDING_DRO to PENDING_ADMIN and may verify the external
    /// link while doing so; a Super-Admin moves PENDING_ADMIN to PUBLISHED
    /// and stamps `published_at`.
    pub async fn approve(
        &self,
        paper_id: Uuid,
        identity: &UserIdentity,
        decision: ReviewDecision,
    ) -> Result<Paper> {
        let rule = rule_for(identity.role, WorkflowOp::Approve)
            .ok_or_else(|| AppError::forbidden("You do not have permission to verify papers"))?;

        let mut paper = self.get_paper(paper_id).await?;

        // Link verification is a DRO-only side effect and requires a link
        if identity.role == Role::DepartmentResearchOfficer
            && decision.verify_link
            && paper.link.as_deref().is_some_and(|l| !l.is_empty())
        {
            paper.link_verified = true;
        }

        if rule.to == PaperStatus::Published {
            paper.published_at = Some(chrono::Utc::now().into());
        }

        let entry = VerificationEntry {
            status: rule.to,
            date: chrono::Utc::now().into(),
            role: identity.role.as_str().to_string(),
            verifier_id: Some(identity.id),
            verifier_name: Some(identity.name.clone()),
            comments: decision.comments,
        };

        self.apply_transition(paper, rule, entry, "This paper is not pending your verification")
            .await
    }

    /// Reject the pending stage matching the caller's role. Terminal.
    pub async fn reject(
        &self,
        paper_id: Uuid,
        identity: &UserIdentity,
        comments: Option<String>,
    ) -> Result<Paper> {
        // Empty feedback is rejected before any other guard
        let comments = match comments {
            Some(c) if !c.trim().is_empty() => c,
            _ => return Err(AppError::validation("Rejection feedback is required")),
        };

        let rule = rule_for(identity.role, WorkflowOp::Reject)
            .ok_or_else(|| AppError::forbidden("You do not have permission to reject papers"))?;

        let paper = self.get_paper(paper_id).await?;

        let entry = VerificationEntry {
            status: rule.to,
            date: chrono::Utc::now().into(),
            role: identity.role.as_str().to_string(),
            verifier_id: Some(identity.id),
            verifier_name: Some(identity.name.clone()),
            comments: Some(comments),
        };

        self.apply_transition(paper, rule, entry, "This paper is not pending your verification")
            .await
    }

    /// Apply one transition: state guard, audit append, conditional write.
    ///
    /// The new status and its history entry are written together; a CAS miss
    /// (stale from-state, e.g. a double-click race) surfaces as InvalidState
    /// and leaves the stored record untouched.
    async fn apply_transition(
        &self,
        mut paper: Paper,
        rule: TransitionRule,
        entry: VerificationEntry,
        stale_message: &str,
    ) -> Result<Paper> {
        let from = paper.paper_status();
        if from != rule.from {
            return Err(AppError::invalid_state(stale_message));
        }

        paper.status = rule.to.into();
        paper.verification_history.push(entry);
        paper.updated_at = chrono::Utc::now().into();

        if !self.store.update_if_status(&paper, rule.from).await? {
            return Err(AppError::invalid_state(stale_message));
        }

        counter!("paperflow_transitions_total", "to" => rule.to.as_str()).increment(1);
        info!(
            paper_id = %paper.id,
            from = %from,
            to = %rule.to,
            role = %paper
                .verification_history
                .last()
                .map(|e| e.role.as_str())
                .unwrap_or(""),
            "Paper transitioned"
        );

        Ok(paper)
    }

    // ========================================================================
    // Query / listing
    // ========================================================================

    /// List papers filtered by status and/or author, dashboard ordering
    pub async fn list(
        &self,
        status: Option<PaperStatus>,
        author_id: Option<Uuid>,
        page: u64,
        page_size: u64,
    ) -> Result<PaperPage> {
        self.store
            .query(&PaperQuery {
                text: None,
                status,
                author_id,
                page: page.max(1),
                page_size: normalize_page_size(page_size),
                order: PaperOrder::PublishedThenUpdated,
            })
            .await
    }

    /// Papers awaiting a given stage (review queues)
    pub async fn list_by_status(&self, status: PaperStatus, page: u64) -> Result<PaperPage> {
        self.list(Some(status), None, page, DEFAULT_PAGE_SIZE).await
    }

    /// Papers authored by a given user (author dashboard)
    pub async fn list_by_author(&self, author_id: Uuid, page: u64) -> Result<PaperPage> {
        self.list(None, Some(author_id), page, DEFAULT_PAGE_SIZE).await
    }

    /// Free-text search across title, abstract, keywords, and author names
    pub async fn search(&self, params: SearchParams) -> Result<PaperPage> {
        let has_text = params.text.as_deref().is_some_and(|t| !t.is_empty());
        if !has_text && params.status.is_none() && params.author_id.is_none() {
            return Err(AppError::validation("No search parameters provided"));
        }

        let status = params
            .status
            .as_deref()
            .map(resolve_status_filter)
            .transpose()?;

        counter!("paperflow_searches_total").increment(1);

        self.store
            .query(&PaperQuery {
                text: params.text.filter(|t| !t.is_empty()),
                status,
                author_id: params.author_id,
                page: params.page.max(1),
                page_size: normalize_page_size(params.page_size),
                order: PaperOrder::UpdatedOnly,
            })
            .await
    }
}

/// Resolve a raw status filter; `public` is the sentinel unauthenticated
/// callers pass and always means PUBLISHED.
fn resolve_status_filter(raw: &str) -> Result<PaperStatus> {
    if raw == "public" {
        return Ok(PaperStatus::Published);
    }

    PaperStatus::parse(raw)
        .ok_or_else(|| AppError::validation(format!("Unknown status filter: {}", raw)))
}

fn normalize_page_size(page_size: u64) -> u64 {
    if page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size
    }
}

fn validate_input(input: &PaperInput) -> Result<()> {
    if input.title.trim().is_empty() {
        return Err(AppError::Validation {
            message: "Title is required".to_string(),
            field: Some("title".to_string()),
        });
    }

    if input.pdf_url.trim().is_empty() {
        return Err(AppError::Validation {
            message: "PDF is required for research papers".to_string(),
            field: Some("pdfUrl".to_string()),
        });
    }

    if input.abstract_text.trim().is_empty() {
        return Err(AppError::Validation {
            message: "Abstract is required for research papers".to_string(),
            field: Some("abstract".to_string()),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::BlobStore;
    use crate::db::MemoryStore;
    use crate::errors::ErrorCode;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoopBlobStore;

    #[async_trait]
    impl BlobStore for NoopBlobStore {
        async fn delete(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    struct FailingBlobStore {
        attempts: AtomicUsize,
    }

    impl FailingBlobStore {
        fn new() -> Self {
            Self {
                attempts: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BlobStore for FailingBlobStore {
        async fn delete(&self, key: &str) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Blob {
                message: format!("cannot delete {}", key),
            })
        }
    }

    fn service() -> VerificationService {
        VerificationService::new(Arc::new(MemoryStore::new()), Arc::new(NoopBlobStore))
    }

    fn identity(role: Role) -> UserIdentity {
        let name = match role {
            Role::Lecturer => "Grace Hopper",
            Role::DepartmentResearchOfficer => "Edsger Dijkstra",
            Role::SuperAdmin => "Barbara Liskov",
        };
        UserIdentity {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.edu", name.to_lowercase().replace(' ', ".")),
            role,
            department: None,
            position: None,
            bio: None,
            institution: None,
            research_interests: Vec::new(),
        }
    }

    fn input() -> PaperInput {
        PaperInput {
            title: "Consensus in Asynchronous Networks".to_string(),
            abstract_text: "We revisit agreement under partial synchrony.".to_string(),
            pdf_url: "https://blobs.example.edu/papers/consensus.pdf".to_string(),
            pdf_filename: "consensus.pdf".to_string(),
            link: None,
            keywords: vec!["consensus".to_string(), "distributed systems".to_string()],
            authors: vec!["L. Lamport".to_string()],
            doi: None,
        }
    }

    fn input_with_link() -> PaperInput {
        PaperInput {
            link: Some("https://x".to_string()),
            ..input()
        }
    }

    #[tokio::test]
    async fn test_create_starts_as_draft() {
        let svc = service();
        let author = identity(Role::Lecturer);

        let paper = svc.create_paper(&author, input()).await.unwrap();

        assert_eq!(paper.paper_status(), PaperStatus::Draft);
        assert!(!paper.link_verified);
        assert!(paper.verification_history.is_empty());
        assert_eq!(paper.author_id, author.id);
        assert_eq!(paper.author_name, author.name);
        assert_eq!(paper.author_email, author.email);
        assert!(paper.published_at.is_none());
    }

    #[tokio::test]
    async fn test_create_requires_title_pdf_abstract() {
        let svc = service();
        let author = identity(Role::Lecturer);

        for missing in ["title", "pdf_url", "abstract"] {
            let mut bad = input();
            match missing {
                "title" => bad.title = "  ".to_string(),
                "pdf_url" => bad.pdf_url = String::new(),
                _ => bad.abstract_text = String::new(),
            }
            let err = svc.create_paper(&author, bad).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::ValidationError, "missing {missing}");
        }
    }

    #[tokio::test]
    async fn test_author_snapshot_is_frozen() {
        let svc = service();
        let mut author = identity(Role::Lecturer);

        let paper = svc.create_paper(&author, input()).await.unwrap();

        // A later profile change must not alter the stored snapshot
        author.name = "G. B. Hopper".to_string();
        let stored = svc.get_paper(paper.id).await.unwrap();
        assert_eq!(stored.author_name, "Grace Hopper");
    }

    #[tokio::test]
    async fn test_update_draft_replaces_fields() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let paper = svc.create_paper(&author, input()).await.unwrap();

        let mut edit = input();
        edit.title = "Consensus in Asynchronous Networks, Revised".to_string();
        edit.doi = Some("10.1000/182".to_string());

        let updated = svc.update_draft(paper.id, author.id, edit).await.unwrap();

        assert_eq!(updated.title, "Consensus in Asynchronous Networks, Revised");
        assert_eq!(updated.doi.as_deref(), Some("10.1000/182"));
        assert_eq!(updated.paper_status(), PaperStatus::Draft);
        assert!(updated.verification_history.is_empty());
        assert!(updated.updated_at >= paper.updated_at);
    }

    #[tokio::test]
    async fn test_update_draft_guards() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let stranger = identity(Role::Lecturer);
        let paper = svc.create_paper(&author, input()).await.unwrap();

        // Non-author
        let err = svc
            .update_draft(paper.id, stranger.id, input())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        // Required field emptied
        let mut bad = input();
        bad.abstract_text = String::new();
        let err = svc.update_draft(paper.id, author.id, bad).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        // No longer a draft
        svc.submit(paper.id, &author).await.unwrap();
        let err = svc
            .update_draft(paper.id, author.id, input())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    #[tokio::test]
    async fn test_lecturer_submit_enters_pending_dro() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let paper = svc.create_paper(&author, input()).await.unwrap();

        let paper = svc.submit(paper.id, &author).await.unwrap();

        assert_eq!(paper.paper_status(), PaperStatus::PendingDro);
        assert_eq!(paper.verification_history.len(), 1);

        let entry = paper.verification_history.last().unwrap();
        assert_eq!(entry.status, PaperStatus::PendingDro);
        assert_eq!(entry.role, "Lecturer");
        assert!(entry.verifier_id.is_none());
        assert!(entry.verifier_name.is_none());
    }

    #[tokio::test]
    async fn test_dro_self_submit_skips_dro_review() {
        let svc = service();
        let author = identity(Role::DepartmentResearchOfficer);
        let paper = svc.create_paper(&author, input()).await.unwrap();

        let paper = svc.submit(paper.id, &author).await.unwrap();

        assert_eq!(paper.paper_status(), PaperStatus::PendingAdmin);
        assert_eq!(
            paper.verification_history.last().unwrap().status,
            PaperStatus::PendingAdmin
        );
    }

    #[tokio::test]
    async fn test_submit_guards() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let stranger = identity(Role::Lecturer);
        let paper = svc.create_paper(&author, input()).await.unwrap();

        // Non-author cannot submit
        let err = svc.submit(paper.id, &stranger).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        // Double submit fails on the state guard
        svc.submit(paper.id, &author).await.unwrap();
        let err = svc.submit(paper.id, &author).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    #[tokio::test]
    async fn test_super_admin_author_cannot_submit() {
        let svc = service();
        let author = identity(Role::SuperAdmin);
        let paper = svc.create_paper(&author, input()).await.unwrap();

        let err = svc.submit(paper.id, &author).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_full_approval_chain() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let dro = identity(Role::DepartmentResearchOfficer);
        let admin = identity(Role::SuperAdmin);

        let paper = svc.create_paper(&author, input()).await.unwrap();
        svc.submit(paper.id, &author).await.unwrap();

        let paper = svc
            .approve(paper.id, &dro, ReviewDecision::default())
            .await
            .unwrap();
        assert_eq!(paper.paper_status(), PaperStatus::PendingAdmin);

        let entry = paper.verification_history.last().unwrap();
        assert_eq!(entry.verifier_id, Some(dro.id));
        assert_eq!(entry.verifier_name.as_deref(), Some(dro.name.as_str()));

        let paper = svc
            .approve(paper.id, &admin, ReviewDecision::default())
            .await
            .unwrap();
        assert_eq!(paper.paper_status(), PaperStatus::Published);
        assert!(paper.published_at.is_some());
        assert_eq!(paper.verification_history.len(), 3);
    }

    #[tokio::test]
    async fn test_history_entry_status_matches_paper_status() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let dro = identity(Role::DepartmentResearchOfficer);
        let admin = identity(Role::SuperAdmin);

        let paper = svc.create_paper(&author, input()).await.unwrap();
        let mut lengths = vec![paper.verification_history.len()];

        let paper = svc.submit(paper.id, &author).await.unwrap();
        lengths.push(paper.verification_history.len());
        assert_eq!(
            paper.verification_history.last().unwrap().status,
            paper.paper_status()
        );

        let paper = svc
            .approve(paper.id, &dro, ReviewDecision::default())
            .await
            .unwrap();
        lengths.push(paper.verification_history.len());
        assert_eq!(
            paper.verification_history.last().unwrap().status,
            paper.paper_status()
        );

        let paper = svc
            .approve(paper.id, &admin, ReviewDecision::default())
            .await
            .unwrap();
        lengths.push(paper.verification_history.len());
        assert_eq!(
            paper.verification_history.last().unwrap().status,
            paper.paper_status()
        );

        // Strictly increasing history length
        assert!(lengths.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(lengths, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_super_admin_cannot_approve_pending_dro() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let admin = identity(Role::SuperAdmin);

        let paper = svc.create_paper(&author, input()).await.unwrap();
        svc.submit(paper.id, &author).await.unwrap();

        // Stage integrity holds even for the most privileged role
        let err = svc
            .approve(paper.id, &admin, ReviewDecision::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    #[tokio::test]
    async fn test_lecturer_cannot_approve_or_reject() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let paper = svc.create_paper(&author, input()).await.unwrap();
        svc.submit(paper.id, &author).await.unwrap();

        let err = svc
            .approve(paper.id, &author, ReviewDecision::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let err = svc
            .reject(paper.id, &author, Some("weak evaluation".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn test_dro_approve_verifies_link() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let dro = identity(Role::DepartmentResearchOfficer);

        let paper = svc.create_paper(&author, input_with_link()).await.unwrap();
        svc.submit(paper.id, &author).await.unwrap();

        let paper = svc
            .approve(
                paper.id,
                &dro,
                ReviewDecision {
                    comments: Some("Link checked".to_string()),
                    verify_link: true,
                },
            )
            .await
            .unwrap();

        assert!(paper.link_verified);
        assert_eq!(
            paper.verification_history.last().unwrap().comments.as_deref(),
            Some("Link checked")
        );
    }

    #[tokio::test]
    async fn test_verify_link_ignored_without_link() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let dro = identity(Role::DepartmentResearchOfficer);

        let paper = svc.create_paper(&author, input()).await.unwrap();
        svc.submit(paper.id, &author).await.unwrap();

        let paper = svc
            .approve(
                paper.id,
                &dro,
                ReviewDecision {
                    comments: None,
                    verify_link: true,
                },
            )
            .await
            .unwrap();

        assert!(!paper.link_verified);
    }

    #[tokio::test]
    async fn test_verify_link_ignored_for_super_admin() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let dro = identity(Role::DepartmentResearchOfficer);
        let admin = identity(Role::SuperAdmin);

        let paper = svc.create_paper(&author, input_with_link()).await.unwrap();
        svc.submit(paper.id, &author).await.unwrap();
        svc.approve(paper.id, &dro, ReviewDecision::default())
            .await
            .unwrap();

        let paper = svc
            .approve(
                paper.id,
                &admin,
                ReviewDecision {
                    comments: None,
                    verify_link: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(paper.paper_status(), PaperStatus::Published);
        assert!(!paper.link_verified);
    }

    #[tokio::test]
    async fn test_reject_requires_comments() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let dro = identity(Role::DepartmentResearchOfficer);
        let admin = identity(Role::SuperAdmin);

        let paper = svc.create_paper(&author, input()).await.unwrap();
        svc.submit(paper.id, &author).await.unwrap();

        // Empty feedback fails regardless of role or from-state
        for reviewer in [&dro, &admin, &author] {
            for comments in [None, Some("".to_string()), Some("   ".to_string())] {
                let err = svc.reject(paper.id, reviewer, comments).await.unwrap_err();
                assert_eq!(err.code(), ErrorCode::ValidationError);
            }
        }

        // The paper is untouched
        let stored = svc.get_paper(paper.id).await.unwrap();
        assert_eq!(stored.paper_status(), PaperStatus::PendingDro);
        assert_eq!(stored.verification_history.len(), 1);
    }

    #[tokio::test]
    async fn test_reject_is_terminal() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let dro = identity(Role::DepartmentResearchOfficer);

        let paper = svc.create_paper(&author, input()).await.unwrap();
        svc.submit(paper.id, &author).await.unwrap();

        let paper = svc
            .reject(paper.id, &dro, Some("needs a control group".to_string()))
            .await
            .unwrap();
        assert_eq!(paper.paper_status(), PaperStatus::Rejected);
        assert_eq!(
            paper.verification_history.last().unwrap().comments.as_deref(),
            Some("needs a control group")
        );

        // No transition leaves REJECTED
        let err = svc
            .approve(paper.id, &dro, ReviewDecision::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
        let err = svc.submit(paper.id, &author).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    #[tokio::test]
    async fn test_verification_scenario_end_to_end() {
        // P1 by Lecturer U1 with a link: submit, DRO approves with link
        // verification, Super-Admin rejects. History grows 1-2-3 and the
        // verified flag survives rejection.
        let svc = service();
        let author = identity(Role::Lecturer);
        let dro = identity(Role::DepartmentResearchOfficer);
        let admin = identity(Role::SuperAdmin);

        let p1 = svc.create_paper(&author, input_with_link()).await.unwrap();

        let p1 = svc.submit(p1.id, &author).await.unwrap();
        assert_eq!(p1.paper_status(), PaperStatus::PendingDro);
        assert_eq!(p1.verification_history.len(), 1);

        let p1 = svc
            .approve(
                p1.id,
                &dro,
                ReviewDecision {
                    comments: None,
                    verify_link: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(p1.paper_status(), PaperStatus::PendingAdmin);
        assert!(p1.link_verified);
        assert_eq!(p1.verification_history.len(), 2);

        let p1 = svc
            .reject(p1.id, &admin, Some("needs more data".to_string()))
            .await
            .unwrap();
        assert_eq!(p1.paper_status(), PaperStatus::Rejected);
        assert_eq!(p1.verification_history.len(), 3);
        assert!(p1.link_verified, "rejection does not clear link verification");
    }

    #[tokio::test]
    async fn test_concurrent_approvals_have_one_winner() {
        let svc = Arc::new(service());
        let author = identity(Role::Lecturer);
        let dro = identity(Role::DepartmentResearchOfficer);
        let admin = identity(Role::SuperAdmin);

        let paper = svc.create_paper(&author, input()).await.unwrap();
        svc.submit(paper.id, &author).await.unwrap();
        svc.approve(paper.id, &dro, ReviewDecision::default())
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let svc = Arc::clone(&svc);
            let admin = admin.clone();
            let paper_id = paper.id;
            handles.push(tokio::spawn(async move {
                svc.approve(paper_id, &admin, ReviewDecision::default()).await
            }));
        }

        let mut wins = 0;
        let mut losses = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(paper) => {
                    assert_eq!(paper.paper_status(), PaperStatus::Published);
                    wins += 1;
                }
                Err(err) => {
                    assert_eq!(err.code(), ErrorCode::InvalidState);
                    losses += 1;
                }
            }
        }

        assert_eq!((wins, losses), (1, 1));

        // published_at stamped exactly once, history grew exactly once
        let stored = svc.get_paper(paper.id).await.unwrap();
        assert!(stored.published_at.is_some());
        assert_eq!(stored.verification_history.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_requires_super_admin() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let dro = identity(Role::DepartmentResearchOfficer);
        let admin = identity(Role::SuperAdmin);

        let paper = svc.create_paper(&author, input()).await.unwrap();

        for caller in [&author, &dro] {
            let err = svc.delete_paper(paper.id, caller).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::Forbidden);
        }

        svc.delete_paper(paper.id, &admin).await.unwrap();
        let err = svc.get_paper(paper.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PaperNotFound);
    }

    #[tokio::test]
    async fn test_delete_survives_blob_failure() {
        let blobs = Arc::new(FailingBlobStore::new());
        let svc = VerificationService::new(Arc::new(MemoryStore::new()), blobs.clone());
        let author = identity(Role::Lecturer);
        let admin = identity(Role::SuperAdmin);

        let paper = svc.create_paper(&author, input()).await.unwrap();

        // Blob deletion fails but the record still goes away
        svc.delete_paper(paper.id, &admin).await.unwrap();
        assert_eq!(blobs.attempts.load(Ordering::SeqCst), 1);

        let err = svc.get_paper(paper.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::PaperNotFound);
    }

    #[tokio::test]
    async fn test_listing_by_status_and_author() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let other = identity(Role::Lecturer);

        let mine = svc.create_paper(&author, input()).await.unwrap();
        let mut second = input();
        second.title = "A Second Study".to_string();
        svc.create_paper(&other, second).await.unwrap();

        svc.submit(mine.id, &author).await.unwrap();

        let pending = svc
            .list_by_status(PaperStatus::PendingDro, 1)
            .await
            .unwrap();
        assert_eq!(pending.total, 1);
        assert_eq!(pending.papers[0].id, mine.id);

        let by_author = svc.list_by_author(other.id, 1).await.unwrap();
        assert_eq!(by_author.total, 1);
        assert_eq!(by_author.papers[0].author_id, other.id);
    }

    #[tokio::test]
    async fn test_search_matches_across_fields() {
        let svc = service();
        let author = identity(Role::Lecturer);

        svc.create_paper(&author, input()).await.unwrap();

        for needle in ["consensus", "AGREEMENT", "lamport", "grace hopper"] {
            let hits = svc
                .search(SearchParams {
                    text: Some(needle.to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(hits.total, 1, "query {needle:?}");
        }

        let misses = svc
            .search(SearchParams {
                text: Some("quantum".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(misses.total, 0);
    }

    #[tokio::test]
    async fn test_search_requires_some_parameter() {
        let svc = service();
        let err = svc.search(SearchParams::default()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_public_search_only_sees_published() {
        let svc = service();
        let author = identity(Role::Lecturer);
        let dro = identity(Role::DepartmentResearchOfficer);
        let admin = identity(Role::SuperAdmin);

        // One paper in every non-published stage plus one published
        let draft = svc.create_paper(&author, input()).await.unwrap();

        let mut pending = input();
        pending.title = "Pending Work".to_string();
        let pending = svc.create_paper(&author, pending).await.unwrap();
        svc.submit(pending.id, &author).await.unwrap();

        let mut published = input();
        published.title = "Published Work".to_string();
        let published = svc.create_paper(&author, published).await.unwrap();
        svc.submit(published.id, &author).await.unwrap();
        svc.approve(published.id, &dro, ReviewDecision::default())
            .await
            .unwrap();
        svc.approve(published.id, &admin, ReviewDecision::default())
            .await
            .unwrap();

        let page = svc
            .search(SearchParams {
                text: Some(String::new()),
                status: Some("public".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.papers[0].id, published.id);
        assert!(page
            .papers
            .iter()
            .all(|p| p.paper_status() == PaperStatus::Published));
        let _ = draft;
    }

    #[tokio::test]
    async fn test_pagination_beyond_results_is_empty() {
        let svc = service();
        let author = identity(Role::Lecturer);
        svc.create_paper(&author, input()).await.unwrap();

        let page = svc.list(None, None, 99, 20).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(page.papers.is_empty());
        assert_eq!(page.page, 99);
    }

    #[tokio::test]
    async fn test_absurd_page_number_yields_empty_page() {
        let svc = service();
        let author = identity(Role::Lecturer);
        svc.create_paper(&author, input()).await.unwrap();

        // The skip computation must not overflow on caller-supplied pages
        let page = svc.list(None, None, u64::MAX, u64::MAX).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(page.papers.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_status_filter_is_rejected() {
        let svc = service();
        let err = svc
            .search(SearchParams {
                status: Some("PENDING_HOD".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }
}
