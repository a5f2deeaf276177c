//! Paper entity
//!
//! The central record of the verification workflow. The author block is a
//! denormalized snapshot taken at creation time, not a foreign key: the
//! audit trail must show the name and email as they were at submission.

use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// Verification stage of a paper
///
/// Papers only move forward: `DRAFT -> PENDING_DRO -> PENDING_ADMIN ->
/// PUBLISHED`, with `REJECTED` terminal from either pending stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaperStatus {
    Draft,
    PendingDro,
    PendingAdmin,
    Published,
    Rejected,
}

impl PaperStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperStatus::Draft => "DRAFT",
            PaperStatus::PendingDro => "PENDING_DRO",
            PaperStatus::PendingAdmin => "PENDING_ADMIN",
            PaperStatus::Published => "PUBLISHED",
            PaperStatus::Rejected => "REJECTED",
        }
    }

    /// Parse a stored status string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(PaperStatus::Draft),
            "PENDING_DRO" => Some(PaperStatus::PendingDro),
            "PENDING_ADMIN" => Some(PaperStatus::PendingAdmin),
            "PUBLISHED" => Some(PaperStatus::Published),
            "REJECTED" => Some(PaperStatus::Rejected),
            _ => None,
        }
    }

    /// No transition leaves PUBLISHED or REJECTED
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaperStatus::Published | PaperStatus::Rejected)
    }
}

impl From<PaperStatus> for String {
    fn from(status: PaperStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for PaperStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit entry in a paper's verification history
///
/// `status` records the status transitioned INTO. The verifier fields are
/// absent for author-triggered submissions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationEntry {
    pub status: PaperStatus,
    pub date: DateTimeWithTimeZone,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// Append-only verification history, stored as JSONB
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult,
)]
pub struct VerificationHistory(pub Vec<VerificationEntry>);

impl VerificationHistory {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[VerificationEntry] {
        &self.0
    }

    pub fn last(&self) -> Option<&VerificationEntry> {
        self.0.last()
    }

    /// Append is the only mutation; entries are never edited or reordered.
    pub fn push(&mut self, entry: VerificationEntry) {
        self.0.push(entry);
    }
}

/// Ordered list of strings (keywords, co-authors), stored as JSONB
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult,
)]
pub struct StringList(pub Vec<String>);

impl StringList {
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for StringList {
    fn from(items: Vec<String>) -> Self {
        StringList(items)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub abstract_text: String,

    /// Author snapshot, captured at creation
    pub author_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub author_name: String,

    #[sea_orm(column_type = "Text")]
    pub author_email: String,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    #[sea_orm(column_type = "Text")]
    pub pdf_url: String,

    /// Blob-store key used for best-effort PDF deletion
    #[sea_orm(column_type = "Text")]
    pub pdf_filename: String,

    /// Optional external URL to a publisher's copy
    #[sea_orm(column_type = "Text", nullable)]
    pub link: Option<String>,

    pub link_verified: bool,

    #[sea_orm(column_type = "JsonBinary")]
    pub keywords: StringList,

    /// Co-authors, insertion order preserved
    #[sea_orm(column_type = "JsonBinary")]
    pub authors: StringList,

    #[sea_orm(column_type = "Text", nullable)]
    pub doi: Option<String>,

    #[sea_orm(column_type = "JsonBinary")]
    pub verification_history: VerificationHistory,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    pub published_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Get the paper status as an enum
    ///
    /// The store only ever contains strings written from [`PaperStatus`];
    /// anything else is treated as a draft rather than panicking.
    pub fn paper_status(&self) -> PaperStatus {
        PaperStatus::parse(&self.status).unwrap_or(PaperStatus::Draft)
    }

    /// Check if the paper has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        self.paper_status().is_terminal()
    }

    /// Check if the given user is the paper's author
    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            PaperStatus::Draft,
            PaperStatus::PendingDro,
            PaperStatus::PendingAdmin,
            PaperStatus::Published,
            PaperStatus::Rejected,
        ] {
            assert_eq!(PaperStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaperStatus::parse("PENDING_HOD"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(PaperStatus::Published.is_terminal());
        assert!(PaperStatus::Rejected.is_terminal());
        assert!(!PaperStatus::Draft.is_terminal());
        assert!(!PaperStatus::PendingDro.is_terminal());
        assert!(!PaperStatus::PendingAdmin.is_terminal());
    }

    #[test]
    fn test_history_append_order() {
        let mut history = VerificationHistory::default();
        assert!(history.is_empty());

        for status in [PaperStatus::PendingDro, PaperStatus::PendingAdmin] {
            history.push(VerificationEntry {
                status,
                date: chrono::Utc::now().into(),
                role: "Department Research Officer".to_string(),
                verifier_id: None,
                verifier_name: None,
                comments: None,
            });
        }

        assert_eq!(history.len(), 2);
        assert_eq!(history.entries()[0].status, PaperStatus::PendingDro);
        assert_eq!(history.last().unwrap().status, PaperStatus::PendingAdmin);
    }
}
