//! Verification transition table
//!
//! Every workflow operation resolves to a single row keyed by
//! `(role, operation)`: the required from-state and the resulting to-state.
//! A role with no row for an operation is not authorized to perform it.
//! Keeping the table as data makes the state machine exhaustively testable.

use crate::auth::Role;
use crate::db::models::PaperStatus;

/// Workflow operations that move a paper between stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOp {
    Submit,
    Approve,
    Reject,
}

/// One row of the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    /// Status the paper must currently hold
    pub from: PaperStatus,
    /// Status the paper moves into
    pub to: PaperStatus,
}

/// Look up the transition a role is allowed to perform for an operation.
///
/// Stage matching is exact even for the top role: a Super-Admin has no row
/// for approving a PENDING_DRO paper, so review stages cannot be skipped.
/// A DRO submitting their own paper goes straight to PENDING_ADMIN
/// (self-review avoidance).
pub fn rule_for(role: Role, op: WorkflowOp) -> Option<TransitionRule> {
    use PaperStatus::*;
    use Role::*;

    match (role, op) {
        (Lecturer, WorkflowOp::Submit) => Some(TransitionRule {
            from: Draft,
            to: PendingDro,
        }),
        (DepartmentResearchOfficer, WorkflowOp::Submit) => Some(TransitionRule {
            from: Draft,
            to: PendingAdmin,
        }),
        (SuperAdmin, WorkflowOp::Submit) => None,

        (DepartmentResearchOfficer, WorkflowOp::Approve) => Some(TransitionRule {
            from: PendingDro,
            to: PendingAdmin,
        }),
        (SuperAdmin, WorkflowOp::Approve) => Some(TransitionRule {
            from: PendingAdmin,
            to: Published,
        }),
        (Lecturer, WorkflowOp::Approve) => None,

        (DepartmentResearchOfficer, WorkflowOp::Reject) => Some(TransitionRule {
            from: PendingDro,
            to: Rejected,
        }),
        (SuperAdmin, WorkflowOp::Reject) => Some(TransitionRule {
            from: PendingAdmin,
            to: Rejected,
        }),
        (Lecturer, WorkflowOp::Reject) => None,
    }
}
