//! Completion domain model.
//!
//! # Responsibility
//! - Record who actually did a chore, and who was scheduled to.
//!
//! # Invariants
//! - Completions are append-only: never updated, never deleted. Removing
//!   one would corrupt the fairness audit trail.
//! - `out_of_turn` is derived once at creation and never recomputed.

use crate::model::group::{GroupId, MemberId};
use crate::model::task::TaskId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a completion record.
pub type CompletionId = Uuid;

/// Immutable record of one completed chore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub uuid: CompletionId,
    pub task_uuid: TaskId,
    /// Member who actually did the work.
    pub member_uuid: MemberId,
    /// Group the task belonged to at completion time. Stored redundantly so
    /// fairness queries never join through `tasks`.
    pub group_uuid: GroupId,
    /// Member whose turn it was when the completion happened.
    pub scheduled_member_uuid: MemberId,
    /// True when actor and scheduled assignee differ.
    pub out_of_turn: bool,
    /// Unix epoch milliseconds.
    pub completed_at: i64,
}

impl Completion {
    /// Creates a completion record, deriving the out-of-turn flag from the
    /// actor/assignee pair.
    pub fn new(
        task_uuid: TaskId,
        member_uuid: MemberId,
        group_uuid: GroupId,
        scheduled_member_uuid: MemberId,
        completed_at: i64,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            task_uuid,
            member_uuid,
            group_uuid,
            scheduled_member_uuid,
            out_of_turn: member_uuid != scheduled_member_uuid,
            completed_at,
        }
    }
}
