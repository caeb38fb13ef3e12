//! Group and membership domain model.
//!
//! # Responsibility
//! - Define household groups and their member roster.
//! - Provide lifecycle helpers for member deactivation.
//!
//! # Invariants
//! - Membership is a set: one `Member` per `(group, user_ref)` pair.
//! - `joined_at` never changes after creation; it defines default rotation
//!   order and fairness tie-breaks.
//! - Deactivated members keep their completion history.

use crate::model::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a group.
pub type GroupId = Uuid;

/// Stable identifier for a group member.
pub type MemberId = Uuid;

/// Opaque reference to an identity owned by the external auth layer.
///
/// Core never sees credentials; callers pass an already-authenticated
/// identity reference.
pub type UserRef = Uuid;

/// Role of a member inside its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Founder or promoted member; may manage the group in outer layers.
    Admin,
    /// Regular housemate.
    Member,
}

/// Household group sharing one task list and one rotation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Stable global ID used for linking and auditing.
    pub uuid: GroupId,
    pub name: String,
    /// Join code handed out to housemates. Code generation happens outside
    /// core; uniqueness is enforced at persistence.
    pub invite_code: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Group {
    /// Creates a new group with a generated stable ID.
    pub fn new(name: impl Into<String>, invite_code: impl Into<String>, created_at: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            invite_code: invite_code.into(),
            created_at,
        }
    }

    /// Checks group fields against model invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyGroupName);
        }
        if self.invite_code.trim().is_empty() {
            return Err(ValidationError::EmptyInviteCode);
        }
        Ok(())
    }
}

/// Roster entry binding one external identity to one group.
///
/// Rotation state is scoped per group: the same person in two groups is two
/// distinct members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub uuid: MemberId,
    pub group_uuid: GroupId,
    pub user_ref: UserRef,
    pub display_name: String,
    pub role: MemberRole,
    /// Unix epoch milliseconds. Defines join order.
    pub joined_at: i64,
    /// Inactive members are skipped by rotation but keep their history.
    pub is_active: bool,
}

impl Member {
    /// Creates an active member with a generated stable ID.
    pub fn new(
        group_uuid: GroupId,
        user_ref: UserRef,
        display_name: impl Into<String>,
        role: MemberRole,
        joined_at: i64,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            group_uuid,
            user_ref,
            display_name: display_name.into(),
            role,
            joined_at,
            is_active: true,
        }
    }

    /// Takes this member out of rotation consideration.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Puts this member back into rotation consideration.
    pub fn reinstate(&mut self) {
        self.is_active = true;
    }

    /// Checks member fields against model invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.display_name.trim().is_empty() {
            return Err(ValidationError::EmptyMemberName);
        }
        Ok(())
    }
}
