//! Group membership use-case service.
//!
//! # Responsibility
//! - Provide create/join flows and member lifecycle entry points.
//! - Delegate persistence to the group repository.
//!
//! # Invariants
//! - The group creator becomes its first member with admin role.
//! - Joining requires a known invite code; membership stays a set.

use crate::model::group::{Group, GroupId, Member, MemberId, MemberRole, UserRef};
use crate::repo::group_repo::GroupRepository;
use crate::repo::{RepoError, RepoResult};

/// Request model for creating a group with its founding member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateGroupRequest {
    pub name: String,
    /// Pre-generated join code; uniqueness is enforced at persistence.
    pub invite_code: String,
    pub owner_user_ref: UserRef,
    pub owner_display_name: String,
    /// Unix epoch milliseconds, used for both group and founder timestamps.
    pub created_at: i64,
}

/// Use-case service wrapper for group and membership operations.
pub struct GroupService<R: GroupRepository> {
    repo: R,
}

impl<R: GroupRepository> GroupService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a group; the caller becomes its first member with admin
    /// role.
    pub fn create_group(&mut self, request: &CreateGroupRequest) -> RepoResult<(Group, Member)> {
        let group = Group::new(
            request.name.clone(),
            request.invite_code.clone(),
            request.created_at,
        );
        let owner = Member::new(
            group.uuid,
            request.owner_user_ref,
            request.owner_display_name.clone(),
            MemberRole::Admin,
            request.created_at,
        );
        self.repo.create_group(&group, &owner)?;
        Ok((group, owner))
    }

    /// Joins a group via invite code with regular member role.
    pub fn join_group(
        &mut self,
        invite_code: &str,
        user_ref: UserRef,
        display_name: impl Into<String>,
        joined_at: i64,
    ) -> RepoResult<Member> {
        let group = self
            .repo
            .find_group_by_invite_code(invite_code)?
            .ok_or_else(|| RepoError::UnknownInviteCode(invite_code.to_string()))?;

        let member = Member::new(
            group.uuid,
            user_ref,
            display_name,
            MemberRole::Member,
            joined_at,
        );
        self.repo.add_member(&member)?;
        Ok(member)
    }

    /// Gets one group by stable ID.
    pub fn get_group(&self, id: GroupId) -> RepoResult<Option<Group>> {
        self.repo.get_group(id)
    }

    /// Gets one member by stable ID.
    pub fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        self.repo.get_member(id)
    }

    /// Lists members in join order.
    pub fn list_members(&self, group: GroupId, include_inactive: bool) -> RepoResult<Vec<Member>> {
        self.repo.list_members(group, include_inactive)
    }

    /// Takes a member out of rotation consideration, keeping history.
    pub fn deactivate_member(&mut self, id: MemberId) -> RepoResult<()> {
        self.repo.set_member_active(id, false)
    }

    /// Puts a previously deactivated member back into consideration.
    pub fn reinstate_member(&mut self, id: MemberId) -> RepoResult<()> {
        self.repo.set_member_active(id, true)
    }
}
