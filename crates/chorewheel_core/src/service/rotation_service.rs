//! Rotation engine use-cases.
//!
//! # Responsibility
//! - Answer whose turn a task is on and advance turns on completion or
//!   skip.
//! - Keep the completion log and rotation pointer consistent as one unit.
//! - Re-run an operation once when an optimistic-lock conflict is
//!   detected, then surface it.
//!
//! # Invariants
//! - The pointer advances `(p + 1) % len` on every complete/skip, no
//!   matter who actually did the work.
//! - Completions record the actual actor; acting out of turn is metadata,
//!   never an error.
//! - Mutations commit fully or not at all.

use crate::model::completion::Completion;
use crate::model::group::{GroupId, Member, MemberId};
use crate::model::task::TaskId;
use crate::repo::task_repo::{TaskRecord, TaskRepository};
use crate::repo::RepoError;
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RotationResult<T> = Result<T, RotationError>;

/// Caller-facing classification of rotation failures, one-to-one with the
/// transport layer's status families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationErrorKind {
    /// Referenced task/member is missing or belongs to another group.
    NotFound,
    /// Rotation state cannot satisfy the operation.
    InvalidState,
    /// Optimistic-lock mismatch that survived one automatic retry.
    Conflict,
    /// Storage-layer failure unrelated to rotation semantics.
    Storage,
}

/// Errors from rotation engine operations.
#[derive(Debug)]
pub enum RotationError {
    TaskNotFound(TaskId),
    MemberNotFound(MemberId),
    /// The member exists but belongs to a different group than the task.
    WrongGroup { member: MemberId, group: GroupId },
    EmptyRotation(TaskId),
    /// Persisted pointer does not index into the rotation list.
    CorruptPointer {
        task: TaskId,
        pointer: u32,
        len: u32,
    },
    AlreadyInRotation { task: TaskId, member: MemberId },
    NotInRotation { task: TaskId, member: MemberId },
    /// Every slot holder is deactivated; there is nobody to skip to.
    NoActiveMembers(TaskId),
    /// Concurrent mutation survived the automatic retry.
    Conflict(TaskId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl RotationError {
    /// Classifies this error for transport mapping.
    pub fn kind(&self) -> RotationErrorKind {
        match self {
            Self::TaskNotFound(_)
            | Self::MemberNotFound(_)
            | Self::WrongGroup { .. }
            | Self::NotInRotation { .. } => RotationErrorKind::NotFound,
            Self::EmptyRotation(_)
            | Self::CorruptPointer { .. }
            | Self::AlreadyInRotation { .. }
            | Self::NoActiveMembers(_) => RotationErrorKind::InvalidState,
            Self::Conflict(_) => RotationErrorKind::Conflict,
            Self::Repo(_) => RotationErrorKind::Storage,
        }
    }

    fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl Display for RotationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::MemberNotFound(id) => write!(f, "member not found: {id}"),
            Self::WrongGroup { member, group } => {
                write!(f, "member {member} does not belong to group {group}")
            }
            Self::EmptyRotation(id) => write!(f, "task {id} has an empty rotation list"),
            Self::CorruptPointer { task, pointer, len } => write!(
                f,
                "task {task} pointer {pointer} outside rotation list of length {len}"
            ),
            Self::AlreadyInRotation { task, member } => {
                write!(f, "member {member} already holds a slot in task {task}")
            }
            Self::NotInRotation { task, member } => {
                write!(f, "member {member} holds no slot in task {task}")
            }
            Self::NoActiveMembers(id) => {
                write!(f, "task {id} has no active members left in rotation")
            }
            Self::Conflict(id) => {
                write!(f, "concurrent rotation mutation on task {id} after retry")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RotationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RotationError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::TaskNotFound(task) => Self::TaskNotFound(task),
            RepoError::MemberNotFound(member) => Self::MemberNotFound(member),
            RepoError::MemberNotInGroup { member, group } => Self::WrongGroup { member, group },
            RepoError::MemberNotInRotation { task, member } => Self::NotInRotation { task, member },
            RepoError::DuplicateRotationMember { task, member } => {
                Self::AlreadyInRotation { task, member }
            }
            RepoError::VersionConflict { task } => Self::Conflict(task),
            RepoError::CorruptPointer { task, pointer, len } => {
                Self::CorruptPointer { task, pointer, len }
            }
            other => Self::Repo(other),
        }
    }
}

/// The rotation engine: deterministic, auditable turn-taking over a task's
/// rotation list.
pub struct RotationService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> RotationService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the member whose turn it currently is.
    pub fn current_assignee(&self, task: TaskId) -> RotationResult<Member> {
        let record = self.load(task)?;
        let slot = record
            .rotation
            .current()
            .ok_or(RotationError::EmptyRotation(task))?;
        self.member(slot.member)
    }

    /// Records a completion and advances the turn.
    ///
    /// The acting member need not be the scheduled assignee: the engine
    /// records who actually did the work, flags the mismatch, and still
    /// advances to the next scheduled person so the long-run order is
    /// preserved.
    pub fn complete(
        &mut self,
        task: TaskId,
        acting_member: MemberId,
        completed_at: i64,
    ) -> RotationResult<Completion> {
        self.retry_on_conflict(|service| service.try_complete(task, acting_member, completed_at))
    }

    /// Advances the turn without recording a completion.
    ///
    /// Used when the scheduled member is deactivated.
    pub fn skip(&mut self, task: TaskId) -> RotationResult<Member> {
        self.retry_on_conflict(|service| service.try_skip(task))
    }

    /// Appends a member at the back of the queue.
    ///
    /// New members never jump ahead of people who have waited, and the
    /// current assignee is unaffected.
    pub fn add_to_rotation(&mut self, task: TaskId, member: MemberId) -> RotationResult<()> {
        self.retry_on_conflict(|service| service.try_add(task, member))
    }

    /// Removes a member's slot, keeping relative order for the rest.
    pub fn remove_from_rotation(&mut self, task: TaskId, member: MemberId) -> RotationResult<()> {
        self.retry_on_conflict(|service| service.try_remove(task, member))
    }

    /// Replaces the whole rotation order in one step.
    pub fn set_rotation(&mut self, task: TaskId, members: &[MemberId]) -> RotationResult<()> {
        self.retry_on_conflict(|service| service.try_set_rotation(task, members))
    }

    fn try_complete(
        &mut self,
        task: TaskId,
        acting_member: MemberId,
        completed_at: i64,
    ) -> RotationResult<Completion> {
        let record = self.load(task)?;
        let actor = self.member(acting_member)?;
        if actor.group_uuid != record.task.group_uuid {
            return Err(RotationError::WrongGroup {
                member: acting_member,
                group: record.task.group_uuid,
            });
        }

        let scheduled = record
            .rotation
            .current()
            .ok_or(RotationError::EmptyRotation(task))?;
        let next = record
            .rotation
            .advanced_pointer()
            .ok_or(RotationError::EmptyRotation(task))?;

        let completion = Completion::new(
            task,
            acting_member,
            record.task.group_uuid,
            scheduled.member,
            completed_at,
        );
        self.repo
            .record_completion(&completion, record.task.rotation_version, next)?;

        info!(
            "event=task_completed module=rotation status=ok task={task} actor={acting_member} out_of_turn={} pointer={next}",
            completion.out_of_turn
        );
        Ok(completion)
    }

    fn try_skip(&mut self, task: TaskId) -> RotationResult<Member> {
        let record = self.load(task)?;
        if !record.rotation.has_active_member() {
            return Err(RotationError::NoActiveMembers(task));
        }
        let next = match record.rotation.advanced_pointer() {
            Some(next) => next,
            None => return Err(RotationError::NoActiveMembers(task)),
        };

        self.repo
            .set_pointer(task, record.task.rotation_version, next)?;

        let slot = match record.rotation.slots().get(next as usize) {
            Some(slot) => *slot,
            None => {
                return Err(RotationError::CorruptPointer {
                    task,
                    pointer: next,
                    len: record.rotation.len(),
                })
            }
        };
        info!("event=task_skipped module=rotation status=ok task={task} pointer={next}");
        self.member(slot.member)
    }

    fn try_add(&mut self, task: TaskId, member: MemberId) -> RotationResult<()> {
        let record = self.load(task)?;
        let added = self.member(member)?;
        if added.group_uuid != record.task.group_uuid {
            return Err(RotationError::WrongGroup {
                member,
                group: record.task.group_uuid,
            });
        }
        if record.rotation.contains(member) {
            return Err(RotationError::AlreadyInRotation { task, member });
        }

        self.repo
            .append_rotation_slot(task, member, record.task.rotation_version)?;
        info!("event=rotation_member_added module=rotation status=ok task={task} member={member}");
        Ok(())
    }

    fn try_remove(&mut self, task: TaskId, member: MemberId) -> RotationResult<()> {
        let record = self.load(task)?;
        let position = record
            .rotation
            .position_of(member)
            .ok_or(RotationError::NotInRotation { task, member })?;
        let next = record.rotation.pointer_after_removal(position);

        self.repo
            .remove_rotation_slot(task, member, record.task.rotation_version, next)?;
        info!(
            "event=rotation_member_removed module=rotation status=ok task={task} member={member} pointer={next}"
        );
        Ok(())
    }

    fn try_set_rotation(&mut self, task: TaskId, members: &[MemberId]) -> RotationResult<()> {
        let record = self.load(task)?;

        let mut seen = HashSet::new();
        for slot_member in members {
            if !seen.insert(*slot_member) {
                return Err(RotationError::AlreadyInRotation {
                    task,
                    member: *slot_member,
                });
            }
            let loaded = self.member(*slot_member)?;
            if loaded.group_uuid != record.task.group_uuid {
                return Err(RotationError::WrongGroup {
                    member: *slot_member,
                    group: record.task.group_uuid,
                });
            }
        }

        let next = record.rotation.pointer_after_replacement(members);
        self.repo
            .replace_rotation(task, members, record.task.rotation_version, next)?;
        info!(
            "event=rotation_replaced module=rotation status=ok task={task} len={} pointer={next}",
            members.len()
        );
        Ok(())
    }

    fn load(&self, task: TaskId) -> RotationResult<TaskRecord> {
        self.repo
            .get_task(task, false)?
            .ok_or(RotationError::TaskNotFound(task))
    }

    fn member(&self, id: MemberId) -> RotationResult<Member> {
        self.repo
            .get_member(id)?
            .ok_or(RotationError::MemberNotFound(id))
    }

    // One automatic re-read and re-attempt on optimistic-lock conflicts;
    // a second conflict surfaces to the caller.
    fn retry_on_conflict<T>(
        &mut self,
        mut op: impl FnMut(&mut Self) -> RotationResult<T>,
    ) -> RotationResult<T> {
        match op(self) {
            Err(err) if err.is_conflict() => {
                warn!("event=rotation_conflict module=rotation status=retry error={err}");
                op(self)
            }
            other => other,
        }
    }
}
