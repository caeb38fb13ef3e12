//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQL details from service/business orchestration.
//!
//! # Invariants
//! - Write paths enforce model `validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repository APIs return semantic errors (`TaskNotFound`,
//!   `VersionConflict`) in addition to DB transport errors.

use crate::db::{migrations, DbError};
use crate::model::group::{GroupId, MemberId, UserRef};
use crate::model::task::TaskId;
use crate::model::ValidationError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod completion_repo;
pub mod group_repo;
pub mod task_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors surfaced by persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Validation(ValidationError),
    GroupNotFound(GroupId),
    MemberNotFound(MemberId),
    TaskNotFound(TaskId),
    /// Rotation slots may only reference members of the task's own group.
    MemberNotInGroup { member: MemberId, group: GroupId },
    /// Membership is a set: one row per `(group, user_ref)`.
    DuplicateMember { group: GroupId, user_ref: UserRef },
    InviteCodeTaken(String),
    UnknownInviteCode(String),
    /// A member can hold at most one slot per task.
    DuplicateRotationMember { task: TaskId, member: MemberId },
    MemberNotInRotation { task: TaskId, member: MemberId },
    /// Optimistic-lock mismatch on the task row.
    VersionConflict { task: TaskId },
    /// Persisted pointer does not index into the rotation list.
    CorruptPointer { task: TaskId, pointer: u32, len: u32 },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::MemberNotFound(id) => write!(f, "member not found: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::MemberNotInGroup { member, group } => {
                write!(f, "member {member} does not belong to group {group}")
            }
            Self::DuplicateMember { group, user_ref } => {
                write!(f, "identity {user_ref} is already a member of group {group}")
            }
            Self::InviteCodeTaken(code) => write!(f, "invite code `{code}` is already in use"),
            Self::UnknownInviteCode(code) => write!(f, "no group with invite code `{code}`"),
            Self::DuplicateRotationMember { task, member } => {
                write!(f, "member {member} already holds a slot in task {task}")
            }
            Self::MemberNotInRotation { task, member } => {
                write!(f, "member {member} holds no slot in task {task}")
            }
            Self::VersionConflict { task } => {
                write!(f, "concurrent rotation mutation detected on task {task}")
            }
            Self::CorruptPointer { task, pointer, len } => write!(
                f,
                "task {task} pointer {pointer} outside rotation list of length {len}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub(crate) fn ensure_schema_current(conn: &Connection) -> RepoResult<()> {
    let expected = migrations::latest_version();
    let actual = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    if actual != expected {
        return Err(RepoError::UninitializedConnection {
            expected_version: expected,
            actual_version: actual,
        });
    }
    Ok(())
}

pub(crate) fn ensure_table(conn: &Connection, table: &'static str) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(RepoError::MissingRequiredTable(table));
    }
    Ok(())
}

pub(crate) fn parse_uuid(value: &str, context: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {context}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, context: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {context}"
        ))),
    }
}
