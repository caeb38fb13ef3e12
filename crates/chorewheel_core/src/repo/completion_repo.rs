//! Completion log queries and fairness aggregation.
//!
//! # Responsibility
//! - Read the append-only completion log.
//! - Produce the per-member fairness aggregate in one deterministic query.
//!
//! # Invariants
//! - This repository never mutates completion rows; appends happen inside
//!   the task repository's completion transaction.
//! - Report ordering is `count ASC, joined_at ASC, uuid ASC`.

use crate::model::completion::Completion;
use crate::model::group::{GroupId, MemberId};
use crate::model::task::TaskId;
use crate::repo::{ensure_schema_current, ensure_table, int_to_bool, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

/// One row of the fairness report: how much one member has contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FairnessEntry {
    pub member: MemberId,
    pub display_name: String,
    /// Completions recorded for this member in the report window.
    pub completions: u64,
}

/// Repository interface for completion history reads.
pub trait CompletionRepository {
    /// Newest-first slice of a task's completion history.
    fn recent_completions(&self, task: TaskId, limit: u32) -> RepoResult<Vec<Completion>>;
    /// Completion counts per active member since `since` (inclusive),
    /// least-contributing first.
    fn fairness_counts(&self, group: GroupId, since: i64) -> RepoResult<Vec<FairnessEntry>>;
}

/// SQLite-backed completion log reader.
pub struct SqliteCompletionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCompletionRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_current(conn)?;
        ensure_table(conn, "completions")?;
        ensure_table(conn, "members")?;
        Ok(Self { conn })
    }
}

impl CompletionRepository for SqliteCompletionRepository<'_> {
    fn recent_completions(&self, task: TaskId, limit: u32) -> RepoResult<Vec<Completion>> {
        // Soft-deleted tasks keep their history readable.
        let task_exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tasks WHERE uuid = ?1);",
            [task.to_string()],
            |row| row.get(0),
        )?;
        if task_exists == 0 {
            return Err(RepoError::TaskNotFound(task));
        }

        let mut stmt = self.conn.prepare(
            "SELECT
                uuid,
                task_uuid,
                member_uuid,
                group_uuid,
                scheduled_member_uuid,
                out_of_turn,
                completed_at
             FROM completions
             WHERE task_uuid = ?1
             ORDER BY completed_at DESC, uuid ASC
             LIMIT ?2;",
        )?;

        let mut rows = stmt.query(params![task.to_string(), i64::from(limit)])?;
        let mut completions = Vec::new();
        while let Some(row) = rows.next()? {
            completions.push(parse_completion_row(row)?);
        }

        Ok(completions)
    }

    fn fairness_counts(&self, group: GroupId, since: i64) -> RepoResult<Vec<FairnessEntry>> {
        let group_exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM groups WHERE uuid = ?1);",
            [group.to_string()],
            |row| row.get(0),
        )?;
        if group_exists == 0 {
            return Err(RepoError::GroupNotFound(group));
        }

        let mut stmt = self.conn.prepare(
            "SELECT
                m.uuid,
                m.display_name,
                COUNT(c.uuid) AS done
             FROM members m
             LEFT JOIN completions c
               ON c.member_uuid = m.uuid
              AND c.group_uuid = m.group_uuid
              AND c.completed_at >= ?2
             WHERE m.group_uuid = ?1
               AND m.is_active = 1
             GROUP BY m.uuid
             ORDER BY done ASC, m.joined_at ASC, m.uuid ASC;",
        )?;

        let mut rows = stmt.query(params![group.to_string(), since])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let member: String = row.get(0)?;
            let done: i64 = row.get(2)?;
            entries.push(FairnessEntry {
                member: parse_uuid(&member, "members.uuid")?,
                display_name: row.get(1)?,
                completions: done as u64,
            });
        }

        Ok(entries)
    }
}

fn parse_completion_row(row: &Row<'_>) -> RepoResult<Completion> {
    let uuid_text: String = row.get("uuid")?;
    let task_text: String = row.get("task_uuid")?;
    let member_text: String = row.get("member_uuid")?;
    let group_text: String = row.get("group_uuid")?;
    let scheduled_text: String = row.get("scheduled_member_uuid")?;

    Ok(Completion {
        uuid: parse_uuid(&uuid_text, "completions.uuid")?,
        task_uuid: parse_uuid(&task_text, "completions.task_uuid")?,
        member_uuid: parse_uuid(&member_text, "completions.member_uuid")?,
        group_uuid: parse_uuid(&group_text, "completions.group_uuid")?,
        scheduled_member_uuid: parse_uuid(&scheduled_text, "completions.scheduled_member_uuid")?,
        out_of_turn: int_to_bool(row.get("out_of_turn")?, "completions.out_of_turn")?,
        completed_at: row.get("completed_at")?,
    })
}
