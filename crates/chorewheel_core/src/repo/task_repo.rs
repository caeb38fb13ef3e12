//! Task and rotation repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist tasks, their ordered rotation slots and the current pointer.
//! - Apply every rotation mutation as one atomic, version-guarded
//!   transaction (completion append included).
//!
//! # Invariants
//! - Slot positions are dense `0..len` and listed `position ASC`.
//! - Rotation slots only reference members of the task's own group.
//! - Any write touching pointer or slots bumps `rotation_version`; stale
//!   writers get `VersionConflict`, never a lost update.

use crate::model::completion::Completion;
use crate::model::group::{GroupId, Member, MemberId};
use crate::model::rotation::{Rotation, RotationSlot};
use crate::model::task::{Cadence, Task, TaskId};
use crate::repo::group_repo::get_member;
use crate::repo::{
    bool_to_int, ensure_schema_current, ensure_table, int_to_bool, parse_uuid, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashSet;

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    group_uuid,
    name,
    emoji,
    category,
    cadence,
    cadence_days,
    rotation_pointer,
    rotation_version,
    created_at,
    is_active
FROM tasks";

/// Task row joined with its rotation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub task: Task,
    pub rotation: Rotation,
}

/// Repository interface for task and rotation persistence.
pub trait TaskRepository {
    /// Creates a task with an explicit rotation order, or every active
    /// group member in join order when `rotation` is empty.
    fn create_task(&mut self, task: &Task, rotation: &[MemberId]) -> RepoResult<TaskId>;
    fn get_task(&self, id: TaskId, include_inactive: bool) -> RepoResult<Option<TaskRecord>>;
    fn list_tasks(&self, group: GroupId, include_inactive: bool) -> RepoResult<Vec<Task>>;
    fn soft_delete_task(&mut self, id: TaskId) -> RepoResult<()>;
    /// Member lookup for cross-group validation of rotation writes.
    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>>;
    /// Appends a completion and moves the pointer as one atomic unit.
    fn record_completion(
        &mut self,
        completion: &Completion,
        expected_version: i64,
        new_pointer: u32,
    ) -> RepoResult<()>;
    /// Moves the pointer without recording a completion.
    fn set_pointer(
        &mut self,
        task: TaskId,
        expected_version: i64,
        new_pointer: u32,
    ) -> RepoResult<()>;
    fn append_rotation_slot(
        &mut self,
        task: TaskId,
        member: MemberId,
        expected_version: i64,
    ) -> RepoResult<()>;
    fn remove_rotation_slot(
        &mut self,
        task: TaskId,
        member: MemberId,
        expected_version: i64,
        new_pointer: u32,
    ) -> RepoResult<()>;
    fn replace_rotation(
        &mut self,
        task: TaskId,
        rotation: &[MemberId],
        expected_version: i64,
        new_pointer: u32,
    ) -> RepoResult<()>;
}

/// SQLite-backed task/rotation repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_schema_current(conn)?;
        ensure_table(conn, "tasks")?;
        ensure_table(conn, "rotation_slots")?;
        ensure_table(conn, "members")?;
        ensure_table(conn, "completions")?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&mut self, task: &Task, rotation: &[MemberId]) -> RepoResult<TaskId> {
        task.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let group_exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM groups WHERE uuid = ?1);",
            [task.group_uuid.to_string()],
            |row| row.get(0),
        )?;
        if group_exists == 0 {
            return Err(RepoError::GroupNotFound(task.group_uuid));
        }

        let (cadence, cadence_days) = cadence_to_db(task.cadence);
        tx.execute(
            "INSERT INTO tasks (
                uuid,
                group_uuid,
                name,
                emoji,
                category,
                cadence,
                cadence_days,
                rotation_pointer,
                rotation_version,
                created_at,
                is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                task.uuid.to_string(),
                task.group_uuid.to_string(),
                task.name.as_str(),
                task.emoji.as_deref(),
                task.category.as_deref(),
                cadence,
                cadence_days,
                task.rotation_pointer,
                task.rotation_version,
                task.created_at,
                bool_to_int(task.is_active),
            ],
        )?;

        if rotation.is_empty() {
            insert_default_rotation(&tx, task.uuid, task.group_uuid)?;
        } else {
            insert_explicit_rotation(&tx, task.uuid, task.group_uuid, rotation)?;
        }

        tx.commit()?;
        Ok(task.uuid)
    }

    fn get_task(&self, id: TaskId, include_inactive: bool) -> RepoResult<Option<TaskRecord>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "{TASK_SELECT_SQL}
                     WHERE uuid = ?1
                       AND (?2 = 1 OR is_active = 1);"
                ),
                params![id.to_string(), bool_to_int(include_inactive)],
                |row| Ok(parse_task_row(row)),
            )
            .optional()?;

        let task = match row.transpose()? {
            Some(task) => task,
            None => return Ok(None),
        };

        let slots = load_rotation_slots(self.conn, id)?;
        let len = slots.len() as u32;
        let rotation =
            Rotation::new(slots, task.rotation_pointer).map_err(|err| RepoError::CorruptPointer {
                task: id,
                pointer: err.pointer,
                len,
            })?;

        Ok(Some(TaskRecord { task, rotation }))
    }

    fn list_tasks(&self, group: GroupId, include_inactive: bool) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE group_uuid = ?1
               AND (?2 = 1 OR is_active = 1)
             ORDER BY created_at DESC, uuid ASC;"
        ))?;

        let mut rows = stmt.query(params![group.to_string(), bool_to_int(include_inactive)])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }

        Ok(tasks)
    }

    fn soft_delete_task(&mut self, id: TaskId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks SET is_active = 0 WHERE uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::TaskNotFound(id));
        }

        Ok(())
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        get_member(self.conn, id)
    }

    fn record_completion(
        &mut self,
        completion: &Completion,
        expected_version: i64,
        new_pointer: u32,
    ) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO completions (
                uuid,
                task_uuid,
                member_uuid,
                group_uuid,
                scheduled_member_uuid,
                out_of_turn,
                completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                completion.uuid.to_string(),
                completion.task_uuid.to_string(),
                completion.member_uuid.to_string(),
                completion.group_uuid.to_string(),
                completion.scheduled_member_uuid.to_string(),
                bool_to_int(completion.out_of_turn),
                completion.completed_at,
            ],
        )?;
        guarded_pointer_update(&tx, completion.task_uuid, expected_version, new_pointer)?;

        tx.commit()?;
        Ok(())
    }

    fn set_pointer(
        &mut self,
        task: TaskId,
        expected_version: i64,
        new_pointer: u32,
    ) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        guarded_pointer_update(&tx, task, expected_version, new_pointer)?;
        tx.commit()?;
        Ok(())
    }

    fn append_rotation_slot(
        &mut self,
        task: TaskId,
        member: MemberId,
        expected_version: i64,
    ) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let group = task_group(&tx, task)?;
        ensure_member_in_group(&tx, member, group)?;

        let holds_slot: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM rotation_slots WHERE task_uuid = ?1 AND member_uuid = ?2
            );",
            params![task.to_string(), member.to_string()],
            |row| row.get(0),
        )?;
        if holds_slot != 0 {
            return Err(RepoError::DuplicateRotationMember { task, member });
        }

        tx.execute(
            "INSERT INTO rotation_slots (task_uuid, position, member_uuid)
             VALUES (
                ?1,
                (SELECT COUNT(*) FROM rotation_slots WHERE task_uuid = ?1),
                ?2
             );",
            params![task.to_string(), member.to_string()],
        )?;
        bump_version(&tx, task, expected_version)?;

        tx.commit()?;
        Ok(())
    }

    fn remove_rotation_slot(
        &mut self,
        task: TaskId,
        member: MemberId,
        expected_version: i64,
        new_pointer: u32,
    ) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut remaining = rotation_member_ids(&tx, task)?;
        let before = remaining.len();
        remaining.retain(|slot_member| *slot_member != member);
        if remaining.len() == before {
            return Err(RepoError::MemberNotInRotation { task, member });
        }

        rewrite_slots(&tx, task, &remaining)?;
        guarded_pointer_update(&tx, task, expected_version, new_pointer)?;

        tx.commit()?;
        Ok(())
    }

    fn replace_rotation(
        &mut self,
        task: TaskId,
        rotation: &[MemberId],
        expected_version: i64,
        new_pointer: u32,
    ) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let group = task_group(&tx, task)?;
        let mut seen = HashSet::new();
        for slot_member in rotation {
            if !seen.insert(*slot_member) {
                return Err(RepoError::DuplicateRotationMember {
                    task,
                    member: *slot_member,
                });
            }
            ensure_member_in_group(&tx, *slot_member, group)?;
        }

        rewrite_slots(&tx, task, rotation)?;
        guarded_pointer_update(&tx, task, expected_version, new_pointer)?;

        tx.commit()?;
        Ok(())
    }
}

fn insert_default_rotation(tx: &Transaction<'_>, task: TaskId, group: GroupId) -> RepoResult<()> {
    let mut stmt = tx.prepare(
        "SELECT uuid FROM members
         WHERE group_uuid = ?1 AND is_active = 1
         ORDER BY joined_at ASC, uuid ASC;",
    )?;
    let mut rows = stmt.query([group.to_string()])?;

    let mut position = 0u32;
    while let Some(row) = rows.next()? {
        let member: String = row.get(0)?;
        tx.execute(
            "INSERT INTO rotation_slots (task_uuid, position, member_uuid)
             VALUES (?1, ?2, ?3);",
            params![task.to_string(), position, member],
        )?;
        position += 1;
    }

    Ok(())
}

fn insert_explicit_rotation(
    tx: &Transaction<'_>,
    task: TaskId,
    group: GroupId,
    rotation: &[MemberId],
) -> RepoResult<()> {
    let mut seen = HashSet::new();
    for (position, slot_member) in rotation.iter().enumerate() {
        if !seen.insert(*slot_member) {
            return Err(RepoError::DuplicateRotationMember {
                task,
                member: *slot_member,
            });
        }
        ensure_member_in_group(tx, *slot_member, group)?;
        tx.execute(
            "INSERT INTO rotation_slots (task_uuid, position, member_uuid)
             VALUES (?1, ?2, ?3);",
            params![task.to_string(), position as u32, slot_member.to_string()],
        )?;
    }

    Ok(())
}

fn task_group(tx: &Transaction<'_>, task: TaskId) -> RepoResult<GroupId> {
    let group: Option<String> = tx
        .query_row(
            "SELECT group_uuid FROM tasks WHERE uuid = ?1;",
            [task.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    match group {
        Some(group) => parse_uuid(&group, "tasks.group_uuid"),
        None => Err(RepoError::TaskNotFound(task)),
    }
}

fn ensure_member_in_group(
    tx: &Transaction<'_>,
    member: MemberId,
    group: GroupId,
) -> RepoResult<()> {
    let member_group: Option<String> = tx
        .query_row(
            "SELECT group_uuid FROM members WHERE uuid = ?1;",
            [member.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    match member_group {
        Some(member_group) => {
            if parse_uuid(&member_group, "members.group_uuid")? == group {
                Ok(())
            } else {
                Err(RepoError::MemberNotInGroup { member, group })
            }
        }
        None => Err(RepoError::MemberNotFound(member)),
    }
}

fn rotation_member_ids(tx: &Transaction<'_>, task: TaskId) -> RepoResult<Vec<MemberId>> {
    let mut stmt = tx.prepare(
        "SELECT member_uuid FROM rotation_slots
         WHERE task_uuid = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([task.to_string()])?;

    let mut members = Vec::new();
    while let Some(row) = rows.next()? {
        let member: String = row.get(0)?;
        members.push(parse_uuid(&member, "rotation_slots.member_uuid")?);
    }

    Ok(members)
}

// Whole-list rewrite keeps positions dense without transiently violating
// the (task_uuid, position) primary key.
fn rewrite_slots(tx: &Transaction<'_>, task: TaskId, rotation: &[MemberId]) -> RepoResult<()> {
    tx.execute(
        "DELETE FROM rotation_slots WHERE task_uuid = ?1;",
        [task.to_string()],
    )?;
    for (position, slot_member) in rotation.iter().enumerate() {
        tx.execute(
            "INSERT INTO rotation_slots (task_uuid, position, member_uuid)
             VALUES (?1, ?2, ?3);",
            params![task.to_string(), position as u32, slot_member.to_string()],
        )?;
    }
    Ok(())
}

fn guarded_pointer_update(
    tx: &Transaction<'_>,
    task: TaskId,
    expected_version: i64,
    new_pointer: u32,
) -> RepoResult<()> {
    let changed = tx.execute(
        "UPDATE tasks
         SET rotation_pointer = ?2, rotation_version = rotation_version + 1
         WHERE uuid = ?1 AND rotation_version = ?3;",
        params![task.to_string(), new_pointer, expected_version],
    )?;

    if changed == 1 {
        return Ok(());
    }
    stale_or_missing(tx, task)
}

fn bump_version(tx: &Transaction<'_>, task: TaskId, expected_version: i64) -> RepoResult<()> {
    let changed = tx.execute(
        "UPDATE tasks
         SET rotation_version = rotation_version + 1
         WHERE uuid = ?1 AND rotation_version = ?2;",
        params![task.to_string(), expected_version],
    )?;

    if changed == 1 {
        return Ok(());
    }
    stale_or_missing(tx, task)
}

fn stale_or_missing(tx: &Transaction<'_>, task: TaskId) -> RepoResult<()> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM tasks WHERE uuid = ?1);",
        [task.to_string()],
        |row| row.get(0),
    )?;
    if exists == 0 {
        Err(RepoError::TaskNotFound(task))
    } else {
        Err(RepoError::VersionConflict { task })
    }
}

fn load_rotation_slots(conn: &Connection, task: TaskId) -> RepoResult<Vec<RotationSlot>> {
    let mut stmt = conn.prepare(
        "SELECT rs.member_uuid, m.is_active
         FROM rotation_slots rs
         JOIN members m ON m.uuid = rs.member_uuid
         WHERE rs.task_uuid = ?1
         ORDER BY rs.position ASC;",
    )?;
    let mut rows = stmt.query([task.to_string()])?;

    let mut slots = Vec::new();
    while let Some(row) = rows.next()? {
        let member: String = row.get(0)?;
        slots.push(RotationSlot {
            member: parse_uuid(&member, "rotation_slots.member_uuid")?,
            active: int_to_bool(row.get(1)?, "members.is_active")?,
        });
    }

    Ok(slots)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let uuid_text: String = row.get("uuid")?;
    let group_text: String = row.get("group_uuid")?;

    let cadence_text: String = row.get("cadence")?;
    let cadence_days: Option<i64> = row.get("cadence_days")?;
    let cadence = parse_cadence(&cadence_text, cadence_days).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid cadence `{cadence_text}`/{cadence_days:?} in tasks.cadence"
        ))
    })?;

    Ok(Task {
        uuid: parse_uuid(&uuid_text, "tasks.uuid")?,
        group_uuid: parse_uuid(&group_text, "tasks.group_uuid")?,
        name: row.get("name")?,
        emoji: row.get("emoji")?,
        category: row.get("category")?,
        cadence,
        rotation_pointer: row.get("rotation_pointer")?,
        rotation_version: row.get("rotation_version")?,
        created_at: row.get("created_at")?,
        is_active: int_to_bool(row.get("is_active")?, "tasks.is_active")?,
    })
}

fn cadence_to_db(cadence: Cadence) -> (&'static str, Option<i64>) {
    match cadence {
        Cadence::OnCompletion => ("on_completion", None),
        Cadence::EveryDays(days) => ("every_days", Some(i64::from(days))),
    }
}

fn parse_cadence(kind: &str, days: Option<i64>) -> Option<Cadence> {
    match (kind, days) {
        ("on_completion", None) => Some(Cadence::OnCompletion),
        ("every_days", Some(days)) if days >= 1 => Some(Cadence::EveryDays(days as u32)),
        _ => None,
    }
}
