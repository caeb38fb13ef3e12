//! Group and membership repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist groups and their member roster.
//! - Keep join-order listing deterministic for rotation defaults and
//!   fairness tie-breaks.
//!
//! # Invariants
//! - Membership is unique per `(group_uuid, user_ref)`.
//! - Member listing order is `joined_at ASC, uuid ASC`.
//! - Deactivation flips `is_active`; rows are never deleted.

use crate::model::group::{Group, GroupId, Member, MemberId, MemberRole};
use crate::repo::{
    bool_to_int, ensure_schema_current, ensure_table, int_to_bool, parse_uuid, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

pub(crate) const MEMBER_SELECT_SQL: &str = "SELECT
    uuid,
    group_uuid,
    user_ref,
    display_name,
    role,
    joined_at,
    is_active
FROM members";

const GROUP_SELECT_SQL: &str = "SELECT uuid, name, invite_code, created_at FROM groups";

/// Repository interface for group and membership operations.
pub trait GroupRepository {
    /// Creates a group and its founding member in one transaction.
    fn create_group(&mut self, group: &Group, owner: &Member) -> RepoResult<GroupId>;
    fn get_group(&self, id: GroupId) -> RepoResult<Option<Group>>;
    fn find_group_by_invite_code(&self, invite_code: &str) -> RepoResult<Option<Group>>;
    fn add_member(&mut self, member: &Member) -> RepoResult<MemberId>;
    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>>;
    /// Lists members in join order.
    fn list_members(&self, group: GroupId, include_inactive: bool) -> RepoResult<Vec<Member>>;
    fn set_member_active(&mut self, id: MemberId, active: bool) -> RepoResult<()>;
}

/// SQLite-backed group/membership repository.
pub struct SqliteGroupRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteGroupRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_schema_current(conn)?;
        ensure_table(conn, "groups")?;
        ensure_table(conn, "members")?;
        Ok(Self { conn })
    }
}

impl GroupRepository for SqliteGroupRepository<'_> {
    fn create_group(&mut self, group: &Group, owner: &Member) -> RepoResult<GroupId> {
        group.validate()?;
        owner.validate()?;
        if owner.group_uuid != group.uuid {
            return Err(RepoError::MemberNotInGroup {
                member: owner.uuid,
                group: group.uuid,
            });
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let code_taken: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM groups WHERE invite_code = ?1);",
            [group.invite_code.as_str()],
            |row| row.get(0),
        )?;
        if code_taken != 0 {
            return Err(RepoError::InviteCodeTaken(group.invite_code.clone()));
        }

        tx.execute(
            "INSERT INTO groups (uuid, name, invite_code, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                group.uuid.to_string(),
                group.name.as_str(),
                group.invite_code.as_str(),
                group.created_at,
            ],
        )?;
        insert_member(&tx, owner)?;
        tx.commit()?;

        Ok(group.uuid)
    }

    fn get_group(&self, id: GroupId) -> RepoResult<Option<Group>> {
        let row = self
            .conn
            .query_row(
                &format!("{GROUP_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                parse_group_row,
            )
            .optional()?;
        row.transpose()
    }

    fn find_group_by_invite_code(&self, invite_code: &str) -> RepoResult<Option<Group>> {
        let row = self
            .conn
            .query_row(
                &format!("{GROUP_SELECT_SQL} WHERE invite_code = ?1;"),
                [invite_code],
                parse_group_row,
            )
            .optional()?;
        row.transpose()
    }

    fn add_member(&mut self, member: &Member) -> RepoResult<MemberId> {
        member.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let group_exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM groups WHERE uuid = ?1);",
            [member.group_uuid.to_string()],
            |row| row.get(0),
        )?;
        if group_exists == 0 {
            return Err(RepoError::GroupNotFound(member.group_uuid));
        }

        let already_member: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM members WHERE group_uuid = ?1 AND user_ref = ?2
            );",
            params![member.group_uuid.to_string(), member.user_ref.to_string()],
            |row| row.get(0),
        )?;
        if already_member != 0 {
            return Err(RepoError::DuplicateMember {
                group: member.group_uuid,
                user_ref: member.user_ref,
            });
        }

        insert_member(&tx, member)?;
        tx.commit()?;

        Ok(member.uuid)
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        get_member(self.conn, id)
    }

    fn list_members(&self, group: GroupId, include_inactive: bool) -> RepoResult<Vec<Member>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMBER_SELECT_SQL}
             WHERE group_uuid = ?1
               AND (?2 = 1 OR is_active = 1)
             ORDER BY joined_at ASC, uuid ASC;"
        ))?;

        let mut rows = stmt.query(params![group.to_string(), bool_to_int(include_inactive)])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }

        Ok(members)
    }

    fn set_member_active(&mut self, id: MemberId, active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE members SET is_active = ?2 WHERE uuid = ?1;",
            params![id.to_string(), bool_to_int(active)],
        )?;

        if changed == 0 {
            return Err(RepoError::MemberNotFound(id));
        }

        Ok(())
    }
}

fn insert_member(conn: &Connection, member: &Member) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO members (
            uuid,
            group_uuid,
            user_ref,
            display_name,
            role,
            joined_at,
            is_active
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            member.uuid.to_string(),
            member.group_uuid.to_string(),
            member.user_ref.to_string(),
            member.display_name.as_str(),
            role_to_db(member.role),
            member.joined_at,
            bool_to_int(member.is_active),
        ],
    )?;
    Ok(())
}

/// Fetches one member row outside of any repository transaction.
pub(crate) fn get_member(conn: &Connection, id: MemberId) -> RepoResult<Option<Member>> {
    let row = conn
        .query_row(
            &format!("{MEMBER_SELECT_SQL} WHERE uuid = ?1;"),
            [id.to_string()],
            parse_member_row_owned,
        )
        .optional()?;
    row.transpose()
}

fn parse_group_row(row: &Row<'_>) -> rusqlite::Result<RepoResult<Group>> {
    Ok(try_parse_group_row(row))
}

fn try_parse_group_row(row: &Row<'_>) -> RepoResult<Group> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Group {
        uuid: parse_uuid(&uuid_text, "groups.uuid")?,
        name: row.get("name")?,
        invite_code: row.get("invite_code")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_member_row_owned(row: &Row<'_>) -> rusqlite::Result<RepoResult<Member>> {
    Ok(parse_member_row(row))
}

pub(crate) fn parse_member_row(row: &Row<'_>) -> RepoResult<Member> {
    let uuid_text: String = row.get("uuid")?;
    let group_text: String = row.get("group_uuid")?;
    let user_ref_text: String = row.get("user_ref")?;

    let role_text: String = row.get("role")?;
    let role = parse_role(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in members.role"))
    })?;

    Ok(Member {
        uuid: parse_uuid(&uuid_text, "members.uuid")?,
        group_uuid: parse_uuid(&group_text, "members.group_uuid")?,
        user_ref: parse_uuid(&user_ref_text, "members.user_ref")?,
        display_name: row.get("display_name")?,
        role,
        joined_at: row.get("joined_at")?,
        is_active: int_to_bool(row.get("is_active")?, "members.is_active")?,
    })
}

fn role_to_db(role: MemberRole) -> &'static str {
    match role {
        MemberRole::Admin => "admin",
        MemberRole::Member => "member",
    }
}

fn parse_role(value: &str) -> Option<MemberRole> {
    match value {
        "admin" => Some(MemberRole::Admin),
        "member" => Some(MemberRole::Member),
        _ => None,
    }
}
