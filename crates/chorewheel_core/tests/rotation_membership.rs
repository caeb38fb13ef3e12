use chorewheel_core::db::open_db_in_memory;
use chorewheel_core::{
    Cadence, CreateGroupRequest, CreateTaskRequest, GroupId, GroupService, MemberId,
    RotationError, RotationErrorKind, RotationService, SqliteGroupRepository,
    SqliteTaskRepository, TaskId, TaskRepository, TaskService,
};
use rusqlite::Connection;
use uuid::Uuid;

fn seed_group(
    conn: &mut Connection,
    invite_code: &str,
    names: &[&str],
) -> (GroupId, Vec<MemberId>) {
    let repo = SqliteGroupRepository::try_new(conn).unwrap();
    let mut service = GroupService::new(repo);
    let (group, owner) = service
        .create_group(&CreateGroupRequest {
            name: "shared house".to_string(),
            invite_code: invite_code.to_string(),
            owner_user_ref: Uuid::new_v4(),
            owner_display_name: names[0].to_string(),
            created_at: 1_000,
        })
        .unwrap();

    let mut members = vec![owner.uuid];
    for (offset, name) in names.iter().enumerate().skip(1) {
        let member = service
            .join_group(invite_code, Uuid::new_v4(), *name, 1_000 + offset as i64)
            .unwrap();
        members.push(member.uuid);
    }
    (group.uuid, members)
}

fn seed_task(conn: &mut Connection, group: GroupId, rotation: &[MemberId]) -> TaskId {
    let repo = SqliteTaskRepository::try_new(conn).unwrap();
    let mut service = TaskService::new(repo);
    let record = service
        .create_task(&CreateTaskRequest {
            group,
            name: "take out bins".to_string(),
            emoji: None,
            category: None,
            cadence: Cadence::OnCompletion,
            rotation: rotation.to_vec(),
            created_at: 2_000,
        })
        .unwrap();
    record.task.uuid
}

fn rotation_members(conn: &mut Connection, task: TaskId) -> Vec<MemberId> {
    let repo = SqliteTaskRepository::try_new(conn).unwrap();
    let record = repo.get_task(task, false).unwrap().unwrap();
    record
        .rotation
        .slots()
        .iter()
        .map(|slot| slot.member)
        .collect()
}

#[test]
fn insertion_appends_to_the_back_and_keeps_the_current_assignee() {
    let mut conn = open_db_in_memory().unwrap();
    let (group, members) = seed_group(&mut conn, "SPIN0001", &["alice", "bob", "carol", "dora"]);
    let (alice, bob, carol, dora) = (members[0], members[1], members[2], members[3]);
    let task = seed_task(&mut conn, group, &[alice, bob, carol]);

    {
        let mut engine = RotationService::new(SqliteTaskRepository::try_new(&mut conn).unwrap());
        engine.complete(task, alice, 10).unwrap();
        assert_eq!(engine.current_assignee(task).unwrap().uuid, bob);

        engine.add_to_rotation(task, dora).unwrap();
        assert_eq!(engine.current_assignee(task).unwrap().uuid, bob);
    }

    assert_eq!(rotation_members(&mut conn, task), vec![alice, bob, carol, dora]);
}

#[test]
fn insertion_rejects_duplicates_and_foreign_members() {
    let mut conn = open_db_in_memory().unwrap();
    let (group, members) = seed_group(&mut conn, "SPIN0002", &["alice", "bob"]);
    let (_other_group, other_members) = seed_group(&mut conn, "SPIN0003", &["zoe"]);
    let task = seed_task(&mut conn, group, &[]);

    let mut engine = RotationService::new(SqliteTaskRepository::try_new(&mut conn).unwrap());

    let err = engine.add_to_rotation(task, members[0]).unwrap_err();
    assert!(matches!(err, RotationError::AlreadyInRotation { .. }));
    assert_eq!(err.kind(), RotationErrorKind::InvalidState);

    let err = engine.add_to_rotation(task, other_members[0]).unwrap_err();
    assert!(matches!(err, RotationError::WrongGroup { .. }));
    assert_eq!(err.kind(), RotationErrorKind::NotFound);

    let err = engine.add_to_rotation(task, Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, RotationError::MemberNotFound(_)));
}

#[test]
fn removing_a_slot_before_the_pointer_shifts_it_down() {
    let mut conn = open_db_in_memory().unwrap();
    let (group, members) = seed_group(&mut conn, "SPIN0004", &["alice", "bob", "carol"]);
    let (alice, bob, carol) = (members[0], members[1], members[2]);
    let task = seed_task(&mut conn, group, &[alice, bob, carol]);

    {
        let mut engine = RotationService::new(SqliteTaskRepository::try_new(&mut conn).unwrap());
        engine.complete(task, alice, 10).unwrap();
        assert_eq!(engine.current_assignee(task).unwrap().uuid, bob);

        engine.remove_from_rotation(task, alice).unwrap();
        assert_eq!(engine.current_assignee(task).unwrap().uuid, bob);
    }

    assert_eq!(rotation_members(&mut conn, task), vec![bob, carol]);
}

#[test]
fn removing_the_current_assignee_promotes_the_next_in_original_order() {
    let mut conn = open_db_in_memory().unwrap();
    let (group, members) = seed_group(&mut conn, "SPIN0005", &["alice", "bob", "carol"]);
    let (alice, bob, carol) = (members[0], members[1], members[2]);
    let task = seed_task(&mut conn, group, &[alice, bob, carol]);

    let mut engine = RotationService::new(SqliteTaskRepository::try_new(&mut conn).unwrap());
    engine.complete(task, alice, 10).unwrap();
    assert_eq!(engine.current_assignee(task).unwrap().uuid, bob);

    // [alice, bob, carol] with bob current: removing bob leaves
    // [alice, carol] with carol current, not alice.
    engine.remove_from_rotation(task, bob).unwrap();
    assert_eq!(engine.current_assignee(task).unwrap().uuid, carol);
}

#[test]
fn removing_the_current_assignee_at_the_tail_wraps_to_the_front() {
    let mut conn = open_db_in_memory().unwrap();
    let (group, members) = seed_group(&mut conn, "SPIN0006", &["alice", "bob", "carol"]);
    let (alice, bob, carol) = (members[0], members[1], members[2]);
    let task = seed_task(&mut conn, group, &[alice, bob, carol]);

    let mut engine = RotationService::new(SqliteTaskRepository::try_new(&mut conn).unwrap());
    engine.complete(task, alice, 10).unwrap();
    engine.complete(task, bob, 20).unwrap();
    assert_eq!(engine.current_assignee(task).unwrap().uuid, carol);

    engine.remove_from_rotation(task, carol).unwrap();
    assert_eq!(engine.current_assignee(task).unwrap().uuid, alice);
}

#[test]
fn removing_a_slot_after_the_pointer_keeps_the_current_assignee() {
    let mut conn = open_db_in_memory().unwrap();
    let (group, members) = seed_group(&mut conn, "SPIN0007", &["alice", "bob", "carol"]);
    let (alice, _bob, carol) = (members[0], members[1], members[2]);
    let task = seed_task(&mut conn, group, &[]);

    let mut engine = RotationService::new(SqliteTaskRepository::try_new(&mut conn).unwrap());
    engine.remove_from_rotation(task, carol).unwrap();
    assert_eq!(engine.current_assignee(task).unwrap().uuid, alice);
}

#[test]
fn removing_a_member_without_a_slot_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let (group, members) = seed_group(&mut conn, "SPIN0008", &["alice", "bob", "carol"]);
    let task = seed_task(&mut conn, group, &[members[0], members[1]]);

    let mut engine = RotationService::new(SqliteTaskRepository::try_new(&mut conn).unwrap());
    let err = engine.remove_from_rotation(task, members[2]).unwrap_err();

    assert!(matches!(err, RotationError::NotInRotation { .. }));
    assert_eq!(err.kind(), RotationErrorKind::NotFound);
}

#[test]
fn removing_the_last_slot_leaves_an_unassignable_task() {
    let mut conn = open_db_in_memory().unwrap();
    let (group, members) = seed_group(&mut conn, "SPIN0009", &["alice"]);
    let task = seed_task(&mut conn, group, &[]);

    let mut engine = RotationService::new(SqliteTaskRepository::try_new(&mut conn).unwrap());
    engine.remove_from_rotation(task, members[0]).unwrap();

    let err = engine.current_assignee(task).unwrap_err();
    assert!(matches!(err, RotationError::EmptyRotation(_)));
}

#[test]
fn replacement_preserves_the_current_assignee_when_still_listed() {
    let mut conn = open_db_in_memory().unwrap();
    let (group, members) = seed_group(&mut conn, "SPIN0010", &["alice", "bob", "carol"]);
    let (alice, bob, carol) = (members[0], members[1], members[2]);
    let task = seed_task(&mut conn, group, &[alice, bob, carol]);

    let mut engine = RotationService::new(SqliteTaskRepository::try_new(&mut conn).unwrap());
    engine.complete(task, alice, 10).unwrap();
    assert_eq!(engine.current_assignee(task).unwrap().uuid, bob);

    engine.set_rotation(task, &[carol, bob, alice]).unwrap();
    assert_eq!(engine.current_assignee(task).unwrap().uuid, bob);
}

#[test]
fn replacement_clamps_the_pointer_when_the_current_assignee_is_dropped() {
    let mut conn = open_db_in_memory().unwrap();
    let (group, members) = seed_group(&mut conn, "SPIN0011", &["alice", "bob", "carol"]);
    let (alice, bob, carol) = (members[0], members[1], members[2]);
    let task = seed_task(&mut conn, group, &[alice, bob, carol]);

    let mut engine = RotationService::new(SqliteTaskRepository::try_new(&mut conn).unwrap());
    engine.complete(task, alice, 10).unwrap();
    assert_eq!(engine.current_assignee(task).unwrap().uuid, bob);

    engine.set_rotation(task, &[alice, carol]).unwrap();
    assert_eq!(engine.current_assignee(task).unwrap().uuid, carol);
}

#[test]
fn replacement_rejects_duplicates_and_foreign_members() {
    let mut conn = open_db_in_memory().unwrap();
    let (group, members) = seed_group(&mut conn, "SPIN0012", &["alice", "bob"]);
    let (_other_group, other_members) = seed_group(&mut conn, "SPIN0013", &["zoe"]);
    let task = seed_task(&mut conn, group, &[]);

    let mut engine = RotationService::new(SqliteTaskRepository::try_new(&mut conn).unwrap());

    let err = engine
        .set_rotation(task, &[members[0], members[0]])
        .unwrap_err();
    assert!(matches!(err, RotationError::AlreadyInRotation { .. }));

    let err = engine
        .set_rotation(task, &[members[0], other_members[0]])
        .unwrap_err();
    assert!(matches!(err, RotationError::WrongGroup { .. }));
}
