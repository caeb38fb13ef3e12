//! Core domain logic for chorewheel, a household chore-rotation backend.
//! This crate is the single source of truth for rotation invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::completion::{Completion, CompletionId};
pub use model::group::{Group, GroupId, Member, MemberId, MemberRole, UserRef};
pub use model::rotation::{Rotation, RotationSlot};
pub use model::task::{Cadence, Task, TaskId};
pub use model::ValidationError;
pub use repo::completion_repo::{CompletionRepository, FairnessEntry, SqliteCompletionRepository};
pub use repo::group_repo::{GroupRepository, SqliteGroupRepository};
pub use repo::task_repo::{SqliteTaskRepository, TaskRecord, TaskRepository};
pub use repo::{RepoError, RepoResult};
pub use service::group_service::{CreateGroupRequest, GroupService};
pub use service::report_service::ReportService;
pub use service::rotation_service::{
    RotationError, RotationErrorKind, RotationResult, RotationService,
};
pub use service::task_service::{CreateTaskRequest, TaskService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
