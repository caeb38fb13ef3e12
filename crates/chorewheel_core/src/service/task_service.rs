//! Task lifecycle use-case service.
//!
//! # Responsibility
//! - Provide create/get/list/soft-delete entry points for tasks.
//! - Delegate persistence and rotation defaulting to the task repository.

use crate::model::group::{GroupId, MemberId};
use crate::model::task::{Cadence, Task, TaskId};
use crate::repo::task_repo::{TaskRecord, TaskRepository};
use crate::repo::{RepoError, RepoResult};

/// Request model for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    pub group: GroupId,
    pub name: String,
    pub emoji: Option<String>,
    pub category: Option<String>,
    pub cadence: Cadence,
    /// Explicit turn order. Empty means every active group member in join
    /// order.
    pub rotation: Vec<MemberId>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Use-case service wrapper for task CRUD operations.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a task and returns it with its initial rotation state.
    pub fn create_task(&mut self, request: &CreateTaskRequest) -> RepoResult<TaskRecord> {
        let mut task = Task::new(
            request.group,
            request.name.clone(),
            request.cadence,
            request.created_at,
        );
        task.emoji = request.emoji.clone();
        task.category = request.category.clone();

        let id = self.repo.create_task(&task, &request.rotation)?;
        self.repo.get_task(id, false)?.ok_or_else(|| {
            RepoError::InvalidData(format!("task {id} missing immediately after create"))
        })
    }

    /// Gets one task with its rotation state.
    pub fn get_task(&self, id: TaskId, include_inactive: bool) -> RepoResult<Option<TaskRecord>> {
        self.repo.get_task(id, include_inactive)
    }

    /// Lists a group's tasks, newest first.
    pub fn list_tasks(&self, group: GroupId, include_inactive: bool) -> RepoResult<Vec<Task>> {
        self.repo.list_tasks(group, include_inactive)
    }

    /// Soft-deletes a task; completion history is preserved.
    pub fn soft_delete_task(&mut self, id: TaskId) -> RepoResult<()> {
        self.repo.soft_delete_task(id)
    }
}
