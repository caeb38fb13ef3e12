//! Fairness reporting use-cases.
//!
//! # Responsibility
//! - Aggregate the completion log into contribution reports.

use crate::model::completion::Completion;
use crate::model::group::GroupId;
use crate::model::task::TaskId;
use crate::repo::completion_repo::{CompletionRepository, FairnessEntry};
use crate::repo::RepoResult;

/// Use-case service wrapper over the completion log.
pub struct ReportService<R: CompletionRepository> {
    repo: R,
}

impl<R: CompletionRepository> ReportService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Completion counts per active member since `since` (inclusive),
    /// least-contributing first; ties break by join order.
    ///
    /// Counts follow the actual actor, not the scheduled assignee, so
    /// out-of-turn work is credited to whoever did it.
    pub fn fairness_report(&self, group: GroupId, since: i64) -> RepoResult<Vec<FairnessEntry>> {
        self.repo.fairness_counts(group, since)
    }

    /// Newest-first slice of a task's completion history.
    pub fn task_history(&self, task: TaskId, limit: u32) -> RepoResult<Vec<Completion>> {
        self.repo.recent_completions(task, limit)
    }
}
