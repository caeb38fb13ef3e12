//! Task domain model.
//!
//! # Responsibility
//! - Define chores shared within one group.
//! - Carry the persisted rotation pointer and its optimistic-lock counter.
//!
//! # Invariants
//! - `rotation_pointer` is only advanced by the rotation engine.
//! - `rotation_version` increases on every rotation mutation.
//! - Deletion is a soft flag; completion history survives it.

use crate::model::group::GroupId;
use crate::model::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// Recurrence cadence attached to a task.
///
/// Cadence is descriptive metadata: the rotation advances only on an
/// explicit complete or skip, never on a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Due again as soon as it is completed.
    OnCompletion,
    /// Recurs every `n` days.
    EveryDays(u32),
}

/// Chore belonging to exactly one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub uuid: TaskId,
    pub group_uuid: GroupId,
    pub name: String,
    /// Unicode emoji shown next to the task name.
    pub emoji: Option<String>,
    /// Free-form label such as `cleaning` or `pets`.
    pub category: Option<String>,
    pub cadence: Cadence,
    /// Index into the rotation list of whose turn it is.
    pub rotation_pointer: u32,
    /// Optimistic-lock counter bumped by every rotation mutation.
    pub rotation_version: i64,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Soft delete flag.
    pub is_active: bool,
}

impl Task {
    /// Creates a new task with a generated stable ID and the pointer at the
    /// front of the rotation.
    pub fn new(
        group_uuid: GroupId,
        name: impl Into<String>,
        cadence: Cadence,
        created_at: i64,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            group_uuid,
            name: name.into(),
            emoji: None,
            category: None,
            cadence,
            rotation_pointer: 0,
            rotation_version: 0,
            created_at,
            is_active: true,
        }
    }

    /// Marks this task as deleted without touching its history.
    pub fn soft_delete(&mut self) {
        self.is_active = false;
    }

    /// Checks task fields against model invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyTaskName);
        }
        if self.cadence == Cadence::EveryDays(0) {
            return Err(ValidationError::ZeroCadenceInterval);
        }
        Ok(())
    }
}
