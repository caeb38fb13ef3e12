//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep outer API layers decoupled from storage details.

pub mod group_service;
pub mod report_service;
pub mod rotation_service;
pub mod task_service;
