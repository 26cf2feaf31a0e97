//! crates/coursework_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the remote course provider and of the wall clock.

use async_trait::async_trait;
use chrono::NaiveDate;
use crate::domain::{Assignment, CourseId, Submission};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., HTTP, OAuth).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait CourseWorkService: Send + Sync {
    /// Lists every coursework item of a course, following pagination to the end.
    async fn list_course_work(&self, course_id: &CourseId) -> PortResult<Vec<Assignment>>;

    /// Lists the submission records the current user can see for one assignment.
    async fn list_submissions(&self, assignment: &Assignment) -> PortResult<Vec<Submission>>;
}

/// Source of "today". Injected so the visibility rule can be tested deterministically.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}
