//! crates/coursework_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any HTTP client or serialization format.

use chrono::NaiveDate;
use std::fmt;

/// An opaque course identifier, as accepted by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CourseId(String);

impl CourseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CourseId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A due date exactly as the remote service reports it.
///
/// The components are kept raw so that an impossible date surfaces as a
/// parse failure at check time instead of being silently dropped on fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DueDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Converts into a calendar date, or `None` if the components do not name a real day.
    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl From<NaiveDate> for DueDate {
    fn from(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self::new(date.year(), date.month(), date.day())
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// A coursework item. Fetched fresh on every run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub id: String,
    pub title: String,
    pub course_id: CourseId,
    pub due_date: Option<DueDate>,
    pub link: String,
}

impl fmt::Display for Assignment {
    /// Renders the console line: `<title> (<id>) link:<url>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) link:{}", self.title, self.id, self.link)
    }
}

/// State tag of a student submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Unspecified,
    New,
    Created,
    TurnedIn,
    Returned,
    ReclaimedByStudent,
    Other(String),
}

impl SubmissionState {
    /// Parses the wire tag used by the remote service (e.g. `TURNED_IN`).
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "SUBMISSION_STATE_UNSPECIFIED" | "" => Self::Unspecified,
            "NEW" => Self::New,
            "CREATED" => Self::Created,
            "TURNED_IN" => Self::TurnedIn,
            "RETURNED" => Self::Returned,
            "RECLAIMED_BY_STUDENT" => Self::ReclaimedByStudent,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A student's submission record for one assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: String,
    pub assignment_id: String,
    pub state: SubmissionState,
}

impl Submission {
    pub fn is_turned_in(&self) -> bool {
        self.state == SubmissionState::TurnedIn
    }
}
