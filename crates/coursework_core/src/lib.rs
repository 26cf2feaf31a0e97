pub mod aggregator;
pub mod domain;
pub mod lister;
pub mod ports;
pub mod visibility;

#[cfg(test)]
mod testing;

pub use aggregator::{print_assignments, report, Report, ReportError};
pub use domain::{Assignment, CourseId, DueDate, Submission, SubmissionState};
pub use lister::{AssignmentLister, FailurePolicy, ListerError, RunSummary};
pub use ports::{Clock, CourseWorkService, PortError, PortResult};
pub use visibility::{check_visibility, Verdict, VisibilityError};
