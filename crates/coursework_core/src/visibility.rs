//! crates/coursework_core/src/visibility.rs
//!
//! Decides whether a single assignment is still actionable: not overdue and
//! not already turned in by the current user.

use crate::domain::{Assignment, DueDate};
use crate::ports::{Clock, CourseWorkService, PortError};
use tracing::{debug, instrument};

/// Outcome of a visibility check for one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Still open and not turned in; should be reported.
    Visible,
    /// Effective due date is strictly before today.
    Overdue,
    /// At least one submission record is in the turned-in state.
    TurnedIn,
}

impl Verdict {
    /// The boolean "should report" decision.
    pub fn is_visible(self) -> bool {
        matches!(self, Verdict::Visible)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VisibilityError {
    #[error("Assignment {assignment_id} has an invalid due date {due_date}")]
    InvalidDueDate {
        assignment_id: String,
        due_date: DueDate,
    },
    #[error("Submission lookup failed for assignment {assignment_id}: {source}")]
    SubmissionLookup {
        assignment_id: String,
        #[source]
        source: PortError,
    },
}

/// Checks one assignment against the date rule and then its submission records.
///
/// An assignment without a due date is treated as due today, so the date rule
/// never excludes it. The remote service is only consulted when the date rule
/// passes.
#[instrument(
    name = "check_visibility",
    skip_all,
    fields(course_id = %assignment.course_id, assignment_id = %assignment.id)
)]
pub async fn check_visibility(
    service: &dyn CourseWorkService,
    clock: &dyn Clock,
    assignment: &Assignment,
) -> Result<Verdict, VisibilityError> {
    let today = clock.today();
    let effective = assignment.due_date.unwrap_or_else(|| DueDate::from(today));
    let due = effective
        .to_naive()
        .ok_or_else(|| VisibilityError::InvalidDueDate {
            assignment_id: assignment.id.clone(),
            due_date: effective,
        })?;

    if due < today {
        debug!(%due, %today, "Assignment is overdue.");
        return Ok(Verdict::Overdue);
    }

    let submissions = service
        .list_submissions(assignment)
        .await
        .map_err(|source| VisibilityError::SubmissionLookup {
            assignment_id: assignment.id.clone(),
            source,
        })?;

    if submissions.iter().any(|s| s.is_turned_in()) {
        debug!("Assignment already turned in.");
        return Ok(Verdict::TurnedIn);
    }

    Ok(Verdict::Visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SubmissionState;
    use crate::testing::{assignment, FakeCourseWork, FixedClock};
    use chrono::NaiveDate;

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap())
    }

    #[tokio::test]
    async fn overdue_assignment_is_hidden_without_lookup() {
        let service = FakeCourseWork::new().with_submissions("a1", vec![]);
        let a1 = assignment("C1", "a1", Some(DueDate::new(2026, 10, 16)));

        let verdict = check_visibility(&service, &clock(), &a1).await.unwrap();

        assert_eq!(verdict, Verdict::Overdue);
        assert!(!verdict.is_visible());
        assert_eq!(service.submission_lookups(), 0);
    }

    #[tokio::test]
    async fn overdue_wins_even_when_lookup_would_fail() {
        let service = FakeCourseWork::new().with_failing_submissions("a1");
        let a1 = assignment("C1", "a1", Some(DueDate::new(2025, 1, 1)));

        let verdict = check_visibility(&service, &clock(), &a1).await.unwrap();

        assert_eq!(verdict, Verdict::Overdue);
    }

    #[tokio::test]
    async fn due_today_or_later_without_turn_in_is_visible() {
        let service = FakeCourseWork::new()
            .with_submissions("today", vec![SubmissionState::Created])
            .with_submissions("later", vec![SubmissionState::New, SubmissionState::Returned]);

        let today = assignment("C1", "today", Some(DueDate::new(2026, 10, 17)));
        let later = assignment("C1", "later", Some(DueDate::new(2027, 1, 5)));

        assert_eq!(
            check_visibility(&service, &clock(), &today).await.unwrap(),
            Verdict::Visible
        );
        assert_eq!(
            check_visibility(&service, &clock(), &later).await.unwrap(),
            Verdict::Visible
        );
    }

    #[tokio::test]
    async fn turned_in_submission_hides_assignment() {
        let service = FakeCourseWork::new()
            .with_submissions("a2", vec![SubmissionState::Created, SubmissionState::TurnedIn]);
        let a2 = assignment("C1", "a2", Some(DueDate::new(2026, 12, 1)));

        let verdict = check_visibility(&service, &clock(), &a2).await.unwrap();

        assert_eq!(verdict, Verdict::TurnedIn);
    }

    #[tokio::test]
    async fn missing_due_date_never_fails_the_date_rule() {
        let service = FakeCourseWork::new()
            .with_submissions("open", vec![])
            .with_submissions("done", vec![SubmissionState::TurnedIn]);

        let open = assignment("C1", "open", None);
        let done = assignment("C1", "done", None);

        assert_eq!(
            check_visibility(&service, &clock(), &open).await.unwrap(),
            Verdict::Visible
        );
        assert_eq!(
            check_visibility(&service, &clock(), &done).await.unwrap(),
            Verdict::TurnedIn
        );
        assert_eq!(service.submission_lookups(), 2);
    }

    #[tokio::test]
    async fn invalid_due_date_is_an_error() {
        let service = FakeCourseWork::new();
        let bad = assignment("C1", "bad", Some(DueDate::new(2026, 13, 40)));

        let err = check_visibility(&service, &clock(), &bad).await.unwrap_err();

        assert!(matches!(err, VisibilityError::InvalidDueDate { .. }));
    }

    #[tokio::test]
    async fn submission_lookup_failure_is_reported() {
        let service = FakeCourseWork::new().with_failing_submissions("a3");
        let a3 = assignment("C1", "a3", None);

        let err = check_visibility(&service, &clock(), &a3).await.unwrap_err();

        assert!(matches!(err, VisibilityError::SubmissionLookup { .. }));
    }
}
