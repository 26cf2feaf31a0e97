//! In-memory port implementations for unit tests.

use crate::domain::{Assignment, CourseId, DueDate, Submission, SubmissionState};
use crate::ports::{Clock, CourseWorkService, PortError, PortResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub fn assignment(course: &str, id: &str, due_date: Option<DueDate>) -> Assignment {
    Assignment {
        id: id.to_string(),
        title: format!("Title {}", id),
        course_id: CourseId::new(course),
        due_date,
        link: format!("https://classroom.example/{}/{}", course, id),
    }
}

enum Listing {
    Ok(Vec<Assignment>),
    Fail,
}

#[derive(Default)]
pub struct FakeCourseWork {
    courses: HashMap<CourseId, (Listing, Duration)>,
    submissions: HashMap<String, Option<Vec<SubmissionState>>>,
    panicking: HashSet<String>,
    lookups: AtomicUsize,
}

impl FakeCourseWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_course(mut self, course: &str, assignments: Vec<Assignment>) -> Self {
        self.courses
            .insert(CourseId::new(course), (Listing::Ok(assignments), Duration::ZERO));
        self
    }

    /// A course whose listing only resolves after `delay`.
    pub fn with_slow_course(
        mut self,
        course: &str,
        assignments: Vec<Assignment>,
        delay: Duration,
    ) -> Self {
        self.courses
            .insert(CourseId::new(course), (Listing::Ok(assignments), delay));
        self
    }

    pub fn with_failing_course(mut self, course: &str) -> Self {
        self.courses
            .insert(CourseId::new(course), (Listing::Fail, Duration::ZERO));
        self
    }

    pub fn with_submissions(mut self, assignment_id: &str, states: Vec<SubmissionState>) -> Self {
        self.submissions.insert(assignment_id.to_string(), Some(states));
        self
    }

    pub fn with_failing_submissions(mut self, assignment_id: &str) -> Self {
        self.submissions.insert(assignment_id.to_string(), None);
        self
    }

    /// Submission lookups for `assignment_id` panic instead of returning.
    pub fn with_panicking_submissions(mut self, assignment_id: &str) -> Self {
        self.panicking.insert(assignment_id.to_string());
        self
    }

    pub fn submission_lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CourseWorkService for FakeCourseWork {
    async fn list_course_work(&self, course_id: &CourseId) -> PortResult<Vec<Assignment>> {
        match self.courses.get(course_id) {
            Some((listing, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                match listing {
                    Listing::Ok(assignments) => Ok(assignments.clone()),
                    Listing::Fail => Err(PortError::Transport("connection reset".to_string())),
                }
            }
            None => Err(PortError::NotFound(course_id.to_string())),
        }
    }

    async fn list_submissions(&self, assignment: &Assignment) -> PortResult<Vec<Submission>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.panicking.contains(&assignment.id) {
            panic!("submission lookup for {} blew up", assignment.id);
        }
        match self.submissions.get(&assignment.id) {
            Some(Some(states)) => Ok(states
                .iter()
                .enumerate()
                .map(|(i, state)| Submission {
                    id: format!("{}-s{}", assignment.id, i),
                    assignment_id: assignment.id.clone(),
                    state: state.clone(),
                })
                .collect()),
            Some(None) => Err(PortError::Unauthorized),
            None => Ok(Vec::new()),
        }
    }
}
