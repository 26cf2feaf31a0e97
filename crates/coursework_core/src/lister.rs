//! crates/coursework_core/src/lister.rs
//!
//! The fan-out half of the pipeline: one task per course, one nested task per
//! assignment, with visible assignments published onto a shared channel.
//!
//! A course task only finishes after every assignment check it spawned has
//! joined, and `run` only returns after every course task has joined. The
//! channel therefore closes exactly once, when the last sender clone drops.

use crate::domain::{Assignment, CourseId};
use crate::ports::{Clock, CourseWorkService, PortError};
use crate::visibility::{check_visibility, Verdict, VisibilityError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc::UnboundedSender, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// What to do when listing a course fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Cancel all in-flight work and fail the run.
    #[default]
    FailFast,
    /// Record the failure and let the remaining courses finish.
    Continue,
}

#[derive(Debug, thiserror::Error)]
pub enum ListerError {
    #[error("Failed to list coursework for course {course_id}: {source}")]
    Retrieval {
        course_id: CourseId,
        #[source]
        source: PortError,
    },
    #[error("The run was cancelled before all courses finished")]
    Cancelled,
    #[error("A worker task failed: {0}")]
    Join(String),
}

/// Counters for one run, so that "skipped because of an error" stays
/// distinguishable from "skipped because overdue or turned in".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub courses_listed: usize,
    pub assignments_checked: usize,
    pub visible: usize,
    pub overdue: usize,
    pub turned_in: usize,
    /// Courses whose listing failed under `FailurePolicy::Continue`.
    pub failed_courses: Vec<(CourseId, String)>,
    /// Assignments whose check failed, by assignment id.
    pub failed_checks: Vec<(String, String)>,
}

impl RunSummary {
    fn record(&mut self, report: CourseReport) {
        self.courses_listed += 1;
        self.assignments_checked += report.checked;
        self.visible += report.visible;
        self.overdue += report.overdue;
        self.turned_in += report.turned_in;
        self.failed_checks.extend(report.failed_checks);
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_courses.is_empty() || !self.failed_checks.is_empty()
    }
}

#[derive(Debug, Default)]
struct CourseReport {
    checked: usize,
    visible: usize,
    overdue: usize,
    turned_in: usize,
    failed_checks: Vec<(String, String)>,
}

enum CourseFailure {
    Listing(PortError),
    Cancelled,
}

/// Lists assignments for many courses concurrently and filters them for visibility.
#[derive(Clone)]
pub struct AssignmentLister {
    service: Arc<dyn CourseWorkService>,
    clock: Arc<dyn Clock>,
    permits: Arc<Semaphore>,
    policy: FailurePolicy,
}

impl AssignmentLister {
    /// Creates a lister that allows at most `max_concurrency` remote calls in flight.
    pub fn new(
        service: Arc<dyn CourseWorkService>,
        clock: Arc<dyn Clock>,
        max_concurrency: usize,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            service,
            clock,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            policy,
        }
    }

    /// Runs the fan-out over `course_ids`, sending every visible assignment on `sender`.
    ///
    /// `sender` is consumed; the receiving side sees the channel close once all
    /// course and assignment tasks are done (or aborted).
    pub async fn run(
        &self,
        course_ids: Vec<CourseId>,
        sender: UnboundedSender<Assignment>,
        cancel: CancellationToken,
    ) -> Result<RunSummary, ListerError> {
        let started = Instant::now();
        info!("Listing coursework for {} courses.", course_ids.len());

        let mut courses = JoinSet::new();
        for course_id in course_ids {
            let lister = self.clone();
            let sender = sender.clone();
            let cancel = cancel.clone();
            courses.spawn(async move {
                let outcome = lister.process_course(&course_id, sender, &cancel).await;
                (course_id, outcome)
            });
        }
        drop(sender);

        let mut summary = RunSummary::default();
        while let Some(joined) = courses.join_next().await {
            match joined {
                Ok((_, Ok(report))) => summary.record(report),
                Ok((_, Err(CourseFailure::Cancelled))) => {}
                Ok((course_id, Err(CourseFailure::Listing(source)))) => match self.policy {
                    FailurePolicy::FailFast => {
                        error!(
                            %course_id,
                            error = %source,
                            "Failed to list coursework; cancelling the run."
                        );
                        cancel.cancel();
                        courses.abort_all();
                        return Err(ListerError::Retrieval { course_id, source });
                    }
                    FailurePolicy::Continue => {
                        warn!(
                            %course_id,
                            error = %source,
                            "Failed to list coursework; skipping course."
                        );
                        summary.failed_courses.push((course_id, source.to_string()));
                    }
                },
                Err(e) => {
                    error!("Course task failed: {}", e);
                    cancel.cancel();
                    courses.abort_all();
                    return Err(ListerError::Join(e.to_string()));
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(ListerError::Cancelled);
        }

        info!("⏱️ Listing all courses took: {:?}", started.elapsed());
        Ok(summary)
    }

    #[instrument(name = "list_course_work", skip_all, fields(course_id = %course_id))]
    async fn process_course(
        &self,
        course_id: &CourseId,
        sender: UnboundedSender<Assignment>,
        cancel: &CancellationToken,
    ) -> Result<CourseReport, CourseFailure> {
        let started = Instant::now();
        let assignments = {
            let _permit = self.acquire(cancel).await.ok_or(CourseFailure::Cancelled)?;
            tokio::select! {
                _ = cancel.cancelled() => return Err(CourseFailure::Cancelled),
                listed = self.service.list_course_work(course_id) => match listed {
                    Ok(assignments) => assignments,
                    Err(source) => {
                        if self.policy == FailurePolicy::FailFast {
                            // Stop siblings before the failure is even joined.
                            cancel.cancel();
                        }
                        return Err(CourseFailure::Listing(source));
                    }
                }
            }
        };

        let mut report = CourseReport::default();
        if assignments.is_empty() {
            debug!("Course has no coursework.");
            return Ok(report);
        }
        debug!("Checking {} assignments.", assignments.len());

        let mut checks = JoinSet::new();
        let mut task_assignments = HashMap::new();
        for assignment in assignments {
            let assignment_id = assignment.id.clone();
            let lister = self.clone();
            let sender = sender.clone();
            let cancel = cancel.clone();
            let handle = checks.spawn(async move {
                let outcome = lister.check(&assignment, &cancel).await;
                if let Some(Ok(Verdict::Visible)) = outcome {
                    if sender.send(assignment.clone()).is_err() {
                        debug!("Receiver is gone; dropping visible assignment.");
                    }
                }
                (assignment.id, outcome)
            });
            task_assignments.insert(handle.id(), assignment_id);
        }
        drop(sender);

        while let Some(joined) = checks.join_next().await {
            let (assignment_id, outcome) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    let assignment_id = task_assignments
                        .remove(&e.id())
                        .unwrap_or_else(|| course_id.to_string());
                    warn!(%assignment_id, "Visibility task failed: {}", e);
                    report.checked += 1;
                    report.failed_checks.push((assignment_id, e.to_string()));
                    continue;
                }
            };
            match outcome {
                Some(Ok(verdict)) => {
                    report.checked += 1;
                    match verdict {
                        Verdict::Visible => report.visible += 1,
                        Verdict::Overdue => report.overdue += 1,
                        Verdict::TurnedIn => report.turned_in += 1,
                    }
                }
                Some(Err(e)) => {
                    report.checked += 1;
                    warn!(
                        %assignment_id,
                        error = %e,
                        "Visibility check failed; assignment skipped."
                    );
                    report.failed_checks.push((assignment_id, e.to_string()));
                }
                None => return Err(CourseFailure::Cancelled),
            }
        }

        info!("⏱️ Course {} took: {:?}", course_id, started.elapsed());
        Ok(report)
    }

    /// Runs one visibility check under a permit. `None` means the run was cancelled.
    async fn check(
        &self,
        assignment: &Assignment,
        cancel: &CancellationToken,
    ) -> Option<Result<Verdict, VisibilityError>> {
        let _permit = self.acquire(cancel).await?;
        tokio::select! {
            _ = cancel.cancelled() => None,
            verdict = check_visibility(self.service.as_ref(), self.clock.as_ref(), assignment) => {
                Some(verdict)
            }
        }
    }

    async fn acquire(&self, cancel: &CancellationToken) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            _ = cancel.cancelled() => None,
            permit = self.permits.clone().acquire_owned() => permit.ok(),
        }
    }
}
