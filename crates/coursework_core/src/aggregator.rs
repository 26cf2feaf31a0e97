//! crates/coursework_core/src/aggregator.rs
//!
//! The fan-in half of the pipeline: a single consumer that prints visible
//! assignments as they arrive, plus the coordinator that wires producer and
//! consumer together for one run.

use crate::domain::{Assignment, CourseId};
use crate::lister::{AssignmentLister, ListerError, RunSummary};
use std::collections::HashSet;
use std::io::Write;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Lister(#[from] ListerError),
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct Report {
    pub printed: usize,
    pub summary: RunSummary,
}

/// Drains `receiver`, writing one line per unique assignment to `out`.
///
/// Returns once the channel is closed, or as soon as `cancel` fires. Items
/// still queued at cancellation are not printed.
pub async fn print_assignments<W: Write>(
    mut receiver: UnboundedReceiver<Assignment>,
    out: &mut W,
    cancel: &CancellationToken,
) -> std::io::Result<usize> {
    let mut seen: HashSet<(CourseId, String)> = HashSet::new();
    let mut printed = 0;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Printer cancelled after {} lines.", printed);
                break;
            }
            next = receiver.recv() => next,
        };
        let Some(assignment) = next else {
            break;
        };
        if !seen.insert((assignment.course_id.clone(), assignment.id.clone())) {
            debug!(assignment_id = %assignment.id, "Duplicate assignment ignored.");
            continue;
        }
        writeln!(out, "{}", assignment)?;
        out.flush()?;
        printed += 1;
    }

    Ok(printed)
}

/// Runs the lister in its own task and prints its output on the current one.
///
/// The channel closes only after every producer is done, so the printer never
/// stops early on a successful run. On a fail-fast error the token is cancelled
/// and the printer stops before writing anything else.
pub async fn report<W: Write>(
    lister: &AssignmentLister,
    course_ids: Vec<CourseId>,
    out: &mut W,
    cancel: CancellationToken,
) -> Result<Report, ReportError> {
    let (sender, receiver) = mpsc::unbounded_channel();
    let producer = {
        let lister = lister.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { lister.run(course_ids, sender, cancel).await })
    };

    let printed = match print_assignments(receiver, out, &cancel).await {
        Ok(printed) => printed,
        Err(e) => {
            cancel.cancel();
            match producer.await {
                Ok(Ok(_)) | Ok(Err(ListerError::Cancelled)) => {}
                Ok(Err(lister_error)) => {
                    warn!(error = %lister_error, "Lister also failed after output broke.")
                }
                Err(join_error) => warn!("Lister task failed after output broke: {}", join_error),
            }
            return Err(e.into());
        }
    };

    let summary = producer
        .await
        .map_err(|e| ListerError::Join(e.to_string()))??;

    Ok(Report { printed, summary })
}
