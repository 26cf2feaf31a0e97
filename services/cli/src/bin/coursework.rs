//! services/cli/src/bin/coursework.rs

use cli_lib::{
    adapters::{authorize, ClassroomAdapter, OAuthClient, SystemClock, TokenStore},
    config::Config,
    error::CliError,
    telemetry,
};
use coursework_core::{report, AssignmentLister};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    telemetry::init(&config)?;
    info!(
        "Configuration loaded. {} courses, max concurrency {}, policy {:?}.",
        config.course_ids.len(),
        config.max_concurrency,
        config.failure_policy
    );

    // --- 2. Obtain Credentials ---
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| CliError::Internal(format!("Failed to build HTTP client: {}", e)))?;
    let oauth_client = OAuthClient::from_file(&config.client_secret_path)?;
    let tokens = authorize(oauth_client, http.clone(), TokenStore::new(&config.token_path)).await?;
    info!("Authorized against the Classroom API.");

    // --- 3. Initialize Service Adapters ---
    let classroom = Arc::new(ClassroomAdapter::new(
        http,
        config.api_base_url.clone(),
        Arc::new(tokens),
    ));
    let lister = AssignmentLister::new(
        classroom,
        Arc::new(SystemClock),
        config.max_concurrency,
        config.failure_policy,
    );

    // --- 4. Fan Out, Print as Results Arrive ---
    let mut stdout = std::io::stdout().lock();
    let outcome = report(
        &lister,
        config.course_ids.clone(),
        &mut stdout,
        CancellationToken::new(),
    )
    .await?;

    let summary = &outcome.summary;
    info!(
        "Printed {} assignments ({} checked, {} overdue, {} turned in).",
        outcome.printed, summary.assignments_checked, summary.overdue, summary.turned_in
    );
    for (assignment_id, reason) in &summary.failed_checks {
        warn!("Skipped assignment {} after a failed check: {}", assignment_id, reason);
    }
    if !summary.failed_courses.is_empty() {
        for (course_id, reason) in &summary.failed_courses {
            warn!("Could not list course {}: {}", course_id, reason);
        }
        return Err(CliError::Internal(format!(
            "{} of {} courses could not be listed",
            summary.failed_courses.len(),
            config.course_ids.len()
        )));
    }

    Ok(())
}
