//! services/cli/src/adapters/classroom.rs
//!
//! This module contains the adapter for the Google Classroom REST API.
//! It implements the `CourseWorkService` port from the `core` crate.

use crate::adapters::oauth::TokenSource;
use async_trait::async_trait;
use coursework_core::domain::{Assignment, CourseId, DueDate, Submission, SubmissionState};
use coursework_core::ports::{CourseWorkService, PortError, PortResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

const PAGE_SIZE: &str = "100";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CourseWorkService` over the Classroom v1 REST API.
#[derive(Clone)]
pub struct ClassroomAdapter {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenSource>,
}

impl ClassroomAdapter {
    /// Creates a new `ClassroomAdapter`. `base_url` has no trailing slash.
    pub fn new(http: reqwest::Client, base_url: String, tokens: Arc<TokenSource>) -> Self {
        Self {
            http,
            base_url,
            tokens,
        }
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
        page_token: Option<&str>,
    ) -> PortResult<T> {
        let access_token = self.tokens.access_token().await.map_err(|e| {
            warn!("Could not obtain an access token: {}", e);
            PortError::Unauthorized
        })?;

        let mut query = vec![("pageSize", PAGE_SIZE)];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| PortError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, %body, "Classroom API returned an error.");
            return Err(match status.as_u16() {
                401 | 403 => PortError::Unauthorized,
                404 => PortError::NotFound(url.to_string()),
                code => PortError::Unexpected(format!("{} returned {}: {}", url, code, body)),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Invalid response from {}: {}", url, e)))
    }
}

//=========================================================================================
// "Impure" API Record Structs
//=========================================================================================

/// One page of a paginated listing.
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

/// Fetches pages until the service stops returning a continuation token.
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> PortResult<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = PortResult<Page<T>>>,
{
    let mut items = Vec::new();
    let mut page_token = None;
    loop {
        let page = fetch(page_token.take()).await?;
        items.extend(page.items);
        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => return Ok(items),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseWorkPage {
    #[serde(default)]
    course_work: Vec<CourseWorkRecord>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseWorkRecord {
    id: String,
    course_id: String,
    #[serde(default)]
    title: String,
    due_date: Option<DateRecord>,
    #[serde(default)]
    alternate_link: String,
}

#[derive(Deserialize)]
struct DateRecord {
    #[serde(default)]
    year: i32,
    #[serde(default)]
    month: u32,
    #[serde(default)]
    day: u32,
}

impl CourseWorkRecord {
    fn to_domain(self) -> Assignment {
        Assignment {
            id: self.id,
            title: self.title,
            course_id: CourseId::new(self.course_id),
            due_date: self.due_date.map(|d| DueDate::new(d.year, d.month, d.day)),
            link: self.alternate_link,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionPage {
    #[serde(default)]
    student_submissions: Vec<SubmissionRecord>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionRecord {
    id: String,
    course_work_id: String,
    #[serde(default)]
    state: String,
}

impl SubmissionRecord {
    fn to_domain(self) -> Submission {
        Submission {
            id: self.id,
            assignment_id: self.course_work_id,
            state: SubmissionState::from_tag(&self.state),
        }
    }
}

//=========================================================================================
// `CourseWorkService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CourseWorkService for ClassroomAdapter {
    async fn list_course_work(&self, course_id: &CourseId) -> PortResult<Vec<Assignment>> {
        let url = format!("{}/v1/courses/{}/courseWork", self.base_url, course_id);
        let records = collect_pages(|page_token| {
            let url = url.clone();
            async move {
                let page: CourseWorkPage = self.get_page(&url, page_token.as_deref()).await?;
                Ok(Page {
                    items: page.course_work,
                    next_page_token: page.next_page_token,
                })
            }
        })
        .await?;

        Ok(records.into_iter().map(CourseWorkRecord::to_domain).collect())
    }

    async fn list_submissions(&self, assignment: &Assignment) -> PortResult<Vec<Submission>> {
        let url = format!(
            "{}/v1/courses/{}/courseWork/{}/studentSubmissions",
            self.base_url, assignment.course_id, assignment.id
        );
        let records = collect_pages(|page_token| {
            let url = url.clone();
            async move {
                let page: SubmissionPage = self.get_page(&url, page_token.as_deref()).await?;
                Ok(Page {
                    items: page.student_submissions,
                    next_page_token: page.next_page_token,
                })
            }
        })
        .await?;

        Ok(records.into_iter().map(SubmissionRecord::to_domain).collect())
    }
}
