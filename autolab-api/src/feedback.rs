//! Polling for grading results. Submissions are graded asynchronously with no
//! push channel, so the engine re-scrapes the assessment page on a bounded
//! schedule until the feedback page reports a terminal state.

use std::time::Duration;

use scraper::Html;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::assignment::AssignmentName;
use crate::client::Client;
use crate::error::{Error, Result};
use crate::preferences::Preferences;
use crate::scrape;
use crate::util;

/// Attempt budget and inter-attempt delay for the polling loop. The defaults
/// (20 attempts, 3 seconds apart) cap a poll at roughly a minute, trading
/// responsiveness against load on the grading server.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: 20,
            delay: Duration::from_secs(3),
        }
    }
}

/// Notification side-channel for per-attempt status strings. Not part of the
/// control contract; callers that don't care pass `None`.
pub type ProgressFn<'a> = &'a (dyn Fn(&str) + Send + Sync);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackStatus {
    Queued,
    InProgress,
    Completed,
    Unknown,
}

/// Classified contents of one feedback page fetch.
#[derive(Debug, Clone)]
pub struct FeedbackPage {
    status: FeedbackStatus,
    pre: Option<String>,
    results: Vec<(String, String)>,
}

impl FeedbackPage {
    pub(crate) fn new(
        status: FeedbackStatus,
        pre: Option<String>,
        results: Vec<(String, String)>,
    ) -> Self {
        Self {
            status,
            pre,
            results,
        }
    }

    pub fn status(&self) -> FeedbackStatus {
        self.status
    }

    pub fn pre(&self) -> Option<&str> {
        self.pre.as_deref()
    }

    pub fn results(&self) -> &[(String, String)] {
        &self.results
    }

    /// Grading is terminal once the page is marked completed, or once a
    /// results table shows up without any in-progress marker.
    pub fn is_terminal(&self) -> bool {
        match self.status {
            FeedbackStatus::Queued | FeedbackStatus::InProgress => false,
            FeedbackStatus::Completed => true,
            FeedbackStatus::Unknown => !self.results.is_empty(),
        }
    }
}

impl Client {
    /// Polls the assessment page until the most recent submission's feedback
    /// is terminal, then renders it as a markdown report.
    ///
    /// Transient errors within an attempt are logged and count against the
    /// attempt budget; only an exhausted budget surfaces as [`Error::Timeout`].
    #[tracing::instrument(skip(self, prefs, config, progress), err)]
    pub async fn poll_feedback(
        &self,
        name: &AssignmentName,
        prefs: &Preferences,
        config: &PollConfig,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<String> {
        let cookie = prefs.session_cookie()?;

        for attempt in 1..=config.attempts {
            match self.check_feedback(name, cookie).await {
                Ok(Some(page)) => {
                    info!(attempt, "grading finished");
                    return Ok(render_report(name, &page));
                }
                Ok(None) => debug!(attempt, "grading not finished yet"),
                Err(err) => warn!(attempt, %err, "feedback attempt failed"),
            }

            if let Some(report) = progress {
                report(&format!(
                    "Waiting for feedback... Attempt {attempt}/{}",
                    config.attempts
                ));
            }
            sleep(config.delay).await;
        }

        Err(Error::Timeout {
            attempts: config.attempts,
        })
    }

    /// One polling attempt. `Ok(None)` means no submission is visible yet or
    /// grading is still running.
    async fn check_feedback(
        &self,
        name: &AssignmentName,
        cookie: &str,
    ) -> Result<Option<FeedbackPage>> {
        let text = self
            .get_page("assessment page", &util::assessment_path(name), cookie)
            .await?;
        let link = {
            let document = Html::parse_document(&text);
            scrape::parse_feedback_link(&document)
        };
        let Some(link) = link else {
            return Ok(None);
        };

        let feedback_text = self.get_page("feedback page", &link, cookie).await?;
        let page = {
            let document = Html::parse_document(&feedback_text);
            scrape::parse_feedback_page(&document)
        };
        Ok(page.is_terminal().then_some(page))
    }
}

/// Renders the markdown feedback report handed to the display collaborator.
pub fn render_report(name: &AssignmentName, page: &FeedbackPage) -> String {
    let mut report = format!("# {name} - Feedback\n\n");

    if let Some(pre) = page.pre() {
        report.push_str("```\n");
        report.push_str(pre);
        report.push_str("\n```\n\n");
    }

    if !page.results().is_empty() {
        report.push_str("## Results\n");
        for (key, value) in page.results() {
            report.push_str(&format!("- **{key}**: {value}\n"));
        }
        report.push('\n');
    }

    if page.pre().is_none() && page.results().is_empty() {
        report.push_str("_No detailed feedback found._\n");
    }

    report
}
