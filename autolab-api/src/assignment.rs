use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

/// Score shown while the grader has picked up a submission but not finished.
pub const GRADING_IN_PROGRESS: &str = "Grading in progress";

/// Score assigned when the gradebook has no entry for an assignment.
pub const NO_GRADE: &str = "No grade";

/// One assessment scraped from the course page, merged with its gradebook
/// entry and local download state. Rebuilt from scratch on every fetch; no
/// identity is carried across scrape cycles.
#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    name: AssignmentName,
    due_date: String,
    writeup_url: Url,
    download_url: Url,
    score: String,
    is_downloaded: bool,
}

impl Assignment {
    pub fn new(name: AssignmentName, due_date: String, writeup_url: Url, download_url: Url) -> Self {
        Self {
            name,
            due_date,
            writeup_url,
            download_url,
            score: String::new(),
            is_downloaded: false,
        }
    }

    pub fn name(&self) -> &AssignmentName {
        &self.name
    }

    pub fn due_date(&self) -> &str {
        &self.due_date
    }

    pub fn writeup_url(&self) -> &Url {
        &self.writeup_url
    }

    pub fn download_url(&self) -> &Url {
        &self.download_url
    }

    /// Empty when the gradebook was unavailable at scrape time.
    pub fn score(&self) -> &str {
        &self.score
    }

    pub fn is_downloaded(&self) -> bool {
        self.is_downloaded
    }

    pub fn is_graded(&self) -> bool {
        !self.score.is_empty() && self.score != NO_GRADE
    }
}

/// Merges scraped grades into scraped assessments by name, and annotates each
/// assignment with whether its folder exists under the workspace root right
/// now. Only called when the gradebook fetch succeeded; on a failed gradebook
/// fetch the whole merge is skipped and scores stay empty.
pub fn correlate(
    assignments: &mut [Assignment],
    grades: &HashMap<AssignmentName, String>,
    workspace: &Path,
) {
    for assignment in assignments {
        assignment.score = grades
            .get(&assignment.name)
            .cloned()
            .unwrap_or_else(|| NO_GRADE.to_owned());
        assignment.is_downloaded = workspace.join(assignment.name.as_str()).exists();
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentName {
    name: String,
}

impl AssignmentName {
    pub fn new(name: String) -> Self {
        Self { name }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for AssignmentName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.name.fmt(f)
    }
}
