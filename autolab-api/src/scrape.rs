//! Selector-driven parsers for the course site's pages. The markup is
//! unversioned and brittle, so every parser tolerates missing nodes by
//! skipping the item instead of failing.

use std::collections::HashMap;

use scraper::{ElementRef, Html};
use url::Url;

use crate::assignment::{Assignment, AssignmentName, GRADING_IN_PROGRESS};
use crate::feedback::{FeedbackPage, FeedbackStatus};
use crate::util::{DOWNLOAD_SERVICE_PATH, text};

macro_rules! selectors {
    ($name:ident = $x:expr $(,)?) => {
        lazy_static::lazy_static! { static ref $name: scraper::Selector = scraper::Selector::parse($x).unwrap(); }
    };

    ($name:ident = $x:expr, $($names:ident = $xs:expr),+ $(,)?) => {
        selectors! { $name = $x }
        selectors! {
            $($names = $xs),+
        }
    };
}

selectors! {
    ASSESSMENT_COLLECTION = ".collection.red.darken-4.date",
    COLLECTION_ITEM = "a.collection-item",
    NEW_BADGE = "span.new.badge",
    DUE_DATE = "p.date",
    GRADE_ROW = ".category table.grades tr",
    TD = "td",
    A = "a",
    IN_PROGRESS_ICON = "i",
    NOT_YET_SUBMITTED = ".not-yet-submitted",
    AUTHENTICITY_TOKEN = "input[name='authenticity_token']",
    SUBMISSION_ROW = "tbody tr",
    FEEDBACK_LINK = "td a[href*='viewFeedback']",
    FEEDBACK_IN_PROGRESS = ".feedback-status__inprogress",
    FEEDBACK_QUEUED = ".feedback-status__queued",
    FEEDBACK_COMPLETED = ".feedback-status__completed",
    RESULT_ROW = ".result-summary table tbody tr",
    PRE = "pre",
}

/// Parses the assessment list page into assignments, in document order.
/// Items missing a name or an href are skipped.
pub fn parse_assessment_list(document: &Html, base: &Url) -> Vec<Assignment> {
    document
        .select(&ASSESSMENT_COLLECTION)
        .flat_map(|collection| collection.select(&COLLECTION_ITEM))
        .filter_map(|item| parse_assessment_item(item, base))
        .collect()
}

fn parse_assessment_item(item: ElementRef, base: &Url) -> Option<Assignment> {
    let href = item.value().attr("href")?;

    // The name is the anchor's own text, not text of child elements such as
    // badge labels.
    let name = item
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| text.trim())
        .find(|text| !text.is_empty())?
        .to_owned();

    let due_date = item.select(&DUE_DATE).next().map(text).unwrap_or_default();
    let due_date = match due_date.split_once("Due:") {
        Some((_, rest)) => rest.trim().to_owned(),
        None => due_date.trim().to_owned(),
    };

    // A "new" badge can carry an override URL for the writeup.
    let badge_url = item
        .select(&NEW_BADGE)
        .next()
        .and_then(|badge| badge.value().attr("data-url"))
        .filter(|url| !url.is_empty());

    let writeup_url = base.join(badge_url.unwrap_or(href)).ok()?;
    let download_url = base
        .join(&format!("{DOWNLOAD_SERVICE_PATH}/{name}.zip"))
        .ok()?;

    Some(Assignment::new(
        AssignmentName::new(name),
        due_date,
        writeup_url,
        download_url,
    ))
}

/// Parses the student gradebook into a name-to-score map. Rows with fewer
/// than four cells, an empty name, or an absent score are dropped.
pub fn parse_grade_table(document: &Html) -> HashMap<AssignmentName, String> {
    document
        .select(&GRADE_ROW)
        .filter_map(parse_grade_row)
        .collect()
}

fn parse_grade_row(row: ElementRef) -> Option<(AssignmentName, String)> {
    let cells: Vec<_> = row.select(&TD).collect();
    if cells.len() < 4 {
        return None;
    }

    let name = text(cells[0].select(&A).next()?);
    let name = name.trim();
    let score = classify_score(cells[3]);

    if name.is_empty() || score.is_empty() {
        return None;
    }
    Some((AssignmentName::new(name.to_owned()), score))
}

fn classify_score(cell: ElementRef) -> String {
    if cell.select(&IN_PROGRESS_ICON).next().is_some() {
        // A spinner icon in the score cell means the autograder is running.
        GRADING_IN_PROGRESS.to_owned()
    } else if cell.select(&NOT_YET_SUBMITTED).next().is_some() {
        String::new()
    } else {
        let raw = text(cell);
        let trimmed = raw.trim();
        trimmed.strip_suffix(".0").unwrap_or(trimmed).to_owned()
    }
}

/// The one-time form token the handin endpoint requires.
pub fn parse_authenticity_token(document: &Html) -> Option<String> {
    document
        .select(&AUTHENTICITY_TOKEN)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_owned)
}

/// The feedback href of the most recent submission row, when one exists.
pub fn parse_feedback_link(document: &Html) -> Option<String> {
    document
        .select(&SUBMISSION_ROW)
        .next()?
        .select(&FEEDBACK_LINK)
        .next()?
        .value()
        .attr("href")
        .map(str::to_owned)
}

pub fn parse_feedback_page(document: &Html) -> FeedbackPage {
    let status = if document.select(&FEEDBACK_IN_PROGRESS).next().is_some() {
        FeedbackStatus::InProgress
    } else if document.select(&FEEDBACK_QUEUED).next().is_some() {
        FeedbackStatus::Queued
    } else if document.select(&FEEDBACK_COMPLETED).next().is_some() {
        FeedbackStatus::Completed
    } else {
        FeedbackStatus::Unknown
    };

    let pre = document
        .select(&PRE)
        .next()
        .map(text)
        .filter(|block| !block.trim().is_empty());

    let results = document
        .select(&RESULT_ROW)
        .filter_map(parse_result_row)
        .collect();

    FeedbackPage::new(status, pre, results)
}

fn parse_result_row(row: ElementRef) -> Option<(String, String)> {
    let mut cells = row.select(&TD);
    let key = text(cells.next()?);
    let value = text(cells.next()?);

    let key = key.trim();
    let key = key.strip_suffix(':').unwrap_or(key);
    Some((key.to_owned(), value.trim().to_owned()))
}
