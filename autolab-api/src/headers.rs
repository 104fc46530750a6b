//! Starter-code header stamping. Course templates ship `.java` files whose
//! header comments carry `TODO` placeholders; this fills them in from the
//! user's preferences. Substitution is idempotent: once a token is replaced
//! it never matches again.

use std::path::Path;

use chrono::Local;
use lazy_static::lazy_static;
use regex::{NoExpand, Regex};
use tokio::fs;
use tracing::{debug, info};

use crate::error::Result;
use crate::preferences::Preferences;

pub const DEFAULT_COLLABORATORS: &str = "Me, myself, and I";

const JAVA_EXTENSION: &str = "java";
const DATE_FORMAT: &str = "%B %-d, %Y";

// The token strings are a compatibility contract with the course templates;
// matching is case-insensitive and whitespace-flexible.
lazy_static! {
    static ref AUTHOR_PATTERN: Regex = Regex::new(r"(?i)TODO\s+Your\s+Name").unwrap();
    static ref DATE_PATTERN: Regex = Regex::new(r"(?i)TODO\s+Date").unwrap();
    static ref PERIOD_PATTERN: Regex = Regex::new(r"(?i)TODO\s+Your\s+Period").unwrap();
    static ref COLLABORATORS_PATTERN: Regex =
        Regex::new(r"(?i)TODO\s+list\s+collaborators").unwrap();
}

/// Walks `root` and fills header placeholders in every `.java` file, writing
/// a file back only when something actually changed. Returns the number of
/// rewritten files. A missing root is a logged no-op, not an error.
#[tracing::instrument(skip(prefs), err)]
pub async fn apply_headers(root: &Path, prefs: &Preferences) -> Result<usize> {
    if !root.is_dir() {
        info!(root = %root.display(), "folder does not exist, skipping header update");
        return Ok(0);
    }

    let today = Local::now().format(DATE_FORMAT).to_string();
    let mut updated = 0;

    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext == JAVA_EXTENSION) {
                let content = fs::read_to_string(&path).await?;
                if let Some(stamped) = substitute(&content, prefs, &today) {
                    debug!(file = %path.display(), "stamping header");
                    fs::write(&path, stamped).await?;
                    updated += 1;
                }
            }
        }
    }

    Ok(updated)
}

/// One canonical substitution pass. Returns `None` when no token matched, so
/// callers can skip the write-back and leave modification times alone.
fn substitute(content: &str, prefs: &Preferences, date: &str) -> Option<String> {
    let mut text = content.to_owned();
    let mut modified = false;

    if let Some(author) = prefs.author_name() {
        modified |= replace_token(&mut text, &AUTHOR_PATTERN, author);
    }
    // The date is stamped whenever its token is present, configured or not.
    modified |= replace_token(&mut text, &DATE_PATTERN, date);
    if let Some(period) = prefs.period() {
        modified |= replace_token(&mut text, &PERIOD_PATTERN, period);
    }
    let collaborators = prefs.collaborators().unwrap_or(DEFAULT_COLLABORATORS);
    modified |= replace_token(&mut text, &COLLABORATORS_PATTERN, collaborators);

    modified.then_some(text)
}

fn replace_token(text: &mut String, pattern: &Regex, value: &str) -> bool {
    if pattern.is_match(text) {
        *text = pattern.replace_all(text, NoExpand(value)).into_owned();
        true
    } else {
        false
    }
}
