use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const WORKSPACE_VAR: &str = "AUTOLAB_WORKSPACE";
pub const SESSION_COOKIE_VAR: &str = "AUTOLAB_SESSION_COOKIE";
pub const AUTHOR_VAR: &str = "AUTOLAB_AUTHOR";
pub const PERIOD_VAR: &str = "AUTOLAB_PERIOD";
pub const COLLABORATORS_VAR: &str = "AUTOLAB_COLLABORATORS";

/// A read-only snapshot of the user's configuration. Resolved fresh for every
/// operation so that settings changed mid-session are picked up.
#[derive(Clone)]
pub struct Preferences {
    workspace_path: PathBuf,
    session_cookie: String,
    author_name: Option<String>,
    period: Option<String>,
    collaborators: Option<String>,
}

impl Preferences {
    pub fn new(workspace_path: impl Into<PathBuf>, session_cookie: impl Into<String>) -> Self {
        Self {
            workspace_path: workspace_path.into(),
            session_cookie: session_cookie.into(),
            author_name: None,
            period: None,
            collaborators: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        let workspace = env::var(WORKSPACE_VAR).map_err(|_| Error::MissingConfig(WORKSPACE_VAR))?;

        Ok(Self {
            workspace_path: expand_home(&workspace),
            session_cookie: env::var(SESSION_COOKIE_VAR).unwrap_or_default(),
            author_name: env::var(AUTHOR_VAR).ok().and_then(non_empty),
            period: env::var(PERIOD_VAR).ok().and_then(non_empty),
            collaborators: env::var(COLLABORATORS_VAR).ok().and_then(non_empty),
        })
    }

    pub fn with_author_name(mut self, author_name: impl Into<String>) -> Self {
        self.author_name = non_empty(author_name.into());
        self
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = non_empty(period.into());
        self
    }

    pub fn with_collaborators(mut self, collaborators: impl Into<String>) -> Self {
        self.collaborators = non_empty(collaborators.into());
        self
    }

    pub fn workspace_path(&self) -> &Path {
        &self.workspace_path
    }

    /// The session credential, or a config error when it was never set.
    pub fn session_cookie(&self) -> Result<&str> {
        if self.session_cookie.is_empty() {
            Err(Error::MissingSessionCookie)
        } else {
            Ok(&self.session_cookie)
        }
    }

    pub fn author_name(&self) -> Option<&str> {
        self.author_name.as_deref()
    }

    pub fn period(&self) -> Option<&str> {
        self.period.as_deref()
    }

    pub fn collaborators(&self) -> Option<&str> {
        self.collaborators.as_deref()
    }
}

impl fmt::Debug for Preferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preferences")
            .field("workspace_path", &self.workspace_path)
            .field("session_cookie", &"<hidden>")
            .field("author_name", &self.author_name)
            .field("period", &self.period)
            .field("collaborators", &self.collaborators)
            .finish()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn expand_home(path: &str) -> PathBuf {
    expand_home_in(path, dirs::home_dir())
}

fn expand_home_in(path: &str, home: Option<PathBuf>) -> PathBuf {
    match (path.strip_prefix('~'), home) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches('/')),
        _ => PathBuf::from(path),
    }
}
