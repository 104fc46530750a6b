use std::io;
use std::path::PathBuf;

use async_zip::error::ZipError;
use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the engine. Every variant renders a message a UI can
/// display as-is.
#[derive(Debug, Error)]
pub enum Error {
    #[error("session cookie is not set; configure it before talking to the course site")]
    MissingSessionCookie,

    #[error("missing configuration value `{0}`")]
    MissingConfig(&'static str),

    #[error("{endpoint} request failed with status {status}")]
    Network {
        endpoint: &'static str,
        status: StatusCode,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not find the authenticity token on the assessment page")]
    TokenNotFound,

    #[error("assignment folder not found at {}", .0.display())]
    FolderNotFound(PathBuf),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("archive error: {0}")]
    Archive(#[from] ZipError),

    #[error("filesystem error: {0}")]
    Io(#[from] io::Error),

    #[error("grading timed out after {attempts} attempts")]
    Timeout { attempts: u32 },
}
