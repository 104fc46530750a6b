use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::TryStreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client as HttpClient, Response, header};
use scraper::Html;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::assignment::{Assignment, correlate};
use crate::error::{Error, Result};
use crate::preferences::Preferences;
use crate::scrape;
use crate::util::{
    BASE_URL, DOWNLOAD_AUTH_PASSWORD, DOWNLOAD_AUTH_USER, USER_AGENT, assessments_path,
    assessment_path, gradebook_path, handin_path,
};
use crate::{archive, headers};

/// HTTP client for the course site. Authentication is an opaque session
/// cookie obtained out of band and threaded in through [`Preferences`] on
/// every call; the client itself holds no credentials.
#[derive(Debug)]
pub struct Client {
    http: HttpClient,
    base: Url,
}

impl Client {
    pub fn new() -> Result<Self> {
        Self::with_base_url(Url::parse(BASE_URL)?)
    }

    /// Points the client at a different host. Used by tests to swap in a
    /// local mock server.
    pub fn with_base_url(base: Url) -> Result<Self> {
        let http = HttpClient::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { http, base })
    }

    fn page_url(&self, path: &str) -> String {
        format!("{}{path}", self.base.as_str().trim_end_matches('/'))
    }

    /// Fetches one cookie-authenticated HTML page, mapping a non-success
    /// status to [`Error::Network`] tagged with `endpoint`.
    pub(crate) async fn get_page(
        &self,
        endpoint: &'static str,
        path: &str,
        cookie: &str,
    ) -> Result<String> {
        let url = self.page_url(path);
        debug!(%url, "fetching page");

        let response = self
            .http
            .get(&url)
            .header(header::COOKIE, cookie)
            .header(header::ACCEPT, "text/html")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network { endpoint, status });
        }
        Ok(response.text().await?)
    }

    /// Scrapes the assessment list and the gradebook, correlates the two by
    /// assignment name, and annotates local download state. The returned list
    /// is in reverse document order.
    ///
    /// A failed gradebook fetch degrades the result (every score empty, no
    /// download annotation) instead of failing the scrape.
    #[tracing::instrument(skip(self, prefs), err)]
    pub async fn fetch_assignments(&self, prefs: &Preferences) -> Result<Vec<Assignment>> {
        let cookie = prefs.session_cookie()?;

        let text = self
            .get_page("assessment list", &assessments_path(), cookie)
            .await?;
        let mut assignments = {
            let document = Html::parse_document(&text);
            scrape::parse_assessment_list(&document, &self.base)
        };
        info!(count = assignments.len(), "scraped assessments");

        match self.get_page("gradebook", &gradebook_path(), cookie).await {
            Ok(grade_text) => {
                let grades = {
                    let document = Html::parse_document(&grade_text);
                    scrape::parse_grade_table(&document)
                };
                correlate(&mut assignments, &grades, prefs.workspace_path());
            }
            Err(err) => warn!(%err, "gradebook unavailable, returning ungraded assignments"),
        }

        assignments.reverse();
        Ok(assignments)
    }

    /// Downloads an assignment's starter archive, unpacks it into
    /// `<workspace>/<name>`, stamps headers, and returns the folder path.
    /// The transient `<name>.zip` is removed even when extraction fails.
    #[tracing::instrument(skip(self, prefs), err)]
    pub async fn download(&self, assignment: &Assignment, prefs: &Preferences) -> Result<PathBuf> {
        let cookie = prefs.session_cookie()?;
        let workspace = prefs.workspace_path();
        fs::create_dir_all(workspace).await?;

        let response = self
            .http
            .get(assignment.download_url().clone())
            .basic_auth(DOWNLOAD_AUTH_USER, Some(DOWNLOAD_AUTH_PASSWORD))
            .header(header::COOKIE, cookie)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network {
                endpoint: "archive download",
                status,
            });
        }

        let archive_path = workspace.join(format!("{}.zip", assignment.name()));
        let dest = workspace.join(assignment.name().as_str());

        stream_to_file(response, &archive_path).await?;

        let extracted = archive::extract_zip(&archive_path, &dest).await;
        fs::remove_file(&archive_path).await?;
        extracted?;

        headers::apply_headers(&dest, prefs).await?;
        info!(dest = %dest.display(), "downloaded and unpacked starter code");
        Ok(dest)
    }

    /// Re-stamps headers, packages `<workspace>/<name>` into a zip, and
    /// uploads it to the handin endpoint. The transient archive is removed on
    /// both the success and failure paths.
    ///
    /// Submitting the same assignment concurrently races on the shared
    /// `<workspace>/<name>.zip`; callers wanting that must serialize per
    /// assignment.
    #[tracing::instrument(skip(self, prefs), err)]
    pub async fn submit(&self, assignment: &Assignment, prefs: &Preferences) -> Result<()> {
        let cookie = prefs.session_cookie()?;
        let workspace = prefs.workspace_path();

        let folder = workspace.join(assignment.name().as_str());
        if !folder.is_dir() {
            return Err(Error::FolderNotFound(folder));
        }

        headers::apply_headers(&folder, prefs).await?;

        let archive_path = workspace.join(format!("{}.zip", assignment.name()));
        archive::create_zip(&folder, assignment.name().as_str(), &archive_path).await?;

        let uploaded = self.upload(assignment, &archive_path, cookie).await;
        fs::remove_file(&archive_path).await?;
        uploaded
    }

    async fn upload(
        &self,
        assignment: &Assignment,
        archive_path: &Path,
        cookie: &str,
    ) -> Result<()> {
        let detail = self
            .get_page("assessment page", &assessment_path(assignment.name()), cookie)
            .await?;
        let token = {
            let document = Html::parse_document(&detail);
            scrape::parse_authenticity_token(&document)
        }
        .ok_or(Error::TokenNotFound)?;

        let zip_bytes = fs::read(archive_path).await?;
        let file_part = Part::bytes(zip_bytes)
            .file_name(format!("{}.zip", assignment.name()))
            .mime_str("application/zip")?;
        let form = Form::new()
            .text("utf8", "\u{2713}")
            .text("authenticity_token", token)
            .text("integrity_checkbox", "1")
            .part("submission[file]", file_part);

        let url = self.page_url(&handin_path(assignment.name()));
        let response = self
            .http
            .post(&url)
            .header(header::COOKIE, cookie)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network {
                endpoint: "handin",
                status,
            });
        }
        info!(assignment = %assignment.name(), "submission accepted");
        Ok(())
    }
}

async fn stream_to_file(response: Response, path: &Path) -> Result<()> {
    let mut stream = response.bytes_stream();
    let mut file = fs::File::create(path).await?;
    while let Some(chunk) = stream.try_next().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}
