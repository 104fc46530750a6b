mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use autolab_api::assignment::{Assignment, AssignmentName};
use autolab_api::error::Error;
use autolab_api::feedback::PollConfig;
use common::*;
use url::Url;

fn hw1_for(server: &mockito::ServerGuard) -> Assignment {
    Assignment::new(
        AssignmentName::new("HW1".to_owned()),
        "Wed, Dec 10 at 11:59pm".to_owned(),
        Url::parse(&format!("{}{COURSE}/assessments/HW1", server.url())).unwrap(),
        Url::parse(&format!("{}/apcssnarf/HW1.zip", server.url())).unwrap(),
    )
}

fn make_hw1_folder(workspace: &tempfile::TempDir) {
    let folder = workspace.path().join("HW1");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(
        folder.join("Main.java"),
        "// @date TODO Date\nclass Main {}\n",
    )
    .unwrap();
}

fn instant_poll() -> PollConfig {
    PollConfig {
        attempts: 20,
        delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn submit_uploads_multipart_and_cleans_up() {
    let mut server = mockito::Server::new_async().await;
    let workspace = tempfile::tempdir().unwrap();
    make_hw1_folder(&workspace);

    let detail = server
        .mock("GET", format!("{COURSE}/assessments/HW1").as_str())
        .with_body(assessment_detail_page(None))
        .create_async()
        .await;
    let handin = server
        .mock("POST", format!("{COURSE}/assessments/HW1/handin").as_str())
        .match_header("cookie", COOKIE)
        .match_header(
            "content-type",
            mockito::Matcher::Regex("multipart/form-data.*".to_owned()),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    client
        .submit(&hw1_for(&server), &prefs_in(&workspace))
        .await
        .unwrap();

    detail.assert_async().await;
    handin.assert_async().await;

    let main = std::fs::read_to_string(workspace.path().join("HW1/Main.java")).unwrap();
    assert!(!main.contains("TODO Date"), "headers re-stamped before packaging");
    assert!(
        !workspace.path().join("HW1.zip").exists(),
        "transient archive removed on success"
    );
}

#[tokio::test]
async fn missing_folder_fails_before_any_request() {
    let mut server = mockito::Server::new_async().await;
    let workspace = tempfile::tempdir().unwrap();

    let detail = server
        .mock("GET", format!("{COURSE}/assessments/HW1").as_str())
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .submit(&hw1_for(&server), &prefs_in(&workspace))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::FolderNotFound(_)));
    detail.assert_async().await;
}

#[tokio::test]
async fn missing_authenticity_token_is_its_own_error() {
    let mut server = mockito::Server::new_async().await;
    let workspace = tempfile::tempdir().unwrap();
    make_hw1_folder(&workspace);

    server
        .mock("GET", format!("{COURSE}/assessments/HW1").as_str())
        .with_body("<html><body><form></form></body></html>")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .submit(&hw1_for(&server), &prefs_in(&workspace))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TokenNotFound));
    assert!(
        !workspace.path().join("HW1.zip").exists(),
        "transient archive removed on failure too"
    );
}

#[tokio::test]
async fn polling_reaches_terminal_state_on_the_fourth_attempt() {
    let mut server = mockito::Server::new_async().await;
    let workspace = tempfile::tempdir().unwrap();

    server
        .mock("GET", format!("{COURSE}/assessments/HW1").as_str())
        .with_body(assessment_detail_page(Some(
            format!("{COURSE}/viewFeedback/1").as_str(),
        )))
        .create_async()
        .await;

    // Three in-progress responses, then a completed page with two result rows.
    let hits = Arc::new(AtomicUsize::new(0));
    let feedback_hits = Arc::clone(&hits);
    server
        .mock("GET", format!("{COURSE}/viewFeedback/1").as_str())
        .with_body_from_request(move |_| {
            if feedback_hits.fetch_add(1, Ordering::SeqCst) < 3 {
                feedback_in_progress_page().into_bytes()
            } else {
                feedback_completed_page().into_bytes()
            }
        })
        .expect(4)
        .create_async()
        .await;

    let progress_calls = Arc::new(AtomicUsize::new(0));
    let progress_counter = Arc::clone(&progress_calls);
    let progress = move |_message: &str| {
        progress_counter.fetch_add(1, Ordering::SeqCst);
    };

    let client = client_for(&server);
    let report = client
        .poll_feedback(
            &AssignmentName::new("HW1".to_owned()),
            &prefs_in(&workspace),
            &instant_poll(),
            Some(&progress),
        )
        .await
        .unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 4, "terminal on the 4th attempt");
    assert_eq!(
        progress_calls.load(Ordering::SeqCst),
        3,
        "progress reported for each non-terminal attempt"
    );
    assert!(report.starts_with("# HW1 - Feedback"));
    assert_eq!(report.matches("- **").count(), 2);
    assert!(report.contains("- **Score**: 100"));
}

#[tokio::test]
async fn polling_times_out_after_exactly_the_attempt_budget() {
    let mut server = mockito::Server::new_async().await;
    let workspace = tempfile::tempdir().unwrap();

    // No submission row ever appears.
    let detail = server
        .mock("GET", format!("{COURSE}/assessments/HW1").as_str())
        .with_body(assessment_detail_page(None))
        .expect(20)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .poll_feedback(
            &AssignmentName::new("HW1".to_owned()),
            &prefs_in(&workspace),
            &instant_poll(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { attempts: 20 }));
    detail.assert_async().await;
}

#[tokio::test]
async fn attempts_without_a_visible_submission_are_absorbed() {
    let mut server = mockito::Server::new_async().await;
    let workspace = tempfile::tempdir().unwrap();

    // The submission row takes two attempts to show up.
    let hits = Arc::new(AtomicUsize::new(0));
    let page_hits = Arc::clone(&hits);
    server
        .mock("GET", format!("{COURSE}/assessments/HW1").as_str())
        .with_body_from_request(move |_| {
            if page_hits.fetch_add(1, Ordering::SeqCst) < 2 {
                assessment_detail_page(None).into_bytes()
            } else {
                assessment_detail_page(Some(format!("{COURSE}/viewFeedback/1").as_str()))
                    .into_bytes()
            }
        })
        .create_async()
        .await;
    server
        .mock("GET", format!("{COURSE}/viewFeedback/1").as_str())
        .with_body(feedback_completed_page())
        .create_async()
        .await;

    let client = client_for(&server);
    let report = client
        .poll_feedback(
            &AssignmentName::new("HW1".to_owned()),
            &prefs_in(&workspace),
            &instant_poll(),
            None,
        )
        .await
        .unwrap();

    assert!(report.contains("## Results"));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn transient_fetch_errors_only_surface_as_a_timeout() {
    let mut server = mockito::Server::new_async().await;
    let workspace = tempfile::tempdir().unwrap();

    server
        .mock("GET", format!("{COURSE}/assessments/HW1").as_str())
        .with_body(assessment_detail_page(Some(
            format!("{COURSE}/viewFeedback/1").as_str(),
        )))
        .create_async()
        .await;
    // Every feedback fetch fails; each failure counts against the budget
    // instead of aborting the loop.
    let feedback = server
        .mock("GET", format!("{COURSE}/viewFeedback/1").as_str())
        .with_status(500)
        .expect(3)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .poll_feedback(
            &AssignmentName::new("HW1".to_owned()),
            &prefs_in(&workspace),
            &PollConfig {
                attempts: 3,
                delay: Duration::ZERO,
            },
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { attempts: 3 }));
    feedback.assert_async().await;
}
