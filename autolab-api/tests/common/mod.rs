//! Shared fixtures for the integration tests: canned course-site HTML and a
//! client pointed at a local mock server.

use autolab_api::client::Client;
use autolab_api::preferences::Preferences;
use mockito::ServerGuard;
use tempfile::TempDir;
use url::Url;

pub const COURSE: &str = "/courses/APCS-A-25";
pub const COOKIE: &str = "_session_id=abc123";

pub fn client_for(server: &ServerGuard) -> Client {
    Client::with_base_url(Url::parse(&server.url()).unwrap()).unwrap()
}

pub fn prefs_in(workspace: &TempDir) -> Preferences {
    Preferences::new(workspace.path(), COOKIE)
        .with_author_name("Ada Lovelace")
        .with_period("3")
}

/// An assessment list with HW1 and HW2, in that document order.
pub fn assessment_list_page() -> String {
    format!(
        r#"<html><body>
        <div class="collection red darken-4 date">
            <a class="collection-item" href="{COURSE}/assessments/HW1">
                HW1
                <p class="date">Due: Wed, Dec 10 at 11:59pm</p>
            </a>
            <a class="collection-item" href="{COURSE}/assessments/HW2">
                HW2
                <p class="date">Due: Fri, Dec 12 at 11:59pm</p>
            </a>
        </div>
        </body></html>"#
    )
}

pub fn gradebook_page() -> String {
    r##"<html><body><div class="category">
    <table class="grades">
        <tr><td><a href="#">HW1</a></td><td></td><td></td><td>95.0</td></tr>
    </table>
    </div></body></html>"##
        .to_owned()
}

/// An assessment detail page carrying a handin form token and, optionally,
/// a submission row linking to a feedback page.
pub fn assessment_detail_page(feedback_href: Option<&str>) -> String {
    let submissions = match feedback_href {
        Some(href) => format!(
            r#"<table><tbody>
            <tr><td><a href="{href}">View Feedback</a></td></tr>
            </tbody></table>"#
        ),
        None => r#"<table><tbody><tr><td>No submissions yet</td></tr></tbody></table>"#.to_owned(),
    };

    format!(
        r#"<html><body>
        <form action="{COURSE}/assessments/HW1/handin" method="post">
            <input name="authenticity_token" value="tok-42" type="hidden">
        </form>
        {submissions}
        </body></html>"#
    )
}

pub fn feedback_in_progress_page() -> String {
    r#"<html><body>
    <div class="feedback-status__inprogress">Autograding in progress</div>
    </body></html>"#
        .to_owned()
}

pub fn feedback_completed_page() -> String {
    r#"<html><body>
    <div class="feedback-status__completed">Autograding complete</div>
    <pre>All tests passed.</pre>
    <div class="result-summary"><table><tbody>
        <tr><td>Score:</td><td>100</td></tr>
        <tr><td>Style:</td><td>ok</td></tr>
    </tbody></table></div>
    </body></html>"#
        .to_owned()
}
