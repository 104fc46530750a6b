use scraper::ElementRef;

use crate::assignment::AssignmentName;

pub const BASE_URL: &str = "https://cs.lhs.fuhsd.org";
pub const COURSE_PATH: &str = "/courses/APCS-A-25";
pub const DOWNLOAD_SERVICE_PATH: &str = "/apcssnarf";

// Shared basic-auth credential for the download service. It is common to the
// whole course, not per-student.
pub const DOWNLOAD_AUTH_USER: &str = "lhsuser";
pub const DOWNLOAD_AUTH_PASSWORD: &str = "lhsuser";

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

pub fn course_path(path: &str) -> String {
    format!("{COURSE_PATH}{path}")
}

pub fn assessments_path() -> String {
    course_path("/assessments")
}

/// The server ignores the numeric `course_user_data` segment for the student
/// gradebook view, so any value works here.
pub fn gradebook_path() -> String {
    course_path("/course_user_data/100/gradebook/student")
}

pub fn assessment_path(name: &AssignmentName) -> String {
    course_path(&format!("/assessments/{name}"))
}

pub fn handin_path(name: &AssignmentName) -> String {
    course_path(&format!("/assessments/{name}/handin"))
}

pub fn text(el: ElementRef) -> String {
    el.text().flat_map(|text| text.chars()).collect()
}
