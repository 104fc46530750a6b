use crate::assignment::Assignment;

/// Resolves a user-supplied string against a fetched assignment list, first
/// by exact name, then case-insensitively.
#[derive(Debug, Clone)]
pub struct AssignmentSelector {
    selector: String,
}

impl AssignmentSelector {
    pub fn new(selector: String) -> Self {
        Self { selector }
    }

    pub fn select_from<'a>(&self, assignments: &'a [Assignment]) -> Option<&'a Assignment> {
        self.select_exact(assignments)
            .or_else(|| self.select_case_insensitive(assignments))
    }

    fn select_exact<'a>(&self, assignments: &'a [Assignment]) -> Option<&'a Assignment> {
        assignments
            .iter()
            .find(|assignment| assignment.name().as_str() == self.selector)
    }

    fn select_case_insensitive<'a>(&self, assignments: &'a [Assignment]) -> Option<&'a Assignment> {
        assignments.iter().find(|assignment| {
            assignment
                .name()
                .as_str()
                .eq_ignore_ascii_case(&self.selector)
        })
    }
}
