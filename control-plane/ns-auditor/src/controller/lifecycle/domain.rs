/// Suffix predicate for emails belonging to the managed organization.
///
/// Matching is case-sensitive. An empty or malformed email is simply not
/// managed; there is no error case.
#[derive(Clone, Debug)]
pub struct DomainFilter {
    suffix: String,
}

impl DomainFilter {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn matches(&self, email: &str) -> bool {
        !email.is_empty() && email.ends_with(&self.suffix)
    }
}
