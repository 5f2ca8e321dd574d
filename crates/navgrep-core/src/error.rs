use thiserror::Error;

/// Failures surfaced by search collaborators.
///
/// An empty result set is never an error; every variant here represents a
/// lookup that could not be answered.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search backend failed: {0}")]
    Backend(String),

    #[error("search timed out after {0} ms")]
    Timeout(u64),

    /// A single structured error returned by the search layer.
    #[error("{0}")]
    Application(String),

    /// Several structured errors returned together.
    #[error("{}", .0.join("\n"))]
    Aggregate(Vec<String>),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse search output: {0}")]
    Parse(String),
}

impl SearchError {
    pub fn is_application(&self) -> bool {
        matches!(self, SearchError::Application(_) | SearchError::Aggregate(_))
    }
}

/// Convert structured error payloads from the search layer into an error.
///
/// Returns `None` when there are no messages so callers can keep treating the
/// response as a (possibly empty) result.
pub fn application_error<I, S>(messages: I) -> Option<SearchError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut messages: Vec<String> = messages.into_iter().map(Into::into).collect();
    match messages.len() {
        0 => None,
        1 => messages.pop().map(SearchError::Application),
        _ => Some(SearchError::Aggregate(messages)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_messages_is_not_an_error() {
        assert!(application_error(Vec::<String>::new()).is_none());
    }

    #[test]
    fn single_message_is_raised_directly() {
        let err = application_error(["repository not found"]).unwrap();
        assert!(matches!(err, SearchError::Application(ref m) if m == "repository not found"));
        assert_eq!(err.to_string(), "repository not found");
    }

    #[test]
    fn multiple_messages_are_aggregated() {
        let err = application_error(["first", "second"]).unwrap();
        assert!(err.is_application());
        let text = err.to_string();
        assert!(text.contains("first"));
        assert!(text.contains("second"));
    }
}
