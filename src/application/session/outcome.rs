use super::notice::Notice;
use crate::constants::QUERY_ERROR_PREFIX;

/// Result of one agent run, as recorded in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Answered(String),
    Failed(String),
}

impl QueryOutcome {
    /// Text of the assistant turn appended for this outcome.
    pub fn render(&self) -> String {
        match self {
            QueryOutcome::Answered(text) => text.clone(),
            QueryOutcome::Failed(message) => format!("{QUERY_ERROR_PREFIX}{message}"),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, QueryOutcome::Failed(_))
    }
}

/// What happened to a submitted query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The session was idle; nothing was recorded.
    Rejected(Notice),
    Completed(QueryOutcome),
}
