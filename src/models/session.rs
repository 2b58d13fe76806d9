use serde::{Deserialize, Serialize};

pub const INVALID_QUESTION_NOTICE: &str = "This question was not generated correctly";

/// A question as presented during a live session, before anything is persisted.
///
/// `seq` is assigned once at normalization and is the only identifier the
/// session has for a question until the quiz is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionQuestion {
    Valid(NormalizedQuestion),
    Invalid(InvalidQuestion),
}

impl SessionQuestion {
    pub fn seq(&self) -> u32 {
        match self {
            SessionQuestion::Valid(q) => q.seq,
            SessionQuestion::Invalid(q) => q.seq,
        }
    }

    pub fn as_valid(&self) -> Option<&NormalizedQuestion> {
        match self {
            SessionQuestion::Valid(q) => Some(q),
            SessionQuestion::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedQuestion {
    pub seq: u32,
    pub question_type: String,
    pub question_text: String,
    pub options: Vec<NormalizedOption>,
    pub correct_option: i32,
    pub explanation: Option<String>,
}

impl NormalizedQuestion {
    pub fn option_count(&self) -> i32 {
        self.options.len() as i32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedOption {
    pub option_index: i32,
    pub label: String,
    pub option_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidQuestion {
    pub seq: u32,
    pub reason: String,
    #[serde(default = "default_notice")]
    pub notice: String,
}

impl InvalidQuestion {
    pub fn new(seq: u32, reason: impl Into<String>) -> Self {
        Self {
            seq,
            reason: reason.into(),
            notice: default_notice(),
        }
    }
}

fn default_notice() -> String {
    INVALID_QUESTION_NOTICE.to_string()
}
