use std::collections::HashSet;

use crate::dto::generator_dto::{
    GeneratedEntry, LabeledOption, QuestionData, RawGeneratedQuestion, RawQuestionData,
    SUPPORTED_QUESTION_TYPE,
};
use crate::models::session::{
    InvalidQuestion, NormalizedOption, NormalizedQuestion, SessionQuestion,
};

const MIN_OPTIONS: usize = 2;

/// Turns generator output into session questions.
///
/// Normalization never fails: anything that cannot be turned into a gradable
/// question comes out as `SessionQuestion::Invalid` with the reason attached.
pub struct QuestionNormalizer;

impl QuestionNormalizer {
    /// Normalizes a whole generated list, numbering questions from 1 in list order.
    pub fn normalize_all(entries: &[GeneratedEntry]) -> Vec<SessionQuestion> {
        entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let seq = (idx as u32) + 1;
                match entry {
                    GeneratedEntry::Question(raw) => Self::normalize(seq, raw),
                    GeneratedEntry::Unreadable(_) => {
                        SessionQuestion::Invalid(InvalidQuestion::new(seq, "question entry is not an object"))
                    }
                }
            })
            .collect()
    }

    pub fn normalize(seq: u32, raw: &RawGeneratedQuestion) -> SessionQuestion {
        match Self::try_normalize(seq, raw) {
            Ok(question) => SessionQuestion::Valid(question),
            Err(reason) => {
                tracing::warn!(seq, reason = %reason, "Generated question marked invalid");
                SessionQuestion::Invalid(InvalidQuestion::new(seq, reason))
            }
        }
    }

    fn try_normalize(seq: u32, raw: &RawGeneratedQuestion) -> Result<NormalizedQuestion, String> {
        let question_type = match raw.question_type.as_deref().map(str::trim) {
            None | Some("") => SUPPORTED_QUESTION_TYPE.to_string(),
            Some(t) if t.eq_ignore_ascii_case(SUPPORTED_QUESTION_TYPE) => SUPPORTED_QUESTION_TYPE.to_string(),
            Some(other) => return Err(format!("unsupported question type '{}'", other)),
        };

        let data = match &raw.question_data {
            None => return Err("question data is missing".to_string()),
            Some(RawQuestionData::Structured(data)) => data.clone(),
            Some(RawQuestionData::Encoded(text)) => decode_embedded(text)?,
            Some(RawQuestionData::Malformed(_)) => {
                return Err("question data has an unexpected shape".to_string())
            }
        };

        let question_text = data
            .question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| "question text is missing".to_string())?
            .to_string();

        let labeled = data.options.map(|o| o.0).unwrap_or_default();
        if labeled.len() < MIN_OPTIONS {
            return Err(format!(
                "expected at least {} options, found {}",
                MIN_OPTIONS,
                labeled.len()
            ));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = labeled.iter().find(|o| !seen.insert(o.label.as_str())) {
            return Err(format!("duplicate option label '{}'", dup.label));
        }

        let correct_label = data
            .correct_answer
            .map(|c| c.0)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| "correct answer is missing".to_string())?;
        let correct_option = position_of_label(&labeled, &correct_label)
            .ok_or_else(|| format!("correct answer '{}' is not one of the options", correct_label))?;

        let options = labeled
            .into_iter()
            .enumerate()
            .map(|(idx, o)| NormalizedOption {
                option_index: (idx as i32) + 1,
                label: o.label,
                option_text: o.text,
            })
            .collect();

        Ok(NormalizedQuestion {
            seq,
            question_type,
            question_text,
            options,
            correct_option,
            explanation: data
                .explanation
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
        })
    }

    /// Re-checks a normalized question that came back from a client.
    pub fn verify(question: &NormalizedQuestion) -> Result<(), String> {
        if question.seq == 0 {
            return Err("seq must start at 1".to_string());
        }
        if !question.question_type.trim().eq_ignore_ascii_case(SUPPORTED_QUESTION_TYPE) {
            return Err(format!(
                "question {} has unsupported type '{}'",
                question.seq, question.question_type
            ));
        }
        if question.question_text.trim().is_empty() {
            return Err(format!("question {} has no text", question.seq));
        }
        if question.options.len() < MIN_OPTIONS {
            return Err(format!("question {} has fewer than {} options", question.seq, MIN_OPTIONS));
        }
        let mut labels = HashSet::new();
        for (idx, option) in question.options.iter().enumerate() {
            if !labels.insert(option.label.as_str()) {
                return Err(format!(
                    "question {} has duplicate option label '{}'",
                    question.seq, option.label
                ));
            }
            if option.option_index != (idx as i32) + 1 {
                return Err(format!(
                    "question {} option indices must run 1..{} in order",
                    question.seq,
                    question.options.len()
                ));
            }
        }
        if question.correct_option < 1 || question.correct_option > question.option_count() {
            return Err(format!(
                "question {} correct option {} is outside 1..{}",
                question.seq,
                question.correct_option,
                question.options.len()
            ));
        }
        Ok(())
    }
}

/// 1-based position of `label`, exact match first, then trimmed and case-insensitive.
fn position_of_label(options: &[LabeledOption], label: &str) -> Option<i32> {
    options
        .iter()
        .position(|o| o.label == label)
        .or_else(|| {
            let wanted = label.trim();
            options
                .iter()
                .position(|o| o.label.trim().eq_ignore_ascii_case(wanted))
        })
        .map(|idx| (idx as i32) + 1)
}

fn decode_embedded(text: &str) -> Result<QuestionData, String> {
    let body = extract_json_block(text).ok_or_else(|| "question data is not JSON".to_string())?;
    serde_json::from_str::<QuestionData>(body)
        .map_err(|e| format!("question data could not be parsed: {}", e))
}

fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim());
        }
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
