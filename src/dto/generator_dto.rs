use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::models::session::SessionQuestion;

pub const SUPPORTED_QUESTION_TYPE: &str = "mcq";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateExamRequest {
    #[validate(length(min = 1, message = "query is required"))]
    pub query: String,
    #[serde(alias = "questionNbr")]
    #[validate(range(min = 1, message = "question_nbr must be at least 1"))]
    pub question_nbr: u32,
    #[validate(length(min = 1, message = "difficulty is required"))]
    pub difficulty: String,
    #[serde(alias = "questionType")]
    #[validate(length(min = 1, message = "question_type is required"))]
    pub question_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedExam {
    pub query: String,
    pub difficulty: String,
    pub questions: Vec<SessionQuestion>,
    pub valid_count: usize,
    pub invalid_count: usize,
}

/// Body returned by the external generator.
#[derive(Debug, Deserialize)]
pub struct GeneratorResponse {
    pub questions: Vec<GeneratedEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GeneratedEntry {
    Question(RawGeneratedQuestion),
    Unreadable(IgnoredAny),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGeneratedQuestion {
    #[serde(rename = "type", default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub question_data: Option<RawQuestionData>,
}

/// The generator sometimes hands back `question_data` as the JSON text it
/// failed to clean up instead of an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawQuestionData {
    Structured(QuestionData),
    Encoded(String),
    Malformed(IgnoredAny),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionData {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub options: Option<OptionList>,
    #[serde(default)]
    pub correct_answer: Option<FlexibleText>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Options in the order the generator wrote them.
///
/// Accepts either `{"A": "...", "B": "..."}` or `[{"label": "A", "text": "..."}]`.
/// The object form is read entry by entry so the document order is kept
/// without relying on any map's iteration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptionList(pub Vec<LabeledOption>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledOption {
    pub label: String,
    #[serde(alias = "option_text", alias = "optionText")]
    pub text: String,
}

impl<'de> Deserialize<'de> for OptionList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OptionListVisitor;

        impl<'de> Visitor<'de> for OptionListVisitor {
            type Value = OptionList;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of option label to option text or a list of labeled options")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut options = Vec::with_capacity(map.size_hint().unwrap_or(4));
                while let Some((label, text)) = map.next_entry::<String, FlexibleText>()? {
                    options.push(LabeledOption {
                        label,
                        text: text.0,
                    });
                }
                Ok(OptionList(options))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut options = Vec::with_capacity(seq.size_hint().unwrap_or(4));
                while let Some(option) = seq.next_element::<LabeledOption>()? {
                    options.push(option);
                }
                Ok(OptionList(options))
            }
        }

        deserializer.deserialize_any(OptionListVisitor)
    }
}

/// A string that the generator may also emit as a bare number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlexibleText(pub String);

impl<'de> Deserialize<'de> for FlexibleText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum TextOrNumber {
            Text(String),
            Int(i64),
            Float(f64),
        }

        match TextOrNumber::deserialize(deserializer)? {
            TextOrNumber::Text(s) => Ok(FlexibleText(s)),
            TextOrNumber::Int(i) => Ok(FlexibleText(i.to_string())),
            TextOrNumber::Float(f) if f.is_finite() => Ok(FlexibleText(f.to_string())),
            TextOrNumber::Float(f) => Err(de::Error::custom(format!("Invalid text value: {}", f))),
        }
    }
}
