use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::models::session::SessionQuestion;
use crate::models::user_answer::UserAnswer;

/// Stored in place of an option index when a question was left unanswered.
pub const NOT_ANSWERED: &str = "Not Answered";

/// The stored form of a selected option.
pub fn encode_response(option_index: i32) -> String {
    option_index.to_string()
}

/// Reads a stored response back as an option index.
pub fn decode_response(response: &str) -> Option<i32> {
    response.trim().parse::<i32>().ok().filter(|idx| *idx >= 1)
}

/// The single correctness check used both when grading a live session and when
/// rebuilding a saved attempt.
pub fn response_matches(response: &str, correct_option: i32) -> bool {
    decode_response(response) == Some(correct_option)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub correct_count: usize,
    pub total_questions: usize,
    pub score: Option<f64>,
    pub passed: bool,
}

impl Verdict {
    /// `score` is the rounded percentage, `passed` holds when at least half the
    /// questions are correct. With nothing to grade there is no score and no pass.
    pub fn from_counts(correct_count: usize, total_questions: usize) -> Self {
        if total_questions == 0 {
            return Self {
                correct_count,
                total_questions,
                score: None,
                passed: false,
            };
        }
        let score = (100.0 * correct_count as f64 / total_questions as f64).round();
        Self {
            correct_count,
            total_questions,
            score: Some(score),
            passed: 2 * correct_count >= total_questions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedAnswer {
    /// Session sequence number of the question.
    pub question_id: u32,
    pub selected_option: Option<i32>,
    pub user_response: String,
    pub is_correct: bool,
}

impl GradedAnswer {
    pub fn answered(&self) -> bool {
        self.selected_option.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeReport {
    /// One entry per gradable question, in session order.
    pub answers: Vec<GradedAnswer>,
    pub invalid_questions: Vec<u32>,
    #[serde(flatten)]
    pub verdict: Verdict,
}

pub struct GradingService;

impl GradingService {
    /// Grades a live session.
    ///
    /// `selections` maps a question's session seq to the chosen option index.
    /// Invalid questions are left out of the total; skipped ones count as wrong.
    pub fn grade(questions: &[SessionQuestion], selections: &HashMap<u32, i32>) -> Result<GradeReport> {
        let mut answers = Vec::with_capacity(questions.len());
        let mut invalid_questions = Vec::new();
        let mut correct_count = 0;

        for (seq, selected) in selections {
            match questions.iter().find(|q| q.seq() == *seq) {
                None => {
                    return Err(Error::BadRequest(format!(
                        "Answer refers to unknown question {}",
                        seq
                    )))
                }
                Some(SessionQuestion::Invalid(_)) => {
                    tracing::warn!(seq = *seq, "Ignoring answer to a question that was not generated correctly");
                }
                Some(SessionQuestion::Valid(q)) => {
                    if *selected < 1 || *selected > q.option_count() {
                        return Err(Error::BadRequest(format!(
                            "Selected option {} for question {} is outside 1..{}",
                            selected,
                            seq,
                            q.option_count()
                        )));
                    }
                }
            }
        }

        for question in questions {
            let q = match question {
                SessionQuestion::Valid(q) => q,
                SessionQuestion::Invalid(q) => {
                    invalid_questions.push(q.seq);
                    continue;
                }
            };

            let graded = match selections.get(&q.seq) {
                Some(&selected) => {
                    let user_response = encode_response(selected);
                    let is_correct = response_matches(&user_response, q.correct_option);
                    GradedAnswer {
                        question_id: q.seq,
                        selected_option: Some(selected),
                        user_response,
                        is_correct,
                    }
                }
                None => GradedAnswer {
                    question_id: q.seq,
                    selected_option: None,
                    user_response: NOT_ANSWERED.to_string(),
                    is_correct: false,
                },
            };
            if graded.is_correct {
                correct_count += 1;
            }
            answers.push(graded);
        }

        let verdict = Verdict::from_counts(correct_count, answers.len());
        Ok(GradeReport {
            answers,
            invalid_questions,
            verdict,
        })
    }

    /// Re-derives the verdict of a saved attempt from its stored answers.
    pub fn recompute(questions: &[Question], answers: &[UserAnswer]) -> Verdict {
        let correct_count = questions
            .iter()
            .filter(|q| {
                answers
                    .iter()
                    .find(|a| a.question_id == q.id)
                    .map(|a| response_matches(&a.user_response, q.correct_option))
                    .unwrap_or(false)
            })
            .count();
        Verdict::from_counts(correct_count, questions.len())
    }
}
