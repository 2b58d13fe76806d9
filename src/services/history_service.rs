use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

use crate::database::quiz_store::QuizStore;
use crate::dto::quiz_dto::{QuizReport, ReportOption, ReportQuestion};
use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionWithOptions};
use crate::models::quiz::QuizGraph;
use crate::models::quiz_attempt::AttemptWithAnswers;
use crate::services::grading_service::{decode_response, response_matches, GradingService, NOT_ANSWERED};

pub const NOT_AVAILABLE: &str = "Not Available";
pub const NO_EXPLANATION: &str = "No explanation provided";

#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn QuizStore>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn QuizStore>) -> Self {
        Self { store }
    }

    pub async fn details(&self, quiz_id: Uuid) -> Result<QuizReport> {
        let graph = self
            .store
            .fetch_quiz(quiz_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Quiz {} not found", quiz_id)))?;
        Ok(reconstruct(&graph))
    }
}

/// Flattens a stored quiz and its latest attempt into a report.
pub fn reconstruct(graph: &QuizGraph) -> QuizReport {
    let attempt = graph.latest_attempt();

    let questions = graph
        .questions
        .iter()
        .map(|q| report_question(q, attempt))
        .collect();

    let (score, passed) = match attempt {
        Some(attempt) => {
            check_stored_verdict(graph, attempt);
            (attempt.attempt.score.and_then(|s| s.to_f64()), attempt.attempt.passed)
        }
        None => (None, false),
    };

    QuizReport {
        quiz_id: graph.quiz.id,
        title: graph.quiz.title.clone(),
        prompt: graph.quiz.prompt.clone(),
        created_at: graph.quiz.created_at,
        attempt_id: attempt.map(|a| a.attempt.id),
        attempt_date: attempt.map(|a| a.attempt.attempt_date),
        score,
        passed,
        questions,
    }
}

fn report_question(q: &QuestionWithOptions, attempt: Option<&AttemptWithAnswers>) -> ReportQuestion {
    let correct_answer = q
        .option_at(q.question.correct_option)
        .map(|o| o.option_text.clone())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let answer = attempt.and_then(|a| a.answers.iter().find(|ans| ans.question_id == q.question.id));
    let (user_response, is_correct) = match answer {
        Some(answer) => {
            let chosen = decode_response(&answer.user_response)
                .and_then(|idx| q.option_at(idx))
                .map(|o| o.option_text.clone())
                .unwrap_or_else(|| answer.user_response.clone());
            let is_correct = response_matches(&answer.user_response, q.question.correct_option);
            if is_correct != answer.is_correct {
                tracing::warn!(
                    question_id = %q.question.id,
                    stored = answer.is_correct,
                    "Stored answer correctness disagrees with its response"
                );
            }
            (chosen, is_correct)
        }
        None => (NOT_ANSWERED.to_string(), false),
    };

    ReportQuestion {
        question_id: q.question.id,
        question_text: q.question.question_text.clone(),
        correct_answer,
        explanation: q
            .question
            .explanation
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| NO_EXPLANATION.to_string()),
        user_response,
        is_correct,
        options: q
            .options
            .iter()
            .map(|o| ReportOption {
                option_text: o.option_text.clone(),
                option_index: o.option_index,
            })
            .collect(),
    }
}

fn check_stored_verdict(graph: &QuizGraph, attempt: &AttemptWithAnswers) {
    let questions: Vec<Question> = graph.questions.iter().map(|q| q.question.clone()).collect();
    let recomputed = GradingService::recompute(&questions, &attempt.answers);
    let stored_score = attempt.attempt.score.and_then(|s| s.to_f64());
    if recomputed.score != stored_score || recomputed.passed != attempt.attempt.passed {
        tracing::warn!(
            attempt_id = %attempt.attempt.id,
            stored_score = ?stored_score,
            recomputed_score = ?recomputed.score,
            "Stored verdict differs from recomputed verdict"
        );
    }
}
