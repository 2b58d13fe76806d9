use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::database::quiz_store::{
    AnswerDraft, AttemptDraft, OptionDraft, QuestionDraft, QuizDraft, QuizStore,
};
use crate::dto::quiz_dto::{
    AnswerSummary, AttemptSummary, CreateQuizRequest, CreateQuizResponse, GradeQuizRequest,
    QuestionSummary, QuizQuestionInput, SaveQuizRequest, SaveQuizResponse, UserAnswerInput,
    UserQuizView,
};
use crate::error::{Error, Result};
use crate::models::quiz::QuizGraph;
use crate::models::session::{NormalizedQuestion, SessionQuestion};
use crate::services::grading_service::{decode_response, GradeReport, GradingService, NOT_ANSWERED};
use crate::services::question_normalizer::QuestionNormalizer;

pub const DEFAULT_QUIZ_TITLE: &str = "Untitled Quiz";

#[derive(Clone)]
pub struct QuizService {
    store: Arc<dyn QuizStore>,
}

impl QuizService {
    pub fn new(store: Arc<dyn QuizStore>) -> Self {
        Self { store }
    }

    /// Grades a session without persisting anything.
    pub fn grade_preview(&self, request: &GradeQuizRequest) -> Result<GradeReport> {
        let questions = session_questions(&request.questions)?;
        let selections = decode_answers(&request.user_answers)?;
        GradingService::grade(&questions, &selections)
    }

    /// Persists a finished session in two phases.
    ///
    /// The quiz and its questions are committed first. Answers refer to
    /// questions by session seq, which is resolved against the committed rows
    /// before the attempt is written. If the attempt fails the quiz is kept
    /// and its id is reported back through `Error::AttemptNotSaved`.
    pub async fn save(&self, request: SaveQuizRequest) -> Result<SaveQuizResponse> {
        request.validate()?;
        let user_id = request.user_id;
        self.ensure_user(user_id).await?;

        let questions = session_questions(&request.quiz_data.questions)?;
        let selections = decode_answers(&request.user_answers)?;
        let report = GradingService::grade(&questions, &selections)?;
        compare_client_verdict(&request, &report);

        let draft = QuizDraft {
            user_id,
            title: request
                .quiz_data
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_QUIZ_TITLE)
                .to_string(),
            prompt: request.quiz_data.prompt.clone().unwrap_or_default(),
            questions: questions
                .iter()
                .filter_map(SessionQuestion::as_valid)
                .map(question_draft)
                .collect(),
        };
        if !report.invalid_questions.is_empty() {
            tracing::info!(
                skipped = ?report.invalid_questions,
                "Invalid questions are not persisted"
            );
        }

        let committed = self.store.create_quiz(&draft).await.map_err(|e| {
            tracing::error!(error = %e, %user_id, "Failed to save quiz");
            e
        })?;
        let quiz_id = committed.quiz.id;
        tracing::info!(%quiz_id, questions = committed.questions.len(), "Quiz saved");

        let ids_by_seq: HashMap<i32, Uuid> = committed
            .questions
            .iter()
            .map(|q| (q.position, q.id))
            .collect();

        let mut answers = Vec::new();
        for graded in report.answers.iter().filter(|a| a.answered()) {
            let question_id = ids_by_seq
                .get(&(graded.question_id as i32))
                .copied()
                .ok_or_else(|| {
                    tracing::error!(%quiz_id, seq = graded.question_id, "Answered question missing from saved quiz");
                    Error::AttemptNotSaved {
                        quiz_id,
                        reason: format!("question {} was not saved with the quiz", graded.question_id),
                    }
                })?;
            answers.push(AnswerDraft {
                question_id,
                user_response: graded.user_response.clone(),
                is_correct: graded.is_correct,
            });
        }

        let attempt_draft = AttemptDraft {
            quiz_id,
            user_id,
            score: report.verdict.score.map(|s| Decimal::from(s as i64)),
            passed: report.verdict.passed,
            answers,
        };

        let attempt = self
            .store
            .create_attempt(&attempt_draft)
            .await
            .map_err(|e| {
                tracing::error!(%quiz_id, error = %e, "Quiz saved but attempt could not be recorded");
                Error::AttemptNotSaved {
                    quiz_id,
                    reason: e.to_string(),
                }
            })?;

        tracing::info!(
            %quiz_id,
            attempt_id = %attempt.id,
            score = ?report.verdict.score,
            passed = report.verdict.passed,
            "Attempt saved"
        );

        Ok(SaveQuizResponse {
            message: "Quiz and attempt saved successfully".to_string(),
            quiz_id,
            attempt_id: attempt.id,
            attempt,
        })
    }

    /// Creates a quiz with no questions yet.
    pub async fn create_quiz_shell(&self, request: CreateQuizRequest) -> Result<CreateQuizResponse> {
        request.validate()?;
        self.ensure_user(request.user_id).await?;

        let committed = self
            .store
            .create_quiz(&QuizDraft {
                user_id: request.user_id,
                title: request.title,
                prompt: request.prompt,
                questions: Vec::new(),
            })
            .await?;

        Ok(CreateQuizResponse {
            message: "Quiz created successfully".to_string(),
            quiz_id: committed.quiz.id,
        })
    }

    pub async fn get_quiz(&self, quiz_id: Uuid) -> Result<QuizGraph> {
        self.store
            .fetch_quiz(quiz_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Quiz {} not found", quiz_id)))
    }

    pub async fn list_user_quizzes(&self, user_id: Uuid) -> Result<Vec<UserQuizView>> {
        self.ensure_user(user_id).await?;
        let graphs = self.store.list_user_quizzes(user_id).await?;
        Ok(graphs.into_iter().map(user_quiz_view).collect())
    }

    pub async fn delete_quiz(&self, quiz_id: Uuid) -> Result<()> {
        if !self.store.delete_quiz(quiz_id).await? {
            return Err(Error::NotFound(format!("Quiz {} not found", quiz_id)));
        }
        tracing::info!(%quiz_id, "Quiz deleted");
        Ok(())
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<()> {
        if !self.store.user_exists(user_id).await? {
            return Err(Error::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }
}

/// Rebuilds the session from what the client sent back.
///
/// Raw generator output is normalized with its list position as seq. Session
/// questions keep their own seq but are checked again.
pub fn session_questions(inputs: &[QuizQuestionInput]) -> Result<Vec<SessionQuestion>> {
    let mut questions = Vec::with_capacity(inputs.len());
    let mut seen = HashSet::new();

    for (idx, input) in inputs.iter().enumerate() {
        let question = match input {
            QuizQuestionInput::Session(question) => {
                if let SessionQuestion::Valid(q) = question {
                    QuestionNormalizer::verify(q).map_err(Error::BadRequest)?;
                }
                question.clone()
            }
            QuizQuestionInput::MalformedSession(tagged) => {
                let question = tagged.parse().map_err(|e| {
                    Error::BadRequest(format!(
                        "Question {} is not a valid session question: {}",
                        idx + 1,
                        e
                    ))
                })?;
                if let SessionQuestion::Valid(q) = &question {
                    QuestionNormalizer::verify(q).map_err(Error::BadRequest)?;
                }
                question
            }
            QuizQuestionInput::Raw(raw) => QuestionNormalizer::normalize((idx as u32) + 1, raw),
        };
        if !seen.insert(question.seq()) {
            return Err(Error::BadRequest(format!(
                "Question seq {} appears more than once",
                question.seq()
            )));
        }
        questions.push(question);
    }

    Ok(questions)
}

/// Maps each answered seq to the chosen option index.
pub fn decode_answers(answers: &[UserAnswerInput]) -> Result<HashMap<u32, i32>> {
    let mut selections = HashMap::with_capacity(answers.len());
    let mut seen = HashSet::new();

    for answer in answers {
        if !seen.insert(answer.question_id) {
            return Err(Error::BadRequest(format!(
                "Question {} was answered more than once",
                answer.question_id
            )));
        }
        let response = answer.user_response.0.trim();
        if response.is_empty() || response.eq_ignore_ascii_case(NOT_ANSWERED) {
            continue;
        }
        let selected = decode_response(response).ok_or_else(|| {
            Error::BadRequest(format!(
                "userResponse '{}' for question {} is not an option index",
                response, answer.question_id
            ))
        })?;
        selections.insert(answer.question_id, selected);
    }

    Ok(selections)
}

fn compare_client_verdict(request: &SaveQuizRequest, report: &GradeReport) {
    if let Some(score) = request.score {
        if report.verdict.score != Some(score.round()) {
            tracing::warn!(
                client = score,
                server = ?report.verdict.score,
                "Client score differs from server grading"
            );
        }
    }
    if let Some(passed) = request.passed {
        if passed != report.verdict.passed {
            tracing::warn!(client = passed, server = report.verdict.passed, "Client pass verdict differs");
        }
    }
    for answer in &request.user_answers {
        let (Some(claimed), Some(graded)) = (
            answer.is_correct,
            report.answers.iter().find(|a| a.question_id == answer.question_id),
        ) else {
            continue;
        };
        if claimed != graded.is_correct {
            tracing::warn!(seq = answer.question_id, client = claimed, "Client isCorrect differs");
        }
    }
}

fn question_draft(question: &NormalizedQuestion) -> QuestionDraft {
    QuestionDraft {
        position: question.seq as i32,
        question_text: question.question_text.clone(),
        question_type: question.question_type.clone(),
        correct_option: question.correct_option,
        explanation: question.explanation.clone(),
        options: question
            .options
            .iter()
            .map(|o| OptionDraft {
                option_index: o.option_index,
                option_text: o.option_text.clone(),
            })
            .collect(),
    }
}

fn user_quiz_view(graph: QuizGraph) -> UserQuizView {
    let attempts = graph
        .attempts
        .iter()
        .map(|attempt| AttemptSummary {
            id: attempt.attempt.id,
            score: attempt.attempt.score.and_then(|s| s.to_f64()),
            passed: attempt.attempt.passed,
            attempt_date: attempt.attempt.attempt_date,
            answers: attempt
                .answers
                .iter()
                .filter_map(|answer| {
                    let q = graph.questions.iter().find(|q| q.question.id == answer.question_id)?;
                    Some(AnswerSummary {
                        is_correct: answer.is_correct,
                        user_response: answer.user_response.clone(),
                        question: QuestionSummary {
                            question_text: q.question.question_text.clone(),
                            question_type: q.question.question_type.clone(),
                            correct_option: q.question.correct_option,
                            options: q.options.clone(),
                        },
                    })
                })
                .collect(),
        })
        .collect();

    UserQuizView {
        id: graph.quiz.id,
        user_id: graph.quiz.user_id,
        title: graph.quiz.title,
        prompt: graph.quiz.prompt,
        created_at: graph.quiz.created_at,
        questions: graph.questions.into_iter().map(|q| q.question).collect(),
        attempts,
    }
}
