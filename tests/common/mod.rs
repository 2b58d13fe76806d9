#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use quiz_backend::{
    database::quiz_store::{AttemptDraft, CommittedQuiz, QuizDraft, QuizStore},
    error::{Error, Result},
    models::{
        question::{Question, QuestionWithOptions},
        quiz::{Quiz, QuizGraph},
        quiz_attempt::{AttemptWithAnswers, QuizAttempt},
        quiz_option::QuizOption,
        user_answer::UserAnswer,
    },
    routes,
    services::generator_service::GeneratorService,
    AppState,
};
use serde_json::Value as JsonValue;
use tokio::net::TcpListener;
use tower::ServiceExt;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashSet<Uuid>,
    quizzes: Vec<Quiz>,
    questions: Vec<QuestionWithOptions>,
    attempts: Vec<AttemptWithAnswers>,
    ticks: i64,
    fail_attempts: bool,
}

impl Tables {
    fn next_instant(&mut self) -> chrono::DateTime<Utc> {
        self.ticks += 1;
        Utc::now() + chrono::Duration::milliseconds(self.ticks)
    }

    fn graph(&self, quiz: &Quiz) -> QuizGraph {
        let mut questions: Vec<QuestionWithOptions> = self
            .questions
            .iter()
            .filter(|q| q.question.quiz_id == quiz.id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.question.position);

        let mut attempts: Vec<AttemptWithAnswers> = self
            .attempts
            .iter()
            .filter(|a| a.attempt.quiz_id == quiz.id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.attempt.attempt_date.cmp(&a.attempt.attempt_date));

        QuizGraph {
            quiz: quiz.clone(),
            questions,
            attempts,
        }
    }
}

/// Store that keeps everything in memory with the same ordering and cascade
/// rules as the Postgres schema.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn with_user(user_id: Uuid) -> Self {
        let store = Self::default();
        store.tables.lock().unwrap().users.insert(user_id);
        store
    }

    pub fn fail_attempts(&self) {
        self.tables.lock().unwrap().fail_attempts = true;
    }

    pub fn attempt_count(&self) -> usize {
        self.tables.lock().unwrap().attempts.len()
    }

    pub fn question_count(&self) -> usize {
        self.tables.lock().unwrap().questions.len()
    }
}

#[async_trait]
impl QuizStore for InMemoryStore {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.tables.lock().unwrap().users.contains(&user_id))
    }

    async fn create_quiz(&self, draft: &QuizDraft) -> Result<CommittedQuiz> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.users.contains(&draft.user_id) {
            return Err(Error::Internal("quizzes_user_id_fkey".to_string()));
        }
        let quiz = Quiz {
            id: Uuid::new_v4(),
            user_id: draft.user_id,
            title: draft.title.clone(),
            prompt: draft.prompt.clone(),
            created_at: tables.next_instant(),
        };

        let mut questions = Vec::new();
        for q in &draft.questions {
            let question = Question {
                id: Uuid::new_v4(),
                quiz_id: quiz.id,
                position: q.position,
                question_text: q.question_text.clone(),
                question_type: q.question_type.clone(),
                correct_option: q.correct_option,
                explanation: q.explanation.clone(),
            };
            let options = q
                .options
                .iter()
                .map(|o| QuizOption {
                    id: Uuid::new_v4(),
                    question_id: question.id,
                    option_text: o.option_text.clone(),
                    option_index: o.option_index,
                })
                .collect();
            questions.push(question.clone());
            tables.questions.push(QuestionWithOptions { question, options });
        }
        tables.quizzes.push(quiz.clone());

        questions.sort_by_key(|q| q.position);
        Ok(CommittedQuiz { quiz, questions })
    }

    async fn create_attempt(&self, draft: &AttemptDraft) -> Result<QuizAttempt> {
        let mut tables = self.tables.lock().unwrap();
        if tables.fail_attempts {
            return Err(Error::Internal("attempt insert failed".to_string()));
        }
        for answer in &draft.answers {
            let belongs = tables
                .questions
                .iter()
                .any(|q| q.question.id == answer.question_id && q.question.quiz_id == draft.quiz_id);
            if !belongs {
                return Err(Error::Internal(format!(
                    "Question {} does not belong to quiz {}",
                    answer.question_id, draft.quiz_id
                )));
            }
        }

        let attempt = QuizAttempt {
            id: Uuid::new_v4(),
            quiz_id: draft.quiz_id,
            user_id: draft.user_id,
            score: draft.score,
            passed: draft.passed,
            attempt_date: tables.next_instant(),
        };
        let answers = draft
            .answers
            .iter()
            .map(|a| UserAnswer {
                id: Uuid::new_v4(),
                attempt_id: attempt.id,
                question_id: a.question_id,
                user_response: a.user_response.clone(),
                is_correct: a.is_correct,
            })
            .collect();
        tables.attempts.push(AttemptWithAnswers {
            attempt: attempt.clone(),
            answers,
        });
        Ok(attempt)
    }

    async fn fetch_quiz(&self, quiz_id: Uuid) -> Result<Option<QuizGraph>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .quizzes
            .iter()
            .find(|q| q.id == quiz_id)
            .map(|quiz| tables.graph(quiz)))
    }

    async fn list_user_quizzes(&self, user_id: Uuid) -> Result<Vec<QuizGraph>> {
        let tables = self.tables.lock().unwrap();
        let mut quizzes: Vec<&Quiz> = tables.quizzes.iter().filter(|q| q.user_id == user_id).collect();
        quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quizzes.into_iter().map(|quiz| tables.graph(quiz)).collect())
    }

    async fn delete_quiz(&self, quiz_id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.quizzes.len();
        tables.quizzes.retain(|q| q.id != quiz_id);
        if tables.quizzes.len() == before {
            return Ok(false);
        }
        tables.questions.retain(|q| q.question.quiz_id != quiz_id);
        tables.attempts.retain(|a| a.attempt.quiz_id != quiz_id);
        Ok(true)
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_generator(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake generator");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("fake generator");
    });
    format!("http://{}", addr)
}

pub fn app(store: Arc<InMemoryStore>, generator_url: &str, timeout: Duration) -> Router {
    let generator = GeneratorService::new(
        reqwest::Client::new(),
        format!("{}/generate", generator_url),
        timeout,
        50,
    );
    routes::router(AppState::from_parts(store, generator))
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, json)
}
