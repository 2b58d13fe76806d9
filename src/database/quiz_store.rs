use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionWithOptions};
use crate::models::quiz::{Quiz, QuizGraph};
use crate::models::quiz_attempt::{AttemptWithAnswers, QuizAttempt};
use crate::models::quiz_option::QuizOption;
use crate::models::user_answer::UserAnswer;

#[derive(Debug, Clone, PartialEq)]
pub struct QuizDraft {
    pub user_id: Uuid,
    pub title: String,
    pub prompt: String,
    pub questions: Vec<QuestionDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    /// Session seq of the question; becomes its stored position.
    pub position: i32,
    pub question_text: String,
    pub question_type: String,
    pub correct_option: i32,
    pub explanation: Option<String>,
    pub options: Vec<OptionDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionDraft {
    pub option_index: i32,
    pub option_text: String,
}

/// A quiz as it came out of its insert transaction, questions in position order.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedQuiz {
    pub quiz: Quiz,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptDraft {
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub score: Option<Decimal>,
    pub passed: bool,
    pub answers: Vec<AnswerDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerDraft {
    pub question_id: Uuid,
    pub user_response: String,
    pub is_correct: bool,
}

/// Persistent home of quizzes and their attempts.
///
/// `create_quiz` and `create_attempt` are each one atomic write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool>;

    async fn create_quiz(&self, draft: &QuizDraft) -> Result<CommittedQuiz>;

    async fn create_attempt(&self, draft: &AttemptDraft) -> Result<QuizAttempt>;

    async fn fetch_quiz(&self, quiz_id: Uuid) -> Result<Option<QuizGraph>>;

    /// Quizzes of a user, newest first.
    async fn list_user_quizzes(&self, user_id: Uuid) -> Result<Vec<QuizGraph>>;

    /// Returns false when there was nothing to delete.
    async fn delete_quiz(&self, quiz_id: Uuid) -> Result<bool>;
}

#[derive(Clone)]
pub struct PgQuizStore {
    pool: PgPool,
}

impl PgQuizStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_graphs(&self, quizzes: Vec<Quiz>) -> Result<Vec<QuizGraph>> {
        if quizzes.is_empty() {
            return Ok(Vec::new());
        }
        let quiz_ids: Vec<Uuid> = quizzes.iter().map(|q| q.id).collect();

        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, quiz_id, position, question_text, question_type, correct_option, explanation
            FROM questions
            WHERE quiz_id = ANY($1)
            ORDER BY quiz_id, position
            "#,
        )
        .bind(&quiz_ids)
        .fetch_all(&self.pool)
        .await?;

        let options = sqlx::query_as::<_, QuizOption>(
            r#"
            SELECT o.id, o.question_id, o.option_text, o.option_index
            FROM options o
            JOIN questions q ON q.id = o.question_id
            WHERE q.quiz_id = ANY($1)
            ORDER BY o.question_id, o.option_index
            "#,
        )
        .bind(&quiz_ids)
        .fetch_all(&self.pool)
        .await?;

        let attempts = sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT id, quiz_id, user_id, score, passed, attempt_date
            FROM quiz_attempts
            WHERE quiz_id = ANY($1)
            ORDER BY attempt_date DESC, id
            "#,
        )
        .bind(&quiz_ids)
        .fetch_all(&self.pool)
        .await?;

        let answers = sqlx::query_as::<_, UserAnswer>(
            r#"
            SELECT a.id, a.attempt_id, a.question_id, a.user_response, a.is_correct
            FROM user_answers a
            JOIN quiz_attempts t ON t.id = a.attempt_id
            JOIN questions q ON q.id = a.question_id
            WHERE t.quiz_id = ANY($1)
            ORDER BY a.attempt_id, q.position
            "#,
        )
        .bind(&quiz_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut options_by_question: HashMap<Uuid, Vec<QuizOption>> = HashMap::new();
        for option in options {
            options_by_question.entry(option.question_id).or_default().push(option);
        }
        let mut questions_by_quiz: HashMap<Uuid, Vec<QuestionWithOptions>> = HashMap::new();
        for question in questions {
            let options = options_by_question.remove(&question.id).unwrap_or_default();
            questions_by_quiz
                .entry(question.quiz_id)
                .or_default()
                .push(QuestionWithOptions { question, options });
        }

        let mut answers_by_attempt: HashMap<Uuid, Vec<UserAnswer>> = HashMap::new();
        for answer in answers {
            answers_by_attempt.entry(answer.attempt_id).or_default().push(answer);
        }
        let mut attempts_by_quiz: HashMap<Uuid, Vec<AttemptWithAnswers>> = HashMap::new();
        for attempt in attempts {
            let answers = answers_by_attempt.remove(&attempt.id).unwrap_or_default();
            attempts_by_quiz
                .entry(attempt.quiz_id)
                .or_default()
                .push(AttemptWithAnswers { attempt, answers });
        }

        Ok(quizzes
            .into_iter()
            .map(|quiz| QuizGraph {
                questions: questions_by_quiz.remove(&quiz.id).unwrap_or_default(),
                attempts: attempts_by_quiz.remove(&quiz.id).unwrap_or_default(),
                quiz,
            })
            .collect())
    }
}

#[async_trait]
impl QuizStore for PgQuizStore {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)"#)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn create_quiz(&self, draft: &QuizDraft) -> Result<CommittedQuiz> {
        let mut tx = self.pool.begin().await?;

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (user_id, title, prompt)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, prompt, created_at
            "#,
        )
        .bind(draft.user_id)
        .bind(&draft.title)
        .bind(&draft.prompt)
        .fetch_one(&mut *tx)
        .await?;

        let mut questions = Vec::with_capacity(draft.questions.len());
        for q in &draft.questions {
            let question = sqlx::query_as::<_, Question>(
                r#"
                INSERT INTO questions (quiz_id, position, question_text, question_type, correct_option, explanation)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, quiz_id, position, question_text, question_type, correct_option, explanation
                "#,
            )
            .bind(quiz.id)
            .bind(q.position)
            .bind(&q.question_text)
            .bind(&q.question_type)
            .bind(q.correct_option)
            .bind(&q.explanation)
            .fetch_one(&mut *tx)
            .await?;

            for option in &q.options {
                sqlx::query(
                    r#"INSERT INTO options (question_id, option_text, option_index) VALUES ($1, $2, $3)"#,
                )
                .bind(question.id)
                .bind(&option.option_text)
                .bind(option.option_index)
                .execute(&mut *tx)
                .await?;
            }
            questions.push(question);
        }

        tx.commit().await?;

        questions.sort_by_key(|q| q.position);
        Ok(CommittedQuiz { quiz, questions })
    }

    async fn create_attempt(&self, draft: &AttemptDraft) -> Result<QuizAttempt> {
        let mut tx = self.pool.begin().await?;

        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"
            INSERT INTO quiz_attempts (quiz_id, user_id, score, passed)
            VALUES ($1, $2, $3, $4)
            RETURNING id, quiz_id, user_id, score, passed, attempt_date
            "#,
        )
        .bind(draft.quiz_id)
        .bind(draft.user_id)
        .bind(draft.score)
        .bind(draft.passed)
        .fetch_one(&mut *tx)
        .await?;

        for answer in &draft.answers {
            let inserted = sqlx::query(
                r#"
                INSERT INTO user_answers (attempt_id, question_id, user_response, is_correct)
                SELECT $1, q.id, $3, $4
                FROM questions q
                WHERE q.id = $2 AND q.quiz_id = $5
                "#,
            )
            .bind(attempt.id)
            .bind(answer.question_id)
            .bind(&answer.user_response)
            .bind(answer.is_correct)
            .bind(draft.quiz_id)
            .execute(&mut *tx)
            .await?;

            if inserted.rows_affected() != 1 {
                tx.rollback().await?;
                return Err(Error::Internal(format!(
                    "Question {} does not belong to quiz {}",
                    answer.question_id, draft.quiz_id
                )));
            }
        }

        tx.commit().await?;
        Ok(attempt)
    }

    async fn fetch_quiz(&self, quiz_id: Uuid) -> Result<Option<QuizGraph>> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"SELECT id, user_id, title, prompt, created_at FROM quizzes WHERE id = $1"#,
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        match quiz {
            Some(quiz) => Ok(self.load_graphs(vec![quiz]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_user_quizzes(&self, user_id: Uuid) -> Result<Vec<QuizGraph>> {
        let quizzes = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT id, user_id, title, prompt, created_at
            FROM quizzes
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.load_graphs(quizzes).await
    }

    async fn delete_quiz(&self, quiz_id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM quizzes WHERE id = $1"#)
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
