use std::env;

use quiz_backend::database::quiz_store::{
    AnswerDraft, AttemptDraft, OptionDraft, PgQuizStore, QuestionDraft, QuizDraft, QuizStore,
};
use quiz_backend::error::Error;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

async fn connect() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let Ok(url) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres store test");
        return None;
    };
    let pool = PgPool::connect(&url).await.expect("connect");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    Some(pool)
}

async fn seed_user(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username, email) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(format!("user_{}", id))
        .bind(format!("user_{}@example.com", id))
        .execute(pool)
        .await
        .expect("seed user");
    id
}

fn question(position: i32, text: &str, correct_option: i32) -> QuestionDraft {
    QuestionDraft {
        position,
        question_text: text.to_string(),
        question_type: "mcq".to_string(),
        correct_option,
        explanation: None,
        options: ["Paris", "Rome"]
            .iter()
            .enumerate()
            .map(|(idx, t)| OptionDraft {
                option_index: (idx as i32) + 1,
                option_text: t.to_string(),
            })
            .collect(),
    }
}

#[tokio::test]
async fn quiz_and_attempt_round_trip_through_postgres() {
    let Some(pool) = connect().await else { return };
    let store = PgQuizStore::new(pool.clone());
    let user_id = seed_user(&pool).await;
    assert!(store.user_exists(user_id).await.unwrap());

    let committed = store
        .create_quiz(&QuizDraft {
            user_id,
            title: "Capitals".to_string(),
            prompt: "capitals".to_string(),
            questions: vec![question(1, "France?", 1), question(3, "Italy?", 2)],
        })
        .await
        .unwrap();
    let positions: Vec<i32> = committed.questions.iter().map(|q| q.position).collect();
    assert_eq!(positions, vec![1, 3]);

    let attempt = store
        .create_attempt(&AttemptDraft {
            quiz_id: committed.quiz.id,
            user_id,
            score: Some(Decimal::from(50)),
            passed: true,
            answers: vec![AnswerDraft {
                question_id: committed.questions[1].id,
                user_response: "2".to_string(),
                is_correct: true,
            }],
        })
        .await
        .unwrap();

    let graph = store.fetch_quiz(committed.quiz.id).await.unwrap().unwrap();
    assert_eq!(graph.questions.len(), 2);
    assert_eq!(graph.questions[0].options[1].option_text, "Rome");
    assert_eq!(graph.latest_attempt().unwrap().attempt.id, attempt.id);
    assert_eq!(graph.latest_attempt().unwrap().answers.len(), 1);

    assert!(store.delete_quiz(committed.quiz.id).await.unwrap());
    assert!(store.fetch_quiz(committed.quiz.id).await.unwrap().is_none());
    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts WHERE id = $1")
        .bind(attempt.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(orphans, 0);
    assert!(!store.delete_quiz(committed.quiz.id).await.unwrap());
}

#[tokio::test]
async fn answers_from_another_quiz_roll_the_attempt_back() {
    let Some(pool) = connect().await else { return };
    let store = PgQuizStore::new(pool.clone());
    let user_id = seed_user(&pool).await;

    let draft = QuizDraft {
        user_id,
        title: "Capitals".to_string(),
        prompt: String::new(),
        questions: vec![question(1, "France?", 1)],
    };
    let first = store.create_quiz(&draft).await.unwrap();
    let second = store.create_quiz(&draft).await.unwrap();

    let err = store
        .create_attempt(&AttemptDraft {
            quiz_id: first.quiz.id,
            user_id,
            score: Some(Decimal::from(100)),
            passed: true,
            answers: vec![AnswerDraft {
                question_id: second.questions[0].id,
                user_response: "1".to_string(),
                is_correct: true,
            }],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Internal(_)));

    let graph = store.fetch_quiz(first.quiz.id).await.unwrap().unwrap();
    assert!(graph.attempts.is_empty());

    let listed = store.list_user_quizzes(user_id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].quiz.id, second.quiz.id);
}
