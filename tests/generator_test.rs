mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{http::header, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value as JsonValue};

use common::{app, send, spawn_generator, InMemoryStore};

fn exam_request(question_nbr: u32) -> JsonValue {
    json!({"query": "rivers", "question_nbr": question_nbr, "difficulty": "medium", "question_type": "mcq"})
}

async fn generate_with(router: Router, timeout: Duration, question_nbr: u32) -> (StatusCode, JsonValue) {
    let url = spawn_generator(router).await;
    let app = app(Arc::new(InMemoryStore::default()), &url, timeout);
    send(&app, "POST", "/api/exams/generate", Some(exam_request(question_nbr))).await
}

#[tokio::test]
async fn option_order_follows_the_generator_document() {
    let router = Router::new().route(
        "/generate",
        post(|| async {
            (
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"questions": [{"type": "mcq", "question_data": {"question": "Longest river?", "options": {"B": "Nile", "A": "Amazon"}, "correct_answer": "A"}}]}"#,
            )
        }),
    );

    let (status, exam) = generate_with(router, Duration::from_secs(5), 1).await;
    assert_eq!(status, StatusCode::OK);
    let q = &exam["questions"][0];
    assert_eq!(q["options"][0]["label"], "B");
    assert_eq!(q["options"][0]["optionIndex"], 1);
    assert_eq!(q["options"][1]["label"], "A");
    assert_eq!(q["correctOption"], 2);
}

#[tokio::test]
async fn request_is_forwarded_in_the_generator_protocol() {
    let router = Router::new().route(
        "/generate",
        post(|Json(body): Json<JsonValue>| async move {
            let ok = body["query"] == "rivers"
                && body["question_nbr"] == 2
                && body["difficulty"] == "medium"
                && body["question_type"] == "mcq";
            let question = if ok { "Forwarded" } else { "Mangled" };
            Json(json!({"questions": [
                {"type": "mcq", "question_data": {"question": question, "options": {"A": "x", "B": "y"}, "correct_answer": "A"}}
            ]}))
        }),
    );

    let (status, exam) = generate_with(router, Duration::from_secs(5), 2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(exam["questions"][0]["questionText"], "Forwarded");
}

#[tokio::test]
async fn extra_questions_are_dropped() {
    let router = Router::new().route(
        "/generate",
        post(|| async {
            let q = json!({"type": "mcq", "question_data": {"question": "q", "options": {"A": "x", "B": "y"}, "correct_answer": "B"}});
            Json(json!({"questions": [q.clone(), q.clone(), q]}))
        }),
    );

    let (status, exam) = generate_with(router, Duration::from_secs(5), 2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(exam["questions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_payload_is_a_bad_gateway() {
    let router = Router::new().route(
        "/generate",
        post(|| async { ([(header::CONTENT_TYPE, "application/json")], r#"{"questions": "#) }),
    );

    let (status, body) = generate_with(router, Duration::from_secs(5), 1).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("malformed"));
}

#[tokio::test]
async fn generator_error_status_is_a_bad_gateway() {
    let router = Router::new().route(
        "/generate",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model overloaded") }),
    );

    let (status, _) = generate_with(router, Duration::from_secs(5), 1).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn slow_generator_times_out() {
    let router = Router::new().route(
        "/generate",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"questions": []}))
        }),
    );

    let (status, body) = generate_with(router, Duration::from_millis(200), 1).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn unreachable_generator_is_a_bad_gateway() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = app(
        Arc::new(InMemoryStore::default()),
        &format!("http://{}", addr),
        Duration::from_secs(2),
    );
    let (status, _) = send(&app, "POST", "/api/exams/generate", Some(exam_request(1))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn unsupported_or_incomplete_requests_never_reach_the_generator() {
    let app = app(
        Arc::new(InMemoryStore::default()),
        "http://127.0.0.1:9",
        Duration::from_secs(1),
    );

    for body in [
        json!({"query": "rivers", "question_nbr": 1, "difficulty": "medium", "question_type": "open-ended"}),
        json!({"query": "  ", "question_nbr": 1, "difficulty": "medium", "question_type": "mcq"}),
        json!({"query": "rivers", "question_nbr": 0, "difficulty": "medium", "question_type": "mcq"}),
        json!({"query": "rivers", "question_nbr": 500, "difficulty": "medium", "question_type": "mcq"}),
    ] {
        let (status, _) = send(&app, "POST", "/api/exams/generate", Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    }
}
