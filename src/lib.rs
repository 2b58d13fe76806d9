pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::PgPool;

use crate::database::quiz_store::{PgQuizStore, QuizStore};
use crate::error::{Error, Result};
use crate::services::{
    generator_service::GeneratorService, history_service::HistoryService,
    quiz_service::QuizService,
};

#[derive(Clone)]
pub struct AppState {
    pub quiz_service: QuizService,
    pub history_service: HistoryService,
    pub generator_service: GeneratorService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Result<Self> {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let generator_service = GeneratorService::new(
            http_client,
            config.generator_url.clone(),
            Duration::from_secs(config.generator_timeout_secs),
            config.max_generated_questions,
        );

        Ok(Self::from_parts(
            Arc::new(PgQuizStore::new(pool)),
            generator_service,
        ))
    }

    pub fn from_parts(store: Arc<dyn QuizStore>, generator_service: GeneratorService) -> Self {
        Self {
            quiz_service: QuizService::new(store.clone()),
            history_service: HistoryService::new(store),
            generator_service,
        }
    }
}
