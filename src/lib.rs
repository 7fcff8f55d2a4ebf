pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::database::attempt_store::{AttemptStore, PgAttemptStore};
use crate::services::{
    attempt_service::AttemptService, question_service::QuestionService,
    quiz_service::QuizService, result_service::ResultService, user_service::UserService,
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub user_service: UserService,
    pub quiz_service: QuizService,
    pub question_service: QuestionService,
    pub result_service: ResultService,
    pub attempt_service: AttemptService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let store = Arc::new(PgAttemptStore::new(pool.clone()));
        Self::with_store(pool, store)
    }

    /// Wires the state on top of an explicit attempt store; tests use this to
    /// swap Postgres out from under the session layer.
    pub fn with_store(pool: PgPool, store: Arc<dyn AttemptStore>) -> Self {
        let user_service = UserService::new(pool.clone());
        let quiz_service = QuizService::new(pool.clone());
        let question_service = QuestionService::new(pool.clone());
        let result_service = ResultService::new(pool.clone());
        let attempt_service = AttemptService::new(store);

        Self {
            pool,
            user_service,
            quiz_service,
            question_service,
            result_service,
            attempt_service,
        }
    }
}
