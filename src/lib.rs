pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::database::match_store::PgMatchStore;
use crate::services::{
    candidate_service::CandidateService, job_service::JobService, match_service::MatchService,
    notification_service::NotificationService, side_effects::SideEffectDispatcher,
};
use axum::{
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub match_service: MatchService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> error::Result<Self> {
        let notification_service = NotificationService::new(
            config.notification_webhook_url.clone(),
            config.webhook_secret.clone(),
        )?;
        let dispatcher = SideEffectDispatcher::new(
            Arc::new(CandidateService::new(pool.clone())),
            Arc::new(JobService::new(pool.clone())),
            Arc::new(notification_service),
        );
        let match_service = MatchService::new(Arc::new(PgMatchStore::new(pool)), dispatcher)
            .with_dedup_window(chrono::Duration::seconds(config.dedup_window_secs as i64));

        Ok(Self { match_service })
    }

    pub fn from_service(match_service: MatchService) -> Self {
        Self { match_service }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/api/matches",
            get(routes::match_routes::list_matches).post(routes::match_routes::create_match),
        )
        .route("/api/matches/stats", get(routes::match_routes::get_match_stats))
        .route(
            "/api/matches/statuses",
            get(routes::match_routes::list_match_statuses),
        )
        .route("/api/matches/:id", get(routes::match_routes::get_match))
        .route(
            "/api/matches/:id/next-statuses",
            get(routes::match_routes::get_next_statuses),
        )
        .route(
            "/api/matches/:id/status",
            post(routes::match_routes::update_match_status),
        )
        .route(
            "/api/matches/:id/timeline/:entry_id",
            delete(routes::match_routes::delete_timeline_entry),
        )
        .with_state(state)
}
