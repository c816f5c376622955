pub mod auth;
pub mod db;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod names;
pub mod question_id;
pub mod rejections;
pub mod services;
pub mod validation;

use axum::{middleware, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth::JwtKeys, services::assessment::AssessmentService};

#[derive(Clone)]
pub struct AppState {
    pub assessments: AssessmentService,
    pub jwt: JwtKeys,
    /// Hides error details from responses when set.
    pub production: bool,
}

impl AppState {
    pub fn new(db: db::Db, jwt_secret: &str, production: bool) -> Self {
        Self {
            assessments: AssessmentService::new(db),
            jwt: JwtKeys::new(jwt_secret),
            production,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rejections::error_details,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
