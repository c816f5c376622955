pub mod assessment;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::{names, rejections::Envelope, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(names::HEALTH_URL, get(health))
        .merge(assessment::routes())
}

async fn health() -> Json<Envelope<Value>> {
    Json(Envelope::data(json!({
        "status": "ok",
        "version": names::VERSION,
    })))
}
