#![allow(dead_code)]

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use pagbasa::auth::Role;
use pagbasa::db::Db;
use serde_json::json;

pub const JWT_SECRET: &str = "test-secret";

pub async fn create_test_db() -> Db {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let path =
        std::env::temp_dir().join(format!("pagbasa_test_{}_{}.db", std::process::id(), id));
    // Clean up leftover file from previous runs
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}", path.display());
    Db::new(url).await.expect("failed to create test database")
}

/// Mints an HS256 token the way the account service does.
pub fn token(roles: &[Role]) -> String {
    let claims = json!({
        "sub": "user-1",
        "email": "user@example.com",
        "roles": roles.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        "exp": (Utc::now() + Duration::hours(1)).timestamp(),
    });
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to issue token")
}
