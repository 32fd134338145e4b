use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::state::AppState;

const SERVICE_NAME: &str = "jobtracker-api";

fn health_body(database_ok: bool) -> Value {
    json!({
        "status": if database_ok { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "service": SERVICE_NAME,
        "database": if database_ok { "up" } else { "down" },
    })
}

/// GET /health
/// Reports service version and whether Postgres answers.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database_ok = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Health check: database unreachable: {e}");
            false
        }
    };

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health_body(database_ok)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_body() {
        let ok = health_body(true);
        assert_eq!(ok["status"], "ok");
        assert_eq!(ok["service"], SERVICE_NAME);
        assert_eq!(ok["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(health_body(false)["status"], "degraded");
    }
}
