//! `/health`: the database answers and the schema is current. Scheduled jobs and open
//! conversations are reported but never make the service unhealthy.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use tembea_core::cache::ConversationCache;
use tembea_db::{migrations, DbPool};

use crate::jobs::JobScheduler;
use crate::state::AppState;

const READY: &str = "ready";
const DEGRADED: &str = "degraded";

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    scheduler: JobScheduler,
    cache: ConversationCache,
}

impl From<&AppState> for HealthState {
    fn from(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            scheduler: state.scheduler.clone(),
            cache: state.cache.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

impl HealthCheck {
    fn ready(detail: impl Into<String>) -> Self {
        Self { status: READY, detail: detail.into() }
    }

    fn degraded(detail: impl Into<String>) -> Self {
        Self { status: DEGRADED, detail: detail.into() }
    }

    fn is_ready(&self) -> bool {
        self.status == READY
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub schema: HealthCheck,
    pub scheduled_jobs: usize,
    pub open_conversations: usize,
    pub checked_at: String,
}

pub fn router(state: &AppState) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState::from(state))
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let schema = if database.is_ready() {
        schema_check(&state.db_pool).await
    } else {
        HealthCheck::degraded("database unavailable")
    };
    let ready = database.is_ready() && schema.is_ready();

    let payload = HealthResponse {
        status: if ready { READY } else { DEGRADED },
        database,
        schema,
        scheduled_jobs: state.scheduler.count(),
        open_conversations: state.cache.len(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck::ready("database query succeeded"),
        Err(error) => HealthCheck::degraded(format!("database query failed: {error}")),
    }
}

async fn schema_check(pool: &DbPool) -> HealthCheck {
    match migrations::pending_count(pool).await {
        Ok(0) => HealthCheck::ready("all migrations applied"),
        Ok(pending) => HealthCheck::degraded(format!("{pending} migration(s) pending")),
        Err(error) => HealthCheck::degraded(format!("migration history unavailable: {error}")),
    }
}
