// Roster Link - API Server
// Read-only JSON API over stored resolution runs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use roster_link::{
    get_all_resolutions, get_resolutions_by_name, get_resolutions_by_outcome, get_runs,
    get_season_stats, open_database, OutcomeCategory, SeasonStat, StoredResolution, StoredRun,
};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }

    fn err(status: StatusCode, message: String) -> Response {
        (
            status,
            Json(Self {
                success: false,
                data: None,
                error: Some(message),
            }),
        )
            .into_response()
    }
}

/// Stats response
#[derive(Serialize)]
struct StatsResponse {
    total_resolutions: usize,
    resolved: usize,
    resolution_rate: f64,
    by_outcome: Vec<OutcomeStat>,
    by_season: Vec<SeasonStat>,
    latest_run: Option<StoredRun>,
}

#[derive(Serialize)]
struct OutcomeStat {
    outcome: &'static str,
    count: usize,
}

/// Run a query against the shared connection, mapping failures to a 500
fn with_db<T, F>(state: &AppState, what: &str, query: F) -> Response
where
    T: Serialize,
    F: FnOnce(&Connection) -> anyhow::Result<T>,
{
    let conn = match state.db.lock() {
        Ok(conn) => conn,
        Err(_) => {
            return ApiResponse::<T>::err(StatusCode::INTERNAL_SERVER_ERROR, "database lock poisoned".to_string())
        }
    };

    match query(&*conn) {
        Ok(data) => ApiResponse::ok(data),
        Err(e) => {
            error!("Error getting {}: {:#}", what, e);
            ApiResponse::<T>::err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> Response {
    ApiResponse::ok(serde_json::json!({ "status": "OK", "version": roster_link::VERSION }))
}

/// GET /api/resolutions - All stored resolutions
async fn get_resolutions(State(state): State<AppState>) -> Response {
    with_db(&state, "resolutions", get_all_resolutions)
}

/// GET /api/resolutions/:outcome - Filter by outcome category
async fn filter_resolutions(State(state): State<AppState>, Path(outcome): Path<String>) -> Response {
    if outcome == "all" {
        return with_db(&state, "resolutions", get_all_resolutions);
    }

    match OutcomeCategory::parse(&outcome) {
        Some(category) => with_db(&state, "resolutions by outcome", |conn| {
            get_resolutions_by_outcome(conn, category)
        }),
        None => ApiResponse::<Vec<StoredResolution>>::err(
            StatusCode::BAD_REQUEST,
            format!(
                "unknown outcome '{}', expected one of: all, {}",
                outcome,
                OutcomeCategory::ALL.map(|c| c.as_str()).join(", ")
            ),
        ),
    }
}

/// GET /api/players/:name - Resolutions for one salary name
async fn player_resolutions(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    // Decode URL-encoded name
    let decoded_name = urlencoding::decode(&name)
        .unwrap_or_else(|_| name.clone().into())
        .into_owned();

    with_db(&state, "player resolutions", |conn| get_resolutions_by_name(conn, &decoded_name))
}

/// GET /api/stats - Outcome and season statistics
async fn get_stats(State(state): State<AppState>) -> Response {
    with_db(&state, "stats", |conn| {
        let resolutions = get_all_resolutions(conn)?;
        let total = resolutions.len();

        let by_outcome: Vec<OutcomeStat> = OutcomeCategory::ALL
            .into_iter()
            .map(|category| OutcomeStat {
                outcome: category.as_str(),
                count: resolutions
                    .iter()
                    .filter(|r| r.category() == Some(category))
                    .count(),
            })
            .collect();

        let resolved = resolutions.iter().filter(|r| r.is_resolved()).count();

        Ok(StatsResponse {
            total_resolutions: total,
            resolved,
            resolution_rate: if total == 0 { 0.0 } else { resolved as f64 / total as f64 },
            by_outcome,
            by_season: get_season_stats(conn)?,
            latest_run: get_runs(conn)?.into_iter().next(),
        })
    })
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    roster_link::logging::init();

    println!("🌐 Roster Link - API Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = std::env::var("ROSTER_LINK_DB").unwrap_or_else(|_| "roster_link.db".to_string());
    let db_path = std::path::Path::new(&db_path);

    if !db_path.exists() {
        eprintln!("❌ Database not found at {:?}", db_path);
        eprintln!("   Run: roster-link resolve ... --db {}", db_path.display());
        eprintln!("   to store a run first.");
        std::process::exit(1);
    }

    let conn = open_database(db_path)?;
    println!("✓ Database opened: {:?}", db_path);

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/resolutions", get(get_resolutions))
        .route("/resolutions/:outcome", get(filter_resolutions))
        .route("/players/:name", get(player_resolutions))
        .route("/stats", get(get_stats))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let addr = std::env::var("ROSTER_LINK_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, "server listening");
    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/resolutions", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await?;

    Ok(())
}
