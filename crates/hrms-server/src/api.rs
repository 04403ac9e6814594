use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::Method,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use hrms_search::{SearchEngine, SearchHit};
use hrms_shared::types::Role;

use crate::config::ServerConfig;
use crate::error::ServerError;

/// Abuse guard for `/api/search`, in characters. Well above any real page query.
const MAX_QUERY_CHARS: usize = 4096;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        // Queries longer than MAX_QUERY_CHARS get 400; everything else ranks.
        .route("/api/search", get(search))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct CatalogSizes {
    admin: usize,
    employee: usize,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    search_limit: usize,
    catalog: CatalogSizes,
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    role: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    let catalog = state.engine.catalog();
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        search_limit: state.config.search_limit,
        catalog: CatalogSizes {
            admin: catalog.entries(Role::Admin).len(),
            employee: catalog.entries(Role::Employee).len(),
        },
    })
}

/// Rank catalog pages for a role. A missing or unknown role searches the
/// employee catalog.
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ServerError> {
    if params.q.chars().count() > MAX_QUERY_CHARS {
        return Err(ServerError::BadRequest(format!(
            "Query longer than {MAX_QUERY_CHARS} characters"
        )));
    }

    let role = Role::parse_or_default(params.role.as_deref());
    let results = state.engine.search(&params.q, role);
    Ok(Json(SearchResponse { results }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use hrms_search::Catalog;

    use super::*;

    fn app() -> Router {
        let config = ServerConfig::default();
        let engine = SearchEngine::new(Catalog::builtin()).with_limit(config.search_limit);
        build_router(AppState {
            engine: Arc::new(engine),
            config: Arc::new(config),
        })
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn labels(body: &Value) -> Vec<String> {
        body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|hit| hit["label"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn health_reports_version() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn info_lists_catalog_sizes() {
        let (_, body) = get_json("/info").await;
        let builtin = Catalog::builtin();
        assert_eq!(body["name"], "HRMS Search");
        assert_eq!(body["catalog"]["admin"], builtin.entries(Role::Admin).len());
        assert_eq!(body["catalog"]["employee"], builtin.entries(Role::Employee).len());
    }

    #[tokio::test]
    async fn search_returns_ranked_hits() {
        let (status, body) = get_json("/api/search?q=hours&role=employee").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({ "results": [{ "label": "Timesheet", "href": "/user/timesheet" }] })
        );

        let (_, body) = get_json("/api/search?q=payroll&role=ADMIN").await;
        assert_eq!(labels(&body)[0], "Payroll");
    }

    #[tokio::test]
    async fn search_defaults_to_employee_role() {
        let (_, default_role) = get_json("/api/search?q=add%20timesheet").await;
        let (_, bogus_role) = get_json("/api/search?q=add%20timesheet&role=root").await;
        assert_eq!(labels(&default_role)[0], "Add Timesheet");
        assert_eq!(default_role, bogus_role);

        let (_, admin) = get_json("/api/search?q=add%20timesheet&role=admin").await;
        assert!(labels(&admin).is_empty());
    }

    #[tokio::test]
    async fn empty_query_has_no_results() {
        let (status, body) = get_json("/api/search?role=admin").await;
        assert_eq!(status, StatusCode::OK);
        assert!(labels(&body).is_empty());
    }

    #[tokio::test]
    async fn long_queries_below_the_guard_still_rank() {
        let q = format!("payroll%20{}", "x".repeat(500));
        let (status, body) = get_json(&format!("/api/search?q={q}&role=admin")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(labels(&body).contains(&"Payroll".to_string()));

        let (status, _) = get_json(&format!("/api/search?q={}&role=admin", "a".repeat(MAX_QUERY_CHARS))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn oversized_query_is_rejected() {
        let uri = format!("/api/search?q={}", "a".repeat(MAX_QUERY_CHARS + 1));
        let (status, body) = get_json(&uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Query longer"));
    }
}
