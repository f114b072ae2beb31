use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use fitplan_core::PlanError;
use fitplan_core::plan::{PageInfo, Pagination, PlanMetadata, PlanService};
use fitplan_db::models::PlanDocument;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
    raw_response: Option<String>,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
            raw_response: None,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
            raw_response: None,
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "Method not allowed".to_owned(),
            raw_response: None,
        }
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        let status = match &err {
            PlanError::NotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let raw_response = match &err {
            PlanError::Parse(parse) => Some(parse.raw.clone()),
            _ => None,
        };
        Self {
            status,
            message: err.to_string(),
            raw_response,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({ "error": self.message });
        if let Some(raw) = self.raw_response {
            body["raw_response"] = Value::String(raw);
        }
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Raw `page`/`limit` query values; validated by [`Pagination::from_query`].
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatePlanResponse {
    pub success: bool,
    pub message: &'static str,
    pub plan_id: String,
    pub plan: Value,
    pub metadata: PlanMetadata,
}

#[derive(Debug, Serialize)]
pub struct PlanListResponse {
    pub success: bool,
    pub plans: Vec<PlanDocument>,
    pub pagination: PageInfo,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub success: bool,
    pub plan: PlanDocument,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(service: PlanService) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/generate-plan", post(generate_plan))
        .route("/plans", get(list_plans))
        .route("/plans/{id}", get(get_plan))
        .route("/health", get(health))
        .fallback(fallback)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(service: PlanService, bind: &str, port: u16) -> Result<()> {
    let app = build_router(service);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("fitplan serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("fitplan serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index() -> Json<Value> {
    Json(serde_json::json!({
        "message": "AI-Based Workout and Diet Planning System",
        "status": "running",
        "endpoints": {
            "GET /": "Service banner",
            "POST /generate-plan": "Generate workout and diet plan",
            "GET /plans": "Get all saved plans (query: page, limit)",
            "GET /plans/<plan_id>": "Get specific plan by ID",
            "GET /health": "Check service and database health",
        },
    }))
}

async fn generate_plan(
    State(service): State<PlanService>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(input) = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "unreadable plan request body");
        AppError::bad_request("No JSON data provided")
    })?;

    let created = service.create_plan(&input).await?;

    let response = CreatePlanResponse {
        success: true,
        message: "Plan successfully generated and saved",
        plan_id: created.id.to_string(),
        plan: created.plan,
        metadata: created.metadata,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn list_plans(
    State(service): State<PlanService>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let pagination = Pagination::from_query(query.page.as_deref(), query.limit.as_deref())?;

    let page = service.list_plans(pagination).await?;

    Ok(Json(PlanListResponse {
        success: true,
        plans: page.plans,
        pagination: page.pagination,
    })
    .into_response())
}

async fn get_plan(
    State(service): State<PlanService>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(id) = id.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "undecodable plan id");
        AppError::bad_request("Invalid plan ID format")
    })?;
    let plan = service.get_plan(&id).await?;
    Ok(Json(PlanResponse {
        success: true,
        plan,
    })
    .into_response())
}

async fn health(State(service): State<PlanService>) -> Response {
    let report = service.health().await;
    if report.is_healthy() {
        let body = HealthResponse {
            status: "healthy",
            database: "connected",
            error: None,
            timestamp: report.timestamp,
        };
        (StatusCode::OK, Json(body)).into_response()
    } else {
        let body = HealthResponse {
            status: "unhealthy",
            database: "disconnected",
            error: report.error,
            timestamp: report.timestamp,
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

async fn fallback() -> AppError {
    AppError::not_found("Not found")
}

async fn method_not_allowed() -> AppError {
    AppError::method_not_allowed()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use fitplan_core::ProviderError;
    use fitplan_core::plan::PlanService;
    use fitplan_test_utils::{MemoryPlanStore, ScriptedGenerator, sample_week_plan};

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    struct Harness {
        store: Arc<MemoryPlanStore>,
        generator: Arc<ScriptedGenerator>,
    }

    impl Harness {
        fn new(generator: ScriptedGenerator) -> Self {
            Self {
                store: Arc::new(MemoryPlanStore::new()),
                generator: Arc::new(generator),
            }
        }

        fn router(&self) -> axum::Router {
            super::build_router(PlanService::new(
                self.store.clone(),
                self.generator.clone(),
            ))
        }

        async fn get(&self, uri: &str) -> axum::response::Response {
            self.router()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap()
        }

        async fn post_raw(&self, uri: &str, body: &str) -> axum::response::Response {
            self.router()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri(uri)
                        .header("content-type", "application/json")
                        .body(Body::from(body.to_owned()))
                        .unwrap(),
                )
                .await
                .unwrap()
        }

        async fn post_json(&self, uri: &str, body: serde_json::Value) -> axum::response::Response {
            self.post_raw(uri, &body.to_string()).await
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn assert_json_content_type(response: &axum::response::Response) {
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(
            content_type.starts_with("application/json"),
            "unexpected content-type {content_type:?}"
        );
    }

    fn valid_body() -> serde_json::Value {
        json!({"present_weight": 75, "expected_weight": 70, "target_months": 6})
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn index_lists_endpoints() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        let resp = h.get("/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "running");
        assert!(json["endpoints"].get("POST /generate-plan").is_some());
        assert!(json["endpoints"].get("GET /health").is_some());
    }

    #[tokio::test]
    async fn generate_plan_created() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        let resp = h.post_json("/generate-plan", valid_body()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["plan"], sample_week_plan());
        assert_eq!(json["metadata"]["present_weight"], 75.0);
        assert_eq!(json["metadata"]["expected_weight"], 70.0);
        assert_eq!(json["metadata"]["target_months"], 6);
        assert!(json["metadata"]["created_at"].is_string());

        let docs = h.store.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(json["plan_id"], docs[0].id.to_string());
    }

    #[tokio::test]
    async fn generate_plan_missing_field_is_400() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        let resp = h
            .post_json(
                "/generate-plan",
                json!({"present_weight": 75, "target_months": 6}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Missing required field: expected_weight");
        assert!(h.generator.calls().is_empty());
    }

    #[tokio::test]
    async fn generate_plan_bad_months_is_400() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        let resp = h
            .post_json(
                "/generate-plan",
                json!({"present_weight": 75, "expected_weight": 70, "target_months": 3}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(
            json["error"],
            "Target months must be one of: [2, 4, 6, 8, 12, 16, 24]"
        );
    }

    #[tokio::test]
    async fn generate_plan_unconvertible_value_is_400() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        let resp = h
            .post_json(
                "/generate-plan",
                json!({"present_weight": "a lot", "expected_weight": 70, "target_months": 6}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(
            json["error"]
                .as_str()
                .unwrap()
                .starts_with("Invalid input data: present_weight")
        );
    }

    #[tokio::test]
    async fn generate_plan_malformed_body_is_400() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        let resp = h.post_raw("/generate-plan", "{not json").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "No JSON data provided");
    }

    #[tokio::test]
    async fn generate_plan_provider_error_is_500() {
        let h = Harness::new(ScriptedGenerator::failing(ProviderError::Unauthorized(
            "Invalid API Key".to_owned(),
        )));
        let resp = h.post_json("/generate-plan", valid_body()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(
            json["error"],
            "AI service error: authentication rejected: Invalid API Key"
        );
        assert!(json.get("raw_response").is_none());
        assert_eq!(h.store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn generate_plan_unparseable_output_is_500_with_raw_text() {
        let h = Harness::new(ScriptedGenerator::replying("Eat vegetables and run daily."));
        let resp = h.post_json("/generate-plan", valid_body()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "AI response is not valid JSON");
        assert_eq!(json["raw_response"], "Eat vegetables and run daily.");
        assert_eq!(h.store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn generate_plan_store_failure_is_500() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        h.store.fail_all();
        let resp = h.post_json("/generate-plan", valid_body()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().starts_with("Database error:"));
    }

    #[tokio::test]
    async fn list_plans_defaults_and_shape() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        h.store.seed(3);

        let resp = h.get("/plans").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(
            json["pagination"],
            json!({"page": 1, "limit": 10, "total": 3, "pages": 1})
        );
        let plans = json["plans"].as_array().unwrap();
        assert_eq!(plans.len(), 3);
        assert!(plans[0]["_id"].is_string());
        assert!(plans[0]["created_at"].is_string());
    }

    #[tokio::test]
    async fn list_plans_second_page() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        h.store.seed(15);

        let resp = h.get("/plans?page=2&limit=10").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["plans"].as_array().unwrap().len(), 5);
        assert_eq!(json["pagination"]["pages"], 2);
        assert_eq!(json["pagination"]["total"], 15);
    }

    #[tokio::test]
    async fn list_plans_rejects_bad_pagination() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        for uri in ["/plans?page=0", "/plans?limit=-5", "/plans?page=abc", "/plans?limit=1000"] {
            let resp = h.get(uri).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
            let json = body_json(resp).await;
            assert!(json["error"].is_string(), "{uri}");
        }
        assert_eq!(h.store.read_calls(), 0);
    }

    #[tokio::test]
    async fn get_plan_found() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        let seeded = h.store.seed(2);

        let resp = h.get(&format!("/plans/{}", seeded[1].id)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["plan"]["_id"], seeded[1].id.to_string());
        assert_eq!(json["plan"]["plan"], sample_week_plan());
    }

    #[tokio::test]
    async fn get_plan_invalid_id_is_400() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        let resp = h.get("/plans/507f1f77bcf86cd79943").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Invalid plan ID format");
        assert_eq!(h.store.read_calls(), 0);
    }

    #[tokio::test]
    async fn get_plan_unknown_id_is_404() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        let resp = h.get(&format!("/plans/{}", uuid::Uuid::new_v4())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Plan not found");
    }

    #[tokio::test]
    async fn health_ok() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        let resp = h.get("/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["database"], "connected");
        assert!(json["timestamp"].is_string());
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn health_store_down_is_500() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        h.store.fail_all();
        let resp = h.get("/health").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["database"], "disconnected");
        assert_eq!(json["error"], "connection refused");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn undecodable_plan_id_is_json_400() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        let resp = h.get("/plans/%FF").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_json_content_type(&resp);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Invalid plan ID format");
        assert_eq!(h.store.read_calls(), 0);
    }

    #[tokio::test]
    async fn wrong_method_is_json_405() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        let resp = h.get("/generate-plan").await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_json_content_type(&resp);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Method not allowed");

        let resp = h.post_json("/plans", valid_body()).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(body_json(resp).await["error"].is_string());
        assert!(h.generator.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let h = Harness::new(ScriptedGenerator::with_week_plan());
        let resp = h.get("/nope").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Not found");
    }
}
