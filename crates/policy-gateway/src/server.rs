//! HTTP surface of the gateway.
//!
//! Every handler is a thin shell over [`PolicyGateway`]: parse the body, call
//! the facade, record an audit entry, serialize the result. Audit details
//! carry entity types, counts and decisions; request text is never recorded.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use audit_log::{AuditEntry, AuditEventType, AuditSink, AuditSource};
use policy_engine::{
    EntitySpan, FilterError, FilterPattern, GatewayError, PiiReport, PolicyGateway, ToolDecision,
};

const COMPONENT: &str = "http";

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<PolicyGateway>,
    pub audit: AuditSink,
}

/// Build the router with tracing and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/check-pii", post(check_pii))
        .route("/anonymize", post(anonymize))
        .route("/filter-output", post(filter_output))
        .route("/check-tool", post(check_tool))
        .route(
            "/filter-patterns",
            get(list_patterns).post(add_pattern).delete(remove_pattern),
        )
        .route(
            "/tools",
            get(list_tools).post(add_tool).delete(remove_tool),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToolRequest {
    pub tool_name: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterOutputResponse {
    pub filtered_text: String,
    /// Length of the input in characters.
    pub original_length: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PatternsResponse {
    pub enabled: bool,
    pub patterns: Vec<FilterPattern>,
}

#[derive(Debug, Deserialize)]
pub struct ToolChangeRequest {
    pub tool_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolChangeResponse {
    pub changed: bool,
    pub tools: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PatternChangeResponse {
    /// Whether the list actually changed.
    pub changed: bool,
    pub patterns: Vec<FilterPattern>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    BadPattern(#[from] FilterError),

    #[error("tool name must not be blank")]
    BadTool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadPattern(_) | ApiError::BadTool => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Policy Gateway API", "status": "running" }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn check_pii(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Result<Json<PiiReport>, ApiError> {
    let report = match state.gateway.detect(&req.text).await {
        Ok(report) => report,
        Err(err) => return Err(detection_failed(&state, "check-pii", &req, err).await),
    };

    audit(
        &state,
        AuditEventType::PiiChecked,
        req.user_id.as_deref(),
        json!({
            "has_pii": report.has_pii,
            "entity_count": report.entities.len(),
            "entity_types": entity_types(&report.entities),
        }),
    )
    .await;

    Ok(Json(report))
}

async fn anonymize(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Result<Json<PiiReport>, ApiError> {
    let result = match state.gateway.anonymize_text(&req.text).await {
        Ok(result) => result,
        Err(err) => return Err(detection_failed(&state, "anonymize", &req, err).await),
    };

    audit(
        &state,
        AuditEventType::TextAnonymized,
        req.user_id.as_deref(),
        json!({
            "has_pii": result.has_pii,
            "entity_count": result.entities.len(),
            "entity_types": entity_types(&result.entities),
        }),
    )
    .await;

    Ok(Json(result.into()))
}

async fn filter_output(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Json<FilterOutputResponse> {
    let filtered_text = state.gateway.filter_output(&req.text);
    let original_length = req.text.chars().count();

    audit(
        &state,
        AuditEventType::OutputFiltered,
        req.user_id.as_deref(),
        json!({
            "original_length": original_length,
            "filtered_length": filtered_text.chars().count(),
            "modified": filtered_text != req.text,
        }),
    )
    .await;

    Json(FilterOutputResponse {
        filtered_text,
        original_length,
    })
}

async fn check_tool(
    State(state): State<AppState>,
    Json(req): Json<ToolRequest>,
) -> Json<ToolDecision> {
    let decision = state
        .gateway
        .check_tool(&req.tool_name, req.user_id.as_deref());

    let event_type = if decision.allowed {
        AuditEventType::ToolAllowed
    } else {
        AuditEventType::ToolDenied
    };
    audit(
        &state,
        event_type,
        req.user_id.as_deref(),
        json!({ "tool": req.tool_name, "reason": decision.reason }),
    )
    .await;

    Json(decision)
}

async fn list_patterns(State(state): State<AppState>) -> Json<PatternsResponse> {
    let filter = state.gateway.output_filter();
    Json(PatternsResponse {
        enabled: filter.is_enabled(),
        patterns: filter.list_patterns(),
    })
}

async fn add_pattern(
    State(state): State<AppState>,
    Json(pattern): Json<FilterPattern>,
) -> Result<Json<PatternChangeResponse>, ApiError> {
    let filter = state.gateway.output_filter();
    let changed = filter.add_pattern(pattern.clone())?;

    if changed {
        info!(%pattern, "filter pattern added");
        audit(
            &state,
            AuditEventType::FilterPatternAdded,
            None,
            json!({ "pattern": pattern.to_string() }),
        )
        .await;
    }

    Ok(Json(PatternChangeResponse {
        changed,
        patterns: filter.list_patterns(),
    }))
}

async fn remove_pattern(
    State(state): State<AppState>,
    Json(pattern): Json<FilterPattern>,
) -> Json<PatternChangeResponse> {
    let filter = state.gateway.output_filter();
    let changed = filter.remove_pattern(&pattern);

    if changed {
        info!(%pattern, "filter pattern removed");
        audit(
            &state,
            AuditEventType::FilterPatternRemoved,
            None,
            json!({ "pattern": pattern.to_string() }),
        )
        .await;
    }

    Json(PatternChangeResponse {
        changed,
        patterns: filter.list_patterns(),
    })
}

async fn list_tools(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "tools": state.gateway.tools().list_tools() }))
}

async fn add_tool(
    State(state): State<AppState>,
    Json(req): Json<ToolChangeRequest>,
) -> Result<Json<ToolChangeResponse>, ApiError> {
    let tool_name = req.tool_name.trim();
    if tool_name.is_empty() {
        return Err(ApiError::BadTool);
    }

    let tools = state.gateway.tools();
    let changed = tools.add_tool(tool_name);
    if changed {
        audit(
            &state,
            AuditEventType::ToolAdded,
            None,
            json!({ "tool": tool_name }),
        )
        .await;
    }

    Ok(Json(ToolChangeResponse {
        changed,
        tools: tools.list_tools(),
    }))
}

async fn remove_tool(
    State(state): State<AppState>,
    Json(req): Json<ToolChangeRequest>,
) -> Json<ToolChangeResponse> {
    let tools = state.gateway.tools();
    let changed = tools.remove_tool(req.tool_name.trim());
    if changed {
        audit(
            &state,
            AuditEventType::ToolRemoved,
            None,
            json!({ "tool": req.tool_name.trim() }),
        )
        .await;
    }

    Json(ToolChangeResponse {
        changed,
        tools: tools.list_tools(),
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn audit(
    state: &AppState,
    event_type: AuditEventType,
    user_id: Option<&str>,
    details: serde_json::Value,
) {
    let source = AuditSource::new(COMPONENT).with_user(user_id);
    state
        .audit
        .log(AuditEntry::new(event_type, source, details))
        .await;
}

async fn detection_failed(
    state: &AppState,
    route: &str,
    req: &TextRequest,
    err: GatewayError,
) -> ApiError {
    error!(route, %err, "PII request failed");
    audit(
        state,
        AuditEventType::DetectionFailed,
        req.user_id.as_deref(),
        json!({ "route": route, "error": err.to_string() }),
    )
    .await;
    err.into()
}

fn entity_types(entities: &[EntitySpan]) -> Vec<&str> {
    let mut types: Vec<&str> = entities.iter().map(EntitySpan::entity_type).collect();
    types.sort_unstable();
    types.dedup();
    types
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use policy_engine::{DetectionError, EntityDetector, PolicyConfig};
    use tower::ServiceExt;

    struct FixedDetector(Vec<EntitySpan>);

    #[async_trait]
    impl EntityDetector for FixedDetector {
        async fn detect(&self, _text: &str, _language: &str) -> Result<Vec<EntitySpan>, DetectionError> {
            Ok(self.0.clone())
        }
    }

    struct DownDetector;

    #[async_trait]
    impl EntityDetector for DownDetector {
        async fn detect(&self, _text: &str, _language: &str) -> Result<Vec<EntitySpan>, DetectionError> {
            Err(DetectionError::Unreachable("connection refused".into()))
        }
    }

    fn app_with(detector: Arc<dyn EntityDetector>) -> Router {
        let gateway =
            PolicyGateway::new(&PolicyConfig::default(), detector, Duration::from_secs(1)).unwrap();
        router(AppState {
            gateway: Arc::new(gateway),
            audit: AuditSink::disabled(),
        })
    }

    fn app() -> Router {
        app_with(Arc::new(FixedDetector(vec![
            EntitySpan::new("PERSON", 0, 8, 0.95),
            EntitySpan::new("EMAIL_ADDRESS", 12, 28, 1.0),
        ])))
    }

    async fn send(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn root_and_health() {
        let (status, body) = send(app(), Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Policy Gateway API");
        assert_eq!(body["status"], "running");

        let (status, body) = send(app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn check_pii_reports_entities() {
        let (status, body) = send(
            app(),
            Method::POST,
            "/check-pii",
            Some(json!({ "text": "John Doe at john@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["has_pii"], true);
        assert_eq!(body["entities"].as_array().unwrap().len(), 2);
        assert_eq!(body["entities"][0]["type"], "PERSON");
        assert!(body["anonymized_text"].is_null());
    }

    #[tokio::test]
    async fn anonymize_replaces_spans() {
        let (status, body) = send(
            app(),
            Method::POST,
            "/anonymize",
            Some(json!({ "text": "John Doe at john@example.com", "user_id": "u-1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["anonymized_text"], "[PERSON] at [EMAIL_ADDRESS]");
    }

    #[tokio::test]
    async fn detector_outage_is_500_with_detail() {
        let (status, body) = send(
            app_with(Arc::new(DownDetector)),
            Method::POST,
            "/anonymize",
            Some(json!({ "text": "anything" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn invalid_span_is_500() {
        let (status, body) = send(
            app_with(Arc::new(FixedDetector(vec![EntitySpan::new("PERSON", 4, 2, 0.9)]))),
            Method::POST,
            "/check-pii",
            Some(json!({ "text": "some text" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn filter_output_counts_characters() {
        let (status, body) = send(
            app(),
            Method::POST,
            "/filter-output",
            Some(json!({ "text": "Café password: 4111-1111-1111-1111" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filtered_text"], "Café [FILTERED]: [CREDIT_CARD]");
        assert_eq!(body["original_length"], 34);
    }

    #[tokio::test]
    async fn check_tool_allows_and_denies() {
        let (_, body) = send(
            app(),
            Method::POST,
            "/check-tool",
            Some(json!({ "tool_name": "calculator" })),
        )
        .await;
        assert_eq!(body["allowed"], true);
        assert!(body["reason"].is_null());

        let (_, body) = send(
            app(),
            Method::POST,
            "/check-tool",
            Some(json!({ "tool_name": "shell", "user_id": "u-2" })),
        )
        .await;
        assert_eq!(body["allowed"], false);
        assert_eq!(body["reason"], "Tool not in allowlist");
    }

    #[tokio::test]
    async fn pattern_administration() {
        let app = app();

        let (status, body) = send(
            app.clone(),
            Method::POST,
            "/filter-patterns",
            Some(json!({ "regex": r"sk-\w+" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], true);

        let (_, body) = send(
            app.clone(),
            Method::POST,
            "/filter-output",
            Some(json!({ "text": "key sk-abc123" })),
        )
        .await;
        assert_eq!(body["filtered_text"], "key [FILTERED]");

        let (_, body) = send(
            app.clone(),
            Method::DELETE,
            "/filter-patterns",
            Some(json!({ "regex": r"sk-\w+" })),
        )
        .await;
        assert_eq!(body["changed"], true);

        let (_, body) = send(app, Method::GET, "/filter-patterns", None).await;
        assert_eq!(body["enabled"], true);
        assert_eq!(body["patterns"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn bad_pattern_is_400() {
        let (status, body) = send(
            app(),
            Method::POST,
            "/filter-patterns",
            Some(json!({ "regex": "(" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn tool_administration() {
        let app = app();

        let (status, body) = send(
            app.clone(),
            Method::POST,
            "/tools",
            Some(json!({ "tool_name": "shell" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], true);

        let (_, body) = send(
            app.clone(),
            Method::POST,
            "/check-tool",
            Some(json!({ "tool_name": "shell" })),
        )
        .await;
        assert_eq!(body["allowed"], true);

        let (_, body) = send(
            app.clone(),
            Method::DELETE,
            "/tools",
            Some(json!({ "tool_name": "shell" })),
        )
        .await;
        assert_eq!(body["changed"], true);
        assert_eq!(
            body["tools"],
            json!(["web_search", "calculator", "code_interpreter"])
        );

        let (_, body) = send(
            app.clone(),
            Method::DELETE,
            "/tools",
            Some(json!({ "tool_name": "shell" })),
        )
        .await;
        assert_eq!(body["changed"], false);

        let (status, _) = send(app, Method::POST, "/tools", Some(json!({ "tool_name": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tools_lists_allowlist() {
        let (_, body) = send(app(), Method::GET, "/tools", None).await;
        assert_eq!(
            body["tools"],
            json!(["web_search", "calculator", "code_interpreter"])
        );
    }
}
