use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use serde_json::json;

/// Root handler — returns a minimal landing page with links
pub async fn root_handler() -> impl IntoResponse {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <title>Settlement Engine API</title>
  <style>
    body { font-family: system-ui, sans-serif; background: #0f172a; color: #e2e8f0; padding: 48px; }
    h1 { font-size: 2rem; margin-bottom: 4px; }
    p { color: #94a3b8; }
    a { color: #38bdf8; }
    ul { line-height: 1.9; }
  </style>
</head>
<body>
  <h1>Settlement Engine API</h1>
  <p>Payroll and sales-commission settlement for the business-management platform.</p>
  <ul>
    <li><a href="/docs">Swagger UI</a></li>
    <li><a href="/health">Health check</a></li>
  </ul>
</body>
</html>"#,
    )
}

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "service": "settlement-engine",
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "database": "disconnected",
                "error": e.to_string()
            })),
        ),
    }
}
