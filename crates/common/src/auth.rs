use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower_sessions::Session;

pub const USER_SESSION_KEY: &str = "user_id";

/// The authenticated user resolved from the session. Every domain handler
/// scopes its reads and writes by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
}

pub async fn auth_middleware(
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let user_id: Option<i64> = session
        .get(USER_SESSION_KEY)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to read session: {}", e);
            None
        });

    match user_id {
        Some(id) => {
            request.extensions_mut().insert(CurrentUser { id });
            next.run(request).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Authentication required" })),
        )
            .into_response(),
    }
}
