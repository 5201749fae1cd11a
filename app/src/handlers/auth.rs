use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::{AppState, auth::{CurrentUser, USER_SESSION_KEY}};
use serde_json::json;
use std::sync::Arc;
use tower_sessions::Session;
use users::models::{LoginRequest, RawRegisterRequest};
use users::service::{UserError, UserService};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            AuthError::User(UserError::Validation(errors)) => return errors.into_response(),
            AuthError::User(UserError::Conflict) => (StatusCode::CONFLICT, "Username already exists".to_string()),
            AuthError::User(UserError::InvalidCredentials) => (
                StatusCode::UNAUTHORIZED,
                "Invalid username or password".to_string(),
            ),
            AuthError::User(UserError::NotFound) => (StatusCode::NOT_FOUND, "User not found".to_string()),
            AuthError::User(UserError::Infrastructure(e)) => {
                tracing::error!("User infrastructure error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AuthError::Session(e) => {
                tracing::error!("Session error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RawRegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let user = UserService::register(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let user = UserService::authenticate(&state.db, &payload.username, &payload.password)
        .await
        .inspect_err(|e| {
            if matches!(e, UserError::InvalidCredentials) {
                tracing::warn!("Failed login attempt");
            }
        })?;

    // New id on login so a pre-login session id cannot be reused.
    session.cycle_id().await?;
    session.insert(USER_SESSION_KEY, user.id).await?;

    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(user))
}

pub async fn logout(session: Session) -> Result<impl IntoResponse, AuthError> {
    session.flush().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AuthError> {
    let user = UserService::get_user(&state.db, user.id).await?;
    Ok(Json(user))
}
