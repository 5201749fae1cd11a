use crate::models::{AddProgressRequest, RawGoalInput, SetProgressRequest};
use crate::service::{GoalError, GoalService};
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use common::AppState;
use common::auth::CurrentUser;
use serde_json::json;
use std::sync::Arc;

impl IntoResponse for GoalError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            GoalError::Validation(errors) => return errors.into_response(),
            GoalError::NotFound => (StatusCode::NOT_FOUND, "Goal not found".to_string()),
            GoalError::InvalidTransition(e) => (StatusCode::CONFLICT, e.to_string()),
            GoalError::Infrastructure(e) => {
                tracing::error!("Goal infrastructure error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn goals_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_goals).post(create_goal))
        .route("/stats", get(goal_stats))
        .route(
            "/{id}",
            get(get_goal).put(update_goal).delete(delete_goal),
        )
        .route("/{id}/progress", post(add_progress).put(set_progress))
        .route("/{id}/complete", post(mark_complete))
        .route("/{id}/pause", post(pause_goal))
        .route("/{id}/resume", post(resume_goal))
        .with_state(state)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

async fn list_goals(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, GoalError> {
    let list = GoalService::goal_list(&state.db, user.id, today()).await?;
    Ok(Json(list))
}

async fn goal_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, GoalError> {
    let stats = GoalService::stats(&state.db, user.id, today()).await?;
    Ok(Json(stats))
}

async fn create_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<RawGoalInput>,
) -> Result<impl IntoResponse, GoalError> {
    let today = today();
    let goal = GoalService::create_goal(&state.db, user.id, payload, today).await?;

    Ok((StatusCode::CREATED, Json(goal.view(today))))
}

async fn get_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, GoalError> {
    let goal = GoalService::get_goal(&state.db, user.id, id).await?;
    Ok(Json(goal.view(today())))
}

async fn update_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<RawGoalInput>,
) -> Result<impl IntoResponse, GoalError> {
    let today = today();
    let goal = GoalService::update_goal(&state.db, user.id, id, payload, today).await?;
    Ok(Json(goal.view(today)))
}

async fn delete_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, GoalError> {
    GoalService::delete_goal(&state.db, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<AddProgressRequest>,
) -> Result<impl IntoResponse, GoalError> {
    let amount = payload.validate().map_err(GoalError::Validation)?;
    let outcome = GoalService::add_progress(&state.db, user.id, id, amount, today()).await?;
    Ok(Json(outcome))
}

async fn set_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<SetProgressRequest>,
) -> Result<impl IntoResponse, GoalError> {
    let amount = payload.validate().map_err(GoalError::Validation)?;
    let outcome = GoalService::set_progress(&state.db, user.id, id, amount, today()).await?;
    Ok(Json(outcome))
}

async fn mark_complete(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, GoalError> {
    let outcome = GoalService::mark_complete(&state.db, user.id, id, today()).await?;
    Ok(Json(outcome))
}

async fn pause_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, GoalError> {
    let goal = GoalService::pause_goal(&state.db, user.id, id).await?;
    Ok(Json(goal.view(today())))
}

async fn resume_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, GoalError> {
    let goal = GoalService::resume_goal(&state.db, user.id, id).await?;
    Ok(Json(goal.view(today())))
}
