use crate::service::{
    DEFAULT_SAVINGS_MONTHS, DEFAULT_SUMMARY_DAYS, DEFAULT_TREND_MONTHS, ReportError, ReportService,
};
use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use common::auth::CurrentUser;
use common::validation::parse_date;
use common::{AppState, ValidationErrors};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        match self {
            ReportError::Validation(errors) => errors.into_response(),
            ReportError::Infrastructure(e) => {
                tracing::error!("Report infrastructure error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateRangeQuery {
    fn parse(self) -> Result<(Option<NaiveDate>, Option<NaiveDate>), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut date = |field: &'static str, raw: Option<String>| {
            raw.filter(|s| !s.trim().is_empty())
                .and_then(|s| parse_date(&mut errors, field, &s))
        };
        let start = date("start_date", self.start_date);
        let end = date("end_date", self.end_date);
        errors.into_result((start, end))
    }
}

#[derive(Debug, Deserialize)]
pub struct MonthsQuery {
    pub months: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub days: Option<u32>,
}

pub fn reports_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/spending-by-category", get(spending_by_category))
        .route("/income-vs-expenses", get(income_vs_expenses))
        .route("/goals-progress", get(goals_progress))
        .route("/savings-trend", get(savings_trend))
        .route("/dashboard-summary", get(dashboard_summary))
        .route("/overview", get(overview))
        .with_state(state)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

async fn spending_by_category(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<DateRangeQuery>,
) -> Result<impl IntoResponse, ReportError> {
    let (start, end) = query.parse().map_err(ReportError::Validation)?;
    let report = ReportService::spending_by_category(&state.db, user.id, start, end).await?;
    Ok(Json(report))
}

async fn income_vs_expenses(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<MonthsQuery>,
) -> Result<impl IntoResponse, ReportError> {
    let months = query.months.unwrap_or(DEFAULT_TREND_MONTHS);
    let report = ReportService::income_vs_expenses(&state.db, user.id, today(), months).await?;
    Ok(Json(report))
}

async fn goals_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ReportError> {
    let report = ReportService::goals_progress(&state.db, user.id).await?;
    Ok(Json(report))
}

async fn savings_trend(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<MonthsQuery>,
) -> Result<impl IntoResponse, ReportError> {
    let months = query.months.unwrap_or(DEFAULT_SAVINGS_MONTHS);
    let report = ReportService::savings_trend(&state.db, user.id, today(), months).await?;
    Ok(Json(report))
}

async fn dashboard_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<DaysQuery>,
) -> Result<impl IntoResponse, ReportError> {
    let days = query.days.unwrap_or(DEFAULT_SUMMARY_DAYS);
    let report = ReportService::dashboard_summary(&state.db, user.id, today(), days).await?;
    Ok(Json(report))
}

async fn overview(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ReportError> {
    let overview = ReportService::overview(&state.db, user.id, today()).await?;
    Ok(Json(overview))
}
