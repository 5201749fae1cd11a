use crate::category::TransactionType;
use crate::models::{RawTransactionInput, TransactionFilter};
use crate::service::{TransactionError, TransactionService};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
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

impl IntoResponse for TransactionError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            TransactionError::Validation(errors) => return errors.into_response(),
            TransactionError::NotFound => (StatusCode::NOT_FOUND, "Transaction not found".to_string()),
            TransactionError::Infrastructure(e) => {
                tracing::error!("Transaction infrastructure error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ListQuery {
    /// Empty strings count as "not set", the way an HTML filter form submits them.
    fn into_filter(self) -> Result<(TransactionFilter, u32), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let present = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let kind = present(self.kind).and_then(|k| match k.parse::<TransactionType>() {
            Ok(kind) => Some(kind),
            Err(_) => {
                errors.add("type", "Please select a transaction type");
                None
            }
        });
        let start_date = present(self.start_date).and_then(|d| parse_date(&mut errors, "start_date", &d));
        let end_date = present(self.end_date).and_then(|d| parse_date(&mut errors, "end_date", &d));

        let filter = TransactionFilter {
            kind,
            category: present(self.category),
            start_date,
            end_date,
        };
        errors.into_result((filter, self.page.unwrap_or(1)))
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<u32>,
}

const DEFAULT_RECENT_LIMIT: u32 = 5;

pub fn transactions_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        // Specific routes first
        .route("/", get(list_transactions).post(create_transaction))
        .route("/recent", get(recent_transactions))
        .route("/month/{month}", get(get_month_view))
        .route("/categories/{kind}", get(list_categories))
        // Then parameterized routes
        .route(
            "/{id}",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
        .with_state(state)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, TransactionError> {
    let (filter, page) = query.into_filter().map_err(TransactionError::Validation)?;
    let page = TransactionService::list_page(&state.db, user.id, &filter, page).await?;
    Ok(Json(page))
}

async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<RawTransactionInput>,
) -> Result<impl IntoResponse, TransactionError> {
    let transaction = TransactionService::create_transaction(&state.db, user.id, payload, today()).await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, TransactionError> {
    let transaction = TransactionService::get_transaction(&state.db, user.id, id).await?;
    Ok(Json(transaction))
}

async fn update_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<RawTransactionInput>,
) -> Result<impl IntoResponse, TransactionError> {
    let transaction =
        TransactionService::update_transaction(&state.db, user.id, id, payload, today()).await?;
    Ok(Json(transaction))
}

async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, TransactionError> {
    TransactionService::delete_transaction(&state.db, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn recent_transactions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<RecentQuery>,
) -> Result<impl IntoResponse, TransactionError> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT).max(1);
    let transactions = TransactionService::recent_transactions(&state.db, user.id, limit).await?;
    Ok(Json(transactions))
}

async fn get_month_view(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(month): Path<String>,
) -> Result<impl IntoResponse, TransactionError> {
    tracing::info!("Fetching month view for: {}", month);

    let (transactions, summary) = TransactionService::get_month_view(&state.db, user.id, &month).await?;

    Ok(Json(json!({
        "summary": summary,
        "transactions": transactions,
    })))
}

/// Unknown types get an empty list.
async fn list_categories(Path(kind): Path<String>) -> impl IntoResponse {
    let categories = kind
        .parse::<TransactionType>()
        .map(|kind| kind.categories())
        .unwrap_or(&[]);
    Json(categories)
}
