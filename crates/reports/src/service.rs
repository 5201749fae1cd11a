use crate::aggregation::{self, days_back, months_back};
use crate::models::{
    DashboardSummary, GoalCounts, GoalsProgress, IncomeVsExpenses, Overview, SavingsTrend,
    SpendingByCategory,
};
use chrono::NaiveDate;
use common::ValidationErrors;
use database::Database;
use goals::{GoalError, GoalService, GoalStatus};
use tracing::instrument;
use transactions::{TransactionError, TransactionFilter, TransactionService};

pub const DEFAULT_TREND_MONTHS: u32 = 6;
pub const DEFAULT_SAVINGS_MONTHS: u32 = 12;
pub const DEFAULT_SUMMARY_DAYS: u32 = 30;
pub const OVERVIEW_RECENT_LIMIT: u32 = 5;
pub const OVERVIEW_GOAL_LIMIT: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Invalid input: {0}")]
    Validation(ValidationErrors),
    #[error("Database error: {0}")]
    Infrastructure(String),
}

impl From<TransactionError> for ReportError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Validation(errors) => ReportError::Validation(errors),
            other => ReportError::Infrastructure(other.to_string()),
        }
    }
}

impl From<GoalError> for ReportError {
    fn from(err: GoalError) -> Self {
        match err {
            GoalError::Validation(errors) => ReportError::Validation(errors),
            other => ReportError::Infrastructure(other.to_string()),
        }
    }
}

/// Window lengths must cover at least one month or day.
fn check_window(field: &'static str, value: u32) -> Result<u32, ReportError> {
    if value == 0 {
        return Err(ReportError::Validation(ValidationErrors::single(
            field,
            format!("{field} must be at least 1"),
        )));
    }
    Ok(value)
}

pub struct ReportService;

impl ReportService {
    #[instrument(skip(db))]
    pub async fn spending_by_category(
        db: &Database,
        user_id: i64,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Option<SpendingByCategory>, ReportError> {
        let filter = TransactionFilter {
            start_date: start,
            end_date: end,
            ..TransactionFilter::expenses()
        };
        let transactions = TransactionService::list_transactions(db, user_id, &filter).await?;
        Ok(aggregation::spending_by_category(&transactions, start, end))
    }

    #[instrument(skip(db))]
    pub async fn income_vs_expenses(
        db: &Database,
        user_id: i64,
        today: NaiveDate,
        months: u32,
    ) -> Result<IncomeVsExpenses, ReportError> {
        let months = check_window("months", months)?;
        let filter = TransactionFilter::between(months_back(today, months), today);
        let transactions = TransactionService::list_transactions(db, user_id, &filter).await?;
        Ok(aggregation::income_vs_expenses(&transactions, today, months))
    }

    #[instrument(skip(db))]
    pub async fn goals_progress(db: &Database, user_id: i64) -> Result<Option<GoalsProgress>, ReportError> {
        let goals = GoalService::list_goals(db, user_id).await?;
        Ok(aggregation::goals_progress(&goals))
    }

    #[instrument(skip(db))]
    pub async fn savings_trend(
        db: &Database,
        user_id: i64,
        today: NaiveDate,
        months: u32,
    ) -> Result<Option<SavingsTrend>, ReportError> {
        let months = check_window("months", months)?;
        let filter = TransactionFilter::between(months_back(today, months), today);
        let transactions = TransactionService::list_transactions(db, user_id, &filter).await?;
        Ok(aggregation::savings_trend(&transactions, today, months))
    }

    #[instrument(skip(db))]
    pub async fn dashboard_summary(
        db: &Database,
        user_id: i64,
        today: NaiveDate,
        days: u32,
    ) -> Result<DashboardSummary, ReportError> {
        let days = check_window("days", days)?;
        let filter = TransactionFilter::between(days_back(today, days), today);
        // Oldest first, so top categories tie-break by first occurrence in time.
        let mut transactions = TransactionService::list_transactions(db, user_id, &filter).await?;
        transactions.reverse();
        Ok(aggregation::dashboard_summary(&transactions, today, days))
    }

    #[instrument(skip(db))]
    pub async fn overview(db: &Database, user_id: i64, today: NaiveDate) -> Result<Overview, ReportError> {
        let totals = TransactionService::totals(db, user_id, &TransactionFilter::default()).await?;
        let recent_transactions =
            TransactionService::recent_transactions(db, user_id, OVERVIEW_RECENT_LIMIT).await?;
        let goals = GoalService::list_goals(db, user_id).await?;

        let goal_counts = GoalCounts {
            total_goals: goals.len(),
            active_goals: goals.iter().filter(|g| g.status == GoalStatus::Active).count(),
            completed_goals: goals.iter().filter(|g| g.status == GoalStatus::Completed).count(),
        };
        let active_goals = goals
            .into_iter()
            .filter(|g| g.status == GoalStatus::Active)
            .take(OVERVIEW_GOAL_LIMIT)
            .map(|g| g.view(today))
            .collect();

        Ok(Overview {
            totals,
            recent_transactions,
            goal_counts,
            active_goals,
        })
    }
}
