use common::Money;
use goals::GoalView;
use serde::Serialize;
use transactions::{Transaction, TransactionTotals};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub label: String,
    pub total: Money,
}

/// Expense totals per category over an optional date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingByCategory {
    /// In the order each category was first seen.
    pub categories: Vec<CategoryTotal>,
    pub total_spending: Money,
    pub category_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthBucket {
    /// `YYYY-MM`
    pub month: String,
    /// `Mon YYYY`
    pub label: String,
    pub income: Money,
    pub expenses: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomeVsExpenses {
    /// Oldest first. Months without transactions are left out.
    pub months: Vec<MonthBucket>,
    pub total_income: Money,
    pub total_expenses: Money,
    pub net_savings: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressTier {
    Complete,
    NearComplete,
    Moderate,
    Low,
}

impl ProgressTier {
    pub fn for_progress(progress_percentage: f64) -> Self {
        if progress_percentage >= 100.0 {
            ProgressTier::Complete
        } else if progress_percentage >= 75.0 {
            ProgressTier::NearComplete
        } else if progress_percentage >= 50.0 {
            ProgressTier::Moderate
        } else {
            ProgressTier::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgressPoint {
    pub goal_id: i64,
    pub label: String,
    pub progress_percentage: f64,
    pub target_amount: Money,
    pub tier: ProgressTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalsProgress {
    pub goals: Vec<GoalProgressPoint>,
    pub total_goals: usize,
    pub completed_goals: usize,
    pub average_progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavingsPoint {
    pub month: String,
    pub label: String,
    pub net: Money,
    pub cumulative: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavingsTrend {
    pub months: Vec<SavingsPoint>,
    pub current_savings: Money,
    pub best_month: Money,
    pub worst_month: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_income: Money,
    pub total_expenses: Money,
    pub net_amount: Money,
    pub transaction_count: usize,
    /// At most five, largest first.
    pub top_categories: Vec<CategoryTotal>,
    pub period_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GoalCounts {
    pub total_goals: usize,
    pub active_goals: usize,
    pub completed_goals: usize,
}

/// Everything the home page shows.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub totals: TransactionTotals,
    pub recent_transactions: Vec<Transaction>,
    pub goal_counts: GoalCounts,
    pub active_goals: Vec<GoalView>,
}
