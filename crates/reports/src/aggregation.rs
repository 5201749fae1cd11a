//! Pure read-side aggregation over one user's transactions and goals.
//!
//! Nothing in here touches the database or the clock: callers pass the rows
//! and "today", so every view is reproducible from its inputs.

use crate::models::{
    CategoryTotal, DashboardSummary, GoalProgressPoint, GoalsProgress, IncomeVsExpenses,
    MonthBucket, ProgressTier, SavingsPoint, SavingsTrend, SpendingByCategory,
};
use chrono::{Datelike, Days, Months, NaiveDate};
use common::Money;
use goals::{Goal, GoalStatus};
use std::collections::{BTreeMap, HashMap};
use transactions::{Transaction, TransactionType, category_label};

pub const TOP_CATEGORY_LIMIT: usize = 5;
pub const GOAL_LABEL_MAX_CHARS: usize = 20;

/// First day of an inclusive window covering the trailing `months` calendar
/// months up to `today`.
pub fn months_back(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

pub fn days_back(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

fn within(t: &Transaction, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.is_none_or(|s| t.date >= s) && end.is_none_or(|e| t.date <= e)
}

fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

/// `("2026-05", "May 2026")`
fn month_labels((year, month): (i32, u32)) -> (String, String) {
    let key = format!("{year:04}-{month:02}");
    let label = NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_else(|| key.clone());
    (key, label)
}

/// Sums expense amounts per category, keeping first-seen order.
fn category_totals<'a>(expenses: impl Iterator<Item = &'a Transaction>) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for t in expenses {
        match index.get(t.category.as_str()) {
            Some(&i) => totals[i].total += t.amount,
            None => {
                index.insert(t.category.as_str(), totals.len());
                totals.push(CategoryTotal {
                    category: t.category.clone(),
                    label: category_label(&t.category).to_string(),
                    total: t.amount,
                });
            }
        }
    }
    totals
}

/// `None` when no expense falls in the range.
pub fn spending_by_category(
    transactions: &[Transaction],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Option<SpendingByCategory> {
    let categories = category_totals(
        transactions
            .iter()
            .filter(|t| t.kind == TransactionType::Expense && within(t, start, end)),
    );
    if categories.is_empty() {
        return None;
    }

    let total_spending = categories.iter().map(|c| c.total).sum();
    Some(SpendingByCategory {
        category_count: categories.len(),
        categories,
        total_spending,
    })
}

pub fn income_vs_expenses(transactions: &[Transaction], today: NaiveDate, months: u32) -> IncomeVsExpenses {
    let start = Some(months_back(today, months));
    let mut buckets: BTreeMap<(i32, u32), (Money, Money)> = BTreeMap::new();

    for t in transactions.iter().filter(|t| within(t, start, Some(today))) {
        let (income, expenses) = buckets.entry(month_key(t.date)).or_default();
        match t.kind {
            TransactionType::Income => *income += t.amount,
            TransactionType::Expense => *expenses += t.amount,
        }
    }

    let months: Vec<MonthBucket> = buckets
        .into_iter()
        .map(|(key, (income, expenses))| {
            let (month, label) = month_labels(key);
            MonthBucket {
                month,
                label,
                income,
                expenses,
            }
        })
        .collect();

    let total_income: Money = months.iter().map(|m| m.income).sum();
    let total_expenses: Money = months.iter().map(|m| m.expenses).sum();
    IncomeVsExpenses {
        months,
        total_income,
        total_expenses,
        net_savings: total_income - total_expenses,
    }
}

fn goal_label(name: &str) -> String {
    if name.chars().count() > GOAL_LABEL_MAX_CHARS {
        let head: String = name.chars().take(GOAL_LABEL_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

/// Active and completed goals by ascending deadline. `None` when there are none.
pub fn goals_progress(goals: &[Goal]) -> Option<GoalsProgress> {
    let mut selected: Vec<&Goal> = goals
        .iter()
        .filter(|g| matches!(g.status, GoalStatus::Active | GoalStatus::Completed))
        .collect();
    if selected.is_empty() {
        return None;
    }
    selected.sort_by_key(|g| g.deadline);

    let points: Vec<GoalProgressPoint> = selected
        .into_iter()
        .map(|g| {
            let progress_percentage = g.progress_percentage();
            GoalProgressPoint {
                goal_id: g.id,
                label: goal_label(&g.name),
                progress_percentage,
                target_amount: g.target_amount,
                tier: ProgressTier::for_progress(progress_percentage),
            }
        })
        .collect();

    let average_progress = points.iter().map(|p| p.progress_percentage).sum::<f64>() / points.len() as f64;
    Some(GoalsProgress {
        total_goals: points.len(),
        completed_goals: points.iter().filter(|p| p.progress_percentage >= 100.0).count(),
        average_progress,
        goals: points,
    })
}

/// Monthly net and its running total. `None` when the window is empty.
pub fn savings_trend(transactions: &[Transaction], today: NaiveDate, months: u32) -> Option<SavingsTrend> {
    let start = Some(months_back(today, months));
    let mut nets: BTreeMap<(i32, u32), Money> = BTreeMap::new();

    for t in transactions.iter().filter(|t| within(t, start, Some(today))) {
        let net = nets.entry(month_key(t.date)).or_default();
        match t.kind {
            TransactionType::Income => *net += t.amount,
            TransactionType::Expense => *net -= t.amount,
        }
    }

    let mut cumulative = Money::ZERO;
    let points: Vec<SavingsPoint> = nets
        .into_iter()
        .map(|(key, net)| {
            cumulative += net;
            let (month, label) = month_labels(key);
            SavingsPoint {
                month,
                label,
                net,
                cumulative,
            }
        })
        .collect();

    let current_savings = points.last()?.cumulative;
    let best_month = points.iter().map(|p| p.net).max()?;
    let worst_month = points.iter().map(|p| p.net).min()?;
    Some(SavingsTrend {
        months: points,
        current_savings,
        best_month,
        worst_month,
    })
}

pub fn dashboard_summary(transactions: &[Transaction], today: NaiveDate, days: u32) -> DashboardSummary {
    let start = Some(days_back(today, days));
    let window: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| within(t, start, Some(today)))
        .collect();

    let mut total_income = Money::ZERO;
    let mut total_expenses = Money::ZERO;
    for t in &window {
        match t.kind {
            TransactionType::Income => total_income += t.amount,
            TransactionType::Expense => total_expenses += t.amount,
        }
    }

    let mut top_categories = category_totals(window.iter().copied().filter(|t| t.is_expense()));
    // Stable, so equal totals keep first-seen order.
    top_categories.sort_by(|a, b| b.total.cmp(&a.total));
    top_categories.truncate(TOP_CATEGORY_LIMIT);

    DashboardSummary {
        total_income,
        total_expenses,
        net_amount: total_income - total_expenses,
        transaction_count: window.len(),
        top_categories,
        period_days: days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tx(kind: TransactionType, category: &str, cents: i64, on: &str) -> Transaction {
        Transaction {
            id: 0,
            user_id: 1,
            kind,
            category: category.into(),
            amount: Money::from_cents(cents),
            date: date(on),
            description: "entry".into(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn income(category: &str, cents: i64, on: &str) -> Transaction {
        tx(TransactionType::Income, category, cents, on)
    }

    fn expense(category: &str, cents: i64, on: &str) -> Transaction {
        tx(TransactionType::Expense, category, cents, on)
    }

    fn goal(name: &str, target: i64, current: i64, status: GoalStatus, deadline: &str) -> Goal {
        Goal {
            id: 0,
            user_id: 1,
            name: name.into(),
            description: None,
            target_amount: Money::from_cents(target),
            current_amount: Money::from_cents(current),
            deadline: date(deadline),
            status,
            created_at: Utc::now(),
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            income("salary", 300000, "2026-06-01"),
            expense("food", 4550, "2026-06-10"),
            expense("bills", 12000, "2026-06-05"),
            expense("food", 2000, "2026-05-20"),
            income("freelance", 50000, "2026-05-02"),
            expense("travel", 80000, "2026-03-14"),
            expense("food", 999, "2025-01-01"),
        ]
    }

    #[test]
    fn test_spending_totals_match_expense_sum() {
        let list = sample();
        let report = spending_by_category(&list, None, None).unwrap();

        let expense_sum: Money = list.iter().filter(|t| t.is_expense()).map(|t| t.amount).sum();
        assert_eq!(report.total_spending, expense_sum);
        assert_eq!(
            report.categories.iter().map(|c| c.total).sum::<Money>(),
            expense_sum
        );
        assert_eq!(report.category_count, 3);
        assert_eq!(report.categories[0].category, "food");
        assert_eq!(report.categories[0].label, "Food & Dining");
        assert_eq!(report.categories[0].total.cents(), 7549);
    }

    #[test]
    fn test_spending_date_range_is_inclusive() {
        let list = sample();
        let report = spending_by_category(&list, Some(date("2026-06-05")), Some(date("2026-06-10"))).unwrap();
        assert_eq!(report.total_spending.cents(), 16550);
    }

    #[test]
    fn test_spending_without_expenses_is_none() {
        let list = vec![income("salary", 100, "2026-06-01")];
        assert_eq!(spending_by_category(&list, None, None), None);
        assert_eq!(spending_by_category(&[], None, None), None);
    }

    #[test]
    fn test_income_vs_expenses_buckets_observed_months() {
        let report = income_vs_expenses(&sample(), today(), 6);

        let labels: Vec<&str> = report.months.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["Mar 2026", "May 2026", "Jun 2026"]);
        assert_eq!(report.months[2].income.cents(), 300000);
        assert_eq!(report.months[2].expenses.cents(), 16550);
        assert_eq!(report.total_income.cents(), 350000);
        assert_eq!(report.total_expenses.cents(), 98550);
        assert_eq!(report.net_savings.cents(), 251450);
    }

    #[test]
    fn test_month_window_edges() {
        let list = vec![
            expense("food", 100, "2025-12-15"),
            expense("food", 100, "2025-12-14"),
            expense("food", 100, "2026-06-16"),
        ];
        let report = income_vs_expenses(&list, today(), 6);
        assert_eq!(report.total_expenses.cents(), 100);
    }

    #[test]
    fn test_income_vs_expenses_empty() {
        let report = income_vs_expenses(&[], today(), 6);
        assert!(report.months.is_empty());
        assert_eq!(report.net_savings, Money::ZERO);
    }

    #[test]
    fn test_savings_trend_running_total() {
        let trend = savings_trend(&sample(), today(), 12).unwrap();

        let nets: Vec<i64> = trend.months.iter().map(|m| m.net.cents()).collect();
        assert_eq!(nets, vec![-80000, 48000, 283450]);
        let cumulative: Vec<i64> = trend.months.iter().map(|m| m.cumulative.cents()).collect();
        assert_eq!(cumulative, vec![-80000, -32000, 251450]);
        assert_eq!(trend.current_savings.cents(), 251450);
        assert_eq!(trend.best_month.cents(), 283450);
        assert_eq!(trend.worst_month.cents(), -80000);
    }

    #[test]
    fn test_savings_trend_empty_window_is_none() {
        let list = vec![expense("food", 999, "2020-01-01")];
        assert_eq!(savings_trend(&list, today(), 12), None);
    }

    #[test]
    fn test_dashboard_summary() {
        let summary = dashboard_summary(&sample(), today(), 30);
        assert_eq!(summary.transaction_count, 4);
        assert_eq!(summary.total_income.cents(), 300000);
        assert_eq!(summary.total_expenses.cents(), 18550);
        assert_eq!(summary.net_amount.cents(), 281450);
        let top: Vec<&str> = summary.top_categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(top, vec!["bills", "food"]);
        assert_eq!(summary.period_days, 30);
    }

    #[test]
    fn test_dashboard_top_categories_are_stable_and_capped() {
        let list = vec![
            expense("food", 1000, "2026-06-10"),
            expense("travel", 5000, "2026-06-10"),
            expense("bills", 1000, "2026-06-10"),
            expense("shopping", 1000, "2026-06-10"),
            expense("housing", 9000, "2026-06-10"),
            expense("education", 1000, "2026-06-10"),
        ];
        let summary = dashboard_summary(&list, today(), 30);
        let top: Vec<&str> = summary.top_categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(top, vec!["housing", "travel", "food", "bills", "shopping"]);
    }

    #[test]
    fn test_dashboard_summary_empty() {
        let summary = dashboard_summary(&[], today(), 30);
        assert_eq!(summary.transaction_count, 0);
        assert_eq!(summary.total_income, Money::ZERO);
        assert_eq!(summary.total_expenses, Money::ZERO);
        assert_eq!(summary.net_amount, Money::ZERO);
        assert!(summary.top_categories.is_empty());
    }

    #[test]
    fn test_goals_progress() {
        let goals = vec![
            goal("A very long goal name for a new house", 100000, 80000, GoalStatus::Active, "2027-01-01"),
            goal("Car", 100000, 100000, GoalStatus::Completed, "2026-09-01"),
            goal("Paused", 100000, 10000, GoalStatus::Paused, "2026-07-01"),
            goal("Trip", 100000, 10000, GoalStatus::Active, "2026-10-01"),
        ];
        let report = goals_progress(&goals).unwrap();

        let labels: Vec<&str> = report.goals.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Car", "Trip", "A very long goal nam..."]);
        let tiers: Vec<ProgressTier> = report.goals.iter().map(|g| g.tier).collect();
        assert_eq!(tiers, vec![ProgressTier::Complete, ProgressTier::Low, ProgressTier::NearComplete]);
        assert_eq!(report.total_goals, 3);
        assert_eq!(report.completed_goals, 1);
        assert!((report.average_progress - 63.333).abs() < 0.01);
    }

    #[test]
    fn test_goals_progress_without_goals_is_none() {
        let paused = vec![goal("Paused", 100, 0, GoalStatus::Paused, "2026-07-01")];
        assert_eq!(goals_progress(&paused), None);
        assert_eq!(goals_progress(&[]), None);
    }
}
