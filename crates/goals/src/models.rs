use chrono::{DateTime, Days, NaiveDate, Utc};
use common::validation::{amount_text, char_len, check_money_range, optional_amount_text, parse_date, parse_money};
use common::{Money, ValidationErrors};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const NAME_MIN_LEN: usize = 3;
pub const NAME_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;
pub const MIN_TARGET_CENTS: i64 = 100;
pub const MAX_GOAL_AMOUNT_CENTS: i64 = 999_999_999;
pub const MIN_ADD_CENTS: i64 = 1;
pub const MAX_ADD_CENTS: i64 = 99_999_999;
/// Shortest allowed lead time for a new deadline.
pub const MIN_LEAD_DAYS: u64 = 7;
/// Furthest allowed deadline, counted forward from today.
pub const MAX_HORIZON_DAYS: u64 = 20 * 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Paused,
    Completed,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Paused => "paused",
            GoalStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(GoalStatus::Active),
            "paused" => Ok(GoalStatus::Paused),
            "completed" => Ok(GoalStatus::Completed),
            other => Err(format!("Unknown goal status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Cannot move a {from} goal to {to}")]
pub struct StatusTransitionError {
    pub from: GoalStatus,
    pub to: GoalStatus,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Goal {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub target_amount: Money,
    pub current_amount: Money,
    pub deadline: NaiveDate,
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Capped at 100. A non-positive target reads as no progress.
    pub fn progress_percentage(&self) -> f64 {
        self.current_amount
            .percent_of(self.target_amount)
            .map(|p| p.min(100.0))
            .unwrap_or(0.0)
    }

    pub fn remaining_amount(&self) -> Money {
        (self.target_amount - self.current_amount).clamp_non_negative()
    }

    /// Reaching the target counts as done whatever the stored status says.
    pub fn is_completed(&self) -> bool {
        self.current_amount >= self.target_amount || self.status == GoalStatus::Completed
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.deadline < today && !self.is_completed()
    }

    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        (self.deadline - today).num_days().max(0)
    }

    /// Replaces the saved amount and moves between active and completed
    /// when the target is crossed. Paused goals keep their status.
    pub fn update_progress(&mut self, amount: Money) {
        self.current_amount = amount.clamp_non_negative();
        if self.current_amount >= self.target_amount && self.status == GoalStatus::Active {
            self.status = GoalStatus::Completed;
        } else if self.current_amount < self.target_amount && self.status == GoalStatus::Completed {
            self.status = GoalStatus::Active;
        }
    }

    pub fn add_progress(&mut self, amount: Money) {
        self.update_progress(self.current_amount + amount);
    }

    /// Forces completion and fills the goal up to its target.
    pub fn mark_complete(&mut self) {
        self.status = GoalStatus::Completed;
        self.current_amount = self.target_amount;
    }

    pub fn pause(&mut self) -> Result<(), StatusTransitionError> {
        match self.status {
            GoalStatus::Active | GoalStatus::Paused => {
                self.status = GoalStatus::Paused;
                Ok(())
            }
            GoalStatus::Completed => Err(StatusTransitionError {
                from: GoalStatus::Completed,
                to: GoalStatus::Paused,
            }),
        }
    }

    pub fn resume(&mut self) -> Result<(), StatusTransitionError> {
        match self.status {
            GoalStatus::Paused | GoalStatus::Active => {
                self.status = GoalStatus::Active;
                Ok(())
            }
            GoalStatus::Completed => Err(StatusTransitionError {
                from: GoalStatus::Completed,
                to: GoalStatus::Active,
            }),
        }
    }

    /// Applies an edit: replaces the descriptive fields, routes the submitted
    /// amount through [`Goal::update_progress`] and then takes the submitted status.
    pub fn apply(&mut self, draft: GoalDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.target_amount = draft.target_amount;
        self.update_progress(draft.current_amount);
        self.deadline = draft.deadline;
        self.status = draft.status;
    }

    pub fn view(self, today: NaiveDate) -> GoalView {
        let progress_percentage = self.progress_percentage();
        GoalView {
            progress_percentage,
            remaining_amount: self.remaining_amount(),
            is_completed: self.is_completed(),
            is_overdue: self.is_overdue(today),
            days_remaining: self.days_remaining(today),
            motivation: Motivation::for_progress(progress_percentage),
            goal: self,
        }
    }
}

/// A goal together with everything derived from it for a given day.
#[derive(Debug, Clone, Serialize)]
pub struct GoalView {
    #[serde(flatten)]
    pub goal: Goal,
    pub progress_percentage: f64,
    pub remaining_amount: Money,
    pub is_completed: bool,
    pub is_overdue: bool,
    pub days_remaining: i64,
    pub motivation: Motivation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotivationTier {
    Completed,
    AlmostThere,
    Halfway,
    GoodProgress,
    GettingStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Motivation {
    pub tier: MotivationTier,
    pub message: &'static str,
}

impl Motivation {
    pub fn for_progress(progress_percentage: f64) -> Self {
        let (tier, message) = if progress_percentage >= 100.0 {
            (MotivationTier::Completed, "Congratulations! Goal completed!")
        } else if progress_percentage >= 75.0 {
            (MotivationTier::AlmostThere, "Almost there! Keep up the great work!")
        } else if progress_percentage >= 50.0 {
            (MotivationTier::Halfway, "Halfway there! You're doing amazing!")
        } else if progress_percentage >= 25.0 {
            (MotivationTier::GoodProgress, "Great progress! Keep building that momentum!")
        } else {
            (MotivationTier::GettingStarted, "Every step counts! You've got this!")
        };
        Self { tier, message }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGoalInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "amount_text")]
    pub target_amount: String,
    #[serde(default, deserialize_with = "optional_amount_text")]
    pub current_amount: Option<String>,
    pub deadline: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// A goal definition that passed every field rule.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalDraft {
    name: String,
    description: Option<String>,
    target_amount: Money,
    current_amount: Money,
    deadline: NaiveDate,
    status: GoalStatus,
}

impl GoalDraft {
    /// Every field is checked independently; all failures are returned together.
    pub fn new(raw: RawGoalInput, today: NaiveDate) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = raw.name.trim().to_string();
        if name.is_empty() {
            errors.add("name", "Goal name cannot be empty or contain only spaces");
        } else if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&char_len(&name)) {
            errors.add(
                "name",
                format!(
                    "Goal name must be between {} and {} characters",
                    NAME_MIN_LEN, NAME_MAX_LEN
                ),
            );
        }

        let description = raw
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if description
            .as_deref()
            .is_some_and(|d| char_len(d) > DESCRIPTION_MAX_LEN)
        {
            errors.add("description", "Description cannot exceed 500 characters");
        }

        let target_amount = parse_money(&mut errors, "target_amount", &raw.target_amount).filter(|amount| {
            let ok = (Money::from_cents(MIN_TARGET_CENTS)..=Money::from_cents(MAX_GOAL_AMOUNT_CENTS)).contains(amount);
            if !ok {
                errors.add(
                    "target_amount",
                    "Target amount must be between $1.00 and $9,999,999.99",
                );
            }
            ok
        });

        let current_amount = match raw.current_amount.as_deref().map(str::trim) {
            None | Some("") => Some(Money::ZERO),
            Some(text) => parse_money(&mut errors, "current_amount", text).filter(|amount| {
                let ok = (Money::ZERO..=Money::from_cents(MAX_GOAL_AMOUNT_CENTS)).contains(amount);
                if !ok {
                    errors.add(
                        "current_amount",
                        "Current amount cannot be negative or exceed $9,999,999.99",
                    );
                }
                ok
            }),
        };

        if let (Some(target), Some(current)) = (target_amount, current_amount) {
            if current > target {
                errors.add("current_amount", "Current progress cannot exceed the target amount");
            }
        }

        let deadline = parse_date(&mut errors, "deadline", &raw.deadline).filter(|deadline| {
            match check_deadline(*deadline, today) {
                Ok(()) => true,
                Err(message) => {
                    errors.add("deadline", message);
                    false
                }
            }
        });

        let status = match raw.status.as_deref().map(str::trim) {
            None | Some("") => Some(GoalStatus::Active),
            Some(text) => match text.parse::<GoalStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    errors.add("status", "Please select a status");
                    None
                }
            },
        };

        match (target_amount, current_amount, deadline, status) {
            (Some(target_amount), Some(current_amount), Some(deadline), Some(status)) if errors.is_empty() => {
                Ok(Self {
                    name,
                    description,
                    target_amount,
                    current_amount,
                    deadline,
                    status,
                })
            }
            _ => Err(errors),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn target_amount(&self) -> Money {
        self.target_amount
    }

    pub fn current_amount(&self) -> Money {
        self.current_amount
    }

    pub fn deadline(&self) -> NaiveDate {
        self.deadline
    }

    pub fn status(&self) -> GoalStatus {
        self.status
    }
}

/// Deadline rules, checked in order. A deadline inside the first week is a
/// hard rejection, not a warning.
fn check_deadline(deadline: NaiveDate, today: NaiveDate) -> Result<(), &'static str> {
    let horizon = today
        .checked_add_days(Days::new(MAX_HORIZON_DAYS))
        .unwrap_or(NaiveDate::MAX);
    let earliest = today
        .checked_add_days(Days::new(MIN_LEAD_DAYS))
        .unwrap_or(NaiveDate::MAX);

    if deadline <= today {
        Err("Target date must be in the future")
    } else if deadline > horizon {
        Err("Target date cannot be more than 20 years in the future")
    } else if deadline < earliest {
        Err("Consider setting a target date at least one week from now for realistic planning")
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddProgressRequest {
    #[serde(deserialize_with = "amount_text")]
    pub amount: String,
}

impl AddProgressRequest {
    pub fn validate(&self) -> Result<Money, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let amount = parse_money(&mut errors, "amount", &self.amount).filter(|amount| {
            check_money_range(
                &mut errors,
                "amount",
                *amount,
                Money::from_cents(MIN_ADD_CENTS),
                Money::from_cents(MAX_ADD_CENTS),
            )
        });
        match amount {
            Some(amount) => Ok(amount),
            None => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetProgressRequest {
    #[serde(deserialize_with = "amount_text")]
    pub current_amount: String,
}

impl SetProgressRequest {
    pub fn validate(&self) -> Result<Money, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let amount = parse_money(&mut errors, "current_amount", &self.current_amount).filter(|amount| {
            let ok = (Money::ZERO..=Money::from_cents(MAX_GOAL_AMOUNT_CENTS)).contains(amount);
            if !ok {
                errors.add(
                    "current_amount",
                    "Progress cannot be negative or exceed $9,999,999.99",
                );
            }
            ok
        });
        match amount {
            Some(amount) => Ok(amount),
            None => Err(errors),
        }
    }
}

/// Result of a progress change.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressOutcome {
    pub goal: GoalView,
    /// The goal was below 100% before this call and is completed now.
    pub just_completed: bool,
    pub progress_change: f64,
}

impl ProgressOutcome {
    pub fn new(before: f64, goal: Goal, today: NaiveDate) -> Self {
        let goal = goal.view(today);
        Self {
            just_completed: goal.is_completed && before < 100.0,
            progress_change: goal.progress_percentage - before,
            goal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalTotals {
    pub total_goals: usize,
    pub total_target: Money,
    pub total_current: Money,
    pub overall_progress: f64,
}

impl GoalTotals {
    pub fn from_goals(goals: &[Goal]) -> Self {
        let total_target: Money = goals.iter().map(|g| g.target_amount).sum();
        let total_current: Money = goals.iter().map(|g| g.current_amount).sum();
        Self {
            total_goals: goals.len(),
            total_target,
            total_current,
            overall_progress: total_current.percent_of(total_target).unwrap_or(0.0),
        }
    }
}

/// The goal list split the way the goals page shows it. A goal may appear in
/// more than one group (an overdue goal is also active).
#[derive(Debug, Clone, Serialize)]
pub struct GoalList {
    pub active: Vec<GoalView>,
    pub completed: Vec<GoalView>,
    pub overdue: Vec<GoalView>,
    #[serde(flatten)]
    pub totals: GoalTotals,
}

impl GoalList {
    pub fn partition(goals: Vec<Goal>, today: NaiveDate) -> Self {
        let totals = GoalTotals::from_goals(&goals);
        let mut list = Self {
            active: Vec::new(),
            completed: Vec::new(),
            overdue: Vec::new(),
            totals,
        };

        for goal in goals {
            let active = goal.status == GoalStatus::Active;
            let view = goal.view(today);
            if view.is_overdue && active {
                list.overdue.push(view.clone());
            }
            if view.is_completed {
                list.completed.push(view);
            } else if active {
                list.active.push(view);
            }
        }
        list
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalStats {
    pub total_goals: usize,
    pub active_goals: usize,
    pub completed_goals: usize,
    pub overdue_goals: usize,
    pub total_target_amount: Money,
    pub total_current_amount: Money,
    pub overall_progress: f64,
}

impl GoalStats {
    pub fn from_goals(goals: &[Goal], today: NaiveDate) -> Self {
        let totals = GoalTotals::from_goals(goals);
        Self {
            total_goals: totals.total_goals,
            active_goals: goals.iter().filter(|g| g.status == GoalStatus::Active).count(),
            completed_goals: goals.iter().filter(|g| g.is_completed()).count(),
            overdue_goals: goals.iter().filter(|g| g.is_overdue(today)).count(),
            total_target_amount: totals.total_target,
            total_current_amount: totals.total_current,
            overall_progress: totals.overall_progress,
        }
    }
}
