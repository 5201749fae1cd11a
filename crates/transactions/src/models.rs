use crate::category::TransactionType;
use chrono::{DateTime, Days, NaiveDate, Utc};
use common::validation::{amount_text, char_len, check_money_range, parse_date, parse_money};
use common::{Money, ValidationErrors};
use serde::{Deserialize, Serialize};

pub const MIN_AMOUNT_CENTS: i64 = 1;
pub const MAX_AMOUNT_CENTS: i64 = 99_999_999;
/// Oldest allowed transaction date, counted back from today.
pub const MAX_AGE_DAYS: u64 = 5 * 365;
pub const DESCRIPTION_MIN_LEN: usize = 2;
pub const DESCRIPTION_MAX_LEN: usize = 200;
pub const NOTES_MAX_LEN: usize = 500;
pub const PAGE_SIZE: u32 = 20;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub description: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionType::Expense
    }
}

/// Raw input as submitted by a client. Nothing here is trusted until it has
/// gone through [`TransactionDraft::new`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawTransactionInput {
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    #[serde(deserialize_with = "amount_text")]
    pub amount: String,
    pub date: String,
    pub description: String,
    pub notes: Option<String>,
}

// ENCAPSULATION: a draft can only be built through new(), so holding one means
// every field rule already passed.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionDraft {
    kind: TransactionType,
    category: String,
    amount: Money,
    date: NaiveDate,
    description: String,
    notes: Option<String>,
}

impl TransactionDraft {
    /// Checks the whole input in one pass and reports every failing field.
    pub fn new(raw: RawTransactionInput, today: NaiveDate) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let kind = match raw.kind.trim().parse::<TransactionType>() {
            Ok(kind) => Some(kind),
            Err(_) => {
                errors.add("type", "Please select a transaction type");
                None
            }
        };

        let category = raw.category.trim().to_string();
        if let Some(kind) = kind {
            if !kind.allows_category(&category) {
                errors.add("category", format!("Invalid category for {} transaction.", kind));
            }
        }

        let amount = parse_money(&mut errors, "amount", &raw.amount).filter(|amount| {
            check_money_range(
                &mut errors,
                "amount",
                *amount,
                Money::from_cents(MIN_AMOUNT_CENTS),
                Money::from_cents(MAX_AMOUNT_CENTS),
            )
        });

        let date = parse_date(&mut errors, "date", &raw.date).filter(|date| {
            let oldest = today
                .checked_sub_days(Days::new(MAX_AGE_DAYS))
                .unwrap_or(NaiveDate::MIN);
            if *date > today {
                errors.add("date", "Transaction date cannot be in the future");
                false
            } else if *date < oldest {
                errors.add("date", "Transaction date cannot be more than 5 years ago");
                false
            } else {
                true
            }
        });

        let description = raw.description.trim().to_string();
        let len = char_len(&description);
        if !(DESCRIPTION_MIN_LEN..=DESCRIPTION_MAX_LEN).contains(&len) {
            errors.add(
                "description",
                format!(
                    "Description must be between {} and {} characters",
                    DESCRIPTION_MIN_LEN, DESCRIPTION_MAX_LEN
                ),
            );
        }

        let notes = raw
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if notes.as_deref().is_some_and(|n| char_len(n) > NOTES_MAX_LEN) {
            errors.add("notes", "Notes cannot exceed 500 characters");
        }

        match (kind, amount, date) {
            (Some(kind), Some(amount), Some(date)) if errors.is_empty() => Ok(Self {
                kind,
                category,
                amount,
                date,
                description,
                notes,
            }),
            _ => Err(errors),
        }
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

/// Optional narrowing for listings. Dates are inclusive.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransactionFilter {
    pub kind: Option<TransactionType>,
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn between(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
            ..Self::default()
        }
    }

    pub fn expenses() -> Self {
        Self {
            kind: Some(TransactionType::Expense),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct TransactionTotals {
    pub total_income: Money,
    pub total_expenses: Money,
    pub net_balance: Money,
}

impl TransactionTotals {
    pub fn new(total_income: Money, total_expenses: Money) -> Self {
        Self {
            total_income,
            total_expenses,
            net_balance: total_income - total_expenses,
        }
    }

    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut income = Money::ZERO;
        let mut expenses = Money::ZERO;
        for t in transactions {
            match t.kind {
                TransactionType::Income => income += t.amount,
                TransactionType::Expense => expenses += t.amount,
            }
        }
        Self::new(income, expenses)
    }
}

#[derive(Debug, Serialize)]
pub struct MonthlySummary {
    pub month: String,
    #[serde(flatten)]
    pub totals: TransactionTotals,
}

#[derive(Debug, Serialize)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: i64,
    pub total_pages: i64,
    /// Totals over the whole filtered set, not only this page.
    pub summary: TransactionTotals,
    /// Every category the user has recorded, for filter dropdowns.
    pub categories: Vec<String>,
}
