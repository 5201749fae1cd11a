use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    /// The categories a transaction of this type may use.
    pub fn categories(&self) -> &'static [CategoryInfo] {
        match self {
            TransactionType::Income => INCOME_CATEGORIES,
            TransactionType::Expense => EXPENSE_CATEGORIES,
        }
    }

    pub fn allows_category(&self, key: &str) -> bool {
        self.categories().iter().any(|c| c.key == key)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(format!("Unknown transaction type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryInfo {
    pub key: &'static str,
    pub label: &'static str,
}

const fn category(key: &'static str, label: &'static str) -> CategoryInfo {
    CategoryInfo { key, label }
}

static INCOME_CATEGORIES: &[CategoryInfo] = &[
    category("salary", "Salary"),
    category("freelance", "Freelance"),
    category("business", "Business"),
    category("investment", "Investment"),
    category("gift", "Gift"),
    category("other_income", "Other Income"),
];

static EXPENSE_CATEGORIES: &[CategoryInfo] = &[
    category("food", "Food & Dining"),
    category("transportation", "Transportation"),
    category("shopping", "Shopping"),
    category("entertainment", "Entertainment"),
    category("bills", "Bills & Utilities"),
    category("healthcare", "Healthcare"),
    category("education", "Education"),
    category("travel", "Travel"),
    category("housing", "Housing"),
    category("insurance", "Insurance"),
    category("other_expense", "Other Expense"),
];

/// Display label for a category key of either type. Unknown keys fall back
/// to the key itself.
pub fn category_label(key: &str) -> &str {
    INCOME_CATEGORIES
        .iter()
        .chain(EXPENSE_CATEGORIES)
        .find(|c| c.key == key)
        .map(|c| c.label)
        .unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_are_keyed_by_type() {
        assert!(TransactionType::Income.allows_category("salary"));
        assert!(TransactionType::Income.allows_category("business"));
        assert!(!TransactionType::Income.allows_category("food"));
        assert!(TransactionType::Expense.allows_category("housing"));
        assert!(!TransactionType::Expense.allows_category("salary"));
        assert_eq!(TransactionType::Income.categories().len(), 6);
        assert_eq!(TransactionType::Expense.categories().len(), 11);
    }

    #[test]
    fn test_category_label() {
        assert_eq!(category_label("food"), "Food & Dining");
        assert_eq!(category_label("other_income"), "Other Income");
        assert_eq!(category_label("mystery"), "mystery");
    }

    #[test]
    fn test_transaction_type_parsing() {
        assert_eq!("income".parse::<TransactionType>(), Ok(TransactionType::Income));
        assert_eq!("expense".parse::<TransactionType>(), Ok(TransactionType::Expense));
        assert!("Income".parse::<TransactionType>().is_err());
    }
}
