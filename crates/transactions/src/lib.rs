pub mod category;
pub mod handler;
pub mod models;
mod repository;
pub mod service;

pub use category::{CategoryInfo, TransactionType, category_label};
pub use models::{Transaction, TransactionFilter, TransactionTotals};
pub use service::{TransactionError, TransactionService};
