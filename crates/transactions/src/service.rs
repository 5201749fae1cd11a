use crate::models::{
    MonthlySummary, PAGE_SIZE, RawTransactionInput, Transaction, TransactionDraft, TransactionFilter,
    TransactionPage, TransactionTotals,
};
use crate::repository::TransactionRepository;
use chrono::NaiveDate;
use common::ValidationErrors;
use database::{Database, RepositoryError};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("Invalid input: {0}")]
    Validation(ValidationErrors),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Transaction not found")]
    NotFound,
}

impl From<RepositoryError> for TransactionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => TransactionError::NotFound,
            RepositoryError::Infrastructure(e) => TransactionError::Infrastructure(e.to_string()),
            _ => TransactionError::Infrastructure(err.to_string()),
        }
    }
}

/// Checks a `YYYY-MM` month key.
pub fn parse_month(month: &str) -> Result<NaiveDate, TransactionError> {
    NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").map_err(|_| {
        TransactionError::Validation(ValidationErrors::single(
            "month",
            "Invalid month format. Expected YYYY-MM",
        ))
    })
}

pub struct TransactionService;

impl TransactionService {
    #[instrument(skip(db, raw))]
    pub async fn create_transaction(
        db: &Database,
        user_id: i64,
        raw: RawTransactionInput,
        today: NaiveDate,
    ) -> Result<Transaction, TransactionError> {
        let draft = TransactionDraft::new(raw, today).map_err(TransactionError::Validation)?;

        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        let id = repo.create(user_id, &draft, chrono::Utc::now()).await?;
        let transaction = repo
            .find_by_id(user_id, id)
            .await?
            .ok_or(TransactionError::NotFound)?;

        uow.commit().await?;

        tracing::info!(transaction_id = id, kind = %transaction.kind, "Created transaction");
        Ok(transaction)
    }

    #[instrument(skip(db, raw))]
    pub async fn update_transaction(
        db: &Database,
        user_id: i64,
        id: i64,
        raw: RawTransactionInput,
        today: NaiveDate,
    ) -> Result<Transaction, TransactionError> {
        let draft = TransactionDraft::new(raw, today).map_err(TransactionError::Validation)?;

        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        repo.update(user_id, id, &draft).await?;

        let transaction = repo
            .find_by_id(user_id, id)
            .await?
            .ok_or(TransactionError::NotFound)?;

        uow.commit().await?;

        Ok(transaction)
    }

    #[instrument(skip(db))]
    pub async fn get_transaction(db: &Database, user_id: i64, id: i64) -> Result<Transaction, TransactionError> {
        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        let transaction = repo
            .find_by_id(user_id, id)
            .await?
            .ok_or(TransactionError::NotFound)?;

        Ok(transaction)
    }

    #[instrument(skip(db))]
    pub async fn delete_transaction(db: &Database, user_id: i64, id: i64) -> Result<(), TransactionError> {
        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        repo.delete(user_id, id).await?;

        uow.commit().await?;
        Ok(())
    }

    /// One page of the filtered listing, with totals over the full filtered set.
    #[instrument(skip(db))]
    pub async fn list_page(
        db: &Database,
        user_id: i64,
        filter: &TransactionFilter,
        page: u32,
    ) -> Result<TransactionPage, TransactionError> {
        let page = page.max(1);
        let per_page = PAGE_SIZE;

        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        let total_items = repo.count(user_id, filter).await?;
        let offset = i64::from(page - 1) * i64::from(per_page);
        let items = repo
            .list(user_id, filter, Some((i64::from(per_page), offset)))
            .await?;
        let summary = repo.totals(user_id, filter).await?;
        let categories = repo.distinct_categories(user_id).await?;

        let total_pages = ((total_items + i64::from(per_page) - 1) / i64::from(per_page)).max(1);

        Ok(TransactionPage {
            items,
            page,
            per_page,
            total_items,
            total_pages,
            summary,
            categories,
        })
    }

    /// Every matching transaction, newest first. Reports read through this.
    #[instrument(skip(db))]
    pub async fn list_transactions(
        db: &Database,
        user_id: i64,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, TransactionError> {
        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        Ok(repo.list(user_id, filter, None).await?)
    }

    #[instrument(skip(db))]
    pub async fn recent_transactions(
        db: &Database,
        user_id: i64,
        limit: u32,
    ) -> Result<Vec<Transaction>, TransactionError> {
        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        Ok(repo
            .list(user_id, &TransactionFilter::default(), Some((i64::from(limit), 0)))
            .await?)
    }

    #[instrument(skip(db))]
    pub async fn totals(
        db: &Database,
        user_id: i64,
        filter: &TransactionFilter,
    ) -> Result<TransactionTotals, TransactionError> {
        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        Ok(repo.totals(user_id, filter).await?)
    }

    #[instrument(skip(db))]
    pub async fn get_month_view(
        db: &Database,
        user_id: i64,
        month: &str, // YYYY-MM
    ) -> Result<(Vec<Transaction>, MonthlySummary), TransactionError> {
        parse_month(month)?;

        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        let transactions = repo.list_by_month(user_id, month).await?;

        let summary = MonthlySummary {
            month: month.to_string(),
            totals: TransactionTotals::from_transactions(&transactions),
        };

        Ok((transactions, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::TransactionType;
    use database::get_test_db;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    async fn setup_user(db: &Database, username: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO users (username, password_hash, created_at) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(username)
        .bind("hash")
        .bind(chrono::Utc::now())
        .fetch_one(&db.pool)
        .await
        .unwrap()
    }

    fn raw(kind: &str, category: &str, amount: &str, date: &str) -> RawTransactionInput {
        RawTransactionInput {
            kind: kind.into(),
            category: category.into(),
            amount: amount.into(),
            date: date.into(),
            description: "Test entry".into(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = get_test_db().await;
        let user_id = setup_user(&db, "alice").await;

        let created = TransactionService::create_transaction(
            &db,
            user_id,
            raw("income", "salary", "3000", "2026-06-01"),
            today(),
        )
        .await
        .unwrap();
        assert_eq!(created.kind, TransactionType::Income);

        let fetched = TransactionService::get_transaction(&db, user_id, created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_persisted() {
        let db = get_test_db().await;
        let user_id = setup_user(&db, "alice").await;

        let err = TransactionService::create_transaction(
            &db,
            user_id,
            raw("expense", "salary", "0.00", "2026-06-01"),
            today(),
        )
        .await
        .unwrap_err();

        match err {
            TransactionError::Validation(errors) => {
                assert!(errors.has("category"));
                assert!(errors.has("amount"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let all = TransactionService::list_transactions(&db, user_id, &TransactionFilter::default())
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_cross_user_access_is_not_found() {
        let db = get_test_db().await;
        let alice = setup_user(&db, "alice").await;
        let bob = setup_user(&db, "bob").await;

        let t = TransactionService::create_transaction(
            &db,
            alice,
            raw("expense", "food", "12.00", "2026-06-01"),
            today(),
        )
        .await
        .unwrap();

        assert!(matches!(
            TransactionService::get_transaction(&db, bob, t.id).await,
            Err(TransactionError::NotFound)
        ));
        assert!(matches!(
            TransactionService::update_transaction(&db, bob, t.id, raw("expense", "food", "1.00", "2026-06-01"), today()).await,
            Err(TransactionError::NotFound)
        ));
        assert!(matches!(
            TransactionService::delete_transaction(&db, bob, t.id).await,
            Err(TransactionError::NotFound)
        ));
        assert!(matches!(
            TransactionService::get_transaction(&db, alice, 9999).await,
            Err(TransactionError::NotFound)
        ));

        let still_there = TransactionService::get_transaction(&db, alice, t.id).await.unwrap();
        assert_eq!(still_there.amount.cents(), 1200);
    }

    #[tokio::test]
    async fn test_list_page_totals_cover_whole_filter() {
        let db = get_test_db().await;
        let user_id = setup_user(&db, "alice").await;

        for day in 1..=25 {
            TransactionService::create_transaction(
                &db,
                user_id,
                raw("expense", "food", "2.00", &format!("2026-05-{day:02}")),
                today(),
            )
            .await
            .unwrap();
        }

        let page = TransactionService::list_page(&db, user_id, &TransactionFilter::default(), 2)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total_items, 25);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.summary.total_expenses.cents(), 5000);
        assert_eq!(page.categories, vec!["food".to_string()]);

        let first = TransactionService::list_page(&db, user_id, &TransactionFilter::default(), 0)
            .await
            .unwrap();
        assert_eq!(first.page, 1);
        assert_eq!(first.items.len(), 20);
    }

    #[tokio::test]
    async fn test_month_view() {
        let db = get_test_db().await;
        let user_id = setup_user(&db, "alice").await;

        for r in [
            raw("income", "salary", "1000.00", "2026-05-01"),
            raw("expense", "food", "250.25", "2026-05-12"),
            raw("expense", "food", "99.00", "2026-06-01"),
        ] {
            TransactionService::create_transaction(&db, user_id, r, today()).await.unwrap();
        }

        let (list, summary) = TransactionService::get_month_view(&db, user_id, "2026-05").await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(summary.totals.total_income.cents(), 100000);
        assert_eq!(summary.totals.total_expenses.cents(), 25025);
        assert_eq!(summary.totals.net_balance.cents(), 74975);

        assert!(matches!(
            TransactionService::get_month_view(&db, user_id, "May 2026").await,
            Err(TransactionError::Validation(_))
        ));
    }
}
