use crate::category::TransactionType;
use crate::models::{Transaction, TransactionDraft, TransactionFilter, TransactionTotals};
use chrono::{DateTime, NaiveDate, Utc};
use common::Money;
use database::{self, Driver, RepositoryError};
use sqlx::{FromRow, QueryBuilder};

const SELECT_COLUMNS: &str = "SELECT id, user_id, kind, category, amount, transaction_date, description, notes, created_at FROM transactions";

#[derive(FromRow)]
struct TransactionRecord {
    id: i64,
    user_id: i64,
    kind: String,
    category: String,
    amount: i64, // Cents
    transaction_date: NaiveDate,
    description: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = RepositoryError;

    fn try_from(record: TransactionRecord) -> Result<Self, Self::Error> {
        let kind = record
            .kind
            .parse::<TransactionType>()
            .map_err(RepositoryError::CorruptRow)?;

        Ok(Transaction {
            id: record.id,
            user_id: record.user_id,
            kind,
            category: record.category,
            amount: Money::from_cents(record.amount),
            date: record.transaction_date,
            description: record.description,
            notes: record.notes,
            created_at: record.created_at,
        })
    }
}

fn into_transactions(records: Vec<TransactionRecord>) -> Result<Vec<Transaction>, RepositoryError> {
    records.into_iter().map(Transaction::try_from).collect()
}

/// Appends the owner predicate and every set filter. The owner predicate is
/// always first and never optional.
fn push_scope(qb: &mut QueryBuilder<'_, Driver>, user_id: i64, filter: &TransactionFilter) {
    qb.push(" WHERE user_id = ").push_bind(user_id);
    if let Some(kind) = filter.kind {
        qb.push(" AND kind = ").push_bind(kind.as_str());
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND transaction_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND transaction_date <= ").push_bind(end);
    }
}

pub(crate) struct TransactionRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> TransactionRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &mut self,
        user_id: i64,
        draft: &TransactionDraft,
        created_at: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO transactions (user_id, kind, category, amount, transaction_date, description, notes, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(user_id)
        .bind(draft.kind().as_str())
        .bind(draft.category())
        .bind(draft.amount().cents())
        .bind(draft.date())
        .bind(draft.description())
        .bind(draft.notes())
        .bind(created_at)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    /// Replaces every mutable field. Owner, id and creation time are untouched.
    pub async fn update(&mut self, user_id: i64, id: i64, draft: &TransactionDraft) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE transactions SET kind = $1, category = $2, amount = $3, transaction_date = $4, description = $5, notes = $6 WHERE id = $7 AND user_id = $8",
        )
        .bind(draft.kind().as_str())
        .bind(draft.category())
        .bind(draft.amount().cents())
        .bind(draft.date())
        .bind(draft.description())
        .bind(draft.notes())
        .bind(id)
        .bind(user_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn find_by_id(&mut self, user_id: i64, id: i64) -> Result<Option<Transaction>, RepositoryError> {
        let record = sqlx::query_as::<_, TransactionRecord>(&format!(
            "{SELECT_COLUMNS} WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        record.map(Transaction::try_from).transpose()
    }

    /// Newest first. `limit`/`offset` are applied only when a limit is given.
    pub async fn list(
        &mut self,
        user_id: i64,
        filter: &TransactionFilter,
        limit: Option<(i64, i64)>,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        let mut qb = QueryBuilder::<Driver>::new(SELECT_COLUMNS);
        push_scope(&mut qb, user_id, filter);
        qb.push(" ORDER BY transaction_date DESC, created_at DESC, id DESC");
        if let Some((limit, offset)) = limit {
            qb.push(" LIMIT ").push_bind(limit);
            qb.push(" OFFSET ").push_bind(offset);
        }

        let records = qb
            .build_query_as::<TransactionRecord>()
            .fetch_all(&mut *self.conn)
            .await?;

        into_transactions(records)
    }

    pub async fn count(&mut self, user_id: i64, filter: &TransactionFilter) -> Result<i64, RepositoryError> {
        let mut qb = QueryBuilder::<Driver>::new("SELECT COUNT(*) FROM transactions");
        push_scope(&mut qb, user_id, filter);

        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    pub async fn totals(&mut self, user_id: i64, filter: &TransactionFilter) -> Result<TransactionTotals, RepositoryError> {
        let mut qb = QueryBuilder::<Driver>::new(
            "SELECT COALESCE(SUM(CASE WHEN kind = 'income' THEN amount ELSE 0 END), 0), \
             COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount ELSE 0 END), 0) FROM transactions",
        );
        push_scope(&mut qb, user_id, filter);

        let (income, expenses): (i64, i64) = qb
            .build_query_as::<(i64, i64)>()
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(TransactionTotals::new(
            Money::from_cents(income),
            Money::from_cents(expenses),
        ))
    }

    pub async fn list_by_month(&mut self, user_id: i64, month: &str) -> Result<Vec<Transaction>, RepositoryError> {
        let records = sqlx::query_as::<_, TransactionRecord>(&format!(
            "{SELECT_COLUMNS} WHERE user_id = $1 AND strftime('%Y-%m', transaction_date) = $2 ORDER BY transaction_date DESC, created_at DESC, id DESC"
        ))
        .bind(user_id)
        .bind(month)
        .fetch_all(&mut *self.conn)
        .await?;

        into_transactions(records)
    }

    pub async fn distinct_categories(&mut self, user_id: i64) -> Result<Vec<String>, RepositoryError> {
        let categories: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT category FROM transactions WHERE user_id = $1 ORDER BY category",
        )
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(categories)
    }

    pub async fn delete(&mut self, user_id: i64, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawTransactionInput;
    use database::get_test_db;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    async fn setup_user(conn: &mut database::Connection, username: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO users (username, password_hash, created_at) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(username)
        .bind("hash")
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await
        .unwrap()
    }

    fn draft(kind: &str, category: &str, amount: &str, date: &str) -> TransactionDraft {
        TransactionDraft::new(
            RawTransactionInput {
                kind: kind.into(),
                category: category.into(),
                amount: amount.into(),
                date: date.into(),
                description: "Test entry".into(),
                notes: None,
            },
            today(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_transaction() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = setup_user(uow.connection(), "alice").await;

        let mut repo = TransactionRepository::new(uow.connection());
        let id = repo
            .create(user_id, &draft("expense", "food", "25.99", "2026-06-01"), Utc::now())
            .await
            .unwrap();
        assert!(id > 0);

        let t = repo.find_by_id(user_id, id).await.unwrap().unwrap();
        assert_eq!(t.amount, Money::from_cents(2599));
        assert_eq!(t.amount.to_string(), "$25.99");
        assert_eq!(t.kind, TransactionType::Expense);
        assert_eq!(t.date, NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
    }

    #[tokio::test]
    async fn test_other_users_rows_are_invisible() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let alice = setup_user(uow.connection(), "alice").await;
        let bob = setup_user(uow.connection(), "bob").await;

        let mut repo = TransactionRepository::new(uow.connection());
        let id = repo
            .create(alice, &draft("expense", "food", "10.00", "2026-06-01"), Utc::now())
            .await
            .unwrap();

        assert!(repo.find_by_id(bob, id).await.unwrap().is_none());
        assert!(matches!(
            repo.update(bob, id, &draft("income", "salary", "1.00", "2026-06-01")).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(repo.delete(bob, id).await, Err(RepositoryError::NotFound)));
        assert!(repo.list(bob, &TransactionFilter::default(), None).await.unwrap().is_empty());

        let t = repo.find_by_id(alice, id).await.unwrap().unwrap();
        assert_eq!(t.amount.cents(), 1000);
    }

    #[tokio::test]
    async fn test_update_transaction() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = setup_user(uow.connection(), "alice").await;

        let mut repo = TransactionRepository::new(uow.connection());
        let id = repo
            .create(user_id, &draft("expense", "food", "10.00", "2026-06-01"), Utc::now())
            .await
            .unwrap();
        let before = repo.find_by_id(user_id, id).await.unwrap().unwrap();

        repo.update(user_id, id, &draft("income", "salary", "20.00", "2026-06-02"))
            .await
            .unwrap();

        let after = repo.find_by_id(user_id, id).await.unwrap().unwrap();
        assert_eq!(after.kind, TransactionType::Income);
        assert_eq!(after.amount.cents(), 2000);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.user_id, user_id);
    }

    #[tokio::test]
    async fn test_list_filters_and_totals() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = setup_user(uow.connection(), "alice").await;

        let mut repo = TransactionRepository::new(uow.connection());
        for d in [
            draft("income", "salary", "3000.00", "2026-05-01"),
            draft("expense", "food", "45.50", "2026-05-03"),
            draft("expense", "bills", "120.00", "2026-06-02"),
            draft("expense", "food", "30.00", "2026-06-10"),
        ] {
            repo.create(user_id, &d, Utc::now()).await.unwrap();
        }

        let all = repo.list(user_id, &TransactionFilter::default(), None).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].date, NaiveDate::from_ymd_opt(2026, 6, 10).unwrap());

        let food = TransactionFilter {
            category: Some("food".into()),
            ..TransactionFilter::default()
        };
        assert_eq!(repo.count(user_id, &food).await.unwrap(), 2);

        let june = TransactionFilter::between(
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 6, 10).unwrap(),
        );
        assert_eq!(repo.list(user_id, &june, None).await.unwrap().len(), 2);

        let totals = repo.totals(user_id, &TransactionFilter::default()).await.unwrap();
        assert_eq!(totals.total_income.cents(), 300000);
        assert_eq!(totals.total_expenses.cents(), 19550);
        assert_eq!(totals.net_balance.cents(), 280450);

        let page = repo
            .list(user_id, &TransactionFilter::default(), Some((2, 2)))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[1].date, NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());

        assert_eq!(
            repo.distinct_categories(user_id).await.unwrap(),
            vec!["bills".to_string(), "food".to_string(), "salary".to_string()]
        );
    }

    #[tokio::test]
    async fn test_list_by_month_and_delete() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let user_id = setup_user(uow.connection(), "alice").await;

        let mut repo = TransactionRepository::new(uow.connection());
        let id = repo
            .create(user_id, &draft("expense", "food", "10.00", "2026-05-20"), Utc::now())
            .await
            .unwrap();
        repo.create(user_id, &draft("expense", "food", "10.00", "2026-06-01"), Utc::now())
            .await
            .unwrap();

        assert_eq!(repo.list_by_month(user_id, "2026-05").await.unwrap().len(), 1);

        repo.delete(user_id, id).await.unwrap();
        assert!(repo.find_by_id(user_id, id).await.unwrap().is_none());
        assert!(repo.list_by_month(user_id, "2026-05").await.unwrap().is_empty());
    }
}
