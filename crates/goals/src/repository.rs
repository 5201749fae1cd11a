use crate::models::{Goal, GoalDraft, GoalStatus};
use chrono::{DateTime, NaiveDate, Utc};
use common::Money;
use database::{self, RepositoryError};
use sqlx::FromRow;

const SELECT_COLUMNS: &str = "SELECT id, user_id, name, description, target_amount, current_amount, deadline, status, created_at FROM goals";

#[derive(FromRow)]
struct GoalRecord {
    id: i64,
    user_id: i64,
    name: String,
    description: Option<String>,
    target_amount: i64,  // Cents
    current_amount: i64, // Cents
    deadline: NaiveDate,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<GoalRecord> for Goal {
    type Error = RepositoryError;

    fn try_from(record: GoalRecord) -> Result<Self, Self::Error> {
        let status = record
            .status
            .parse::<GoalStatus>()
            .map_err(RepositoryError::CorruptRow)?;

        Ok(Goal {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            description: record.description,
            target_amount: Money::from_cents(record.target_amount),
            current_amount: Money::from_cents(record.current_amount),
            deadline: record.deadline,
            status,
            created_at: record.created_at,
        })
    }
}

pub(crate) struct GoalRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> GoalRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &mut self,
        user_id: i64,
        draft: &GoalDraft,
        created_at: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO goals (user_id, name, description, target_amount, current_amount, deadline, status, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(user_id)
        .bind(draft.name())
        .bind(draft.description())
        .bind(draft.target_amount().cents())
        .bind(draft.current_amount().cents())
        .bind(draft.deadline())
        .bind(draft.status().as_str())
        .bind(created_at)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    pub async fn find_by_id(&mut self, user_id: i64, id: i64) -> Result<Option<Goal>, RepositoryError> {
        let record = sqlx::query_as::<_, GoalRecord>(&format!(
            "{SELECT_COLUMNS} WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        record.map(Goal::try_from).transpose()
    }

    /// Earliest deadline first, newest first within a deadline.
    pub async fn list(&mut self, user_id: i64) -> Result<Vec<Goal>, RepositoryError> {
        let records = sqlx::query_as::<_, GoalRecord>(&format!(
            "{SELECT_COLUMNS} WHERE user_id = $1 ORDER BY deadline ASC, created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        records.into_iter().map(Goal::try_from).collect()
    }

    /// Writes every mutable field of `goal` in one statement.
    pub async fn save(&mut self, goal: &Goal) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE goals SET name = $1, description = $2, target_amount = $3, current_amount = $4, deadline = $5, status = $6 WHERE id = $7 AND user_id = $8",
        )
        .bind(&goal.name)
        .bind(&goal.description)
        .bind(goal.target_amount.cents())
        .bind(goal.current_amount.cents())
        .bind(goal.deadline)
        .bind(goal.status.as_str())
        .bind(goal.id)
        .bind(goal.user_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(&mut self, user_id: i64, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1 AND user_id = $2")
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
