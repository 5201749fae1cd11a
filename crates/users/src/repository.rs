use crate::models::User;
use chrono::{DateTime, Utc};
use database::{self, RepositoryError};
use sqlx::FromRow;

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            username: record.username,
            created_at: record.created_at,
        }
    }
}

/// A user together with the stored password hash. Never leaves the crate.
pub(crate) struct Credentials {
    pub user: User,
    pub password_hash: String,
}

impl From<UserRecord> for Credentials {
    fn from(record: UserRecord) -> Self {
        let password_hash = record.password_hash.clone();
        Credentials {
            user: record.into(),
            password_hash,
        }
    }
}

pub(crate) struct UserRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> UserRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &mut self,
        username: &str,
        password_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, password_hash, created_at) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(username)
        .bind(password_hash)
        .bind(created_at)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    pub async fn find_by_id(&mut self, id: i64) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(record.map(|r| r.into()))
    }

    pub async fn find_credentials(&mut self, username: &str) -> Result<Option<Credentials>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(record.map(|r| r.into()))
    }
}
