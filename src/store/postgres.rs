//! PostgreSQL-backed store.

use super::{Account, AccountStore, NewAccount, SessionStore, StoreError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, external_id, secret";

macro_rules! db_span {
    ($operation:expr, $query:expr) => {
        tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = $operation,
            db.statement = $query
        )
    };
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet.
    ///
    /// # Errors
    /// Returns an error if any schema statement fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(tracing::info_span!("db.migrate", db.system = "postgresql"))
            .await
            .context("failed to apply schema")?;
        Ok(())
    }

    async fn fetch_account(&self, query: &str, key: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(query)
            .bind(key)
            .fetch_optional(&self.pool)
            .instrument(db_span!("SELECT", query))
            .await?;
        Ok(row.as_ref().map(account_from_row))
    }
}

fn account_from_row(row: &PgRow) -> Account {
    Account {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        external_id: row.get("external_id"),
        secret: row.get("secret"),
    }
}

/// SQLSTATE 23505 is `unique_violation`.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span!("SELECT", query.as_str()))
            .await?;
        Ok(row.as_ref().map(account_from_row))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1");
        self.fetch_account(&query, username).await
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE external_id = $1");
        self.fetch_account(&query, external_id).await
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let query = r"
            INSERT INTO accounts (id, username, email, password_hash, external_id)
            VALUES ($1, $2, $3, $4, $5)
        ";
        let id = Uuid::new_v4();
        let result = sqlx::query(query)
            .bind(id)
            .bind(account.username.as_deref())
            .bind(account.email.as_deref())
            .bind(account.password_hash.as_deref())
            .bind(account.external_id.as_deref())
            .execute(&self.pool)
            .instrument(db_span!("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(account.into_account(id)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    async fn set_secret(&self, id: Uuid, secret: &str) -> Result<bool, StoreError> {
        let query = "UPDATE accounts SET secret = $2, updated_at = NOW() WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .bind(secret)
            .execute(&self.pool)
            .instrument(db_span!("UPDATE", query))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_with_secrets(&self) -> Result<Vec<Account>, StoreError> {
        let query = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE secret IS NOT NULL AND btrim(secret) <> '' \
             ORDER BY created_at"
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(db_span!("SELECT", query.as_str()))
            .await?;
        Ok(rows.iter().map(account_from_row).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = tracing::info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span =
            tracing::info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(
        &self,
        token_hash: &[u8],
        account_id: Uuid,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO sessions (session_hash, account_id, expires_at)
            VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
        ";
        let ttl_seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(account_id)
            .bind(ttl_seconds)
            .execute(&self.pool)
            .instrument(db_span!("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<Uuid>, StoreError> {
        // Record activity without extending the session TTL.
        let query = r"
            UPDATE sessions
            SET last_seen_at = NOW()
            WHERE session_hash = $1
              AND expires_at > NOW()
            RETURNING account_id
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(db_span!("UPDATE", query))
            .await?;
        Ok(row.map(|row| row.get("account_id")))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<(), StoreError> {
        let query = "DELETE FROM sessions WHERE session_hash = $1";
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(db_span!("DELETE", query))
            .await?;
        Ok(())
    }

    async fn purge_expired_sessions(&self) -> Result<u64, StoreError> {
        let query = "DELETE FROM sessions WHERE expires_at <= NOW()";
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span!("DELETE", query))
            .await?;
        Ok(result.rows_affected())
    }
}
