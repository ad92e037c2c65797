//! SQLite implementation of the persistent storage layer.

use std::{future::Future, path::Path, str::FromStr};

use async_trait::async_trait;
use facilitator_primitives::{message::Message, stake_request::StakeRequest, types::H256};
use sqlx::{
    query::Query,
    sqlite::{
        SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteJournalMode,
        SqlitePoolOptions,
    },
    Sqlite, SqlitePool,
};
use tracing::{trace, warn};

use super::{
    config::DbConfig,
    constants::IN_MEMORY_DB_URL,
    errors::StorageError,
    models::{MessageRow, StakeRequestRow},
    types::{DbAddress, DbH256, DbMessageDirection, DbMessageStatus, DbMessageType, DbU256},
};
use crate::{errors::DbResult, message::MessageDb, stake_request::StakeRequestDb};

const SELECT_STAKE_REQUEST: &str = r#"SELECT
    stake_request_hash,
    amount,
    beneficiary,
    gas_price,
    gas_limit,
    nonce,
    gateway,
    staker,
    staker_proxy,
    message_hash
    FROM stake_request"#;

const INSERT_STAKE_REQUEST: &str = r#"INSERT INTO stake_request
    (stake_request_hash, amount, beneficiary, gas_price, gas_limit, nonce, gateway, staker,
     staker_proxy, message_hash)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#;

const UPSERT_STAKE_REQUEST: &str = r#"INSERT INTO stake_request
    (stake_request_hash, amount, beneficiary, gas_price, gas_limit, nonce, gateway, staker,
     staker_proxy, message_hash)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (stake_request_hash) DO UPDATE SET
        amount = excluded.amount,
        beneficiary = excluded.beneficiary,
        gas_price = excluded.gas_price,
        gas_limit = excluded.gas_limit,
        nonce = excluded.nonce,
        gateway = excluded.gateway,
        staker = excluded.staker,
        staker_proxy = excluded.staker_proxy,
        message_hash = COALESCE(stake_request.message_hash, excluded.message_hash),
        updated_at = CURRENT_TIMESTAMP"#;

const SELECT_MESSAGE: &str = r#"SELECT
    message_hash,
    message_type,
    gateway_address,
    source_status,
    target_status,
    gas_price,
    gas_limit,
    nonce,
    sender,
    direction,
    source_declaration_block_height,
    secret,
    hash_lock
    FROM message"#;

const INSERT_MESSAGE: &str = r#"INSERT INTO message
    (message_hash, message_type, gateway_address, source_status, target_status, gas_price,
     gas_limit, nonce, sender, direction, source_declaration_block_height, secret, hash_lock)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#;

const UPSERT_MESSAGE: &str = r#"INSERT INTO message
    (message_hash, message_type, gateway_address, source_status, target_status, gas_price,
     gas_limit, nonce, sender, direction, source_declaration_block_height, secret, hash_lock)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (message_hash) DO UPDATE SET
        message_type = excluded.message_type,
        gateway_address = excluded.gateway_address,
        source_status = excluded.source_status,
        target_status = excluded.target_status,
        gas_price = COALESCE(excluded.gas_price, message.gas_price),
        gas_limit = COALESCE(excluded.gas_limit, message.gas_limit),
        nonce = excluded.nonce,
        sender = excluded.sender,
        direction = excluded.direction,
        source_declaration_block_height = excluded.source_declaration_block_height,
        secret = COALESCE(message.secret, excluded.secret),
        hash_lock = COALESCE(message.hash_lock, excluded.hash_lock),
        updated_at = CURRENT_TIMESTAMP"#;

/// SQLite-backed store for stake requests and messages.
#[derive(Debug, Clone)]
pub struct SqliteDb {
    pool: SqlitePool,
    config: DbConfig,
}

impl SqliteDb {
    pub fn new(pool: SqlitePool, config: DbConfig) -> Self {
        Self { pool, config }
    }
}

/// Opens a private in-memory database.
///
/// The pool holds exactly one connection that is never recycled since every SQLite connection to
/// `:memory:` is a separate database.
pub async fn in_memory_pool() -> Result<SqlitePool, StorageError> {
    let connect_options = SqliteConnectOptions::from_str(IN_MEMORY_DB_URL)?;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(connect_options)
        .await?;

    Ok(pool)
}

/// Opens (creating it if missing) the database file at `path`.
pub async fn file_pool(path: impl AsRef<Path>) -> Result<SqlitePool, StorageError> {
    let connect_options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    Ok(pool)
}

/// Runs `operation`, retrying it on transient failures as configured in [`DbConfig`].
pub async fn execute_with_retries<F, Fut, T>(
    config: &DbConfig,
    operation: F,
) -> Result<T, StorageError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Err(StorageError::Driver(err))
                if is_transient(&err) && attempt < config.max_retry_count() =>
            {
                attempt += 1;
                warn!(%err, %attempt, "transient database error, retrying");

                tokio::time::sleep(config.backoff_period()).await;
            }
            result => return result,
        }
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        // SQLITE_BUSY, SQLITE_LOCKED and their extended codes
        sqlx::Error::Database(db_err) => matches!(
            db_err.code().as_deref(),
            Some("5" | "6" | "261" | "262" | "517")
        ),
        _ => false,
    }
}

/// Turns a unique constraint violation into a [`StorageError::Conflict`].
fn conflict_on_unique(err: sqlx::Error, context: impl FnOnce() -> String) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StorageError::Conflict(context());
        }
    }

    StorageError::Driver(err)
}

fn bind_stake_request<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    stake_request: &StakeRequest,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(DbH256::from(stake_request.stake_request_hash))
        .bind(DbU256::from(stake_request.amount))
        .bind(DbAddress::from(stake_request.beneficiary))
        .bind(DbU256::from(stake_request.gas_price))
        .bind(DbU256::from(stake_request.gas_limit))
        .bind(DbU256::from(stake_request.nonce))
        .bind(DbAddress::from(stake_request.gateway))
        .bind(DbAddress::from(stake_request.staker))
        .bind(DbAddress::from(stake_request.staker_proxy))
        .bind(stake_request.message_hash.map(DbH256::from))
}

fn bind_message<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    message: &Message,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(DbH256::from(message.message_hash))
        .bind(DbMessageType::from(message.message_type))
        .bind(DbAddress::from(message.gateway_address))
        .bind(DbMessageStatus::from(message.source_status))
        .bind(DbMessageStatus::from(message.target_status))
        .bind(message.gas_price.map(DbU256::from))
        .bind(message.gas_limit.map(DbU256::from))
        .bind(DbU256::from(message.nonce))
        .bind(DbAddress::from(message.sender))
        .bind(DbMessageDirection::from(message.direction))
        .bind(DbU256::from(message.source_declaration_block_height))
        .bind(message.secret.map(DbH256::from))
        .bind(message.hash_lock.map(DbH256::from))
}

async fn fetch_stake_request(
    conn: &mut SqliteConnection,
    column: &str,
    key: &H256,
) -> Result<Option<StakeRequestRow>, StorageError> {
    let sql = format!("{SELECT_STAKE_REQUEST} WHERE {column} = ?");

    let row = sqlx::query_as::<_, StakeRequestRow>(&sql)
        .bind(DbH256::from(*key))
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row)
}

async fn fetch_message(
    conn: &mut SqliteConnection,
    message_hash: &H256,
) -> Result<Option<MessageRow>, StorageError> {
    let sql = format!("{SELECT_MESSAGE} WHERE message_hash = ?");

    let row = sqlx::query_as::<_, MessageRow>(&sql)
        .bind(DbH256::from(*message_hash))
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row)
}

/// Reads back a row that was written in the same transaction.
fn written<T>(row: Option<T>, what: impl FnOnce() -> String) -> Result<T, StorageError> {
    row.ok_or_else(|| StorageError::InvalidData(format!("{} missing after write", what())))
}

fn check_secret_pair(message: &Message) -> Result<(), StorageError> {
    if message.secret.is_some() != message.hash_lock.is_some() {
        return Err(StorageError::InvalidData(format!(
            "message {} must set secret and hash lock together",
            message.message_hash
        )));
    }

    Ok(())
}

/// Once a stake request is linked to a message, neither the link nor any of the fields the message
/// hash was computed from may change.
fn check_accepted_unchanged(
    stored: &StakeRequest,
    stake_request: &StakeRequest,
) -> Result<(), StorageError> {
    let Some(linked) = stored.message_hash else {
        return Ok(());
    };
    let hash = &stored.stake_request_hash;

    if let Some(new) = stake_request.message_hash {
        if new != linked {
            return Err(StorageError::Conflict(format!(
                "stake request {hash} is linked to message {linked}, refusing {new}"
            )));
        }
    }

    let resaved = StakeRequest {
        message_hash: Some(linked),
        ..stake_request.clone()
    };
    if resaved != *stored {
        return Err(StorageError::Conflict(format!(
            "stake request {hash} is linked to message {linked}, refusing to change its fields"
        )));
    }

    Ok(())
}

#[async_trait]
impl StakeRequestDb for SqliteDb {
    async fn create_stake_request(&self, stake_request: &StakeRequest) -> DbResult<StakeRequest> {
        let hash = &stake_request.stake_request_hash;

        let row = execute_with_retries(&self.config, || async move {
            let mut tx = self.pool.begin().await?;

            bind_stake_request(sqlx::query(INSERT_STAKE_REQUEST), stake_request)
                .execute(&mut *tx)
                .await
                .map_err(|e| conflict_on_unique(e, || format!("stake request {hash} exists")))?;

            let row = fetch_stake_request(&mut tx, "stake_request_hash", hash).await?;
            tx.commit().await?;

            written(row, || format!("stake request {hash}"))
        })
        .await?;

        Ok(row.into())
    }

    async fn save_stake_request(&self, stake_request: &StakeRequest) -> DbResult<StakeRequest> {
        let hash = &stake_request.stake_request_hash;

        let row = execute_with_retries(&self.config, || async move {
            let mut tx = self.pool.begin().await?;

            let stored = fetch_stake_request(&mut tx, "stake_request_hash", hash)
                .await?
                .map(StakeRequest::from);
            if let Some(stored) = stored {
                check_accepted_unchanged(&stored, stake_request)?;
            }

            bind_stake_request(sqlx::query(UPSERT_STAKE_REQUEST), stake_request)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    conflict_on_unique(e, || {
                        format!("message hash of stake request {hash} is already linked")
                    })
                })?;

            let row = fetch_stake_request(&mut tx, "stake_request_hash", hash).await?;
            tx.commit().await?;

            written(row, || format!("stake request {hash}"))
        })
        .await?;

        trace!(%hash, "saved stake request");

        Ok(row.into())
    }

    async fn get_stake_request(&self, stake_request_hash: &H256) -> DbResult<Option<StakeRequest>> {
        let row = execute_with_retries(&self.config, || async move {
            let mut conn = self.pool.acquire().await?;

            fetch_stake_request(&mut conn, "stake_request_hash", stake_request_hash).await
        })
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_stake_request_by_message_hash(
        &self,
        message_hash: &H256,
    ) -> DbResult<Option<StakeRequest>> {
        let row = execute_with_retries(&self.config, || async move {
            let mut conn = self.pool.acquire().await?;

            fetch_stake_request(&mut conn, "message_hash", message_hash).await
        })
        .await?;

        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl MessageDb for SqliteDb {
    async fn create_message(&self, message: &Message) -> DbResult<Message> {
        check_secret_pair(message)?;
        let hash = &message.message_hash;

        let row = execute_with_retries(&self.config, || async move {
            let mut tx = self.pool.begin().await?;

            bind_message(sqlx::query(INSERT_MESSAGE), message)
                .execute(&mut *tx)
                .await
                .map_err(|e| conflict_on_unique(e, || format!("message {hash} exists")))?;

            let row = fetch_message(&mut tx, hash).await?;
            tx.commit().await?;

            written(row, || format!("message {hash}"))
        })
        .await?;

        Ok(row.into())
    }

    async fn save_message(&self, message: &Message) -> DbResult<Message> {
        check_secret_pair(message)?;
        let hash = &message.message_hash;

        let row = execute_with_retries(&self.config, || async move {
            let mut tx = self.pool.begin().await?;

            if let Some(stored) = fetch_message(&mut tx, hash).await? {
                let stored_lock = stored.hash_lock.map(|v| *v);
                let stored_secret = stored.secret.map(|v| *v);

                let relocks = stored_lock.is_some()
                    && message.hash_lock.is_some()
                    && (stored_lock != message.hash_lock || stored_secret != message.secret);
                if relocks {
                    return Err(StorageError::Conflict(format!(
                        "message {hash} already has a different secret and hash lock"
                    )));
                }
            }

            bind_message(sqlx::query(UPSERT_MESSAGE), message)
                .execute(&mut *tx)
                .await?;

            let row = fetch_message(&mut tx, hash).await?;
            tx.commit().await?;

            written(row, || format!("message {hash}"))
        })
        .await?;

        trace!(%hash, "saved message");

        Ok(row.into())
    }

    async fn get_message(&self, message_hash: &H256) -> DbResult<Option<Message>> {
        let row = execute_with_retries(&self.config, || async move {
            let mut conn = self.pool.acquire().await?;

            fetch_message(&mut conn, message_hash).await
        })
        .await?;

        Ok(row.map(Into::into))
    }
}
