//! The [`Repositories`] façade over the entity stores.
//!
//! Every successful write is buffered per entity kind and only forwarded to subscribers once
//! [`Repositories::notify`] is called, so that downstream workers observe one consistent batch of
//! changes instead of individual rows.

use std::{path::Path, sync::Arc};

use facilitator_primitives::{message::Message, stake_request::StakeRequest, types::H256};
use sqlx::{migrate::Migrator, SqlitePool};
use tracing::{debug, info};

use crate::{
    errors::DbResult,
    message::MessageDb,
    persistent::{
        config::DbConfig,
        errors::StorageError,
        sqlite::{file_pool, in_memory_pool, SqliteDb},
    },
    stake_request::StakeRequestDb,
    subscription::{Subject, Subscription},
};

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Repository of [`StakeRequest`]s.
#[derive(Debug, Clone)]
pub struct StakeRequestRepository {
    db: SqliteDb,
    subject: Arc<Subject<StakeRequest>>,
}

impl StakeRequestRepository {
    /// Creates a new stake request, failing if it already exists.
    pub async fn create(&self, stake_request: &StakeRequest) -> DbResult<StakeRequest> {
        let stored = self.db.create_stake_request(stake_request).await?;
        self.subject.new_update(stored.clone()).await;

        Ok(stored)
    }

    /// Upserts a stake request by its hash and returns the stored row.
    pub async fn save(&self, stake_request: &StakeRequest) -> DbResult<StakeRequest> {
        let stored = self.db.save_stake_request(stake_request).await?;
        self.subject.new_update(stored.clone()).await;

        Ok(stored)
    }

    pub async fn get(&self, stake_request_hash: &H256) -> DbResult<Option<StakeRequest>> {
        self.db.get_stake_request(stake_request_hash).await
    }

    /// Looks up the stake request that was accepted into the message `message_hash`.
    pub async fn get_by_message_hash(&self, message_hash: &H256) -> DbResult<Option<StakeRequest>> {
        self.db
            .get_stake_request_by_message_hash(message_hash)
            .await
    }

    /// Subscribes to batches of updated stake requests.
    pub async fn subscribe(&self) -> Subscription<Vec<StakeRequest>> {
        self.subject.subscribe().await
    }
}

/// Repository of [`Message`]s.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    db: SqliteDb,
    subject: Arc<Subject<Message>>,
}

impl MessageRepository {
    /// Creates a new message, failing if it already exists.
    pub async fn create(&self, message: &Message) -> DbResult<Message> {
        let stored = self.db.create_message(message).await?;
        self.subject.new_update(stored.clone()).await;

        Ok(stored)
    }

    /// Upserts a message by its hash and returns the stored row.
    pub async fn save(&self, message: &Message) -> DbResult<Message> {
        let stored = self.db.save_message(message).await?;
        self.subject.new_update(stored.clone()).await;

        Ok(stored)
    }

    pub async fn get(&self, message_hash: &H256) -> DbResult<Option<Message>> {
        self.db.get_message(message_hash).await
    }

    /// Subscribes to batches of updated messages.
    pub async fn subscribe(&self) -> Subscription<Vec<Message>> {
        self.subject.subscribe().await
    }
}

/// All entity repositories, backed by a single store.
#[derive(Debug, Clone)]
pub struct Repositories {
    pub stake_request_repository: StakeRequestRepository,
    pub message_repository: MessageRepository,
}

impl Repositories {
    /// Applies the schema migrations to `pool` and wires every repository to it.
    pub async fn create(pool: SqlitePool, config: DbConfig) -> DbResult<Self> {
        MIGRATOR.run(&pool).await.map_err(StorageError::from)?;

        let db = SqliteDb::new(pool, config);
        debug!(?config, "repositories created");

        Ok(Self {
            stake_request_repository: StakeRequestRepository {
                db: db.clone(),
                subject: Arc::default(),
            },
            message_repository: MessageRepository {
                db,
                subject: Arc::default(),
            },
        })
    }

    /// Creates repositories over a fresh in-memory database.
    pub async fn create_in_memory() -> DbResult<Self> {
        let pool = in_memory_pool().await?;

        Self::create(pool, DbConfig::default()).await
    }

    /// Creates repositories over the database file at `path`, creating it if it does not exist.
    pub async fn create_from_file(path: impl AsRef<Path>, config: DbConfig) -> DbResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening database");

        let pool = file_pool(path).await?;

        Self::create(pool, config).await
    }

    /// Signals subscribers that repository state changed by delivering every update buffered since
    /// the last call.
    pub async fn notify(&self) {
        let stake_requests = self.stake_request_repository.subject.notify().await;
        let messages = self.message_repository.subject.notify().await;

        debug!(%stake_requests, %messages, "notified subscribers");
    }
}
