//! Per-kind handlers of contract entities and the table the dispatcher looks them up in.

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;

use crate::errors::FacilitatorResult;

pub mod stake_intent_declared;
pub mod stake_requested;

/// A raw decoded chain event, as received in a batch.
pub type RawRecord = serde_json::Value;

/// The kinds of records the facilitator understands.
pub mod kinds {
    /// Stake requests made against a gateway on the origin chain.
    pub const STAKE_REQUESTEDS: &str = "stakeRequesteds";

    /// Stake intents declared by a gateway on the origin chain.
    pub const STAKE_INTENT_DECLAREDS: &str = "stakeIntentDeclareds";
}

/// Persists and follows up on the records of one entity kind.
#[async_trait]
pub trait ContractEntityHandler: Send + Sync {
    /// The persisted representation of a record.
    type Model: Send + Sync + 'static;

    /// Validates and upserts `records`, returning their persisted models.
    ///
    /// Must be idempotent: re-ingesting the same records must neither duplicate rows nor fail.
    async fn persist(&self, records: Vec<RawRecord>) -> FacilitatorResult<Vec<Self::Model>>;

    /// Runs the protocol follow-up for models returned by [`ContractEntityHandler::persist`].
    ///
    /// Called only once every kind of the batch has been persisted.
    async fn handle(&self, models: &[Self::Model]) -> FacilitatorResult<()>;
}

/// Models of one kind that are ready to be handled.
#[async_trait]
pub(crate) trait PersistedBatch: Send {
    async fn handle(self: Box<Self>) -> FacilitatorResult<()>;
}

/// Object-safe view of a [`ContractEntityHandler`] that hides its model type.
#[async_trait]
pub(crate) trait DynEntityHandler: Send + Sync {
    async fn persist(&self, records: Vec<RawRecord>) -> FacilitatorResult<Box<dyn PersistedBatch>>;
}

struct Persisted<H: ContractEntityHandler> {
    handler: Arc<H>,
    models: Vec<H::Model>,
}

#[async_trait]
impl<H: ContractEntityHandler + 'static> PersistedBatch for Persisted<H> {
    async fn handle(self: Box<Self>) -> FacilitatorResult<()> {
        self.handler.handle(&self.models).await
    }
}

struct Erased<H>(Arc<H>);

#[async_trait]
impl<H: ContractEntityHandler + 'static> DynEntityHandler for Erased<H> {
    async fn persist(&self, records: Vec<RawRecord>) -> FacilitatorResult<Box<dyn PersistedBatch>> {
        let models = self.0.persist(records).await?;

        Ok(Box::new(Persisted {
            handler: self.0.clone(),
            models,
        }))
    }
}

/// Maps a record kind to the handler responsible for it.
///
/// Built once at startup and then only read.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Arc<dyn DynEntityHandler>>,
}

impl HandlerTable {
    /// Registers `handler` for `kind`, replacing any previous one.
    pub fn with_handler<H>(mut self, kind: impl Into<String>, handler: Arc<H>) -> Self
    where
        H: ContractEntityHandler + 'static,
    {
        self.handlers.insert(kind.into(), Arc::new(Erased(handler)));
        self
    }

    /// Returns whether a handler is registered for `kind`.
    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Returns the registered kinds, in no particular order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub(crate) fn get(&self, kind: &str) -> Option<Arc<dyn DynEntityHandler>> {
        self.handlers.get(kind).cloned()
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds = self.kinds().collect::<Vec<_>>();
        kinds.sort_unstable();

        f.debug_struct("HandlerTable")
            .field("kinds", &kinds)
            .finish()
    }
}

/// Decodes every record of `kind` into `T`.
pub(crate) fn decode_records<T: serde::de::DeserializeOwned>(
    kind: &str,
    records: Vec<RawRecord>,
) -> FacilitatorResult<Vec<T>> {
    records
        .into_iter()
        .map(|record| {
            serde_json::from_value(record).map_err(|source| {
                crate::errors::FacilitatorError::InvalidRecord {
                    kind: kind.to_string(),
                    source,
                }
            })
        })
        .collect()
}
