//! The dispatcher of ingested batches.

use facilitator_db::repositories::Repositories;
use futures::future::try_join_all;
use tracing::{debug, error, trace};

use crate::{
    bulk_transactions::BulkTransactions,
    errors::{FacilitatorError, FacilitatorResult},
    handlers::HandlerTable,
};

/// Runs batches through their kinds' handlers.
///
/// A batch is handled in three phases:
///
/// 1. every kind is persisted, concurrently;
/// 2. once all of them are durable, every kind is handled in the batch's order;
/// 3. the repository subscribers are notified once.
///
/// A failure aborts the batch before the following phases. Kinds persisted before the failure stay
/// persisted; resubmitting the batch reconciles them since persisting is idempotent. Callers must
/// not handle two batches at the same time.
#[derive(Debug, Clone)]
pub struct TransactionHandler {
    handlers: HandlerTable,
    repos: Repositories,
}

impl TransactionHandler {
    pub fn new(handlers: HandlerTable, repos: Repositories) -> Self {
        Self { handlers, repos }
    }

    /// Handles one batch.
    pub async fn handle(&self, bulk_transactions: BulkTransactions) -> FacilitatorResult<()> {
        debug!(kinds = ?bulk_transactions.kinds().collect::<Vec<_>>(), "handling bulk transactions");

        // all handlers are resolved before anything is written
        let resolved = bulk_transactions
            .into_iter()
            .map(|(kind, records)| match self.handlers.get(&kind) {
                Some(handler) => Ok((kind, handler, records)),
                None => {
                    error!(%kind, "no handler registered");
                    Err(FacilitatorError::HandlerNotFound(kind))
                }
            })
            .collect::<FacilitatorResult<Vec<_>>>()?;

        let persisted = try_join_all(resolved.into_iter().map(
            |(kind, handler, records)| async move {
                trace!(%kind, count = records.len(), "persisting records");
                handler.persist(records).await
            },
        ))
        .await?;

        // try_join_all keeps the input order
        for batch in persisted {
            batch.handle().await?;
        }

        self.repos.notify().await;

        Ok(())
    }
}
