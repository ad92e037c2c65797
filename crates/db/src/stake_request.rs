use async_trait::async_trait;
use facilitator_primitives::{stake_request::StakeRequest, types::H256};

use crate::errors::DbResult;

/// Storage of [`StakeRequest`]s, keyed by their `stake_request_hash`.
#[async_trait]
pub trait StakeRequestDb {
    /// Inserts a new [`StakeRequest`], failing if one with the same hash already exists.
    async fn create_stake_request(&self, stake_request: &StakeRequest) -> DbResult<StakeRequest>;

    /// Inserts or updates a [`StakeRequest`] and returns the stored row.
    ///
    /// A stored `message_hash` is never cleared, and replacing it with a different one is
    /// rejected.
    async fn save_stake_request(&self, stake_request: &StakeRequest) -> DbResult<StakeRequest>;

    /// Gets, if present, the [`StakeRequest`] with the given hash.
    async fn get_stake_request(&self, stake_request_hash: &H256) -> DbResult<Option<StakeRequest>>;

    /// Gets, if present, the [`StakeRequest`] linked to the given message.
    async fn get_stake_request_by_message_hash(
        &self,
        message_hash: &H256,
    ) -> DbResult<Option<StakeRequest>>;
}
