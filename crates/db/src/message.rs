use async_trait::async_trait;
use facilitator_primitives::{message::Message, types::H256};

use crate::errors::DbResult;

/// Storage of [`Message`]s, keyed by their `message_hash`.
#[async_trait]
pub trait MessageDb {
    /// Inserts a new [`Message`], failing if one with the same hash already exists.
    async fn create_message(&self, message: &Message) -> DbResult<Message>;

    /// Inserts or updates a [`Message`] and returns the stored row.
    ///
    /// The `secret`/`hash_lock` pair is write-once: a stored pair is never cleared and replacing it
    /// with a different one is rejected.
    async fn save_message(&self, message: &Message) -> DbResult<Message>;

    /// Gets, if present, the [`Message`] with the given hash.
    async fn get_message(&self, message_hash: &H256) -> DbResult<Option<Message>>;
}
