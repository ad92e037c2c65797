//! Handler of stake intents declared by a gateway.

use async_trait::async_trait;
use facilitator_db::repositories::Repositories;
use facilitator_primitives::{
    message::{Message, MessageDirection, MessageStatus, MessageType},
    serde_utils,
    types::{Address, H256, U256},
};
use serde::Deserialize;
use tracing::{debug, info};

use super::{decode_records, kinds, ContractEntityHandler, RawRecord};
use crate::errors::FacilitatorResult;

/// A `StakeIntentDeclared` event of the gateway contract.
///
/// The event also carries the beneficiary and amount, which are already committed to by the
/// message hash.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StakeIntentDeclaredRecord {
    message_hash: H256,

    staker: Address,

    #[serde(with = "serde_utils")]
    staker_nonce: U256,

    contract_address: Address,

    #[serde(with = "serde_utils")]
    block_number: U256,
}

/// Marks stake messages as declared on the origin chain.
#[derive(Debug, Clone)]
pub struct StakeIntentDeclaredHandler {
    repos: Repositories,
}

impl StakeIntentDeclaredHandler {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    async fn declare(&self, record: StakeIntentDeclaredRecord) -> FacilitatorResult<Message> {
        let message = match self.repos.message_repository.get(&record.message_hash).await? {
            Some(message) if message.source_status != MessageStatus::Undeclared => return Ok(message),
            Some(mut message) => {
                message.source_status = MessageStatus::Declared;
                message.source_declaration_block_height = record.block_number;
                message
            }
            None => Message {
                message_hash: record.message_hash,
                message_type: MessageType::Stake,
                gateway_address: record.contract_address,
                source_status: MessageStatus::Declared,
                target_status: MessageStatus::Undeclared,
                gas_price: None,
                gas_limit: None,
                nonce: record.staker_nonce,
                sender: record.staker,
                direction: MessageDirection::OriginToAuxiliary,
                source_declaration_block_height: record.block_number,
                secret: None,
                hash_lock: None,
            },
        };

        Ok(self.repos.message_repository.save(&message).await?)
    }
}

#[async_trait]
impl ContractEntityHandler for StakeIntentDeclaredHandler {
    type Model = Message;

    async fn persist(&self, records: Vec<RawRecord>) -> FacilitatorResult<Vec<Message>> {
        let records =
            decode_records::<StakeIntentDeclaredRecord>(kinds::STAKE_INTENT_DECLAREDS, records)?;

        let mut models = Vec::with_capacity(records.len());
        for record in records {
            models.push(self.declare(record).await?);
        }
        debug!(count = models.len(), "persisted declared stake intents");

        Ok(models)
    }

    async fn handle(&self, models: &[Message]) -> FacilitatorResult<()> {
        for message in models {
            info!(
                message_hash = %message.message_hash,
                height = %message.source_declaration_block_height,
                "stake intent declared"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use facilitator_test_utils::prelude::generate_declared_message;
    use serde_json::json;

    use super::*;

    fn record(message_hash: &H256) -> RawRecord {
        json!({
            "messageHash": message_hash.to_string(),
            "staker": "0x0000000000000000000000000000000000000013",
            "stakerNonce": "24",
            "beneficiary": "0x0000000000000000000000000000000000000011",
            "amount": 21,
            "contractAddress": "0x0000000000000000000000000000000000000012",
            "blockNumber": "0x64",
        })
    }

    #[tokio::test]
    async fn test_persist_creates_declared_message() {
        let repos = Repositories::create_in_memory().await.unwrap();
        let handler = StakeIntentDeclaredHandler::new(repos.clone());
        let message_hash = H256::new([0xab; 32]);

        let models = handler.persist(vec![record(&message_hash)]).await.unwrap();
        let again = handler
            .persist(vec![record(&message_hash)])
            .await
            .expect("re-ingesting a declaration must succeed");

        assert_eq!(models, again, "re-ingesting must not change the message");
        let message = &models[0];
        assert_eq!(message.message_hash, message_hash);
        assert_eq!(message.source_status, MessageStatus::Declared);
        assert_eq!(message.target_status, MessageStatus::Undeclared);
        assert_eq!(message.source_declaration_block_height, U256::new(100));
        assert_eq!(message.nonce, U256::new(24));
        assert_eq!(message.gas_price, None);
        handler.handle(&models).await.unwrap();
    }

    #[tokio::test]
    async fn test_persist_declares_existing_message() {
        let repos = Repositories::create_in_memory().await.unwrap();
        let handler = StakeIntentDeclaredHandler::new(repos.clone());

        let mut undeclared = generate_declared_message();
        undeclared.source_status = MessageStatus::Undeclared;
        undeclared.secret = Some(H256::new([1; 32]));
        undeclared.hash_lock = Some(H256::new([2; 32]));
        repos.message_repository.create(&undeclared).await.unwrap();

        let mut progressed = generate_declared_message();
        progressed.source_status = MessageStatus::Progressed;
        repos.message_repository.create(&progressed).await.unwrap();

        let models = handler
            .persist(vec![
                record(&undeclared.message_hash),
                record(&progressed.message_hash),
            ])
            .await
            .unwrap();

        assert_eq!(
            models[0],
            Message {
                source_status: MessageStatus::Declared,
                source_declaration_block_height: U256::new(100),
                ..undeclared
            },
            "only the declaration fields must change"
        );
        assert_eq!(models[1], progressed, "later states must not regress");
    }
}
