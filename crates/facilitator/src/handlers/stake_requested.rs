//! Handler of stake requests made against a gateway.

use async_trait::async_trait;
use facilitator_db::repositories::Repositories;
use facilitator_primitives::{
    serde_utils,
    stake_request::StakeRequest,
    types::{Address, H256, U256},
};
use serde::Deserialize;
use tracing::debug;

use super::{decode_records, kinds, ContractEntityHandler, RawRecord};
use crate::{
    errors::{FacilitatorError, FacilitatorResult},
    services::accept_stake_request::AcceptStakeRequestService,
};

/// A `StakeRequested` event of the gateway contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StakeRequestedRecord {
    stake_request_hash: H256,

    #[serde(with = "serde_utils")]
    amount: U256,

    beneficiary: Address,

    #[serde(with = "serde_utils")]
    gas_price: U256,

    #[serde(with = "serde_utils")]
    gas_limit: U256,

    #[serde(with = "serde_utils")]
    nonce: U256,

    gateway: Address,

    staker: Address,

    staker_proxy: Address,
}

impl From<StakeRequestedRecord> for StakeRequest {
    fn from(record: StakeRequestedRecord) -> Self {
        Self {
            stake_request_hash: record.stake_request_hash,
            amount: record.amount,
            beneficiary: record.beneficiary,
            gas_price: record.gas_price,
            gas_limit: record.gas_limit,
            nonce: record.nonce,
            gateway: record.gateway,
            staker: record.staker,
            staker_proxy: record.staker_proxy,
            message_hash: None,
        }
    }
}

/// Stores stake requests and accepts the new ones.
#[derive(Debug, Clone)]
pub struct StakeRequestedHandler {
    repos: Repositories,
    service: AcceptStakeRequestService,
}

impl StakeRequestedHandler {
    pub fn new(repos: Repositories, service: AcceptStakeRequestService) -> Self {
        Self { repos, service }
    }
}

#[async_trait]
impl ContractEntityHandler for StakeRequestedHandler {
    type Model = StakeRequest;

    /// Upserts the stake requests. The returned models carry the stored `message_hash`, so
    /// re-ingested requests that were already accepted are recognised as such.
    async fn persist(&self, records: Vec<RawRecord>) -> FacilitatorResult<Vec<StakeRequest>> {
        let records = decode_records::<StakeRequestedRecord>(kinds::STAKE_REQUESTEDS, records)?;

        let mut models = Vec::with_capacity(records.len());
        for record in records {
            let stake_request = StakeRequest::from(record);
            let hash = stake_request.stake_request_hash;

            let stored = self
                .repos
                .stake_request_repository
                .save(&stake_request)
                .await
                .map_err(|e| {
                    FacilitatorError::on_conflict(e, || {
                        format!("stake request {hash} conflicts with its accepted copy")
                    })
                })?;
            models.push(stored);
        }
        debug!(count = models.len(), "persisted stake requests");

        Ok(models)
    }

    async fn handle(&self, models: &[StakeRequest]) -> FacilitatorResult<()> {
        self.service.update(models).await
    }
}
