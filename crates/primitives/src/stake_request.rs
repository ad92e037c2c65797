//! The stake request entity observed on the origin chain.

use serde::{Deserialize, Serialize};

use crate::types::{Address, H256, U256};

/// A user's request on the origin chain to lock value in exchange for a mint on the auxiliary
/// chain.
///
/// The `message_hash` links the request to the [`Message`](crate::message::Message) that carries
/// it across chains. It starts out empty and is set exactly once, when the request is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeRequest {
    /// Unique, immutable identity of the request.
    pub stake_request_hash: H256,

    /// The amount to stake.
    #[serde(with = "crate::serde_utils")]
    pub amount: U256,

    /// Receiver of the minted value on the auxiliary chain.
    pub beneficiary: Address,

    /// Gas price the staker pays the facilitator for progressing the message.
    #[serde(with = "crate::serde_utils")]
    pub gas_price: U256,

    /// Gas limit the staker pays the facilitator for progressing the message.
    #[serde(with = "crate::serde_utils")]
    pub gas_limit: U256,

    /// The staker's nonce at the gateway.
    #[serde(with = "crate::serde_utils")]
    pub nonce: U256,

    /// The origin-chain gateway the request was made against.
    pub gateway: Address,

    /// The account that requested the stake.
    pub staker: Address,

    /// The staker's proxy contract, which acts as the message sender.
    pub staker_proxy: Address,

    /// Hash of the linked message, once accepted.
    #[serde(default)]
    pub message_hash: Option<H256>,
}

impl StakeRequest {
    /// Whether a message has already been linked to this request.
    pub fn is_accepted(&self) -> bool {
        self.message_hash.is_some()
    }
}
