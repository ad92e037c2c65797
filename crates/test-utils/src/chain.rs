//! Module to generate arbitrary chain values for testing.

use facilitator_primitives::{
    message::{Message, MessageDirection, MessageStatus, MessageType},
    stake_request::StakeRequest,
    types::{Address, H256, U256},
};
use rand::{rngs::OsRng, Rng, RngCore};

/// Generates a random address.
pub fn generate_address() -> Address {
    let mut bytes = [0u8; Address::LEN];
    OsRng.fill_bytes(&mut bytes);

    Address::new(bytes)
}

/// Generates a random 32-byte hash.
pub fn generate_h256() -> H256 {
    let mut bytes = [0u8; H256::LEN];
    OsRng.fill_bytes(&mut bytes);

    H256::new(bytes)
}

/// Generates a random integer that fits in 64 bits, the range chain amounts are usually in.
pub fn generate_u256() -> U256 {
    U256::from(OsRng.gen::<u64>())
}

/// Generates a random stake request that has not been accepted yet.
pub fn generate_stake_request() -> StakeRequest {
    StakeRequest {
        stake_request_hash: generate_h256(),
        amount: generate_u256(),
        beneficiary: generate_address(),
        gas_price: generate_u256(),
        gas_limit: generate_u256(),
        nonce: generate_u256(),
        gateway: generate_address(),
        staker: generate_address(),
        staker_proxy: generate_address(),
        message_hash: None,
    }
}

/// Generates a random stake message declared on origin but not yet on auxiliary, without a
/// secret.
pub fn generate_declared_message() -> Message {
    Message {
        message_hash: generate_h256(),
        message_type: MessageType::Stake,
        gateway_address: generate_address(),
        source_status: MessageStatus::Declared,
        target_status: MessageStatus::Undeclared,
        gas_price: Some(generate_u256()),
        gas_limit: Some(generate_u256()),
        nonce: generate_u256(),
        sender: generate_address(),
        direction: MessageDirection::OriginToAuxiliary,
        source_declaration_block_height: generate_u256(),
        secret: None,
        hash_lock: None,
    }
}
