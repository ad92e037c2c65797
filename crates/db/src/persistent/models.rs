//! This module contains the models for the database tables.
//!
//! These models rely on some common types in [`super::types`] module.

use facilitator_primitives::{message::Message, stake_request::StakeRequest};

use super::types::{DbAddress, DbH256, DbMessageDirection, DbMessageStatus, DbMessageType, DbU256};

/// The model for a row of the `stake_request` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct StakeRequestRow {
    pub(super) stake_request_hash: DbH256,

    pub(super) amount: DbU256,

    pub(super) beneficiary: DbAddress,

    pub(super) gas_price: DbU256,

    pub(super) gas_limit: DbU256,

    pub(super) nonce: DbU256,

    pub(super) gateway: DbAddress,

    pub(super) staker: DbAddress,

    pub(super) staker_proxy: DbAddress,

    /// `NULL` until the request has been accepted.
    pub(super) message_hash: Option<DbH256>,
}

impl From<StakeRequestRow> for StakeRequest {
    fn from(row: StakeRequestRow) -> Self {
        Self {
            stake_request_hash: *row.stake_request_hash,
            amount: *row.amount,
            beneficiary: *row.beneficiary,
            gas_price: *row.gas_price,
            gas_limit: *row.gas_limit,
            nonce: *row.nonce,
            gateway: *row.gateway,
            staker: *row.staker,
            staker_proxy: *row.staker_proxy,
            message_hash: row.message_hash.map(|v| *v),
        }
    }
}

/// The model for a row of the `message` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct MessageRow {
    pub(super) message_hash: DbH256,

    pub(super) message_type: DbMessageType,

    pub(super) gateway_address: DbAddress,

    pub(super) source_status: DbMessageStatus,

    pub(super) target_status: DbMessageStatus,

    pub(super) gas_price: Option<DbU256>,

    pub(super) gas_limit: Option<DbU256>,

    pub(super) nonce: DbU256,

    pub(super) sender: DbAddress,

    pub(super) direction: DbMessageDirection,

    pub(super) source_declaration_block_height: DbU256,

    pub(super) secret: Option<DbH256>,

    pub(super) hash_lock: Option<DbH256>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            message_hash: *row.message_hash,
            message_type: *row.message_type,
            gateway_address: *row.gateway_address,
            source_status: *row.source_status,
            target_status: *row.target_status,
            gas_price: row.gas_price.map(|v| *v),
            gas_limit: row.gas_limit.map(|v| *v),
            nonce: *row.nonce,
            sender: *row.sender,
            direction: *row.direction,
            source_declaration_block_height: *row.source_declaration_block_height,
            secret: row.secret.map(|v| *v),
            hash_lock: row.hash_lock.map(|v| *v),
        }
    }
}
