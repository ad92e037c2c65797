//! The acceptance stage of the staking bridge facilitator.
//!
//! Batches of decoded chain events ([`bulk_transactions::BulkTransactions`]) are fed to the
//! [`transaction_handler::TransactionHandler`], which persists them through per-kind
//! [`handlers::ContractEntityHandler`]s, runs their follow-up logic and finally notifies the
//! repository subscribers. Accepting a stake request links it to a new hash-locked message, see
//! [`services::accept_stake_request`].

pub mod bulk_transactions;
pub mod errors;
pub mod handler_factory;
pub mod handlers;
pub mod secret;
pub mod services;
pub mod transaction_handler;
