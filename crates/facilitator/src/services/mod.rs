//! Protocol services run as the follow-up of persisted entities.

pub mod accept_stake_request;
