//! Persistence for stake requests and cross-chain messages.
//!
//! The storage traits live in [`stake_request`] and [`message`], with a SQLite implementation in
//! [`persistent`]. Most consumers should go through the [`repositories::Repositories`] façade,
//! which also buffers updates and forwards them to subscribers on
//! [`notify`](repositories::Repositories::notify).

pub mod errors;
pub mod message;
pub mod persistent;
pub mod repositories;
pub mod stake_request;
pub mod subscription;
