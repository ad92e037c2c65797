//! Wiring of the handlers of every known record kind.

use std::sync::Arc;

use facilitator_db::repositories::Repositories;

use crate::{
    handlers::{
        kinds, stake_intent_declared::StakeIntentDeclaredHandler,
        stake_requested::StakeRequestedHandler, HandlerTable,
    },
    secret::SecretGenerator,
    services::accept_stake_request::AcceptStakeRequestService,
};

/// Builds the [`HandlerTable`] used by the facilitator.
#[derive(Debug, Clone, Copy)]
pub struct HandlerFactory;

impl HandlerFactory {
    /// Returns a handler for every kind in [`kinds`], all backed by `repos`.
    pub fn handlers(repos: &Repositories, secret_generator: Arc<dyn SecretGenerator>) -> HandlerTable {
        let service = AcceptStakeRequestService::new(repos.clone(), secret_generator);

        HandlerTable::default()
            .with_handler(
                kinds::STAKE_REQUESTEDS,
                Arc::new(StakeRequestedHandler::new(repos.clone(), service)),
            )
            .with_handler(
                kinds::STAKE_INTENT_DECLAREDS,
                Arc::new(StakeIntentDeclaredHandler::new(repos.clone())),
            )
    }
}
