//! Acceptance of stake requests.
//!
//! Accepting a stake request creates the stake [`Message`] that carries it to the auxiliary chain,
//! locked with a freshly generated secret, and links the request to that message. The message hash
//! is computed exactly like the message bus contract does so that both chains agree on it.

use std::{collections::HashSet, sync::Arc};

use facilitator_db::repositories::Repositories;
use facilitator_primitives::{
    hashing,
    message::{Message, MessageDirection, MessageStatus, MessageType},
    stake_request::StakeRequest,
    types::U256,
};
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::{
    errors::{FacilitatorError, FacilitatorResult},
    secret::{SecretGenerator, SecretHashLock},
};

/// Links pending stake requests to newly created stake messages.
#[derive(Debug, Clone)]
pub struct AcceptStakeRequestService {
    repos: Repositories,
    secret_generator: Arc<dyn SecretGenerator>,
}

impl AcceptStakeRequestService {
    pub fn new(repos: Repositories, secret_generator: Arc<dyn SecretGenerator>) -> Self {
        Self {
            repos,
            secret_generator,
        }
    }

    /// Accepts every stake request in `stake_requests` that is not linked to a message yet.
    ///
    /// Requests are accepted concurrently. A request that is already linked, either in the given
    /// model or in storage, is left untouched.
    pub async fn update(&self, stake_requests: &[StakeRequest]) -> FacilitatorResult<()> {
        let mut seen = HashSet::new();
        let pending = stake_requests.iter().filter(|stake_request| {
            if let Some(message_hash) = stake_request.message_hash {
                let stake_request_hash = stake_request.stake_request_hash;
                debug!(%stake_request_hash, %message_hash, "already accepted");
                return false;
            }

            seen.insert(stake_request.stake_request_hash)
        });

        let accepted = try_join_all(pending.map(|stake_request| self.accept(stake_request)))
            .await?
            .into_iter()
            .flatten()
            .count();
        debug!(%accepted, total = stake_requests.len(), "processed stake requests");

        Ok(())
    }

    /// Accepts `stake_request`, returning the message it was linked to.
    ///
    /// Returns `None` if storage already links the request to a message.
    async fn accept(&self, stake_request: &StakeRequest) -> FacilitatorResult<Option<Message>> {
        let stake_request_hash = stake_request.stake_request_hash;

        let current = self
            .repos
            .stake_request_repository
            .get(&stake_request_hash)
            .await?
            .unwrap_or_else(|| stake_request.clone());
        if let Some(message_hash) = current.message_hash {
            debug!(%stake_request_hash, %message_hash, "stored stake request already accepted");
            return Ok(None);
        }

        let SecretHashLock { secret, hash_lock } = self.secret_generator.generate();
        if hashing::hash_lock(&secret) != hash_lock {
            return Err(FacilitatorError::ProtocolInvariantViolation(format!(
                "hash lock {hash_lock} does not commit to the generated secret"
            )));
        }

        let message_hash = hashing::stake_message_hash(&current, &hash_lock);
        if self
            .repos
            .message_repository
            .get(&message_hash)
            .await?
            .is_some()
        {
            return Err(FacilitatorError::ProtocolInvariantViolation(format!(
                "message {message_hash} of stake request {stake_request_hash} already exists"
            )));
        }

        let message = Message {
            message_hash,
            message_type: MessageType::Stake,
            gateway_address: current.gateway,
            source_status: MessageStatus::Undeclared,
            target_status: MessageStatus::Undeclared,
            gas_price: Some(current.gas_price),
            gas_limit: Some(current.gas_limit),
            nonce: current.nonce,
            sender: current.staker_proxy,
            direction: MessageDirection::OriginToAuxiliary,
            source_declaration_block_height: U256::ZERO,
            secret: Some(secret),
            hash_lock: Some(hash_lock),
        };
        let message = self
            .repos
            .message_repository
            .create(&message)
            .await
            .map_err(|e| {
                FacilitatorError::on_conflict(e, || {
                    format!("message {message_hash} of stake request {stake_request_hash} exists")
                })
            })?;

        let linked = StakeRequest {
            message_hash: Some(message_hash),
            ..current
        };
        self.repos
            .stake_request_repository
            .save(&linked)
            .await
            .map_err(|e| {
                FacilitatorError::on_conflict(e, || {
                    format!("stake request {stake_request_hash} is linked to another message")
                })
            })?;

        info!(%stake_request_hash, %message_hash, "accepted stake request");

        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use facilitator_primitives::types::{Address, H256};
    use facilitator_test_utils::prelude::{
        generate_declared_message, generate_h256, generate_stake_request,
    };

    use super::*;
    use crate::secret::RandomSecretGenerator;

    const SECRET: &str = "0x1d5b16860e7306df9e2d3ee077d6f3e3c4a4b5b22d2ae6d5adfee6a2147f529c";
    const HASH_LOCK: &str = "0xa36e17d0a9b4240af1deff571017e108d2c1a40de02d84f419113b1e1f7ad40f";
    const EXPECTED_MESSAGE_HASH: &str =
        "0x15d2b8c03013fe1780d44c7c93b5d03422f88c8d4084568d190d7eb1a9907646";

    /// Always hands out the same pair.
    #[derive(Debug)]
    struct FixedSecretGenerator(SecretHashLock);

    impl FixedSecretGenerator {
        fn new(secret: &str, hash_lock: &str) -> Self {
            Self(SecretHashLock {
                secret: secret.parse().unwrap(),
                hash_lock: hash_lock.parse().unwrap(),
            })
        }
    }

    impl SecretGenerator for FixedSecretGenerator {
        fn generate(&self) -> SecretHashLock {
            self.0
        }
    }

    fn address(last: u8) -> Address {
        let mut bytes = [0u8; Address::LEN];
        bytes[Address::LEN - 1] = last;

        Address::new(bytes)
    }

    fn stake_request_c() -> StakeRequest {
        StakeRequest {
            stake_request_hash: H256::new([0xcc; 32]),
            amount: U256::new(21),
            beneficiary: address(0x11),
            gas_price: U256::new(22),
            gas_limit: U256::new(23),
            nonce: U256::new(24),
            gateway: address(0x12),
            staker: address(0x14),
            staker_proxy: address(0x13),
            message_hash: None,
        }
    }

    fn fixed_service(repos: &Repositories) -> AcceptStakeRequestService {
        AcceptStakeRequestService::new(
            repos.clone(),
            Arc::new(FixedSecretGenerator::new(SECRET, HASH_LOCK)),
        )
    }

    #[tokio::test]
    async fn test_accepts_unlinked_and_skips_linked_stake_request() {
        let repos = Repositories::create_in_memory().await.unwrap();

        let mut message_b = generate_declared_message();
        message_b.target_status = MessageStatus::Declared;
        let message_b = repos.message_repository.create(&message_b).await.unwrap();
        let mut stake_request_b = generate_stake_request();
        stake_request_b.message_hash = Some(message_b.message_hash);
        let stake_request_b = repos
            .stake_request_repository
            .save(&stake_request_b)
            .await
            .unwrap();

        let stake_request_c = repos
            .stake_request_repository
            .save(&stake_request_c())
            .await
            .unwrap();

        fixed_service(&repos)
            .update(&[stake_request_b.clone(), stake_request_c.clone()])
            .await
            .expect("must be able to accept stake requests");

        let expected_hash: H256 = EXPECTED_MESSAGE_HASH.parse().unwrap();
        let stored_c = repos
            .stake_request_repository
            .get(&stake_request_c.stake_request_hash)
            .await
            .unwrap()
            .expect("stake request C must exist");
        assert_eq!(
            stored_c.message_hash,
            Some(expected_hash),
            "stake request must be linked to the contract-compatible message hash"
        );

        let message = repos
            .message_repository
            .get(&expected_hash)
            .await
            .unwrap()
            .expect("message must have been created");
        assert_eq!(
            message,
            Message {
                message_hash: expected_hash,
                message_type: MessageType::Stake,
                gateway_address: address(0x12),
                source_status: MessageStatus::Undeclared,
                target_status: MessageStatus::Undeclared,
                gas_price: Some(U256::new(22)),
                gas_limit: Some(U256::new(23)),
                nonce: U256::new(24),
                sender: address(0x13),
                direction: MessageDirection::OriginToAuxiliary,
                source_declaration_block_height: U256::ZERO,
                secret: Some(SECRET.parse().unwrap()),
                hash_lock: Some(HASH_LOCK.parse().unwrap()),
            }
        );

        assert!(
            repos
                .message_repository
                .get(&message_b.message_hash)
                .await
                .is_ok_and(|v| v == Some(message_b)),
            "existing message must be unaffected"
        );
        assert!(
            repos
                .stake_request_repository
                .get(&stake_request_b.stake_request_hash)
                .await
                .is_ok_and(|v| v == Some(stake_request_b)),
            "already linked stake request must be unaffected"
        );
    }

    #[tokio::test]
    async fn test_message_hash_is_write_once() {
        let repos = Repositories::create_in_memory().await.unwrap();
        let stale = repos
            .stake_request_repository
            .save(&stake_request_c())
            .await
            .unwrap();

        let service = fixed_service(&repos);
        service.update(&[stale.clone()]).await.unwrap();

        // re-running with the stale, unlinked model must neither relink nor fail on the
        // already existing message
        service
            .update(&[stale.clone()])
            .await
            .expect("re-running acceptance must succeed");

        let random = AcceptStakeRequestService::new(repos.clone(), Arc::new(RandomSecretGenerator));
        random.update(&[stale.clone()]).await.unwrap();

        assert!(
            repos
                .stake_request_repository
                .get(&stale.stake_request_hash)
                .await
                .is_ok_and(|v| v.and_then(|v| v.message_hash)
                    == Some(EXPECTED_MESSAGE_HASH.parse::<H256>().unwrap())),
            "message hash must never change once set"
        );
    }

    #[tokio::test]
    async fn test_rejects_hash_lock_not_matching_secret() {
        let repos = Repositories::create_in_memory().await.unwrap();
        let stake_request = repos
            .stake_request_repository
            .save(&stake_request_c())
            .await
            .unwrap();

        let service = AcceptStakeRequestService::new(
            repos.clone(),
            Arc::new(FixedSecretGenerator::new(SECRET, &generate_h256().to_string())),
        );

        assert!(
            matches!(
                service.update(&[stake_request.clone()]).await,
                Err(FacilitatorError::ProtocolInvariantViolation(_))
            ),
            "must reject a hash lock that does not commit to the secret"
        );
        assert!(
            repos
                .stake_request_repository
                .get(&stake_request.stake_request_hash)
                .await
                .is_ok_and(|v| v.is_some_and(|v| v.message_hash.is_none())),
            "stake request must stay unlinked"
        );
    }

    #[tokio::test]
    async fn test_rejects_existing_message_hash() {
        let repos = Repositories::create_in_memory().await.unwrap();
        let stake_request = repos
            .stake_request_repository
            .save(&stake_request_c())
            .await
            .unwrap();

        let mut squatter = generate_declared_message();
        squatter.message_hash = EXPECTED_MESSAGE_HASH.parse().unwrap();
        repos.message_repository.create(&squatter).await.unwrap();

        assert!(
            matches!(
                fixed_service(&repos).update(&[stake_request]).await,
                Err(FacilitatorError::ProtocolInvariantViolation(_))
            ),
            "must not reuse an existing message"
        );
        assert!(
            repos
                .message_repository
                .get(&squatter.message_hash)
                .await
                .is_ok_and(|v| v == Some(squatter)),
            "existing message must not be overwritten"
        );
    }

    #[tokio::test]
    async fn test_accepts_many_stake_requests_concurrently() {
        let repos = Repositories::create_in_memory().await.unwrap();
        let mut stake_requests = Vec::new();
        for _ in 0..5 {
            let stake_request = generate_stake_request();
            stake_requests.push(
                repos
                    .stake_request_repository
                    .save(&stake_request)
                    .await
                    .unwrap(),
            );
        }
        // duplicates within one call are accepted once
        stake_requests.push(stake_requests[0].clone());

        AcceptStakeRequestService::new(repos.clone(), Arc::new(RandomSecretGenerator))
            .update(&stake_requests)
            .await
            .expect("must be able to accept all stake requests");

        let mut message_hashes = HashSet::new();
        for stake_request in &stake_requests[..5] {
            let stored = repos
                .stake_request_repository
                .get(&stake_request.stake_request_hash)
                .await
                .unwrap()
                .unwrap();
            let message_hash = stored.message_hash.expect("must be linked");
            let message = repos
                .message_repository
                .get(&message_hash)
                .await
                .unwrap()
                .expect("linked message must exist");

            assert_eq!(
                message.hash_lock.map(|lock| hashing::stake_message_hash(&stored, &lock)),
                Some(message_hash),
                "message hash must be derived from the stake request and the hash lock"
            );
            message_hashes.insert(message_hash);
        }
        assert_eq!(message_hashes.len(), 5, "every request gets its own message");
    }
}
