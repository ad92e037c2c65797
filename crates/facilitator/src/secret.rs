//! Generation of the secret that unlocks a stake message and the hash lock committing to it.

use std::fmt::Debug;

use facilitator_primitives::{hashing, types::H256};
use rand::{rngs::OsRng, RngCore};

/// A secret and its hash lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretHashLock {
    pub secret: H256,
    pub hash_lock: H256,
}

impl SecretHashLock {
    /// Derives the hash lock of `secret`.
    pub fn from_secret(secret: H256) -> Self {
        Self {
            secret,
            hash_lock: hashing::hash_lock(&secret),
        }
    }
}

/// Source of fresh secret/hash-lock pairs for newly accepted stake requests.
pub trait SecretGenerator: Debug + Send + Sync {
    fn generate(&self) -> SecretHashLock;
}

/// Draws secrets from the operating system's RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSecretGenerator;

impl SecretGenerator for RandomSecretGenerator {
    fn generate(&self) -> SecretHashLock {
        let mut secret = [0u8; H256::LEN];
        OsRng.fill_bytes(&mut secret);

        SecretHashLock::from_secret(H256::new(secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_secrets_commit_to_their_hash_lock() {
        let first = RandomSecretGenerator.generate();
        let second = RandomSecretGenerator.generate();

        assert_eq!(first.hash_lock, hashing::keccak256(first.secret));
        assert_ne!(first.secret, second.secret, "secrets must not repeat");
    }

    #[test]
    fn test_from_secret() {
        let secret: H256 = "0x1d5b16860e7306df9e2d3ee077d6f3e3c4a4b5b22d2ae6d5adfee6a2147f529c"
            .parse()
            .unwrap();

        assert_eq!(
            SecretHashLock::from_secret(secret).hash_lock.to_string(),
            "0xa36e17d0a9b4240af1deff571017e108d2c1a40de02d84f419113b1e1f7ad40f"
        );
    }
}
