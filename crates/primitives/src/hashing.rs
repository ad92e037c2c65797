//! Hashing routines that must match the gateway and message bus contracts bit for bit.
//!
//! The contracts hash typed structs the EIP-712 way: a type hash over the struct signature followed
//! by each member ABI-encoded into its own 32-byte word, all fed to keccak256.

use sha3::{Digest, Keccak256};

use crate::{
    stake_request::StakeRequest,
    types::{Address, H256, U256},
};

/// Struct signature of a stake intent as declared in the gateway contract.
pub const STAKE_INTENT_TYPE: &str =
    "StakeIntent(uint256 amount,address beneficiary,address gateway)";

/// Struct signature of a message as declared in the message bus contract.
pub const MESSAGE_TYPE: &str = "Message(bytes32 intentHash,uint256 nonce,uint256 gasPrice,uint256 \
                                gasLimit,address sender,bytes32 hashLock)";

/// Computes keccak256 over `data`.
pub fn keccak256(data: impl AsRef<[u8]>) -> H256 {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data.as_ref()));

    H256::new(out)
}

/// Accumulates static ABI words, the `abi.encode` layout for fixed-size arguments.
#[derive(Debug, Default, Clone)]
pub struct AbiWords {
    buf: Vec<u8>,
}

impl AbiWords {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `uint256` as a big-endian word.
    pub fn uint(mut self, value: U256) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Appends an `address`, left-padded to a word.
    pub fn address(mut self, value: &Address) -> Self {
        self.buf.extend_from_slice(&[0u8; 12]);
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    /// Appends a `bytes32`.
    pub fn bytes32(mut self, value: &H256) -> Self {
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    /// Hashes the encoded words.
    pub fn keccak256(&self) -> H256 {
        keccak256(&self.buf)
    }

    /// Returns the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Type hash of [`STAKE_INTENT_TYPE`].
pub fn stake_intent_type_hash() -> H256 {
    keccak256(STAKE_INTENT_TYPE)
}

/// Type hash of [`MESSAGE_TYPE`].
pub fn message_type_hash() -> H256 {
    keccak256(MESSAGE_TYPE)
}

/// Hash of the stake intent a gateway declares for a stake.
pub fn stake_intent_hash(amount: U256, beneficiary: &Address, gateway: &Address) -> H256 {
    AbiWords::new()
        .bytes32(&stake_intent_type_hash())
        .uint(amount)
        .address(beneficiary)
        .address(gateway)
        .keccak256()
}

/// Hash identifying a message on both chains.
pub fn message_hash(
    intent_hash: &H256,
    nonce: U256,
    gas_price: U256,
    gas_limit: U256,
    sender: &Address,
    hash_lock: &H256,
) -> H256 {
    AbiWords::new()
        .bytes32(&message_type_hash())
        .bytes32(intent_hash)
        .uint(nonce)
        .uint(gas_price)
        .uint(gas_limit)
        .address(sender)
        .bytes32(hash_lock)
        .keccak256()
}

/// Hash of the message that carries `stake_request` across, locked with `hash_lock`.
///
/// The staker proxy is the sender of stake messages.
pub fn stake_message_hash(stake_request: &StakeRequest, hash_lock: &H256) -> H256 {
    let intent_hash = stake_intent_hash(
        stake_request.amount,
        &stake_request.beneficiary,
        &stake_request.gateway,
    );

    message_hash(
        &intent_hash,
        stake_request.nonce,
        stake_request.gas_price,
        stake_request.gas_limit,
        &stake_request.staker_proxy,
        hash_lock,
    )
}

/// Hash lock committing to `secret`.
pub fn hash_lock(secret: &H256) -> H256 {
    keccak256(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(s: &str) -> Address {
        s.parse().unwrap()
    }

    fn h256(s: &str) -> H256 {
        s.parse().unwrap()
    }

    fn stake_request() -> StakeRequest {
        StakeRequest {
            stake_request_hash: H256::new([0xcc; 32]),
            amount: U256::new(21),
            beneficiary: address("0x0000000000000000000000000000000000000011"),
            gas_price: U256::new(22),
            gas_limit: U256::new(23),
            nonce: U256::new(24),
            gateway: address("0x0000000000000000000000000000000000000012"),
            staker: address("0x0000000000000000000000000000000000000014"),
            staker_proxy: address("0x0000000000000000000000000000000000000013"),
            message_hash: None,
        }
    }

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            keccak256(b""),
            h256("0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
    }

    #[test]
    fn test_type_hashes() {
        assert_eq!(
            stake_intent_type_hash(),
            h256("0xfb6e1349876ffeefa5eb4210fb5aad8aaf18d1912c7612c50fb377ff474f1bf2")
        );
        assert_eq!(
            message_type_hash(),
            h256("0x9cf4230a47925df81c8303f411cf77638da117f88b9797df996fd848e6ad8f64")
        );
    }

    #[test]
    fn test_abi_words_layout() {
        let bytes = AbiWords::new()
            .uint(U256::new(1))
            .address(&address("0x00000000000000000000000000000000000000ff"))
            .into_bytes();

        assert_eq!(bytes.len(), 64);
        assert_eq!(bytes[31], 1);
        assert!(bytes[..31].iter().all(|b| *b == 0));
        assert_eq!(bytes[63], 0xff);
        assert!(bytes[32..63].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_hash_lock_of_secret() {
        let secret = h256("0x1d5b16860e7306df9e2d3ee077d6f3e3c4a4b5b22d2ae6d5adfee6a2147f529c");

        assert_eq!(
            hash_lock(&secret),
            h256("0xa36e17d0a9b4240af1deff571017e108d2c1a40de02d84f419113b1e1f7ad40f")
        );
    }

    #[test]
    fn test_stake_intent_hash() {
        let request = stake_request();

        assert_eq!(
            stake_intent_hash(request.amount, &request.beneficiary, &request.gateway),
            h256("0x0cf17c8ef537ed85a48ee9e22037e41c58f8f850614bb786010f86920f95463b")
        );
    }

    #[test]
    fn test_stake_message_hash_matches_contract() {
        let hash_lock = h256("0xa36e17d0a9b4240af1deff571017e108d2c1a40de02d84f419113b1e1f7ad40f");

        assert_eq!(
            stake_message_hash(&stake_request(), &hash_lock),
            h256("0x15d2b8c03013fe1780d44c7c93b5d03422f88c8d4084568d190d7eb1a9907646")
        );
    }

    #[test]
    fn test_stake_message_hash_depends_on_preimage_fields() {
        let hash_lock = H256::new([7; 32]);
        let base = stake_message_hash(&stake_request(), &hash_lock);

        let mut request = stake_request();
        request.gas_limit = U256::new(24);
        assert_ne!(stake_message_hash(&request, &hash_lock), base);

        let mut request = stake_request();
        std::mem::swap(&mut request.beneficiary, &mut request.gateway);
        assert_ne!(stake_message_hash(&request, &hash_lock), base);

        assert_ne!(
            stake_message_hash(&stake_request(), &H256::new([8; 32])),
            base
        );

        // neither the staker nor the request hash are part of the preimage
        let mut request = stake_request();
        request.staker = Address::new([9; 20]);
        request.stake_request_hash = H256::new([1; 32]);
        assert_eq!(stake_message_hash(&request, &hash_lock), base);
    }
}
