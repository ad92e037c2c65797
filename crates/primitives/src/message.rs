//! The cross-chain message entity and its protocol states.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    errors::ParseError,
    types::{Address, H256, U256},
};

/// The kind of value transfer a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Stake,
    Redeem,
}

/// Progress of a message on one of the two chains.
///
/// Each message has an independent status on its source and its target chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageStatus {
    Undeclared,
    Declared,
    Progressed,
    DeclaredRevocation,
    Revoked,
}

/// Which chain the message informs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageDirection {
    OriginToAuxiliary,
    AuxiliaryToOrigin,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Canonical textual form, used for storage.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum!(MessageType, "message type", {
    Stake => "stake",
    Redeem => "redeem",
});

text_enum!(MessageStatus, "message status", {
    Undeclared => "undeclared",
    Declared => "declared",
    Progressed => "progressed",
    DeclaredRevocation => "declared_revocation",
    Revoked => "revoked",
});

text_enum!(MessageDirection, "message direction", {
    OriginToAuxiliary => "origin_to_auxiliary",
    AuxiliaryToOrigin => "auxiliary_to_origin",
});

/// The protocol envelope tracking a single value transfer between the two chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identity; equals the on-chain message hash.
    pub message_hash: H256,

    #[serde(rename = "type")]
    pub message_type: MessageType,

    pub gateway_address: Address,

    pub source_status: MessageStatus,

    pub target_status: MessageStatus,

    /// Unknown for messages first learned from a declaration event.
    #[serde(with = "crate::serde_utils::option", default)]
    pub gas_price: Option<U256>,

    /// Unknown for messages first learned from a declaration event.
    #[serde(with = "crate::serde_utils::option", default)]
    pub gas_limit: Option<U256>,

    #[serde(with = "crate::serde_utils")]
    pub nonce: U256,

    pub sender: Address,

    pub direction: MessageDirection,

    /// Block height of the declaration on the source chain, zero until declared.
    #[serde(with = "crate::serde_utils")]
    pub source_declaration_block_height: U256,

    /// Preimage of `hash_lock`. Set together with it, exactly once.
    #[serde(default)]
    pub secret: Option<H256>,

    #[serde(default)]
    pub hash_lock: Option<H256>,
}
