//! This module contains the types used to interact with the SQLite database at a column-level.
//!
//! Every chain type is stored as `TEXT`: integers in decimal (they do not fit SQLite's 64-bit
//! `INTEGER`), addresses and hashes as `0x`-prefixed hex and enums by their snake-case name.

use std::ops::Deref;

use facilitator_primitives::{
    message::{MessageDirection, MessageStatus, MessageType},
    types::{parse_u256, Address, H256, U256},
};
use sqlx::Sqlite;

/// Declares a newtype over a chain type that is stored as `TEXT`.
///
/// `$parse` turns the stored string back into the inner type and `$name` is used in decode
/// errors.
macro_rules! text_column {
    ($db:ident, $inner:ty, $name:literal, $parse:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub(super) struct $db($inner);

        impl Deref for $db {
            type Target = $inner;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<$inner> for $db {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl sqlx::Type<Sqlite> for $db {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <String as sqlx::Type<Sqlite>>::type_info()
            }
        }

        impl<'r> sqlx::Decode<'r, Sqlite> for $db {
            fn decode(
                value: <Sqlite as sqlx::Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text: String = sqlx::decode::Decode::<'r, Sqlite>::decode(value)?;
                let parsed = ($parse)(text.as_str()).map_err(|_| {
                    sqlx::Error::Decode(format!("Failed to decode {}: {}", $name, text).into())
                })?;

                Ok(Self(parsed))
            }
        }

        impl<'q> sqlx::Encode<'q, Sqlite> for $db {
            fn encode_by_ref(
                &self,
                buf: &mut <Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                let text = self.0.to_string();

                sqlx::Encode::<'q, Sqlite>::encode_by_ref(&text, buf)
            }
        }
    };
}

text_column!(DbU256, U256, "uint256", parse_u256);
text_column!(DbAddress, Address, "Address", str::parse::<Address>);
text_column!(DbH256, H256, "H256", str::parse::<H256>);
text_column!(
    DbMessageType,
    MessageType,
    "MessageType",
    str::parse::<MessageType>
);
text_column!(
    DbMessageStatus,
    MessageStatus,
    "MessageStatus",
    str::parse::<MessageStatus>
);
text_column!(
    DbMessageDirection,
    MessageDirection,
    "MessageDirection",
    str::parse::<MessageDirection>
);
