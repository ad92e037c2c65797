//! Serde helpers for [`U256`] values.
//!
//! Decoded chain events carry integers either as JSON numbers or as strings (decimal or
//! `0x`-prefixed hex) since most of them do not fit in a 64-bit integer. These helpers accept all
//! three forms and always serialize as a decimal string.

use std::fmt;

use serde::{de, Deserializer, Serializer};

use crate::types::{parse_u256, U256};

struct U256Visitor;

impl de::Visitor<'_> for U256Visitor {
    type Value = U256;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an unsigned integer or a decimal/hex string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(U256::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Self::Value, E> {
        Ok(U256::new(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(U256::from)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        parse_u256(v).map_err(E::custom)
    }
}

/// Serializes a [`U256`] as a decimal string.
pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Deserializes a [`U256`] from a number or a string.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    deserializer.deserialize_any(U256Visitor)
}

/// Same as the parent module but for optional values.
pub mod option {
    use std::fmt;

    use serde::{de, Deserializer, Serializer};

    use super::U256Visitor;
    use crate::types::U256;

    struct OptionVisitor;

    impl<'de> de::Visitor<'de> for OptionVisitor {
        type Value = Option<U256>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("null, an unsigned integer or a decimal/hex string")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(U256Visitor).map(Some)
        }
    }

    /// Serializes an optional [`U256`] as a decimal string or `null`.
    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.collect_str(v),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes an optional [`U256`].
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
        deserializer.deserialize_option(OptionVisitor)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Amounts {
        #[serde(with = "crate::serde_utils")]
        amount: U256,

        #[serde(with = "crate::serde_utils::option", default)]
        gas_price: Option<U256>,
    }

    #[test]
    fn test_accepts_numbers_and_strings() {
        let from_number: Amounts = serde_json::from_str(r#"{"amount": 21}"#).unwrap();
        let from_decimal: Amounts = serde_json::from_str(r#"{"amount": "21"}"#).unwrap();
        let from_hex: Amounts =
            serde_json::from_str(r#"{"amount": "0x15", "gas_price": "22"}"#).unwrap();

        assert_eq!(from_number.amount, U256::new(21));
        assert_eq!(from_number, from_decimal);
        assert_eq!(from_hex.amount, U256::new(21));
        assert_eq!(from_hex.gas_price, Some(U256::new(22)));
    }

    #[test]
    fn test_serializes_as_decimal_string() {
        let value = Amounts {
            amount: U256::MAX,
            gas_price: None,
        };
        let json = serde_json::to_value(&value).unwrap();

        assert_eq!(json["amount"], U256::MAX.to_string());
        assert!(json["gas_price"].is_null());
    }

    #[test]
    fn test_rejects_negative_numbers() {
        assert!(serde_json::from_str::<Amounts>(r#"{"amount": -1}"#).is_err());
    }
}
