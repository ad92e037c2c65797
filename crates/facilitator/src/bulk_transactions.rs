//! The unit of ingestion: raw records grouped by kind.

use std::fmt;

use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::handlers::RawRecord;

/// Raw records observed in one processing window, grouped by kind.
///
/// Kinds keep the order in which they were first inserted, which is the order their handlers run
/// in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkTransactions {
    entries: Vec<(String, Vec<RawRecord>)>,
}

impl BulkTransactions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `records` of `kind`, appending to the records already present for that kind.
    pub fn insert(&mut self, kind: impl Into<String>, records: impl IntoIterator<Item = RawRecord>) {
        let kind = kind.into();

        match self.entries.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, existing)) => existing.extend(records),
            None => self.entries.push((kind, records.into_iter().collect())),
        }
    }

    /// Returns the records of `kind`, if any.
    pub fn get(&self, kind: &str) -> Option<&[RawRecord]> {
        self.entries
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, records)| records.as_slice())
    }

    /// Returns the kinds in insertion order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(kind, _)| kind.as_str())
    }

    /// Returns the number of kinds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for BulkTransactions {
    type Item = (String, Vec<RawRecord>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<RawRecord>)> for BulkTransactions {
    fn from_iter<T: IntoIterator<Item = (K, Vec<RawRecord>)>>(iter: T) -> Self {
        let mut bulk = Self::new();
        for (kind, records) in iter {
            bulk.insert(kind, records);
        }

        bulk
    }
}

impl Serialize for BulkTransactions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (kind, records) in &self.entries {
            map.serialize_entry(kind, records)?;
        }

        map.end()
    }
}

struct BulkTransactionsVisitor;

impl<'de> Visitor<'de> for BulkTransactionsVisitor {
    type Value = BulkTransactions;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map from record kind to a list of records")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut bulk = BulkTransactions::new();
        while let Some((kind, records)) = access.next_entry::<String, Vec<RawRecord>>()? {
            bulk.insert(kind, records);
        }

        Ok(bulk)
    }
}

impl<'de> Deserialize<'de> for BulkTransactions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(BulkTransactionsVisitor)
    }
}
