//! Serialize a map with structured keys as a list of `{ key, value }` entries
//!
//! JSON, TOML and figment only accept string map keys.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Serialize)]
struct EntryRef<'a, K, V> {
    key: &'a K,
    value: &'a V,
}

#[derive(Deserialize)]
struct Entry<K, V> {
    key: K,
    value: V,
}

pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    K: Serialize,
    V: Serialize,
    S: Serializer,
{
    serializer.collect_seq(map.iter().map(|(key, value)| EntryRef { key, value }))
}

pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
where
    K: Deserialize<'de> + Ord,
    V: Deserialize<'de>,
    D: Deserializer<'de>,
{
    let entries = Vec::<Entry<K, V>>::deserialize(deserializer)?;
    let count = entries.len();
    let map: BTreeMap<K, V> = entries
        .into_iter()
        .map(|entry| (entry.key, entry.value))
        .collect();
    if map.len() != count {
        return Err(D::Error::custom("duplicate map key"));
    }
    Ok(map)
}
