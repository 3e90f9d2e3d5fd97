//! Data pool tree: pools, lists and elements

use crate::canopen::CRC32;
use crate::content::{ContentKind, ContentValue};
use crate::error::Result;
use crate::range::{self, ChangeKind, ClampMode};
use crc::Digest;
use serde::{Deserialize, Serialize};

fn update_str(digest: &mut Digest<'_, u32>, text: &str) {
    digest.update(&(text.len() as u32).to_ne_bytes());
    digest.update(text.as_bytes());
}

/// Access rights of a data pool element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    ReadOnly,
    #[default]
    ReadWrite,
}

/// One typed variable of a list
///
/// `value`, `min_value` and `max_value` are expected to share kind and shape;
/// this is checked by the range utilities, not on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoolElement {
    pub name: String,
    pub value: ContentValue,
    pub min_value: ContentValue,
    pub max_value: ContentValue,
    #[serde(default)]
    pub access: AccessKind,
}

impl DataPoolElement {
    /// Scalar element of `kind` spanning the full range of the kind
    pub fn new(name: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            name: name.into(),
            value: ContentValue::scalar(kind),
            min_value: ContentValue::kind_min(kind),
            max_value: ContentValue::kind_max(kind),
            access: AccessKind::default(),
        }
    }

    pub fn with_range(mut self, min_value: ContentValue, max_value: ContentValue) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self
    }

    pub fn with_value(mut self, value: ContentValue) -> Self {
        self.value = value;
        self
    }

    pub fn kind(&self) -> ContentKind {
        self.value.kind()
    }

    /// Whether the current value lies within `[min_value, max_value]`
    pub fn value_in_range(&self) -> Result<bool> {
        range::check_range(&self.min_value, &self.max_value, &self.value)
    }

    /// Pull the current value back into `[min_value, max_value]`
    pub fn clamp_value(&mut self, mode: ClampMode) -> Result<ChangeKind> {
        range::clamp_to_range(&self.min_value, &self.max_value, &mut self.value, mode)
    }

    pub fn hash_into(&self, digest: &mut Digest<'_, u32>) {
        update_str(digest, &self.name);
        self.value.hash_into(digest);
        self.min_value.hash_into(digest);
        self.max_value.hash_into(digest);
        digest.update(&[self.access as u8]);
    }
}

/// Ordered element collection of a data pool
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct List {
    pub name: String,
    #[serde(default)]
    pub elements: Vec<DataPoolElement>,
}

impl List {
    pub fn new(name: impl Into<String>, elements: Vec<DataPoolElement>) -> Self {
        Self {
            name: name.into(),
            elements,
        }
    }

    /// COM lists carry their direction in the name: a trailing `T` marks Tx
    pub fn is_tx(&self) -> bool {
        self.name.chars().count() >= 2 && self.name.ends_with('T')
    }

    pub fn hash_into(&self, digest: &mut Digest<'_, u32>) {
        update_str(digest, &self.name);
        digest.update(&(self.elements.len() as u32).to_ne_bytes());
        for element in &self.elements {
            element.hash_into(digest);
        }
    }
}

/// Named collection of lists of one node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataPool {
    pub name: String,
    #[serde(default)]
    pub lists: Vec<List>,
}

impl DataPool {
    pub fn new(name: impl Into<String>, lists: Vec<List>) -> Self {
        Self {
            name: name.into(),
            lists,
        }
    }

    /// Name, then every list and element in order, values included
    pub fn hash_into(&self, digest: &mut Digest<'_, u32>) {
        update_str(digest, &self.name);
        digest.update(&(self.lists.len() as u32).to_ne_bytes());
        for list in &self.lists {
            list.hash_into(digest);
        }
    }

    /// CRC-32 of the pool contents, continuing from `seed`
    ///
    /// Native byte order: only comparable within one process/architecture.
    pub fn calc_hash(&self, seed: u32) -> u32 {
        let mut digest = CRC32.digest_with_initial(seed);
        self.hash_into(&mut digest);
        digest.finalize()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_list_direction_from_name() {
        assert!(List::new("CAN1_T", vec![]).is_tx());
        assert!(!List::new("CAN1_R", vec![]).is_tx());
        // A lone "T" is too short to carry a direction suffix
        assert!(!List::new("T", vec![]).is_tx());
        assert!(!List::new("", vec![]).is_tx());
        assert!(!List::new("CAN1_t", vec![]).is_tx());
    }

    #[test]
    fn test_element_full_range_defaults() {
        let element = DataPoolElement::new("speed", ContentKind::SInt16);
        assert_eq!(element.min_value.get::<i16>(0).unwrap(), i16::MIN);
        assert_eq!(element.max_value.get::<i16>(0).unwrap(), i16::MAX);
        assert!(element.value_in_range().unwrap());
    }

    #[test]
    fn test_element_clamp_value() {
        let mut element = DataPoolElement::new("temp", ContentKind::Float32)
            .with_range(
                ContentValue::from_scalar(-40.0f32),
                ContentValue::from_scalar(125.0f32),
            )
            .with_value(ContentValue::from_scalar(300.0f32));
        assert!(!element.value_in_range().unwrap());
        assert_eq!(element.clamp_value(ClampMode::LeaveValue).unwrap(), ChangeKind::Max);
        assert_eq!(element.value.get::<f32>(0).unwrap(), 125.0);
    }

    #[test]
    fn test_pool_hash_tracks_values() {
        let pool = DataPool::new(
            "COM",
            vec![List::new(
                "CAN1_T",
                vec![DataPoolElement::new("speed", ContentKind::UInt16)],
            )],
        );
        let before = pool.calc_hash(0);
        assert_eq!(pool.clone().calc_hash(0), before);
        assert_ne!(pool.calc_hash(1), before);

        let mut edited = pool.clone();
        edited.lists[0].elements[0].value.set(0, 42u16).unwrap();
        assert_ne!(edited.calc_hash(0), before);

        let mut renamed = pool.clone();
        renamed.lists[0].name = "CAN1_R".to_string();
        assert_ne!(renamed.calc_hash(0), before);

        let mut readonly = pool;
        readonly.lists[0].elements[0].access = AccessKind::ReadOnly;
        assert_ne!(readonly.calc_hash(0), before);
    }
}
