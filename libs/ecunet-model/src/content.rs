//! Typed content values
//!
//! A [`ContentValue`] holds a scalar or a homogeneous array of one of ten numeric
//! kinds. The storage variant *is* the kind, so a value can never hold data that
//! disagrees with its declared kind.

use crate::canopen::update_bool;
use crate::error::{ModelError, Result};
use crc::Digest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Content kinds
// ============================================================================

/// Numeric kind of a content value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ContentKind {
    UInt8 = 0,
    UInt16 = 1,
    UInt32 = 2,
    UInt64 = 3,
    SInt8 = 4,
    SInt16 = 5,
    SInt32 = 6,
    SInt64 = 7,
    Float32 = 8,
    Float64 = 9,
}

impl ContentKind {
    pub const ALL: [ContentKind; 10] = [
        ContentKind::UInt8,
        ContentKind::UInt16,
        ContentKind::UInt32,
        ContentKind::UInt64,
        ContentKind::SInt8,
        ContentKind::SInt16,
        ContentKind::SInt32,
        ContentKind::SInt64,
        ContentKind::Float32,
        ContentKind::Float64,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::UInt8 => "uint8",
            ContentKind::UInt16 => "uint16",
            ContentKind::UInt32 => "uint32",
            ContentKind::UInt64 => "uint64",
            ContentKind::SInt8 => "sint8",
            ContentKind::SInt16 => "sint16",
            ContentKind::SInt32 => "sint32",
            ContentKind::SInt64 => "sint64",
            ContentKind::Float32 => "float32",
            ContentKind::Float64 => "float64",
        }
    }

    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ContentKind::Float32 | ContentKind::Float64)
    }

    /// 64-bit integer kinds cannot be represented losslessly as `f64`
    pub fn is_64_bit_integer(&self) -> bool {
        matches!(self, ContentKind::UInt64 | ContentKind::SInt64)
    }

    /// Smallest representable value, as `f64`
    pub fn min_as_f64(&self) -> f64 {
        match self {
            ContentKind::UInt8 | ContentKind::UInt16 | ContentKind::UInt32 | ContentKind::UInt64 => {
                0.0
            },
            ContentKind::SInt8 => f64::from(i8::MIN),
            ContentKind::SInt16 => f64::from(i16::MIN),
            ContentKind::SInt32 => f64::from(i32::MIN),
            ContentKind::SInt64 => i64::MIN as f64,
            ContentKind::Float32 => f64::from(f32::MIN),
            ContentKind::Float64 => f64::MIN,
        }
    }

    /// Largest representable value, as `f64`
    pub fn max_as_f64(&self) -> f64 {
        match self {
            ContentKind::UInt8 => f64::from(u8::MAX),
            ContentKind::UInt16 => f64::from(u16::MAX),
            ContentKind::UInt32 => f64::from(u32::MAX),
            ContentKind::UInt64 => u64::MAX as f64,
            ContentKind::SInt8 => f64::from(i8::MAX),
            ContentKind::SInt16 => f64::from(i16::MAX),
            ContentKind::SInt32 => f64::from(i32::MAX),
            ContentKind::SInt64 => i64::MAX as f64,
            ContentKind::Float32 => f64::from(f32::MAX),
            ContentKind::Float64 => f64::MAX,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        ContentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| ModelError::config(format!("Unknown content kind: '{}'", s)))
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Kind-tagged storage of a content value
///
/// Serialized as `{ "kind": "uint8", "values": [..] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "lowercase")]
pub enum ContentData {
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    SInt8(Vec<i8>),
    SInt16(Vec<i16>),
    SInt32(Vec<i32>),
    SInt64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

/// Runs `$body` with `$v` bound to the inner vector, whatever the variant
macro_rules! with_values {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ContentData::UInt8($v) => $body,
            ContentData::UInt16($v) => $body,
            ContentData::UInt32($v) => $body,
            ContentData::UInt64($v) => $body,
            ContentData::SInt8($v) => $body,
            ContentData::SInt16($v) => $body,
            ContentData::SInt32($v) => $body,
            ContentData::SInt64($v) => $body,
            ContentData::Float32($v) => $body,
            ContentData::Float64($v) => $body,
        }
    };
}

impl ContentData {
    /// Zero-initialized storage with `len` elements
    pub fn zeroed(kind: ContentKind, len: usize) -> Self {
        match kind {
            ContentKind::UInt8 => ContentData::UInt8(vec![0; len]),
            ContentKind::UInt16 => ContentData::UInt16(vec![0; len]),
            ContentKind::UInt32 => ContentData::UInt32(vec![0; len]),
            ContentKind::UInt64 => ContentData::UInt64(vec![0; len]),
            ContentKind::SInt8 => ContentData::SInt8(vec![0; len]),
            ContentKind::SInt16 => ContentData::SInt16(vec![0; len]),
            ContentKind::SInt32 => ContentData::SInt32(vec![0; len]),
            ContentKind::SInt64 => ContentData::SInt64(vec![0; len]),
            ContentKind::Float32 => ContentData::Float32(vec![0.0; len]),
            ContentKind::Float64 => ContentData::Float64(vec![0.0; len]),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            ContentData::UInt8(_) => ContentKind::UInt8,
            ContentData::UInt16(_) => ContentKind::UInt16,
            ContentData::UInt32(_) => ContentKind::UInt32,
            ContentData::UInt64(_) => ContentKind::UInt64,
            ContentData::SInt8(_) => ContentKind::SInt8,
            ContentData::SInt16(_) => ContentKind::SInt16,
            ContentData::SInt32(_) => ContentKind::SInt32,
            ContentData::SInt64(_) => ContentKind::SInt64,
            ContentData::Float32(_) => ContentKind::Float32,
            ContentData::Float64(_) => ContentKind::Float64,
        }
    }

    pub fn len(&self) -> usize {
        with_values!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resize(&mut self, len: usize) {
        with_values!(self, v => v.resize(len, Default::default()))
    }

    fn zero_all(&mut self) {
        with_values!(self, v => v.iter_mut().for_each(|x| *x = Default::default()))
    }

    /// Element at `index` widened to `f64` (lossy for 64-bit integers)
    fn as_f64(&self, index: usize) -> Option<f64> {
        match self {
            ContentData::UInt8(v) => v.get(index).map(|x| f64::from(*x)),
            ContentData::UInt16(v) => v.get(index).map(|x| f64::from(*x)),
            ContentData::UInt32(v) => v.get(index).map(|x| f64::from(*x)),
            ContentData::UInt64(v) => v.get(index).map(|x| *x as f64),
            ContentData::SInt8(v) => v.get(index).map(|x| f64::from(*x)),
            ContentData::SInt16(v) => v.get(index).map(|x| f64::from(*x)),
            ContentData::SInt32(v) => v.get(index).map(|x| f64::from(*x)),
            ContentData::SInt64(v) => v.get(index).map(|x| *x as f64),
            ContentData::Float32(v) => v.get(index).map(|x| f64::from(*x)),
            ContentData::Float64(v) => v.get(index).copied(),
        }
    }

    /// Native-endian bytes of every element, in order
    fn for_each_ne_bytes(&self, mut f: impl FnMut(&[u8])) {
        with_values!(self, v => v.iter().for_each(|x| f(&x.to_ne_bytes())))
    }
}

// ============================================================================
// Scalar element types
// ============================================================================

mod sealed {
    pub trait Sealed {}
}

/// Rust scalar type that maps to exactly one [`ContentKind`]
pub trait ContentScalar: Copy + sealed::Sealed {
    const KIND: ContentKind;

    fn values(data: &ContentData) -> Option<&Vec<Self>>;
    fn values_mut(data: &mut ContentData) -> Option<&mut Vec<Self>>;
    fn wrap(values: Vec<Self>) -> ContentData;
}

macro_rules! impl_content_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl ContentScalar for $ty {
                const KIND: ContentKind = ContentKind::$variant;

                fn values(data: &ContentData) -> Option<&Vec<Self>> {
                    match data {
                        ContentData::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn values_mut(data: &mut ContentData) -> Option<&mut Vec<Self>> {
                    match data {
                        ContentData::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn wrap(values: Vec<Self>) -> ContentData {
                    ContentData::$variant(values)
                }
            }
        )*
    };
}

impl_content_scalar! {
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    i8 => SInt8,
    i16 => SInt16,
    i32 => SInt32,
    i64 => SInt64,
    f32 => Float32,
    f64 => Float64,
}

// ============================================================================
// ContentValue
// ============================================================================

/// Typed scalar-or-array value
///
/// Scalars hold exactly one element. Index arguments are ignored for scalars
/// and must be `< len()` for arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContent")]
pub struct ContentValue {
    data: ContentData,
    #[serde(default)]
    is_array: bool,
}

#[derive(Deserialize)]
struct RawContent {
    data: ContentData,
    #[serde(default)]
    is_array: bool,
}

impl TryFrom<RawContent> for ContentValue {
    type Error = ModelError;

    fn try_from(raw: RawContent) -> Result<Self> {
        if !raw.is_array && raw.data.len() != 1 {
            return Err(ModelError::config(format!(
                "Scalar {} content must hold exactly one value, got {}",
                raw.data.kind(),
                raw.data.len()
            )));
        }
        Ok(Self {
            data: raw.data,
            is_array: raw.is_array,
        })
    }
}

impl Default for ContentValue {
    fn default() -> Self {
        Self::scalar(ContentKind::UInt8)
    }
}

impl ContentValue {
    /// Zero scalar of `kind`
    pub fn scalar(kind: ContentKind) -> Self {
        Self {
            data: ContentData::zeroed(kind, 1),
            is_array: false,
        }
    }

    /// Zero-filled array of `kind` with `len` elements
    pub fn array(kind: ContentKind, len: u32) -> Self {
        Self {
            data: ContentData::zeroed(kind, len as usize),
            is_array: true,
        }
    }

    /// Scalar holding the smallest value of `kind`
    pub fn kind_min(kind: ContentKind) -> Self {
        match kind {
            ContentKind::UInt8 => Self::from_scalar(u8::MIN),
            ContentKind::UInt16 => Self::from_scalar(u16::MIN),
            ContentKind::UInt32 => Self::from_scalar(u32::MIN),
            ContentKind::UInt64 => Self::from_scalar(u64::MIN),
            ContentKind::SInt8 => Self::from_scalar(i8::MIN),
            ContentKind::SInt16 => Self::from_scalar(i16::MIN),
            ContentKind::SInt32 => Self::from_scalar(i32::MIN),
            ContentKind::SInt64 => Self::from_scalar(i64::MIN),
            ContentKind::Float32 => Self::from_scalar(f32::MIN),
            ContentKind::Float64 => Self::from_scalar(f64::MIN),
        }
    }

    /// Scalar holding the largest value of `kind`
    pub fn kind_max(kind: ContentKind) -> Self {
        match kind {
            ContentKind::UInt8 => Self::from_scalar(u8::MAX),
            ContentKind::UInt16 => Self::from_scalar(u16::MAX),
            ContentKind::UInt32 => Self::from_scalar(u32::MAX),
            ContentKind::UInt64 => Self::from_scalar(u64::MAX),
            ContentKind::SInt8 => Self::from_scalar(i8::MAX),
            ContentKind::SInt16 => Self::from_scalar(i16::MAX),
            ContentKind::SInt32 => Self::from_scalar(i32::MAX),
            ContentKind::SInt64 => Self::from_scalar(i64::MAX),
            ContentKind::Float32 => Self::from_scalar(f32::MAX),
            ContentKind::Float64 => Self::from_scalar(f64::MAX),
        }
    }

    pub fn from_scalar<T: ContentScalar>(value: T) -> Self {
        Self {
            data: T::wrap(vec![value]),
            is_array: false,
        }
    }

    pub fn from_array<T: ContentScalar>(values: Vec<T>) -> Self {
        Self {
            data: T::wrap(values),
            is_array: true,
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.data.kind()
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// Number of elements (1 for scalars)
    pub fn len(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &ContentData {
        &self.data
    }

    /// Change the element count of an array; new elements are zero
    pub fn resize(&mut self, len: u32) -> Result<()> {
        if !self.is_array {
            return Err(ModelError::config("Cannot resize scalar content"));
        }
        self.data.resize(len as usize);
        Ok(())
    }

    /// Feed kind, array-ness, length and the raw element bytes into `digest`
    pub fn hash_into(&self, digest: &mut Digest<'_, u32>) {
        digest.update(&[self.kind() as u8]);
        update_bool(digest, self.is_array);
        digest.update(&self.len().to_ne_bytes());
        self.data.for_each_ne_bytes(|bytes| digest.update(bytes));
    }

    /// Whether `other` has the same kind, array-ness and length
    pub fn same_shape(&self, other: &ContentValue) -> bool {
        self.kind() == other.kind() && self.is_array == other.is_array && self.len() == other.len()
    }

    /// Effective storage index: scalars ignore `index`, arrays bound-check it
    pub(crate) fn slot(&self, index: u32) -> Result<usize> {
        if !self.is_array {
            return Ok(0);
        }
        if index < self.len() {
            Ok(index as usize)
        } else {
            Err(ModelError::range(format!(
                "Content index {} out of range (length {})",
                index,
                self.len()
            )))
        }
    }

    fn kind_mismatch(&self, requested: ContentKind) -> ModelError {
        ModelError::config(format!(
            "Content kind mismatch: expected {}, requested {}",
            self.kind(),
            requested
        ))
    }

    pub fn get<T: ContentScalar>(&self, index: u32) -> Result<T> {
        let slot = self.slot(index)?;
        let values = T::values(&self.data).ok_or_else(|| self.kind_mismatch(T::KIND))?;
        Ok(values[slot])
    }

    pub fn set<T: ContentScalar>(&mut self, index: u32, value: T) -> Result<()> {
        let slot = self.slot(index)?;
        if self.kind() != T::KIND {
            return Err(self.kind_mismatch(T::KIND));
        }
        if let Some(values) = T::values_mut(&mut self.data) {
            values[slot] = value;
        }
        Ok(())
    }

    /// Element widened to `f64`; 64-bit integers lose precision above 2^53
    pub fn get_as_f64(&self, index: u32) -> Result<f64> {
        let slot = self.slot(index)?;
        self.data
            .as_f64(slot)
            .ok_or_else(|| ModelError::range(format!("Content index {} out of range", index)))
    }

    pub(crate) fn zero_all(&mut self) {
        self.data.zero_all();
    }

    /// Copy one element bit-exactly from `source`, which must share this kind
    pub(crate) fn copy_element_from(&mut self, source: &ContentValue, index: u32) -> Result<()> {
        if self.kind() != source.kind() {
            return Err(self.kind_mismatch(source.kind()));
        }
        let dst = self.slot(index)?;
        let src = source.slot(index)?;
        match (&mut self.data, &source.data) {
            (ContentData::UInt8(d), ContentData::UInt8(s)) => d[dst] = s[src],
            (ContentData::UInt16(d), ContentData::UInt16(s)) => d[dst] = s[src],
            (ContentData::UInt32(d), ContentData::UInt32(s)) => d[dst] = s[src],
            (ContentData::UInt64(d), ContentData::UInt64(s)) => d[dst] = s[src],
            (ContentData::SInt8(d), ContentData::SInt8(s)) => d[dst] = s[src],
            (ContentData::SInt16(d), ContentData::SInt16(s)) => d[dst] = s[src],
            (ContentData::SInt32(d), ContentData::SInt32(s)) => d[dst] = s[src],
            (ContentData::SInt64(d), ContentData::SInt64(s)) => d[dst] = s[src],
            (ContentData::Float32(d), ContentData::Float32(s)) => d[dst] = s[src],
            (ContentData::Float64(d), ContentData::Float64(s)) => d[dst] = s[src],
            _ => unreachable!("kinds compared equal above"),
        }
        Ok(())
    }
}
