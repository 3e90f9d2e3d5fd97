//! Content range utilities
//!
//! Numeric transfer between editor/configuration floats and strongly typed
//! [`ContentValue`]s, plus min/max range enforcement.

use crate::content::{ContentKind, ContentValue};
use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Slack used when comparing a value against its range bounds as `f64`.
///
/// Values round-trip through ~6 significant decimal digits in editors and
/// configuration files.
pub const RANGE_EPSILON: f64 = 1e-5;

/// What to do with an element before the range check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampMode {
    /// Keep the current value if it is within range
    #[default]
    LeaveValue,
    /// Zero the element first, then range check the zero
    ToZero,
}

/// Outcome of clamping one element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    NoChange,
    Min,
    Max,
    Zero,
}

/// Size in bytes of one element of `kind`
pub fn byte_size(kind: ContentKind) -> u32 {
    match kind {
        ContentKind::UInt8 | ContentKind::SInt8 => 1,
        ContentKind::UInt16 | ContentKind::SInt16 => 2,
        ContentKind::UInt32 | ContentKind::SInt32 | ContentKind::Float32 => 4,
        ContentKind::UInt64 | ContentKind::SInt64 | ContentKind::Float64 => 8,
    }
}

/// Set every element (or the scalar) to zero
pub fn zero_fill(content: &mut ContentValue) {
    content.zero_all();
}

/// Round to one decimal place, halves rounding up
fn round_one_decimal(value: f64) -> f64 {
    ((value * 10.0) + 0.5).floor() / 10.0
}

/// Integer conversion: the lower bound is checked with the unrounded value,
/// the upper bound with the rounded one.
fn saturate<T>(value: f64, rounded: f64, kind: ContentKind, min: T, max: T, cast: fn(f64) -> T) -> T {
    if value <= kind.min_as_f64() {
        min
    } else if rounded >= kind.max_as_f64() {
        max
    } else {
        cast(rounded)
    }
}

/// Convert `value` to the kind of `content` and store it at `index`
///
/// Integer kinds are rounded and saturated at the kind's limits. Float kinds
/// are stored as-is (`Float32` narrows). `index` is ignored for scalars.
pub fn assign_float(value: f64, content: &mut ContentValue, index: u32) -> Result<()> {
    let kind = content.kind();
    let rounded = round_one_decimal(value);
    match kind {
        ContentKind::UInt8 => content.set(
            index,
            saturate(value, rounded, kind, u8::MIN, u8::MAX, |v| v as u8),
        ),
        ContentKind::UInt16 => content.set(
            index,
            saturate(value, rounded, kind, u16::MIN, u16::MAX, |v| v as u16),
        ),
        ContentKind::UInt32 => content.set(
            index,
            saturate(value, rounded, kind, u32::MIN, u32::MAX, |v| v as u32),
        ),
        ContentKind::UInt64 => content.set(
            index,
            saturate(value, rounded, kind, u64::MIN, u64::MAX, |v| v as u64),
        ),
        ContentKind::SInt8 => content.set(
            index,
            saturate(value, rounded, kind, i8::MIN, i8::MAX, |v| v as i8),
        ),
        ContentKind::SInt16 => content.set(
            index,
            saturate(value, rounded, kind, i16::MIN, i16::MAX, |v| v as i16),
        ),
        ContentKind::SInt32 => content.set(
            index,
            saturate(value, rounded, kind, i32::MIN, i32::MAX, |v| v as i32),
        ),
        ContentKind::SInt64 => content.set(
            index,
            saturate(value, rounded, kind, i64::MIN, i64::MAX, |v| v as i64),
        ),
        ContentKind::Float32 => content.set(index, value as f32),
        ContentKind::Float64 => content.set(index, value),
    }
}

/// Element at `index` as `f64`
pub fn value_as_f64(content: &ContentValue, index: u32) -> Result<f64> {
    content.get_as_f64(index)
}

/// Every element as `f64`, in index order
pub fn all_as_f64(content: &ContentValue) -> Vec<f64> {
    (0..content.len())
        .filter_map(|index| content.get_as_f64(index).ok())
        .collect()
}

fn check_shapes(min: &ContentValue, max: &ContentValue, value: &ContentValue) -> Result<()> {
    if min.kind() != value.kind() || max.kind() != value.kind() {
        return Err(ModelError::config(format!(
            "Range kinds differ: min {}, max {}, value {}",
            min.kind(),
            max.kind(),
            value.kind()
        )));
    }
    if !min.same_shape(value) || !max.same_shape(value) {
        return Err(ModelError::config(format!(
            "Range shapes differ: min {}x{}, max {}x{}, value {}x{}",
            if min.is_array() { "array" } else { "scalar" },
            min.len(),
            if max.is_array() { "array" } else { "scalar" },
            max.len(),
            if value.is_array() { "array" } else { "scalar" },
            value.len()
        )));
    }
    Ok(())
}

/// `max < min` at `index`, compared exactly for 64-bit integers
fn bound_inverted(min: &ContentValue, max: &ContentValue, index: u32) -> Result<bool> {
    Ok(match min.kind() {
        ContentKind::UInt64 => max.get::<u64>(index)? < min.get::<u64>(index)?,
        ContentKind::SInt64 => max.get::<i64>(index)? < min.get::<i64>(index)?,
        _ => max.get_as_f64(index)? < min.get_as_f64(index)?,
    })
}

fn check_bounds(min: &ContentValue, max: &ContentValue, index: u32) -> Result<()> {
    if bound_inverted(min, max, index)? {
        return Err(ModelError::range(format!(
            "Maximum is smaller than minimum at index {}",
            index
        )));
    }
    Ok(())
}

fn within(value: f64, min: f64, max: f64) -> bool {
    value >= (min - RANGE_EPSILON) && value <= (max + RANGE_EPSILON)
}

/// Whether every element of `value` already lies in `[min, max]`
///
/// Does not mutate. Fails like [`clamp_to_range`] on mismatched or inverted
/// ranges.
pub fn check_range(min: &ContentValue, max: &ContentValue, value: &ContentValue) -> Result<bool> {
    check_shapes(min, max, value)?;
    for index in 0..value.len() {
        check_bounds(min, max, index)?;
        let current = value.get_as_f64(index)?;
        if !within(current, min.get_as_f64(index)?, max.get_as_f64(index)?) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Apply `mode` to one element and pull it back into `[min, max]`
pub fn clamp_element(
    min: &ContentValue,
    max: &ContentValue,
    value: &mut ContentValue,
    mode: ClampMode,
    index: u32,
) -> Result<ChangeKind> {
    check_shapes(min, max, value)?;
    check_bounds(min, max, index)?;
    clamp_checked(min, max, value, mode, index)
}

fn clamp_checked(
    min: &ContentValue,
    max: &ContentValue,
    value: &mut ContentValue,
    mode: ClampMode,
    index: u32,
) -> Result<ChangeKind> {
    if mode == ClampMode::ToZero {
        assign_float(0.0, value, index)?;
    }

    let current = value.get_as_f64(index)?;
    let min_f = min.get_as_f64(index)?;
    let max_f = max.get_as_f64(index)?;

    if within(current, min_f, max_f) {
        return Ok(match mode {
            ClampMode::LeaveValue => ChangeKind::NoChange,
            ClampMode::ToZero => ChangeKind::Zero,
        });
    }

    // Ties go to the minimum
    let (bound, bound_f, change) = if (current - min_f).abs() > (current - max_f).abs() {
        (max, max_f, ChangeKind::Max)
    } else {
        (min, min_f, ChangeKind::Min)
    };

    if value.kind().is_64_bit_integer() {
        value.copy_element_from(bound, index)?;
    } else {
        assign_float(bound_f, value, index)?;
    }
    trace!("Clamped element {} from {} to {:?}", index, current, change);
    Ok(change)
}

/// Clamp every element of `value` into `[min, max]`
///
/// Kind/shape mismatches and inverted bounds are detected for every index
/// before any element is touched. Returns the change reported for the last
/// element (`NoChange` for empty arrays).
pub fn clamp_to_range(
    min: &ContentValue,
    max: &ContentValue,
    value: &mut ContentValue,
    mode: ClampMode,
) -> Result<ChangeKind> {
    check_shapes(min, max, value)?;
    for index in 0..value.len() {
        check_bounds(min, max, index)?;
    }

    let mut change = ChangeKind::NoChange;
    for index in 0..value.len() {
        change = clamp_checked(min, max, value, mode, index)?;
    }
    Ok(change)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    fn f64_content(value: f64) -> ContentValue {
        ContentValue::from_scalar(value)
    }

    #[test]
    fn test_byte_size() {
        assert_eq!(byte_size(ContentKind::UInt8), 1);
        assert_eq!(byte_size(ContentKind::SInt8), 1);
        assert_eq!(byte_size(ContentKind::SInt16), 2);
        assert_eq!(byte_size(ContentKind::UInt32), 4);
        assert_eq!(byte_size(ContentKind::Float32), 4);
        assert_eq!(byte_size(ContentKind::SInt64), 8);
        assert_eq!(byte_size(ContentKind::Float64), 8);
    }

    #[test]
    fn test_zero_fill_array() {
        let mut content = ContentValue::from_array(vec![3i32, -4, 5]);
        zero_fill(&mut content);
        assert_eq!(all_as_f64(&content), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_assign_float_rounds_and_saturates() {
        let mut content = ContentValue::scalar(ContentKind::UInt8);

        assign_float(300.0, &mut content, 0).unwrap();
        assert_eq!(content.get::<u8>(0).unwrap(), u8::MAX);

        assign_float(-3.0, &mut content, 0).unwrap();
        assert_eq!(content.get::<u8>(0).unwrap(), 0);

        assign_float(41.97, &mut content, 0).unwrap();
        assert_eq!(content.get::<u8>(0).unwrap(), 42);

        let mut signed = ContentValue::scalar(ContentKind::SInt8);
        assign_float(-12.96, &mut signed, 0).unwrap();
        assert_eq!(signed.get::<i8>(0).unwrap(), -13);
        // One decimal survives rounding, the cast then truncates toward zero
        assign_float(-12.34, &mut signed, 0).unwrap();
        assert_eq!(signed.get::<i8>(0).unwrap(), -12);
        assign_float(-500.0, &mut signed, 0).unwrap();
        assert_eq!(signed.get::<i8>(0).unwrap(), i8::MIN);
    }

    #[test]
    fn test_assign_float_upper_bound_uses_rounded_value() {
        let mut content = ContentValue::scalar(ContentKind::UInt8);
        // 254.96 rounds to 255.0 which hits the maximum
        assign_float(254.96, &mut content, 0).unwrap();
        assert_eq!(content.get::<u8>(0).unwrap(), 255);
    }

    #[test]
    fn test_assign_float_floats_unclamped() {
        let mut single = ContentValue::scalar(ContentKind::Float32);
        assign_float(1.25, &mut single, 0).unwrap();
        assert_eq!(single.get::<f32>(0).unwrap(), 1.25);

        let mut double = ContentValue::scalar(ContentKind::Float64);
        assign_float(1e300, &mut double, 0).unwrap();
        assert_eq!(double.get::<f64>(0).unwrap(), 1e300);
    }

    #[test]
    fn test_assign_float_array_index() {
        let mut content = ContentValue::array(ContentKind::SInt16, 2);
        assign_float(12.0, &mut content, 1).unwrap();
        assert_eq!(content.get::<i16>(1).unwrap(), 12);
        assert!(assign_float(1.0, &mut content, 2).unwrap_err().is_range());
    }

    #[test]
    fn test_clamp_in_range_leave_value() {
        let mut value = f64_content(1.0);
        let change =
            clamp_to_range(&f64_content(-1.0), &f64_content(2.0), &mut value, ClampMode::LeaveValue)
                .unwrap();
        assert_eq!(change, ChangeKind::NoChange);
        assert_eq!(value.get::<f64>(0).unwrap(), 1.0);
    }

    #[test]
    fn test_clamp_in_range_to_zero() {
        let mut value = f64_content(1.0);
        let change =
            clamp_to_range(&f64_content(-1.0), &f64_content(2.0), &mut value, ClampMode::ToZero)
                .unwrap();
        assert_eq!(change, ChangeKind::Zero);
        assert_eq!(value.get::<f64>(0).unwrap(), 0.0);
    }

    #[test]
    fn test_clamp_above_max() {
        let mut value = f64_content(2.0);
        let change =
            clamp_to_range(&f64_content(-1.0), &f64_content(1.0), &mut value, ClampMode::LeaveValue)
                .unwrap();
        assert_eq!(change, ChangeKind::Max);
        assert_eq!(value.get::<f64>(0).unwrap(), 1.0);
    }

    #[test]
    fn test_clamp_zero_outside_range_goes_to_min() {
        let mut value = f64_content(-2.0);
        let change =
            clamp_to_range(&f64_content(2.0), &f64_content(3.0), &mut value, ClampMode::ToZero)
                .unwrap();
        assert_eq!(change, ChangeKind::Min);
        assert_eq!(value.get::<f64>(0).unwrap(), 2.0);
    }

    #[test]
    fn test_clamp_tie_prefers_min() {
        let mut value = ContentValue::from_scalar(5i32);
        let min = ContentValue::from_scalar(10i32);
        let max = ContentValue::from_scalar(0i32);
        // Inverted on purpose: must be rejected rather than resolved
        assert!(clamp_to_range(&min, &max, &mut value, ClampMode::LeaveValue)
            .unwrap_err()
            .is_range());

        // Equal bounds: distance to min and max is identical
        let bound = ContentValue::from_scalar(7i32);
        let change = clamp_to_range(&bound, &bound, &mut value, ClampMode::LeaveValue).unwrap();
        assert_eq!(change, ChangeKind::Min);
        assert_eq!(value.get::<i32>(0).unwrap(), 7);
    }

    #[test]
    fn test_clamp_epsilon_tolerance() {
        let mut value = f64_content(1.000_001);
        let change =
            clamp_to_range(&f64_content(0.0), &f64_content(1.0), &mut value, ClampMode::LeaveValue)
                .unwrap();
        assert_eq!(change, ChangeKind::NoChange);
        assert_eq!(value.get::<f64>(0).unwrap(), 1.000_001);
    }

    #[test]
    fn test_clamp_kind_mismatch() {
        let mut value = f64_content(1.0);
        let min = ContentValue::from_scalar(-1.0f32);
        let err = clamp_to_range(&min, &f64_content(2.0), &mut value, ClampMode::LeaveValue)
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_clamp_shape_mismatch() {
        let mut value = ContentValue::from_array(vec![1.0f64, 2.0]);
        let min = ContentValue::from_array(vec![0.0f64]);
        let max = ContentValue::from_array(vec![5.0f64, 5.0]);
        let err = clamp_to_range(&min, &max, &mut value, ClampMode::LeaveValue).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_clamp_inverted_range() {
        let mut value = f64_content(0.5);
        let err = clamp_to_range(
            &f64_content(1.0),
            &f64_content(0.0),
            &mut value,
            ClampMode::LeaveValue,
        )
        .unwrap_err();
        assert!(err.is_range());
        assert_eq!(value.get::<f64>(0).unwrap(), 0.5);
    }

    #[test]
    fn test_clamp_array_is_atomic_on_error() {
        let min = ContentValue::from_array(vec![0u16, 10]);
        let max = ContentValue::from_array(vec![5u16, 1]);
        let mut value = ContentValue::from_array(vec![100u16, 100]);
        assert!(clamp_to_range(&min, &max, &mut value, ClampMode::LeaveValue)
            .unwrap_err()
            .is_range());
        // Index 0 would have been clamped, but index 1 is inverted
        assert_eq!(value.get::<u16>(0).unwrap(), 100);
    }

    #[test]
    fn test_clamp_array_reports_last_change() {
        let min = ContentValue::from_array(vec![0u16, 0]);
        let max = ContentValue::from_array(vec![5u16, 5]);
        let mut value = ContentValue::from_array(vec![100u16, 3]);
        let change = clamp_to_range(&min, &max, &mut value, ClampMode::LeaveValue).unwrap();
        assert_eq!(change, ChangeKind::NoChange);
        assert_eq!(value.get::<u16>(0).unwrap(), 5);

        let mut single = ContentValue::from_array(vec![3u16, 100]);
        let change = clamp_element(&min, &max, &mut single, ClampMode::LeaveValue, 1).unwrap();
        assert_eq!(change, ChangeKind::Max);
        assert_eq!(single.get::<u16>(0).unwrap(), 3);
    }

    #[test]
    fn test_clamp_64_bit_copies_exact_bound() {
        let min = ContentValue::from_scalar(0u64);
        let max = ContentValue::from_scalar(u64::MAX - 1);
        let mut value = ContentValue::from_scalar(u64::MAX);
        // f64 can't tell MAX and MAX-1 apart, so the value is considered in range
        let change = clamp_to_range(&min, &max, &mut value, ClampMode::LeaveValue).unwrap();
        assert_eq!(change, ChangeKind::NoChange);

        let min = ContentValue::from_scalar(i64::MIN + 1);
        let max = ContentValue::from_scalar(-9_007_199_254_740_993i64);
        let mut value = ContentValue::from_scalar(0i64);
        let change = clamp_to_range(&min, &max, &mut value, ClampMode::LeaveValue).unwrap();
        assert_eq!(change, ChangeKind::Max);
        assert_eq!(value.get::<i64>(0).unwrap(), -9_007_199_254_740_993);
    }

    #[test]
    fn test_check_range() {
        let min = f64_content(-1.0);
        let max = f64_content(1.0);
        assert!(check_range(&min, &max, &f64_content(0.5)).unwrap());
        assert!(!check_range(&min, &max, &f64_content(1.5)).unwrap());
        assert!(check_range(&max, &min, &f64_content(0.0)).unwrap_err().is_range());
    }
}
