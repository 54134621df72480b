//! Type-driven values for generic columns.

use rand::Rng;
use vehgen_core::schema::ValueType;

/// Width of the rendered coordinate text.
pub const GEO_WIDTH: usize = 8;

/// Width of the rendered decimal text for the DECIMAL family.
pub const DECIMAL_WIDTH: usize = 6;

pub const VARCHAR_PLACEHOLDER: &str = "A";

/// `lower + u * (upper - lower)` with `u` uniform in `[0, 1)`.
///
/// Unlike `random_range`, a degenerate box (`lower == upper`) is fine.
pub fn random_in_range<R: Rng + ?Sized>(lower: f64, upper: f64, rng: &mut R) -> f64 {
    let u: f64 = rng.random();
    u * (upper - lower) + lower
}

/// Cut the shortest round-trip decimal text of `value` to `width` characters.
///
/// No rounding: trailing digits are dropped. Shorter text is kept as is.
pub fn truncate_decimal(value: f64, width: usize) -> String {
    let mut text = value.to_string();
    text.truncate(width);
    text
}

/// Value for a generic column. Unknown types render as an empty string.
pub fn typed_value<R: Rng + ?Sized>(value_type: ValueType, rng: &mut R) -> String {
    match value_type {
        ValueType::Boolean => {
            if rng.random_bool(0.5) {
                "True".to_string()
            } else {
                "False".to_string()
            }
        }
        ValueType::TinyInt => rng.random_range(0..5u32).to_string(),
        ValueType::SmallInt => rng.random_range(0..10_000u32).to_string(),
        ValueType::Int => rng.random_range(0..1_000_000u32).to_string(),
        ValueType::SmallDecimal => scaled_decimal(50.0, rng),
        ValueType::Decimal => scaled_decimal(100.0, rng),
        ValueType::BigDecimal => scaled_decimal(5_000.0, rng),
        ValueType::Varchar => VARCHAR_PLACEHOLDER.to_string(),
        ValueType::Unknown => String::new(),
    }
}

fn scaled_decimal<R: Rng + ?Sized>(scale: f64, rng: &mut R) -> String {
    let u: f64 = rng.random();
    truncate_decimal(u * scale, DECIMAL_WIDTH)
}
