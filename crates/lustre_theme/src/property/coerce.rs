//! Conversion of resolved values into typed properties
//!
//! Numeric strings may carry a unit suffix, which is stripped: `"12px"` reads
//! as `12`, `"200ms"` as `200`, `"1.5em"` as `1.5`.

use lustre_core::PropertyValue;

use crate::error::ValidationError;

/// Unit suffixes stripped from numeric strings, longest first
const UNITS: &[&str] = &["rem", "deg", "px", "pt", "em", "ms", "%", "s"];

/// Types a [`PropertyValue`] can be coerced into
pub trait FromPropertyValue: Sized {
    /// Type name used in error messages
    const EXPECTED: &'static str;

    fn from_property_value(value: &PropertyValue) -> Option<Self>;
}

/// Coerce `value` for `property`, or explain why it cannot be
pub fn coerce<T: FromPropertyValue>(property: &str, value: &PropertyValue) -> Result<T, ValidationError> {
    T::from_property_value(value).ok_or_else(|| ValidationError::Coercion {
        property: property.to_string(),
        value: value.clone(),
        kind: value.kind(),
        expected: T::EXPECTED,
    })
}

/// Strip one recognised unit suffix and surrounding whitespace
pub fn strip_units(text: &str) -> &str {
    let text = text.trim();
    UNITS
        .iter()
        .find_map(|unit| text.strip_suffix(unit))
        .map(str::trim_end)
        .unwrap_or(text)
}

fn parse_number(text: &str) -> Option<f64> {
    strip_units(text).parse::<f64>().ok().filter(|n| n.is_finite())
}

impl FromPropertyValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Int(i) => Some(*i as f64),
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Str(s) => parse_number(s),
            PropertyValue::Bool(_) | PropertyValue::List(_) => None,
        }
    }
}

impl FromPropertyValue for f32 {
    const EXPECTED: &'static str = "float";

    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        f64::from_property_value(value).map(|f| f as f32)
    }
}

impl FromPropertyValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        let whole = |f: f64| (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64);
        match value {
            PropertyValue::Int(i) => Some(*i),
            PropertyValue::Float(f) => whole(*f),
            PropertyValue::Str(s) => {
                let stripped = strip_units(s);
                stripped
                    .parse::<i64>()
                    .ok()
                    .or_else(|| parse_number(stripped).and_then(whole))
            }
            PropertyValue::Bool(_) | PropertyValue::List(_) => None,
        }
    }
}

impl FromPropertyValue for i32 {
    const EXPECTED: &'static str = "integer";

    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        i64::from_property_value(value).and_then(|i| i32::try_from(i).ok())
    }
}

impl FromPropertyValue for u32 {
    const EXPECTED: &'static str = "unsigned integer";

    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        i64::from_property_value(value).and_then(|i| u32::try_from(i).ok())
    }
}

impl FromPropertyValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Bool(b) => Some(*b),
            PropertyValue::Int(0) => Some(false),
            PropertyValue::Int(1) => Some(true),
            PropertyValue::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(true),
                "false" | "no" | "off" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl FromPropertyValue for String {
    const EXPECTED: &'static str = "string";

    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::List(_) => None,
            PropertyValue::Str(s) => Some(s.clone()),
            scalar => Some(scalar.to_string()),
        }
    }
}

impl FromPropertyValue for Vec<PropertyValue> {
    const EXPECTED: &'static str = "list";

    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        value.as_list().map(<[PropertyValue]>::to_vec)
    }
}

impl FromPropertyValue for PropertyValue {
    const EXPECTED: &'static str = "value";

    fn from_property_value(value: &PropertyValue) -> Option<Self> {
        Some(value.clone())
    }
}
