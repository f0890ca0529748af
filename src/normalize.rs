//! Coercion of raw save-game attribute values into canonical typed values.
//!
//! Two parses of the same save can disagree on representation (`"true"` vs
//! `true`, `"12.0"` vs `12`). Everything that crosses from raw records into
//! the analysis layer goes through these functions so that comparisons only
//! ever see canonical values.

use serde_json::{Map, Value};

pub type RawRecord = Map<String, Value>;

/// Empty, null and unparsable values become `0.0`, never NaN.
pub fn normalize_numeric_value(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(text) => parse_float_prefix(text).unwrap_or(0.0),
        _ => 0.0,
    }
}

pub fn normalize_boolean_value(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        ),
        Value::Number(number) => number.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn normalize_string_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.trim().to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                int.to_string()
            } else if let Some(uint) = number.as_u64() {
                uint.to_string()
            } else {
                number.as_f64().map(|v| v.to_string()).unwrap_or_default()
            }
        }
        other => other.to_string().trim().to_string(),
    }
}

/// Parses the longest leading decimal literal, so `"12.5kg"` reads as `12.5`.
fn parse_float_prefix(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut seen_exp = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot && !seen_exp => seen_dot = true,
            b'e' | b'E' if seen_digit && !seen_exp => {
                let next = bytes.get(end + 1).copied();
                let after_sign = match next {
                    Some(b'+') | Some(b'-') => bytes.get(end + 2).copied(),
                    other => other,
                };
                if !matches!(after_sign, Some(b'0'..=b'9')) {
                    break;
                }
                seen_exp = true;
                if matches!(next, Some(b'+') | Some(b'-')) {
                    end += 1;
                }
            }
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return None;
    }
    trimmed[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Field access over a flattened attribute map with explicit fallback keys.
///
/// Each accessor takes the keys in priority order; the first key that is
/// present (and not null) wins, otherwise the documented default applies.
pub trait FieldLookup {
    fn field(&self, keys: &[&str]) -> Option<&Value>;

    fn number(&self, keys: &[&str]) -> f64 {
        self.field(keys).map(normalize_numeric_value).unwrap_or(0.0)
    }

    fn number_or(&self, keys: &[&str], default: f64) -> f64 {
        self.field(keys).map(normalize_numeric_value).unwrap_or(default)
    }

    fn optional_number(&self, keys: &[&str]) -> Option<f64> {
        self.field(keys).map(normalize_numeric_value)
    }

    fn flag(&self, keys: &[&str]) -> bool {
        self.field(keys).map(normalize_boolean_value).unwrap_or(false)
    }

    fn text(&self, keys: &[&str]) -> String {
        self.field(keys).map(normalize_string_value).unwrap_or_default()
    }

    fn object(&self, keys: &[&str]) -> Option<&RawRecord> {
        self.field(keys).and_then(Value::as_object)
    }
}

impl FieldLookup for RawRecord {
    fn field(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|key| self.get(*key))
            .find(|value| !value.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_defaults_to_zero() {
        assert_eq!(normalize_numeric_value(&Value::Null), 0.0);
        assert_eq!(normalize_numeric_value(&json!("")), 0.0);
        assert_eq!(normalize_numeric_value(&json!("   ")), 0.0);
        assert_eq!(normalize_numeric_value(&json!("abc")), 0.0);
        assert_eq!(normalize_numeric_value(&json!(true)), 0.0);
        assert_eq!(normalize_numeric_value(&json!({"a": 1})), 0.0);
    }

    #[test]
    fn numeric_parses_leading_literal() {
        assert_eq!(normalize_numeric_value(&json!("42")), 42.0);
        assert_eq!(normalize_numeric_value(&json!(" 12.5kg")), 12.5);
        assert_eq!(normalize_numeric_value(&json!("-3.25")), -3.25);
        assert_eq!(normalize_numeric_value(&json!(".5")), 0.5);
        assert_eq!(normalize_numeric_value(&json!("1e3")), 1000.0);
        assert_eq!(normalize_numeric_value(&json!("7e")), 7.0);
        assert_eq!(normalize_numeric_value(&json!(17)), 17.0);
    }

    #[test]
    fn boolean_accepts_common_spellings() {
        assert!(normalize_boolean_value(&json!(true)));
        assert!(normalize_boolean_value(&json!(" TRUE ")));
        assert!(normalize_boolean_value(&json!("1")));
        assert!(normalize_boolean_value(&json!("Yes")));
        assert!(!normalize_boolean_value(&json!("false")));
        assert!(!normalize_boolean_value(&json!("0")));
        assert!(!normalize_boolean_value(&json!("on")));
        assert!(!normalize_boolean_value(&json!("")));
        assert!(normalize_boolean_value(&json!(2)));
        assert!(!normalize_boolean_value(&json!(0)));
        assert!(!normalize_boolean_value(&Value::Null));
        assert!(normalize_boolean_value(&json!([])));
    }

    #[test]
    fn string_is_trimmed_and_stringified() {
        assert_eq!(normalize_string_value(&Value::Null), "");
        assert_eq!(normalize_string_value(&json!("  Bessie ")), "Bessie");
        assert_eq!(normalize_string_value(&json!(12)), "12");
        assert_eq!(normalize_string_value(&json!(1.5)), "1.5");
        assert_eq!(normalize_string_value(&json!(false)), "false");
    }

    #[test]
    fn lookup_uses_first_present_key() {
        let record: RawRecord = json!({"uniqueId": null, "id": "A-7", "age": "24"})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(record.text(&["uniqueId", "id"]), "A-7");
        assert_eq!(record.number(&["age"]), 24.0);
        assert_eq!(record.number_or(&["weight"], 5.0), 5.0);
        assert!(!record.flag(&["isPregnant"]));
    }
}
