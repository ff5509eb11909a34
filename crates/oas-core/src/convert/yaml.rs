//! Byte-level JSON ⇄ YAML conversion, independent of the document types.

use serde_json::{Map, Number, Value};
use serde_yaml_ng::Value as YamlValue;

use crate::error::FormatError;

/// Convert JSON bytes to YAML. Key order and number types are kept.
pub fn json_to_yaml(data: &[u8]) -> Result<Vec<u8>, FormatError> {
    let value: Value = serde_json::from_slice(data)?;
    Ok(serde_yaml_ng::to_string(&value)?.into_bytes())
}

/// Convert YAML (or JSON) bytes to compact JSON.
pub fn yaml_to_json(data: &[u8]) -> Result<Vec<u8>, FormatError> {
    let value = yaml_slice_to_value(data)?;
    Ok(serde_json::to_vec(&value)?)
}

/// Convert YAML (or JSON) bytes to indented JSON.
pub fn yaml_to_json_indent(data: &[u8]) -> Result<Vec<u8>, FormatError> {
    let value = yaml_slice_to_value(data)?;
    Ok(serde_json::to_vec_pretty(&value)?)
}

/// Parse YAML bytes into a JSON value, coercing mapping keys to strings.
pub fn yaml_slice_to_value(data: &[u8]) -> Result<Value, FormatError> {
    let yaml: YamlValue = serde_yaml_ng::from_slice(data)?;
    yaml_to_json_value(yaml)
}

/// Convert a YAML value into a JSON value.
///
/// Mapping keys are coerced to text: integers in decimal, floats as the
/// shortest form that round-trips at 32-bit precision (`.inf`, `-.inf` and
/// `.nan` for the special values), booleans as `true`/`false` and null as
/// `null`. Tags are dropped.
pub fn yaml_to_json_value(value: YamlValue) -> Result<Value, FormatError> {
    let json = match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => Value::Number(json_number(&n)?),
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json_value)
                .collect::<Result<_, _>>()?,
        ),
        YamlValue::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                map.insert(key_to_string(key)?, yaml_to_json_value(value)?);
            }
            Value::Object(map)
        }
        YamlValue::Tagged(tagged) => yaml_to_json_value(tagged.value)?,
    };
    Ok(json)
}

fn json_number(n: &serde_yaml_ng::Number) -> Result<Number, FormatError> {
    if let Some(i) = n.as_i64() {
        return Ok(Number::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Ok(Number::from(u));
    }
    let f = n.as_f64().unwrap_or(f64::NAN);
    Number::from_f64(f).ok_or(FormatError::NonFiniteNumber(f))
}

fn key_to_string(key: YamlValue) -> Result<String, FormatError> {
    match key {
        YamlValue::String(s) => Ok(s),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Null => Ok("null".to_string()),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Ok(u.to_string())
            } else {
                Ok(format_float_key(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        YamlValue::Tagged(tagged) => key_to_string(tagged.value),
        other @ (YamlValue::Sequence(_) | YamlValue::Mapping(_)) => {
            let text = serde_yaml_ng::to_string(&other).unwrap_or_default();
            Err(FormatError::UnsupportedKey(text.trim_end().to_string()))
        }
    }
}

/// Shortest `%g`-style text for a float at 32-bit precision: exponent form
/// below 1e-4 and from 1e6 up, with at least two exponent digits.
pub fn format_float_key(f: f64) -> String {
    let single = f as f32;
    if single.is_nan() {
        return ".nan".to_string();
    }
    if single.is_infinite() {
        return if single > 0.0 { ".inf" } else { "-.inf" }.to_string();
    }
    if single == 0.0 {
        return if single.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let sci = format!("{:e}", single);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let body = if !(-4..6).contains(&exp) {
        let (first, rest) = digits.split_at(1);
        let fraction = if rest.is_empty() {
            String::new()
        } else {
            format!(".{}", rest)
        };
        let exp_sign = if exp < 0 { '-' } else { '+' };
        format!("{}{}e{}{:02}", first, fraction, exp_sign, exp.abs())
    } else if exp < 0 {
        format!("0.{}{}", "0".repeat((-exp - 1) as usize), digits)
    } else {
        let int_len = exp as usize + 1;
        if digits.len() <= int_len {
            format!("{}{}", digits, "0".repeat(int_len - digits.len()))
        } else {
            let (int_part, frac_part) = digits.split_at(int_len);
            format!("{}.{}", int_part, frac_part)
        }
    };
    format!("{}{}", sign, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_key_formatting() {
        assert_eq!(format_float_key(0.1), "0.1");
        assert_eq!(format_float_key(1.5), "1.5");
        assert_eq!(format_float_key(100.0), "100");
        assert_eq!(format_float_key(123456.0), "123456");
        assert_eq!(format_float_key(1e6), "1e+06");
        assert_eq!(format_float_key(1234567.0), "1.234567e+06");
        assert_eq!(format_float_key(0.0001), "0.0001");
        assert_eq!(format_float_key(0.00001), "1e-05");
        assert_eq!(format_float_key(-2.5), "-2.5");
        assert_eq!(format_float_key(0.0), "0");
    }

    #[test]
    fn test_special_float_keys() {
        assert_eq!(format_float_key(f64::INFINITY), ".inf");
        assert_eq!(format_float_key(f64::NEG_INFINITY), "-.inf");
        assert_eq!(format_float_key(f64::NAN), ".nan");
    }

    #[test]
    fn test_non_string_keys_are_coerced() {
        let json = yaml_to_json(b"1: a\n.1: b\ntrue: c\n~: d\n.inf: e\n").unwrap();
        assert_eq!(
            String::from_utf8(json).unwrap(),
            r#"{"1":"a","0.1":"b","true":"c","null":"d",".inf":"e"}"#
        );
    }

    #[test]
    fn test_non_finite_value_is_rejected() {
        let err = yaml_to_json(b"a: .nan\n").unwrap_err();
        assert!(matches!(err, FormatError::NonFiniteNumber(_)));
    }

    #[test]
    fn test_sequence_key_is_rejected() {
        let err = yaml_to_json(b"? [a, b]\n: c\n").unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedKey(_)));
    }

    #[test]
    fn test_tags_are_unwrapped() {
        let json = yaml_to_json(b"a: !custom x\n").unwrap();
        assert_eq!(json, br#"{"a":"x"}"#);
    }

    #[test]
    fn test_json_to_yaml_keeps_key_order() {
        let yaml = json_to_yaml(br#"{"z": 1, "a": [true, null], "m": "x"}"#).unwrap();
        assert_eq!(String::from_utf8(yaml).unwrap(), "z: 1\na:\n- true\n- null\nm: x\n");
    }
}
