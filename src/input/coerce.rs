//! Coercion of text parameters toward declared types.
//!
//! Query-string and path parameters arrive as text. Each one is converted
//! to the type its input declares; text that does not convert stays a
//! string so the validator reports a type error for it.

use std::collections::BTreeMap;

use crate::input::value::{ParamMap, ParamValue};
use crate::manifest::{ActionDefinition, InputType};

/// Coerce `(name, value)` text pairs using `action`'s input declarations.
///
/// Repeated keys, and keys written as `name[]`, collect into an array when
/// the input is declared `array`; otherwise the first value wins.
/// Undeclared parameters are kept as strings.
pub fn coerce_text_params<K, V>(action: &ActionDefinition, pairs: &[(K, V)]) -> ParamMap
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (key, value) in pairs {
        let key = key.as_ref();
        let name = key.strip_suffix("[]").unwrap_or(key);
        grouped.entry(name).or_default().push(value.as_ref());
    }

    grouped
        .into_iter()
        .map(|(name, values)| {
            let value = match action.input(name).map(|input| input.kind) {
                Some(InputType::Array) => ParamValue::Array(
                    values.iter().map(|v| ParamValue::from(*v)).collect(),
                ),
                Some(kind) => coerce_text(values[0], kind),
                None => ParamValue::from(values[0]),
            };
            (name.to_string(), value)
        })
        .collect()
}

/// Convert one text value to `kind`, falling back to a string.
pub fn coerce_text(text: &str, kind: InputType) -> ParamValue {
    let trimmed = text.trim();
    let coerced = match kind {
        InputType::Integer => trimmed.parse::<i64>().ok().map(ParamValue::Integer),
        InputType::Number => trimmed
            .parse::<i64>()
            .map(ParamValue::Integer)
            .ok()
            .or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(ParamValue::Number)
            }),
        InputType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(ParamValue::Boolean(true)),
            "false" | "0" => Some(ParamValue::Boolean(false)),
            _ => None,
        },
        InputType::Object => serde_json::from_str::<serde_json::Value>(trimmed)
            .ok()
            .filter(serde_json::Value::is_object)
            .map(ParamValue::from),
        InputType::Array => Some(ParamValue::Array(vec![ParamValue::from(text)])),
        InputType::String => None,
    };
    coerced.unwrap_or_else(|| ParamValue::from(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_action() -> ActionDefinition {
        serde_json::from_value(serde_json::json!({
            "id": "apply_filters",
            "method": "GET",
            "endpoint": "/products/filter",
            "inputs": [
                {"name": "category", "type": "array"},
                {"name": "price_min", "type": "number"},
                {"name": "rating", "type": "integer"},
                {"name": "in_stock", "type": "boolean"},
                {"name": "extra", "type": "object"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_coerces_declared_types() {
        let pairs = [
            ("price_min", "9.5"),
            ("rating", "4"),
            ("in_stock", "TRUE"),
            ("extra", r#"{"a": 1}"#),
        ];
        let params = coerce_text_params(&filter_action(), &pairs);

        assert_eq!(params["price_min"], ParamValue::Number(9.5));
        assert_eq!(params["rating"], ParamValue::Integer(4));
        assert_eq!(params["in_stock"], ParamValue::Boolean(true));
        assert!(matches!(params["extra"], ParamValue::Object(_)));
    }

    #[test]
    fn test_repeated_keys_collect_into_array() {
        let pairs = [("category[]", "home"), ("category[]", "sports")];
        let params = coerce_text_params(&filter_action(), &pairs);
        assert_eq!(
            params["category"],
            ParamValue::Array(vec!["home".into(), "sports".into()])
        );
    }

    #[test]
    fn test_unconvertible_text_stays_string() {
        let pairs = [("rating", "five"), ("unknown", "x"), ("unknown", "y")];
        let params = coerce_text_params(&filter_action(), &pairs);
        assert_eq!(params["rating"], ParamValue::String("five".into()));
        assert_eq!(params["unknown"], ParamValue::String("x".into()));
    }

    #[test]
    fn test_number_keeps_integers_integral() {
        assert_eq!(coerce_text("3", InputType::Number), ParamValue::Integer(3));
        assert_eq!(
            coerce_text("NaN", InputType::Number),
            ParamValue::String("NaN".into())
        );
    }
}
