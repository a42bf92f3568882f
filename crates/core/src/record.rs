//! Prediction records and the value coercions shared by the rule runtime and
//! the action handlers.

use serde_json::Value;

/// One prediction event: a flat field → scalar map.
pub type PredictionRecord = serde_json::Map<String, Value>;

/// Well-known keys a prediction record may carry for scoping and correlation.
pub mod fields {
    pub const MODEL_ID: &str = "model_id";
    pub const CATEGORY_ID: &str = "category_id";
    pub const ASSET_ID: &str = "asset_id";
    pub const PREDICTION_ID: &str = "prediction_id";
}

/// Numeric view of a value. Numeric strings are accepted so that records
/// decoded from loosely typed sources still compare.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Integer view of a value; floats qualify only when they have no fractional part.
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Text form used by the string operators and message templates.
///
/// Strings are taken verbatim; everything else uses its JSON rendering.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Value equality where `85` and `85.0` are the same number.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

/// Integer scoping key (`model_id`, `category_id`) of a record, if present.
pub fn scope_id(record: &PredictionRecord, key: &str) -> Option<i64> {
    record.get(key).and_then(as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_coercion() {
        assert_eq!(as_f64(&json!(85)), Some(85.0));
        assert_eq!(as_f64(&json!("0.9")), Some(0.9));
        assert_eq!(as_f64(&json!("high")), None);
        assert_eq!(as_f64(&json!(true)), None);
        assert_eq!(as_f64(&json!(null)), None);
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(as_i64(&json!(7)), Some(7));
        assert_eq!(as_i64(&json!(7.0)), Some(7));
        assert_eq!(as_i64(&json!(7.5)), None);
        assert_eq!(as_i64(&json!("12")), Some(12));
    }

    #[test]
    fn equality_ignores_number_representation() {
        assert!(values_equal(&json!(85), &json!(85.0)));
        assert!(!values_equal(&json!(85), &json!("85")));
        assert!(values_equal(&json!("pump"), &json!("pump")));
        assert!(values_equal(&json!(null), &json!(null)));
    }

    #[test]
    fn stringify_keeps_strings_verbatim() {
        assert_eq!(stringify(&json!("pump-7")), "pump-7");
        assert_eq!(stringify(&json!(42)), "42");
        assert_eq!(stringify(&json!(true)), "true");
    }

    #[test]
    fn scope_id_reads_integer_keys() {
        let record = json!({"model_id": 3, "category_id": "5"});
        let record = record.as_object().unwrap();
        assert_eq!(scope_id(record, fields::MODEL_ID), Some(3));
        assert_eq!(scope_id(record, fields::CATEGORY_ID), Some(5));
        assert_eq!(scope_id(record, fields::ASSET_ID), None);
    }
}
