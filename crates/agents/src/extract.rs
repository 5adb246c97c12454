//! Defensive field extraction from upstream agent output.
//!
//! Agents receive whatever the previous node produced. Rather than indexing
//! blindly, they ask for a value under any of several known field names and
//! fall back to a default. Lookups check the top level first, then one level
//! down inside the usual envelope keys (`output`, `result`, `results`, `data`).

use serde_json::Value;

const ENVELOPES: &[&str] = &["output", "result", "results", "data"];

/// First non-null value found under any of `keys`.
pub fn pick<'a>(input: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let direct = |obj: &'a Value| keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()));

    direct(input).or_else(|| {
        ENVELOPES
            .iter()
            .filter_map(|env| input.get(*env))
            .filter(|inner| inner.is_object())
            .find_map(direct)
    })
}

/// String under any of `keys`, else `default`. Numbers and booleans are stringified.
pub fn pick_str(input: &Value, keys: &[&str], default: &str) -> String {
    match pick(input, keys) {
        Some(Value::String(s)) => s.clone(),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
        _ => default.to_owned(),
    }
}

/// Number under any of `keys` (numeric strings accepted), else `default`.
pub fn pick_f64(input: &Value, keys: &[&str], default: f64) -> f64 {
    match pick(input, keys) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

/// Array under any of `keys`, else an empty slice.
pub fn pick_array<'a>(input: &'a Value, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .filter_map(|k| pick(input, &[*k]))
        .find_map(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_matching_key_wins() {
        let input = json!({ "title": "b", "summary": "a" });
        assert_eq!(pick_str(&input, &["summary", "title"], "-"), "a");
    }

    #[test]
    fn nulls_are_skipped() {
        let input = json!({ "summary": null, "title": "t" });
        assert_eq!(pick_str(&input, &["summary", "title"], "-"), "t");
    }

    #[test]
    fn envelope_is_searched_after_top_level() {
        let input = json!({ "output": { "count": 3 } });
        assert_eq!(pick_f64(&input, &["count", "total"], 0.0), 3.0);
    }

    #[test]
    fn defaults_apply_for_odd_shapes() {
        assert_eq!(pick_str(&json!("plain text"), &["message"], "none"), "none");
        assert_eq!(pick_f64(&json!({ "count": "many" }), &["count"], 1.0), 1.0);
        assert!(pick_array(&json!({ "deals": 5 }), &["deals"]).is_empty());
        assert!(pick_array(&Value::Null, &["deals"]).is_empty());
    }

    #[test]
    fn numeric_strings_and_numbers_convert() {
        let input = json!({ "amount": "1500.5", "id": 42 });
        assert_eq!(pick_f64(&input, &["amount"], 0.0), 1500.5);
        assert_eq!(pick_str(&input, &["id"], ""), "42");
    }

    #[test]
    fn array_skips_non_array_candidates() {
        let input = json!({ "items": "n/a", "records": [1, 2] });
        assert_eq!(pick_array(&input, &["items", "records"]).len(), 2);
    }
}
