use serde_json::Value;

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Extract a numeric story-point estimate from a raw model response.
///
/// Off-format output is expected from a model, so every failure mode
/// (invalid JSON, no `estimate` key, non-numeric value) yields `None`.
/// Values outside the nominal 1-10 range are passed through unchanged.
pub fn extract_estimate(raw: &str) -> Option<f64> {
    let candidate = candidate_json(raw)?;
    let parsed: Value = serde_json::from_str(candidate).ok()?;

    match parsed.as_object()?.get("estimate") {
        Some(value) => coerce_number(value),
        None => None,
    }
}

/// Select the text to parse: the body of the first fenced JSON block if
/// there is one, otherwise the whole response.
fn candidate_json(raw: &str) -> Option<&str> {
    match raw.find(FENCE_OPEN) {
        Some(open) => {
            let body_start = open + FENCE_OPEN.len();
            // An unterminated fence never parses.
            let body_len = raw[body_start..].find(FENCE_CLOSE)?;
            Some(raw[body_start..body_start + body_len].trim())
        }
        None => Some(raw),
    }
}

/// Coerce a JSON value to a finite float
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => return None,
    };

    // Non-finite values cannot be persisted in the JSON summary.
    number.is_finite().then_some(number)
}
