//! Rule limit parsing.
//!
//! The panel ships limits as a JSON string, e.g. `{"speed": 800000, "conn": 5}`.
//! `speed` is divided by 8 and rounded up; `conn` is a plain connection count.
//! The `$` scope applies a limit to the whole service, not per client.

use serde_json::{Map, Value};

/// Limiter directives derived from a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayRuleLimit {
    pub speed_limits: Vec<String>,
    pub conn_limits: Vec<String>,
}

impl RelayRuleLimit {
    pub fn is_empty(&self) -> bool {
        self.speed_limits.is_empty() && self.conn_limits.is_empty()
    }
}

/// Decode the limit string into its JSON object.
fn limit_object(limit: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(limit).map_err(|e| e.to_string())? {
        Value::Object(fields) => Ok(fields),
        other => Err(format!("expected a JSON object, got {}", other)),
    }
}

/// Read one numeric field. Absent and `null` are `None`; any other value
/// `read` rejects is an error.
fn read_field<T>(
    fields: &Map<String, Value>,
    key: &str,
    read: impl Fn(&Value) -> Option<T>,
) -> Result<Option<T>, String> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => read(value)
            .map(Some)
            .ok_or_else(|| format!("unusable {} value {}", key, value)),
    }
}

/// Parse a rule's limit string. Malformed input, or a malformed field, yields
/// no limit for the affected part and is logged.
pub fn parse_limits(limit: &str) -> RelayRuleLimit {
    let mut rule_limit = RelayRuleLimit::default();
    if limit.trim().is_empty() {
        return rule_limit;
    }

    let fields = match limit_object(limit) {
        Ok(fields) => fields,
        Err(reason) => {
            tracing::warn!(limit, %reason, "Ignoring malformed rule limit");
            return rule_limit;
        }
    };

    let speed = read_field(&fields, "speed", Value::as_f64).unwrap_or_else(|reason| {
        tracing::warn!(limit, %reason, "Ignoring rule speed limit");
        None
    });
    let speed = (speed.unwrap_or(0.0) / 8.0).ceil();
    if speed > 0.0 {
        let speed = speed as u64;
        rule_limit.speed_limits = vec![format!("$ {}MB {}MB", speed, speed)];
    }

    let conn = read_field(&fields, "conn", Value::as_u64).unwrap_or_else(|reason| {
        tracing::warn!(limit, %reason, "Ignoring rule connection limit");
        None
    });
    if let Some(conn) = conn.filter(|c| *c > 0) {
        rule_limit.conn_limits = vec![format!("$ {}", conn)];
    }

    rule_limit
}
