//! Loosely-typed view over one run's telemetry payload.
//!
//! Uploaded run logs have no fixed schema: every key is optional and values
//! routinely arrive with the wrong type. `RunRecord` wraps the parsed JSON
//! object and exposes typed accessors that each document their
//! default-if-absent behavior, so the classifier and extractor never have to
//! reach into raw JSON themselves.

use serde_json::{Map, Value};
use thiserror::Error;

/// Raised when a numeric field is present but cannot be read as an integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field `{field}` is not an integer")]
pub struct FieldTypeError {
    pub field: String,
}

/// One run's telemetry payload, backed by the parsed JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord<'a> {
    fields: &'a Map<String, Value>,
}

/// View over a single `event_choices` element.
#[derive(Debug, Clone, Copy)]
pub struct EventChoice<'a> {
    fields: &'a Map<String, Value>,
}

/// Truthiness for loosely-typed JSON values, matching how the upstream
/// telemetry treats flag fields: absent and `null` are falsy, numbers are
/// truthy when non-zero, strings and containers when non-empty.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

impl<'a> RunRecord<'a> {
    /// Wrap a parsed value. Returns `None` for anything that is not a JSON
    /// object; callers map that to the `invalid_input_type` verdict.
    #[must_use]
    pub fn from_value(value: &'a Value) -> Option<Self> {
        value.as_object().map(|fields| Self { fields })
    }

    /// Whether the raw payload carries the given key at all.
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Raw field access for the extractor.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key)
    }

    /// Flag field as a truthy check. Absent keys report `None` so the caller
    /// can apply its missing-key policy.
    #[must_use]
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.fields.get(key).map(is_truthy)
    }

    /// Integer field. Absent keys report `Ok(None)`; a present value that is
    /// not an integral number reports an error so the classifier can surface
    /// it as a check failure instead of guessing. Floats with an integral
    /// value are accepted (telemetry sometimes writes counts as `1.0`).
    ///
    /// # Errors
    ///
    /// Returns [`FieldTypeError`] when the value is present but not readable
    /// as an integer.
    pub fn integer(&self, key: &str) -> Result<Option<i64>, FieldTypeError> {
        let type_error = || FieldTypeError {
            field: key.to_string(),
        };
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Ok(Some(i))
                } else if let Some(f) = n.as_f64() {
                    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                        Ok(Some(f as i64))
                    } else {
                        Err(type_error())
                    }
                } else {
                    Err(type_error())
                }
            }
            Some(_) => Err(type_error()),
        }
    }

    /// String field; non-string values read as absent.
    #[must_use]
    pub fn string(&self, key: &str) -> Option<&'a str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Array field; non-array values read as absent. Callers that need to
    /// distinguish "absent" from "present but not a list" use [`Self::get`].
    #[must_use]
    pub fn array(&self, key: &str) -> Option<&'a Vec<Value>> {
        self.fields.get(key).and_then(Value::as_array)
    }

}

impl<'a> EventChoice<'a> {
    /// Wrap one `event_choices` element; `None` when it is not an object.
    #[must_use]
    pub fn from_value(value: &'a Value) -> Option<Self> {
        value.as_object().map(|fields| Self { fields })
    }

    #[must_use]
    pub fn event_name(&self) -> Option<&'a str> {
        self.fields.get("event_name").and_then(Value::as_str)
    }

    #[must_use]
    pub fn has_event_name(&self) -> bool {
        self.fields.contains_key("event_name")
    }

    #[must_use]
    pub fn player_choice(&self) -> Option<&'a str> {
        self.fields.get("player_choice").and_then(Value::as_str)
    }
}
