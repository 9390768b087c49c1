//! Tolerant decoding of loosely-typed parameter bags.
//!
//! # Responsibility
//! - Probe an ordered list of accepted key spellings per logical field and
//!   take the first present value.
//! - Coerce loosely-typed JSON (`"10"`, `"yes"`, `1`) into strict values.
//! - Report failures as `ActionError::Validation` naming the field and the
//!   keys it accepts.
//!
//! # Invariants
//! - Absent optional fields are never decode failures.
//! - Clearable fields distinguish absent (`None`) from explicit null or
//!   empty string (`Some(None)`).

use super::error::{ActionError, ActionOutcome};
use crate::model::EntityId;
use crate::temporal::TemporalParser;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One logical request field and the key spellings it accepts, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub keys: &'static [&'static str],
}

impl Field {
    pub const fn new(name: &'static str, keys: &'static [&'static str]) -> Self {
        Self { name, keys }
    }

    /// `title (accepted keys: title, name)`
    pub fn describe(&self) -> String {
        format!("`{}` (accepted keys: {})", self.name, self.keys.join(", "))
    }
}

/// Decoded parameter bag for one request (or one bulk element).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    map: Map<String, Value>,
}

impl Params {
    /// Accepts an object, or `null` as an empty bag.
    pub fn from_value(value: Value) -> ActionOutcome<Self> {
        match value {
            Value::Object(map) => Ok(Self { map }),
            Value::Null => Ok(Self::default()),
            other => Err(ActionError::validation(format!(
                "parameters must be an object, got {}",
                json_type(&other)
            ))),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self { map }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the first present key and its value.
    pub fn raw(&self, field: &Field) -> Option<(&'static str, &Value)> {
        field
            .keys
            .iter()
            .find_map(|key| self.map.get(*key).map(|value| (*key, value)))
    }

    pub fn contains(&self, field: &Field) -> bool {
        self.raw(field).is_some()
    }

    /// Returns the value only when present and not null.
    fn present(&self, field: &Field) -> Option<(&'static str, &Value)> {
        self.raw(field).filter(|(_, value)| !value.is_null())
    }

    pub fn string(&self, field: &Field) -> ActionOutcome<Option<String>> {
        let Some((key, value)) = self.present(field) else {
            return Ok(None);
        };
        match value {
            Value::String(text) => Ok(Some(text.trim().to_string())),
            Value::Number(number) => Ok(Some(number.to_string())),
            Value::Bool(flag) => Ok(Some(flag.to_string())),
            other => Err(type_error(field, key, "a string", other)),
        }
    }

    /// Required, non-empty string.
    pub fn required_string(&self, field: &Field) -> ActionOutcome<String> {
        match self.string(field)? {
            Some(text) if !text.is_empty() => Ok(text),
            Some(_) => Err(ActionError::validation(format!(
                "field `{}` must not be empty",
                field.name
            ))),
            None => Err(missing(field)),
        }
    }

    /// Absent -> `None`; null/empty -> `Some(None)`; text -> `Some(Some(text))`.
    pub fn clearable_string(&self, field: &Field) -> ActionOutcome<Option<Option<String>>> {
        if !self.contains(field) {
            return Ok(None);
        }
        Ok(Some(self.string(field)?.filter(|text| !text.is_empty())))
    }

    pub fn bool(&self, field: &Field) -> ActionOutcome<Option<bool>> {
        let Some((key, value)) = self.present(field) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Bool(flag) => Some(*flag),
            Value::Number(number) => match number.as_f64() {
                Some(n) if n == 0.0 => Some(false),
                Some(n) if n == 1.0 => Some(true),
                _ => None,
            },
            Value::String(text) => parse_bool_text(text),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| type_error(field, key, "a boolean", value))
    }

    /// Boolean flag that defaults to `false` when absent.
    pub fn flag(&self, field: &Field) -> ActionOutcome<bool> {
        Ok(self.bool(field)?.unwrap_or(false))
    }

    pub fn number(&self, field: &Field) -> ActionOutcome<Option<f64>> {
        let Some((key, value)) = self.present(field) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(number) if number.is_finite() => Ok(Some(number)),
            _ => Err(type_error(field, key, "a number", value)),
        }
    }

    pub fn integer(&self, field: &Field) -> ActionOutcome<Option<i64>> {
        let Some((key, value)) = self.present(field) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().filter(|n| n.fract() == 0.0).map(|n| n as i64)),
            Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| type_error(field, key, "an integer", value))
    }

    /// Epoch milliseconds from an integer, or free text via `parser`.
    pub fn timestamp(
        &self,
        field: &Field,
        parser: &dyn TemporalParser,
        now: DateTime<Utc>,
    ) -> ActionOutcome<Option<i64>> {
        let Some((key, value)) = self.present(field) else {
            return Ok(None);
        };
        match value {
            Value::Number(number) => {
                let epoch_ms = number
                    .as_i64()
                    .ok_or_else(|| type_error(field, key, "epoch milliseconds", value))?;
                if Utc.timestamp_millis_opt(epoch_ms).single().is_none() {
                    return Err(ActionError::validation(format!(
                        "field `{}` is out of range: {epoch_ms} epoch milliseconds",
                        field.name
                    )));
                }
                Ok(Some(epoch_ms))
            }
            Value::String(text) if text.trim().is_empty() => Ok(None),
            Value::String(text) => parser
                .parse(text, now)
                .map(|at| Some(at.timestamp_millis()))
                .ok_or_else(|| {
                    ActionError::validation(format!(
                        "field `{}` has unrecognized date/time `{}`",
                        field.name,
                        text.trim()
                    ))
                }),
            other => Err(type_error(field, key, "a date/time", other)),
        }
    }

    pub fn clearable_timestamp(
        &self,
        field: &Field,
        parser: &dyn TemporalParser,
        now: DateTime<Utc>,
    ) -> ActionOutcome<Option<Option<i64>>> {
        if !self.contains(field) {
            return Ok(None);
        }
        Ok(Some(self.timestamp(field, parser, now)?))
    }

    pub fn date(
        &self,
        field: &Field,
        parser: &dyn TemporalParser,
        now: DateTime<Utc>,
    ) -> ActionOutcome<Option<NaiveDate>> {
        let Some((key, value)) = self.present(field) else {
            return Ok(None);
        };
        match value {
            Value::String(text) if text.trim().is_empty() => Ok(None),
            Value::String(text) => parser.parse_date(text, now).map(Some).ok_or_else(|| {
                ActionError::validation(format!(
                    "field `{}` has unrecognized date `{}`",
                    field.name,
                    text.trim()
                ))
            }),
            Value::Number(_) => Ok(self
                .timestamp(field, parser, now)?
                .and_then(DateTime::from_timestamp_millis)
                .map(|at| at.date_naive())),
            other => Err(type_error(field, key, "a date", other)),
        }
    }

    pub fn clearable_date(
        &self,
        field: &Field,
        parser: &dyn TemporalParser,
        now: DateTime<Utc>,
    ) -> ActionOutcome<Option<Option<NaiveDate>>> {
        if !self.contains(field) {
            return Ok(None);
        }
        Ok(Some(self.date(field, parser, now)?))
    }

    /// Parses a closed vocabulary value with `parse`; failures list `supported`.
    pub fn choice<T>(
        &self,
        field: &Field,
        parse: impl Fn(&str) -> Option<T>,
        supported: &[&str],
    ) -> ActionOutcome<Option<T>> {
        let Some(text) = self.string(field)? else {
            return Ok(None);
        };
        if text.is_empty() {
            return Ok(None);
        }
        parse(&text).map(Some).ok_or_else(|| {
            ActionError::validation(format!(
                "field `{}` has invalid value `{text}`; expected one of: {}",
                field.name,
                supported.join(", ")
            ))
        })
    }

    /// A list of strings, given as an array or a comma-separated string.
    pub fn string_list(&self, field: &Field) -> ActionOutcome<Option<Vec<String>>> {
        let Some((key, value)) = self.present(field) else {
            return Ok(None);
        };
        let items = match value {
            Value::Array(values) => values
                .iter()
                .map(|item| match item {
                    Value::String(text) => Ok(text.trim().to_string()),
                    Value::Number(number) => Ok(number.to_string()),
                    other => Err(type_error(field, key, "a list of strings", other)),
                })
                .collect::<ActionOutcome<Vec<_>>>()?,
            Value::String(text) => text.split(',').map(|item| item.trim().to_string()).collect(),
            other => return Err(type_error(field, key, "a list of strings", other)),
        };
        Ok(Some(
            items.into_iter().filter(|item| !item.is_empty()).collect(),
        ))
    }

    /// Required identifier; missing keys and malformed values are validation errors.
    pub fn id(&self, field: &Field) -> ActionOutcome<EntityId> {
        match self.string(field)? {
            Some(text) if !text.is_empty() => parse_entity_id(&text),
            _ => Err(missing(field)),
        }
    }

    /// Raw JSON array under `field`, if present.
    pub fn array(&self, field: &Field) -> Option<&Vec<Value>> {
        self.present(field).and_then(|(_, value)| value.as_array())
    }

    /// Identifier value given as an array under an id key (`"id": [..]`).
    pub fn id_list(&self, field: &Field) -> ActionOutcome<Option<Vec<String>>> {
        let Some(values) = self.array(field) else {
            return Ok(None);
        };
        values
            .iter()
            .map(|value| match value {
                Value::String(text) => Ok(text.trim().to_string()),
                other => Err(ActionError::validation(format!(
                    "field `{}` must contain identifier strings, got {}",
                    field.name,
                    json_type(other)
                ))),
            })
            .collect::<ActionOutcome<Vec<_>>>()
            .map(Some)
    }
}

/// Parses a UUID identifier, rejecting malformed input as a validation error.
pub fn parse_entity_id(text: &str) -> ActionOutcome<EntityId> {
    Uuid::parse_str(text.trim())
        .map_err(|_| ActionError::validation(format!("malformed identifier `{}`", text.trim())))
}

pub fn missing(field: &Field) -> ActionError {
    ActionError::validation(format!("missing required field {}", field.describe()))
}

fn type_error(field: &Field, key: &str, expected: &str, value: &Value) -> ActionError {
    ActionError::validation(format!(
        "field `{}` (key `{key}`) must be {expected}, got {}",
        field.name,
        json_type(value)
    ))
}

fn parse_bool_text(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" | "done" | "completed" => Some(true),
        "false" | "no" | "n" | "0" | "off" | "pending" => Some(false),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
