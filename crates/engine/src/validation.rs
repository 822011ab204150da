//! Declarative input validation.
//!
//! Each entity declares a schema as plain data: a slice of [`FieldRule`]s.
//! [`validate`] walks the whole schema once and collects *every* violation
//! instead of stopping at the first one, then entity code may append its own
//! cross-field checks to the same [`Report`] before turning it into a typed
//! record with [`Report::finish`].

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Number, Value};

use crate::{EngineError, MoneyCents, ResultEngine, Violations};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefaultValue {
    Str(&'static str),
    Int(i64),
}

impl DefaultValue {
    fn to_value(self) -> Value {
        match self {
            Self::Str(s) => Value::from(s),
            Self::Int(i) => Value::from(i),
        }
    }
}

/// Rules for a single input field.
#[derive(Clone, Copy, Debug)]
pub struct FieldRule {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub allowed: Option<&'static [&'static str]>,
    pub default: Option<DefaultValue>,
}

impl FieldRule {
    pub const fn string(name: &'static str) -> Self {
        Self {
            name,
            field_type: FieldType::String,
            required: false,
            min_length: None,
            max_length: None,
            allowed: None,
            default: None,
        }
    }

    pub const fn number(name: &'static str) -> Self {
        Self {
            field_type: FieldType::Number,
            ..Self::string(name)
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn length(mut self, min: usize, max: usize) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    pub const fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub const fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }

    pub const fn default_str(mut self, value: &'static str) -> Self {
        self.default = Some(DefaultValue::Str(value));
        self
    }

    pub const fn default_int(mut self, value: i64) -> Self {
        self.default = Some(DefaultValue::Int(value));
        self
    }
}

/// Outcome of a validation pass: the normalized record (schema fields only,
/// defaults applied) and the violations found so far.
#[derive(Debug, Default)]
pub struct Report {
    record: Map<String, Value>,
    violations: Vec<String>,
}

impl Report {
    pub fn violate(&mut self, message: impl Into<String>) {
        self.violations.push(message.into());
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// String value of a field, `None` when absent or not a string.
    pub fn str(&self, field: &str) -> Option<&str> {
        self.record.get(field).and_then(Value::as_str)
    }

    /// Like [`Report::str`], but empty strings count as absent.
    pub fn non_empty_str(&self, field: &str) -> Option<&str> {
        self.str(field).filter(|s| !s.is_empty())
    }

    pub fn number(&self, field: &str) -> Option<&Number> {
        self.record.get(field).and_then(Value::as_number)
    }

    /// Reads a numeric field as money.
    ///
    /// On success the field is rewritten as canonical decimal text so that
    /// [`Report::finish`] deserializes it without going through floats. An
    /// amount with more than two fraction digits, or beyond
    /// [`MoneyCents::MAX`], becomes a violation.
    pub fn money(&mut self, field: &str) -> Option<MoneyCents> {
        let number = self.number(field)?.clone();
        let too_large = number
            .as_f64()
            .is_some_and(|v| v.abs() > MoneyCents::MAX.as_major_f64());
        match MoneyCents::try_from(&number) {
            Ok(amount) if amount.in_input_range() && !too_large => {
                self.set(field, amount.to_string());
                Some(amount)
            }
            Ok(_) => {
                self.out_of_range(field);
                None
            }
            Err(_) if too_large => {
                self.out_of_range(field);
                None
            }
            Err(_) => {
                self.violate(format!(
                    "{field} must be a decimal with at most 2 decimal places"
                ));
                self.remove(field);
                None
            }
        }
    }

    fn out_of_range(&mut self, field: &str) {
        self.violate(format!(
            "{field} must be between -{max} and {max}",
            max = MoneyCents::MAX
        ));
        self.remove(field);
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.record.insert(field.to_string(), value.into());
    }

    pub fn remove(&mut self, field: &str) {
        self.record.remove(field);
    }

    /// Fails with every collected violation, or deserializes the record.
    pub fn finish<T: DeserializeOwned>(self) -> ResultEngine<T> {
        if !self.violations.is_empty() {
            return Err(EngineError::Validation(Violations(self.violations)));
        }
        serde_json::from_value(Value::Object(self.record))
            .map_err(|err| EngineError::invalid(err.to_string()))
    }
}

/// Converts any serializable input into the raw record shape the schemas
/// expect.
pub fn to_raw<T: Serialize + ?Sized>(data: &T) -> ResultEngine<Value> {
    serde_json::to_value(data).map_err(|err| EngineError::invalid(err.to_string()))
}

/// Validates `raw` against `schema` in a single pass.
///
/// - a required field that is missing, `null` or `""` is a violation, and
///   no further rule is checked for it
/// - optional fields that are missing or `null` are skipped, then defaulted
///   when the rule declares a default
/// - type, length and allowed-value rules each add their own violation
pub fn validate(raw: &Value, schema: &[FieldRule]) -> Report {
    let mut report = Report::default();
    let Some(input) = raw.as_object() else {
        report.violate("record must be an object");
        return report;
    };

    for rule in schema {
        let name = rule.name;
        let value = input.get(name).filter(|v| !v.is_null());

        let Some(value) = value else {
            if rule.required {
                report.violate(format!("{name} is required"));
            } else if let Some(default) = rule.default {
                report.set(name, default.to_value());
            }
            continue;
        };

        if rule.required && value.as_str() == Some("") {
            report.violate(format!("{name} is required"));
            continue;
        }

        match rule.field_type {
            FieldType::String => {
                let Some(text) = value.as_str() else {
                    report.violate(format!("{name} must be a string"));
                    continue;
                };
                let len = text.chars().count();
                if let Some(min) = rule.min_length
                    && len < min
                {
                    report.violate(format!("{name} must be at least {min} characters"));
                }
                if let Some(max) = rule.max_length
                    && len > max
                {
                    report.violate(format!("{name} must be at most {max} characters"));
                }
                if let Some(allowed) = rule.allowed
                    && !allowed.contains(&text)
                {
                    report.violate(format!("{name} must be one of: {}", allowed.join(", ")));
                }
            }
            FieldType::Number => {
                if !value.is_number() {
                    report.violate(format!("{name} must be a number"));
                    continue;
                }
            }
        }

        report.set(name, value.clone());
    }

    report
}
