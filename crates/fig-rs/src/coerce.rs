//! String-to-value coercion.
//!
//! Env values, default literals and string values found in config files all
//! reach a field as text. [`Coercer::set_value`] parses that text according
//! to the field's [`Kind`] and stores it.

use crate::DEFAULT_TIME_LAYOUT;
use crate::error::CoerceError;
use crate::node::{Kind, Node, Scalar};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

/// Parses literals into nodes.
#[derive(Debug, Clone, Copy)]
pub struct Coercer<'a> {
    time_layout: &'a str,
}

impl Default for Coercer<'static> {
    fn default() -> Self {
        Self {
            time_layout: DEFAULT_TIME_LAYOUT,
        }
    }
}

impl<'a> Coercer<'a> {
    /// Coercer parsing timestamps with `time_layout` (chrono strftime syntax,
    /// or [`DEFAULT_TIME_LAYOUT`] for RFC 3339).
    pub fn new(time_layout: &'a str) -> Self {
        Self { time_layout }
    }

    pub fn time_layout(&self) -> &str {
        self.time_layout
    }

    /// Parse `literal` and store it in `target`.
    ///
    /// Types declared with [`crate::string_unmarshaler!`] parse themselves
    /// before any kind-based rule applies. Absent optionals are allocated.
    /// Sequences take a comma separated list, with or without enclosing
    /// brackets, and are replaced as a whole.
    pub fn set_value(&self, target: &mut dyn Node, literal: &str) -> Result<(), CoerceError> {
        if let Some(unmarshaler) = target.as_unmarshaler() {
            return unmarshaler.unmarshal_string(literal);
        }

        let kind = target.kind();
        match kind {
            Kind::Optional => {
                let optional = target
                    .as_optional_mut()
                    .ok_or(CoerceError::Unsupported(kind.name()))?;
                let inner = optional.get_or_insert_zeroed()?;
                self.set_value(inner, literal)
            }
            Kind::Sequence => {
                let items = string_slice(literal);
                let sequence = target
                    .as_sequence_mut()
                    .ok_or(CoerceError::Unsupported(kind.name()))?;
                sequence.rebuild(items.len(), &mut |idx, element| {
                    self.set_value(element, items[idx])
                })
            }
            Kind::Bool => target.assign(Scalar::Bool(parse_bool(literal)?)),
            Kind::Int => {
                let value = literal
                    .parse::<i64>()
                    .map_err(|source| CoerceError::Int {
                        literal: literal.to_string(),
                        source,
                    })?;
                target.assign(Scalar::Int(value))
            }
            Kind::Uint => {
                let value = literal
                    .parse::<u64>()
                    .map_err(|source| CoerceError::Int {
                        literal: literal.to_string(),
                        source,
                    })?;
                target.assign(Scalar::Uint(value))
            }
            Kind::Float => {
                let value = literal
                    .parse::<f64>()
                    .map_err(|source| CoerceError::Float {
                        literal: literal.to_string(),
                        source,
                    })?;
                target.assign(Scalar::Float(value))
            }
            Kind::String => target.assign(Scalar::Str(literal.to_string())),
            Kind::Duration => {
                let value =
                    humantime::parse_duration(literal).map_err(|source| CoerceError::Duration {
                        literal: literal.to_string(),
                        source,
                    })?;
                target.assign(Scalar::Duration(value))
            }
            Kind::Time => target.assign(Scalar::Time(parse_time(literal, self.time_layout)?)),
            Kind::Regex => target.assign(Scalar::Regex(Regex::new(literal)?)),
            Kind::Mapping | Kind::Record | Kind::Dynamic | Kind::Custom => {
                Err(CoerceError::Unsupported(kind.name()))
            }
        }
    }
}

/// Split a list literal: one leading `[` and one trailing `]` are dropped,
/// then every comma separates. Segments are not trimmed.
///
/// `"[1,2,3]"` and `"1,2,3"` both give `["1", "2", "3"]`.
pub fn string_slice(literal: &str) -> Vec<&str> {
    let literal = literal.strip_prefix('[').unwrap_or(literal);
    let literal = literal.strip_suffix(']').unwrap_or(literal);
    literal.split(',').collect()
}

/// Boolean tokens accepted in literals.
pub fn parse_bool(literal: &str) -> Result<bool, CoerceError> {
    match literal {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(CoerceError::Bool(literal.to_string())),
    }
}

/// Parse a timestamp with `layout`.
///
/// The default layout is RFC 3339. Other layouts are tried as an offset
/// datetime, then as a naive datetime in UTC, then as a date at midnight UTC.
pub fn parse_time(literal: &str, layout: &str) -> Result<DateTime<Utc>, CoerceError> {
    let parsed = if layout == DEFAULT_TIME_LAYOUT {
        DateTime::parse_from_rfc3339(literal).map(|time| time.with_timezone(&Utc))
    } else {
        DateTime::parse_from_str(literal, layout)
            .map(|time| time.with_timezone(&Utc))
            .or_else(|_| NaiveDateTime::parse_from_str(literal, layout).map(|time| time.and_utc()))
            .or_else(|_| {
                NaiveDate::parse_from_str(literal, layout)
                    .map(|date| date.and_time(NaiveTime::MIN).and_utc())
            })
    };
    parsed.map_err(|source| CoerceError::Time {
        literal: literal.to_string(),
        layout: layout.to_string(),
        source,
    })
}
