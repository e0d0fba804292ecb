//! Materializes untyped documents into records.
//!
//! Decoding is weakly typed: strings pass through the coercer for every
//! non-string target, numbers and booleans convert between each other, and a
//! single value lifts into a one-element sequence. `null` leaves the target
//! untouched so values already in the record survive.

use crate::coerce::Coercer;
use crate::error::CoerceError;
use crate::node::{self, Kind, Mapping, Node, Record, Scalar, Sequence};
use crate::tag::Tag;
use serde_json::{Map, Number, Value};
use std::collections::HashSet;

/// Document-to-record decoder.
#[derive(Debug, Clone, Copy)]
pub(super) struct Decoder<'a> {
    tag_key: &'a str,
    coercer: Coercer<'a>,
    strict: bool,
}

impl<'a> Decoder<'a> {
    pub(super) fn new(tag_key: &'a str, coercer: Coercer<'a>, strict: bool) -> Self {
        Self {
            tag_key,
            coercer,
            strict,
        }
    }

    /// Decode `value` into `target`.
    pub(super) fn decode(&self, value: &Value, target: &mut dyn Node) -> Result<(), CoerceError> {
        if value.is_null() {
            return Ok(());
        }

        if let Some(unmarshaler) = target.as_unmarshaler() {
            let literal = scalar_literal(value).ok_or_else(|| mismatch("string", value))?;
            return unmarshaler.unmarshal_string(&literal);
        }

        let kind = target.kind();
        match kind {
            Kind::Optional => {
                let optional = target
                    .as_optional_mut()
                    .ok_or(CoerceError::Unsupported(kind.name()))?;
                self.decode(value, optional.get_or_insert_zeroed()?)
            }
            Kind::Record => {
                let map = expect_object(value, kind)?;
                let record = target
                    .as_record_mut()
                    .ok_or(CoerceError::Unsupported(kind.name()))?;
                self.decode_record(map, record)
            }
            Kind::Sequence => {
                let sequence = target
                    .as_sequence_mut()
                    .ok_or(CoerceError::Unsupported(kind.name()))?;
                self.decode_sequence(value, sequence)
            }
            Kind::Mapping => {
                let map = expect_object(value, kind)?;
                let mapping = target
                    .as_mapping_mut()
                    .ok_or(CoerceError::Unsupported(kind.name()))?;
                self.decode_mapping(map, mapping)
            }
            Kind::Dynamic => {
                let slot = target
                    .as_dynamic_mut()
                    .ok_or(CoerceError::Unsupported(kind.name()))?;
                *slot = value.clone();
                Ok(())
            }
            _ => self.decode_scalar(value, target, kind),
        }
    }

    fn decode_record(
        &self,
        map: &Map<String, Value>,
        record: &mut dyn Record,
    ) -> Result<(), CoerceError> {
        let mut used = HashSet::new();
        self.decode_members(map, record, &mut used)?;
        if self.strict {
            if let Some(key) = map.keys().find(|key| !used.contains(key.as_str())) {
                return Err(CoerceError::UnknownKey(key.clone()));
            }
        }
        Ok(())
    }

    /// Decode each visible member; squashed records read from `map` directly.
    fn decode_members(
        &self,
        map: &Map<String, Value>,
        record: &mut dyn Record,
        used: &mut HashSet<String>,
    ) -> Result<(), CoerceError> {
        for (idx, def) in record.fields().iter().enumerate() {
            if !def.is_visible() {
                continue;
            }
            let Some(member) = record.field_mut(idx) else {
                continue;
            };
            let tag = Tag::parse(def.tag, self.tag_key);

            if tag.squash && self.decode_squashed(map, member, used)? {
                continue;
            }

            let name = if tag.name.is_empty() {
                def.name
            } else {
                tag.name.as_str()
            };
            let Some((key, value)) = find_key(map, name) else {
                continue;
            };
            used.insert(key.to_string());
            self.decode(value, member)
                .map_err(|err| err.within(name))?;
        }
        Ok(())
    }

    /// Decode a squashed member from the parent object.
    ///
    /// An absent optional record is allocated for the pass and kept only when
    /// the parent object holds at least one of its keys. `false` when the
    /// member is not a record at all.
    fn decode_squashed(
        &self,
        map: &Map<String, Value>,
        member: &mut dyn Node,
        used: &mut HashSet<String>,
    ) -> Result<bool, CoerceError> {
        let Some(target) = node::deref_mut(member) else {
            return Ok(false);
        };
        if let Some(record) = target.as_record_mut() {
            self.decode_members(map, record, used)?;
            return Ok(true);
        }
        let Some(optional) = target.as_optional_mut() else {
            return Ok(false);
        };
        if !matches!(optional.inner_kind(), Kind::Record | Kind::Optional) {
            return Ok(false);
        }

        let mut claimed = HashSet::new();
        let squashed = self.decode_squashed(map, optional.get_or_insert_zeroed()?, &mut claimed)?;
        if claimed.is_empty() {
            optional.clear();
        }
        used.extend(claimed);
        Ok(squashed)
    }

    fn decode_sequence(
        &self,
        value: &Value,
        sequence: &mut dyn Sequence,
    ) -> Result<(), CoerceError> {
        let single: [Value; 1];
        let items: &[Value] = match value {
            Value::Array(items) => items,
            other => {
                single = [other.clone()];
                &single
            }
        };
        sequence.rebuild(items.len(), &mut |idx, element| {
            self.decode(&items[idx], element)
                .map_err(|err| err.within(format!("[{idx}]")))
        })
    }

    fn decode_mapping(
        &self,
        map: &Map<String, Value>,
        mapping: &mut dyn Mapping,
    ) -> Result<(), CoerceError> {
        let keys: Vec<String> = map.keys().cloned().collect();
        mapping.rebuild(&keys, &mut |key, entry| match map.get(key) {
            Some(value) => self
                .decode(value, entry)
                .map_err(|err| err.within(format!("[{key}]"))),
            None => Ok(()),
        })
    }

    fn decode_scalar(
        &self,
        value: &Value,
        target: &mut dyn Node,
        kind: Kind,
    ) -> Result<(), CoerceError> {
        let scalar = match (kind, value) {
            (Kind::Bool | Kind::Int | Kind::Uint | Kind::Float, Value::String(text))
                if text.is_empty() =>
            {
                zero_scalar(kind)
            }
            (_, Value::String(text)) => return self.coercer.set_value(target, text),
            (Kind::Bool, Value::Bool(flag)) => Scalar::Bool(*flag),
            (Kind::Bool, Value::Number(number)) => {
                Scalar::Bool(number.as_f64().is_some_and(|number| number != 0.0))
            }
            (Kind::Int | Kind::Uint | Kind::Float, Value::Bool(flag)) => {
                Scalar::Uint(u64::from(*flag))
            }
            (Kind::Int | Kind::Uint, Value::Number(number)) => integer_scalar(number)?,
            (Kind::Float, Value::Number(number)) => Scalar::Float(
                number
                    .as_f64()
                    .ok_or_else(|| mismatch(Kind::Float.name(), value))?,
            ),
            (Kind::String, Value::Bool(flag)) => {
                Scalar::Str(if *flag { "1" } else { "0" }.to_string())
            }
            (Kind::String, Value::Number(number)) => Scalar::Str(number.to_string()),
            (_, other) => return Err(mismatch(kind.name(), other)),
        };
        target.assign(scalar)
    }
}

/// Object entry matching `name`, exactly or else ignoring ASCII case.
fn find_key<'m>(map: &'m Map<String, Value>, name: &str) -> Option<(&'m str, &'m Value)> {
    map.iter()
        .find(|(key, _)| key.as_str() == name)
        .or_else(|| map.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)))
        .map(|(key, value)| (key.as_str(), value))
}

/// Expect a document object or return a typed error.
fn expect_object(value: &Value, kind: Kind) -> Result<&Map<String, Value>, CoerceError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(mismatch(kind.name(), other)),
    }
}

/// Text form of a scalar document value, used for custom parsers.
fn scalar_literal(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn integer_scalar(number: &Number) -> Result<Scalar, CoerceError> {
    if let Some(value) = number.as_i64() {
        return Ok(Scalar::Int(value));
    }
    if let Some(value) = number.as_u64() {
        return Ok(Scalar::Uint(value));
    }
    match number.as_f64() {
        Some(value)
            if value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 =>
        {
            Ok(Scalar::Int(value as i64))
        }
        Some(value) if value.fract() == 0.0 => Err(CoerceError::OutOfRange {
            value: value.to_string(),
            type_name: "i64",
        }),
        _ => Err(CoerceError::Mismatch {
            expected: "integer",
            found: "float",
        }),
    }
}

fn zero_scalar(kind: Kind) -> Scalar {
    match kind {
        Kind::Bool => Scalar::Bool(false),
        Kind::Float => Scalar::Float(0.0),
        Kind::Uint => Scalar::Uint(0),
        _ => Scalar::Int(0),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(expected: &'static str, found: &Value) -> CoerceError {
    CoerceError::Mismatch {
        expected,
        found: describe(found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[derive(Debug, Default, PartialEq)]
    struct Service {
        pub name: String,
        pub port: u16,
        pub ratio: f32,
        pub enabled: bool,
        pub timeout: Duration,
        pub hosts: Vec<String>,
        pub labels: BTreeMap<String, String>,
        pub extra: serde_json::Value,
        pub limits: Option<Limits>,
        pub settings: Settings,
        secret: String,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Limits {
        pub cpu: u32,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Settings {
        pub level: String,
    }

    crate::record!(Service {
        pub name => r#"fig:"name""#,
        pub port => "",
        pub ratio => "",
        pub enabled => "",
        pub timeout => "",
        pub hosts => "",
        pub labels => "",
        pub extra => "",
        pub limits => "",
        pub settings => r#"fig:",squash""#,
        secret => "",
    });
    crate::record!(Limits { pub cpu => "" });
    crate::record!(Settings { pub level => "" });

    fn decode(value: Value, strict: bool) -> Result<Service, CoerceError> {
        let mut service = Service::default();
        Decoder::new("fig", Coercer::default(), strict).decode(&value, &mut service)?;
        Ok(service)
    }

    #[test]
    fn decodes_typed_document() {
        let service = decode(
            json!({
                "name": "api",
                "port": 8080,
                "ratio": 0.5,
                "enabled": true,
                "timeout": "90s",
                "hosts": ["a", "b"],
                "labels": {"zone": "eu"},
                "extra": {"any": [1, 2]},
                "limits": {"cpu": 2},
                "level": "debug",
            }),
            true,
        )
        .expect("decode");
        assert_eq!(service.name, "api");
        assert_eq!(service.port, 8080);
        assert_eq!(service.ratio, 0.5);
        assert!(service.enabled);
        assert_eq!(service.timeout, Duration::from_secs(90));
        assert_eq!(service.hosts, vec!["a", "b"]);
        assert_eq!(service.labels.get("zone").map(String::as_str), Some("eu"));
        assert_eq!(service.extra, json!({"any": [1, 2]}));
        assert_eq!(service.limits, Some(Limits { cpu: 2 }));
        assert_eq!(service.settings.level, "debug");
    }

    /// Keys match member names ignoring case; exact matches win.
    #[test]
    fn case_insensitive_keys() {
        let service = decode(json!({"NAME": "upper", "Port": 1}), false).expect("decode");
        assert_eq!(service.name, "upper");
        assert_eq!(service.port, 1);

        let service = decode(json!({"NAME": "upper", "name": "exact"}), false).expect("decode");
        assert_eq!(service.name, "exact");
    }

    #[test]
    fn weak_conversions() {
        let service = decode(
            json!({
                "name": 42,
                "port": "8080",
                "ratio": 1,
                "enabled": 1,
                "hosts": "single",
            }),
            false,
        )
        .expect("decode");
        assert_eq!(service.name, "42");
        assert_eq!(service.port, 8080);
        assert_eq!(service.ratio, 1.0);
        assert!(service.enabled);
        assert_eq!(service.hosts, vec!["single"]);
    }

    #[test]
    fn nulls_leave_values() {
        let mut service = Service {
            name: "kept".to_string(),
            ..Service::default()
        };
        Decoder::new("fig", Coercer::default(), false)
            .decode(&json!({"name": null, "limits": null}), &mut service)
            .expect("decode");
        assert_eq!(service.name, "kept");
        assert_eq!(service.limits, None);
    }

    /// Strict decoding rejects keys that match no visible member.
    #[test]
    fn strict_rejects_unknown_keys() {
        let err = decode(json!({"name": "x", "secret": "s"}), true).unwrap_err();
        assert!(matches!(err, CoerceError::UnknownKey(ref key) if key == "secret"));

        let service = decode(json!({"name": "x", "secret": "s"}), false).expect("lenient");
        assert_eq!(service.secret, "");
    }

    #[test]
    fn errors_carry_location() {
        let err = decode(json!({"hosts": ["a", {"b": 1}]}), false).unwrap_err();
        let (path, cause) = err.into_located();
        assert_eq!(path, "hosts[1]");
        assert_eq!(cause.to_string(), "expected string, found object");

        let err = decode(json!({"limits": {"cpu": -1}}), false).unwrap_err();
        let (path, cause) = err.into_located();
        assert_eq!(path, "limits.cpu");
        assert!(matches!(cause, CoerceError::OutOfRange { .. }));
    }

    /// A squashed optional record is allocated only when the parent object
    /// carries one of its keys.
    #[test]
    fn squashed_optional_record() {
        #[derive(Debug, Default)]
        struct Wrapper {
            pub name: String,
            pub settings: Option<Settings>,
        }
        crate::record!(Wrapper {
            pub name => r#"fig:"name""#,
            pub settings => r#"fig:",squash""#,
        });

        let decode_wrapper = |value: Value, strict: bool| {
            let mut wrapper = Wrapper::default();
            Decoder::new("fig", Coercer::default(), strict)
                .decode(&value, &mut wrapper)
                .map(|()| wrapper)
        };

        let wrapper = decode_wrapper(json!({"name": "x", "level": "debug"}), true)
            .expect("squashed keys are claimed");
        assert_eq!(
            wrapper.settings,
            Some(Settings {
                level: "debug".to_string()
            })
        );

        let wrapper = decode_wrapper(json!({"name": "x"}), true).expect("decode");
        assert_eq!(wrapper.settings, None);

        let err = decode_wrapper(json!({"lvl": "debug"}), true).unwrap_err();
        assert!(matches!(err, CoerceError::UnknownKey(ref key) if key == "lvl"));
    }

    #[test]
    fn integral_floats_become_integers() {
        let service = decode(json!({"port": 443.0}), false).expect("decode");
        assert_eq!(service.port, 443);
        assert!(decode(json!({"port": 1.5}), false).is_err());
    }
}
