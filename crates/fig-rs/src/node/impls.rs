//! [`Node`] implementations for std, chrono, regex and serde_json types.

use super::{FillElement, FillEntry, Kind, Mapping, Node, Optional, Scalar, Sequence};
use crate::error::CoerceError;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

fn out_of_range(value: impl ToString, type_name: &'static str) -> CoerceError {
    CoerceError::OutOfRange {
        value: value.to_string(),
        type_name,
    }
}

fn mismatch(expected: Kind, found: &Scalar) -> CoerceError {
    CoerceError::Mismatch {
        expected: expected.name(),
        found: found.describe(),
    }
}

fn zeroed_or_unsupported<T: Node>() -> Result<T, CoerceError> {
    T::zeroed().ok_or(CoerceError::Unsupported(type_name::<T>()))
}

macro_rules! integer_node {
    ($kind:ident: $($ty:ty),+) => {
        $(
            impl Node for $ty {
                fn kind(&self) -> Kind {
                    Kind::$kind
                }

                fn kind_of() -> Kind {
                    Kind::$kind
                }

                fn zeroed() -> Option<Self> {
                    Some(0)
                }

                fn is_zero(&self) -> bool {
                    *self == 0
                }

                fn assign(&mut self, value: Scalar) -> Result<(), CoerceError> {
                    *self = match value {
                        Scalar::Int(v) => {
                            <$ty>::try_from(v).map_err(|_| out_of_range(v, stringify!($ty)))?
                        }
                        Scalar::Uint(v) => {
                            <$ty>::try_from(v).map_err(|_| out_of_range(v, stringify!($ty)))?
                        }
                        other => return Err(mismatch(Kind::$kind, &other)),
                    };
                    Ok(())
                }
            }
        )+
    };
}

integer_node!(Int: i8, i16, i32, i64, isize);
integer_node!(Uint: u8, u16, u32, u64, usize);

macro_rules! float_node {
    ($($ty:ty),+) => {
        $(
            impl Node for $ty {
                fn kind(&self) -> Kind {
                    Kind::Float
                }

                fn kind_of() -> Kind {
                    Kind::Float
                }

                fn zeroed() -> Option<Self> {
                    Some(0.0)
                }

                fn is_zero(&self) -> bool {
                    *self == 0.0
                }

                fn assign(&mut self, value: Scalar) -> Result<(), CoerceError> {
                    *self = match value {
                        Scalar::Float(v) => v as $ty,
                        Scalar::Int(v) => v as $ty,
                        Scalar::Uint(v) => v as $ty,
                        other => return Err(mismatch(Kind::Float, &other)),
                    };
                    Ok(())
                }
            }
        )+
    };
}

float_node!(f32, f64);

impl Node for bool {
    fn kind(&self) -> Kind {
        Kind::Bool
    }

    fn kind_of() -> Kind {
        Kind::Bool
    }

    fn zeroed() -> Option<Self> {
        Some(false)
    }

    fn is_zero(&self) -> bool {
        !*self
    }

    fn assign(&mut self, value: Scalar) -> Result<(), CoerceError> {
        match value {
            Scalar::Bool(v) => {
                *self = v;
                Ok(())
            }
            other => Err(mismatch(Kind::Bool, &other)),
        }
    }
}

impl Node for String {
    fn kind(&self) -> Kind {
        Kind::String
    }

    fn kind_of() -> Kind {
        Kind::String
    }

    fn zeroed() -> Option<Self> {
        Some(String::new())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn assign(&mut self, value: Scalar) -> Result<(), CoerceError> {
        match value {
            Scalar::Str(v) => {
                *self = v;
                Ok(())
            }
            other => Err(mismatch(Kind::String, &other)),
        }
    }
}

impl Node for Duration {
    fn kind(&self) -> Kind {
        Kind::Duration
    }

    fn kind_of() -> Kind {
        Kind::Duration
    }

    fn zeroed() -> Option<Self> {
        Some(Duration::ZERO)
    }

    fn is_zero(&self) -> bool {
        *self == Duration::ZERO
    }

    fn assign(&mut self, value: Scalar) -> Result<(), CoerceError> {
        match value {
            Scalar::Duration(v) => {
                *self = v;
                Ok(())
            }
            other => Err(mismatch(Kind::Duration, &other)),
        }
    }
}

/// The zero instant is chrono's default, the Unix epoch, so that records
/// deriving `Default` start out unset. A timestamp of exactly
/// `1970-01-01T00:00:00Z` is therefore indistinguishable from an unset one:
/// required checks fail on it and defaults replace it.
impl Node for DateTime<Utc> {
    fn kind(&self) -> Kind {
        Kind::Time
    }

    fn kind_of() -> Kind {
        Kind::Time
    }

    fn zeroed() -> Option<Self> {
        Some(DateTime::<Utc>::default())
    }

    fn is_zero(&self) -> bool {
        *self == DateTime::<Utc>::default()
    }

    fn assign(&mut self, value: Scalar) -> Result<(), CoerceError> {
        match value {
            Scalar::Time(v) => {
                *self = v;
                Ok(())
            }
            other => Err(mismatch(Kind::Time, &other)),
        }
    }
}

/// The zero pattern is the empty one.
impl Node for Regex {
    fn kind(&self) -> Kind {
        Kind::Regex
    }

    fn kind_of() -> Kind {
        Kind::Regex
    }

    fn zeroed() -> Option<Self> {
        Regex::new("").ok()
    }

    fn is_zero(&self) -> bool {
        self.as_str().is_empty()
    }

    fn assign(&mut self, value: Scalar) -> Result<(), CoerceError> {
        match value {
            Scalar::Regex(v) => {
                *self = v;
                Ok(())
            }
            other => Err(mismatch(Kind::Regex, &other)),
        }
    }
}

impl Node for serde_json::Value {
    fn kind(&self) -> Kind {
        Kind::Dynamic
    }

    fn kind_of() -> Kind {
        Kind::Dynamic
    }

    fn zeroed() -> Option<Self> {
        Some(serde_json::Value::Null)
    }

    fn is_zero(&self) -> bool {
        self.is_null()
    }

    fn assign(&mut self, _value: Scalar) -> Result<(), CoerceError> {
        Err(CoerceError::Unsupported(Kind::Dynamic.name()))
    }

    fn as_dynamic_mut(&mut self) -> Option<&mut serde_json::Value> {
        Some(self)
    }
}

impl<T: Node> Node for Option<T> {
    fn kind(&self) -> Kind {
        Kind::Optional
    }

    fn kind_of() -> Kind {
        Kind::Optional
    }

    fn zeroed() -> Option<Self> {
        Some(None)
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn as_optional(&self) -> Option<&dyn Optional> {
        Some(self)
    }

    fn as_optional_mut(&mut self) -> Option<&mut dyn Optional> {
        Some(self)
    }
}

impl<T: Node> Optional for Option<T> {
    fn get(&self) -> Option<&dyn Node> {
        self.as_ref().map(|value| value as &dyn Node)
    }

    fn get_mut(&mut self) -> Option<&mut dyn Node> {
        self.as_mut().map(|value| value as &mut dyn Node)
    }

    fn get_or_insert_zeroed(&mut self) -> Result<&mut dyn Node, CoerceError> {
        let value = match self.take() {
            Some(value) => value,
            None => zeroed_or_unsupported::<T>()?,
        };
        Ok(self.insert(value))
    }

    fn inner_kind(&self) -> Kind {
        T::kind_of()
    }

    fn clear(&mut self) {
        *self = None;
    }
}

impl<T: Node> Node for Vec<T> {
    fn kind(&self) -> Kind {
        Kind::Sequence
    }

    fn kind_of() -> Kind {
        Kind::Sequence
    }

    fn zeroed() -> Option<Self> {
        Some(Vec::new())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn as_sequence(&self) -> Option<&dyn Sequence> {
        Some(self)
    }

    fn as_sequence_mut(&mut self) -> Option<&mut dyn Sequence> {
        Some(self)
    }
}

fn build_elements<T: Node>(
    len: usize,
    fill: &mut FillElement<'_>,
) -> Result<Vec<T>, CoerceError> {
    let mut items = Vec::with_capacity(len);
    for idx in 0..len {
        let mut item = zeroed_or_unsupported::<T>()?;
        fill(idx, &mut item)?;
        items.push(item);
    }
    Ok(items)
}

impl<T: Node> Sequence for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn element_kind(&self) -> Kind {
        T::kind_of()
    }

    fn element(&self, index: usize) -> Option<&dyn Node> {
        self.get(index).map(|value| value as &dyn Node)
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Node> {
        self.get_mut(index).map(|value| value as &mut dyn Node)
    }

    fn rebuild(&mut self, len: usize, fill: &mut FillElement<'_>) -> Result<(), CoerceError> {
        *self = build_elements(len, fill)?;
        Ok(())
    }
}

/// Fixed-size arrays are zero only when they have no elements.
impl<T: Node, const N: usize> Node for [T; N] {
    fn kind(&self) -> Kind {
        Kind::Sequence
    }

    fn kind_of() -> Kind {
        Kind::Sequence
    }

    fn zeroed() -> Option<Self> {
        let items = (0..N).map(|_| T::zeroed()).collect::<Option<Vec<T>>>()?;
        items.try_into().ok()
    }

    fn is_zero(&self) -> bool {
        N == 0
    }

    fn as_sequence(&self) -> Option<&dyn Sequence> {
        Some(self)
    }

    fn as_sequence_mut(&mut self) -> Option<&mut dyn Sequence> {
        Some(self)
    }
}

impl<T: Node, const N: usize> Sequence for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn element_kind(&self) -> Kind {
        T::kind_of()
    }

    fn element(&self, index: usize) -> Option<&dyn Node> {
        self.get(index).map(|value| value as &dyn Node)
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Node> {
        self.get_mut(index).map(|value| value as &mut dyn Node)
    }

    fn rebuild(&mut self, len: usize, fill: &mut FillElement<'_>) -> Result<(), CoerceError> {
        if len != N {
            return Err(CoerceError::Length {
                expected: N,
                found: len,
            });
        }
        let items = build_elements::<T>(len, fill)?;
        *self = items.try_into().map_err(|_| CoerceError::Length {
            expected: N,
            found: len,
        })?;
        Ok(())
    }
}

macro_rules! mapping_node {
    ($map:ident) => {
        impl<T: Node> Node for $map<String, T> {
            fn kind(&self) -> Kind {
                Kind::Mapping
            }

            fn kind_of() -> Kind {
                Kind::Mapping
            }

            fn zeroed() -> Option<Self> {
                Some($map::new())
            }

            fn is_zero(&self) -> bool {
                self.is_empty()
            }

            fn as_mapping(&self) -> Option<&dyn Mapping> {
                Some(self)
            }

            fn as_mapping_mut(&mut self) -> Option<&mut dyn Mapping> {
                Some(self)
            }
        }

        impl<T: Node> Mapping for $map<String, T> {
            fn len(&self) -> usize {
                $map::len(self)
            }

            fn keys(&self) -> Vec<String> {
                let mut keys: Vec<String> = $map::keys(self).cloned().collect();
                keys.sort();
                keys
            }

            fn entry(&self, key: &str) -> Option<&dyn Node> {
                self.get(key).map(|value| value as &dyn Node)
            }

            fn entry_mut(&mut self, key: &str) -> Option<&mut dyn Node> {
                self.get_mut(key).map(|value| value as &mut dyn Node)
            }

            fn rebuild(
                &mut self,
                keys: &[String],
                fill: &mut FillEntry<'_>,
            ) -> Result<(), CoerceError> {
                let mut entries = $map::new();
                for key in keys {
                    let mut value = zeroed_or_unsupported::<T>()?;
                    fill(key, &mut value)?;
                    entries.insert(key.clone(), value);
                }
                *self = entries;
                Ok(())
            }
        }
    };
}

mapping_node!(BTreeMap);
mapping_node!(HashMap);
