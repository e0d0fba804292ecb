//! Type descriptors for bindable values.
//!
//! Every type that can appear in a config record implements [`Node`]. A node
//! reports its [`Kind`], answers the zero-value predicate, accepts parsed
//! [`Scalar`] values and exposes structural views for optionals, sequences,
//! maps and records. The flattener, coercer, binding engine and materializer
//! all work against `dyn Node`, so user records only need the [`record!`]
//! macro to take part.
//!
//! [`record!`]: crate::record

mod impls;
mod macros;

use crate::error::CoerceError;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Coarse classification used for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Int,
    Uint,
    Float,
    String,
    Duration,
    Time,
    Regex,
    Optional,
    Sequence,
    Mapping,
    Record,
    /// Untyped document value (`serde_json::Value`).
    Dynamic,
    /// Type parsed through [`StringUnmarshaler`].
    Custom,
}

impl Kind {
    /// Lower-case name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Duration => "duration",
            Kind::Time => "time",
            Kind::Regex => "regex",
            Kind::Optional => "optional",
            Kind::Sequence => "sequence",
            Kind::Mapping => "map",
            Kind::Record => "record",
            Kind::Dynamic => "dynamic",
            Kind::Custom => "custom",
        }
    }

    /// Whether sequence elements of this kind are walked by the flattener.
    pub fn is_traversable(self) -> bool {
        matches!(
            self,
            Kind::Record | Kind::Optional | Kind::Sequence | Kind::Dynamic
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed leaf value on its way into a node.
#[derive(Debug, Clone)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    Duration(Duration),
    Time(DateTime<Utc>),
    Regex(Regex),
}

impl Scalar {
    /// Short description of the carried value kind.
    pub fn describe(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) | Scalar::Uint(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "string",
            Scalar::Duration(_) => "duration",
            Scalar::Time(_) => "time",
            Scalar::Regex(_) => "regex",
        }
    }
}

/// A value that fig can walk, validate and assign.
pub trait Node {
    fn kind(&self) -> Kind;

    /// Kind of the implementing type, available without an instance.
    fn kind_of() -> Kind
    where
        Self: Sized;

    /// Fresh zero value, used when optionals and sequences need new slots.
    fn zeroed() -> Option<Self>
    where
        Self: Sized;

    fn is_zero(&self) -> bool;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Store an already parsed value, converting between numeric widths.
    fn assign(&mut self, value: Scalar) -> Result<(), CoerceError> {
        Err(CoerceError::Mismatch {
            expected: self.kind().name(),
            found: value.describe(),
        })
    }

    fn as_unmarshaler(&mut self) -> Option<&mut dyn StringUnmarshaler> {
        None
    }

    fn as_optional(&self) -> Option<&dyn Optional> {
        None
    }

    fn as_optional_mut(&mut self) -> Option<&mut dyn Optional> {
        None
    }

    fn as_sequence(&self) -> Option<&dyn Sequence> {
        None
    }

    fn as_sequence_mut(&mut self) -> Option<&mut dyn Sequence> {
        None
    }

    fn as_mapping(&self) -> Option<&dyn Mapping> {
        None
    }

    fn as_mapping_mut(&mut self) -> Option<&mut dyn Mapping> {
        None
    }

    fn as_record(&self) -> Option<&dyn Record> {
        None
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        None
    }

    fn as_dynamic_mut(&mut self) -> Option<&mut serde_json::Value> {
        None
    }
}

/// A value that may be absent (`Option<T>`).
pub trait Optional {
    fn get(&self) -> Option<&dyn Node>;
    fn get_mut(&mut self) -> Option<&mut dyn Node>;
    /// The present value, allocating a zero value first when absent.
    fn get_or_insert_zeroed(&mut self) -> Result<&mut dyn Node, CoerceError>;

    /// Kind of the wrapped type, known even when absent.
    fn inner_kind(&self) -> Kind;

    /// Drop the present value, if any.
    fn clear(&mut self);
}

/// Callback filling one freshly allocated sequence element.
pub type FillElement<'f> = dyn FnMut(usize, &mut dyn Node) -> Result<(), CoerceError> + 'f;

/// Callback filling one freshly allocated map entry.
pub type FillEntry<'f> = dyn FnMut(&str, &mut dyn Node) -> Result<(), CoerceError> + 'f;

/// An indexable collection (`Vec<T>`, `[T; N]`).
pub trait Sequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind of the element type, known even when the sequence is empty.
    fn element_kind(&self) -> Kind;

    fn element(&self, index: usize) -> Option<&dyn Node>;

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Node>;

    /// Replace the contents with `len` new elements filled by `fill`.
    ///
    /// The new sequence is only assigned once every element is filled, so a
    /// failure leaves the previous contents untouched.
    fn rebuild(&mut self, len: usize, fill: &mut FillElement<'_>) -> Result<(), CoerceError>;
}

/// A string-keyed map (`BTreeMap<String, T>`, `HashMap<String, T>`).
pub trait Mapping {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in sorted order.
    fn keys(&self) -> Vec<String>;

    fn entry(&self, key: &str) -> Option<&dyn Node>;

    fn entry_mut(&mut self, key: &str) -> Option<&mut dyn Node>;

    /// Replace the contents with one new entry per key, filled by `fill`.
    fn rebuild(&mut self, keys: &[String], fill: &mut FillEntry<'_>) -> Result<(), CoerceError>;
}

/// Declaration of one record member, generated by [`crate::record!`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Declared member name.
    pub name: &'static str,
    /// Raw annotation in `key:"value"` form.
    pub tag: &'static str,
    /// Declared with a `pub` visibility.
    pub public: bool,
    /// Marked `#[embed]`: walked even when not public.
    pub embedded: bool,
}

impl FieldDef {
    /// Whether the flattener and materializer see this member.
    pub fn is_visible(&self) -> bool {
        self.public || self.embedded
    }
}

/// A struct with declared, annotated members.
pub trait Record {
    /// Member declarations in declaration order.
    fn fields(&self) -> &'static [FieldDef];

    fn field(&self, index: usize) -> Option<&dyn Node>;

    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Node>;
}

/// Capability of parsing a value of this type from a string.
///
/// Implemented for every [`FromStr`] type; a type opts into using it for
/// coercion by declaring itself with [`crate::string_unmarshaler!`], which
/// makes it win over every kind-based rule.
pub trait StringUnmarshaler {
    fn unmarshal_string(&mut self, literal: &str) -> Result<(), CoerceError>;
}

impl<T> StringUnmarshaler for T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn unmarshal_string(&mut self, literal: &str) -> Result<(), CoerceError> {
        *self = literal
            .parse::<T>()
            .map_err(|err| CoerceError::Unmarshal {
                literal: literal.to_string(),
                message: err.to_string(),
            })?;
        Ok(())
    }
}

/// Follow present optionals down to the innermost value.
pub fn deref(node: &dyn Node) -> &dyn Node {
    match node.as_optional().and_then(Optional::get) {
        Some(inner) => deref(inner),
        None => node,
    }
}

/// Mutable counterpart of [`deref`].
///
/// `None` only when an [`Optional`] implementation reports a present value
/// through `get` but not through `get_mut`.
pub fn deref_mut(node: &mut dyn Node) -> Option<&mut dyn Node> {
    let present = node
        .as_optional()
        .is_some_and(|optional| optional.get().is_some());
    if !present {
        return Some(node);
    }
    node.as_optional_mut()
        .and_then(Optional::get_mut)
        .and_then(deref_mut)
}
