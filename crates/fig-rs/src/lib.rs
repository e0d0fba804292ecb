//! Load config files and environment variables into typed records.
//!
//! A record is a plain struct declared with [`record!`], whose members carry
//! struct-tag style annotations:
//!
//! ```no_run
//! use std::time::Duration;
//!
//! #[derive(Debug, Default)]
//! pub struct Config {
//!     pub build: String,
//!     pub server: Server,
//! }
//!
//! #[derive(Debug, Default)]
//! pub struct Server {
//!     pub host: String,
//!     pub ports: Vec<u16>,
//!     pub cleanup: Duration,
//! }
//!
//! fig::record!(Config {
//!     pub build => r#"fig:"build" validate:"required""#,
//!     pub server => r#"fig:"server""#,
//! });
//! fig::record!(Server {
//!     pub host => r#"fig:"host" default:"127.0.0.1""#,
//!     pub ports => r#"fig:"ports" default:"[80,443]""#,
//!     pub cleanup => r#"fig:"cleanup" default:"30m""#,
//! });
//!
//! let mut cfg = Config::default();
//! fig::load(&mut cfg)?;
//! # Ok::<(), fig::Error>(())
//! ```
//!
//! [`load`] reads `config.yaml` from the working directory, decodes it into
//! the record, then validates `required` fields and fills `default`s. Use
//! [`Fig`] to change the file, search directories, tag key, timestamp layout,
//! or to overlay env variables.

mod bind;
mod coerce;
mod env;
mod error;
mod flatten;
mod loader;
mod node;
mod tag;

pub use coerce::{Coercer, parse_bool, parse_time, string_slice};
pub use env::{EnvSource, ProcessEnv, format_env_key};
/// Public error types returned by loading and binding.
pub use error::{CoerceError, Error, FieldError, FieldErrors, ParseError};
pub use flatten::{Field, FieldTree};
/// Loader options and entry points.
pub use loader::{
    DEFAULT_DIR, DEFAULT_FILENAME, DEFAULT_TAG, DEFAULT_TIME_LAYOUT, Fig, Format, load,
};
pub use node::{
    FieldDef, FillElement, FillEntry, Kind, Mapping, Node, Optional, Record, Scalar, Sequence,
    StringUnmarshaler, deref, deref_mut,
};
pub use tag::{Tag, TagError, lookup as lookup_tag, split_tag};
