//! IO helpers for locating and parsing config files.

use super::utils;
use crate::error::{Error, ParseError};
use log::debug;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Document formats understood by the loader, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.yaml` and `.yml`
    Yaml,
    /// `.json`
    Json,
    /// `.json5`
    Json5,
    /// `.toml`
    Toml,
}

impl Format {
    /// Format for `path`, based on its extension.
    pub fn from_path(path: &Path) -> Result<Format, Error> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        match extension {
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            "json5" => Ok(Format::Json5),
            "toml" => Ok(Format::Toml),
            other => Err(Error::UnsupportedFormat(format!(".{other}"))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Yaml => "yaml",
            Format::Json => "json",
            Format::Json5 => "json5",
            Format::Toml => "toml",
        };
        f.write_str(name)
    }
}

/// First existing regular file named `filename` in `dirs`, searched in order.
pub(super) fn find_file(dirs: &[PathBuf], filename: &str) -> Result<PathBuf, Error> {
    for dir in dirs {
        let path = dir.join(filename);
        if utils::file_exists(&path) {
            debug!("found config file: {}", path.display());
            return Ok(path);
        }
        debug!("config file missing (path={})", path.display());
    }
    Err(Error::FileNotFound {
        filename: filename.to_string(),
    })
}

/// Read and parse a config file into an untyped document.
pub(super) fn read_file(path: &Path) -> Result<Value, Error> {
    let format = Format::from_path(path)?;
    debug!(
        "reading config file (path={}, format={})",
        path.display(),
        format
    );
    let contents = fs::read_to_string(path)?;
    parse(&contents, format)
}

/// Parse `contents` as `format`.
pub(super) fn parse(contents: &str, format: Format) -> Result<Value, Error> {
    let value = match format {
        Format::Yaml => serde_yaml::from_str(contents).map_err(ParseError::from)?,
        Format::Json => serde_json::from_str(contents).map_err(ParseError::from)?,
        Format::Json5 => json5::from_str(contents).map_err(ParseError::from)?,
        Format::Toml => {
            let table: toml::Table = toml::from_str(contents).map_err(ParseError::from)?;
            toml_to_json(toml::Value::Table(table))
        }
    };
    Ok(value)
}

/// Convert a TOML value, rendering datetimes as RFC 3339 strings.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(text) => Value::String(text),
        toml::Value::Integer(number) => Value::from(number),
        toml::Value::Float(number) => serde_json::Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(flag) => Value::Bool(flag),
        toml::Value::Datetime(datetime) => Value::String(datetime.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}
