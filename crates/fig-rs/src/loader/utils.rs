//! Helper utilities for config file discovery and document rewriting.

use crate::env::EnvSource;
use log::debug;
use serde_json::Value;
use std::path::Path;

/// Whether `path` exists and is not a directory.
pub(super) fn file_exists(path: &Path) -> bool {
    path.metadata().is_ok_and(|meta| !meta.is_dir())
}

/// Split `name` into stem and extension, the extension keeping its dot.
fn split_extension(name: &str) -> (&str, &str) {
    let base = name.rfind(['/', '\\']).map_or(0, |idx| idx + 1);
    match name[base..].rfind('.') {
        Some(idx) if idx > 0 => name.split_at(base + idx),
        _ => (name, ""),
    }
}

/// Profile file derived from the base config file name.
///
/// `config.yaml` with profile `test` gives `config-test.yaml`.
pub(super) fn profile_filename(filename: &str, profile: &str) -> String {
    let (stem, ext) = split_extension(filename);
    format!("{stem}-{profile}{ext}")
}

/// Profile file following `layout`, whose stem ends in `-<profile>`.
///
/// `config-test.yaml` with profile `integration` gives
/// `config-integration.yaml`. A layout without `-` gets the profile appended.
pub(super) fn layout_filename(layout: &str, profile: &str) -> String {
    let (stem, ext) = split_extension(layout);
    match stem.rfind('-') {
        Some(idx) => format!("{}-{profile}{ext}", &stem[..idx]),
        None => format!("{stem}-{profile}{ext}"),
    }
}

/// Replace `${NAME}` references in every string of `value` with env variable
/// `NAME`. Unset variables expand to the empty string.
pub(super) fn expand_named_env(value: &mut Value, source: &dyn EnvSource) {
    match value {
        Value::String(text) if text.contains("${") => {
            *text = expand_refs(text, source);
        }
        Value::Array(items) => {
            for item in items {
                expand_named_env(item, source);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                expand_named_env(item, source);
            }
        }
        _ => {}
    }
}

fn expand_refs(text: &str, source: &dyn EnvSource) -> String {
    let mut expanded = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        expanded.push_str(&rest[..start]);
        let name = &rest[start + 2..start + 2 + len];
        match source.lookup(name) {
            Some(found) => expanded.push_str(&found),
            None => debug!("named env variable {name} is not set"),
        }
        rest = &rest[start + 3 + len..];
    }
    expanded.push_str(rest);
    expanded
}
