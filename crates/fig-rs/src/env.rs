//! Environment lookup for the env overlay.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Where env overlay values are read from.
pub trait EnvSource: fmt::Debug + Send + Sync {
    /// Value of `key`, or `None` when unset.
    fn lookup(&self, key: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Env variable name for a field path.
///
/// `.` and `[` become `_`, `]` is dropped, a non-empty `prefix` is joined
/// with `_` and the result is upper-cased:
/// `loggers[0].log_level` gives `LOGGERS_0_LOG_LEVEL`.
pub fn format_env_key(path: &str, prefix: &str) -> String {
    let mut key = String::with_capacity(prefix.len() + path.len() + 1);
    if !prefix.is_empty() {
        key.push_str(prefix);
        key.push('_');
    }
    for c in path.chars() {
        match c {
            '.' | '[' => key.push('_'),
            ']' => {}
            _ => key.push(c),
        }
    }
    key.to_uppercase()
}
