//! Config loading: file discovery, decoding and field binding.
//!
//! A load searches the configured directories for the config file, decodes
//! it into the destination record, then runs the binding pass (env overlay,
//! required checks, defaults) over every field.

mod decode;
mod file_io;
mod utils;


pub use file_io::Format;

use crate::bind::Binder;
use crate::coerce::Coercer;
use crate::env::{EnvSource, ProcessEnv};
use crate::error::Error;
use crate::node::{Kind, Node};
use log::{debug, info};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Config file name looked up when none is configured.
pub const DEFAULT_FILENAME: &str = "config.yaml";
/// Directory searched when none is configured.
pub const DEFAULT_DIR: &str = ".";
/// Annotation key holding alternate names and markers.
pub const DEFAULT_TAG: &str = "fig";
/// Timestamp layout selecting RFC 3339 parsing.
pub const DEFAULT_TIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

/// Loader options.
///
/// Built once with the consuming builder methods, then used for any number of
/// loads:
///
/// ```no_run
/// # #[derive(Default)]
/// # struct Config { pub level: String }
/// # fig::record!(Config { pub level => r#"default:"info""# });
/// let mut cfg = Config::default();
/// fig::Fig::new()
///     .file("settings.toml")
///     .dirs([".", "/etc/myapp"])
///     .use_env("myapp")
///     .load(&mut cfg)?;
/// # Ok::<(), fig::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Fig {
    filename: String,
    dirs: Vec<PathBuf>,
    tag: String,
    time_layout: String,
    use_env: bool,
    env_prefix: String,
    use_strict: bool,
    ignore_file: bool,
    allow_no_file: bool,
    profiles: Vec<String>,
    profile_layout: Option<String>,
    use_named_env: bool,
    env_source: Arc<dyn EnvSource>,
}

impl Default for Fig {
    fn default() -> Self {
        Self {
            filename: DEFAULT_FILENAME.to_string(),
            dirs: vec![PathBuf::from(DEFAULT_DIR)],
            tag: DEFAULT_TAG.to_string(),
            time_layout: DEFAULT_TIME_LAYOUT.to_string(),
            use_env: false,
            env_prefix: String::new(),
            use_strict: false,
            ignore_file: false,
            allow_no_file: false,
            profiles: Vec::new(),
            profile_layout: None,
            use_named_env: false,
            env_source: Arc::new(ProcessEnv),
        }
    }
}

impl Fig {
    /// Loader with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Config file name, including its extension.
    pub fn file(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Directories searched in order for the config file.
    pub fn dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Annotation key read for alternate names and markers.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Layout for timestamp fields, in chrono strftime syntax.
    pub fn time_layout(mut self, layout: impl Into<String>) -> Self {
        self.time_layout = layout.into();
        self
    }

    /// Overlay env variables on every field; a non-empty `prefix` is
    /// prepended to each variable name.
    pub fn use_env(mut self, prefix: impl Into<String>) -> Self {
        self.use_env = true;
        self.env_prefix = prefix.into();
        self
    }

    /// Reject config file keys that match no field.
    pub fn use_strict(mut self) -> Self {
        self.use_strict = true;
        self
    }

    /// Skip the config file entirely.
    pub fn ignore_file(mut self) -> Self {
        self.ignore_file = true;
        self
    }

    /// Treat a missing config file as an empty one.
    pub fn allow_no_file(mut self) -> Self {
        self.allow_no_file = true;
        self
    }

    /// Profiles whose files are decoded over the base file, in order.
    ///
    /// Profile `test` of `config.yaml` is read from `config-test.yaml`, looked
    /// up in the same directories.
    pub fn profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    /// Sample profile file name, e.g. `config-test.json`; the part after the
    /// last `-` of its stem is replaced by each profile name.
    pub fn profile_layout(mut self, layout: impl Into<String>) -> Self {
        self.profile_layout = Some(layout.into());
        self
    }

    /// Expand `${NAME}` references in config file strings from the env.
    pub fn use_named_env(mut self) -> Self {
        self.use_named_env = true;
        self
    }

    /// Read env values from `source` instead of the process env.
    pub fn env_source(mut self, source: impl EnvSource + 'static) -> Self {
        self.env_source = Arc::new(source);
        self
    }

    /// Load the config file into `cfg`, then bind its fields.
    pub fn load<T: Node>(&self, cfg: &mut T) -> Result<(), Error> {
        ensure_record(&*cfg)?;
        info!(
            "loading config (file={}, dirs={})",
            self.filename,
            self.dirs.len()
        );

        if self.ignore_file {
            debug!("config file ignored");
        } else {
            self.decode_file(&self.filename, cfg)?;
            for profile in &self.profiles {
                let filename = match &self.profile_layout {
                    Some(layout) => utils::layout_filename(layout, profile),
                    None => utils::profile_filename(&self.filename, profile),
                };
                debug!("applying profile {profile} (file={filename})");
                self.decode_file(&filename, cfg)?;
            }
        }

        self.bind(cfg)
    }

    /// Load `contents` parsed as `format` into `cfg`, then bind its fields.
    pub fn load_str<T: Node>(
        &self,
        contents: &str,
        format: Format,
        cfg: &mut T,
    ) -> Result<(), Error> {
        ensure_record(&*cfg)?;
        debug!(
            "loading config from raw contents (format={}, len={})",
            format,
            contents.len()
        );
        let value = file_io::parse(contents, format)?;
        self.decode(&value, cfg)?;
        self.bind(cfg)
    }

    /// Decode an already parsed document into `cfg`, then bind its fields.
    pub fn load_value<T: Node>(&self, value: &Value, cfg: &mut T) -> Result<(), Error> {
        ensure_record(&*cfg)?;
        self.decode(value, cfg)?;
        self.bind(cfg)
    }

    /// Run only the binding pass: env overlay, required checks and defaults.
    pub fn bind<T: Node>(&self, cfg: &mut T) -> Result<(), Error> {
        ensure_record(&*cfg)?;
        let coercer = Coercer::new(&self.time_layout);
        let mut binder = Binder::new(&self.tag, coercer);
        if self.use_env {
            binder = binder.with_env(self.env_source.as_ref(), &self.env_prefix);
        }
        let errors = binder.process(cfg);
        if !errors.is_empty() {
            info!("config has {} invalid fields", errors.len());
        }
        errors.into_result()
    }

    /// Decode `filename` from the first search dir holding it.
    fn decode_file(&self, filename: &str, cfg: &mut dyn Node) -> Result<(), Error> {
        match file_io::find_file(&self.dirs, filename) {
            Ok(path) => {
                let value = file_io::read_file(&path)?;
                self.decode(&value, cfg)
            }
            Err(err) if err.is_file_not_found() && self.allow_no_file => {
                debug!("config file {filename} not found; continuing without it");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn decode(&self, value: &Value, cfg: &mut dyn Node) -> Result<(), Error> {
        let expanded;
        let value = if self.use_named_env {
            let mut copy = value.clone();
            utils::expand_named_env(&mut copy, self.env_source.as_ref());
            expanded = copy;
            &expanded
        } else {
            value
        };
        let coercer = Coercer::new(&self.time_layout);
        decode::Decoder::new(&self.tag, coercer, self.use_strict)
            .decode(value, cfg)
            .map_err(|err| {
                let (path, source) = err.into_located();
                let path = if path.is_empty() {
                    "root".to_string()
                } else {
                    path
                };
                Error::Decode { path, source }
            })
    }
}

/// Load `cfg` with default options.
pub fn load<T: Node>(cfg: &mut T) -> Result<(), Error> {
    Fig::default().load(cfg)
}

fn ensure_record(cfg: &dyn Node) -> Result<(), Error> {
    if cfg.kind() == Kind::Record {
        Ok(())
    } else {
        Err(Error::NotRecord {
            type_name: cfg.type_name(),
        })
    }
}
