//! Binding engine: env overlay, required checks and defaults.
//!
//! Every bindable field of the flattened tree goes through the same steps:
//! tag validation, env overlay, required check, default fill. A failing field
//! is recorded under its path and the pass continues with the next one.

use crate::coerce::Coercer;
use crate::env::{EnvSource, format_env_key};
use crate::error::{CoerceError, FieldError, FieldErrors};
use crate::flatten::{Field, FieldTree};
use crate::node::{Kind, Node};
use log::{debug, trace};

/// Env overlay settings.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EnvOverlay<'a> {
    pub(crate) source: &'a dyn EnvSource,
    pub(crate) prefix: &'a str,
}

/// One binding pass over a record.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Binder<'a> {
    tag_key: &'a str,
    coercer: Coercer<'a>,
    env: Option<EnvOverlay<'a>>,
}

impl<'a> Binder<'a> {
    pub(crate) fn new(tag_key: &'a str, coercer: Coercer<'a>) -> Self {
        Self {
            tag_key,
            coercer,
            env: None,
        }
    }

    pub(crate) fn with_env(mut self, source: &'a dyn EnvSource, prefix: &'a str) -> Self {
        self.env = Some(EnvOverlay { source, prefix });
        self
    }

    /// Bind every field of `root`, collecting per-field failures.
    pub(crate) fn process(&self, root: &mut dyn Node) -> FieldErrors {
        let tree = FieldTree::flatten(&*root, self.tag_key);
        let mut errors = FieldErrors::new();
        for (index, field) in tree.fields() {
            if let Err(err) = self.process_field(&tree, &mut *root, index, field) {
                trace!("field {} failed: {}", field.path, err);
                errors.insert(field.path.clone(), err);
            }
        }
        debug!(
            "binding pass complete (fields={}, errors={})",
            tree.len(),
            errors.len()
        );
        errors
    }

    fn process_field(
        &self,
        tree: &FieldTree,
        root: &mut dyn Node,
        index: usize,
        field: &Field,
    ) -> Result<(), FieldError> {
        if let Some(err) = &field.tag.error {
            return Err(FieldError::Tag(err.clone()));
        }
        if field.tag.required && field.tag.has_default() {
            return Err(FieldError::RequiredWithDefault);
        }

        let target = tree
            .resolve_mut(root, index)
            .ok_or(FieldError::Unreachable)?;

        if let Some(env) = self.env {
            let key = format_env_key(&field.path, env.prefix);
            if let Some(value) = env.source.lookup(&key) {
                debug!("setting {} from env {}", field.path, key);
                self.coercer
                    .set_value(target, &value)
                    .map_err(FieldError::Env)?;
            }
        }

        if field.tag.required && target.is_zero() {
            return Err(FieldError::Required);
        }

        if let Some(default) = &field.tag.default {
            if target.is_zero() {
                self.set_default(target, default)
                    .map_err(FieldError::Default)?;
            }
        }

        Ok(())
    }

    /// Defaults never target booleans: a `false` default is indistinguishable
    /// from an unset field.
    fn set_default(&self, target: &mut dyn Node, literal: &str) -> Result<(), CoerceError> {
        if target.kind() == Kind::Bool {
            return Err(CoerceError::Unsupported(Kind::Bool.name()));
        }
        self.coercer.set_value(target, literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn bind(root: &mut dyn Node) -> FieldErrors {
        Binder::new("fig", Coercer::default()).process(root)
    }

    fn bind_env(root: &mut dyn Node, env: &BTreeMap<String, String>, prefix: &str) -> FieldErrors {
        Binder::new("fig", Coercer::default())
            .with_env(env, prefix)
            .process(root)
    }

    #[derive(Debug, Default)]
    struct Required {
        pub a: String,
        pub b: Option<String>,
        pub c: RequiredInner,
        pub e: Vec<RequiredItem>,
    }

    #[derive(Debug, Default)]
    struct RequiredInner {
        pub d: i32,
    }

    #[derive(Debug, Default)]
    struct RequiredItem {
        pub f: String,
        pub g: String,
    }

    crate::record!(Required {
        pub a => r#"fig:"A" validate:"required""#,
        pub b => r#"fig:"B,required""#,
        pub c => r#"fig:"C""#,
        pub e => r#"fig:"E""#,
    });
    crate::record!(RequiredInner { pub d => r#"fig:"D" validate:"required""# });
    crate::record!(RequiredItem {
        pub f => r#"fig:"F" validate:"required""#,
        pub g => r#"fig:"G" validate:"required""#,
    });

    /// Every missing required field is reported under its own path.
    #[test]
    fn required_fields_enumerated() {
        let mut cfg = Required {
            e: vec![
                RequiredItem {
                    g: "set".to_string(),
                    ..RequiredItem::default()
                },
                RequiredItem {
                    f: "set".to_string(),
                    ..RequiredItem::default()
                },
            ],
            ..Required::default()
        };
        let errors = bind(&mut cfg);
        assert_eq!(
            errors.paths().collect::<Vec<_>>(),
            vec!["A", "B", "C.D", "E[0].F", "E[1].G"]
        );
        assert!(matches!(errors.get("C.D"), Some(FieldError::Required)));
    }

    /// A present optional holding a zero value still fails the check.
    #[test]
    fn required_derefs_present_optional() {
        let mut cfg = Required {
            a: "a".to_string(),
            b: Some(String::new()),
            c: RequiredInner { d: 1 },
            ..Required::default()
        };
        let errors = bind(&mut cfg);
        assert_eq!(errors.paths().collect::<Vec<_>>(), vec!["B"]);

        cfg.b = Some("b".to_string());
        assert!(bind(&mut cfg).is_empty());
    }

    #[derive(Debug, Default, PartialEq)]
    struct Server {
        pub host: String,
        pub port: u16,
        pub ports: Vec<u16>,
        pub cleanup: Duration,
        pub verbose: bool,
        pub retry: Option<bool>,
        pub points: Vec<i32>,
    }

    crate::record!(Server {
        pub host => r#"fig:"host" default:"127.0.0.1""#,
        pub port => r#"fig:"port,default=8000""#,
        pub ports => r#"fig:"ports,default=[80,443]""#,
        pub cleanup => r#"fig:"cleanup" default:"30m""#,
        pub verbose => r#"fig:"verbose""#,
        pub retry => r#"fig:"retry" default:"true""#,
        pub points => r#"fig:"points" default:"5,10,15""#,
    });

    #[test]
    fn defaults_fill_zero_fields() {
        let mut cfg = Server {
            port: 9000,
            ..Server::default()
        };
        let errors = bind(&mut cfg);
        assert!(errors.is_empty(), "{errors}");
        assert_eq!(
            cfg,
            Server {
                host: "127.0.0.1".to_string(),
                port: 9000,
                ports: vec![80, 443],
                cleanup: Duration::from_secs(30 * 60),
                verbose: false,
                retry: Some(true),
                points: vec![5, 10, 15],
            }
        );
    }

    /// Re-binding a fully populated record changes nothing.
    #[test]
    fn rebinding_is_idempotent() {
        let mut cfg = Server::default();
        assert!(bind(&mut cfg).is_empty());
        let snapshot = format!("{cfg:?}");
        assert!(bind(&mut cfg).is_empty());
        assert_eq!(format!("{cfg:?}"), snapshot);
    }

    #[derive(Debug, Default)]
    struct Flags {
        pub verbose: bool,
    }

    crate::record!(Flags {
        pub verbose => r#"fig:"verbose" default:"true""#,
    });

    #[test]
    fn bool_defaults_rejected() {
        let mut cfg = Flags::default();
        let errors = bind(&mut cfg);
        assert_eq!(
            errors.to_string(),
            "verbose: unable to set default: unsupported type bool"
        );
        assert!(!cfg.verbose);
    }

    #[derive(Debug, Default)]
    struct Conflict {
        pub x: i32,
        pub y: i32,
        pub z: i32,
    }

    crate::record!(Conflict {
        pub x => r#"fig:"x,required" default:"5""#,
        pub y => r#"fig:"y,default=5" validate:"required""#,
        pub z => r#"fig:"z,requird""#,
    });

    /// Tag conflicts are reported whatever the current value is.
    #[test]
    fn tag_conflicts_reported() {
        let mut cfg = Conflict {
            x: 7,
            ..Conflict::default()
        };
        let errors = bind(&mut cfg);
        assert_eq!(errors.len(), 3);
        assert!(matches!(
            errors.get("x"),
            Some(FieldError::RequiredWithDefault)
        ));
        assert!(matches!(
            errors.get("y"),
            Some(FieldError::RequiredWithDefault)
        ));
        assert_eq!(
            errors.get("z").map(ToString::to_string).as_deref(),
            Some("invalid tag value \"requird\"")
        );
        assert_eq!(cfg.x, 7);
        assert_eq!(cfg.y, 0);
    }

    #[derive(Debug, Default)]
    struct Auth {
        pub nested: Vec<Nested>,
    }

    #[derive(Debug, Default)]
    struct Nested {
        pub slice: Vec<Twice>,
    }

    #[derive(Debug, Default)]
    struct Twice {
        pub twice: String,
    }

    crate::record!(Auth { pub nested => "" });
    crate::record!(Nested { pub slice => "" });
    crate::record!(Twice { pub twice => "" });

    /// Env keys follow the path with indexers flattened into underscores.
    #[test]
    fn env_reaches_nested_elements() {
        let mut cfg = Auth {
            nested: vec![
                Nested::default(),
                Nested {
                    slice: vec![Twice::default(), Twice::default(), Twice::default()],
                },
            ],
        };
        let env = vars(&[("AUTH_S_NESTED_1_SLICE_2_TWICE", "yes")]);
        let errors = bind_env(&mut cfg, &env, "auth_s");
        assert!(errors.is_empty(), "{errors}");
        assert_eq!(cfg.nested[1].slice[2].twice, "yes");
        assert_eq!(cfg.nested[1].slice[0].twice, "");
    }

    #[derive(Debug, Default)]
    struct Logging {
        pub loggers: Vec<Logger>,
    }

    #[derive(Debug, Default)]
    struct Logger {
        pub log_level: String,
    }

    crate::record!(Logging { pub loggers => "" });
    crate::record!(Logger {
        pub log_level => r#"fig:"log_level" default:"info""#,
    });

    /// Env values land before defaults; untouched elements get defaults.
    #[test]
    fn env_then_defaults_per_element() {
        let mut cfg = Logging {
            loggers: vec![Logger::default(), Logger::default()],
        };
        let env = vars(&[("LOGGERS_0_LOG_LEVEL", "debug")]);
        assert!(bind_env(&mut cfg, &env, "").is_empty());
        assert_eq!(cfg.loggers[0].log_level, "debug");
        assert_eq!(cfg.loggers[1].log_level, "info");
    }

    /// Elements are never created from env alone.
    #[test]
    fn env_does_not_instantiate_elements() {
        let mut cfg = Logging::default();
        let env = vars(&[("LOGGERS_0_LOG_LEVEL", "debug")]);
        assert!(bind_env(&mut cfg, &env, "").is_empty());
        assert!(cfg.loggers.is_empty());
    }

    /// Env satisfies required checks and overrides existing values.
    #[test]
    fn env_overrides_and_satisfies_required() {
        let mut cfg = Required {
            a: "file".to_string(),
            c: RequiredInner { d: 1 },
            ..Required::default()
        };
        let env = vars(&[("APP_A", "env"), ("APP_B", "from-env")]);
        let errors = bind_env(&mut cfg, &env, "app");
        assert!(errors.is_empty(), "{errors}");
        assert_eq!(cfg.a, "env");
        assert_eq!(cfg.b.as_deref(), Some("from-env"));
    }

    #[test]
    fn env_parse_failure() {
        let mut cfg = Server::default();
        let env = vars(&[("PORT", "http"), ("PORTS", "1,2")]);
        let errors = bind_env(&mut cfg, &env, "");
        assert_eq!(
            errors.to_string(),
            "port: unable to set from env: invalid integer \"http\": invalid digit found in string"
        );
        assert_eq!(cfg.ports, vec![1, 2]);
    }

    #[derive(Debug, Default)]
    struct Outer {
        base: Base,
    }

    #[derive(Debug, Default)]
    struct Base {
        pub b: String,
    }

    crate::record!(Outer { #[embed] base => r#"fig:"A""# });
    crate::record!(Base { pub b => "" });

    #[test]
    fn env_reaches_embedded_members() {
        let mut cfg = Outer::default();
        let env = vars(&[("A_B", "embedded")]);
        assert!(bind_env(&mut cfg, &env, "").is_empty());
        assert_eq!(cfg.base.b, "embedded");
    }

    /// Env values aimed at records cannot be coerced.
    #[test]
    fn env_on_record_is_unsupported() {
        let mut cfg = Outer::default();
        let env = vars(&[("A", "x")]);
        let errors = bind_env(&mut cfg, &env, "");
        assert_eq!(
            errors.to_string(),
            "A: unable to set from env: unsupported type record"
        );
    }

    #[derive(Debug, Default)]
    struct Quotas {
        pub labels: BTreeMap<String, String>,
        pub limits: BTreeMap<String, Quota>,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Quota {
        pub name: String,
        pub max: u32,
    }

    crate::record!(Quotas {
        pub labels => r#"fig:"labels""#,
        pub limits => r#"fig:"limits""#,
    });
    crate::record!(Quota {
        pub name => r#"fig:"name" validate:"required""#,
        pub max => r#"fig:"max" default:"5""#,
    });

    /// Existing map entries are bound in key order: env reaches them by key,
    /// and required checks and defaults apply inside record values.
    #[test]
    fn map_entries_are_bound() {
        let mut cfg = Quotas::default();
        cfg.labels.insert("zone".to_string(), "eu".to_string());
        cfg.labels.insert("tier".to_string(), "gold".to_string());
        cfg.limits.insert("mem".to_string(), Quota { name: "m".to_string(), max: 0 });
        cfg.limits.insert("cpu".to_string(), Quota::default());

        assert_eq!(
            FieldTree::flatten(&cfg, "fig").paths(),
            vec![
                "labels",
                "labels[tier]",
                "labels[zone]",
                "limits",
                "limits[cpu]",
                "limits[cpu].name",
                "limits[cpu].max",
                "limits[mem]",
                "limits[mem].name",
                "limits[mem].max",
            ]
        );

        let env = vars(&[("LABELS_ZONE", "us"), ("LIMITS_MEM_MAX", "9"), ("LABELS_REGION", "x")]);
        let errors = bind_env(&mut cfg, &env, "");
        assert_eq!(errors.paths().collect::<Vec<_>>(), vec!["limits[cpu].name"]);
        assert!(matches!(errors.get("limits[cpu].name"), Some(FieldError::Required)));

        assert_eq!(cfg.labels.get("zone").map(String::as_str), Some("us"));
        assert_eq!(cfg.labels.get("tier").map(String::as_str), Some("gold"));
        assert!(!cfg.labels.contains_key("region"));
        assert_eq!(cfg.limits["cpu"].max, 5);
        assert_eq!(cfg.limits["mem"], Quota { name: "m".to_string(), max: 9 });
    }

    /// A default given twice is a tag error on that field.
    #[test]
    fn duplicate_default_is_reported() {
        #[derive(Debug, Default)]
        struct Twin {
            pub a: String,
        }
        crate::record!(Twin { pub a => r#"fig:"a,default=x" default:"y""# });

        let mut cfg = Twin::default();
        let errors = bind(&mut cfg);
        assert!(matches!(
            errors.get("a"),
            Some(FieldError::Tag(crate::tag::TagError::DuplicateDefault))
        ));
        assert_eq!(cfg.a, "");
    }
}
