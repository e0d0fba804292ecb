//! Test helpers shared across fig-rs tests: sample records and fixture files.

pub mod fixtures;
pub mod records;

pub use fixtures::{POD_JSON, POD_JSON5, POD_TOML, POD_YAML, fixture_dir, write_fixture};
pub use records::{
    ConfigMap, Container, Env, Item, Limits, Metadata, Pod, Port, Requests, Resources, Spec,
    Volume, VolumeMount, valid_pod,
};
