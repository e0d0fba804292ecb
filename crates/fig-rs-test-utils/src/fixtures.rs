//! Pod fixture documents in every supported format, plus writers.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const POD_YAML: &str = r#"apiVersion: v1
kind: Pod
metadata:
  name: redis
  master: true
spec:
  containers:
    - name: redis
      image: redis:5.0.4
      command:
        - redis-server
        - /redis-master/redis.conf
      env:
        - name: MASTER
          value: "true"
      ports:
        - containerPort: 6379
      resources:
        limits:
          cpu: "0.1"
      volumeMounts:
        - mountPath: /redis-master-data
          name: data
        - mountPath: /redis-master
          name: config
  volumes:
    - name: data
    - name: config
      configMap:
        name: example-redis-config
        items:
          - key: redis-config
            path: redis.conf
"#;

pub const POD_JSON: &str = r#"{
  "apiVersion": "v1",
  "kind": "Pod",
  "metadata": {
    "name": "redis",
    "master": true
  },
  "spec": {
    "containers": [
      {
        "name": "redis",
        "image": "redis:5.0.4",
        "command": ["redis-server", "/redis-master/redis.conf"],
        "env": [{ "name": "MASTER", "value": "true" }],
        "ports": [{ "containerPort": 6379 }],
        "resources": { "limits": { "cpu": "0.1" } },
        "volumeMounts": [
          { "mountPath": "/redis-master-data", "name": "data" },
          { "mountPath": "/redis-master", "name": "config" }
        ]
      }
    ],
    "volumes": [
      { "name": "data" },
      {
        "name": "config",
        "configMap": {
          "name": "example-redis-config",
          "items": [{ "key": "redis-config", "path": "redis.conf" }]
        }
      }
    ]
  }
}
"#;

pub const POD_JSON5: &str = r#"{
  apiVersion: 'v1',
  kind: 'Pod',
  metadata: { name: 'redis', master: true },
  spec: {
    containers: [
      {
        name: 'redis',
        image: 'redis:5.0.4',
        command: ['redis-server', '/redis-master/redis.conf'],
        env: [{ name: 'MASTER', value: 'true' }],
        ports: [{ containerPort: 6379 }],
        resources: { limits: { cpu: '0.1' } },
        volumeMounts: [
          { mountPath: '/redis-master-data', name: 'data' },
          { mountPath: '/redis-master', name: 'config' },
        ],
      },
    ],
    volumes: [
      { name: 'data' },
      {
        name: 'config',
        configMap: {
          name: 'example-redis-config',
          items: [{ key: 'redis-config', path: 'redis.conf' }],
        },
      },
    ],
  },
}
"#;

pub const POD_TOML: &str = r#"apiVersion = "v1"
kind = "Pod"

[metadata]
name = "redis"
master = true

[[spec.containers]]
name = "redis"
image = "redis:5.0.4"
command = ["redis-server", "/redis-master/redis.conf"]

[[spec.containers.env]]
name = "MASTER"
value = "true"

[[spec.containers.ports]]
containerPort = 6379

[spec.containers.resources.limits]
cpu = "0.1"

[[spec.containers.volumeMounts]]
mountPath = "/redis-master-data"
name = "data"

[[spec.containers.volumeMounts]]
mountPath = "/redis-master"
name = "config"

[[spec.volumes]]
name = "data"

[[spec.volumes]]
name = "config"

[spec.volumes.configMap]
name = "example-redis-config"

[[spec.volumes.configMap.items]]
key = "redis-config"
path = "redis.conf"
"#;

/// Write `contents` to `dir/filename`, creating parent directories as needed.
pub fn write_fixture(dir: &Path, filename: &str, contents: &str) -> PathBuf {
    let path = dir.join(filename);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture dir");
    }
    fs::write(&path, contents).expect("write fixture");
    path
}

/// Temporary directory holding the given `(filename, contents)` fixtures.
pub fn fixture_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    for (filename, contents) in files {
        write_fixture(dir.path(), filename, contents);
    }
    dir
}
