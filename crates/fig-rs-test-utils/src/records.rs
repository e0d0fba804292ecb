//! A Kubernetes-style pod record exercising nesting, sequences of records,
//! optionals, defaults and required fields.

use std::time::Duration;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Pod {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: Spec,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Metadata {
    pub name: String,
    pub environments: Vec<String>,
    pub master: bool,
    pub max_percent_util: Option<f64>,
    pub retry: Duration,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Spec {
    pub containers: Vec<Container>,
    pub volumes: Vec<Option<Volume>>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub env: Vec<Env>,
    pub ports: Vec<Port>,
    pub resources: Resources,
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Env {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Port {
    pub container_port: i32,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Resources {
    pub limits: Limits,
    pub requests: Option<Requests>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Limits {
    pub cpu: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Requests {
    pub memory: String,
    pub cpu: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct VolumeMount {
    pub mount_path: String,
    pub name: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Volume {
    pub name: String,
    pub config_map: Option<ConfigMap>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigMap {
    pub name: String,
    pub items: Vec<Item>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Item {
    pub key: String,
    pub path: String,
}

fig::record!(Pod {
    pub api_version => r#"fig:"apiVersion" default:"v1""#,
    pub kind => r#"fig:"kind" validate:"required""#,
    pub metadata => r#"fig:"metadata""#,
    pub spec => r#"fig:"spec""#,
});

fig::record!(Metadata {
    pub name => r#"fig:"name""#,
    pub environments => r#"fig:"environments" default:"[dev,staging,prod]""#,
    pub master => r#"fig:"master" validate:"required""#,
    pub max_percent_util => r#"fig:"maxPercentUtil" default:"0.5""#,
    pub retry => r#"fig:"retry" default:"10s""#,
});

fig::record!(Spec {
    pub containers => r#"fig:"containers""#,
    pub volumes => r#"fig:"volumes""#,
});

fig::record!(Container {
    pub name => r#"fig:"name" validate:"required""#,
    pub image => r#"fig:"image" validate:"required""#,
    pub command => r#"fig:"command""#,
    pub env => r#"fig:"env""#,
    pub ports => r#"fig:"ports""#,
    pub resources => r#"fig:"resources""#,
    pub volume_mounts => r#"fig:"volumeMounts""#,
});

fig::record!(Env {
    pub name => r#"fig:"name""#,
    pub value => r#"fig:"value""#,
});

fig::record!(Port {
    pub container_port => r#"fig:"containerPort" validate:"required""#,
});

fig::record!(Resources {
    pub limits => r#"fig:"limits""#,
    pub requests => "",
});

fig::record!(Limits { pub cpu => r#"fig:"cpu""# });

fig::record!(Requests {
    pub memory => r#"fig:"memory" default:"64Mi""#,
    pub cpu => r#"fig:"cpu" default:"250m""#,
});

fig::record!(VolumeMount {
    pub mount_path => r#"fig:"mountPath" validate:"required""#,
    pub name => r#"fig:"name" validate:"required""#,
});

fig::record!(Volume {
    pub name => r#"fig:"name" validate:"required""#,
    pub config_map => r#"fig:"configMap""#,
});

fig::record!(ConfigMap {
    pub name => r#"fig:"name" validate:"required""#,
    pub items => r#"fig:"items" validate:"required""#,
});

fig::record!(Item {
    pub key => r#"fig:"key" validate:"required""#,
    pub path => r#"fig:"path" validate:"required""#,
});

/// The pod every fixture document describes, after defaults are applied.
pub fn valid_pod() -> Pod {
    Pod {
        api_version: "v1".to_string(),
        kind: "Pod".to_string(),
        metadata: Metadata {
            name: "redis".to_string(),
            environments: vec!["dev".to_string(), "staging".to_string(), "prod".to_string()],
            master: true,
            max_percent_util: Some(0.5),
            retry: Duration::from_secs(10),
        },
        spec: Spec {
            containers: vec![Container {
                name: "redis".to_string(),
                image: "redis:5.0.4".to_string(),
                command: vec![
                    "redis-server".to_string(),
                    "/redis-master/redis.conf".to_string(),
                ],
                env: vec![Env {
                    name: "MASTER".to_string(),
                    value: "true".to_string(),
                }],
                ports: vec![Port {
                    container_port: 6379,
                }],
                resources: Resources {
                    limits: Limits {
                        cpu: "0.1".to_string(),
                    },
                    requests: None,
                },
                volume_mounts: vec![
                    VolumeMount {
                        mount_path: "/redis-master-data".to_string(),
                        name: "data".to_string(),
                    },
                    VolumeMount {
                        mount_path: "/redis-master".to_string(),
                        name: "config".to_string(),
                    },
                ],
            }],
            volumes: vec![
                Some(Volume {
                    name: "data".to_string(),
                    config_map: None,
                }),
                Some(Volume {
                    name: "config".to_string(),
                    config_map: Some(ConfigMap {
                        name: "example-redis-config".to_string(),
                        items: vec![Item {
                            key: "redis-config".to_string(),
                            path: "redis.conf".to_string(),
                        }],
                    }),
                }),
            ],
        },
    }
}
