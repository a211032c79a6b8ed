//! Typed views over pod spec `volumes` and `volumeMounts` entries

use kubefold_common::{ManagedKind, ManagedTarget};
use serde::Serialize;
use serde_yaml::{Mapping, Value};

/// Where a volume's content comes from
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum VolumeSource {
    PersistentVolumeClaim { claim_name: String },
    ConfigMap { name: String },
    Secret { secret_name: String },
    /// emptyDir, hostPath, projected, ... passed through untouched
    Other,
}

/// A named entry of the pod spec's `volumes` list
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Volume {
    pub name: String,
    pub source: VolumeSource,
}

impl Volume {
    pub fn config_map(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: VolumeSource::ConfigMap { name: name.clone() },
            name,
        }
    }

    pub fn secret(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: VolumeSource::Secret {
                secret_name: name.clone(),
            },
            name,
        }
    }

    pub fn persistent_volume_claim(name: impl Into<String>, claim_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: VolumeSource::PersistentVolumeClaim {
                claim_name: claim_name.into(),
            },
        }
    }

    /// Replacement volume serving a managed file
    pub fn from_target(target: &ManagedTarget) -> Self {
        match target.kind {
            ManagedKind::ConfigMap => Self::config_map(&target.name),
            ManagedKind::Secret => Self::secret(&target.name),
        }
    }

    pub fn is_persistent_volume_claim(&self) -> bool {
        matches!(self.source, VolumeSource::PersistentVolumeClaim { .. })
    }

    /// Read a volume entry. Entries without a string `name` are not volumes.
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_mapping()?;
        let name = map.get("name")?.as_str()?.to_string();

        let nested = |key: &str, field: &str| {
            map.get(key)
                .and_then(|v| v.get(field))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let source = if map.contains_key("persistentVolumeClaim") {
            VolumeSource::PersistentVolumeClaim {
                claim_name: nested("persistentVolumeClaim", "claimName").unwrap_or_default(),
            }
        } else if map.contains_key("configMap") {
            VolumeSource::ConfigMap {
                name: nested("configMap", "name").unwrap_or_default(),
            }
        } else if map.contains_key("secret") {
            VolumeSource::Secret {
                secret_name: nested("secret", "secretName").unwrap_or_default(),
            }
        } else {
            VolumeSource::Other
        };

        Some(Self { name, source })
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        map.insert("name".into(), self.name.clone().into());

        let single = |key: &str, value: &str| {
            let mut inner = Mapping::new();
            inner.insert(key.into(), value.into());
            Value::Mapping(inner)
        };

        match &self.source {
            VolumeSource::PersistentVolumeClaim { claim_name } => {
                map.insert("persistentVolumeClaim".into(), single("claimName", claim_name.as_str()));
            }
            VolumeSource::ConfigMap { name } => {
                map.insert("configMap".into(), single("name", name.as_str()));
            }
            VolumeSource::Secret { secret_name } => {
                map.insert("secret".into(), single("secretName", secret_name.as_str()));
            }
            VolumeSource::Other => {}
        }

        Value::Mapping(map)
    }
}

/// Which container list of the pod spec a mount lives in
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ContainerGroup {
    Containers,
    InitContainers,
}

impl ContainerGroup {
    /// Enumeration order: regular containers first
    pub const ALL: [ContainerGroup; 2] = [ContainerGroup::Containers, ContainerGroup::InitContainers];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Containers => "containers",
            Self::InitContainers => "initContainers",
        }
    }
}

/// Stable address of one `volumeMounts` entry
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct MountLocation {
    pub group: ContainerGroup,
    pub container: usize,
    pub mount: usize,
}

/// A container's `volumeMounts` entry
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VolumeMount {
    pub location: MountLocation,
    pub container_name: String,
    pub volume_name: String,
    pub mount_path: String,
    pub sub_path: Option<String>,
}

impl VolumeMount {
    pub(crate) fn from_value(value: &Value, location: MountLocation, container_name: &str) -> Option<Self> {
        let map = value.as_mapping()?;
        Some(Self {
            location,
            container_name: container_name.to_string(),
            volume_name: map.get("name")?.as_str()?.to_string(),
            mount_path: map
                .get("mountPath")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            sub_path: map.get("subPath").and_then(Value::as_str).map(str::to_string),
        })
    }

    /// Last path component of the mount path, if any
    pub fn file_name(&self) -> Option<&str> {
        self.mount_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }
}
