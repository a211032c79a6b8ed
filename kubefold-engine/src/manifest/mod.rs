//! Pod manifest document model
//!
//! Wraps a YAML document and exposes typed find/mutate operations on the pod
//! spec's `volumes` and the containers' `volumeMounts`. The underlying tree
//! keeps key order, so every field the rewrite does not touch is written back
//! exactly where it was.

pub mod volume;

pub use volume::{ContainerGroup, MountLocation, Volume, VolumeMount, VolumeSource};

use kubefold_common::{Error, Result};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Kinds whose pod spec lives at `spec.template.spec`
const TEMPLATED_KINDS: &[&str] = &[
    "Deployment",
    "StatefulSet",
    "DaemonSet",
    "ReplicaSet",
    "ReplicationController",
    "Job",
];

const POD_SPEC_PATH: &[&str] = &["spec"];
const TEMPLATE_SPEC_PATH: &[&str] = &["spec", "template", "spec"];
const CRONJOB_SPEC_PATH: &[&str] = &["spec", "jobTemplate", "spec", "template", "spec"];

/// One pod-bearing manifest document
#[derive(Debug, Clone)]
pub struct PodManifest {
    source: PathBuf,
    kind: String,
    document: Value,
    spec_path: &'static [&'static str],
}

impl PodManifest {
    /// Read and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(path, &text)
    }

    /// Parse manifest text. `source` is only used for error reporting and
    /// as the default save location.
    pub fn parse(source: &Path, text: &str) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedManifest {
            path: source.to_path_buf(),
            reason,
        };

        let document: Value = serde_yaml::from_str(text).map_err(|e| malformed(e.to_string()))?;
        if !document.is_mapping() {
            return Err(malformed("document is not a mapping".to_string()));
        }

        let kind = document
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or("Pod")
            .to_string();

        let spec_path = match kind.as_str() {
            "Pod" => POD_SPEC_PATH,
            "CronJob" => CRONJOB_SPEC_PATH,
            k if TEMPLATED_KINDS.contains(&k) => TEMPLATE_SPEC_PATH,
            other => return Err(malformed(format!("unsupported kind '{}'", other))),
        };

        let manifest = Self {
            source: source.to_path_buf(),
            kind,
            document,
            spec_path,
        };
        manifest.check_shape().map_err(malformed)?;

        Ok(manifest)
    }

    /// Validate the parts of the pod spec the model reads
    fn check_shape(&self) -> std::result::Result<(), String> {
        let spec = self
            .pod_spec()
            .ok_or_else(|| format!("missing pod spec at '{}'", self.spec_path.join(".")))?;

        if let Some(volumes) = spec.get("volumes") {
            let volumes = volumes
                .as_sequence()
                .ok_or_else(|| "'volumes' is not a list".to_string())?;
            for (i, volume) in volumes.iter().enumerate() {
                if Volume::from_value(volume).is_none() {
                    return Err(format!("volume #{} has no name", i));
                }
            }
        }

        for group in ContainerGroup::ALL {
            let Some(containers) = spec.get(group.key()) else {
                continue;
            };
            let containers = containers
                .as_sequence()
                .ok_or_else(|| format!("'{}' is not a list", group.key()))?;

            for (c, container) in containers.iter().enumerate() {
                let Some(mounts) = container.get("volumeMounts") else {
                    continue;
                };
                let mounts = mounts
                    .as_sequence()
                    .ok_or_else(|| format!("{}[{}].volumeMounts is not a list", group.key(), c))?;
                for (m, mount) in mounts.iter().enumerate() {
                    if mount.get("name").and_then(Value::as_str).is_none() {
                        return Err(format!("{}[{}].volumeMounts[{}] has no name", group.key(), c, m));
                    }
                }
            }
        }

        Ok(())
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Name from `metadata.name`, if present
    pub fn name(&self) -> Option<&str> {
        self.document
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
    }

    fn pod_spec(&self) -> Option<&Mapping> {
        let mut node = &self.document;
        for key in self.spec_path {
            node = node.get(*key)?;
        }
        node.as_mapping()
    }

    fn pod_spec_mut(&mut self) -> Option<&mut Mapping> {
        let mut node = &mut self.document;
        for key in self.spec_path {
            node = node.get_mut(*key)?;
        }
        node.as_mapping_mut()
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// All volumes in declaration order
    pub fn volumes(&self) -> Vec<Volume> {
        self.pod_spec()
            .and_then(|spec| spec.get("volumes"))
            .and_then(Value::as_sequence)
            .map(|seq| seq.iter().filter_map(Volume::from_value).collect())
            .unwrap_or_default()
    }

    pub fn volume(&self, name: &str) -> Option<Volume> {
        self.volumes().into_iter().find(|v| v.name == name)
    }

    pub fn has_volume(&self, name: &str) -> bool {
        self.volume(name).is_some()
    }

    pub fn find_volumes<F>(&self, predicate: F) -> Vec<Volume>
    where
        F: Fn(&Volume) -> bool,
    {
        self.volumes().into_iter().filter(|v| predicate(v)).collect()
    }

    /// All mounts: container order, then mount declaration order. Regular
    /// containers come before init containers.
    pub fn mounts(&self) -> Vec<VolumeMount> {
        let Some(spec) = self.pod_spec() else {
            return Vec::new();
        };

        let mut mounts = Vec::new();
        for group in ContainerGroup::ALL {
            let Some(containers) = spec.get(group.key()).and_then(Value::as_sequence) else {
                continue;
            };

            for (c, container) in containers.iter().enumerate() {
                let container_name = container
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let Some(entries) = container.get("volumeMounts").and_then(Value::as_sequence) else {
                    continue;
                };

                for (m, entry) in entries.iter().enumerate() {
                    let location = MountLocation {
                        group,
                        container: c,
                        mount: m,
                    };
                    if let Some(mount) = VolumeMount::from_value(entry, location, container_name) {
                        mounts.push(mount);
                    }
                }
            }
        }
        mounts
    }

    /// Mounts referencing the named volume
    pub fn mounts_for(&self, volume_name: &str) -> Vec<VolumeMount> {
        self.mounts()
            .into_iter()
            .filter(|m| m.volume_name == volume_name)
            .collect()
    }

    /// Mounts whose volume name does not resolve to a declared volume
    pub fn unresolved_mounts(&self) -> Vec<VolumeMount> {
        let volumes = self.volumes();
        self.mounts()
            .into_iter()
            .filter(|m| !volumes.iter().any(|v| v.name == m.volume_name))
            .collect()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append a volume. Returns false (and changes nothing) if a volume with
    /// the same name already exists.
    pub fn add_volume(&mut self, volume: &Volume) -> bool {
        if self.has_volume(&volume.name) {
            return false;
        }
        let Some(spec) = self.pod_spec_mut() else {
            return false;
        };

        let volumes = spec
            .entry("volumes".into())
            .or_insert_with(|| Value::Sequence(Vec::new()));
        if volumes.is_null() {
            *volumes = Value::Sequence(Vec::new());
        }
        match volumes.as_sequence_mut() {
            Some(seq) => {
                seq.push(volume.to_value());
                true
            }
            None => false,
        }
    }

    /// Remove a volume by name. Returns false if it was not present.
    pub fn remove_volume(&mut self, name: &str) -> bool {
        let Some(seq) = self
            .pod_spec_mut()
            .and_then(|spec| spec.get_mut("volumes"))
            .and_then(Value::as_sequence_mut)
        else {
            return false;
        };

        let before = seq.len();
        seq.retain(|v| v.get("name").and_then(Value::as_str) != Some(name));
        seq.len() != before
    }

    /// Rename a volume and every mount referencing it. The volume keeps its
    /// position and source. Returns false if it was not present.
    pub fn rename_volume(&mut self, from: &str, to: &str) -> bool {
        let locations: Vec<MountLocation> = self.mounts_for(from).into_iter().map(|m| m.location).collect();

        let Some(entry) = self
            .pod_spec_mut()
            .and_then(|spec| spec.get_mut("volumes"))
            .and_then(Value::as_sequence_mut)
            .and_then(|seq| {
                seq.iter_mut()
                    .find(|v| v.get("name").and_then(Value::as_str) == Some(from))
            })
            .and_then(Value::as_mapping_mut)
        else {
            return false;
        };
        entry.insert("name".into(), to.into());

        for location in &locations {
            self.set_mount_volume(location, to);
        }
        true
    }

    fn mount_entry_mut(&mut self, location: &MountLocation) -> Option<&mut Mapping> {
        self.pod_spec_mut()?
            .get_mut(location.group.key())?
            .as_sequence_mut()?
            .get_mut(location.container)?
            .get_mut("volumeMounts")?
            .as_sequence_mut()?
            .get_mut(location.mount)?
            .as_mapping_mut()
    }

    /// Point a mount at another volume
    pub fn set_mount_volume(&mut self, location: &MountLocation, volume_name: &str) -> bool {
        match self.mount_entry_mut(location) {
            Some(entry) => {
                entry.insert("name".into(), volume_name.into());
                true
            }
            None => false,
        }
    }

    /// Set (or replace) a mount's `subPath`
    pub fn set_mount_sub_path(&mut self, location: &MountLocation, sub_path: &str) -> bool {
        match self.mount_entry_mut(location) {
            Some(entry) => {
                entry.insert("subPath".into(), sub_path.into());
                true
            }
            None => false,
        }
    }

    /// Drop every mount of `volume_name` whose path is in `mount_paths`.
    /// Returns the number of mounts removed.
    pub fn remove_mounts(&mut self, volume_name: &str, mount_paths: &[String]) -> usize {
        let Some(spec) = self.pod_spec_mut() else {
            return 0;
        };

        let mut removed = 0;
        for group in ContainerGroup::ALL {
            let Some(containers) = spec.get_mut(group.key()).and_then(Value::as_sequence_mut) else {
                continue;
            };
            for container in containers.iter_mut() {
                let Some(entries) = container
                    .get_mut("volumeMounts")
                    .and_then(Value::as_sequence_mut)
                else {
                    continue;
                };
                let before = entries.len();
                entries.retain(|entry| {
                    let name = entry.get("name").and_then(Value::as_str);
                    let path = entry.get("mountPath").and_then(Value::as_str).unwrap_or_default();
                    !(name == Some(volume_name) && mount_paths.iter().any(|p| p == path))
                });
                removed += before - entries.len();
            }
        }
        removed
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.document)?)
    }

    /// Write back to the file the manifest was loaded from
    pub fn save(&self) -> Result<()> {
        self.save_to(&self.source)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POD: &str = r#"apiVersion: v1
kind: Pod
metadata:
  labels:
    io.kompose.service: web
  name: web
spec:
  containers:
    - image: nginx:1.25
      name: web
      env:
        - name: MODE
          value: prod
      volumeMounts:
        - mountPath: /etc/nginx/nginx.conf
          name: web-claim0
        - mountPath: /data/output.log
          name: web-claim1
  restartPolicy: Never
  volumes:
    - name: web-claim0
      persistentVolumeClaim:
        claimName: web-claim0
    - name: web-claim1
      persistentVolumeClaim:
        claimName: web-claim1
    - name: scratch
      emptyDir: {}
"#;

    fn pod() -> PodManifest {
        PodManifest::parse(Path::new("web-pod.yaml"), POD).unwrap()
    }

    #[test]
    fn test_parse_reads_volumes_and_mounts() {
        let manifest = pod();
        assert_eq!(manifest.kind(), "Pod");
        assert_eq!(manifest.name(), Some("web"));

        let volumes = manifest.volumes();
        assert_eq!(volumes.len(), 3);
        assert_eq!(volumes[0], Volume::persistent_volume_claim("web-claim0", "web-claim0"));
        assert_eq!(volumes[2].source, VolumeSource::Other);

        let mounts = manifest.mounts_for("web-claim0");
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].mount_path, "/etc/nginx/nginx.conf");
        assert_eq!(mounts[0].container_name, "web");
        assert!(manifest.unresolved_mounts().is_empty());
    }

    #[test]
    fn test_find_volumes_by_predicate() {
        let manifest = pod();
        let pvcs = manifest.find_volumes(Volume::is_persistent_volume_claim);
        assert_eq!(pvcs.len(), 2);
    }

    #[test]
    fn test_malformed_input() {
        let err = PodManifest::parse(Path::new("bad-pod.yaml"), "spec: [unclosed").unwrap_err();
        assert_eq!(err.kind(), "MalformedManifest");

        let err = PodManifest::parse(Path::new("list-pod.yaml"), "- a\n- b\n").unwrap_err();
        assert_eq!(err.kind(), "MalformedManifest");

        let err = PodManifest::parse(Path::new("svc.yaml"), "kind: Service\nspec: {}\n").unwrap_err();
        assert_eq!(err.kind(), "MalformedManifest");

        let err = PodManifest::parse(
            Path::new("x-pod.yaml"),
            "kind: Pod\nspec:\n  containers:\n    - name: a\n      volumeMounts:\n        - mountPath: /x\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("has no name"));
    }

    #[test]
    fn test_add_volume_is_idempotent() {
        let mut manifest = pod();
        assert!(manifest.add_volume(&Volume::config_map("nginx-config")));
        assert!(!manifest.add_volume(&Volume::config_map("nginx-config")));
        assert_eq!(manifest.volumes().len(), 4);
        assert_eq!(manifest.volumes()[3].name, "nginx-config");
    }

    #[test]
    fn test_add_volume_creates_list() {
        let mut manifest = PodManifest::parse(
            Path::new("bare-pod.yaml"),
            "kind: Pod\nspec:\n  containers:\n    - name: a\n      image: busybox\n",
        )
        .unwrap();
        assert!(manifest.add_volume(&Volume::secret("tls-key-secret")));
        assert_eq!(manifest.volumes(), vec![Volume::secret("tls-key-secret")]);
    }

    #[test]
    fn test_remove_volume() {
        let mut manifest = pod();
        assert!(manifest.remove_volume("web-claim0"));
        assert!(!manifest.remove_volume("web-claim0"));
        assert!(!manifest.has_volume("web-claim0"));
        assert_eq!(manifest.unresolved_mounts().len(), 1);
    }

    #[test]
    fn test_rename_volume_follows_mounts() {
        let mut manifest = pod();
        assert!(manifest.rename_volume("web-claim0", "web-data"));
        assert!(!manifest.rename_volume("web-claim0", "other"));

        assert_eq!(
            manifest.volumes()[0],
            Volume::persistent_volume_claim("web-data", "web-claim0")
        );
        assert!(manifest.mounts_for("web-claim0").is_empty());
        assert_eq!(manifest.mounts_for("web-data")[0].mount_path, "/etc/nginx/nginx.conf");
        assert!(manifest.unresolved_mounts().is_empty());
    }

    #[test]
    fn test_mount_mutation_preserves_other_fields() {
        let mut manifest = pod();
        let location = manifest.mounts_for("web-claim0")[0].location;
        manifest.add_volume(&Volume::config_map("nginx-config"));
        assert!(manifest.set_mount_volume(&location, "nginx-config"));
        assert!(manifest.set_mount_sub_path(&location, "nginx.conf"));
        manifest.remove_volume("web-claim0");

        let mounts = manifest.mounts_for("nginx-config");
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].sub_path.as_deref(), Some("nginx.conf"));
        assert_eq!(mounts[0].mount_path, "/etc/nginx/nginx.conf");

        let yaml = manifest.to_yaml().unwrap();
        assert!(yaml.contains("io.kompose.service: web"));
        assert!(yaml.contains("nginx:1.25"));
        assert!(yaml.contains("value: prod"));
        assert!(yaml.contains("restartPolicy: Never"));
        assert!(yaml.find("apiVersion").unwrap() < yaml.find("metadata").unwrap());
        assert!(yaml.find("metadata").unwrap() < yaml.find("spec").unwrap());
    }

    #[test]
    fn test_remove_mounts() {
        let mut manifest = pod();
        let removed = manifest.remove_mounts("web-claim1", &["/data/output.log".to_string()]);
        assert_eq!(removed, 1);
        assert!(manifest.mounts_for("web-claim1").is_empty());
        assert_eq!(manifest.mounts().len(), 1);
    }

    #[test]
    fn test_deployment_template_spec() {
        let text = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: api
spec:
  replicas: 1
  template:
    spec:
      initContainers:
        - name: init
          volumeMounts:
            - mountPath: /seed/app.ini
              name: seed
      containers:
        - name: api
          volumeMounts:
            - mountPath: /etc/api/app.ini
              name: seed
      volumes:
        - name: seed
          persistentVolumeClaim:
            claimName: seed
"#;
        let manifest = PodManifest::parse(Path::new("api-deployment.yaml"), text).unwrap();
        let mounts = manifest.mounts_for("seed");
        assert_eq!(mounts.len(), 2);
        // Regular containers are enumerated before init containers.
        assert_eq!(mounts[0].location.group, ContainerGroup::Containers);
        assert_eq!(mounts[1].location.group, ContainerGroup::InitContainers);
    }
}
