//! Orphan cleaner
//!
//! Second sweep after the rewriter. Any claim volume still mounted at a
//! managed file path is dropped without a replacement, together with those
//! mounts. Also owns deletion of standalone claim manifests.

use super::rewriter::{removed, RemovedVolume};
use crate::manifest::{PodManifest, Volume};
use kubefold_common::{ClassificationRules, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Mount dropped by the sweep
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DroppedMount {
    pub volume: String,
    pub mount_path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub removed_volumes: Vec<RemovedVolume>,
    pub dropped_mounts: Vec<DroppedMount>,
}

impl CleanupReport {
    pub fn changed(&self) -> bool {
        !self.removed_volumes.is_empty() || !self.dropped_mounts.is_empty()
    }
}

pub struct OrphanCleaner<'a> {
    rules: &'a ClassificationRules,
}

impl<'a> OrphanCleaner<'a> {
    pub fn new(rules: &'a ClassificationRules) -> Self {
        Self { rules }
    }

    pub fn sweep(&self, manifest: &mut PodManifest) -> CleanupReport {
        let mut report = CleanupReport::default();

        for volume in manifest.find_volumes(Volume::is_persistent_volume_claim) {
            let managed_paths: Vec<String> = manifest
                .mounts_for(&volume.name)
                .into_iter()
                .filter(|m| m.file_name().and_then(|f| self.rules.classify(f)).is_some())
                .map(|m| m.mount_path)
                .collect();

            if managed_paths.is_empty() {
                continue;
            }

            warn!(
                "Claim volume '{}' still backs managed files {:?}; dropping them",
                volume.name, managed_paths
            );
            manifest.remove_mounts(&volume.name, &managed_paths);

            let mut seen: Vec<&String> = Vec::new();
            for path in &managed_paths {
                if !seen.contains(&path) {
                    seen.push(path);
                    report.dropped_mounts.push(DroppedMount {
                        volume: volume.name.clone(),
                        mount_path: path.clone(),
                    });
                }
            }

            if manifest.mounts_for(&volume.name).is_empty() {
                manifest.remove_volume(&volume.name);
                report.removed_volumes.push(removed(&volume));
            }
        }

        report
    }
}

/// Locator for standalone claim manifests, `<volume><suffix>.<ext>`
#[derive(Debug, Clone)]
pub struct ClaimArtifacts {
    dir: PathBuf,
    suffix: String,
    extensions: Vec<String>,
}

impl ClaimArtifacts {
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>, extensions: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
            extensions,
        }
    }

    /// Candidate paths for a volume, one per extension
    pub fn candidates(&self, volume_name: &str) -> Vec<PathBuf> {
        self.extensions
            .iter()
            .map(|ext| self.dir.join(format!("{}{}.{}", volume_name, self.suffix, ext)))
            .collect()
    }

    /// Existing artifact files for a volume
    pub fn existing(&self, volume_name: &str) -> Vec<PathBuf> {
        self.candidates(volume_name)
            .into_iter()
            .filter(|p| p.is_file())
            .collect()
    }

    /// Delete the artifacts of a volume. Missing files are not an error.
    pub fn delete(&self, volume_name: &str) -> Result<Vec<PathBuf>> {
        let mut deleted = Vec::new();
        for path in self.candidates(volume_name) {
            if remove_if_exists(&path)? {
                info!("Deleted claim artifact {}", path.display());
                deleted.push(path);
            }
        }
        Ok(deleted)
    }
}

fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> PodManifest {
        PodManifest::parse(Path::new("test-pod.yaml"), text).unwrap()
    }

    #[test]
    fn test_sweep_drops_leftover_managed_claim() {
        let mut manifest = parse(
            r#"kind: Pod
spec:
  containers:
    - name: a
      volumeMounts:
        - name: claim0
          mountPath: /etc/app.conf
  volumes:
    - name: claim0
      persistentVolumeClaim:
        claimName: claim0
"#,
        );
        let rules = ClassificationRules::default();

        let report = OrphanCleaner::new(&rules).sweep(&mut manifest);

        assert!(!manifest.has_volume("claim0"));
        assert!(manifest.mounts().is_empty());
        assert_eq!(report.removed_volumes.len(), 1);
        assert_eq!(report.dropped_mounts[0].mount_path, "/etc/app.conf");
        assert!(manifest.unresolved_mounts().is_empty());
    }

    #[test]
    fn test_sweep_leaves_unmanaged_claims() {
        let mut manifest = parse(
            r#"kind: Pod
spec:
  containers:
    - name: a
      volumeMounts:
        - name: data
          mountPath: /data
  volumes:
    - name: data
      persistentVolumeClaim:
        claimName: data
"#,
        );
        let rules = ClassificationRules::default();

        let report = OrphanCleaner::new(&rules).sweep(&mut manifest);

        assert!(!report.changed());
        assert!(manifest.has_volume("data"));
    }

    #[test]
    fn test_sweep_keeps_claim_still_mounted_elsewhere() {
        let mut manifest = parse(
            r#"kind: Pod
spec:
  containers:
    - name: a
      volumeMounts:
        - name: claim0
          mountPath: /etc/app.conf
        - name: claim0
          mountPath: /var/lib/app
  volumes:
    - name: claim0
      persistentVolumeClaim:
        claimName: claim0
"#,
        );
        let rules = ClassificationRules::default();

        let report = OrphanCleaner::new(&rules).sweep(&mut manifest);

        assert!(manifest.has_volume("claim0"));
        assert_eq!(manifest.mounts_for("claim0").len(), 1);
        assert_eq!(report.dropped_mounts.len(), 1);
        assert!(report.removed_volumes.is_empty());
    }

    #[test]
    fn test_claim_artifact_delete() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ClaimArtifacts::new(
            dir.path(),
            "-persistentvolumeclaim",
            vec!["yaml".to_string(), "yml".to_string()],
        );
        let path = dir.path().join("cfgvol-persistentvolumeclaim.yaml");
        std::fs::write(&path, "kind: PersistentVolumeClaim\n").unwrap();

        assert_eq!(artifacts.existing("cfgvol"), vec![path.clone()]);
        assert_eq!(artifacts.delete("cfgvol").unwrap(), vec![path.clone()]);
        assert!(!path.exists());

        // Second delete is a no-op
        assert!(artifacts.delete("cfgvol").unwrap().is_empty());
        assert!(artifacts.delete("never-existed").unwrap().is_empty());
    }
}
