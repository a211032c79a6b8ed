//! Volume rewriter
//!
//! Replaces PersistentVolumeClaim-backed volumes that carry a single config
//! or credential file with the matching ConfigMap or Secret volume, and
//! rewires every mount of that file to the new volume through `subPath`.

use crate::manifest::{PodManifest, Volume, VolumeMount};
use kubefold_common::ClassificationRules;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Volume dropped from a manifest
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RemovedVolume {
    pub name: String,
    pub claim_name: String,
}

/// Mount moved from a claim volume to a ConfigMap/Secret volume
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RewiredMount {
    pub container: String,
    pub mount_path: String,
    pub from_volume: String,
    pub to_volume: String,
    pub sub_path: String,
}

/// Claim volume moved aside so a replacement can take its name
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RenamedVolume {
    pub from: String,
    pub to: String,
}

/// Mount the rewriter left alone and why
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedMount {
    pub container: String,
    pub volume: String,
    pub mount_path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RewriteReport {
    pub added_volumes: Vec<Volume>,
    pub removed_volumes: Vec<RemovedVolume>,
    pub rewired_mounts: Vec<RewiredMount>,
    pub skipped_mounts: Vec<SkippedMount>,
    pub renamed_volumes: Vec<RenamedVolume>,
    /// Claim volumes kept because unmanaged paths still mount them
    pub retained_volumes: Vec<String>,
}

impl RewriteReport {
    pub fn changed(&self) -> bool {
        !self.added_volumes.is_empty()
            || !self.removed_volumes.is_empty()
            || !self.rewired_mounts.is_empty()
    }
}

pub struct VolumeRewriter<'a> {
    rules: &'a ClassificationRules,
}

impl<'a> VolumeRewriter<'a> {
    pub fn new(rules: &'a ClassificationRules) -> Self {
        Self { rules }
    }

    /// Rewrite every claim-backed volume of the manifest in place.
    ///
    /// Volumes are visited in declaration order and their mounts in container
    /// then mount order. Running the rewriter on its own output changes
    /// nothing.
    pub fn rewrite(&self, manifest: &mut PodManifest) -> RewriteReport {
        let mut report = RewriteReport::default();

        for volume in manifest.find_volumes(Volume::is_persistent_volume_claim) {
            self.rewrite_volume(manifest, &volume, &mut report);
        }

        report
    }

    fn rewrite_volume(&self, manifest: &mut PodManifest, volume: &Volume, report: &mut RewriteReport) {
        let mounts = manifest.mounts_for(&volume.name);

        let mut paths: Vec<&str> = Vec::new();
        for mount in &mounts {
            if !paths.contains(&mount.mount_path.as_str()) {
                paths.push(&mount.mount_path);
            }
        }

        let mut matched = false;
        let mut replaced_in_place = false;
        // Name the claim volume currently has in the manifest
        let mut current = volume.name.clone();

        for path in paths {
            let at_path: Vec<&VolumeMount> = mounts.iter().filter(|m| m.mount_path == path).collect();
            let first = at_path[0];

            let Some(file_name) = first.file_name() else {
                warn!(
                    "Skipping mount of volume '{}' in container '{}': empty mount path",
                    volume.name, first.container_name
                );
                report.skipped_mounts.push(skipped(first, "empty mount path"));
                continue;
            };

            let Some(target) = self.rules.classify(file_name) else {
                debug!("Mount path '{}' of volume '{}' is not managed", path, volume.name);
                continue;
            };

            let replacement = Volume::from_target(&target);
            match manifest.volume(&target.name) {
                Some(existing) if existing == replacement => {}
                Some(existing) if existing.name == current && self.serves_only(&mounts, &target.name) => {
                    // The claim volume already carries the target's name and
                    // backs nothing else.
                    manifest.remove_volume(&current);
                    manifest.add_volume(&replacement);
                    report.removed_volumes.push(removed(volume));
                    report.added_volumes.push(replacement);
                    replaced_in_place = true;
                }
                Some(existing) if existing.name == current => {
                    // Other paths still need the claim; move it aside.
                    let renamed = free_volume_name(manifest, &current);
                    manifest.rename_volume(&current, &renamed);
                    info!("Renamed claim volume '{}' to '{}'", current, renamed);
                    report.renamed_volumes.push(RenamedVolume {
                        from: current.clone(),
                        to: renamed.clone(),
                    });
                    current = renamed;

                    manifest.add_volume(&replacement);
                    info!("Added {} volume '{}'", target.kind, target.name);
                    report.added_volumes.push(replacement);
                }
                Some(existing) => {
                    warn!(
                        "Cannot rewrite '{}' of volume '{}': volume '{}' already exists with a different source",
                        path, volume.name, existing.name
                    );
                    for mount in &at_path {
                        report.skipped_mounts.push(skipped(
                            mount,
                            &format!("volume name '{}' already taken", existing.name),
                        ));
                    }
                    continue;
                }
                None => {
                    manifest.add_volume(&replacement);
                    info!("Added {} volume '{}'", target.kind, target.name);
                    report.added_volumes.push(replacement);
                }
            }

            matched = true;
            for mount in at_path {
                manifest.set_mount_volume(&mount.location, &target.name);
                manifest.set_mount_sub_path(&mount.location, &target.file_name);
                report.rewired_mounts.push(RewiredMount {
                    container: mount.container_name.clone(),
                    mount_path: mount.mount_path.clone(),
                    from_volume: volume.name.clone(),
                    to_volume: target.name.clone(),
                    sub_path: target.file_name.clone(),
                });
            }
        }

        if !matched || replaced_in_place {
            return;
        }

        if manifest.mounts_for(&current).is_empty() {
            manifest.remove_volume(&current);
            info!("Removed claim volume '{}'", current);
            report.removed_volumes.push(removed(volume));
        } else {
            warn!("Keeping claim volume '{}': still mounted at unmanaged paths", current);
            report.retained_volumes.push(current);
        }
    }

    /// Whether every mount classifies to the named target
    fn serves_only(&self, mounts: &[VolumeMount], target_name: &str) -> bool {
        mounts.iter().all(|m| {
            m.file_name()
                .and_then(|f| self.rules.classify(f))
                .is_some_and(|t| t.name == target_name)
        })
    }
}

/// `<name>-claim`, or `<name>-claim-N` if that is taken too
fn free_volume_name(manifest: &PodManifest, name: &str) -> String {
    let mut candidate = format!("{}-claim", name);
    let mut n = 2;
    while manifest.has_volume(&candidate) {
        candidate = format!("{}-claim-{}", name, n);
        n += 1;
    }
    candidate
}

pub(crate) fn removed(volume: &Volume) -> RemovedVolume {
    let claim_name = match &volume.source {
        crate::manifest::VolumeSource::PersistentVolumeClaim { claim_name } => claim_name.clone(),
        _ => String::new(),
    };
    RemovedVolume {
        name: volume.name.clone(),
        claim_name,
    }
}

fn skipped(mount: &VolumeMount, reason: &str) -> SkippedMount {
    SkippedMount {
        container: mount.container_name.clone(),
        volume: mount.volume_name.clone(),
        mount_path: mount.mount_path.clone(),
        reason: reason.to_string(),
    }
}
