//! Compose folder discovery

use crate::config::DiscoveryConfig;
use kubefold_common::{ClassificationRules, Error, ManagedTarget, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A folder holding a compose source
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ComposeFolder {
    pub dir: PathBuf,
    pub compose_file: PathBuf,
}

/// A config or credential file sitting next to a compose source
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ManagedFile {
    pub path: PathBuf,
    pub target: ManagedTarget,
}

/// Find every folder under `root` containing a compose file. When a folder
/// holds several, the earliest name in `compose_file_names` wins.
pub fn discover(root: &Path, config: &DiscoveryConfig, output_dir_name: &str) -> Result<Vec<ComposeFolder>> {
    let skip = |entry: &DirEntry| {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry.file_name().to_str().is_some_and(|name| {
                name == output_dir_name || config.skip_dirs.iter().any(|s| s == name)
            })
    };

    // folder -> best (lowest) preference index seen so far
    let mut found: BTreeMap<PathBuf, usize> = BTreeMap::new();
    for entry in WalkDir::new(root)
        .max_depth(config.max_depth)
        .into_iter()
        .filter_entry(|e| !skip(e))
    {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let Some(rank) = config.compose_file_names.iter().position(|n| n == name) else {
            continue;
        };
        let Some(dir) = entry.path().parent() else {
            continue;
        };

        found
            .entry(dir.to_path_buf())
            .and_modify(|best| *best = (*best).min(rank))
            .or_insert(rank);
    }

    Ok(found
        .into_iter()
        .map(|(dir, rank)| ComposeFolder {
            compose_file: dir.join(&config.compose_file_names[rank]),
            dir,
        })
        .collect())
}

/// Resolve a single folder. Fails with `NoComposeSource` if it has none.
pub fn compose_folder(dir: &Path, config: &DiscoveryConfig) -> Result<ComposeFolder> {
    config
        .compose_file_names
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .map(|compose_file| ComposeFolder {
            dir: dir.to_path_buf(),
            compose_file,
        })
        .ok_or_else(|| Error::NoComposeSource(dir.to_path_buf()))
}

/// Managed files directly inside `dir`, sorted by name
pub fn managed_files(dir: &Path, rules: &ClassificationRules) -> Result<Vec<ManagedFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(target) = entry.file_name().to_str().and_then(|n| rules.classify(n)) else {
            continue;
        };
        files.push(ManagedFile {
            path: entry.into_path(),
            target,
        });
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_discover_folders() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("web/docker-compose.yml"));
        touch(&root.path().join("web/compose.yaml"));
        touch(&root.path().join("api/nested/compose.yml"));
        touch(&root.path().join("node_modules/pkg/compose.yaml"));
        touch(&root.path().join("web/k8s/compose.yaml"));
        touch(&root.path().join("docs/readme.md"));

        let folders = discover(root.path(), &DiscoveryConfig::default(), "k8s").unwrap();

        assert_eq!(
            folders,
            vec![
                ComposeFolder {
                    dir: root.path().join("api/nested"),
                    compose_file: root.path().join("api/nested/compose.yml"),
                },
                ComposeFolder {
                    dir: root.path().join("web"),
                    compose_file: root.path().join("web/compose.yaml"),
                },
            ]
        );
    }

    #[test]
    fn test_discover_respects_depth() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("a/b/c/compose.yaml"));
        let config = DiscoveryConfig {
            max_depth: 2,
            ..Default::default()
        };
        assert!(discover(root.path(), &config, "k8s").unwrap().is_empty());
    }

    #[test]
    fn test_compose_folder_missing_source() {
        let root = tempfile::tempdir().unwrap();
        let err = compose_folder(root.path(), &DiscoveryConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "NoComposeSource");

        touch(&root.path().join("docker-compose.yaml"));
        let folder = compose_folder(root.path(), &DiscoveryConfig::default()).unwrap();
        assert_eq!(folder.compose_file, root.path().join("docker-compose.yaml"));
    }

    #[test]
    fn test_managed_files() {
        let root = tempfile::tempdir().unwrap();
        for name in ["nginx.conf", "server.key", "server.crt", "compose.yaml", "notes.txt"] {
            touch(&root.path().join(name));
        }
        touch(&root.path().join("sub/app.ini"));

        let files = managed_files(root.path(), &ClassificationRules::default()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.target.name.as_str()).collect();
        assert_eq!(names, vec!["nginx-config", "server-crt-secret", "server-key-secret"]);
    }
}
