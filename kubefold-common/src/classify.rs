//! Managed file classification
//!
//! Maps a file's base name to the ConfigMap or Secret that should serve it.
//! Only the last extension is considered; everything before the final dot is
//! the stem.

use serde::{Deserialize, Serialize};

/// Extensions served from a ConfigMap by default
pub const DEFAULT_CONFIG_EXTENSIONS: &[&str] = &["conf", "ini"];

/// Extensions served from a Secret by default
pub const DEFAULT_SECRET_EXTENSIONS: &[&str] = &["key", "crt"];

/// Kind of cluster object a managed file is served from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ManagedKind {
    ConfigMap,
    Secret,
}

impl ManagedKind {
    /// Suffix used for generated manifest file names (`<name>-<suffix>.yaml`)
    pub fn manifest_suffix(&self) -> &'static str {
        match self {
            Self::ConfigMap => "configmap",
            Self::Secret => "secret",
        }
    }
}

impl std::fmt::Display for ManagedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigMap => write!(f, "ConfigMap"),
            Self::Secret => write!(f, "Secret"),
        }
    }
}

/// Target object for a managed file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManagedTarget {
    pub kind: ManagedKind,
    /// ConfigMap / Secret name, also used as the replacement volume name
    pub name: String,
    /// Original base name, mounted through `subPath`
    pub file_name: String,
}

/// Extension sets driving classification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClassificationRules {
    pub config_extensions: Vec<String>,
    pub secret_extensions: Vec<String>,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            config_extensions: DEFAULT_CONFIG_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            secret_extensions: DEFAULT_SECRET_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl ClassificationRules {
    /// Classify a base name. Unknown or missing extensions yield `None`.
    pub fn classify(&self, file_name: &str) -> Option<ManagedTarget> {
        // Tolerate a full path; only the last component matters.
        let base = file_name.rsplit('/').next().unwrap_or(file_name);
        let (stem, ext) = split_extension(base)?;

        let (kind, name) = if self.config_extensions.iter().any(|e| e == ext) {
            (ManagedKind::ConfigMap, format!("{}-config", stem))
        } else if self.secret_extensions.iter().any(|e| e == ext) {
            (ManagedKind::Secret, format!("{}-{}-secret", stem, ext))
        } else {
            return None;
        };

        Some(ManagedTarget {
            kind,
            name,
            file_name: base.to_string(),
        })
    }
}

/// Classify with the default rules
pub fn classify(file_name: &str) -> Option<ManagedTarget> {
    ClassificationRules::default().classify(file_name)
}

/// Split `a.b.conf` into (`a.b`, `conf`). Dotfiles like `.conf` and names
/// ending in a dot have no extension.
fn split_extension(base: &str) -> Option<(&str, &str)> {
    let idx = base.rfind('.')?;
    let (stem, ext) = (&base[..idx], &base[idx + 1..]);
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some((stem, ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_extensions() {
        for name in ["app.conf", "app.ini"] {
            let target = classify(name).unwrap();
            assert_eq!(target.kind, ManagedKind::ConfigMap);
            assert_eq!(target.name, "app-config");
            assert_eq!(target.file_name, name);
        }
    }

    #[test]
    fn test_secret_extensions_keep_extension_in_name() {
        let crt = classify("server.crt").unwrap();
        let key = classify("server.key").unwrap();
        assert_eq!(crt.kind, ManagedKind::Secret);
        assert_eq!(crt.name, "server-crt-secret");
        assert_eq!(key.name, "server-key-secret");
        assert_ne!(crt.name, key.name);
    }

    #[test]
    fn test_unmanaged_names() {
        for name in ["output.log", "README", "archive.tar.gz", "", ".", "app.", ".conf", "conf"] {
            assert_eq!(classify(name), None, "{:?} should be unmanaged", name);
        }
    }

    #[test]
    fn test_multi_dot_uses_last_extension() {
        let target = classify("a.b.conf").unwrap();
        assert_eq!(target.name, "a.b-config");

        let target = classify("tls.local.key").unwrap();
        assert_eq!(target.name, "tls.local-key-secret");

        assert_eq!(classify("nginx.conf.bak"), None);
    }

    #[test]
    fn test_extension_match_is_case_sensitive() {
        assert_eq!(classify("APP.CONF"), None);
    }

    #[test]
    fn test_path_input_uses_base_name() {
        let target = classify("/etc/app/app.conf").unwrap();
        assert_eq!(target.name, "app-config");
        assert_eq!(target.file_name, "app.conf");
    }

    #[test]
    fn test_custom_rules() {
        let rules = ClassificationRules {
            config_extensions: vec!["yaml".to_string()],
            secret_extensions: vec!["pem".to_string()],
        };
        assert_eq!(rules.classify("settings.yaml").unwrap().name, "settings-config");
        assert_eq!(rules.classify("ca.pem").unwrap().name, "ca-pem-secret");
        assert_eq!(rules.classify("app.conf"), None);
    }

    #[test]
    fn test_kind_display_and_suffix() {
        assert_eq!(ManagedKind::ConfigMap.to_string(), "ConfigMap");
        assert_eq!(ManagedKind::Secret.manifest_suffix(), "secret");
    }
}
