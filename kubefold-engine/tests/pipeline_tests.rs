//! Pipeline Tests
//! Tests for running whole compose folders through convert, generate and rewrite
//!
//! Standard utilities stand in for the external tools: `true` for a converter
//! that leaves pre-seeded manifests alone, `echo` for a generator that prints
//! its arguments, and `false` for a tool that fails.

#![cfg(unix)]

use kubefold_engine::config::{EngineConfig, ToolsConfig};
use kubefold_engine::discovery::compose_folder;
use kubefold_engine::pipeline::FolderOutcome;
use kubefold_engine::{Pipeline, PodManifest};
use std::fs;
use std::path::Path;

const POD: &str = r#"apiVersion: v1
kind: Pod
metadata:
  name: web
spec:
  containers:
    - name: web
      image: nginx
      volumeMounts:
        - name: confvol
          mountPath: /etc/nginx/nginx.conf
  volumes:
    - name: confvol
      persistentVolumeClaim:
        claimName: confvol
"#;

const CLAIM: &str = r#"apiVersion: v1
kind: PersistentVolumeClaim
metadata:
  name: confvol
"#;

fn tools(kompose: &str, kubectl: &str) -> EngineConfig {
    EngineConfig {
        tools: ToolsConfig {
            kompose_bin: kompose.to_string(),
            kubectl_bin: kubectl.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A compose folder whose converter output is already in place
fn seed_folder(dir: &Path, managed: &[&str]) {
    write(&dir.join("compose.yaml"), "services: {}\n");
    write(&dir.join("k8s/web-pod.yaml"), POD);
    write(&dir.join("k8s/confvol-persistentvolumeclaim.yaml"), CLAIM);
    for name in managed {
        write(&dir.join(name), "contents\n");
    }
}

// ============== Run Tests ==============

#[tokio::test]
async fn test_run_converts_generates_and_rewrites() {
    let root = tempfile::tempdir().unwrap();
    let web = root.path().join("web");
    seed_folder(&web, &["nginx.conf"]);

    let report = Pipeline::new(tools("true", "echo"))
        .run(root.path())
        .await
        .unwrap();

    assert_eq!(report.folders.len(), 1);
    assert_eq!(report.failures(), 0);

    let folder = match &report.folders[0] {
        FolderOutcome::Completed(folder) => folder,
        other => panic!("expected completed folder, got {:?}", other),
    };
    assert_eq!(folder.output_dir, web.join("k8s"));
    assert_eq!(folder.generated, vec![web.join("k8s/nginx-config-configmap.yaml")]);
    assert_eq!(folder.rewrite.patched(), 1);

    let generated = fs::read_to_string(web.join("k8s/nginx-config-configmap.yaml")).unwrap();
    assert!(generated.contains("create configmap nginx-config"));

    let pod = PodManifest::load(&web.join("k8s/web-pod.yaml")).unwrap();
    assert!(!pod.has_volume("confvol"));
    assert!(pod.has_volume("nginx-config"));
    assert!(!web.join("k8s/confvol-persistentvolumeclaim.yaml").exists());
}

#[tokio::test]
async fn test_failing_folder_does_not_stop_others() {
    let root = tempfile::tempdir().unwrap();
    // Only `api` has a managed file, so only it calls the failing generator.
    seed_folder(&root.path().join("api"), &["server.key"]);
    seed_folder(&root.path().join("web"), &[]);

    let report = Pipeline::new(tools("true", "false"))
        .run(root.path())
        .await
        .unwrap();

    assert_eq!(report.folders.len(), 2);
    assert_eq!(report.failures(), 1);

    match &report.folders[0] {
        FolderOutcome::Failed { folder, kind, .. } => {
            assert_eq!(folder, &root.path().join("api"));
            assert_eq!(kind, "Tool");
        }
        other => panic!("expected failed folder, got {:?}", other),
    }
    assert!(matches!(report.folders[1], FolderOutcome::Completed(_)));

    // Nothing was rewritten in the failed folder
    assert_eq!(
        fs::read_to_string(root.path().join("api/k8s/web-pod.yaml")).unwrap(),
        POD
    );
    let web = PodManifest::load(&root.path().join("web/k8s/web-pod.yaml")).unwrap();
    assert!(web.has_volume("nginx-config"));
}

#[tokio::test]
async fn test_missing_tool_fails_preflight() {
    let root = tempfile::tempdir().unwrap();
    seed_folder(&root.path().join("web"), &[]);

    let err = Pipeline::new(tools("kubefold-no-such-kompose", "echo"))
        .run(root.path())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "Tool");
    assert_eq!(
        fs::read_to_string(root.path().join("web/k8s/web-pod.yaml")).unwrap(),
        POD
    );
}

#[tokio::test]
async fn test_run_folder_without_output_dir() {
    let root = tempfile::tempdir().unwrap();
    write(&root.path().join("compose.yaml"), "services: {}\n");
    let config = tools("true", "echo");
    let folder = compose_folder(root.path(), &config.discovery).unwrap();

    let report = Pipeline::new(config).run_folder(&folder).await.unwrap();

    assert!(report.generated.is_empty());
    assert!(report.rewrite.manifests.is_empty());
    assert!(root.path().join("k8s").is_dir());
}

// ============== Dry Run Tests ==============

#[tokio::test]
async fn test_dry_run_skips_tools_and_writes_nothing() {
    let root = tempfile::tempdir().unwrap();
    let web = root.path().join("web");
    seed_folder(&web, &["nginx.conf", "tls.crt"]);

    let report = Pipeline::new(tools("kubefold-no-such-kompose", "kubefold-no-such-kubectl"))
        .with_dry_run(true)
        .run(root.path())
        .await
        .unwrap();

    let folder = match &report.folders[0] {
        FolderOutcome::Completed(folder) => folder,
        other => panic!("expected completed folder, got {:?}", other),
    };
    assert_eq!(
        folder.generated,
        vec![
            web.join("k8s/nginx-config-configmap.yaml"),
            web.join("k8s/tls-crt-secret-secret.yaml"),
        ]
    );
    assert_eq!(folder.rewrite.patched(), 1);

    assert!(!web.join("k8s/nginx-config-configmap.yaml").exists());
    assert_eq!(fs::read_to_string(web.join("k8s/web-pod.yaml")).unwrap(), POD);
    assert!(web.join("k8s/confvol-persistentvolumeclaim.yaml").exists());
}
