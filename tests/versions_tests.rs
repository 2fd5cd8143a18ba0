//! End-to-end tests over real config files: detection, parsing, upgrading
//! and compatibility checks across both lineages.

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use skaffold_schema::schemas::{v1alpha1, v1beta6, v2beta29, v2beta8, v3, v3alpha1, v4beta1};
use skaffold_schema::{
    decode_all, is_compatible_with, is_skaffold_config, marshal, parse_config,
    parse_config_and_upgrade, upgrade_to, Lineage, SchemaError, SchemaRegistry, VersionedConfig,
};
use tempfile::TempDir;

const MINIMAL_CONFIG: &str = "";

const SIMPLE_CONFIG: &str = r#"
build:
  tagPolicy:
    gitCommit: {}
  artifacts:
  - image: example
deploy:
  kubectl: {}
"#;

const INVALID_CONFIG: &str = r#"
build:
  tagPolicy:
    sha256: {}
    gitCommit: {}
  artifacts:
  - image: example
deploy:
  name: example
"#;

const COMPLETE_CONFIG: &str = r#"
build:
  tagPolicy:
    sha256: {}
  artifacts:
  - image: image1
    context: ./examples/app1
    docker:
      dockerfile: Dockerfile.dev
  - image: image2
    context: ./examples/app2
    bazel:
      target: //:example.tar
  googleCloudBuild:
    projectId: ID
deploy:
  kubectl:
   manifests:
   - dep.yaml
   - svc.yaml
"#;

const MINIMAL_CLUSTER_CONFIG: &str = r#"
build:
  artifacts:
  - image: image1
    context: ./examples/app1
    kaniko: {}
  cluster: {}
"#;

const KANIKO_CONFIG_MAP: &str = r#"
build:
  artifacts:
  - image: image1
    context: ./examples/app1
    kaniko:
      volumeMounts:
      - name: docker-config
        mountPath: /kaniko/.docker
  cluster:
    pullSecretName: "some-secret"
    volumes:
    - name: docker-config
      configMap:
        name: docker-config
"#;

const COMPLETE_CLUSTER_CONFIG: &str = r#"
build:
  artifacts:
  - image: image1
    context: ./examples/app1
    kaniko: {}
  cluster:
    pullSecretPath: /secret.json
    pullSecretName: secret-name
    namespace: nskaniko
    timeout: 120m
    dockerConfig:
      secretName: config-name
      path: /kaniko/.docker
"#;

const BAD_CONFIG: &str = "bad config";

const INVALID_STATUS_CHECK_CONFIG: &str = r#"
deploy:
  statusCheckDeadlineSeconds: s
"#;

const VALID_STATUS_CHECK_CONFIG: &str = r#"
deploy:
  statusCheckDeadlineSeconds: 10
"#;

const CUSTOM_LOG_PREFIX: &str = r#"
deploy:
  logs:
    prefix: none
"#;

fn document(version: &str, body: &str) -> String {
    format!("apiVersion: {version}\nkind: Config\n{body}")
}

/// Write documents to `skaffold.yaml` in a fresh directory
fn write_config(docs: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skaffold.yaml");
    let text = docs
        .iter()
        .map(|(version, body)| document(version, body))
        .collect::<Vec<_>>()
        .join("\n---\n");
    std::fs::write(&path, text).unwrap();
    (dir, path)
}

fn upgrade(docs: &[(&str, &str)]) -> skaffold_schema::Result<Vec<Box<dyn VersionedConfig>>> {
    let (_dir, path) = write_config(docs);
    parse_config_and_upgrade(&SchemaRegistry::builtin(), &path)
}

fn as_v1(config: &dyn VersionedConfig) -> &v2beta29::SkaffoldConfig {
    config
        .downcast_ref::<v2beta29::SkaffoldConfig>()
        .expect("document should be at skaffold/v2beta29")
}

fn write_raw(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skaffold.yaml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn test_is_skaffold_config() {
    let registry = SchemaRegistry::builtin();
    let cases = [
        ("valid skaffold config", "apiVersion: skaffold/v1beta6\nkind: Config\ndeploy:\n  kustomize: {}", true),
        ("not a valid format", "test", false),
        ("invalid skaffold config version", "apiVersion: skaffold/v1beta100\nkind: Config\ndeploy:\n  kustomize: {}", false),
    ];

    for (description, contents, expected) in cases {
        let (_dir, path) = write_raw(contents);
        assert_eq!(is_skaffold_config(&registry, &path), expected, "{description}");
    }
}

#[test]
fn test_missing_file_is_not_a_config() {
    let registry = SchemaRegistry::builtin();
    assert!(!is_skaffold_config(&registry, Path::new("/nonexistent/skaffold.yaml")));
}

#[test]
fn test_minimal_config() {
    for version in [v2beta29::VERSION, v1alpha1::VERSION] {
        let batch = upgrade(&[(version, MINIMAL_CONFIG)]).unwrap();
        assert_eq!(batch.len(), 1);
        let expected = v2beta29::SkaffoldConfig {
            api_version: v2beta29::VERSION.to_string(),
            kind: "Config".to_string(),
            ..Default::default()
        };
        assert_eq!(as_v1(batch[0].as_ref()), &expected, "from {version}");
    }
}

#[test]
fn test_simple_config() {
    let batch = upgrade(&[(v2beta29::VERSION, SIMPLE_CONFIG)]).unwrap();
    let config = as_v1(batch[0].as_ref());

    assert!(config.build.tag_policy.git_commit.is_some());
    assert_eq!(config.build.artifacts.len(), 1);
    assert_eq!(config.build.artifacts[0].image, "example");
    assert!(config.deploy.kubectl.is_some());
}

#[test]
fn test_complete_config() {
    let batch = upgrade(&[(v2beta29::VERSION, COMPLETE_CONFIG)]).unwrap();
    let config = as_v1(batch[0].as_ref());

    assert!(config.build.tag_policy.sha256.is_some());
    let gcb = config.build.google_cloud_build.as_ref().unwrap();
    assert_eq!(gcb.project_id, "ID");

    let artifacts = &config.build.artifacts;
    assert_eq!(artifacts[0].image, "image1");
    assert_eq!(artifacts[0].context, "./examples/app1");
    assert_eq!(artifacts[0].docker.as_ref().unwrap().dockerfile, "Dockerfile.dev");
    assert_eq!(artifacts[1].bazel.as_ref().unwrap().target, "//:example.tar");

    let kubectl = config.deploy.kubectl.as_ref().unwrap();
    assert_eq!(kubectl.manifests, vec!["dep.yaml", "svc.yaml"]);
}

#[test]
fn test_old_versions_converge_on_the_same_document() {
    let expected = upgrade(&[(v2beta29::VERSION, COMPLETE_CONFIG)]).unwrap();
    for version in [v2beta8::VERSION, v1beta6::VERSION] {
        let upgraded = upgrade(&[(version, COMPLETE_CONFIG)]).unwrap();
        assert_eq!(as_v1(upgraded[0].as_ref()), as_v1(expected[0].as_ref()), "from {version}");
    }
}

#[test]
fn test_first_revision_field_names_converge() {
    let first = r#"
build:
  tagPolicy: sha256
  artifacts:
  - imageName: image1
    workspace: ./examples/app1
    dockerfilePath: Dockerfile.dev
    buildArgs:
      MODE: dev
  googleCloudBuild:
    projectId: ID
deploy:
  kubectl:
    manifests:
    - paths:
      - dep.yaml
      - svc.yaml
"#;
    let latest = r#"
build:
  tagPolicy:
    sha256: {}
  artifacts:
  - image: image1
    context: ./examples/app1
    docker:
      dockerfile: Dockerfile.dev
      buildArgs:
        MODE: dev
  googleCloudBuild:
    projectId: ID
deploy:
  kubectl:
    manifests:
    - dep.yaml
    - svc.yaml
"#;

    let from_first = upgrade(&[(v1alpha1::VERSION, first)]).unwrap();
    let from_latest = upgrade(&[(v2beta29::VERSION, latest)]).unwrap();
    let config = as_v1(from_first[0].as_ref());
    assert_eq!(config, as_v1(from_latest[0].as_ref()));
    assert_eq!(config.build.artifacts[0].context, "./examples/app1");
    assert_eq!(config.deploy.kubectl.as_ref().unwrap().manifests, vec!["dep.yaml", "svc.yaml"]);
}

#[test]
fn test_v2_lineage_converges() {
    let from_alpha = upgrade(&[(v3alpha1::VERSION, "manifests:\n  rawK8s:\n  - k8s/*.yaml\n")]).unwrap();
    let from_v3 = upgrade(&[(v3::VERSION, "manifests:\n  rawYaml:\n  - k8s/*.yaml\n")]).unwrap();

    let a = from_alpha[0].downcast_ref::<v4beta1::SkaffoldConfig>().unwrap();
    let b = from_v3[0].downcast_ref::<v4beta1::SkaffoldConfig>().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.manifests.raw_yaml, vec!["k8s/*.yaml"]);
}

#[test]
fn test_multiple_configs_same_version() {
    let batch = upgrade(&[
        (v2beta29::VERSION, COMPLETE_CONFIG),
        (v2beta29::VERSION, COMPLETE_CLUSTER_CONFIG),
    ])
    .unwrap();
    assert_eq!(batch.len(), 2);

    let cluster = as_v1(batch[1].as_ref()).build.cluster.as_ref().unwrap();
    assert_eq!(cluster.pull_secret_path, "/secret.json");
    assert_eq!(cluster.pull_secret_name, "secret-name");
    assert_eq!(cluster.namespace, "nskaniko");
    assert_eq!(cluster.timeout, "120m");
    let docker_config = cluster.docker_config.as_ref().unwrap();
    assert_eq!(docker_config.secret_name, "config-name");
    assert_eq!(docker_config.path, "/kaniko/.docker");
}

#[test]
fn test_multiple_configs_different_versions_keep_order() {
    let batch = upgrade(&[
        (v2beta29::VERSION, COMPLETE_CONFIG),
        (v2beta8::VERSION, COMPLETE_CLUSTER_CONFIG),
    ])
    .unwrap();

    assert!(batch.iter().all(|c| c.version() == v2beta29::VERSION));
    assert!(as_v1(batch[0].as_ref()).build.google_cloud_build.is_some());
    assert!(as_v1(batch[1].as_ref()).build.cluster.is_some());
}

#[test]
fn test_cluster_configs() {
    let batch = upgrade(&[(v2beta29::VERSION, MINIMAL_CLUSTER_CONFIG)]).unwrap();
    let config = as_v1(batch[0].as_ref());
    assert!(config.build.cluster.is_some());
    assert!(config.build.artifacts[0].kaniko.is_some());

    let batch = upgrade(&[(v2beta8::VERSION, KANIKO_CONFIG_MAP)]).unwrap();
    let config = as_v1(batch[0].as_ref());
    let cluster = config.build.cluster.as_ref().unwrap();
    assert_eq!(cluster.pull_secret_name, "some-secret");
    assert_eq!(cluster.volumes[0].config_map.as_ref().unwrap().name, "docker-config");

    let kaniko = config.build.artifacts[0].kaniko.as_ref().unwrap();
    assert_eq!(kaniko.volume_mounts[0].name, "docker-config");
    assert_eq!(kaniko.volume_mounts[0].mount_path, "/kaniko/.docker");
}

#[test]
fn test_invalid_configs() {
    for (description, body) in [
        ("invalid config", INVALID_CONFIG),
        ("bad config", BAD_CONFIG),
        ("invalid status check", INVALID_STATUS_CHECK_CONFIG),
    ] {
        assert!(upgrade(&[(v2beta29::VERSION, body)]).is_err(), "{description}");
    }
}

#[test]
fn test_detected_config_can_still_fail_to_parse() {
    let registry = SchemaRegistry::builtin();
    let (_dir, path) = write_config(&[(v2beta29::VERSION, INVALID_CONFIG)]);

    assert!(is_skaffold_config(&registry, &path));
    assert!(parse_config(&registry, &path).is_err());
}

#[test]
fn test_malformed_and_missing_version() {
    let registry = SchemaRegistry::builtin();

    let (_dir, path) = write_raw(BAD_CONFIG);
    let err = parse_config_and_upgrade(&registry, &path).unwrap_err();
    assert!(matches!(err, SchemaError::Malformed { .. }), "{err}");

    let (_dir, path) = write_raw("kind: Config\nbuild: {}\n");
    let err = parse_config_and_upgrade(&registry, &path).unwrap_err();
    assert!(matches!(err, SchemaError::MissingVersion { document: 0 }), "{err}");

    let (_dir, path) = write_raw("apiVersion: \"\"\nkind: Config\n");
    let err = parse_config_and_upgrade(&registry, &path).unwrap_err();
    assert!(matches!(err, SchemaError::MissingVersion { .. }), "{err}");
}

#[test]
fn test_two_taggers_are_rejected() {
    let body = "build:\n  tagPolicy:\n    sha256: {}\n    gitCommit: {}\n";
    let err = upgrade(&[(v2beta29::VERSION, body)]).unwrap_err();
    assert!(matches!(err, SchemaError::Decode { .. }), "{err}");
    assert!(err.to_string().contains("build.tagPolicy"), "{err}");
}

#[test]
fn test_deploy_settings() {
    let batch = upgrade(&[(v2beta29::VERSION, VALID_STATUS_CHECK_CONFIG)]).unwrap();
    assert_eq!(as_v1(batch[0].as_ref()).deploy.status_check_deadline_seconds, Some(10));

    let batch = upgrade(&[(v2beta29::VERSION, CUSTOM_LOG_PREFIX)]).unwrap();
    assert_eq!(as_v1(batch[0].as_ref()).deploy.logs.prefix, "none");
}

#[test]
fn test_empty_file_is_empty_batch() {
    let (_dir, path) = write_raw("");
    let registry = SchemaRegistry::builtin();
    assert!(parse_config_and_upgrade(&registry, &path).unwrap().is_empty());
}

#[test]
fn test_unknown_version() {
    let err = upgrade(&[("skaffold/v2beta30", MINIMAL_CONFIG)]).unwrap_err();
    assert!(matches!(err, SchemaError::UnknownVersion { .. }), "{err}");
}

#[test]
fn test_mixed_lineages_are_incompatible() {
    let err = upgrade(&[(v2beta29::VERSION, MINIMAL_CONFIG), (v4beta1::VERSION, MINIMAL_CONFIG)])
        .unwrap_err();
    match err {
        SchemaError::IncompatibleVersions { older, newer } => {
            assert_eq!(older, vec![v2beta29::VERSION]);
            assert_eq!(newer, vec![v4beta1::VERSION]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_every_version_upgrades_to_its_successor() {
    let registry = SchemaRegistry::builtin();
    for version in registry.versions() {
        let batch = decode_all(&registry, &document(version, MINIMAL_CONFIG)).unwrap();
        let result = batch[0].upgrade();
        match registry.next_of(version) {
            Some(next) => assert_eq!(result.unwrap().version(), next, "from {version}"),
            None => {
                assert!(registry.is_terminal(version));
                assert!(matches!(result, Err(SchemaError::TerminalVersion { .. })), "{version}");
            }
        }
    }
}

#[test]
fn test_upgrade_to_older_version_fails() {
    let registry = SchemaRegistry::builtin();
    let (_dir, path) = write_config(&[(v2beta29::VERSION, MINIMAL_CONFIG)]);
    let batch = parse_config(&registry, &path).unwrap();

    let err = upgrade_to(&registry, &batch, v1alpha1::VERSION).unwrap_err();
    assert!(
        err.to_string()
            .contains(r#"is more recent than target version "skaffold/v1alpha1": upgrade skaffold"#),
        "{err}"
    );
}

#[test]
fn test_upgrade_to_within_lineage() {
    let registry = SchemaRegistry::builtin();
    let (_dir, path) = write_config(&[(v3alpha1::VERSION, MINIMAL_CONFIG), (v3::VERSION, MINIMAL_CONFIG)]);
    let batch = parse_config(&registry, &path).unwrap();

    let upgraded = upgrade_to(&registry, &batch, v4beta1::VERSION).unwrap();
    assert!(upgraded.iter().all(|c| c.version() == v4beta1::VERSION));

    let err = upgrade_to(&registry, &batch, v2beta29::VERSION).unwrap_err();
    assert!(matches!(err, SchemaError::IncompatibleWithTarget { .. }), "{err}");
}

#[test]
fn test_latest_versions() {
    let registry = SchemaRegistry::builtin();
    assert_eq!(registry.latest(), v4beta1::VERSION);
    assert_eq!(registry.terminal_of(Lineage::V1), v2beta29::VERSION);
    assert_eq!(registry.terminal_of(Lineage::V2), v4beta1::VERSION);
}

#[test]
fn test_is_compatible_with() {
    let registry = SchemaRegistry::builtin();
    let decode = |docs: &[(&str, &str)]| {
        let text = docs
            .iter()
            .map(|(v, b)| document(v, b))
            .collect::<Vec<_>>()
            .join("\n---\n");
        decode_all(&registry, &text).unwrap()
    };

    let v1_batch = decode(&[(v1alpha1::VERSION, ""), (v2beta8::VERSION, "")]);
    assert!(is_compatible_with(&registry, &v1_batch, v2beta29::VERSION).is_ok());
    assert!(is_compatible_with(&registry, &v1_batch, v2beta8::VERSION).is_ok());
    assert!(matches!(
        is_compatible_with(&registry, &v1_batch, v1beta6::VERSION),
        Err(SchemaError::Downgrade { .. })
    ));
    assert!(matches!(
        is_compatible_with(&registry, &v1_batch, v4beta1::VERSION),
        Err(SchemaError::IncompatibleWithTarget { .. })
    ));

    let v2_batch = decode(&[(v3::VERSION, "")]);
    assert!(is_compatible_with(&registry, &v2_batch, v4beta1::VERSION).is_ok());
    assert!(is_compatible_with(&registry, &[], v3alpha1::VERSION).is_ok());
    assert!(matches!(
        is_compatible_with(&registry, &v2_batch, "skaffold/v9"),
        Err(SchemaError::UnknownVersion { .. })
    ));
}

#[test]
fn test_marshal_round_trip() {
    let registry = SchemaRegistry::builtin();
    let batch = upgrade(&[
        (v2beta8::VERSION, COMPLETE_CONFIG),
        (v2beta29::VERSION, KANIKO_CONFIG_MAP),
    ])
    .unwrap();
    let text = marshal(&batch).unwrap();

    let (_dir, path) = write_raw(&text);
    assert!(is_skaffold_config(&registry, &path));
    let reparsed = parse_config(&registry, &path).unwrap();
    assert_eq!(reparsed.len(), 2);
    for (a, b) in batch.iter().zip(&reparsed) {
        assert_eq!(as_v1(a.as_ref()), as_v1(b.as_ref()));
    }
    assert_eq!(marshal(&reparsed).unwrap(), text);
}
