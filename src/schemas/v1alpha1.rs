//! `skaffold/v1alpha1`: the first schema revision.
//!
//! Tag policies are plain strings, artifacts are always Dockerfile builds
//! with their fields inlined, and kubectl manifests carry parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{one_of, v1alpha2, Check};
use crate::error::{Result, SchemaError};
use crate::versioned::{SchemaDocument, VersionedConfig};

pub const VERSION: &str = "skaffold/v1alpha1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SkaffoldConfig {
    pub api_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    pub build: BuildConfig,
    pub deploy: DeployConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    /// `gitCommit` or `sha256`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tag_policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalBuild>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_cloud_build: Option<GoogleCloudBuild>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct LocalBuild {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_push: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GoogleCloudBuild {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub project_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Artifact {
    pub image_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub workspace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dockerfile_path: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub build_args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DeployConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubectl: Option<KubectlDeploy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmDeploy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct KubectlDeploy {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub manifests: Vec<Manifest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Manifest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct HelmDeploy {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub releases: Vec<HelmRelease>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct HelmRelease {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub chart_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub values_file_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl BuildConfig {
    pub(crate) fn check(&self, path: &str) -> Check {
        one_of(
            || path.to_string(),
            &[
                ("local", self.local.is_some()),
                ("googleCloudBuild", self.google_cloud_build.is_some()),
            ],
        )
    }
}

impl DeployConfig {
    pub(crate) fn check(&self, path: &str) -> Check {
        one_of(
            || path.to_string(),
            &[("kubectl", self.kubectl.is_some()), ("helm", self.helm.is_some())],
        )
    }
}

impl SchemaDocument for SkaffoldConfig {
    const VERSION: &'static str = VERSION;

    fn api_version(&self) -> &str {
        &self.api_version
    }

    fn validate(&self) -> Result<()> {
        self.build
            .check("build")
            .and_then(|_| self.deploy.check("deploy"))
            .map_err(|v| v.into_error(VERSION))
    }

    fn upgrade_to_next(&self) -> Result<Box<dyn VersionedConfig>> {
        let fail = |reason: String| SchemaError::Upgrade {
            from: VERSION.to_string(),
            to: v1alpha2::VERSION.to_string(),
            reason,
        };

        let tag_policy = match self.build.tag_policy.as_str() {
            "" => v1alpha2::TagPolicy::default(),
            "gitCommit" => v1alpha2::TagPolicy {
                git_commit: Some(v1alpha2::GitTagger::default()),
                ..Default::default()
            },
            "sha256" => v1alpha2::TagPolicy {
                sha256: Some(v1alpha2::ShaTagger::default()),
                ..Default::default()
            },
            other => return Err(fail(format!("unknown tag policy {other:?}"))),
        };

        let artifacts = self
            .build
            .artifacts
            .iter()
            .map(|a| v1alpha2::Artifact {
                image_name: a.image_name.clone(),
                workspace: a.workspace.clone(),
                docker: Some(v1alpha2::DockerArtifact {
                    dockerfile: a.dockerfile_path.clone(),
                    build_args: a.build_args.clone(),
                }),
                bazel: None,
            })
            .collect();

        if !self.deploy.name.is_empty() {
            warn!(name = %self.deploy.name, "deploy.name is no longer supported and was dropped");
        }

        let kubectl = self.deploy.kubectl.as_ref().map(|k| {
            let mut manifests = Vec::new();
            for (i, m) in k.manifests.iter().enumerate() {
                if !m.parameters.is_empty() {
                    warn!(
                        manifest = i,
                        "kubectl manifest parameters are no longer supported and were dropped"
                    );
                }
                manifests.extend(m.paths.iter().cloned());
            }
            v1alpha2::KubectlDeploy {
                manifests,
                ..Default::default()
            }
        });

        let next = v1alpha2::SkaffoldConfig {
            api_version: v1alpha2::VERSION.to_string(),
            kind: self.kind.clone(),
            build: v1alpha2::BuildConfig {
                artifacts,
                tag_policy,
                local: self.build.local.clone(),
                google_cloud_build: self.build.google_cloud_build.clone(),
                kaniko: None,
            },
            deploy: v1alpha2::DeployConfig {
                kubectl,
                helm: self.deploy.helm.clone(),
                kustomize: None,
            },
            profiles: Vec::new(),
        };
        Ok(Box::new(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upgrade(yaml: &str) -> Result<v1alpha2::SkaffoldConfig> {
        let config: SkaffoldConfig = serde_yaml::from_str(yaml).unwrap();
        let next = config.upgrade_to_next()?;
        Ok(next.downcast::<v1alpha2::SkaffoldConfig>().unwrap())
    }

    #[test]
    fn test_artifact_fields_move_under_docker() {
        let next = upgrade(
            r#"apiVersion: skaffold/v1alpha1
build:
  artifacts:
  - imageName: gcr.io/app
    workspace: ./app
    dockerfilePath: Dockerfile.dev
    buildArgs:
      MODE: dev
"#,
        )
        .unwrap();

        assert_eq!(next.api_version, v1alpha2::VERSION);
        let artifact = &next.build.artifacts[0];
        assert_eq!(artifact.image_name, "gcr.io/app");
        assert_eq!(artifact.workspace, "./app");
        let docker = artifact.docker.as_ref().unwrap();
        assert_eq!(docker.dockerfile, "Dockerfile.dev");
        assert_eq!(docker.build_args.get("MODE").map(String::as_str), Some("dev"));
        assert!(artifact.bazel.is_none());
    }

    #[test]
    fn test_string_tag_policy() {
        let policy = |name: &str| {
            let yaml = format!("apiVersion: skaffold/v1alpha1\nbuild:\n  tagPolicy: {name}\n");
            upgrade(&yaml).unwrap().build.tag_policy
        };
        assert!(policy("sha256").sha256.is_some());
        assert!(policy("sha256").git_commit.is_none());
        assert!(policy("gitCommit").git_commit.is_some());

        let next = upgrade("apiVersion: skaffold/v1alpha1\n").unwrap();
        assert_eq!(next.build.tag_policy, v1alpha2::TagPolicy::default());
    }

    #[test]
    fn test_unknown_tag_policy_fails() {
        let err = upgrade("apiVersion: skaffold/v1alpha1\nbuild:\n  tagPolicy: dateTime\n")
            .unwrap_err();
        match err {
            SchemaError::Upgrade { from, to, reason } => {
                assert_eq!(from, VERSION);
                assert_eq!(to, v1alpha2::VERSION);
                assert!(reason.contains("dateTime"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_manifest_paths_are_flattened() {
        let next = upgrade(
            r#"apiVersion: skaffold/v1alpha1
deploy:
  name: app
  kubectl:
    manifests:
    - paths: [k8s/deployment.yaml, k8s/service.yaml]
      parameters:
        IMAGE_NAME: gcr.io/app
    - paths: [k8s/ingress.yaml]
"#,
        )
        .unwrap();

        let kubectl = next.deploy.kubectl.unwrap();
        assert_eq!(
            kubectl.manifests,
            vec!["k8s/deployment.yaml", "k8s/service.yaml", "k8s/ingress.yaml"]
        );
        assert!(next.deploy.helm.is_none());
    }

    #[test]
    fn test_builder_and_deployer_are_exclusive() {
        let yaml = "apiVersion: skaffold/v1alpha1
build:
  local: {}
  googleCloudBuild:
    projectId: p
";
        let config: SkaffoldConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(SchemaDocument::validate(&config).is_err());
    }
}
