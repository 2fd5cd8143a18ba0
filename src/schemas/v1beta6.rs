//! `skaffold/v1beta6`: in-cluster builds are described by `cluster` plus
//! per-artifact `kaniko` sections; local builds say whether to `push`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{each, one_of, v2alpha1, Check};
use crate::error::Result;
use crate::versioned::{SchemaDocument, VersionedConfig};

pub use super::v1beta1::{
    BazelArtifact, DeployConfig, DockerArtifact, EnvTemplateTagger, GitTagger, GoogleCloudBuild,
    HelmDeploy, HelmRelease, KubectlDeploy, KubectlFlags, KustomizeDeploy, ShaTagger, TagPolicy,
    TestCase,
};

pub const VERSION: &str = "skaffold/v1beta6";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SkaffoldConfig {
    pub api_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    pub build: BuildConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub test: Vec<TestCase>,
    pub deploy: DeployConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Profile {
    pub name: String,
    pub build: BuildConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub test: Vec<TestCase>,
    pub deploy: DeployConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(skip_serializing_if = "TagPolicy::is_empty")]
    pub tag_policy: TagPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalBuild>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_cloud_build: Option<GoogleCloudBuild>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct LocalBuild {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<bool>,
    #[serde(rename = "useDockerCLI", skip_serializing_if = "Option::is_none")]
    pub use_docker_cli: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_build_kit: Option<bool>,
}

/// Where in-cluster builds run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ClusterDetails {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pull_secret_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pull_secret_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timeout: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_config: Option<DockerConfig>,
}

/// Docker credentials mounted into in-cluster builds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DockerConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub secret_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Artifact {
    pub image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bazel: Option<BazelArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kaniko: Option<KanikoArtifact>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct KanikoArtifact {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dockerfile: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub build_args: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_context: Option<KanikoBuildContext>,
}

/// Where kaniko reads the build context from. At most one source may be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct KanikoBuildContext {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub gcs_bucket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_dir: Option<LocalDir>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct LocalDir {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub init_image: String,
}

impl KanikoBuildContext {
    pub(crate) fn check(&self, path: &str) -> Check {
        one_of(
            || format!("{path}.buildContext"),
            &[
                ("gcsBucket", !self.gcs_bucket.is_empty()),
                ("localDir", self.local_dir.is_some()),
            ],
        )
    }
}

impl BuildConfig {
    pub(crate) fn check(&self, path: &str) -> Check {
        self.tag_policy.check(&format!("{path}.tagPolicy"))?;
        one_of(
            || path.to_string(),
            &[
                ("local", self.local.is_some()),
                ("googleCloudBuild", self.google_cloud_build.is_some()),
                ("cluster", self.cluster.is_some()),
            ],
        )?;
        each(&format!("{path}.artifacts"), &self.artifacts, |p, a| {
            one_of(
                || p.to_string(),
                &[
                    ("docker", a.docker.is_some()),
                    ("bazel", a.bazel.is_some()),
                    ("kaniko", a.kaniko.is_some()),
                ],
            )?;
            match a.kaniko.as_ref().and_then(|k| k.build_context.as_ref()) {
                Some(context) => context.check(&format!("{p}.kaniko")),
                None => Ok(()),
            }
        })
    }
}

fn check_pipeline(path: &str, build: &BuildConfig, deploy: &DeployConfig) -> Check {
    build.check(&format!("{path}build"))?;
    deploy.check(&format!("{path}deploy"))
}

fn upgrade_deploy(deploy: &DeployConfig) -> v2alpha1::DeployConfig {
    v2alpha1::DeployConfig {
        kubectl: deploy.kubectl.clone(),
        helm: deploy.helm.clone(),
        kustomize: deploy.kustomize.as_ref().map(|k| v2alpha1::KustomizeDeploy {
            paths: if k.path.is_empty() {
                Vec::new()
            } else {
                vec![k.path.clone()]
            },
            flags: k.flags.clone(),
        }),
        status_check_deadline_seconds: None,
    }
}

impl SchemaDocument for SkaffoldConfig {
    const VERSION: &'static str = VERSION;

    fn api_version(&self) -> &str {
        &self.api_version
    }

    fn validate(&self) -> Result<()> {
        check_pipeline("", &self.build, &self.deploy)
            .and_then(|_| {
                each("profiles", &self.profiles, |p, profile| {
                    check_pipeline(&format!("{p}."), &profile.build, &profile.deploy)
                })
            })
            .map_err(|v| v.into_error(VERSION))
    }

    fn upgrade_to_next(&self) -> Result<Box<dyn VersionedConfig>> {
        let next = v2alpha1::SkaffoldConfig {
            api_version: v2alpha1::VERSION.to_string(),
            kind: self.kind.clone(),
            build: self.build.clone(),
            test: self.test.clone(),
            deploy: upgrade_deploy(&self.deploy),
            port_forward: Vec::new(),
            profiles: self
                .profiles
                .iter()
                .map(|p| v2alpha1::Profile {
                    name: p.name.clone(),
                    activation: Vec::new(),
                    build: p.build.clone(),
                    test: p.test.clone(),
                    deploy: upgrade_deploy(&p.deploy),
                    port_forward: Vec::new(),
                })
                .collect(),
        };
        Ok(Box::new(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upgrade(yaml: &str) -> v2alpha1::SkaffoldConfig {
        let config: SkaffoldConfig = serde_yaml::from_str(yaml).unwrap();
        let next = config.upgrade_to_next().unwrap();
        next.downcast::<v2alpha1::SkaffoldConfig>().unwrap()
    }

    #[test]
    fn test_kustomize_path_becomes_paths() {
        let next = upgrade(
            r#"apiVersion: skaffold/v1beta6
deploy:
  kustomize:
    path: overlays/dev
profiles:
- name: prod
  deploy:
    kustomize:
      path: overlays/prod
"#,
        );

        assert_eq!(next.api_version, v2alpha1::VERSION);
        assert_eq!(next.deploy.kustomize.unwrap().paths, vec!["overlays/dev"]);
        let profile = next.profiles[0].deploy.kustomize.as_ref().unwrap();
        assert_eq!(profile.paths, vec!["overlays/prod"]);
    }

    #[test]
    fn test_empty_kustomize_path_gives_no_paths() {
        let next = upgrade("apiVersion: skaffold/v1beta6\ndeploy:\n  kustomize: {}\n");
        assert!(next.deploy.kustomize.unwrap().paths.is_empty());
    }

    #[test]
    fn test_build_context_sources_are_exclusive() {
        let context = KanikoBuildContext {
            gcs_bucket: "bucket".to_string(),
            local_dir: Some(LocalDir::default()),
        };
        let err = context.check("build.artifacts[0].kaniko").unwrap_err();
        assert_eq!(err.path, "build.artifacts[0].kaniko.buildContext");
        assert_eq!(err.set, vec!["gcsBucket", "localDir"]);
    }
}
