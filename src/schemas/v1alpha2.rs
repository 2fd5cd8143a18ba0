//! `skaffold/v1alpha2`: structured tag policies, per-builder artifact
//! sections, in-cluster kaniko builds, kustomize and profiles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{each, one_of, v1beta1, Check};
use crate::error::Result;
use crate::versioned::{SchemaDocument, VersionedConfig};

pub use super::v1alpha1::{GoogleCloudBuild, HelmDeploy, HelmRelease, LocalBuild};

pub const VERSION: &str = "skaffold/v1alpha2";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SkaffoldConfig {
    pub api_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    pub build: BuildConfig,
    pub deploy: DeployConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Profile {
    pub name: String,
    pub build: BuildConfig,
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
    pub kaniko: Option<KanikoBuild>,
}

/// How built images are tagged. At most one tagger may be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct TagPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<GitTagger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<ShaTagger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_template: Option<EnvTemplateTagger>,
}

impl TagPolicy {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn check(&self, path: &str) -> Check {
        one_of(
            || path.to_string(),
            &[
                ("gitCommit", self.git_commit.is_some()),
                ("sha256", self.sha256.is_some()),
                ("envTemplate", self.env_template.is_some()),
            ],
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GitTagger {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ShaTagger {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct EnvTemplateTagger {
    pub template: String,
}

/// In-cluster build with kaniko
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct KanikoBuild {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub gcs_bucket: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pull_secret: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pull_secret_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timeout: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Artifact {
    pub image_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub workspace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bazel: Option<BazelArtifact>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DockerArtifact {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dockerfile: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub build_args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct BazelArtifact {
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DeployConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubectl: Option<KubectlDeploy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmDeploy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kustomize: Option<KustomizeDeploy>,
}

impl DeployConfig {
    pub(crate) fn check(&self, path: &str) -> Check {
        one_of(
            || path.to_string(),
            &[
                ("kubectl", self.kubectl.is_some()),
                ("helm", self.helm.is_some()),
                ("kustomize", self.kustomize.is_some()),
            ],
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct KubectlDeploy {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub manifests: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remote_manifests: Vec<String>,
    #[serde(skip_serializing_if = "KubectlFlags::is_empty")]
    pub flags: KubectlFlags,
}

/// Extra arguments passed to kubectl
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct KubectlFlags {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub global: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub apply: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<String>,
}

impl KubectlFlags {
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.apply.is_empty() && self.delete.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct KustomizeDeploy {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "KubectlFlags::is_empty")]
    pub flags: KubectlFlags,
}

fn check_pipeline(path: &str, build: &BuildConfig, deploy: &DeployConfig) -> Check {
    build.tag_policy.check(&format!("{path}build.tagPolicy"))?;
    one_of(
        || format!("{path}build"),
        &[
            ("local", build.local.is_some()),
            ("googleCloudBuild", build.google_cloud_build.is_some()),
            ("kaniko", build.kaniko.is_some()),
        ],
    )?;
    each(&format!("{path}build.artifacts"), &build.artifacts, |p, a| {
        one_of(
            || p.to_string(),
            &[("docker", a.docker.is_some()), ("bazel", a.bazel.is_some())],
        )
    })?;
    deploy.check(&format!("{path}deploy"))
}

fn upgrade_build(build: &BuildConfig) -> v1beta1::BuildConfig {
    v1beta1::BuildConfig {
        artifacts: build
            .artifacts
            .iter()
            .map(|a| v1beta1::Artifact {
                image: a.image_name.clone(),
                context: a.workspace.clone(),
                docker: a.docker.clone(),
                bazel: a.bazel.clone(),
            })
            .collect(),
        tag_policy: build.tag_policy.clone(),
        local: build.local.clone(),
        google_cloud_build: build.google_cloud_build.clone(),
        kaniko: build.kaniko.clone(),
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
        let next = v1beta1::SkaffoldConfig {
            api_version: v1beta1::VERSION.to_string(),
            kind: self.kind.clone(),
            build: upgrade_build(&self.build),
            test: Vec::new(),
            deploy: self.deploy.clone(),
            profiles: self
                .profiles
                .iter()
                .map(|p| v1beta1::Profile {
                    name: p.name.clone(),
                    build: upgrade_build(&p.build),
                    test: Vec::new(),
                    deploy: p.deploy.clone(),
                })
                .collect(),
        };
        Ok(Box::new(next))
    }
}
