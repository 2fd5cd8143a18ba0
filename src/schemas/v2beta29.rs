//! `skaffold/v2beta29`, the last revision of the v1 lineage.
//!
//! Adds multi-platform builds, buildpacks artifacts and Cloud Run
//! deploys. It has no successor: configs for the v2 lineage start over at
//! `skaffold/v3alpha1` with rendering split out of deploy.

use serde::{Deserialize, Serialize};

use super::{each, one_of, Check};
use crate::error::Result;
use crate::versioned::{terminal, SchemaDocument, VersionedConfig};

pub use super::v2beta14::{
    Activation, BazelArtifact, ClusterDetails, ConfigDependency, ConfigMapVolumeSource,
    DateTimeTagger, DockerArtifact, DockerConfig, EmptyDirVolumeSource, EnvTemplateTagger,
    GitTagger, GoogleCloudBuild, HelmDeploy, HelmRelease, InputDigest, JibArtifact,
    KanikoArtifact, KanikoBuildContext, KubectlDeploy, KubectlFlags, KustomizeDeploy, LocalBuild,
    LocalDir, LogsConfig, Metadata, PortForwardResource, SecretVolumeSource, ShaTagger, TagPolicy,
    TestCase, Volume, VolumeMount,
};

pub const VERSION: &str = "skaffold/v2beta29";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SkaffoldConfig {
    pub api_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<ConfigDependency>,
    pub build: BuildConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub test: Vec<TestCase>,
    pub deploy: DeployConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub port_forward: Vec<PortForwardResource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Profile {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub activation: Vec<Activation>,
    pub build: BuildConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub test: Vec<TestCase>,
    pub deploy: DeployConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub port_forward: Vec<PortForwardResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct BuildConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(skip_serializing_if = "TagPolicy::is_empty")]
    pub tag_policy: TagPolicy,
    /// Target platforms such as `linux/amd64`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalBuild>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_cloud_build: Option<GoogleCloudBuild>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterDetails>,
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
        if let Some(cluster) = &self.cluster {
            cluster.check(&format!("{path}.cluster"))?;
        }
        each(&format!("{path}.artifacts"), &self.artifacts, |p, a| a.check(p))
    }
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jib: Option<JibArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildpacks: Option<BuildpackArtifact>,
}

impl Artifact {
    pub(crate) fn check(&self, path: &str) -> Check {
        one_of(
            || path.to_string(),
            &[
                ("docker", self.docker.is_some()),
                ("bazel", self.bazel.is_some()),
                ("kaniko", self.kaniko.is_some()),
                ("jib", self.jib.is_some()),
                ("buildpacks", self.buildpacks.is_some()),
            ],
        )?;
        match self.kaniko.as_ref().and_then(|k| k.build_context.as_ref()) {
            Some(context) => context.check(&format!("{path}.kaniko")),
            None => Ok(()),
        }
    }
}

/// Cloud Native Buildpacks build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct BuildpackArtifact {
    pub builder: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub run_image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buildpacks: Vec<String>,
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloudrun: Option<CloudRunDeploy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_check_deadline_seconds: Option<u32>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kube_context: String,
    #[serde(skip_serializing_if = "LogsConfig::is_empty")]
    pub logs: LogsConfig,
}

impl DeployConfig {
    pub(crate) fn check(&self, path: &str) -> Check {
        one_of(
            || path.to_string(),
            &[
                ("kubectl", self.kubectl.is_some()),
                ("helm", self.helm.is_some()),
                ("kustomize", self.kustomize.is_some()),
                ("cloudrun", self.cloudrun.is_some()),
            ],
        )
    }
}

/// Deploys services to Cloud Run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CloudRunDeploy {
    #[serde(rename = "projectid", skip_serializing_if = "String::is_empty")]
    pub project_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub config_file: String,
}

fn check_pipeline(path: &str, build: &BuildConfig, deploy: &DeployConfig) -> Check {
    build.check(&format!("{path}build"))?;
    deploy.check(&format!("{path}deploy"))
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
        Err(terminal(VERSION))
    }
}
