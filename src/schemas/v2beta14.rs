//! `skaffold/v2beta14`: date-time and input-digest taggers, log prefixes,
//! and `requires` for pulling in other config files.

use serde::{Deserialize, Serialize};

use super::{each, one_of, v2beta29, Check};
use crate::error::Result;
use crate::versioned::{SchemaDocument, VersionedConfig};

pub use super::v2beta8::{
    Activation, Artifact, BazelArtifact, ClusterDetails, ConfigMapVolumeSource, DockerArtifact,
    DockerConfig, EmptyDirVolumeSource, EnvTemplateTagger, GitTagger, GoogleCloudBuild,
    HelmDeploy, HelmRelease, JibArtifact, KanikoArtifact, KanikoBuildContext, KubectlDeploy,
    KubectlFlags, KustomizeDeploy, LocalBuild, LocalDir, Metadata, PortForwardResource,
    SecretVolumeSource, ShaTagger, TestCase, Volume, VolumeMount,
};

pub const VERSION: &str = "skaffold/v2beta14";

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

/// Another config file whose pipelines this one depends on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ConfigDependency {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub configs: Vec<String>,
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTimeTagger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_digest: Option<InputDigest>,
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
                ("dateTime", self.date_time.is_some()),
                ("inputDigest", self.input_digest.is_some()),
            ],
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DateTimeTagger {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timezone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct InputDigest {}

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
            ],
        )
    }
}

/// Container log streaming options. `prefix` is one of `container`,
/// `podAndContainer`, `auto` or `none`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct LogsConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prefix: String,
}

impl LogsConfig {
    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }
}

fn check_pipeline(path: &str, build: &BuildConfig, deploy: &DeployConfig) -> Check {
    build.check(&format!("{path}build"))?;
    deploy.check(&format!("{path}deploy"))
}

fn upgrade_build(build: &BuildConfig) -> v2beta29::BuildConfig {
    v2beta29::BuildConfig {
        artifacts: build
            .artifacts
            .iter()
            .map(|a| v2beta29::Artifact {
                image: a.image.clone(),
                context: a.context.clone(),
                docker: a.docker.clone(),
                bazel: a.bazel.clone(),
                kaniko: a.kaniko.clone(),
                jib: a.jib.clone(),
                buildpacks: None,
            })
            .collect(),
        tag_policy: build.tag_policy.clone(),
        platforms: Vec::new(),
        local: build.local.clone(),
        google_cloud_build: build.google_cloud_build.clone(),
        cluster: build.cluster.clone(),
    }
}

fn upgrade_deploy(deploy: &DeployConfig) -> v2beta29::DeployConfig {
    v2beta29::DeployConfig {
        kubectl: deploy.kubectl.clone(),
        helm: deploy.helm.clone(),
        kustomize: deploy.kustomize.clone(),
        cloudrun: None,
        status_check_deadline_seconds: deploy.status_check_deadline_seconds,
        kube_context: deploy.kube_context.clone(),
        logs: deploy.logs.clone(),
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
        let next = v2beta29::SkaffoldConfig {
            api_version: v2beta29::VERSION.to_string(),
            kind: self.kind.clone(),
            metadata: self.metadata.clone(),
            requires: self.requires.clone(),
            build: upgrade_build(&self.build),
            test: self.test.clone(),
            deploy: upgrade_deploy(&self.deploy),
            port_forward: self.port_forward.clone(),
            profiles: self
                .profiles
                .iter()
                .map(|p| v2beta29::Profile {
                    name: p.name.clone(),
                    activation: p.activation.clone(),
                    build: upgrade_build(&p.build),
                    test: p.test.clone(),
                    deploy: upgrade_deploy(&p.deploy),
                    port_forward: p.port_forward.clone(),
                })
                .collect(),
        };
        Ok(Box::new(next))
    }
}
