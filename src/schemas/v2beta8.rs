//! `skaffold/v2beta8`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{each, one_of, v2beta14, Check};
use crate::error::Result;
use crate::versioned::{SchemaDocument, VersionedConfig};

pub use super::v2beta1::{
    Activation, BazelArtifact, DockerArtifact, DockerConfig, EnvTemplateTagger, GitTagger,
    HelmDeploy, HelmRelease, KanikoBuildContext, KubectlDeploy, KubectlFlags, KustomizeDeploy,
    LocalBuild, LocalDir, Metadata, PortForwardResource, ShaTagger, TagPolicy, TestCase,
};

pub const VERSION: &str = "skaffold/v2beta8";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SkaffoldConfig {
    pub api_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalBuild>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_cloud_build: Option<GoogleCloudBuild>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterDetails>,
}

/// Google Cloud Build settings, including the builder image per artifact type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GoogleCloudBuild {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub machine_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub docker_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub maven_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub gradle_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kaniko_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pack_image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ClusterDetails {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pull_secret_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pull_secret_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pull_secret_mount_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timeout: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_config: Option<DockerConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

/// A pod volume made available to in-cluster builds. Exactly one source
/// is expected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Volume {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapVolumeSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretVolumeSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_dir: Option<EmptyDirVolumeSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ConfigMapVolumeSource {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SecretVolumeSource {
    pub secret_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct EmptyDirVolumeSource {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub medium: String,
}

impl Volume {
    fn check(&self, path: &str) -> Check {
        one_of(
            || path.to_string(),
            &[
                ("configMap", self.config_map.is_some()),
                ("secret", self.secret.is_some()),
                ("emptyDir", self.empty_dir.is_some()),
            ],
        )
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
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct KanikoArtifact {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dockerfile: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub build_args: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_context: Option<KanikoBuildContext>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub init_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

/// Builds with Maven or Gradle through the jib plugin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct JibArtifact {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub project: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
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
    pub status_check_deadline_seconds: Option<u32>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kube_context: String,
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

impl Artifact {
    pub(crate) fn check(&self, path: &str) -> Check {
        one_of(
            || path.to_string(),
            &[
                ("docker", self.docker.is_some()),
                ("bazel", self.bazel.is_some()),
                ("kaniko", self.kaniko.is_some()),
                ("jib", self.jib.is_some()),
            ],
        )?;
        match self.kaniko.as_ref().and_then(|k| k.build_context.as_ref()) {
            Some(context) => context.check(&format!("{path}.kaniko")),
            None => Ok(()),
        }
    }
}

impl ClusterDetails {
    pub(crate) fn check(&self, path: &str) -> Check {
        each(&format!("{path}.volumes"), &self.volumes, |p, v| v.check(p))
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
        if let Some(cluster) = &self.cluster {
            cluster.check(&format!("{path}.cluster"))?;
        }
        each(&format!("{path}.artifacts"), &self.artifacts, |p, a| a.check(p))
    }
}

fn check_pipeline(path: &str, build: &BuildConfig, deploy: &DeployConfig) -> Check {
    build.check(&format!("{path}build"))?;
    deploy.check(&format!("{path}deploy"))
}

fn upgrade_build(build: &BuildConfig) -> v2beta14::BuildConfig {
    let policy = &build.tag_policy;
    v2beta14::BuildConfig {
        artifacts: build.artifacts.clone(),
        tag_policy: v2beta14::TagPolicy {
            git_commit: policy.git_commit.clone(),
            sha256: policy.sha256.clone(),
            env_template: policy.env_template.clone(),
            ..Default::default()
        },
        local: build.local.clone(),
        google_cloud_build: build.google_cloud_build.clone(),
        cluster: build.cluster.clone(),
    }
}

fn upgrade_deploy(deploy: &DeployConfig) -> v2beta14::DeployConfig {
    v2beta14::DeployConfig {
        kubectl: deploy.kubectl.clone(),
        helm: deploy.helm.clone(),
        kustomize: deploy.kustomize.clone(),
        status_check_deadline_seconds: deploy.status_check_deadline_seconds,
        kube_context: deploy.kube_context.clone(),
        logs: v2beta14::LogsConfig::default(),
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
        let next = v2beta14::SkaffoldConfig {
            api_version: v2beta14::VERSION.to_string(),
            kind: self.kind.clone(),
            metadata: self.metadata.clone(),
            requires: Vec::new(),
            build: upgrade_build(&self.build),
            test: self.test.clone(),
            deploy: upgrade_deploy(&self.deploy),
            port_forward: self.port_forward.clone(),
            profiles: self
                .profiles
                .iter()
                .map(|p| v2beta14::Profile {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_sources_are_exclusive() {
        let volume = Volume {
            name: "docker-config".to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: "cm".to_string(),
            }),
            secret: Some(SecretVolumeSource {
                secret_name: "s".to_string(),
            }),
            empty_dir: None,
        };
        let cluster = ClusterDetails {
            volumes: vec![volume],
            ..Default::default()
        };

        let err = cluster.check("build.cluster").unwrap_err();
        assert_eq!(err.path, "build.cluster.volumes[0]");
        assert_eq!(err.set, vec!["configMap", "secret"]);
    }

    #[test]
    fn test_kaniko_and_docker_are_exclusive() {
        let artifact = Artifact {
            image: "app".to_string(),
            docker: Some(DockerArtifact::default()),
            kaniko: Some(KanikoArtifact::default()),
            ..Default::default()
        };
        assert!(artifact.check("build.artifacts[0]").is_err());
    }
}
