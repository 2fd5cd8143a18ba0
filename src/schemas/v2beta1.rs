//! `skaffold/v2beta1`: helm releases take a list of values files and
//! configs get a `metadata` block.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{each, one_of, v2beta8, Check};
use crate::error::Result;
use crate::versioned::{SchemaDocument, VersionedConfig};

pub use super::v2alpha1::{
    Activation, Artifact, BazelArtifact, BuildConfig, ClusterDetails, DockerArtifact, DockerConfig,
    EnvTemplateTagger, GitTagger, GoogleCloudBuild, KanikoArtifact, KanikoBuildContext,
    KubectlDeploy, KubectlFlags, KustomizeDeploy, LocalBuild, LocalDir, PortForwardResource,
    ShaTagger, TagPolicy, TestCase,
};

pub const VERSION: &str = "skaffold/v2beta1";

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
pub struct Metadata {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
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
pub struct DeployConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubectl: Option<KubectlDeploy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmDeploy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kustomize: Option<KustomizeDeploy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_check_deadline_seconds: Option<u32>,
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
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values_files: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub set_values: BTreeMap<String, String>,
}

fn check_pipeline(path: &str, build: &BuildConfig, deploy: &DeployConfig) -> Check {
    build.check(&format!("{path}build"))?;
    deploy.check(&format!("{path}deploy"))
}

fn upgrade_build(build: &BuildConfig) -> v2beta8::BuildConfig {
    v2beta8::BuildConfig {
        artifacts: build
            .artifacts
            .iter()
            .map(|a| v2beta8::Artifact {
                image: a.image.clone(),
                context: a.context.clone(),
                docker: a.docker.clone(),
                bazel: a.bazel.clone(),
                kaniko: a.kaniko.as_ref().map(|k| v2beta8::KanikoArtifact {
                    dockerfile: k.dockerfile.clone(),
                    build_args: k.build_args.clone(),
                    build_context: k.build_context.clone(),
                    ..Default::default()
                }),
                jib: None,
            })
            .collect(),
        tag_policy: build.tag_policy.clone(),
        local: build.local.clone(),
        google_cloud_build: build.google_cloud_build.as_ref().map(|g| v2beta8::GoogleCloudBuild {
            project_id: g.project_id.clone(),
            ..Default::default()
        }),
        cluster: build.cluster.as_ref().map(|c| v2beta8::ClusterDetails {
            pull_secret_path: c.pull_secret_path.clone(),
            pull_secret_name: c.pull_secret_name.clone(),
            namespace: c.namespace.clone(),
            timeout: c.timeout.clone(),
            docker_config: c.docker_config.clone(),
            ..Default::default()
        }),
    }
}

fn upgrade_deploy(deploy: &DeployConfig) -> v2beta8::DeployConfig {
    v2beta8::DeployConfig {
        kubectl: deploy.kubectl.clone(),
        helm: deploy.helm.clone(),
        kustomize: deploy.kustomize.clone(),
        status_check_deadline_seconds: deploy.status_check_deadline_seconds,
        kube_context: String::new(),
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
        let next = v2beta8::SkaffoldConfig {
            api_version: v2beta8::VERSION.to_string(),
            kind: self.kind.clone(),
            metadata: self.metadata.clone(),
            build: upgrade_build(&self.build),
            test: self.test.clone(),
            deploy: upgrade_deploy(&self.deploy),
            port_forward: self.port_forward.clone(),
            profiles: self
                .profiles
                .iter()
                .map(|p| v2beta8::Profile {
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
