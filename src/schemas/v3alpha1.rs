//! `skaffold/v3alpha1`, first revision of the v2 lineage.
//!
//! Manifest rendering moves out of `deploy` into a `manifests` section;
//! `deploy` keeps only the deployers that apply already rendered output.

use serde::{Deserialize, Serialize};

use super::{each, one_of, v3, Check};
use crate::error::Result;
use crate::versioned::{SchemaDocument, VersionedConfig};

pub use super::v2beta29::{
    Activation, Artifact, BuildConfig, BuildpackArtifact, CloudRunDeploy, ConfigDependency,
    HelmDeploy, HelmRelease, KubectlFlags, LogsConfig, Metadata, PortForwardResource, TagPolicy,
    TestCase,
};

pub const VERSION: &str = "skaffold/v3alpha1";

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
    #[serde(skip_serializing_if = "RenderConfig::is_empty")]
    pub manifests: RenderConfig,
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
    #[serde(skip_serializing_if = "RenderConfig::is_empty")]
    pub manifests: RenderConfig,
    pub deploy: DeployConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub port_forward: Vec<PortForwardResource>,
}

/// How Kubernetes manifests are produced before deploying
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct RenderConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub raw_k8s: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kustomize: Option<Kustomize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmDeploy>,
}

impl RenderConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Kustomize {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DeployConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubectl: Option<KubectlDeployer>,
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
                ("cloudrun", self.cloudrun.is_some()),
            ],
        )
    }
}

/// Applies rendered manifests with kubectl
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct KubectlDeployer {
    #[serde(skip_serializing_if = "KubectlFlags::is_empty")]
    pub flags: KubectlFlags,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_namespace: String,
}

fn check_pipeline(path: &str, build: &BuildConfig, deploy: &DeployConfig) -> Check {
    build.check(&format!("{path}build"))?;
    deploy.check(&format!("{path}deploy"))
}

fn upgrade_manifests(manifests: &RenderConfig) -> v3::RenderConfig {
    v3::RenderConfig {
        raw_yaml: manifests.raw_k8s.clone(),
        kustomize: manifests.kustomize.clone(),
        helm: manifests.helm.clone(),
    }
}

fn upgrade_deploy(deploy: &DeployConfig) -> v3::DeployConfig {
    v3::DeployConfig {
        kubectl: deploy.kubectl.clone(),
        cloudrun: deploy.cloudrun.clone(),
        status_check: None,
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
        let next = v3::SkaffoldConfig {
            api_version: v3::VERSION.to_string(),
            kind: self.kind.clone(),
            metadata: self.metadata.clone(),
            requires: self.requires.clone(),
            build: self.build.clone(),
            test: self.test.clone(),
            manifests: upgrade_manifests(&self.manifests),
            deploy: upgrade_deploy(&self.deploy),
            port_forward: self.port_forward.clone(),
            profiles: self
                .profiles
                .iter()
                .map(|p| v3::Profile {
                    name: p.name.clone(),
                    activation: p.activation.clone(),
                    build: p.build.clone(),
                    test: p.test.clone(),
                    manifests: upgrade_manifests(&p.manifests),
                    deploy: upgrade_deploy(&p.deploy),
                    port_forward: p.port_forward.clone(),
                })
                .collect(),
        };
        Ok(Box::new(next))
    }
}
