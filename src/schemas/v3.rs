//! `skaffold/v3`

use serde::{Deserialize, Serialize};

use super::{each, one_of, v4beta1, Check};
use crate::error::Result;
use crate::versioned::{SchemaDocument, VersionedConfig};

pub use super::v3alpha1::{
    Activation, Artifact, BuildConfig, BuildpackArtifact, CloudRunDeploy, ConfigDependency,
    HelmDeploy, HelmRelease, KubectlDeployer, KubectlFlags, Kustomize, LogsConfig, Metadata,
    PortForwardResource, TagPolicy, TestCase,
};

pub const VERSION: &str = "skaffold/v3";

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

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct RenderConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub raw_yaml: Vec<String>,
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
pub struct DeployConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubectl: Option<KubectlDeployer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloudrun: Option<CloudRunDeploy>,
    /// Wait for deployed resources to stabilize
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_check: Option<bool>,
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
        let next = v4beta1::SkaffoldConfig {
            api_version: v4beta1::VERSION.to_string(),
            kind: self.kind.clone(),
            metadata: self.metadata.clone(),
            requires: self.requires.clone(),
            build: self.build.clone(),
            test: self.test.clone(),
            manifests: self.manifests.clone(),
            deploy: self.deploy.clone(),
            port_forward: self.port_forward.clone(),
            verify: Vec::new(),
            profiles: self
                .profiles
                .iter()
                .map(|p| v4beta1::Profile {
                    name: p.name.clone(),
                    activation: p.activation.clone(),
                    build: p.build.clone(),
                    test: p.test.clone(),
                    manifests: p.manifests.clone(),
                    deploy: p.deploy.clone(),
                    port_forward: p.port_forward.clone(),
                    verify: Vec::new(),
                })
                .collect(),
        };
        Ok(Box::new(next))
    }
}
