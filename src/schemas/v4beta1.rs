//! `skaffold/v4beta1`, the current schema.
//!
//! This is the canonical shape handed to callers once a v2-lineage config
//! has been fully upgraded. It adds `verify` test cases that run after a
//! deploy.

use serde::{Deserialize, Serialize};

use super::{each, Check};
use crate::error::Result;
use crate::versioned::{terminal, SchemaDocument, VersionedConfig};

pub use super::v3::{
    Activation, Artifact, BuildConfig, BuildpackArtifact, CloudRunDeploy, ConfigDependency,
    DeployConfig, HelmDeploy, HelmRelease, KubectlDeployer, KubectlFlags, Kustomize, LogsConfig,
    Metadata, PortForwardResource, RenderConfig, TagPolicy, TestCase,
};

pub const VERSION: &str = "skaffold/v4beta1";

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
    pub verify: Vec<VerifyTestCase>,
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
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub verify: Vec<VerifyTestCase>,
}

/// A container run to completion after deploying; a non-zero exit fails
/// verification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct VerifyTestCase {
    pub name: String,
    pub container: VerifyContainer,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct VerifyContainer {
    pub name: String,
    pub image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
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
