//! `skaffold/v2alpha1`: kustomize takes several paths, port forwarding and
//! profile activation appear, and deploys can wait on a status check.

use serde::{Deserialize, Serialize};

use super::{each, one_of, v2beta1, Check};
use crate::error::Result;
use crate::versioned::{SchemaDocument, VersionedConfig};

pub use super::v1beta6::{
    Artifact, BazelArtifact, BuildConfig, ClusterDetails, DockerArtifact, DockerConfig,
    EnvTemplateTagger, GitTagger, GoogleCloudBuild, HelmDeploy, HelmRelease, KanikoArtifact,
    KanikoBuildContext, KubectlDeploy, KubectlFlags, LocalBuild, LocalDir, ShaTagger, TagPolicy,
    TestCase,
};

pub const VERSION: &str = "skaffold/v2alpha1";

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

/// Conditions under which a profile switches itself on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Activation {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub env: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kube_context: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PortForwardResource {
    pub resource_type: String,
    pub resource_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_port: Option<u16>,
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
pub struct KustomizeDeploy {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(skip_serializing_if = "KubectlFlags::is_empty")]
    pub flags: KubectlFlags,
}

fn check_pipeline(path: &str, build: &BuildConfig, deploy: &DeployConfig) -> Check {
    build.check(&format!("{path}build"))?;
    deploy.check(&format!("{path}deploy"))
}

fn upgrade_deploy(deploy: &DeployConfig) -> v2beta1::DeployConfig {
    v2beta1::DeployConfig {
        kubectl: deploy.kubectl.clone(),
        helm: deploy.helm.as_ref().map(|h| v2beta1::HelmDeploy {
            releases: h
                .releases
                .iter()
                .map(|r| v2beta1::HelmRelease {
                    name: r.name.clone(),
                    chart_path: r.chart_path.clone(),
                    values_files: if r.values_file_path.is_empty() {
                        Vec::new()
                    } else {
                        vec![r.values_file_path.clone()]
                    },
                    namespace: r.namespace.clone(),
                    version: r.version.clone(),
                    ..Default::default()
                })
                .collect(),
        }),
        kustomize: deploy.kustomize.clone(),
        status_check_deadline_seconds: deploy.status_check_deadline_seconds,
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
        let next = v2beta1::SkaffoldConfig {
            api_version: v2beta1::VERSION.to_string(),
            kind: self.kind.clone(),
            metadata: v2beta1::Metadata::default(),
            build: self.build.clone(),
            test: self.test.clone(),
            deploy: upgrade_deploy(&self.deploy),
            port_forward: self.port_forward.clone(),
            profiles: self
                .profiles
                .iter()
                .map(|p| v2beta1::Profile {
                    name: p.name.clone(),
                    activation: p.activation.clone(),
                    build: p.build.clone(),
                    test: p.test.clone(),
                    deploy: upgrade_deploy(&p.deploy),
                    port_forward: p.port_forward.clone(),
                })
                .collect(),
        };
        Ok(Box::new(next))
    }
}
