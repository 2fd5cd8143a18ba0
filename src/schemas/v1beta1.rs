//! `skaffold/v1beta1`: artifacts are addressed by `image` and `context`;
//! container structure tests are introduced.

use serde::{Deserialize, Serialize};

use super::{each, one_of, v1beta6, Check};
use crate::error::{Result, SchemaError};
use crate::versioned::{SchemaDocument, VersionedConfig};

pub use super::v1alpha2::{
    BazelArtifact, DeployConfig, DockerArtifact, EnvTemplateTagger, GitTagger, GoogleCloudBuild,
    HelmDeploy, HelmRelease, KanikoBuild, KubectlDeploy, KubectlFlags, KustomizeDeploy,
    LocalBuild, ShaTagger, TagPolicy,
};

pub const VERSION: &str = "skaffold/v1beta1";

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
    pub kaniko: Option<KanikoBuild>,
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
}

/// Container structure tests run against one built image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct TestCase {
    pub image: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub structure_tests: Vec<String>,
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

/// Kaniko moves from a build type to a per-artifact builder running on a
/// cluster. Bazel artifacts have no in-cluster counterpart.
fn upgrade_build(
    path: &str,
    build: &BuildConfig,
) -> std::result::Result<v1beta6::BuildConfig, String> {
    let kaniko = build.kaniko.as_ref();
    let mut artifacts = Vec::with_capacity(build.artifacts.len());
    for (i, a) in build.artifacts.iter().enumerate() {
        let artifact = match kaniko {
            Some(k) => {
                if a.bazel.is_some() {
                    return Err(format!(
                        "{path}build.artifacts[{i}] ({}) is a bazel artifact, which in-cluster builds do not support",
                        a.image
                    ));
                }
                let docker = a.docker.clone().unwrap_or_default();
                v1beta6::Artifact {
                    image: a.image.clone(),
                    context: a.context.clone(),
                    kaniko: Some(v1beta6::KanikoArtifact {
                        dockerfile: docker.dockerfile,
                        build_args: docker.build_args,
                        build_context: (!k.gcs_bucket.is_empty()).then(|| {
                            v1beta6::KanikoBuildContext {
                                gcs_bucket: k.gcs_bucket.clone(),
                                ..Default::default()
                            }
                        }),
                    }),
                    ..Default::default()
                }
            }
            None => v1beta6::Artifact {
                image: a.image.clone(),
                context: a.context.clone(),
                docker: a.docker.clone(),
                bazel: a.bazel.clone(),
                kaniko: None,
            },
        };
        artifacts.push(artifact);
    }

    Ok(v1beta6::BuildConfig {
        artifacts,
        tag_policy: build.tag_policy.clone(),
        local: build.local.as_ref().map(|l| v1beta6::LocalBuild {
            push: l.skip_push.map(|skip| !skip),
            ..Default::default()
        }),
        google_cloud_build: build.google_cloud_build.clone(),
        cluster: kaniko.map(|k| v1beta6::ClusterDetails {
            pull_secret_path: k.pull_secret.clone(),
            pull_secret_name: k.pull_secret_name.clone(),
            namespace: k.namespace.clone(),
            timeout: k.timeout.clone(),
            docker_config: None,
        }),
    })
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
        let fail = |reason: String| SchemaError::Upgrade {
            from: VERSION.to_string(),
            to: v1beta6::VERSION.to_string(),
            reason,
        };

        let mut profiles = Vec::with_capacity(self.profiles.len());
        for (i, p) in self.profiles.iter().enumerate() {
            profiles.push(v1beta6::Profile {
                name: p.name.clone(),
                build: upgrade_build(&format!("profiles[{i}]."), &p.build).map_err(fail)?,
                test: p.test.clone(),
                deploy: p.deploy.clone(),
            });
        }

        let next = v1beta6::SkaffoldConfig {
            api_version: v1beta6::VERSION.to_string(),
            kind: self.kind.clone(),
            build: upgrade_build("", &self.build).map_err(fail)?,
            test: self.test.clone(),
            deploy: self.deploy.clone(),
            profiles,
        };
        Ok(Box::new(next))
    }
}
