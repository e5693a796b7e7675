//! Typed custom resources this layer reads and writes.
//!
//! `CustomRuntimeEnvironment` is the build intent a user submits; the operator
//! answers it with an `ImageStream` once an image exists.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use kube::CustomResource;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::keys;

/// Accepts `null` wherever an empty collection is meant.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Spec of a build intent record
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[kube(
    group = "meteor.zone",
    version = "v1alpha1",
    kind = "CustomRuntimeEnvironment",
    plural = "customruntimeenvironments",
    namespaced,
    schema = "disabled",
    status = "BuildIntentStatus",
    derive = "PartialEq"
)]
pub struct BuildIntentSpec {
    #[serde(flatten)]
    pub build: BuildSpec,
}

/// How the image should be obtained. Exactly one shape is persisted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "buildType")]
pub enum BuildSpec {
    ImageImport(ImageImportSpec),
    PackageList(PackageListSpec),
    GitRepository(GitRepositorySpec),
}

impl BuildSpec {
    pub fn build_type(&self) -> &'static str {
        match self {
            BuildSpec::ImageImport(_) => "ImageImport",
            BuildSpec::PackageList(_) => "PackageList",
            BuildSpec::GitRepository(_) => "GitRepository",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageImportSpec {
    pub from_image: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_secret: Option<SecretReference>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SecretReference {
    pub name: String,
}

/// Packages layered onto either a base image or a runtime environment.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageListSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_environment: Option<RuntimeEnvironment>,

    #[serde(default, deserialize_with = "nullable")]
    pub package_versions: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEnvironment {
    pub os_name: String,
    pub os_version: String,
    pub python_version: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GitRepositorySpec {
    pub repository: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
}

/// Coarse lifecycle reported by the operator
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildIntentStatus {
    #[serde(default, deserialize_with = "nullable")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
}

/// Standard Kubernetes condition
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,

    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// RFC 3339 timestamp, kept verbatim so a malformed value cannot poison the list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    pub fn transitioned_at(&self) -> Option<DateTime<Utc>> {
        self.last_transition_time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
    }
}

impl CustomRuntimeEnvironment {
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    /// User-facing name, falling back to the record name
    pub fn display_name(&self) -> Option<&str> {
        self.annotation(keys::DISPLAY_NAME)
            .or(self.metadata.name.as_deref())
    }
}

/// Spec of a produced image record
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "image.openshift.io",
    version = "v1",
    kind = "ImageStream",
    plural = "imagestreams",
    namespaced,
    schema = "disabled",
    status = "ImageStreamStatus",
    derive = "PartialEq"
)]
pub struct ImageStreamSpec {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagReference>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A declared tag. Fields we do not model ride along in `extra`, since a merge
/// patch replaces the whole tag list.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TagReference {
    pub name: String,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TagReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image_repository: Option<String>,

    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<NamedTagEventList>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Live tag entry under `status.tags`
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NamedTagEventList {
    pub tag: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ImageStream {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(key))
            .map(String::as_str)
    }

    /// True when `status.tags` lists the given tag
    pub fn has_live_tag(&self, tag: &str) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.tags.iter().any(|t| t.tag == tag))
    }
}

/// Metadata and tag changes applied to an image stream with a JSON merge patch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageStreamPatch {
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    /// Replaces the whole declared tag list when set
    pub tags: Option<Vec<TagReference>>,
}

impl ImageStreamPatch {
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty() && self.labels.is_empty() && self.tags.is_none()
    }

    pub fn to_merge_patch(&self) -> Value {
        let mut patch = serde_json::json!({
            "metadata": {
                "annotations": self.annotations,
                "labels": self.labels,
            }
        });
        if let Some(tags) = &self.tags {
            patch["spec"] = serde_json::json!({ "tags": tags });
        }
        patch
    }

    /// Applies the patch locally with merge-patch semantics: map keys are
    /// merged, the tag list is replaced.
    pub fn apply_to(&self, image: &mut ImageStream) {
        image
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .extend(self.annotations.clone());
        image
            .metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .extend(self.labels.clone());
        if let Some(tags) = &self.tags {
            image.spec.tags = tags.clone();
        }
    }
}
