//! Turns a creation request into a build intent record.
//!
//! Each mode has its own required-field contract. Every check here runs before
//! anything is written, so a rejected request leaves no partial state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keys;
use crate::records::{
    BuildIntentSpec, BuildSpec, CustomRuntimeEnvironment, GitRepositorySpec, ImageImportSpec,
    PackageListSpec, RuntimeEnvironment, SecretReference,
};
use crate::views::PackageRef;

/// Prefix of generated build intent names
pub const NAME_PREFIX: &str = "cre";

/// How the user wants to obtain the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildMode {
    /// Pull an existing image as is
    #[serde(rename = "import", alias = "ImageImport")]
    Import,
    /// Layer packages onto a base image or runtime environment
    #[serde(rename = "existing", alias = "PackageList")]
    Existing,
    /// Build from a requirements list on a fresh runtime environment
    #[serde(rename = "build")]
    Build,
    /// Build from a git repository
    #[serde(rename = "git", alias = "GitRepository")]
    Git,
}

/// Runtime environment as typed into a form; any part may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEnvironmentFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_version: Option<String>,
}

impl RuntimeEnvironmentFields {
    fn parts(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("osName", filled(&self.os_name)),
            ("osVersion", filled(&self.os_version)),
            ("pythonVersion", filled(&self.python_version)),
        ]
    }

    pub fn is_blank(&self) -> bool {
        self.parts().iter().all(|(_, v)| v.is_none())
    }

    /// Names of the parts that are still empty
    pub fn missing(&self) -> Vec<&'static str> {
        self.parts()
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn complete(&self) -> Option<RuntimeEnvironment> {
        Some(RuntimeEnvironment {
            os_name: filled(&self.os_name)?.to_string(),
            os_version: filled(&self.os_version)?.to_string(),
            python_version: filled(&self.python_version)?.to_string(),
        })
    }
}

/// Body of a creation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateImageRequest {
    #[serde(default, alias = "buildType", alias = "type")]
    pub mode: Option<BuildMode>,

    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "creator", skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    // import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_secret_name: Option<String>,

    // existing / build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_environment: Option<RuntimeEnvironmentFields>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub package_versions: Vec<String>,
    /// Free text, one requirement per line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<PackageRef>,

    // git
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
}

impl CreateImageRequest {
    /// All requested packages as requirement lines, in the order given
    pub fn package_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .package_versions
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if let Some(text) = &self.requirements {
            lines.extend(split_requirements(text));
        }
        lines.extend(
            self.packages
                .iter()
                .filter(|p| !p.name.trim().is_empty())
                .map(PackageRef::to_string),
        );
        lines
    }
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Splits multi-line requirements into trimmed, non-empty lines.
pub fn split_requirements(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validates the request against its mode and produces the spec to persist.
pub fn compile_spec(request: &CreateImageRequest) -> Result<BuildSpec> {
    if request.name.trim().is_empty() {
        return Err(Error::Validation("Parameter 'name' is required".to_string()));
    }

    let Some(mode) = request.mode else {
        return Err(Error::Validation(
            "Parameter 'buildType' is required: one of import, existing, build, git".to_string(),
        ));
    };

    match mode {
        BuildMode::Import => compile_import(request),
        BuildMode::Existing => compile_existing(request),
        BuildMode::Build => compile_build(request),
        BuildMode::Git => compile_git(request),
    }
}

fn compile_import(request: &CreateImageRequest) -> Result<BuildSpec> {
    let from_image = filled(&request.from_image).ok_or_else(|| {
        Error::Validation(
            "Parameter 'fromImage' is expected when using buildType: 'ImageImport'".to_string(),
        )
    })?;

    Ok(BuildSpec::ImageImport(ImageImportSpec {
        from_image: from_image.to_string(),
        image_pull_secret: filled(&request.image_pull_secret_name).map(|name| SecretReference {
            name: name.to_string(),
        }),
    }))
}

/// A base image wins over a runtime environment when both are given.
fn compile_existing(request: &CreateImageRequest) -> Result<BuildSpec> {
    let package_versions = request.package_lines();

    if let Some(base_image) = filled(&request.base_image) {
        return Ok(BuildSpec::PackageList(PackageListSpec {
            base_image: Some(base_image.to_string()),
            runtime_environment: None,
            package_versions,
        }));
    }

    let fields = request.runtime_environment.clone().unwrap_or_default();
    if fields.is_blank() {
        return Err(Error::Validation(
            "Parameter 'runtimeEnvironment' or 'baseImage' is expected when using buildType: 'PackageList'"
                .to_string(),
        ));
    }

    let runtime = require_runtime(&fields)?;
    Ok(BuildSpec::PackageList(PackageListSpec {
        base_image: None,
        runtime_environment: Some(runtime),
        package_versions,
    }))
}

fn compile_build(request: &CreateImageRequest) -> Result<BuildSpec> {
    let package_versions = request.package_lines();
    if package_versions.is_empty() {
        return Err(Error::Validation(
            "At least one package is expected when building a new image".to_string(),
        ));
    }

    let fields = request.runtime_environment.clone().unwrap_or_default();
    let runtime = require_runtime(&fields)?;

    Ok(BuildSpec::PackageList(PackageListSpec {
        base_image: None,
        runtime_environment: Some(runtime),
        package_versions,
    }))
}

fn require_runtime(fields: &RuntimeEnvironmentFields) -> Result<RuntimeEnvironment> {
    fields.complete().ok_or_else(|| {
        Error::Validation(format!(
            "Parameter 'runtimeEnvironment' is missing: {}",
            fields.missing().join(", ")
        ))
    })
}

fn compile_git(request: &CreateImageRequest) -> Result<BuildSpec> {
    let repository = filled(&request.repository).ok_or_else(|| {
        Error::Validation(
            "Parameter 'repository' is expected when using buildType: 'GitRepository'"
                .to_string(),
        )
    })?;

    Ok(BuildSpec::GitRepository(GitRepositorySpec {
        repository: repository.to_string(),
        git_ref: filled(&request.git_ref).map(str::to_string),
    }))
}

/// Rejects `name` when another intent already uses it, ignoring case.
/// `editing` names the record being updated, which may keep its own name.
///
/// This is a read-then-write check; two concurrent creators can both pass it.
pub fn check_duplicate_name(
    name: &str,
    existing: &[CustomRuntimeEnvironment],
    editing: Option<&str>,
) -> Result<()> {
    let wanted = name.trim().to_lowercase();

    let taken = existing
        .iter()
        .filter(|intent| editing.is_none() || intent.metadata.name.as_deref() != editing)
        .any(|intent| {
            let display = intent.annotation(keys::DISPLAY_NAME);
            let record = intent.metadata.name.as_deref();
            [display, record]
                .into_iter()
                .flatten()
                .any(|n| n.trim().to_lowercase() == wanted)
        });

    if taken {
        return Err(Error::DuplicateName(name.trim().to_string()));
    }
    Ok(())
}

/// Record name derived from the creation time
pub fn intent_name(created_at: DateTime<Utc>) -> String {
    format!("{}-{}", NAME_PREFIX, created_at.timestamp_millis())
}

/// Wraps a compiled spec into the record to persist.
pub fn build_intent(
    request: &CreateImageRequest,
    spec: BuildSpec,
    created_at: DateTime<Utc>,
) -> CustomRuntimeEnvironment {
    let name = intent_name(created_at);
    let mut intent = CustomRuntimeEnvironment::new(&name, BuildIntentSpec { build: spec });

    intent.metadata.annotations = Some(BTreeMap::from([
        (keys::DISPLAY_NAME.to_string(), request.name.trim().to_string()),
        (
            keys::DESCRIPTION.to_string(),
            request.description.clone().unwrap_or_default(),
        ),
        (
            keys::CREATOR.to_string(),
            request.user.clone().unwrap_or_default(),
        ),
    ]));
    intent.metadata.labels = Some(BTreeMap::from([
        (keys::PART_OF.to_string(), keys::OPERATOR.to_string()),
        (keys::CREATED_BY.to_string(), keys::CREATOR_APP.to_string()),
        (keys::BUILD_INTENT.to_string(), name),
    ]));
    intent
}

/// Full pipeline: field contract, duplicate guard, payload.
pub fn compile(
    request: &CreateImageRequest,
    existing: &[CustomRuntimeEnvironment],
    created_at: DateTime<Utc>,
) -> Result<CustomRuntimeEnvironment> {
    let spec = compile_spec(request)?;
    check_duplicate_name(&request.name, existing, None)?;
    Ok(build_intent(request, spec, created_at))
}
