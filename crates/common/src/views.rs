//! Normalized views returned to clients, plus the small request/response
//! bodies shared by the service and its clients.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::records::{Condition, Phase};

/// Version comparison operators accepted in package declarations,
/// longest first so `>=` wins over `>`.
const SPECIFIERS: [&str; 6] = ["==", ">=", "<=", "~=", "<", ">"];

/// A software or dependency declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRef {
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specifier: Option<String>,
}

impl PackageRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            specifier: None,
        }
    }

    /// Parses a requirement line such as `numpy>=1.2` or a bare `flask`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let split = SPECIFIERS
            .iter()
            .filter_map(|op| line.find(op).map(|at| (at, *op)))
            .min_by_key(|(at, op)| (*at, std::cmp::Reverse(op.len())));

        Some(match split {
            Some((at, op)) => Self {
                name: line[..at].trim().to_string(),
                version: line[at + op.len()..].trim().to_string(),
                specifier: Some(op.to_string()),
            },
            None => Self::new(line, ""),
        })
    }
}

/// Renders the requirement line handed to the image builder. A version
/// without a specifier is pinned with `==`.
impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            return write!(f, "{}", self.name);
        }
        let op = self.specifier.as_deref().unwrap_or("==");
        write!(f, "{}{}{}", self.name, op, self.version)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagContent {
    pub software: Vec<PackageRef>,
    pub dependencies: Vec<PackageRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTagInfo {
    pub name: String,
    pub content: TagContent,
    pub recommended: bool,
    pub default: bool,
    pub annotations: BTreeMap<String, String>,
}

/// Runtime image as offered to notebook users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub name: String,
    pub description: String,
    pub url: String,
    pub display_name: String,
    pub tags: Vec<ImageTagInfo>,
    pub order: i32,
    #[serde(rename = "dockerImageRepo")]
    pub docker_image_repo: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Produced image as seen by the build-intent views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreImageStreamDetails {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub phase: Option<Phase>,
    pub visible: bool,
    pub error: Vec<String>,
    pub package_annotations: Vec<PackageRef>,
    pub software_annotations: Vec<PackageRef>,
    pub uploaded: Option<String>,
    pub url: Option<String>,
    pub user: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Merged view of one build intent and, when present, its produced image.
///
/// Every image-derived field is `None` when `has_image` is false.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreDetails {
    pub id: String,
    pub resource_id: String,
    pub has_image: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_annotations: Option<Vec<PackageRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_annotations: Option<Vec<PackageRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

/// Partial update of a produced image's user-facing metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_annotations: Option<Vec<PackageRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_annotations: Option<Vec<PackageRef>>,
}

/// Outcome of a mutating call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResponse {
    pub success: bool,
    pub error: Option<String>,
}

impl OperationResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requirement_lines() {
        assert_eq!(
            PackageRef::parse("numpy>=1.21"),
            Some(PackageRef {
                name: "numpy".to_string(),
                version: "1.21".to_string(),
                specifier: Some(">=".to_string()),
            })
        );
        assert_eq!(PackageRef::parse("  flask "), Some(PackageRef::new("flask", "")));
        assert_eq!(
            PackageRef::parse("pandas ~= 2.0").unwrap().specifier.as_deref(),
            Some("~=")
        );
        assert_eq!(PackageRef::parse("scipy<2").unwrap().version, "2");
        assert_eq!(PackageRef::parse("   "), None);
    }

    #[test]
    fn test_requirement_rendering() {
        assert_eq!(PackageRef::new("numpy", "1.2").to_string(), "numpy==1.2");
        assert_eq!(PackageRef::new("flask", "").to_string(), "flask");
        assert_eq!(
            PackageRef::parse("torch>=2.1").unwrap().to_string(),
            "torch>=2.1"
        );
    }

    #[test]
    fn test_details_without_image_omit_image_fields() {
        let details = CreDetails {
            id: "cre-1".to_string(),
            resource_id: "cre-1".to_string(),
            ..Default::default()
        };

        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["hasImage"], false);
        assert!(value.get("visible").is_none());
        assert!(value.get("url").is_none());
        assert!(value.get("packageAnnotations").is_none());
    }

    #[test]
    fn test_operation_response_serializes_null_error() {
        let value = serde_json::to_value(OperationResponse::ok()).unwrap();
        assert_eq!(value, serde_json::json!({ "success": true, "error": null }));
    }
}
