//! Projection of produced image records into client views.

use std::collections::BTreeMap;

use chrono::SecondsFormat;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::codec::{self, decode, decode_key};
use crate::keys;
use crate::records::{ImageStream, Phase, TagReference};
use crate::views::{CreImageStreamDetails, ImageInfo, ImageTagInfo, PackageRef, TagContent};

/// Which family of images a listing asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    /// Images offered to notebook users
    Notebook,
    /// Images produced for build intents
    Cre,
}

impl ImageType {
    /// Maps the `:type` path segment; anything but `cre` lists notebook images.
    pub fn from_param(param: &str) -> Self {
        if param.eq_ignore_ascii_case("cre") {
            ImageType::Cre
        } else {
            ImageType::Notebook
        }
    }

    pub fn selector(&self) -> BTreeMap<String, String> {
        let (key, value) = match self {
            ImageType::Notebook => (keys::VISIBLE, "true"),
            ImageType::Cre => (keys::PART_OF, keys::OPERATOR),
        };
        BTreeMap::from([(key.to_string(), value.to_string())])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageList {
    Cre(Vec<CreImageStreamDetails>),
    Notebook(Vec<ImageInfo>),
}

impl ImageList {
    pub fn len(&self) -> usize {
        match self {
            ImageList::Cre(items) => items.len(),
            ImageList::Notebook(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn project(kind: ImageType, images: &[ImageStream]) -> ImageList {
    match kind {
        ImageType::Cre => ImageList::Cre(images.iter().map(cre_image_details).collect()),
        ImageType::Notebook => ImageList::Notebook(images.iter().map(image_info).collect()),
    }
}

pub fn image_info(image: &ImageStream) -> ImageInfo {
    let name = image.name().to_string();
    let annotation = |key| image.annotation(key).unwrap_or_default().to_string();

    ImageInfo {
        description: annotation(keys::DESCRIPTION),
        url: annotation(keys::URL),
        display_name: image
            .annotation(keys::DISPLAY_NAME)
            .map(str::to_string)
            .unwrap_or_else(|| name.clone()),
        tags: tag_infos(image),
        order: codec::decode_order(image.annotation(keys::ORDER)),
        docker_image_repo: image
            .status
            .as_ref()
            .and_then(|s| s.docker_image_repository.clone())
            .unwrap_or_default(),
        labels: image.metadata.labels.clone().unwrap_or_default(),
        name,
    }
}

fn tag_infos(image: &ImageStream) -> Vec<ImageTagInfo> {
    if image.spec.tags.is_empty() {
        warn!("{} does not have any tags", image.name());
        return Vec::new();
    }

    codec::materialized_tags(image).map(tag_info).collect()
}

fn tag_info(tag: &TagReference) -> ImageTagInfo {
    ImageTagInfo {
        name: tag.name.clone(),
        content: tag_content(tag),
        recommended: decode(tag.annotation(keys::RECOMMENDED), false),
        default: decode(tag.annotation(keys::DEFAULT), false),
        annotations: tag.annotations.clone(),
    }
}

fn tag_content(tag: &TagReference) -> TagContent {
    TagContent {
        software: decode(tag.annotation(keys::SOFTWARE), Vec::new()),
        dependencies: decode(tag.annotation(keys::DEPENDENCIES), Vec::new()),
    }
}

/// The tag whose annotations describe a produced image: the first one that is
/// live in the image status.
pub fn primary_tag(image: &ImageStream) -> Option<&TagReference> {
    codec::materialized_tags(image).next()
}

pub fn cre_image_details(image: &ImageStream) -> CreImageStreamDetails {
    let annotations = image.metadata.annotations.as_ref();
    let packages = |key| -> Vec<PackageRef> {
        primary_tag(image)
            .map(|tag| decode(tag.annotation(key), Vec::new()))
            .unwrap_or_default()
    };

    CreImageStreamDetails {
        id: image.name().to_string(),
        name: image.annotation(keys::DISPLAY_NAME).map(str::to_string),
        description: image.annotation(keys::DESCRIPTION).map(str::to_string),
        phase: image.annotation(keys::PHASE).map(parse_phase),
        visible: decode_key(image.metadata.labels.as_ref(), keys::VISIBLE, false),
        error: decode_key(annotations, keys::MESSAGES, Vec::new()),
        package_annotations: packages(keys::DEPENDENCIES),
        software_annotations: packages(keys::SOFTWARE),
        uploaded: creation_time(&image.metadata),
        url: image.annotation(keys::URL).map(str::to_string),
        user: image.annotation(keys::CREATOR).map(str::to_string),
        labels: image.metadata.labels.clone().unwrap_or_default(),
    }
}

/// Phase annotations hold the bare word, not JSON.
fn parse_phase(raw: &str) -> Phase {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).unwrap_or(Phase::Unknown)
}

pub(crate) fn creation_time(meta: &ObjectMeta) -> Option<String> {
    meta.creation_timestamp
        .as_ref()
        .map(|t| t.0.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ImageStreamSpec, ImageStreamStatus, NamedTagEventList};
    use chrono::{TimeZone, Utc};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    fn live(tags: &[&str]) -> Option<ImageStreamStatus> {
        Some(ImageStreamStatus {
            docker_image_repository: Some("registry/ns/stream".to_string()),
            tags: tags
                .iter()
                .map(|t| NamedTagEventList {
                    tag: t.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        })
    }

    fn tag(name: &str, annotations: &[(&str, &str)]) -> TagReference {
        TagReference {
            name: name.to_string(),
            annotations: annotations
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_image_info_defaults() {
        let mut image = ImageStream::new(
            "s2i-generic",
            ImageStreamSpec {
                tags: vec![tag("1.0", &[])],
                ..Default::default()
            },
        );
        image.metadata.annotations = Some(BTreeMap::from([(
            keys::ORDER.to_string(),
            "soon".to_string(),
        )]));
        image.status = live(&["1.0"]);

        let info = image_info(&image);
        assert_eq!(info.display_name, "s2i-generic");
        assert_eq!(info.order, 100);
        assert_eq!(info.description, "");
        assert_eq!(info.docker_image_repo, "registry/ns/stream");
        assert_eq!(info.tags.len(), 1);
        assert!(!info.tags[0].recommended);
        assert!(info.tags[0].content.software.is_empty());
    }

    #[test]
    fn test_image_info_tags() {
        let mut image = ImageStream::new(
            "s2i-minimal",
            ImageStreamSpec {
                tags: vec![
                    tag(
                        "py38",
                        &[
                            (keys::SOFTWARE, r#"[{"name":"Python","version":"v3.8"}]"#),
                            (keys::DEPENDENCIES, "{broken"),
                            (keys::RECOMMENDED, "true"),
                        ],
                    ),
                    tag("py39", &[(keys::DEFAULT, "true")]),
                ],
                ..Default::default()
            },
        );
        image.metadata.annotations = Some(BTreeMap::from([
            (keys::DISPLAY_NAME.to_string(), "Minimal Python".to_string()),
            (keys::ORDER.to_string(), "3".to_string()),
        ]));
        image.status = live(&["py38"]);

        let info = image_info(&image);
        assert_eq!(info.display_name, "Minimal Python");
        assert_eq!(info.order, 3);
        assert_eq!(info.tags.len(), 1);
        let py38 = &info.tags[0];
        assert!(py38.recommended);
        assert_eq!(py38.content.software, vec![PackageRef::new("Python", "v3.8")]);
        assert!(py38.content.dependencies.is_empty());
    }

    #[test]
    fn test_image_without_tags() {
        let image = ImageStream::new("empty", ImageStreamSpec::default());
        assert!(image_info(&image).tags.is_empty());
    }

    #[test]
    fn test_cre_image_details() {
        let mut image = ImageStream::new(
            "cre-1670000000000",
            ImageStreamSpec {
                tags: vec![tag(
                    "latest",
                    &[(keys::DEPENDENCIES, r#"[{"name":"numpy","version":"1.24"}]"#)],
                )],
                ..Default::default()
            },
        );
        image.metadata.annotations = Some(BTreeMap::from([
            (keys::DISPLAY_NAME.to_string(), "Numpy image".to_string()),
            (keys::PHASE.to_string(), "Succeeded".to_string()),
            (keys::MESSAGES.to_string(), "not-a-list".to_string()),
        ]));
        image.metadata.labels = Some(BTreeMap::from([(
            keys::VISIBLE.to_string(),
            "true".to_string(),
        )]));
        image.metadata.creation_timestamp =
            Some(Time(Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap()));
        image.status = live(&["latest"]);

        let details = cre_image_details(&image);
        assert_eq!(details.id, "cre-1670000000000");
        assert_eq!(details.name.as_deref(), Some("Numpy image"));
        assert_eq!(details.phase, Some(Phase::Succeeded));
        assert!(details.visible);
        assert!(details.error.is_empty());
        assert_eq!(details.package_annotations, vec![PackageRef::new("numpy", "1.24")]);
        assert!(details.software_annotations.is_empty());
        assert_eq!(details.uploaded.as_deref(), Some("2023-01-02T03:04:05Z"));
    }

    #[test]
    fn test_image_type_selector() {
        assert_eq!(ImageType::from_param("cre"), ImageType::Cre);
        assert_eq!(ImageType::from_param("jupyter"), ImageType::Notebook);
        assert_eq!(
            ImageType::Cre.selector().get(keys::PART_OF).map(String::as_str),
            Some(keys::OPERATOR)
        );
    }
}
