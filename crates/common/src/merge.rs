//! Joins build intents with the images produced for them.
//!
//! Precedence when both halves exist:
//! - `id`, `resourceId`, `uploaded`, `phase` and `lastCondition` always come
//!   from the intent;
//! - `name`, `description` and `user` come from the image when it has a
//!   non-empty value, otherwise from the intent annotations;
//! - everything else only exists on the image and stays `None` without one.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::keys;
use crate::projector::{self, creation_time};
use crate::records::{BuildIntentStatus, Condition, CustomRuntimeEnvironment, ImageStream};
use crate::views::{CreDetails, CreImageStreamDetails};

/// How a produced image is matched to the intent it was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Correlation {
    /// `opendatahub.io/build-intent` label on the image, or an exact name match
    #[default]
    ForeignKey,
    /// Image name equals the intent name
    Exact,
    /// Image name contains the intent name. Prone to false positives.
    Substring,
}

impl Correlation {
    pub fn matches(&self, intent_name: &str, image: &ImageStream) -> bool {
        match self {
            Correlation::ForeignKey => {
                image.label(keys::BUILD_INTENT) == Some(intent_name) || image.name() == intent_name
            }
            Correlation::Exact => image.name() == intent_name,
            Correlation::Substring => image.name().contains(intent_name),
        }
    }
}

impl FromStr for Correlation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "foreign-key" | "label" => Ok(Correlation::ForeignKey),
            "exact" => Ok(Correlation::Exact),
            "substring" | "contains" => Ok(Correlation::Substring),
            other => Err(format!("unknown correlation mode: {}", other)),
        }
    }
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Correlation::ForeignKey => "foreign-key",
            Correlation::Exact => "exact",
            Correlation::Substring => "substring",
        })
    }
}

/// First image in store order that belongs to the intent
pub fn correlate<'a>(
    intent_name: &str,
    images: &'a [ImageStream],
    mode: Correlation,
) -> Option<&'a ImageStream> {
    if intent_name.is_empty() {
        return None;
    }
    let mut candidates = images.iter().filter(|image| mode.matches(intent_name, image));
    let found = candidates.next();
    if found.is_some() && candidates.next().is_some() {
        warn!(
            "Several images match build intent {}, using {}",
            intent_name,
            found.map(ImageStream::name).unwrap_or_default()
        );
    }
    found
}

/// Builds the merged view of every intent.
pub fn merge(
    intents: &[CustomRuntimeEnvironment],
    images: &[ImageStream],
    mode: Correlation,
) -> Vec<CreDetails> {
    intents
        .iter()
        .filter_map(|intent| {
            let name = intent.metadata.name.as_deref()?;
            let image = correlate(name, images, mode).map(projector::cre_image_details);
            merge_one(intent, image)
        })
        .collect()
}

/// Merged view of a single intent. `None` when the intent is gone, whether or
/// not an image for it is still around.
pub fn merge_by_id(
    id: &str,
    intents: &[CustomRuntimeEnvironment],
    images: &[ImageStream],
    mode: Correlation,
) -> Option<CreDetails> {
    let intent = intents
        .iter()
        .find(|intent| intent.metadata.name.as_deref() == Some(id))?;
    let image = correlate(id, images, mode).map(projector::cre_image_details);
    merge_one(intent, image)
}

pub fn merge_one(
    intent: &CustomRuntimeEnvironment,
    image: Option<CreImageStreamDetails>,
) -> Option<CreDetails> {
    let Some(id) = intent.metadata.name.clone() else {
        debug!("Skipping build intent without a name");
        return None;
    };

    let status = intent.status.as_ref();
    let from_intent = |key| intent.annotation(key).map(str::to_string);

    let mut details = CreDetails {
        resource_id: id.clone(),
        id,
        has_image: image.is_some(),
        name: from_intent(keys::DISPLAY_NAME),
        description: from_intent(keys::DESCRIPTION),
        user: from_intent(keys::CREATOR),
        phase: status.and_then(|s| s.phase),
        last_condition: status.and_then(last_condition).cloned(),
        uploaded: creation_time(&intent.metadata),
        ..Default::default()
    };

    if let Some(image) = image {
        details.name = non_empty(image.name).or(details.name);
        details.description = non_empty(image.description).or(details.description);
        details.user = non_empty(image.user).or(details.user);

        details.image_id = Some(image.id);
        details.visible = Some(image.visible);
        details.package_annotations = Some(image.package_annotations);
        details.software_annotations = Some(image.software_annotations);
        details.url = image.url;
        details.error = Some(image.error);
        details.labels = Some(image.labels);
    }

    Some(details)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Most recent condition by transition time. Without usable timestamps the
/// first entry wins, which is the order the operator writes them in.
pub fn last_condition(status: &BuildIntentStatus) -> Option<&Condition> {
    let first = status.conditions.first()?;
    let latest = status
        .conditions
        .iter()
        .filter_map(|c| c.transitioned_at().map(|at| (at, c)))
        // max_by_key keeps the last maximum; reverse so ties go to the earlier entry
        .rev()
        .max_by_key(|(at, _)| *at)
        .map(|(_, c)| c);
    Some(latest.unwrap_or(first))
}
