//! Store-driven operations behind the HTTP routes
//!
//! Reads degrade: a failed listing is logged and treated as empty, so one
//! unavailable collection never takes the merged view down with it. Writes
//! validate first and do not roll back if a later step fails; the next read
//! shows whatever actually landed.

use chrono::Utc;
use notebook_images_common::{
    codec, compiler, keys, merge, projector, Correlation, CreDetails, CreateImageRequest,
    CustomRuntimeEnvironment, Error, ImageList, ImageStream, ImageStreamPatch, ImageType,
    ImageUpdateRequest, Result, StoreError,
};
use std::collections::BTreeMap;
use tracing::{error, info};

use crate::store::RecordStore;

async fn intents_or_empty(store: &dyn RecordStore) -> Vec<CustomRuntimeEnvironment> {
    store.list_build_intents().await.unwrap_or_else(|e| {
        error!("Failed to list build intents: {}", e);
        Vec::new()
    })
}

async fn images_or_empty(
    store: &dyn RecordStore,
    selector: &BTreeMap<String, String>,
) -> Vec<ImageStream> {
    store.list_image_streams(selector).await.unwrap_or_else(|e| {
        error!("Failed to list image streams: {}", e);
        Vec::new()
    })
}

/// Images of one family, projected for clients
pub async fn list_images(store: &dyn RecordStore, kind: ImageType) -> ImageList {
    let images = images_or_empty(store, &kind.selector()).await;
    projector::project(kind, &images)
}

/// Merged view of every build intent
pub async fn list_resources(store: &dyn RecordStore, correlation: Correlation) -> Vec<CreDetails> {
    let selector = ImageType::Cre.selector();
    let (intents, images) = tokio::join!(
        intents_or_empty(store),
        images_or_empty(store, &selector)
    );
    merge::merge(&intents, &images, correlation)
}

/// Merged view of one build intent, `None` once the intent is gone
pub async fn get_resource(
    store: &dyn RecordStore,
    correlation: Correlation,
    id: &str,
) -> Option<CreDetails> {
    let selector = ImageType::Cre.selector();
    let (intents, images) = tokio::join!(
        intents_or_empty(store),
        images_or_empty(store, &selector)
    );
    merge::merge_by_id(id, &intents, &images, correlation)
}

/// Validates and persists a new build intent, returning its record name.
///
/// The duplicate-name guard reads before it writes, so concurrent creators
/// can still both succeed.
pub async fn create_resource(store: &dyn RecordStore, request: &CreateImageRequest) -> Result<String> {
    // Field contract errors win over a store that cannot be listed.
    compiler::compile_spec(request)?;

    // A failed listing aborts: the duplicate guard cannot run blind.
    let existing = store.list_build_intents().await?;
    let intent = compiler::compile(request, &existing, Utc::now())?;
    let name = intent.metadata.name.clone().unwrap_or_default();
    store.create_build_intent(&intent).await?;

    info!("Created build intent {} for image {}", name, request.name.trim());
    Ok(name)
}

/// Missing records count as deleted.
fn idempotent(result: std::result::Result<(), StoreError>) -> Result<()> {
    match result {
        Err(StoreError::NotFound(name)) => {
            info!("{} already gone", name);
            Ok(())
        }
        other => other.map_err(Error::from),
    }
}

pub async fn delete_resource(store: &dyn RecordStore, id: &str) -> Result<()> {
    idempotent(store.delete_build_intent(id).await)
}

pub async fn delete_image(store: &dyn RecordStore, name: &str) -> Result<()> {
    idempotent(store.delete_image_stream(name).await)
}

/// Applies a partial metadata update to a produced image.
pub async fn update_image(
    store: &dyn RecordStore,
    name: &str,
    request: &ImageUpdateRequest,
) -> Result<()> {
    if let Some(new_name) = request.name.as_deref().filter(|n| !n.trim().is_empty()) {
        let wanted = new_name.trim().to_lowercase();
        let siblings = store.list_image_streams(&ImageType::Cre.selector()).await?;
        let taken = siblings.iter().any(|image| {
            image.name() != name
                && request.id.as_deref() != Some(image.name())
                && image
                    .annotation(keys::DISPLAY_NAME)
                    .is_some_and(|n| n.trim().to_lowercase() == wanted)
        });
        if taken {
            return Err(Error::DuplicateName(new_name.trim().to_string()));
        }
    }

    let image = match store.get_image_stream(name).await {
        Ok(image) => image,
        Err(StoreError::NotFound(_)) => {
            info!("Image {} no longer exists, nothing to update", name);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let patch = image_patch(&image, request);
    if patch.is_empty() {
        return Ok(());
    }
    idempotent(store.patch_image_stream(name, &patch).await)?;

    info!("Updated image {}", name);
    Ok(())
}

/// Patch for the fields present in `request`. Package annotations go on the
/// image's primary tag, or its first declared tag when none is live yet.
fn image_patch(image: &ImageStream, request: &ImageUpdateRequest) -> ImageStreamPatch {
    let mut patch = ImageStreamPatch::default();

    if let Some(name) = request.name.as_deref().filter(|n| !n.trim().is_empty()) {
        patch
            .annotations
            .insert(keys::DISPLAY_NAME.to_string(), name.trim().to_string());
    }
    if let Some(description) = &request.description {
        patch
            .annotations
            .insert(keys::DESCRIPTION.to_string(), description.clone());
    }
    if let Some(visible) = request.visible {
        patch
            .labels
            .insert(keys::VISIBLE.to_string(), codec::encode(&visible));
    }

    let wants_tag_change =
        request.package_annotations.is_some() || request.software_annotations.is_some();
    let target = projector::primary_tag(image)
        .or_else(|| image.spec.tags.first())
        .map(|t| t.name.clone());

    if let (true, Some(target)) = (wants_tag_change, target) {
        let mut tags = image.spec.tags.clone();
        if let Some(tag) = tags.iter_mut().find(|t| t.name == target) {
            if let Some(packages) = &request.package_annotations {
                tag.annotations
                    .insert(keys::DEPENDENCIES.to_string(), codec::encode(packages));
            }
            if let Some(software) = &request.software_annotations {
                tag.annotations
                    .insert(keys::SOFTWARE.to_string(), codec::encode(software));
            }
        }
        patch.tags = Some(tags);
    }

    patch
}
