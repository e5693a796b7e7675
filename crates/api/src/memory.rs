//! In-process record store for development and tests

use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use notebook_images_common::{
    BuildIntentStatus, CustomRuntimeEnvironment, ImageStream, ImageStreamPatch, StoreError,
};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::store::{matches_selector, RecordStore, StoreResult};

/// Record store kept in memory, ordered by record name
#[derive(Default)]
pub struct MemoryStore {
    intents: Mutex<BTreeMap<String, CustomRuntimeEnvironment>>,
    images: Mutex<BTreeMap<String, ImageStream>>,
}

fn record_name(name: Option<&String>) -> StoreResult<String> {
    name.cloned().ok_or_else(|| StoreError::Api {
        code: 422,
        message: "metadata.name is required".to_string(),
    })
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an image stream, as the operator would.
    pub async fn put_image_stream(&self, mut image: ImageStream) -> StoreResult<()> {
        let name = record_name(image.metadata.name.as_ref())?;
        image
            .metadata
            .creation_timestamp
            .get_or_insert_with(|| Time(Utc::now()));

        self.images.lock().await.insert(name.clone(), image);
        debug!("Stored image stream: {}", name);
        Ok(())
    }

    /// Replaces the status of a build intent, as the operator would.
    pub async fn set_intent_status(&self, name: &str, status: BuildIntentStatus) -> StoreResult<()> {
        let mut intents = self.intents.lock().await;
        let intent = intents
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        intent.status = Some(status);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_build_intents(&self) -> StoreResult<Vec<CustomRuntimeEnvironment>> {
        Ok(self.intents.lock().await.values().cloned().collect())
    }

    async fn create_build_intent(&self, intent: &CustomRuntimeEnvironment) -> StoreResult<()> {
        let name = record_name(intent.metadata.name.as_ref())?;

        let mut intents = self.intents.lock().await;
        if intents.contains_key(&name) {
            return Err(StoreError::Api {
                code: 409,
                message: format!("customruntimeenvironments \"{}\" already exists", name),
            });
        }

        let mut stored = intent.clone();
        stored
            .metadata
            .creation_timestamp
            .get_or_insert_with(|| Time(Utc::now()));
        intents.insert(name.clone(), stored);

        info!("Created build intent: {}", name);
        Ok(())
    }

    async fn delete_build_intent(&self, name: &str) -> StoreResult<()> {
        match self.intents.lock().await.remove(name) {
            Some(_) => {
                info!("Deleted build intent: {}", name);
                Ok(())
            }
            None => Err(StoreError::NotFound(name.to_string())),
        }
    }

    async fn list_image_streams(
        &self,
        selector: &BTreeMap<String, String>,
    ) -> StoreResult<Vec<ImageStream>> {
        Ok(self
            .images
            .lock()
            .await
            .values()
            .filter(|image| matches_selector(image.metadata.labels.as_ref(), selector))
            .cloned()
            .collect())
    }

    async fn get_image_stream(&self, name: &str) -> StoreResult<ImageStream> {
        self.images
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn patch_image_stream(&self, name: &str, patch: &ImageStreamPatch) -> StoreResult<()> {
        let mut images = self.images.lock().await;
        let image = images
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        patch.apply_to(image);

        debug!("Patched image stream: {}", name);
        Ok(())
    }

    async fn delete_image_stream(&self, name: &str) -> StoreResult<()> {
        match self.images.lock().await.remove(name) {
            Some(_) => {
                info!("Deleted image stream: {}", name);
                Ok(())
            }
            None => Err(StoreError::NotFound(name.to_string())),
        }
    }
}
