//! Record store backed by the Kubernetes API

use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::Client;
use notebook_images_common::{CustomRuntimeEnvironment, ImageStream, ImageStreamPatch, StoreError};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::store::{selector_string, RecordStore, StoreResult};

/// Build intents and image streams of one namespace
pub struct KubeStore {
    intents: Api<CustomRuntimeEnvironment>,
    images: Api<ImageStream>,
}

impl KubeStore {
    /// Connect using the in-cluster or local kubeconfig
    pub async fn new(namespace: &str) -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client")?;

        info!("Connected to Kubernetes, namespace {}", namespace);

        Ok(Self::with_client(client, namespace))
    }

    pub fn with_client(client: Client, namespace: &str) -> Self {
        Self {
            intents: Api::namespaced(client.clone(), namespace),
            images: Api::namespaced(client, namespace),
        }
    }
}

/// 404 becomes `NotFound` so delete paths can treat it as done.
fn store_error(err: kube::Error, name: &str) -> StoreError {
    match err {
        kube::Error::Api(response) if response.code == 404 => StoreError::NotFound(name.to_string()),
        kube::Error::Api(response) => StoreError::Api {
            code: response.code,
            message: response.message,
        },
        other => StoreError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl RecordStore for KubeStore {
    async fn list_build_intents(&self) -> StoreResult<Vec<CustomRuntimeEnvironment>> {
        debug!("Listing build intents");
        let list = self
            .intents
            .list(&ListParams::default())
            .await
            .map_err(|e| store_error(e, "customruntimeenvironments"))?;
        Ok(list.items)
    }

    async fn create_build_intent(&self, intent: &CustomRuntimeEnvironment) -> StoreResult<()> {
        let name = intent.metadata.name.as_deref().unwrap_or_default();
        debug!("Creating build intent: {}", name);
        self.intents
            .create(&PostParams::default(), intent)
            .await
            .map_err(|e| store_error(e, name))?;
        Ok(())
    }

    async fn delete_build_intent(&self, name: &str) -> StoreResult<()> {
        debug!("Deleting build intent: {}", name);
        self.intents
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| store_error(e, name))?;
        Ok(())
    }

    async fn list_image_streams(
        &self,
        selector: &BTreeMap<String, String>,
    ) -> StoreResult<Vec<ImageStream>> {
        let selector = selector_string(selector);
        debug!("Listing image streams: {}", selector);
        let list = self
            .images
            .list(&ListParams::default().labels(&selector))
            .await
            .map_err(|e| store_error(e, "imagestreams"))?;
        Ok(list.items)
    }

    async fn get_image_stream(&self, name: &str) -> StoreResult<ImageStream> {
        self.images.get(name).await.map_err(|e| store_error(e, name))
    }

    async fn patch_image_stream(&self, name: &str, patch: &ImageStreamPatch) -> StoreResult<()> {
        debug!("Patching image stream: {}", name);
        self.images
            .patch(
                name,
                &PatchParams::default(),
                &Patch::Merge(patch.to_merge_patch()),
            )
            .await
            .map_err(|e| store_error(e, name))?;
        Ok(())
    }

    async fn delete_image_stream(&self, name: &str) -> StoreResult<()> {
        debug!("Deleting image stream: {}", name);
        self.images
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| store_error(e, name))?;
        Ok(())
    }
}
