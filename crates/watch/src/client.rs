//! Client for the notebook images API

use anyhow::{Context, Result};
use async_trait::async_trait;
use notebook_images_common::{
    CreDetails, CreImageStreamDetails, CreateImageRequest, ImageInfo, ImageUpdateRequest,
    OperationResponse,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::sync::Fetch;

const USER_HEADER: &str = "x-forwarded-user";

/// Client for interacting with the notebook images API
pub struct ImagesClient {
    base_url: String,
    user: Option<String>,
    client: reqwest::Client,
}

/// Reads a `{success, error}` body, whatever the status code.
async fn operation(response: Response) -> Result<OperationResponse> {
    let status = response.status();
    let body = response.text().await.context("Failed to read response body")?;

    match serde_json::from_str::<OperationResponse>(&body) {
        Ok(outcome) => Ok(outcome),
        Err(_) => anyhow::bail!("Request failed: {} {}", status, body),
    }
}

impl ImagesClient {
    /// Create a new client. `user` is forwarded as the caller identity.
    pub fn new(base_url: impl Into<String>, user: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api{}", self.base_url, path);
        debug!("{} {}", method, url);

        let builder = self.client.request(method, url);
        match &self.user {
            Some(user) => builder.header(USER_HEADER, user),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch {}: {}", path, response.status());
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))
    }

    /// All build intents, merged with their images
    pub async fn fetch_resources(&self) -> Result<Vec<CreDetails>> {
        self.get_json("/cre").await
    }

    /// One build intent, `None` once it is gone
    pub async fn get_resource(&self, id: &str) -> Result<Option<CreDetails>> {
        let response = self
            .request(Method::GET, &format!("/cre/{}", id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch resource {}: {}", id, response.status());
        }

        let details = response
            .json()
            .await
            .context("Failed to parse resource response")?;

        Ok(Some(details))
    }

    pub async fn create_resource(&self, request: &CreateImageRequest) -> Result<OperationResponse> {
        let response = self
            .request(Method::POST, "/cre")
            .json(request)
            .send()
            .await?;
        operation(response).await
    }

    pub async fn delete_resource(&self, id: &str) -> Result<OperationResponse> {
        let response = self
            .request(Method::DELETE, &format!("/cre/{}", id))
            .send()
            .await?;
        operation(response).await
    }

    /// Images offered to notebook users
    pub async fn fetch_images(&self) -> Result<Vec<ImageInfo>> {
        self.get_json("/images/jupyter").await
    }

    /// Images produced for build intents
    pub async fn fetch_cre_images(&self) -> Result<Vec<CreImageStreamDetails>> {
        self.get_json("/images/cre").await
    }

    pub async fn update_image(
        &self,
        image: &str,
        request: &ImageUpdateRequest,
    ) -> Result<OperationResponse> {
        let response = self
            .request(Method::PUT, &format!("/images/{}", image))
            .json(request)
            .send()
            .await?;
        operation(response).await
    }

    pub async fn delete_image(&self, image: &str) -> Result<OperationResponse> {
        let response = self
            .request(Method::DELETE, &format!("/images/{}", image))
            .send()
            .await?;
        operation(response).await
    }

    /// Deletes the build intent, then the image joined to it. The image is
    /// left alone when the intent could not be deleted.
    pub async fn delete_resource_with_image(&self, resource: &CreDetails) -> Result<OperationResponse> {
        let outcome = self.delete_resource(&resource.id).await?;
        if !outcome.success {
            return Ok(outcome);
        }

        match resource.image_id.as_deref() {
            Some(image) if resource.has_image => self.delete_image(image).await,
            _ => Ok(outcome),
        }
    }
}

#[async_trait]
impl Fetch for ImagesClient {
    async fn fetch(&self) -> Result<Vec<CreDetails>> {
        self.fetch_resources().await
    }
}
