//! API handlers for the notebook images service

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use notebook_images_common::{
    Correlation, CreDetails, CreateImageRequest, Error, ImageList, ImageType, ImageUpdateRequest,
    OperationResponse,
};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    auth::{AdminAccess, ReadAccess},
    service,
    store::RecordStore,
};

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub correlation: Correlation,
    pub admin_users: Vec<String>,
    pub admin_groups: Vec<String>,
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

type Outcome = (StatusCode, Json<OperationResponse>);

/// Maps a mutation result onto `{success, error}`. Caller mistakes are a
/// normal 200 answer; store faults are logged and answered with 500.
fn outcome(result: notebook_images_common::Result<()>, action: &str) -> Outcome {
    match result {
        Ok(()) => (StatusCode::OK, Json(OperationResponse::ok())),
        Err(e) if e.is_user_error() => {
            info!("{} rejected: {}", action, e);
            (StatusCode::OK, Json(OperationResponse::failed(e.to_string())))
        }
        Err(e) => {
            error!("{} failed: {}", action, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(OperationResponse::failed(format!("{}: {}", action, e))),
            )
        }
    }
}

/// A body that does not deserialize is a validation failure like any other.
fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> notebook_images_common::Result<T> {
    match body {
        Ok(Json(payload)) => Ok(payload),
        Err(rejection) => {
            debug!("Invalid JSON in request body: {}", rejection);
            Err(Error::Validation(rejection.body_text()))
        }
    }
}

/// Health check
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "notebook-images-api"
    }))
}

/// List images of one family
pub async fn list_images_handler(
    State(state): State<Arc<AppState>>,
    ReadAccess(_): ReadAccess,
    Path(kind): Path<String>,
) -> Json<ImageList> {
    let kind = ImageType::from_param(&kind);
    Json(service::list_images(state.store.as_ref(), kind).await)
}

/// Update display metadata of a produced image
pub async fn update_image_handler(
    State(state): State<Arc<AppState>>,
    AdminAccess(identity): AdminAccess,
    Path(image): Path<String>,
    body: Result<Json<ImageUpdateRequest>, JsonRejection>,
) -> Outcome {
    const ACTION: &str = "Unable to update notebook image";
    let payload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return outcome(Err(e), ACTION),
    };
    info!("Updating image {} for {}", image, identity.user);

    let result = service::update_image(state.store.as_ref(), &image, &payload).await;
    outcome(result, ACTION)
}

/// Delete a produced image
pub async fn delete_image_handler(
    State(state): State<Arc<AppState>>,
    AdminAccess(identity): AdminAccess,
    Path(image): Path<String>,
) -> Outcome {
    info!("Deleting image {} for {}", image, identity.user);

    let result = service::delete_image(state.store.as_ref(), &image).await;
    outcome(result, "Unable to delete notebook image")
}

/// List merged build intents
pub async fn list_resources_handler(
    State(state): State<Arc<AppState>>,
    ReadAccess(_): ReadAccess,
) -> Json<Vec<CreDetails>> {
    Json(service::list_resources(state.store.as_ref(), state.correlation).await)
}

/// Get one merged build intent
pub async fn get_resource_handler(
    State(state): State<Arc<AppState>>,
    ReadAccess(_): ReadAccess,
    Path(id): Path<String>,
) -> Result<Json<CreDetails>, ApiError> {
    match service::get_resource(state.store.as_ref(), state.correlation, &id).await {
        Some(details) => Ok(Json(details)),
        None => Err(ApiError {
            status: StatusCode::NOT_FOUND,
            message: format!("CRE resource not found: {}", id),
        }),
    }
}

/// Submit a new build intent
pub async fn create_resource_handler(
    State(state): State<Arc<AppState>>,
    AdminAccess(identity): AdminAccess,
    body: Result<Json<CreateImageRequest>, JsonRejection>,
) -> Outcome {
    const ACTION: &str = "Unable to add CRE resource";
    let mut payload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return outcome(Err(e), ACTION),
    };
    info!("Creating CRE resource {} for {}", payload.name.trim(), identity.user);

    if payload.user.as_deref().filter(|u| !u.trim().is_empty()).is_none() {
        payload.user = Some(identity.user);
    }

    let result = service::create_resource(state.store.as_ref(), &payload)
        .await
        .map(|_| ());
    outcome(result, ACTION)
}

/// Delete a build intent
pub async fn delete_resource_handler(
    State(state): State<Arc<AppState>>,
    AdminAccess(identity): AdminAccess,
    Path(id): Path<String>,
) -> Outcome {
    info!("Deleting CRE resource {} for {}", id, identity.user);

    let result = service::delete_resource(state.store.as_ref(), &id).await;
    outcome(result, "Unable to delete CRE resource")
}
