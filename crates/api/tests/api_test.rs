//! Integration tests for the notebook images API

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use notebook_images_api::{create_router, AppState, MemoryStore};
use notebook_images_common::records::{ImageStreamStatus, NamedTagEventList};
use notebook_images_common::{keys, Correlation, ImageStream, ImageStreamSpec, TagReference};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

const ADMIN: &str = "admin";
const VIEWER: &str = "viewer";

/// Helper to create a test app over an in-memory store
fn create_test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());

    let state = AppState {
        store: store.clone(),
        correlation: Correlation::ForeignKey,
        admin_users: vec![ADMIN.to_string()],
        admin_groups: vec!["odh-admins".to_string()],
    };

    (create_router(state), store)
}

fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-forwarded-user", user);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };

    (status, json)
}

/// Image the operator publishes for a build intent
fn produced_image(name: &str, intent: &str) -> ImageStream {
    let mut image = ImageStream::new(
        name,
        ImageStreamSpec {
            tags: vec![TagReference::new("latest")],
            ..Default::default()
        },
    );
    image.metadata.labels = Some(BTreeMap::from([
        (keys::PART_OF.to_string(), keys::OPERATOR.to_string()),
        (keys::BUILD_INTENT.to_string(), intent.to_string()),
    ]));
    image.metadata.annotations = Some(BTreeMap::from([(
        keys::DISPLAY_NAME.to_string(),
        "Renamed by operator".to_string(),
    )]));
    image.status = Some(ImageStreamStatus {
        docker_image_repository: Some("registry.local/ns/image".to_string()),
        tags: vec![NamedTagEventList {
            tag: "latest".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    });
    image
}

fn import_body(name: &str) -> Value {
    json!({
        "buildType": "ImageImport",
        "name": name,
        "description": "imported",
        "fromImage": "quay.io/org/image:1.0"
    })
}

#[tokio::test]
async fn test_health_check() {
    let (app, _store) = create_test_app();

    let (status, json) = send(&app, request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "notebook-images-api");
}

#[tokio::test]
async fn test_authorization_tiers() {
    let (app, _store) = create_test_app();

    let (status, json) = send(&app, request("GET", "/api/cre", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].is_string());

    let (status, json) = send(&app, request("GET", "/api/cre", Some(VIEWER), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([]));

    let (status, _) = send(
        &app,
        request("POST", "/api/cre", Some(VIEWER), Some(import_body("x"))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // group membership is enough for admin
    let req = Request::builder()
        .method("DELETE")
        .uri("/api/cre/cre-1")
        .header("x-forwarded-user", "bob")
        .header("x-forwarded-groups", "users,odh-admins")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn test_create_and_list_resource() {
    let (app, _store) = create_test_app();

    let (status, json) = send(
        &app,
        request("POST", "/api/cre", Some(ADMIN), Some(import_body("My import"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(json["error"].is_null());

    let (status, json) = send(&app, request("GET", "/api/cre", Some(VIEWER), None)).await;
    assert_eq!(status, StatusCode::OK);

    let resources = json.as_array().unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0]["name"], "My import");
    assert_eq!(resources[0]["description"], "imported");
    // creator defaults to the caller
    assert_eq!(resources[0]["user"], ADMIN);
    assert_eq!(resources[0]["hasImage"], false);
    assert!(resources[0].get("visible").is_none());
    assert!(resources[0].get("imageId").is_none());
    assert!(resources[0]["id"].as_str().unwrap().starts_with("cre-"));
}

#[tokio::test]
async fn test_create_validation_and_duplicates() {
    let (app, _store) = create_test_app();

    let (status, json) = send(
        &app,
        request(
            "POST",
            "/api/cre",
            Some(ADMIN),
            Some(json!({"buildType": "ImageImport", "name": "No source"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("fromImage"));

    let (_, json) = send(
        &app,
        request("POST", "/api/cre", Some(ADMIN), Some(import_body("foo"))),
    )
    .await;
    assert_eq!(json["success"], true);

    let (status, json) = send(
        &app,
        request("POST", "/api/cre", Some(ADMIN), Some(import_body("FOO"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("already exists"));

    let (_, json) = send(&app, request("GET", "/api/cre", Some(VIEWER), None)).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_bodies_are_validation_failures() {
    let (app, store) = create_test_app();
    store
        .put_image_stream(produced_image("image-a", "cre-1"))
        .await
        .unwrap();

    let (status, json) = send(
        &app,
        request(
            "POST",
            "/api/cre",
            Some(ADMIN),
            Some(json!({"buildType": "Bogus", "name": "Unknown mode"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("Bogus"));

    let (status, json) = send(
        &app,
        request(
            "PUT",
            "/api/images/image-a",
            Some(ADMIN),
            Some(json!({"visible": "yes"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert!(json["error"].is_string());

    // nothing was written
    let (_, json) = send(&app, request("GET", "/api/cre", Some(VIEWER), None)).await;
    assert!(json.as_array().unwrap().is_empty());

    // auth still runs before the body is looked at
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/cre",
            Some(VIEWER),
            Some(json!({"buildType": "Bogus"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_merged_view_with_image() {
    let (app, store) = create_test_app();

    send(
        &app,
        request(
            "POST",
            "/api/cre",
            Some(ADMIN),
            Some(json!({
                "buildType": "PackageList",
                "name": "Data science",
                "baseImage": "quay.io/org/base:1",
                "packageVersions": ["numpy==1.24"]
            })),
        ),
    )
    .await;

    let (_, json) = send(&app, request("GET", "/api/cre", Some(VIEWER), None)).await;
    let id = json[0]["id"].as_str().unwrap().to_string();

    store
        .put_image_stream(produced_image("data-science-image", &id))
        .await
        .unwrap();

    let (status, json) = send(
        &app,
        request("GET", &format!("/api/cre/{}", id), Some(VIEWER), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hasImage"], true);
    assert_eq!(json["imageId"], "data-science-image");
    assert_eq!(json["resourceId"], id.as_str());
    // display fields prefer the image
    assert_eq!(json["name"], "Renamed by operator");
    assert_eq!(json["visible"], false);
    assert_eq!(json["packageAnnotations"], json!([]));

    let (_, json) = send(&app, request("GET", "/api/images/cre", Some(VIEWER), None)).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["id"], "data-science-image");

    // not visible yet, so not offered to notebook users
    let (_, json) = send(
        &app,
        request("GET", "/api/images/jupyter", Some(VIEWER), None),
    )
    .await;
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn test_get_unknown_resource() {
    let (app, _store) = create_test_app();

    let (status, json) = send(
        &app,
        request("GET", "/api/cre/cre-404", Some(VIEWER), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("cre-404"));
}

#[tokio::test]
async fn test_update_image_visibility() {
    let (app, store) = create_test_app();
    store
        .put_image_stream(produced_image("image-a", "cre-1"))
        .await
        .unwrap();

    let (status, json) = send(
        &app,
        request(
            "PUT",
            "/api/images/image-a",
            Some(ADMIN),
            Some(json!({
                "visible": true,
                "packageAnnotations": [{"name": "numpy", "version": "1.24"}]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (_, json) = send(
        &app,
        request("GET", "/api/images/jupyter", Some(VIEWER), None),
    )
    .await;
    let images = json.as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["name"], "image-a");
    assert_eq!(images[0]["display_name"], "Renamed by operator");
    assert_eq!(images[0]["tags"][0]["content"]["dependencies"][0]["name"], "numpy");

    // updating a vanished image is a no-op
    let (status, json) = send(
        &app,
        request(
            "PUT",
            "/api/images/gone",
            Some(ADMIN),
            Some(json!({"visible": false})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (app, store) = create_test_app();
    store
        .put_image_stream(produced_image("image-b", "cre-2"))
        .await
        .unwrap();

    for _ in 0..2 {
        let (status, json) = send(
            &app,
            request("DELETE", "/api/images/image-b", Some(ADMIN), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert!(json["error"].is_null());
    }

    let (_, json) = send(&app, request("GET", "/api/images/cre", Some(VIEWER), None)).await;
    assert_eq!(json, json!([]));
}
