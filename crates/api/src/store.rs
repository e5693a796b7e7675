//! Record store seam
//!
//! Build intents and image streams live in an external system that other
//! actors mutate concurrently. Nothing here caches or locks across calls.

use async_trait::async_trait;
use notebook_images_common::{CustomRuntimeEnvironment, ImageStream, ImageStreamPatch, StoreError};
use std::collections::BTreeMap;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Access to build intent and produced image records
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_build_intents(&self) -> StoreResult<Vec<CustomRuntimeEnvironment>>;

    async fn create_build_intent(&self, intent: &CustomRuntimeEnvironment) -> StoreResult<()>;

    async fn delete_build_intent(&self, name: &str) -> StoreResult<()>;

    /// Image streams carrying every label in `selector`
    async fn list_image_streams(
        &self,
        selector: &BTreeMap<String, String>,
    ) -> StoreResult<Vec<ImageStream>>;

    async fn get_image_stream(&self, name: &str) -> StoreResult<ImageStream>;

    async fn patch_image_stream(&self, name: &str, patch: &ImageStreamPatch) -> StoreResult<()>;

    async fn delete_image_stream(&self, name: &str) -> StoreResult<()>;
}

/// Renders a label selector in `key=value,key=value` form
pub fn selector_string(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// True when `labels` carries every pair in `selector`
pub fn matches_selector(
    labels: Option<&BTreeMap<String, String>>,
    selector: &BTreeMap<String, String>,
) -> bool {
    selector
        .iter()
        .all(|(k, v)| labels.and_then(|l| l.get(k)) == Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_string() {
        let selector = BTreeMap::from([
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ]);
        assert_eq!(selector_string(&selector), "a=1,b=2");
        assert_eq!(selector_string(&BTreeMap::new()), "");
    }

    #[test]
    fn test_matches_selector() {
        let selector = BTreeMap::from([("tier".to_string(), "gold".to_string())]);
        let labels = BTreeMap::from([
            ("tier".to_string(), "gold".to_string()),
            ("other".to_string(), "x".to_string()),
        ]);

        assert!(matches_selector(Some(&labels), &selector));
        assert!(!matches_selector(None, &selector));
        assert!(matches_selector(None, &BTreeMap::new()));
    }
}
