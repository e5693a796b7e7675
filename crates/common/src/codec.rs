//! Structured values stored as string annotations and labels.
//!
//! Records are partly written by hand and by other controllers, so decoding
//! never fails: a missing or unreadable value yields the caller's fallback and
//! a diagnostic.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::records::{ImageStream, TagReference};

/// Ordering used for images without a usable order annotation
pub const DEFAULT_ORDER: i32 = 100;

/// Decodes a JSON annotation value, returning `fallback` when it is absent or
/// malformed.
pub fn decode<T: DeserializeOwned>(raw: Option<&str>, fallback: T) -> T {
    let Some(raw) = raw else {
        return fallback;
    };

    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Ignoring undecodable annotation value {:?}: {}", raw, e);
            fallback
        }
    }
}

/// Looks `key` up in an optional annotation or label map and decodes it.
pub fn decode_key<T: DeserializeOwned>(
    map: Option<&BTreeMap<String, String>>,
    key: &str,
    fallback: T,
) -> T {
    decode(map.and_then(|m| m.get(key)).map(String::as_str), fallback)
}

/// Serializes a value into its annotation form.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to encode annotation value: {}", e);
            String::new()
        }
    }
}

/// Permissive numeric parse of the order annotation
pub fn decode_order(raw: Option<&str>) -> i32 {
    raw.and_then(|r| r.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .map(|n| n as i32)
        .unwrap_or(DEFAULT_ORDER)
}

/// Declared tags that also appear in the image's live status. Anything else
/// is dropped without complaint.
pub fn materialized_tags(image: &ImageStream) -> impl Iterator<Item = &TagReference> {
    image
        .spec
        .tags
        .iter()
        .filter(move |tag| image.has_live_tag(&tag.name))
}
