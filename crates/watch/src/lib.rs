//! Client side of the notebook images API
//!
//! `ImagesClient` wraps the REST surface; `ResourceWatch` keeps a polled
//! snapshot of the merged build intents that consumers can subscribe to.

pub mod client;
pub mod sync;

pub use client::ImagesClient;
pub use sync::{Fetch, ResourceWatch, Snapshot};
