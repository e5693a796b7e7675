//! Shared model and reconciliation logic for notebook images.
//!
//! Everything here is synchronous and free of I/O: the service crate feeds
//! records fetched from the cluster in, and gets normalized views and
//! validated build intents back out.

pub mod codec;
pub mod compiler;
pub mod error;
pub mod form;
pub mod keys;
pub mod merge;
pub mod projector;
pub mod records;
pub mod views;

pub use compiler::{BuildMode, CreateImageRequest};
pub use error::{Error, Result, StoreError};
pub use merge::Correlation;
pub use projector::{ImageList, ImageType};
pub use records::{
    BuildIntentSpec, BuildIntentStatus, BuildSpec, Condition, CustomRuntimeEnvironment,
    ImageStream, ImageStreamPatch, ImageStreamSpec, Phase, RuntimeEnvironment, TagReference,
};
pub use views::{
    CreDetails, CreImageStreamDetails, ImageInfo, ImageTagInfo, ImageUpdateRequest,
    OperationResponse, PackageRef, TagContent,
};
