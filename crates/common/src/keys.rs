//! Annotation and label keys shared with the dashboard and the operator.

pub const DISPLAY_NAME: &str = "opendatahub.io/notebook-image-name";
pub const DESCRIPTION: &str = "opendatahub.io/notebook-image-desc";
pub const CREATOR: &str = "opendatahub.io/notebook-image-creator";
pub const URL: &str = "opendatahub.io/notebook-image-url";
pub const PHASE: &str = "opendatahub.io/notebook-image-phase";
pub const MESSAGES: &str = "opendatahub.io/notebook-image-messages";
pub const ORDER: &str = "opendatahub.io/notebook-image-order";

// Tag annotations
pub const SOFTWARE: &str = "opendatahub.io/notebook-software";
pub const DEPENDENCIES: &str = "opendatahub.io/notebook-python-dependencies";
pub const RECOMMENDED: &str = "opendatahub.io/image-tag-recommended";
pub const DEFAULT: &str = "opendatahub.io/default-image";

// Labels
pub const VISIBLE: &str = "opendatahub.io/notebook-image";
pub const BUILD_INTENT: &str = "opendatahub.io/build-intent";
pub const PART_OF: &str = "app.kubernetes.io/part-of";
pub const CREATED_BY: &str = "app.kubernetes.io/created-by";

pub const OPERATOR: &str = "meteor-operator";
pub const CREATOR_APP: &str = "notebook-images";
