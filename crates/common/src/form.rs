//! Creation form as an explicit state machine.
//!
//! `reduce` is a pure `(state, action) -> state` function. The form only
//! reaches `Validated` when the same contract the compiler enforces passes, and
//! only a validated form can be marked submitted.

use std::collections::BTreeMap;

use crate::compiler::{self, BuildMode, CreateImageRequest, RuntimeEnvironmentFields};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Name,
    Description,
    FromImage,
    ImagePullSecretName,
    BaseImage,
    Requirements,
    OsName,
    OsVersion,
    PythonVersion,
    Repository,
    GitRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormStage {
    #[default]
    Unselected,
    Editing(BuildMode),
    Validated(BuildMode),
    Submitted(BuildMode),
}

impl FormStage {
    pub fn mode(&self) -> Option<BuildMode> {
        match *self {
            FormStage::Unselected => None,
            FormStage::Editing(m) | FormStage::Validated(m) | FormStage::Submitted(m) => Some(m),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    /// Picks a creation mode and starts from empty fields
    Select(BuildMode),
    Set(Field, String),
    Validate,
    MarkSubmitted,
    Clear,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub stage: FormStage,
    pub fields: BTreeMap<Field, String>,
    /// Message from the last failed validation
    pub error: Option<String>,
}

impl FormState {
    pub fn value(&self, field: Field) -> Option<String> {
        self.fields
            .get(&field)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }

    /// Request for the compiler, or `None` before a mode is chosen.
    pub fn to_request(&self, user: Option<&str>) -> Option<CreateImageRequest> {
        let mode = self.stage.mode()?;
        let runtime = RuntimeEnvironmentFields {
            os_name: self.value(Field::OsName),
            os_version: self.value(Field::OsVersion),
            python_version: self.value(Field::PythonVersion),
        };

        Some(CreateImageRequest {
            mode: Some(mode),
            name: self.value(Field::Name).unwrap_or_default(),
            description: self.value(Field::Description),
            user: user.map(str::to_string),
            from_image: self.value(Field::FromImage),
            image_pull_secret_name: self.value(Field::ImagePullSecretName),
            base_image: self.value(Field::BaseImage),
            runtime_environment: (!runtime.is_blank()).then_some(runtime),
            requirements: self.value(Field::Requirements),
            repository: self.value(Field::Repository),
            git_ref: self.value(Field::GitRef),
            ..Default::default()
        })
    }
}

pub fn reduce(state: FormState, action: FormAction) -> FormState {
    match action {
        FormAction::Clear => FormState::default(),

        FormAction::Select(mode) => FormState {
            stage: FormStage::Editing(mode),
            ..FormState::default()
        },

        FormAction::Set(field, value) => {
            let Some(mode) = state.stage.mode() else {
                return state;
            };
            let mut fields = state.fields;
            fields.insert(field, value);
            FormState {
                stage: FormStage::Editing(mode),
                fields,
                error: None,
            }
        }

        FormAction::Validate => {
            let Some(request) = state.to_request(None) else {
                return state;
            };
            let Some(mode) = state.stage.mode() else {
                return state;
            };
            match compiler::compile_spec(&request) {
                Ok(_) => FormState {
                    stage: FormStage::Validated(mode),
                    error: None,
                    ..state
                },
                Err(e) => FormState {
                    stage: FormStage::Editing(mode),
                    error: Some(e.to_string()),
                    ..state
                },
            }
        }

        FormAction::MarkSubmitted => match state.stage {
            FormStage::Validated(mode) => FormState {
                stage: FormStage::Submitted(mode),
                ..state
            },
            _ => state,
        },
    }
}
