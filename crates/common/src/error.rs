use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A creation mode's required fields were not supplied.
    #[error("{0}")]
    Validation(String),

    #[error("Unable to add notebook image: {0} already exists")]
    DuplicateName(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// True for errors caused by the caller's input rather than the store.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::DuplicateName(_))
    }
}

/// Failure of a call against the external record store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("request rejected ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;
