use thiserror::Error;

/// Errors raised while looking up objects or planning a patch.
///
/// All of these are detected before anything is sent to the controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// More than one object matches a name based lookup.
    #[error("multiple {description} objects match {key}: indices {indices:?}")]
    AmbiguousMatch {
        description: String,
        key: String,
        indices: Vec<usize>,
    },

    /// An object that must already exist could not be found.
    #[error("{description} with {key} not found")]
    NotFound { description: String, key: String },

    /// A sub-section was enabled without the fields it requires.
    #[error("{section} is enabled but the following are missing: {}", .missing.join(", "))]
    MissingCompanions {
        section: String,
        missing: Vec<String>,
    },

    #[error("{0}")]
    Validation(String),

    /// The controller handed us data that violates its own guarantees.
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
