use thiserror::Error;

use crate::transport::Method;

#[derive(Debug, Error)]
pub enum Error {
    /// Lookup, validation and planning failures.
    #[error(transparent)]
    Core(#[from] ndo_core::Error),

    /// The controller answered with a non-2xx status.
    #[error("{method} {path} failed with status {status}: {message}")]
    Transport {
        method: Method,
        path: String,
        status: u16,
        message: String,
    },

    /// The request did not produce a response.
    #[error("{method} {path} failed")]
    Http {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not set up the HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("invalid JSON in {context}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Core(ndo_core::Error::Validation(message.into()))
    }

    /// The core error, if this is one.
    pub fn as_core(&self) -> Option<&ndo_core::Error> {
        match self {
            Error::Core(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
