/// Failure modes of a single resource fetch.
///
/// Errors carry owned messages instead of the transport error so they can be
/// cloned into every cache consumer of the failing key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("network error: {message}")]
    Network {
        /// Transport error description.
        message: String,
    },

    /// The server answered with a non-2xx status.
    #[error("request failed with status {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },

    /// The body was not a valid `{data: T}` envelope.
    #[error("malformed response envelope: {message}")]
    Decode {
        /// Decoder error description.
        message: String,
    },
}

impl FetchError {
    /// HTTP status, for `Http` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Http {
                status: status.as_u16(),
            },
            None => Self::Network {
                message: err.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }
}
