use std::sync::Arc;

use shamba_types::api::ValidationError;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Cloneable so a single failed request can be handed to every caller
/// waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Rejected locally; nothing was sent.
    #[error("{0}")]
    Validation(String),
    /// The server answered with an error body.
    #[error("{message}")]
    Api { status: u16, code: String, message: String },
    #[error("request failed: {0}")]
    Http(Arc<reqwest::Error>),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("Sign in required")]
    NotSignedIn,
}

impl ClientError {
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_store_required(&self) -> bool {
        self.code() == Some("store_required")
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::NotSignedIn | Self::Api { status: 401, .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(Arc::new(e))
    }
}

impl From<ValidationError> for ClientError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.0)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
