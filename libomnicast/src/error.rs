//! Error types for Omnicast

use thiserror::Error;

use crate::registry::PlatformId;

pub type Result<T> = std::result::Result<T, OmnicastError>;

#[derive(Error, Debug)]
pub enum OmnicastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),

    #[error("Attachment rejected: {0}")]
    Compose(#[from] ComposeError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl OmnicastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            OmnicastError::InvalidInput(_) => 3,
            OmnicastError::Auth(_) => 2,
            OmnicastError::Platform(PlatformError::Authentication { .. }) => 2,
            OmnicastError::Platform(_) => 1,
            OmnicastError::Validation(_) => 1,
            OmnicastError::Compose(_) => 1,
            OmnicastError::Config(_) => 1,
            OmnicastError::Store(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read storage file: {0}")]
    Read(String),

    #[error("Failed to write storage file: {0}")]
    Write(String),

    #[error("Corrupt storage entry '{key}': {detail}")]
    Corrupt { key: String, detail: String },
}

/// Failures in the OAuth and token-lifecycle paths
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("Token exchange failed: {0}")]
    Exchange(String),

    #[error("Token verification failed: {0}")]
    Verification(String),

    #[error("Callback validation failed: {0}")]
    Callback(String),

    #[error("No eligible pages found for the connected Facebook account")]
    NoEligibleAccounts,
}

/// Rejections raised by the composer before an attachment is accepted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("File too large: {size} bytes (maximum {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Unsupported media type '{0}'. Select an image or video file")]
    UnsupportedType(String),
}

/// Per-platform publish failures, folded into that platform's outcome
#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("{} authentication failed: {detail}", .platform.display_name())]
    Authentication { platform: PlatformId, detail: String },

    #[error("{} publish failed: {detail}", .platform.display_name())]
    Publishing { platform: PlatformId, detail: String },

    #[error("{} network error: {detail}", .platform.display_name())]
    Network { platform: PlatformId, detail: String },
}

impl PlatformError {
    /// The platform this failure belongs to
    pub fn platform(&self) -> PlatformId {
        match self {
            PlatformError::Authentication { platform, .. }
            | PlatformError::Publishing { platform, .. }
            | PlatformError::Network { platform, .. } => *platform,
        }
    }
}
