use plugkit_bus::CommandError;
use thiserror::Error;

/// Why a command could not be applied to the external system.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Invalid(#[from] CommandError),

    #[error("unsupported method: {0}")]
    Unsupported(String),

    /// The provisioning API answered with a non-success OCS status.
    #[error("ownCloud rejected the request ({status_code}): {message}")]
    Rejected { status_code: u32, message: String },

    #[error("ownCloud returned HTTP {0}")]
    HttpStatus(u16),

    #[error("ownCloud unreachable: {0}")]
    Transport(String),

    #[error("unreadable ownCloud response: {0}")]
    Decode(String),
}
