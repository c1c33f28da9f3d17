//! Error taxonomy for the portal client.
//!
//! Every asynchronous boundary converts its failure into exactly one of
//! these variants and surfaces it once. Nothing in this crate retries
//! automatically.

/// Errors surfaced to the user by any portal operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PortalError {
    /// Microphone access was denied or the input device is unavailable.
    PermissionDenied(String),
    /// No audio encoding is supported by both the encoder and playback.
    UnsupportedFormat,
    /// Transport-level failure (connection refused, timeout, DNS, ...).
    Network(String),
    /// The backend answered with a non-2xx status.
    Server { status: u16, message: String },
    /// Device or encoding failure during capture.
    Capture(String),
}

impl std::fmt::Display for PortalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortalError::PermissionDenied(reason) => {
                write!(f, "Microphone access denied: {}", reason)
            }
            PortalError::UnsupportedFormat => {
                write!(
                    f,
                    "No audio format is supported for both recording and playback"
                )
            }
            PortalError::Network(e) => write!(f, "Network error: {}", e),
            PortalError::Server { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            PortalError::Capture(e) => write!(f, "Audio capture failed: {}", e),
        }
    }
}

impl std::error::Error for PortalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_detail() {
        let err = PortalError::Server {
            status: 422,
            message: "blood pressure format".to_string(),
        };
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("blood pressure format"));

        let err = PortalError::PermissionDenied("user dismissed prompt".to_string());
        assert!(err.to_string().contains("user dismissed prompt"));
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PortalError>();
    }
}
