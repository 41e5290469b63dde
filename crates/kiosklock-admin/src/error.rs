//! Error types for the admin layer.

/// Errors raised by administrative operations.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// The presented pin does not match the configured one.
    #[error("admin pin rejected")]
    Unauthorized,
}
