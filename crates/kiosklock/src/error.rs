//! Unified error type for the Kiosklock control plane.

use kiosklock_admin::AdminError;
use kiosklock_protocol::{CredentialError, StatusParseError};
use kiosklock_session::SessionError;
use kiosklock_store::StoreError;
use kiosklock_webhook::WebhookError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `kiosklock` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
///
/// Per the system's recovery posture, nothing here is fatal: every
/// variant rejects one request and leaves the station in (or returns it
/// to) a safe locked state.
#[derive(Debug, thiserror::Error)]
pub enum KioskError {
    /// A credential-level error (malformed, wrong batch, bad signature).
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// A store-level error (backing file write, duplicate id).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A session-level error (state conflicts, unknown tokens).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A webhook-level error (shared secret mismatch).
    #[error(transparent)]
    Webhook(#[from] WebhookError),

    /// An admin-level error (pin rejected).
    #[error(transparent)]
    Admin(#[from] AdminError),

    /// A status literal that failed boundary normalization.
    #[error(transparent)]
    Status(#[from] StatusParseError),

    /// An admin reset request that doesn't add up (unknown mode, or a
    /// mode missing its required target).
    #[error("invalid admin reset request: {0}")]
    InvalidReset(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_credential_error() {
        let err = CredentialError::MalformedFormat;
        let kiosk_err: KioskError = err.into();
        assert!(matches!(kiosk_err, KioskError::Credential(_)));
    }

    #[test]
    fn test_from_webhook_error() {
        let err = WebhookError::Forbidden;
        let kiosk_err: KioskError = err.into();
        assert!(matches!(kiosk_err, KioskError::Webhook(_)));
        assert!(kiosk_err.to_string().contains("secret"));
    }

    #[test]
    fn test_from_admin_error() {
        let err = AdminError::Unauthorized;
        let kiosk_err: KioskError = err.into();
        assert!(matches!(kiosk_err, KioskError::Admin(_)));
    }

    #[test]
    fn test_from_status_parse_error() {
        let err = StatusParseError("done".into());
        let kiosk_err: KioskError = err.into();
        assert!(matches!(kiosk_err, KioskError::Status(_)));
        assert!(kiosk_err.to_string().contains("done"));
    }
}
