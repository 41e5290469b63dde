//! Error types for the session layer.

use kiosklock_protocol::{
    CredentialError, ScanReject, TokenId, TokenStatus,
};

/// Errors raised by session transitions.
///
/// All of these are client-input or state-conflict errors: they reject
/// one scan (or one misplaced finalize) and leave everything else as it
/// was. None are fatal.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The presented credential failed verification.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The credential verified, but no such token exists in the store.
    #[error("no token {0} exists in the active batch")]
    UnknownToken(TokenId),

    /// The token already completed a session — single-use means once.
    #[error("token {0} has already been used")]
    AlreadyUsed(TokenId),

    /// The token is claimed by a session right now.
    #[error("token {0} is currently in use")]
    TokenInUse(TokenId),

    /// The token is in a status no scan can accept (e.g. cancelled).
    #[error("token {id} is in status {status} and cannot start a session")]
    InvalidState { id: TokenId, status: TokenStatus },

    /// A guest session is already armed; at most one at a time.
    #[error("a guest session is already active")]
    AlreadyActive,

    /// Finalize was requested but no guest session is armed.
    #[error("no guest session is active")]
    NoGuestSession,
}

impl SessionError {
    /// The stable, operator-facing rejection reason for a failed scan.
    ///
    /// `None` for [`SessionError::NoGuestSession`], which cannot arise
    /// from a scan.
    pub fn scan_reject(&self) -> Option<ScanReject> {
        let reason = match self {
            Self::Credential(CredentialError::MalformedFormat) => {
                ScanReject::UnrecognizedFormat
            }
            Self::Credential(CredentialError::BatchMismatch { .. }) => {
                ScanReject::BatchMismatch
            }
            Self::Credential(CredentialError::BadSignature) => {
                ScanReject::BadSignature
            }
            Self::UnknownToken(_) => ScanReject::UnknownToken,
            Self::AlreadyUsed(_) => ScanReject::AlreadyCompleted,
            Self::TokenInUse(_) => ScanReject::InUse,
            Self::InvalidState { .. } => ScanReject::InvalidState,
            Self::AlreadyActive => ScanReject::StationBusy,
            Self::NoGuestSession => return None,
        };
        Some(reason)
    }
}
