//! Error types for the protocol layer.
//!
//! Everything here is a client-input error: a bad credential or a bad
//! status literal rejects the one request that carried it and nothing
//! else. Nothing in this crate can fail fatally.

use crate::types::BatchId;

/// Ways a presented credential can fail verification.
///
/// The order of the variants mirrors the order of the checks: shape
/// first, then batch, then signature. A caller that sees `BadSignature`
/// knows the credential at least looked right and named the right batch.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Not the fixed `ciu:1|batch|id|signature` four-field shape.
    #[error("credential is not in the ciu:1|batch|id|signature format")]
    MalformedFormat,

    /// The embedded batch is not the batch this station accepts.
    #[error("credential batch '{found}' does not match active batch '{expected}'")]
    BatchMismatch { expected: BatchId, found: BatchId },

    /// The embedded signature does not match the recomputed HMAC.
    #[error("credential signature does not verify")]
    BadSignature,
}

/// A free-form status string that is not one of the four known literals.
///
/// Raised by the boundary normalization of admin reset requests; the
/// request is rejected rather than letting an unknown status into the
/// core.
#[derive(Debug, thiserror::Error)]
#[error("unknown token status literal '{0}'")]
pub struct StatusParseError(pub String);
