//! The credential codec: parse, sign, and verify `ciu:1|...` credentials.
//!
//! A credential is the string carried inside a guest's QR code:
//!
//! ```text
//! ciu:1|<batch_id>|<token_id>|<signature>
//! └─┬─┘
//!   version tag — fixed, so the format can evolve without ambiguity
//! ```
//!
//! The signature is HMAC-SHA256 over `"<batch>.<id>"` with the station's
//! signing secret, encoded as unpadded URL-safe base64. Everything in
//! this module is a pure function: no store access, no clock, no state.
//! The caller resolves whatever context a check needs (the stored
//! credential string for acceptance path A) and passes it in.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::CredentialError;
use crate::types::{BatchId, TokenId};

type HmacSha256 = Hmac<Sha256>;

/// The fixed version tag every credential must lead with.
pub const VERSION_TAG: &str = "ciu:1";

/// The fields recovered from a well-formed credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCredential {
    pub batch: BatchId,
    pub id: TokenId,
    pub signature: String,
}

/// Computes the signature for a batch/id pair.
pub fn sign(batch: &BatchId, id: &TokenId, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("hmac-sha256 accepts keys of any length");
    mac.update(format!("{batch}.{id}").as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Builds the full credential string for a batch/id pair.
///
/// This is the encode half of the codec, used by issuance tooling and
/// the store's batch-minting helper.
pub fn encode(batch: &BatchId, id: &TokenId, secret: &str) -> String {
    format!("{VERSION_TAG}|{batch}|{id}|{}", sign(batch, id, secret))
}

/// Splits a raw credential into its fields.
///
/// # Errors
/// Returns [`CredentialError::MalformedFormat`] unless the input is
/// exactly four non-empty pipe-delimited fields led by [`VERSION_TAG`].
pub fn parse(raw: &str) -> Result<ParsedCredential, CredentialError> {
    let parts: Vec<&str> = raw.split('|').collect();
    let [tag, batch, id, signature] = parts.as_slice() else {
        return Err(CredentialError::MalformedFormat);
    };
    if *tag != VERSION_TAG
        || batch.is_empty()
        || id.is_empty()
        || signature.is_empty()
    {
        return Err(CredentialError::MalformedFormat);
    }
    Ok(ParsedCredential {
        batch: BatchId(batch.to_string()),
        id: TokenId(id.to_string()),
        signature: signature.to_string(),
    })
}

/// Verifies a presented credential against the station's configuration.
///
/// Checks run in a fixed order:
///
/// 1. shape and version tag ([`CredentialError::MalformedFormat`]),
/// 2. embedded batch equals `expected_batch`
///    ([`CredentialError::BatchMismatch`]),
/// 3. acceptance path A: if the caller passes the credential string of
///    the token it found under this id and batch, byte-equality with the
///    presented string accepts without a signature check,
/// 4. acceptance path B: the recomputed HMAC must equal the embedded
///    signature ([`CredentialError::BadSignature`]).
///
/// Both comparisons in 3 and 4 are constant-time. Deterministic, no side
/// effects.
pub fn verify(
    raw: &str,
    expected_batch: &BatchId,
    secret: &str,
    stored_credential: Option<&str>,
) -> Result<ParsedCredential, CredentialError> {
    let parsed = parse(raw)?;

    if parsed.batch != *expected_batch {
        return Err(CredentialError::BatchMismatch {
            expected: expected_batch.clone(),
            found: parsed.batch,
        });
    }

    // Path A: the store already holds this exact credential string.
    if let Some(stored) = stored_credential {
        if bool::from(stored.as_bytes().ct_eq(raw.as_bytes())) {
            return Ok(parsed);
        }
    }

    // Path B: recompute and compare the signature.
    let expected_sig = sign(&parsed.batch, &parsed.id, secret);
    if bool::from(expected_sig.as_bytes().ct_eq(parsed.signature.as_bytes()))
    {
        Ok(parsed)
    } else {
        Err(CredentialError::BadSignature)
    }
}

// =========================================================================
// Tests
// =========================================================================
