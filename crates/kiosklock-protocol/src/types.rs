//! Core types: the token record, its identifiers, and the boundary DTOs.
//!
//! Everything here either lives in the persisted store snapshot or
//! travels through the station's JSON boundary. The serde attributes are
//! load-bearing: the snapshot must round-trip, and operators read the
//! rejection reasons off a screen in the field, so the exact spellings
//! are part of the contract.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StatusParseError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for an issued token (the credential subject).
///
/// Newtype over `String`: ids are minted once at issuance and never
/// reused, and wrapping them keeps a token id from being confused with a
/// batch id in a signature. `#[serde(transparent)]` keeps the JSON plain:
/// `TokenId("a3f...")` serializes as just `"a3f..."`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TokenId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A named group of tokens issued together.
///
/// The station is configured with one active batch; credentials embedding
/// any other batch are rejected before their signature is even checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BatchId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// TokenStatus
// ---------------------------------------------------------------------------

/// The lifecycle status of a token.
///
/// Normal flow moves strictly along this graph:
///
/// ```text
/// Issued ──(scan)──→ InUse ──(session-end)──→ Completed
///                      │
///                      └──(forced relock / crash recovery)──→ Cancelled
/// ```
///
/// `Completed` and `Cancelled` are terminal. The one escape hatch —
/// `InUse` back to `Issued` — exists only inside the admin bulk-reset
/// engine and never fires in normal flow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// Issued and not yet presented. The only status a scan accepts.
    Issued,

    /// Claimed by a scan; a session is (or was) running on it.
    InUse,

    /// Session finished normally. Terminal.
    Completed,

    /// Session was cancelled — forced relock, crash recovery, or an
    /// operator reset. Terminal.
    Cancelled,
}

impl TokenStatus {
    /// The wire/persisted spelling of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::InUse => "in_use",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` if no normal-flow transition leaves this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns `true` if normal flow permits moving to `target`.
    ///
    /// The administrative override (`InUse` → `Issued`) is deliberately
    /// NOT represented here; the admin engine bypasses the graph on its
    /// own authority.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Issued, Self::InUse)
                | (Self::InUse, Self::Completed)
                | (Self::InUse, Self::Cancelled)
        )
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boundary normalization for free-form status strings.
///
/// Admin reset requests carry "from"/"to" statuses as strings; they are
/// normalized here (trimmed, lowercased) into the closed enum before they
/// reach the core. Unrecognized literals are rejected, never admitted.
impl FromStr for TokenStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "issued" => Ok(Self::Issued),
            "in_use" => Ok(Self::InUse),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// One issued credential's durable record.
///
/// Created by issuance, mutated only by the session controller and the
/// admin reset engine, never deleted by the control plane. The persisted
/// snapshot is an ordered array of exactly these records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Globally unique, never reused.
    pub id: TokenId,

    /// The batch this token was issued into.
    pub batch_id: BatchId,

    /// The full signed credential string, `ciu:1|batch|id|signature`.
    pub credential: String,

    /// Current lifecycle status.
    pub status: TokenStatus,

    /// Set exactly when the token enters `InUse`; cleared when an admin
    /// reset returns it to `Issued`.
    pub claimed_at: Option<DateTime<Utc>>,

    /// Set exactly when the token enters `Completed`; null otherwise.
    pub completed_at: Option<DateTime<Utc>>,

    /// Stamped at issuance, immutable afterwards.
    pub created_at: DateTime<Utc>,
}

impl Token {
    /// Builds a freshly issued token record.
    pub fn issued(
        id: TokenId,
        batch_id: BatchId,
        credential: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            batch_id,
            credential,
            status: TokenStatus::Issued,
            claimed_at: None,
            completed_at: None,
            created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Scan operation DTOs
// ---------------------------------------------------------------------------

/// Request body of the scan operation: the raw credential as presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub credential: String,
}

/// Why a scan was rejected.
///
/// Operators need to tell "wrong batch" from "already used" in the field,
/// so every rejection is a specific, enumerable reason — there is no
/// generic failure on this path. The kebab-case spellings are what the
/// scanner UI displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanReject {
    /// Not the fixed four-field `ciu:1|...` shape.
    UnrecognizedFormat,
    /// The embedded batch is not the station's active batch.
    BatchMismatch,
    /// The signature does not verify.
    BadSignature,
    /// Verified fine, but no such token exists in the store.
    UnknownToken,
    /// The token already reached `completed` — single-use means once.
    AlreadyCompleted,
    /// The token is currently `in_use` on a session.
    InUse,
    /// The token is in a status no scan can accept (e.g. `cancelled`).
    InvalidState,
    /// A guest session is already armed; at most one at a time.
    StationBusy,
}

impl fmt::Display for ScanReject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnrecognizedFormat => "unrecognized-format",
            Self::BatchMismatch => "batch-mismatch",
            Self::BadSignature => "bad-signature",
            Self::UnknownToken => "unknown-token",
            Self::AlreadyCompleted => "already-completed",
            Self::InUse => "in-use",
            Self::InvalidState => "invalid-state",
            Self::StationBusy => "station-busy",
        };
        f.write_str(s)
    }
}

/// Outcome of the scan operation.
///
/// `#[serde(tag = "status")]` makes the JSON self-describing:
///   `{ "status": "accepted", "token_id": "..." }`
///   `{ "status": "admin" }`
///   `{ "status": "rejected", "reason": "batch-mismatch" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScanResponse {
    /// A guest session started on this token.
    Accepted { token_id: TokenId },
    /// The administrative credential was recognized; no token consumed.
    Admin,
    /// Nothing unlocked; the reason says why.
    Rejected { reason: ScanReject },
}

// ---------------------------------------------------------------------------
// Webhook DTOs
// ---------------------------------------------------------------------------

/// An external phase notification, as delivered to the webhook endpoint.
///
/// The external system fires many of these per guest interaction; only
/// the completion phase ever matters. The secret is optional on the wire
/// because it is optional in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookNotification {
    pub phase: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Why an acknowledged notification had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WebhookIgnoreReason {
    /// The phase is not the completion phase.
    IrrelevantPhase,
    /// Nothing is armed — the station is locked. Also the answer to a
    /// duplicate session-end after the session already finalized.
    NotArmed,
    /// The notification arrived before the grace-window floor.
    WithinGrace,
}

/// The acknowledgement every non-forbidden notification receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum WebhookAck {
    /// A guest session finalized: its token is now `completed`.
    Finalized { token_id: TokenId },
    /// An admin session ended and the station relocked.
    AdminRelocked,
    /// Acknowledged, no state change.
    Ignored { reason: WebhookIgnoreReason },
}

// ---------------------------------------------------------------------------
// Admin reset DTOs
// ---------------------------------------------------------------------------

/// Raw admin reset request, as received on the wire.
///
/// Statuses and the mode arrive as free-form strings here and are
/// normalized into typed values at the station boundary; nothing in this
/// shape reaches the core unvalidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminResetRequest {
    pub pin: String,

    /// One of `batch_all`, `batch_inuse`, `uuid_one`, `all_batches`.
    pub mode: String,

    /// Target batch, required by the `batch_*` modes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,

    /// Target token id, required by `uuid_one`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,

    /// Target status every matched token is set to.
    pub to: String,

    /// Statuses eligible for the reset. Defaults to
    /// `{in_use, completed, cancelled}` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Vec<String>>,
}

/// The audit result of a bulk reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetReport {
    /// How many records were rewritten.
    pub changed: usize,

    /// Histogram of the matched tokens' statuses before the reset.
    pub before: BTreeMap<TokenStatus, usize>,
}

// ---------------------------------------------------------------------------
// Stats and relock DTOs
// ---------------------------------------------------------------------------

/// Read-only token counts, optionally filtered by batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsReport {
    pub total: usize,
    pub by_status: BTreeMap<TokenStatus, usize>,
}

/// What a forced relock actually did. The operation itself always
/// succeeds; this is the report of which state it tore down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum RelockReport {
    /// An armed guest session was cancelled along with its token.
    CancelledGuest { token_id: TokenId },
    /// An admin session was ended; no token was touched.
    EndedAdmin,
    /// The station was already locked; nothing to do.
    AlreadyLocked,
}

// =========================================================================
// Tests
// =========================================================================
