//! Session types: the lock state and the controller's configuration.

use std::time::Instant;

use kiosklock_protocol::{BatchId, TokenId};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the session controller.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The one batch whose credentials this station accepts.
    pub batch: BatchId,

    /// Secret used to verify credential signatures.
    pub signing_secret: String,

    /// The administrative credential, verbatim. When configured, scanning
    /// this exact string unlocks an admin session without consuming any
    /// token. `None` disables admin unlock entirely.
    pub admin_credential: Option<String>,

    /// Acceptance path A: when `true`, a presented credential that
    /// byte-matches the stored credential of its token is accepted
    /// without a signature check. Operational convenience for batches
    /// whose signing secret has rotated out from under them.
    pub trust_stored_credentials: bool,
}

impl SessionConfig {
    /// Config with the required fields set and the optional features off.
    pub fn new(batch: BatchId, signing_secret: impl Into<String>) -> Self {
        Self {
            batch,
            signing_secret: signing_secret.into(),
            admin_credential: None,
            trust_stored_credentials: false,
        }
    }
}

// ---------------------------------------------------------------------------
// LockState
// ---------------------------------------------------------------------------

/// The lock pointer: at most one session is ever active.
///
/// ```text
///              ┌──(guest scan)──→ UnlockedGuest ──(finalize)──┐
///   Locked ────┤                                              ├──→ Locked
///              └──(admin scan)──→ UnlockedAdmin ──(end)───────┘
/// ```
///
/// A guest scan while in `UnlockedAdmin` supersedes the admin session
/// silently; a scan while in `UnlockedGuest` is rejected. The `since`
/// instants arm the webhook grace window — `Instant` because the window
/// is monotonic elapsed time, immune to wall-clock adjustments.
#[derive(Debug, Clone)]
pub enum LockState {
    /// Nothing active; the overlay blocks the station.
    Locked,

    /// A guest session is running on the referenced token.
    UnlockedGuest { token_id: TokenId, since: Instant },

    /// An administrator has the station open; no token is involved.
    UnlockedAdmin { since: Instant },
}

impl LockState {
    /// Returns `true` when nothing is unlocked.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked)
    }

    /// When the current session was armed, if one is active at all.
    pub fn armed_since(&self) -> Option<Instant> {
        match self {
            Self::Locked => None,
            Self::UnlockedGuest { since, .. }
            | Self::UnlockedAdmin { since } => Some(*since),
        }
    }

    /// The token the active guest session references, if any.
    pub fn guest_token(&self) -> Option<&TokenId> {
        match self {
            Self::UnlockedGuest { token_id, .. } => Some(token_id),
            _ => None,
        }
    }
}
