//! The `BulkResetEngine`: scoped, pin-gated status rewrites.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use kiosklock_protocol::{
    BatchId, ResetReport, Token, TokenId, TokenStatus,
};
use kiosklock_session::{LockScreen, SessionController};
use kiosklock_store::TokenStore;
use subtle::ConstantTimeEq;

use crate::AdminError;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Which tokens a reset targets.
///
/// The wire spellings (`batch_all`, `batch_inuse`, `uuid_one`,
/// `all_batches`) are normalized into this enum at the station boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetScope {
    /// Every token in one batch whose status is in the "from" set.
    BatchAll { batch: BatchId },

    /// Every token in one batch that is currently `in_use`. The "from"
    /// set does not apply to this scope; it is in_use by definition.
    BatchInUse { batch: BatchId },

    /// One identified token, if its status is in the "from" set.
    Token { id: TokenId },

    /// Every token regardless of batch, if status is in the "from" set.
    AllBatches,
}

/// A normalized bulk-reset request.
#[derive(Debug, Clone)]
pub struct ResetRequest {
    pub scope: ResetScope,

    /// The status every matched token is set to.
    pub to: TokenStatus,

    /// Statuses eligible for the reset. `None` means the default set:
    /// everything except `issued` (resetting already-issued tokens is
    /// a no-op nobody asks for, so they are excluded unless named).
    pub from: Option<BTreeSet<TokenStatus>>,
}

impl ResetRequest {
    /// The effective "from" set, applying the default when unset.
    fn from_set(&self) -> BTreeSet<TokenStatus> {
        self.from.clone().unwrap_or_else(|| {
            BTreeSet::from([
                TokenStatus::InUse,
                TokenStatus::Completed,
                TokenStatus::Cancelled,
            ])
        })
    }
}

// ---------------------------------------------------------------------------
// BulkResetEngine
// ---------------------------------------------------------------------------

/// Applies scoped status rewrites to the store, guarded by a pin.
pub struct BulkResetEngine {
    pin: String,
}

impl BulkResetEngine {
    /// Creates an engine guarding resets with the given pin.
    pub fn new(pin: impl Into<String>) -> Self {
        Self { pin: pin.into() }
    }

    /// Executes a bulk reset.
    ///
    /// All matched tokens move to `request.to` with their timestamps
    /// made consistent with the target status, in a single store
    /// rewrite. If the currently armed guest session references a
    /// matched token, the session pointer is cleared and the station
    /// relocks — a session must never outlive its token's `in_use`
    /// status.
    ///
    /// Returns the changed-record count and a histogram of the matched
    /// tokens' prior statuses for the audit trail.
    ///
    /// # Errors
    /// Returns [`AdminError::Unauthorized`] on a pin mismatch
    /// (constant-time comparison); nothing is touched in that case.
    pub fn reset<S: LockScreen>(
        &self,
        pin: &str,
        request: &ResetRequest,
        store: &mut TokenStore,
        session: &mut SessionController<S>,
    ) -> Result<ResetReport, AdminError> {
        let authorized: bool =
            self.pin.as_bytes().ct_eq(pin.as_bytes()).into();
        if !authorized {
            tracing::warn!("bulk reset rejected: bad pin");
            return Err(AdminError::Unauthorized);
        }

        let from = request.from_set();
        let matched = store.filter(|t| matches(&request.scope, &from, t));

        // Audit snapshot before anything moves.
        let mut before: BTreeMap<TokenStatus, usize> = BTreeMap::new();
        let mut matched_ids: Vec<TokenId> = Vec::with_capacity(matched.len());
        for token in &matched {
            *before.entry(token.status).or_insert(0) += 1;
            matched_ids.push(token.id.clone());
        }

        // Pointer hygiene: at most one session can be armed, so one
        // check against the matched set suffices.
        if let Some(active) = session.state().guest_token().cloned() {
            if matched_ids.contains(&active) {
                session.clear_if_active(&active);
            }
        }

        let now = Utc::now();
        let changed = store.mutate_matching(
            |t| matches(&request.scope, &from, t),
            |t| apply_target(t, request.to, now),
        );

        tracing::info!(
            changed,
            to = %request.to,
            scope = ?request.scope,
            "bulk reset applied"
        );

        Ok(ResetReport { changed, before })
    }
}

/// The scope/from-set match predicate.
fn matches(
    scope: &ResetScope,
    from: &BTreeSet<TokenStatus>,
    token: &Token,
) -> bool {
    match scope {
        ResetScope::BatchAll { batch } => {
            token.batch_id == *batch && from.contains(&token.status)
        }
        ResetScope::BatchInUse { batch } => {
            token.batch_id == *batch
                && token.status == TokenStatus::InUse
        }
        ResetScope::Token { id } => {
            token.id == *id && from.contains(&token.status)
        }
        ResetScope::AllBatches => from.contains(&token.status),
    }
}

/// Rewrites a token to the target status with consistent timestamps:
/// `claimed_at` exists exactly for tokens that entered `in_use` and
/// survives into terminal statuses; `completed_at` exists exactly for
/// `completed`.
fn apply_target(token: &mut Token, to: TokenStatus, now: DateTime<Utc>) {
    token.status = to;
    match to {
        TokenStatus::Issued => {
            token.claimed_at = None;
            token.completed_at = None;
        }
        TokenStatus::InUse => {
            token.claimed_at = Some(now);
            token.completed_at = None;
        }
        TokenStatus::Completed => {
            token.completed_at = Some(now);
        }
        TokenStatus::Cancelled => {
            token.completed_at = None;
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
