//! The `Station` facade: one object tying the control plane together.
//!
//! A `Station` owns the store, the session controller, and both engines,
//! and exposes exactly the boundary operations the outside world gets:
//! scan, webhook, admin reset, stats, forced relock. The HTTP adapter is
//! a thin veneer over these methods; everything that decides anything
//! lives below them.

use std::path::PathBuf;

use kiosklock_admin::{
    BulkResetEngine, ResetRequest, ResetScope,
};
use kiosklock_protocol::{
    AdminResetRequest, BatchId, RelockReport, ResetReport, ScanReject,
    ScanResponse, StatsReport, TokenId, TokenStatus, WebhookAck,
    WebhookNotification,
};
use kiosklock_session::{
    LockScreen, LockState, ScanGrant, SessionConfig, SessionController,
};
use kiosklock_store::TokenStore;
use kiosklock_webhook::{DebounceEngine, WebhookConfig, WebhookError};

use crate::KioskError;

// ---------------------------------------------------------------------------
// StationBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`Station`].
///
/// # Example
///
/// ```rust,no_run
/// use kiosklock::prelude::*;
///
/// let station = Station::<NullLockScreen>::builder("spring-gala".into(), "signing-secret")
///     .store_path("/var/lib/kiosklock/tokens.json")
///     .admin_pin("4711")
///     .build(NullLockScreen);
/// ```
pub struct StationBuilder {
    store_path: Option<PathBuf>,
    session: SessionConfig,
    webhook: WebhookConfig,
    admin_pin: Option<String>,
}

impl StationBuilder {
    /// Creates a builder for a station accepting the given batch, with
    /// credentials verified against the given signing secret.
    pub fn new(batch: BatchId, signing_secret: impl Into<String>) -> Self {
        Self {
            store_path: None,
            session: SessionConfig::new(batch, signing_secret),
            webhook: WebhookConfig::default(),
            admin_pin: None,
        }
    }

    /// Sets the token store's backing file. Without one the station
    /// runs on an in-memory store (demos, tests).
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    /// Sets the administrative credential (disabled when never called).
    pub fn admin_credential(mut self, credential: impl Into<String>) -> Self {
        self.session.admin_credential = Some(credential.into());
        self
    }

    /// Enables acceptance path A: stored credential strings scan even
    /// when their signature no longer verifies.
    pub fn trust_stored_credentials(mut self, trust: bool) -> Self {
        self.session.trust_stored_credentials = trust;
        self
    }

    /// Sets the admin pin. Bulk resets are rejected outright until one
    /// is configured.
    pub fn admin_pin(mut self, pin: impl Into<String>) -> Self {
        self.admin_pin = Some(pin.into());
        self
    }

    /// Replaces the webhook configuration (phase, grace, shared secret).
    pub fn webhook_config(mut self, config: WebhookConfig) -> Self {
        self.webhook = config;
        self
    }

    /// Loads the store, runs startup reconciliation, and assembles the
    /// station. After this returns, the station is ready to serve — any
    /// crash-orphaned tokens have already been cancelled and persisted.
    pub fn build<S: LockScreen>(self, screen: S) -> Station<S> {
        let mut store = match self.store_path {
            Some(path) => TokenStore::load(path),
            None => TokenStore::in_memory(),
        };
        store.reconcile_startup();

        Station {
            store,
            session: SessionController::new(self.session, screen),
            webhook: DebounceEngine::new(self.webhook),
            admin: self.admin_pin.map(BulkResetEngine::new),
        }
    }
}

// ---------------------------------------------------------------------------
// Station
// ---------------------------------------------------------------------------

/// A fully wired session-lock control plane for one physical station.
pub struct Station<S: LockScreen> {
    store: TokenStore,
    session: SessionController<S>,
    webhook: DebounceEngine,
    /// Absent when no admin pin is configured; resets are then always
    /// unauthorized.
    admin: Option<BulkResetEngine>,
}

impl<S: LockScreen> Station<S> {
    /// Creates a new builder.
    pub fn builder(
        batch: BatchId,
        signing_secret: impl Into<String>,
    ) -> StationBuilder {
        StationBuilder::new(batch, signing_secret)
    }

    /// Handles a scanned credential. Never errors: every failure is a
    /// rejection with a stable, operator-facing reason.
    pub fn scan(&mut self, raw: &str) -> ScanResponse {
        match self.session.scan(raw, &mut self.store) {
            Ok(ScanGrant::Guest { token_id }) => {
                ScanResponse::Accepted { token_id }
            }
            Ok(ScanGrant::Admin) => ScanResponse::Admin,
            Err(err) => ScanResponse::Rejected {
                // Scan errors always map to a reason; the fallback can
                // only trigger if a non-scan error ever leaked in here.
                reason: err
                    .scan_reject()
                    .unwrap_or(ScanReject::InvalidState),
            },
        }
    }

    /// Handles an external phase notification.
    ///
    /// # Errors
    /// Only [`WebhookError::Forbidden`] on a shared-secret mismatch;
    /// everything else is an acknowledgement.
    pub fn webhook(
        &mut self,
        note: &WebhookNotification,
    ) -> Result<WebhookAck, WebhookError> {
        self.webhook
            .handle(note, &mut self.session, &mut self.store)
    }

    /// Handles a raw admin reset request: normalizes the free-form mode
    /// and status strings, then runs the bulk reset.
    ///
    /// # Errors
    /// - [`KioskError::Admin`] on a bad (or unconfigured) pin
    /// - [`KioskError::Status`] / [`KioskError::InvalidReset`] when the
    ///   request fails boundary normalization
    pub fn admin_reset(
        &mut self,
        raw: &AdminResetRequest,
    ) -> Result<ResetReport, KioskError> {
        let request = normalize_reset(raw)?;
        let engine = self
            .admin
            .as_ref()
            .ok_or(kiosklock_admin::AdminError::Unauthorized)?;
        let report = engine.reset(
            &raw.pin,
            &request,
            &mut self.store,
            &mut self.session,
        )?;
        Ok(report)
    }

    /// Read-only token counts, optionally restricted to one batch.
    pub fn stats(&self, batch: Option<&BatchId>) -> StatsReport {
        let by_status = self.store.counts_by_status(batch);
        let total = by_status.values().sum();
        StatsReport { total, by_status }
    }

    /// Forced relock: always succeeds and always lands on locked.
    pub fn force_relock(&mut self) -> RelockReport {
        self.session.force_relock(&mut self.store)
    }

    /// Mints `count` tokens into `batch`, signed with the station's
    /// configured secret. Issuance convenience for demos and tooling.
    pub fn issue_batch(
        &mut self,
        batch: &BatchId,
        count: usize,
    ) -> Vec<TokenId> {
        let secret = self.session.config().signing_secret.clone();
        self.store.issue_batch(batch, count, &secret)
    }

    /// The current lock state.
    pub fn lock_state(&self) -> &LockState {
        self.session.state()
    }

    /// Read access to the token store.
    pub fn store(&self) -> &TokenStore {
        &self.store
    }
}

// ---------------------------------------------------------------------------
// Boundary normalization
// ---------------------------------------------------------------------------

/// Turns the wire-level reset request into a typed one, rejecting
/// unknown modes and status literals outright.
fn normalize_reset(
    raw: &AdminResetRequest,
) -> Result<ResetRequest, KioskError> {
    let scope = match raw.mode.trim() {
        "batch_all" => ResetScope::BatchAll {
            batch: required_batch(raw)?,
        },
        "batch_inuse" => ResetScope::BatchInUse {
            batch: required_batch(raw)?,
        },
        "uuid_one" => {
            let id = raw.token_id.as_deref().ok_or_else(|| {
                KioskError::InvalidReset(
                    "mode uuid_one requires token_id".to_string(),
                )
            })?;
            ResetScope::Token {
                id: TokenId(id.to_string()),
            }
        }
        "all_batches" => ResetScope::AllBatches,
        other => {
            return Err(KioskError::InvalidReset(format!(
                "unknown mode '{other}'"
            )));
        }
    };

    let to: TokenStatus = raw.to.parse()?;
    let from = match &raw.from {
        None => None,
        Some(literals) => Some(
            literals
                .iter()
                .map(|s| s.parse())
                .collect::<Result<_, _>>()?,
        ),
    };

    Ok(ResetRequest { scope, to, from })
}

fn required_batch(raw: &AdminResetRequest) -> Result<BatchId, KioskError> {
    raw.batch
        .as_deref()
        .map(|b| BatchId(b.to_string()))
        .ok_or_else(|| {
            KioskError::InvalidReset(format!(
                "mode {} requires batch",
                raw.mode
            ))
        })
}
