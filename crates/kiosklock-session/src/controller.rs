//! The session controller: drives the lock state machine.
//!
//! This is the central piece of the control plane. It's responsible for:
//! - Accepting or rejecting scanned credentials
//! - Enforcing at-most-one-active-session
//! - Claiming and finalizing tokens through the store
//! - Telling the lock screen to show or hide
//!
//! # Concurrency note
//!
//! `SessionController` is NOT thread-safe by itself — transitions take
//! `&mut self` and run to completion. This is intentional: the station
//! processes one request at a time (the controller sits behind one lock
//! at a higher level), so there is nothing for a mutex here to protect.

use std::time::Instant;

use chrono::Utc;
use kiosklock_protocol::{
    RelockReport, Token, TokenId, TokenStatus, credential,
};
use kiosklock_store::TokenStore;

use crate::{LockScreen, LockState, SessionConfig, SessionError};

/// What a successful scan granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanGrant {
    /// A guest session started on this token.
    Guest { token_id: TokenId },
    /// An administrative session started; no token was consumed.
    Admin,
}

/// How a guest session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The external workflow completed normally.
    Completed,
    /// The session was torn down (forced relock, operator action).
    Cancelled,
}

/// Owns the lock pointer and drives every transition on it.
///
/// ## Lifecycle
///
/// ```text
/// scan() ──→ UnlockedGuest ──→ finalize() ──→ Locked
///   │                              ↑
///   └──→ UnlockedAdmin ──→ end_admin() / force_relock()
/// ```
pub struct SessionController<S: LockScreen> {
    /// The lock pointer. This, not the store, answers "is something
    /// currently unlocked".
    state: LockState,

    /// Station configuration (batch, secrets, toggles).
    config: SessionConfig,

    /// The external overlay collaborator.
    screen: S,
}

impl<S: LockScreen> SessionController<S> {
    /// Creates a controller in the `Locked` state.
    pub fn new(config: SessionConfig, screen: S) -> Self {
        Self {
            state: LockState::Locked,
            config,
            screen,
        }
    }

    /// The current lock state.
    pub fn state(&self) -> &LockState {
        &self.state
    }

    /// The controller's configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Handles a scanned credential.
    ///
    /// The admin credential (when configured) unlocks unconditionally
    /// and is re-scannable; it consumes no token. A guest credential
    /// runs the full gauntlet: codec verification, token lookup, status
    /// gate, claim, persist, overlay down. A guest scan arriving during
    /// an admin session supersedes it silently; any scan during a guest
    /// session is rejected.
    ///
    /// # Errors
    /// Every failure is a specific [`SessionError`]; see
    /// [`SessionError::scan_reject`] for the operator-facing reasons.
    pub fn scan(
        &mut self,
        raw: &str,
        store: &mut TokenStore,
    ) -> Result<ScanGrant, SessionError> {
        // At-most-one-session: an armed guest blocks every further scan,
        // admin credential included.
        if matches!(self.state, LockState::UnlockedGuest { .. }) {
            return Err(SessionError::AlreadyActive);
        }

        if let Some(admin) = &self.config.admin_credential {
            if admin.as_str() == raw {
                // Re-scanning while already in admin mode just refreshes
                // the arm timestamp.
                self.state = LockState::UnlockedAdmin {
                    since: Instant::now(),
                };
                self.screen.hide();
                tracing::info!("admin session armed");
                return Ok(ScanGrant::Admin);
            }
        }

        let was_admin =
            matches!(self.state, LockState::UnlockedAdmin { .. });

        // Parse once up front so acceptance path A can look up the
        // stored credential string for this id.
        let parsed = credential::parse(raw)?;
        let stored = if self.config.trust_stored_credentials {
            store
                .find_by_id_and_batch(&parsed.id, &parsed.batch)
                .map(|t| t.credential.clone())
        } else {
            None
        };
        let parsed = credential::verify(
            raw,
            &self.config.batch,
            &self.config.signing_secret,
            stored.as_deref(),
        )?;

        let token = store
            .find_by_id_and_batch(&parsed.id, &self.config.batch)
            .ok_or_else(|| SessionError::UnknownToken(parsed.id.clone()))?;

        check_claimable(token)?;

        store.mutate(&parsed.id, |t| {
            t.status = TokenStatus::InUse;
            t.claimed_at = Some(Utc::now());
        });

        self.screen.hide();
        // Arming timestamp: the webhook grace window counts from here.
        self.state = LockState::UnlockedGuest {
            token_id: parsed.id.clone(),
            since: Instant::now(),
        };

        if was_admin {
            tracing::info!(token_id = %parsed.id, "guest scan superseded admin session");
        }
        tracing::info!(token_id = %parsed.id, "guest session armed");

        Ok(ScanGrant::Guest {
            token_id: parsed.id,
        })
    }

    /// Finalizes the armed guest session and relocks.
    ///
    /// # Errors
    /// Returns [`SessionError::NoGuestSession`] unless a guest session
    /// is armed.
    pub fn finalize(
        &mut self,
        outcome: FinalizeOutcome,
        store: &mut TokenStore,
    ) -> Result<TokenId, SessionError> {
        let LockState::UnlockedGuest { token_id, .. } = &self.state else {
            return Err(SessionError::NoGuestSession);
        };
        let token_id = token_id.clone();
        self.finalize_guest(&token_id, outcome, store);
        Ok(token_id)
    }

    /// Ends an admin session, if one is active. No token is touched.
    /// Returns whether there was one to end.
    pub fn end_admin(&mut self) -> bool {
        if !matches!(self.state, LockState::UnlockedAdmin { .. }) {
            return false;
        }
        self.state = LockState::Locked;
        self.screen.show();
        tracing::info!("admin session ended");
        true
    }

    /// Forced relock: always succeeds, from any state, and always lands
    /// on `Locked`. An armed guest session is cancelled along the way.
    ///
    /// Safe to invoke at any time — this is the operator's big red
    /// switch and the recovery path for every ambiguous situation.
    pub fn force_relock(&mut self, store: &mut TokenStore) -> RelockReport {
        match &self.state {
            LockState::Locked => RelockReport::AlreadyLocked,
            LockState::UnlockedAdmin { .. } => {
                self.end_admin();
                RelockReport::EndedAdmin
            }
            LockState::UnlockedGuest { token_id, .. } => {
                let token_id = token_id.clone();
                self.finalize_guest(
                    &token_id,
                    FinalizeOutcome::Cancelled,
                    store,
                );
                tracing::warn!(%token_id, "forced relock cancelled guest session");
                RelockReport::CancelledGuest { token_id }
            }
        }
    }

    /// Pointer hygiene for the admin reset engine: if the armed guest
    /// session references `token_id`, drop it and relock WITHOUT
    /// mutating the token — the caller already rewrote it.
    ///
    /// Returns whether the pointer was cleared.
    pub fn clear_if_active(&mut self, token_id: &TokenId) -> bool {
        if self.state.guest_token() != Some(token_id) {
            return false;
        }
        self.state = LockState::Locked;
        self.screen.show();
        tracing::info!(%token_id, "active session cleared by admin reset");
        true
    }

    /// Shared guest-teardown: token to its terminal status, overlay up,
    /// pointer to `Locked`.
    fn finalize_guest(
        &mut self,
        token_id: &TokenId,
        outcome: FinalizeOutcome,
        store: &mut TokenStore,
    ) {
        store.mutate(token_id, |t| match outcome {
            FinalizeOutcome::Completed => {
                t.status = TokenStatus::Completed;
                t.completed_at = Some(Utc::now());
            }
            FinalizeOutcome::Cancelled => {
                t.status = TokenStatus::Cancelled;
                t.completed_at = None;
            }
        });
        self.state = LockState::Locked;
        self.screen.show();
        tracing::info!(%token_id, ?outcome, "guest session finalized");
    }
}

/// The status gate a token must pass to start a session.
fn check_claimable(token: &Token) -> Result<(), SessionError> {
    match token.status {
        TokenStatus::Issued => Ok(()),
        TokenStatus::Completed => {
            Err(SessionError::AlreadyUsed(token.id.clone()))
        }
        TokenStatus::InUse => {
            Err(SessionError::TokenInUse(token.id.clone()))
        }
        TokenStatus::Cancelled => Err(SessionError::InvalidState {
            id: token.id.clone(),
            status: token.status,
        }),
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionController`.
    //!
    //! The lock screen collaborator is replaced with a recording double
    //! so tests can assert the overlay was actually told to move. Stores
    //! are in-memory; no disk is involved.

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use kiosklock_protocol::{BatchId, CredentialError};

    use super::*;

    const SECRET: &str = "test-secret";
    const ADMIN_CRED: &str = "ciu:admin|master-key";

    // -- Helpers ----------------------------------------------------------

    /// A `LockScreen` that counts calls. Cloning shares the counters so
    /// the test can keep a handle after the controller takes ownership.
    #[derive(Clone, Default)]
    struct RecordingScreen {
        hides: Arc<AtomicUsize>,
        shows: Arc<AtomicUsize>,
    }

    impl RecordingScreen {
        fn hides(&self) -> usize {
            self.hides.load(Ordering::SeqCst)
        }

        fn shows(&self) -> usize {
            self.shows.load(Ordering::SeqCst)
        }
    }

    impl LockScreen for RecordingScreen {
        fn hide(&self) {
            self.hides.fetch_add(1, Ordering::SeqCst);
        }

        fn show(&self) {
            self.shows.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn batch() -> BatchId {
        BatchId::from("b1")
    }

    fn test_config() -> SessionConfig {
        let mut config = SessionConfig::new(batch(), SECRET);
        config.admin_credential = Some(ADMIN_CRED.to_string());
        config
    }

    /// A controller, its screen handle, a one-token store, and that
    /// token's credential string.
    fn setup() -> (
        SessionController<RecordingScreen>,
        RecordingScreen,
        TokenStore,
        TokenId,
        String,
    ) {
        let screen = RecordingScreen::default();
        let ctrl = SessionController::new(test_config(), screen.clone());
        let mut store = TokenStore::in_memory();
        let ids = store.issue_batch(&batch(), 1, SECRET);
        let id = ids.into_iter().next().unwrap();
        let cred = store.find_by_id(&id).unwrap().credential.clone();
        (ctrl, screen, store, id, cred)
    }

    // =====================================================================
    // scan() — guest path
    // =====================================================================

    #[test]
    fn test_scan_valid_credential_arms_guest_session() {
        let (mut ctrl, screen, mut store, id, cred) = setup();

        let grant = ctrl.scan(&cred, &mut store).expect("should accept");

        assert_eq!(grant, ScanGrant::Guest { token_id: id.clone() });
        assert_eq!(ctrl.state().guest_token(), Some(&id));
        // The token was claimed and stamped.
        let token = store.find_by_id(&id).unwrap();
        assert_eq!(token.status, TokenStatus::InUse);
        assert!(token.claimed_at.is_some());
        assert!(token.completed_at.is_none());
        // The overlay came down exactly once.
        assert_eq!(screen.hides(), 1);
        assert_eq!(screen.shows(), 0);
    }

    #[test]
    fn test_scan_second_scan_while_guest_armed_is_rejected() {
        // At-most-one-session: the second scan must not double-arm.
        let (mut ctrl, _, mut store, id, cred) = setup();
        let more = store.issue_batch(&batch(), 1, SECRET);
        let cred2 = store.find_by_id(&more[0]).unwrap().credential.clone();
        ctrl.scan(&cred, &mut store).unwrap();

        let result = ctrl.scan(&cred2, &mut store);

        assert!(matches!(result, Err(SessionError::AlreadyActive)));
        // First session unbroken, second token untouched.
        assert_eq!(ctrl.state().guest_token(), Some(&id));
        assert_eq!(
            store.find_by_id(&more[0]).unwrap().status,
            TokenStatus::Issued
        );
    }

    #[test]
    fn test_scan_malformed_credential_rejected_nothing_mutated() {
        let (mut ctrl, screen, mut store, id, _) = setup();

        let result = ctrl.scan("definitely not a credential", &mut store);

        assert!(matches!(
            result,
            Err(SessionError::Credential(CredentialError::MalformedFormat))
        ));
        assert!(ctrl.state().is_locked());
        assert_eq!(
            store.find_by_id(&id).unwrap().status,
            TokenStatus::Issued
        );
        assert_eq!(screen.hides(), 0);
    }

    #[test]
    fn test_scan_wrong_batch_rejected_with_batch_mismatch() {
        // A perfectly signed credential for another batch.
        let (mut ctrl, _, mut store, _, _) = setup();
        let foreign = credential::encode(
            &BatchId::from("b2"),
            &TokenId::from("tok-x"),
            SECRET,
        );

        let result = ctrl.scan(&foreign, &mut store);

        assert!(matches!(
            result,
            Err(SessionError::Credential(
                CredentialError::BatchMismatch { .. }
            ))
        ));
        assert!(ctrl.state().is_locked());
    }

    #[test]
    fn test_scan_unknown_token_rejected_after_verification() {
        // Right batch, valid signature, but no such record in the store.
        let (mut ctrl, _, mut store, _, _) = setup();
        let ghost =
            credential::encode(&batch(), &TokenId::from("ghost"), SECRET);

        let result = ctrl.scan(&ghost, &mut store);

        assert!(matches!(result, Err(SessionError::UnknownToken(_))));
    }

    #[test]
    fn test_scan_completed_token_rejected_as_already_used() {
        // Single-use: once completed, the same credential never works
        // again.
        let (mut ctrl, _, mut store, id, cred) = setup();
        ctrl.scan(&cred, &mut store).unwrap();
        ctrl.finalize(FinalizeOutcome::Completed, &mut store).unwrap();

        let result = ctrl.scan(&cred, &mut store);

        assert!(matches!(result, Err(SessionError::AlreadyUsed(_))));
        assert_eq!(
            store.find_by_id(&id).unwrap().status,
            TokenStatus::Completed
        );
    }

    #[test]
    fn test_scan_in_use_token_rejected_as_in_use() {
        // An in_use record with no armed session (e.g. another process's
        // leftovers) still can't start a session.
        let (mut ctrl, _, mut store, id, cred) = setup();
        store.mutate(&id, |t| {
            t.status = TokenStatus::InUse;
            t.claimed_at = Some(Utc::now());
        });

        let result = ctrl.scan(&cred, &mut store);

        assert!(matches!(result, Err(SessionError::TokenInUse(_))));
    }

    #[test]
    fn test_scan_cancelled_token_rejected_as_invalid_state() {
        let (mut ctrl, _, mut store, id, cred) = setup();
        store.mutate(&id, |t| t.status = TokenStatus::Cancelled);

        let result = ctrl.scan(&cred, &mut store);

        assert!(matches!(
            result,
            Err(SessionError::InvalidState {
                status: TokenStatus::Cancelled,
                ..
            })
        ));
    }

    // =====================================================================
    // scan() — acceptance path A (stored-credential trust)
    // =====================================================================

    #[test]
    fn test_scan_path_a_accepts_stored_credential_with_stale_signature() {
        // The store holds a credential whose signature no longer matches
        // the current secret (rotated). With the trust toggle on, the
        // exact stored string still scans.
        let screen = RecordingScreen::default();
        let mut config = test_config();
        config.trust_stored_credentials = true;
        let mut ctrl = SessionController::new(config, screen);

        let mut store = TokenStore::in_memory();
        let stale = "ciu:1|b1|legacy-tok|stale-signature".to_string();
        store
            .insert(Token::issued(
                TokenId::from("legacy-tok"),
                batch(),
                stale.clone(),
                Utc::now(),
            ))
            .unwrap();

        let grant = ctrl.scan(&stale, &mut store).expect("path A applies");

        assert_eq!(
            grant,
            ScanGrant::Guest {
                token_id: TokenId::from("legacy-tok")
            }
        );
    }

    #[test]
    fn test_scan_path_a_disabled_falls_back_to_signature_check() {
        let (mut ctrl, _, mut store, _, _) = setup();
        let stale = "ciu:1|b1|legacy-tok|stale-signature".to_string();
        store
            .insert(Token::issued(
                TokenId::from("legacy-tok"),
                batch(),
                stale.clone(),
                Utc::now(),
            ))
            .unwrap();

        let result = ctrl.scan(&stale, &mut store);

        assert!(matches!(
            result,
            Err(SessionError::Credential(CredentialError::BadSignature))
        ));
    }

    // =====================================================================
    // scan() — admin path
    // =====================================================================

    #[test]
    fn test_scan_admin_credential_arms_admin_without_consuming_token() {
        let (mut ctrl, screen, mut store, id, _) = setup();

        let grant = ctrl.scan(ADMIN_CRED, &mut store).unwrap();

        assert_eq!(grant, ScanGrant::Admin);
        assert!(matches!(
            ctrl.state(),
            LockState::UnlockedAdmin { .. }
        ));
        assert_eq!(
            store.find_by_id(&id).unwrap().status,
            TokenStatus::Issued
        );
        assert_eq!(screen.hides(), 1);
    }

    #[test]
    fn test_scan_admin_credential_is_rescannable() {
        let (mut ctrl, screen, mut store, _, _) = setup();
        ctrl.scan(ADMIN_CRED, &mut store).unwrap();

        let grant = ctrl.scan(ADMIN_CRED, &mut store).unwrap();

        assert_eq!(grant, ScanGrant::Admin);
        assert!(matches!(ctrl.state(), LockState::UnlockedAdmin { .. }));
        assert_eq!(screen.hides(), 2);
    }

    #[test]
    fn test_scan_guest_during_admin_supersedes_admin_silently() {
        let (mut ctrl, _, mut store, id, cred) = setup();
        ctrl.scan(ADMIN_CRED, &mut store).unwrap();

        let grant = ctrl.scan(&cred, &mut store).unwrap();

        assert_eq!(grant, ScanGrant::Guest { token_id: id.clone() });
        assert_eq!(ctrl.state().guest_token(), Some(&id));
    }

    #[test]
    fn test_scan_admin_during_guest_session_is_rejected() {
        // The at-most-one-session rule outranks even the admin credential.
        let (mut ctrl, _, mut store, _, cred) = setup();
        ctrl.scan(&cred, &mut store).unwrap();

        let result = ctrl.scan(ADMIN_CRED, &mut store);

        assert!(matches!(result, Err(SessionError::AlreadyActive)));
    }

    #[test]
    fn test_scan_no_admin_configured_treats_it_as_guest_credential() {
        let screen = RecordingScreen::default();
        let config = SessionConfig::new(batch(), SECRET);
        let mut ctrl = SessionController::new(config, screen);
        let mut store = TokenStore::in_memory();

        let result = ctrl.scan(ADMIN_CRED, &mut store);

        // Without an admin credential configured, the string just fails
        // the codec like any other junk.
        assert!(matches!(result, Err(SessionError::Credential(_))));
    }

    // =====================================================================
    // finalize()
    // =====================================================================

    #[test]
    fn test_finalize_completed_stamps_token_and_relocks() {
        let (mut ctrl, screen, mut store, id, cred) = setup();
        ctrl.scan(&cred, &mut store).unwrap();

        let finalized =
            ctrl.finalize(FinalizeOutcome::Completed, &mut store).unwrap();

        assert_eq!(finalized, id);
        assert!(ctrl.state().is_locked());
        let token = store.find_by_id(&id).unwrap();
        assert_eq!(token.status, TokenStatus::Completed);
        assert!(token.completed_at.is_some());
        assert!(token.claimed_at.is_some());
        assert_eq!(screen.shows(), 1);
    }

    #[test]
    fn test_finalize_cancelled_leaves_completed_at_null() {
        let (mut ctrl, _, mut store, id, cred) = setup();
        ctrl.scan(&cred, &mut store).unwrap();

        ctrl.finalize(FinalizeOutcome::Cancelled, &mut store).unwrap();

        let token = store.find_by_id(&id).unwrap();
        assert_eq!(token.status, TokenStatus::Cancelled);
        assert!(token.completed_at.is_none());
    }

    #[test]
    fn test_finalize_while_locked_returns_no_guest_session() {
        let (mut ctrl, _, mut store, _, _) = setup();

        let result = ctrl.finalize(FinalizeOutcome::Completed, &mut store);

        assert!(matches!(result, Err(SessionError::NoGuestSession)));
    }

    #[test]
    fn test_finalize_during_admin_session_returns_no_guest_session() {
        let (mut ctrl, _, mut store, _, _) = setup();
        ctrl.scan(ADMIN_CRED, &mut store).unwrap();

        let result = ctrl.finalize(FinalizeOutcome::Completed, &mut store);

        assert!(matches!(result, Err(SessionError::NoGuestSession)));
        // Admin session survives a misdirected finalize.
        assert!(matches!(ctrl.state(), LockState::UnlockedAdmin { .. }));
    }

    // =====================================================================
    // end_admin() / force_relock()
    // =====================================================================

    #[test]
    fn test_end_admin_relocks_without_touching_tokens() {
        let (mut ctrl, screen, mut store, id, _) = setup();
        ctrl.scan(ADMIN_CRED, &mut store).unwrap();

        assert!(ctrl.end_admin());

        assert!(ctrl.state().is_locked());
        assert_eq!(
            store.find_by_id(&id).unwrap().status,
            TokenStatus::Issued
        );
        assert_eq!(screen.shows(), 1);
    }

    #[test]
    fn test_end_admin_when_not_admin_is_a_noop() {
        let (mut ctrl, screen, _, _, _) = setup();

        assert!(!ctrl.end_admin());
        assert_eq!(screen.shows(), 0);
    }

    #[test]
    fn test_force_relock_cancels_armed_guest_session() {
        let (mut ctrl, _, mut store, id, cred) = setup();
        ctrl.scan(&cred, &mut store).unwrap();

        let report = ctrl.force_relock(&mut store);

        assert_eq!(
            report,
            RelockReport::CancelledGuest { token_id: id.clone() }
        );
        assert!(ctrl.state().is_locked());
        assert_eq!(
            store.find_by_id(&id).unwrap().status,
            TokenStatus::Cancelled
        );
    }

    #[test]
    fn test_force_relock_ends_admin_session() {
        let (mut ctrl, _, mut store, _, _) = setup();
        ctrl.scan(ADMIN_CRED, &mut store).unwrap();

        assert_eq!(ctrl.force_relock(&mut store), RelockReport::EndedAdmin);
        assert!(ctrl.state().is_locked());
    }

    #[test]
    fn test_force_relock_when_locked_reports_already_locked() {
        let (mut ctrl, screen, mut store, _, _) = setup();

        assert_eq!(
            ctrl.force_relock(&mut store),
            RelockReport::AlreadyLocked
        );
        assert_eq!(screen.shows(), 0);
    }

    // =====================================================================
    // clear_if_active()
    // =====================================================================

    #[test]
    fn test_clear_if_active_drops_matching_session_without_mutation() {
        let (mut ctrl, screen, mut store, id, cred) = setup();
        ctrl.scan(&cred, &mut store).unwrap();

        assert!(ctrl.clear_if_active(&id));

        assert!(ctrl.state().is_locked());
        // The token itself is NOT rewritten — that's the caller's job.
        assert_eq!(
            store.find_by_id(&id).unwrap().status,
            TokenStatus::InUse
        );
        assert_eq!(screen.shows(), 1);
    }

    #[test]
    fn test_clear_if_active_ignores_other_tokens() {
        let (mut ctrl, _, mut store, id, cred) = setup();
        ctrl.scan(&cred, &mut store).unwrap();

        assert!(!ctrl.clear_if_active(&TokenId::from("someone-else")));
        assert_eq!(ctrl.state().guest_token(), Some(&id));
    }

    // =====================================================================
    // Full lifecycle
    // =====================================================================

    #[test]
    fn test_full_lifecycle_scan_finalize_rescan_rejected() {
        // The single-use property end to end: scan, complete, scan again.
        let (mut ctrl, screen, mut store, _, cred) = setup();

        ctrl.scan(&cred, &mut store).unwrap();
        ctrl.finalize(FinalizeOutcome::Completed, &mut store).unwrap();
        let result = ctrl.scan(&cred, &mut store);

        assert!(matches!(result, Err(SessionError::AlreadyUsed(_))));
        assert!(ctrl.state().is_locked());
        assert_eq!(screen.hides(), 1);
        assert_eq!(screen.shows(), 1);
    }
}
