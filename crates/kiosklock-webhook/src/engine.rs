//! The `DebounceEngine`: filters phase notifications and triggers
//! finalization.

use std::time::Duration;

use kiosklock_protocol::{
    WebhookAck, WebhookIgnoreReason, WebhookNotification,
};
use kiosklock_session::{
    FinalizeOutcome, LockScreen, SessionController,
};
use kiosklock_store::TokenStore;
use subtle::ConstantTimeEq;

use crate::WebhookError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the debounce engine.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// The one phase literal that finalizes a session.
    pub completion_phase: String,

    /// Minimum elapsed time between unlock and an honored completion
    /// signal. Set to zero to disable debouncing entirely.
    pub grace: Duration,

    /// When set, every notification must carry this exact secret or be
    /// rejected as forbidden, independent of phase and age.
    pub shared_secret: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            completion_phase: "session-end".to_string(),
            grace: Duration::from_secs(3),
            shared_secret: None,
        }
    }
}

// ---------------------------------------------------------------------------
// DebounceEngine
// ---------------------------------------------------------------------------

/// Consumes external phase notifications and finalizes armed sessions.
///
/// Stateless apart from its configuration: the arming timestamp it
/// debounces against lives in the session controller's lock state, so
/// the engine itself has nothing to get out of sync.
pub struct DebounceEngine {
    config: WebhookConfig,
}

impl DebounceEngine {
    /// Creates an engine with the given configuration.
    pub fn new(config: WebhookConfig) -> Self {
        Self { config }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Processes one notification, synchronously.
    ///
    /// Returns an acknowledgement describing what (if anything) changed.
    /// Processing is idempotent: a completion signal for a session that
    /// already finalized lands in the not-armed case and is ignored.
    ///
    /// # Errors
    /// Returns [`WebhookError::Forbidden`] on a shared-secret mismatch;
    /// nothing else is an error.
    pub fn handle<S: LockScreen>(
        &self,
        note: &WebhookNotification,
        session: &mut SessionController<S>,
        store: &mut TokenStore,
    ) -> Result<WebhookAck, WebhookError> {
        // The secret gate runs first, independent of phase and age.
        if let Some(expected) = &self.config.shared_secret {
            let presented = note.secret.as_deref().unwrap_or("");
            let matches: bool = expected
                .as_bytes()
                .ct_eq(presented.as_bytes())
                .into();
            if !matches {
                tracing::warn!("webhook rejected: shared secret mismatch");
                return Err(WebhookError::Forbidden);
            }
        }

        // Phase filter: the stream is mostly noise.
        if note.phase != self.config.completion_phase {
            tracing::debug!(phase = %note.phase, "ignoring non-completion phase");
            return Ok(WebhookAck::Ignored {
                reason: WebhookIgnoreReason::IrrelevantPhase,
            });
        }

        // Arming filter: a completion signal with nothing armed is
        // either stale or a duplicate; either way, a no-op.
        let Some(since) = session.state().armed_since() else {
            tracing::debug!("completion signal with no armed session, ignoring");
            return Ok(WebhookAck::Ignored {
                reason: WebhookIgnoreReason::NotArmed,
            });
        };

        // Grace window: a signal this soon after unlock is spurious.
        let age = since.elapsed();
        if age < self.config.grace {
            tracing::info!(
                age_ms = age.as_millis() as u64,
                floor_ms = self.config.grace.as_millis() as u64,
                "completion signal inside grace window, ignoring"
            );
            return Ok(WebhookAck::Ignored {
                reason: WebhookIgnoreReason::WithinGrace,
            });
        }

        if session.state().guest_token().is_some() {
            let token_id = session
                .finalize(FinalizeOutcome::Completed, store)
                .expect("guest session is armed");
            tracing::info!(%token_id, "session finalized by completion signal");
            Ok(WebhookAck::Finalized { token_id })
        } else {
            session.end_admin();
            tracing::info!("admin session relocked by completion signal");
            Ok(WebhookAck::AdminRelocked)
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
