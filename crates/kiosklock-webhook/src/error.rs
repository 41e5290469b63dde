//! Error types for the webhook layer.

/// The one way a notification can outright fail.
///
/// Everything else a notification can do — wrong phase, nothing armed,
/// too early — is an acknowledged no-op, not an error: the external
/// system retries on error responses, and retrying a correctly ignored
/// notification is pointless traffic.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// A shared secret is configured and the notification's secret does
    /// not match (or is missing).
    #[error("webhook shared secret mismatch")]
    Forbidden,
}
