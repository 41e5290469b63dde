//! The webhook debounce engine: turning a noisy, at-least-once stream of
//! phase notifications into at-most-one finalization per session.
//!
//! The external workflow system fires a notification for every phase it
//! passes through — countdown, capture, review, printing, and eventually
//! `session-end` — with no ordering guarantee and occasional duplicates.
//! Three filters stand between that stream and the session controller:
//!
//! 1. **Phase filter** — only the configured completion phase can ever
//!    cause a transition. Everything else is acknowledged and dropped.
//! 2. **Arming filter** — a notification only matters while a session
//!    (guest or admin) is actually armed. This is also what makes a
//!    duplicate completion signal a harmless no-op.
//! 3. **Grace window** — a completion signal younger than the floor
//!    (measured from the unlock instant) is spurious: the workflow
//!    can't genuinely have finished yet. Absorbing the scan/webhook
//!    race by timestamp is the whole point of this window; there is no
//!    mutex to take instead.
//!
//! An optional shared secret gates the whole thing, checked before any
//! of the above.

mod engine;
mod error;

pub use engine::{DebounceEngine, WebhookConfig};
pub use error::WebhookError;
