//! The session controller: who, if anyone, has the station unlocked.
//!
//! This crate owns the single most important piece of runtime state in
//! the system — the lock pointer:
//!
//! 1. **State** ([`LockState`]) — locked, unlocked for one guest token,
//!    or unlocked for an administrator. Never more than one at a time.
//! 2. **Transitions** ([`SessionController`]) — scanning credentials,
//!    finalizing sessions, forced relock.
//! 3. **Presentation seam** ([`LockScreen`] trait) — the overlay that
//!    physically blocks the station is an external collaborator; the
//!    controller only tells it to show or hide.
//!
//! # How it fits in the stack
//!
//! ```text
//! Webhook / Admin engines (above)  ← ask the controller to finalize
//!     ↕
//! Session Controller (this crate)  ← decides, owns the lock pointer
//!     ↕
//! Token Store / Protocol (below)   ← records and credentials
//! ```
//!
//! The controller, not the store, is the authority for "is something
//! currently unlocked". The store merely remembers what it is told.

mod controller;
mod error;
mod screen;
mod session;

pub use controller::{FinalizeOutcome, ScanGrant, SessionController};
pub use error::SessionError;
pub use screen::{LockScreen, NullLockScreen};
pub use session::{LockState, SessionConfig};
