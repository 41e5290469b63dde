//! The admin bulk-reset engine: operational recovery over the token
//! store.
//!
//! Events go wrong in predictable ways — a station crashes mid-session,
//! a whole batch gets test-scanned before doors open, one guest's token
//! needs a second chance. This crate is the pin-gated repair tool for
//! all of them: pick a scope, pick a target status, and every matched
//! token is rewritten in one pass, with an audit histogram of what the
//! statuses were before.
//!
//! This engine is the only code allowed to move a token against the
//! normal-flow graph (most importantly `in_use` back to `issued`).

mod engine;
mod error;

pub use engine::{BulkResetEngine, ResetRequest, ResetScope};
pub use error::AdminError;
