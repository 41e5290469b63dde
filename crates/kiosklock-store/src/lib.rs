//! The token store: the durable collection of issued token records.
//!
//! This crate owns the one piece of persistent state in the control
//! plane. Its contract is deliberately blunt:
//!
//! 1. **Lenient load** — a missing, empty, or unparseable backing file
//!    yields an empty store and a warning, never a startup failure.
//! 2. **Full-snapshot writes** — every mutation that changes a record is
//!    followed by a synchronous rewrite of the whole file, so the disk
//!    always holds one consistent snapshot.
//! 3. **Startup reconciliation** — tokens found `in_use` at load time are
//!    crash orphans and are cancelled before any request is served.
//!
//! # How it fits in the stack
//!
//! ```text
//! Session Controller / Admin Engine (above)  ← decide WHAT changes
//!     ↕
//! Token Store (this crate)  ← owns the records and the file
//!     ↕
//! kiosklock-protocol (below)  ← defines what a Token IS
//! ```

mod error;
mod store;

pub use error::StoreError;
pub use store::TokenStore;
