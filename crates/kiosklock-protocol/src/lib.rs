//! Token records and the credential codec for Kiosklock.
//!
//! This crate defines everything that crosses the control plane's
//! boundaries:
//!
//! - **Types** ([`Token`], [`TokenStatus`], [`TokenId`], [`BatchId`]) —
//!   the persisted token record and its identifiers.
//! - **DTOs** ([`ScanResponse`], [`WebhookNotification`], [`ResetReport`],
//!   etc.) — the request/response shapes of the boundary operations.
//! - **Credential codec** ([`credential`]) — parsing, signing, and
//!   verifying the `ciu:1|batch|id|signature` credential format.
//! - **Errors** ([`CredentialError`], [`StatusParseError`]) — what can go
//!   wrong at this layer. All of it is client-input error, never fatal.
//!
//! # Architecture
//!
//! The protocol layer is a leaf: it performs no I/O and holds no state.
//! It only knows what a token looks like and how to check a credential.
//!
//! ```text
//! HTTP adapter (JSON) → Protocol (records, DTOs) → Session / Store (state)
//! ```

pub mod credential;
mod error;
mod types;

pub use error::{CredentialError, StatusParseError};
pub use types::{
    AdminResetRequest, BatchId, RelockReport, ResetReport, ScanReject,
    ScanRequest, ScanResponse, StatsReport, Token, TokenId, TokenStatus,
    WebhookAck, WebhookIgnoreReason, WebhookNotification,
};
