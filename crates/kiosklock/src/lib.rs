//! # Kiosklock
//!
//! Session-lock control plane for single-operator kiosk stations.
//!
//! A station stays locked until a guest presents a pre-issued, signed,
//! single-use credential, and relocks automatically when the external
//! workflow system signals completion. Kiosklock is the decision layer
//! of that loop: credential verification, the single-use token state
//! machine, webhook debouncing, and operational bulk resets. The
//! overlay that physically blocks the screen is an external
//! collaborator behind the [`LockScreen`](kiosklock_session::LockScreen)
//! trait.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kiosklock::prelude::*;
//! use std::sync::{Arc, Mutex};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let station = Station::<NullLockScreen>::builder("spring-gala".into(), "signing-secret")
//!     .store_path("tokens.json")
//!     .admin_pin("4711")
//!     .build(NullLockScreen);
//!
//! let app = kiosklock::http::router(Arc::new(Mutex::new(station)));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod http;
mod station;

pub use error::KioskError;
pub use station::{Station, StationBuilder};

/// The commonly needed types, in one import.
pub mod prelude {
    pub use kiosklock_protocol::{
        AdminResetRequest, BatchId, RelockReport, ResetReport, ScanReject,
        ScanRequest, ScanResponse, StatsReport, Token, TokenId,
        TokenStatus, WebhookAck, WebhookIgnoreReason, WebhookNotification,
    };
    pub use kiosklock_session::{
        LockScreen, LockState, NullLockScreen, SessionConfig,
    };
    pub use kiosklock_webhook::WebhookConfig;

    pub use crate::{KioskError, Station, StationBuilder};
}
