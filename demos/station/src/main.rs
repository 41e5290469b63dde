//! A runnable Kiosklock station.
//!
//! Wires the control plane to the HTTP adapter with a lock screen that
//! logs instead of driving a real overlay. Configuration comes from the
//! environment:
//!
//! | variable                 | default           |                         |
//! |--------------------------|-------------------|-------------------------|
//! | `KIOSK_HTTP_BIND`        | `127.0.0.1:8080`  | listen address          |
//! | `KIOSK_STORE`            | `tokens.json`     | token store file        |
//! | `KIOSK_BATCH`            | `demo-batch`      | active batch            |
//! | `KIOSK_SIGNING_SECRET`   | `demo-secret`     | credential HMAC secret  |
//! | `KIOSK_ADMIN_PIN`        | unset             | enables bulk resets     |
//! | `KIOSK_ADMIN_CREDENTIAL` | unset             | enables admin unlock    |
//! | `KIOSK_WEBHOOK_SECRET`   | unset             | webhook shared secret   |
//! | `KIOSK_GRACE_SECS`       | `3`               | debounce floor          |
//! | `KIOSK_DEMO_ISSUE`       | unset             | mint N tokens if empty  |
//!
//! Try it:
//!
//! ```text
//! KIOSK_DEMO_ISSUE=3 cargo run -p station-demo
//! curl -s localhost:8080/stats
//! curl -s -X POST localhost:8080/scan -H 'content-type: application/json' \
//!     -d '{"credential": "<one printed at startup>"}'
//! curl -s -X POST localhost:8080/webhook -H 'content-type: application/json' \
//!     -d '{"phase": "session-end"}'
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use std::{env, error::Error};

use kiosklock::prelude::*;

/// A `LockScreen` that narrates instead of drawing. The real overlay
/// process would subscribe here.
struct TracingLockScreen;

impl LockScreen for TracingLockScreen {
    fn hide(&self) {
        tracing::info!("lock screen hidden — station unlocked");
    }

    fn show(&self) {
        tracing::info!("lock screen shown — station locked");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let bind = env::var("KIOSK_HTTP_BIND")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind.parse()?;

    let batch = BatchId(
        env::var("KIOSK_BATCH")
            .unwrap_or_else(|_| "demo-batch".to_string()),
    );
    let secret = env::var("KIOSK_SIGNING_SECRET")
        .unwrap_or_else(|_| "demo-secret".to_string());
    let store_path = env::var("KIOSK_STORE")
        .unwrap_or_else(|_| "tokens.json".to_string());

    let mut builder = Station::<TracingLockScreen>::builder(batch.clone(), secret)
        .store_path(&store_path)
        .webhook_config(WebhookConfig {
            grace: Duration::from_secs(parse_grace_secs()),
            shared_secret: env::var("KIOSK_WEBHOOK_SECRET").ok(),
            ..WebhookConfig::default()
        });
    if let Ok(pin) = env::var("KIOSK_ADMIN_PIN") {
        builder = builder.admin_pin(pin);
    }
    if let Ok(cred) = env::var("KIOSK_ADMIN_CREDENTIAL") {
        builder = builder.admin_credential(cred);
    }

    let mut station = builder.build(TracingLockScreen);

    // First-run convenience: mint a demo batch and print the
    // credentials so there is something to scan.
    if let Some(count) = parse_demo_issue() {
        if station.store().is_empty() {
            let ids = station.issue_batch(&batch, count);
            for id in &ids {
                let cred = station
                    .store()
                    .find_by_id(id)
                    .map(|t| t.credential.clone())
                    .unwrap_or_default();
                tracing::info!(%id, credential = %cred, "demo token issued");
            }
        }
    }

    let app = kiosklock::http::router(Arc::new(Mutex::new(station)));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, store = %store_path, batch = %batch, "kiosklock station listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_grace_secs() -> u64 {
    env::var("KIOSK_GRACE_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(3)
}

fn parse_demo_issue() -> Option<usize> {
    env::var("KIOSK_DEMO_ISSUE")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
}
