//! r2cam headless viewer
//!
//! Connects to a camera, keeps the session alive the way a mobile viewer
//! would, and logs every status change. Stream bytes are counted, not
//! decoded.
//!
//! Environment variables mirror the flags (`R2CAM_HOST`, `R2CAM_PORT`, ...).
//! Log level comes from `RUST_LOG`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use r2cam::prelude::*;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "r2cam-viewer")]
#[command(about = "Headless viewer for an H.264 camera stream", long_about = None)]
struct Args {
    /// Camera host
    #[arg(long, env = "R2CAM_HOST", default_value = DEFAULT_CAMERA_HOST)]
    host: String,

    /// Camera port
    #[arg(long, env = "R2CAM_PORT", default_value_t = DEFAULT_CAMERA_PORT)]
    port: u16,

    /// Transport kind
    #[arg(long, env = "R2CAM_TRANSPORT", default_value = "h264")]
    transport: TransportKind,

    /// Start attempts before giving up
    #[arg(long, env = "R2CAM_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Delay between attempts, in milliseconds
    #[arg(long, env = "R2CAM_BACKOFF_MS", default_value_t = DEFAULT_BACKOFF.as_millis() as u64)]
    backoff_ms: u64,

    /// Double the delay after each failure (jittered, capped)
    #[arg(long)]
    exponential: bool,
}

impl Args {
    fn config(&self) -> SessionConfig {
        let delay = Duration::from_millis(self.backoff_ms);
        let backoff = if self.exponential {
            BackoffPolicy::exponential(delay, DEFAULT_MAX_BACKOFF.max(delay))
        } else {
            BackoffPolicy::Fixed(delay)
        };

        SessionConfig::builder()
            .transport(self.transport)
            .host(self.host.clone())
            .port(self.port)
            .max_attempts(self.max_attempts)
            .backoff(backoff)
            .build()
    }
}

/// Counts stream bytes in place of a decoder.
struct ByteCounter {
    total: Arc<AtomicU64>,
}

impl FrameSink for ByteCounter {
    fn push(&mut self, chunk: &[u8]) -> Option<FrameSize> {
        self.total.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        None
    }

    fn reset(&mut self) {
        self.total.store(0, Ordering::Relaxed);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .compact()
        .init();

    let args = Args::parse();
    let config = args.config();
    info!(
        endpoint = %config.params,
        max_attempts = config.retry.max_attempts,
        "r2cam viewer starting"
    );

    let total = Arc::new(AtomicU64::new(0));
    let session = SessionManager::spawn_tcp(
        config,
        ByteCounter {
            total: Arc::clone(&total),
        },
    )
    .context("invalid session configuration")?;

    session.on_phase_change(AppPhase::Active)?;

    let mut status = session.subscribe();
    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("received shutdown signal");
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    warn!("session manager exited");
                    break;
                }
                let snapshot = status.borrow_and_update().clone();
                match &snapshot.status {
                    SessionStatus::Failed(reason) => warn!(%reason, "camera unavailable"),
                    other => info!(
                        status = %other,
                        attempt = snapshot.attempt,
                        message = snapshot.error_text(),
                        "status changed"
                    ),
                }
            }
            _ = ticker.tick() => {
                if session.status().is_running() {
                    info!(bytes = total.load(Ordering::Relaxed), "receiving");
                }
            }
        }
    }

    session.shutdown().await?;
    info!("r2cam viewer stopped");
    Ok(())
}
