//! Stripecast simulator — drives the stripe composer from a synthetic display.
//!
//! ```text
//! tokio interval (fps) ──► SharedFrameBuffer::publish ──► StripeComposer worker
//!                                                              │
//!                                                   BoundedQueue<Stripe>
//!                                                              │
//!                                          consumer thread (gap tracking) ──► 1-Hz status log
//! ```
//!
//! # Usage
//!
//! ```text
//! stripecast-sim [config.json]
//!
//! STRIPECAST_WIDTH=720 STRIPECAST_HEIGHT=1280 STRIPECAST_BPP=4
//! STRIPECAST_FPS=30 STRIPECAST_DURATION_SECS=10 RUST_LOG=debug
//! ```
//!
//! Runs until Ctrl-C or the configured duration elapses.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use stripecast_composer::{ClientTracker, SharedFrameBuffer, StripeComposer, StripeReceiver};
use stripecast_core::{ComposerConfig, DisplayGeometry, SeqGapTracker, SeqStatus};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

// ── Settings ──────────────────────────────────────────────────────────────────

/// Simulator settings read from the environment.
#[derive(Debug, Clone)]
struct SimSettings {
    display: DisplayGeometry,
    fps: u32,
    duration: Option<Duration>,
}

impl SimSettings {
    fn from_env() -> Result<Self> {
        let display = DisplayGeometry::new(
            env_or("STRIPECAST_WIDTH", 720)?,
            env_or("STRIPECAST_HEIGHT", 1280)?,
            env_or("STRIPECAST_BPP", 4)?,
        );
        let fps = check_fps(env_or("STRIPECAST_FPS", 30)?)?;
        let duration = match std::env::var("STRIPECAST_DURATION_SECS") {
            Ok(v) => Some(Duration::from_secs(
                v.parse().with_context(|| format!("Parsing STRIPECAST_DURATION_SECS={v}"))?,
            )),
            Err(_) => None,
        };
        Ok(Self { display, fps, duration })
    }
}

/// Highest frame rate the frame clock accepts.
const MAX_FPS: u32 = 1_000;

fn check_fps(fps: u32) -> Result<u32> {
    if fps == 0 || fps > MAX_FPS {
        anyhow::bail!("STRIPECAST_FPS must be in 1..={MAX_FPS}, got {fps}");
    }
    Ok(fps)
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v.parse().with_context(|| format!("Parsing {key}={v}")),
        Err(_) => Ok(default),
    }
}

fn load_config() -> Result<ComposerConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(ComposerConfig::default());
    };
    let json = std::fs::read_to_string(&path).with_context(|| format!("Reading config {path}"))?;
    let config = ComposerConfig::from_json_str(&json).with_context(|| format!("Parsing config {path}"))?;
    info!("Loaded composer config from {}", path);
    Ok(config)
}

// ── Consumer ──────────────────────────────────────────────────────────────────

/// Counters shared between the consumer thread and the status log.
#[derive(Default)]
struct ConsumerStats {
    stripes: AtomicU64,
    bytes: AtomicU64,
    gaps: AtomicU64,
    missed: AtomicU64,
}

/// Stand-in for the encoder: drains stripes and watches for sequence gaps.
///
/// The thread is left parked in `pop_next_stripe` at exit; process teardown
/// reclaims it.
fn spawn_consumer(rx: StripeReceiver, stats: Arc<ConsumerStats>) -> Result<()> {
    std::thread::Builder::new()
        .name("stripe-consumer".to_owned())
        .spawn(move || {
            let mut tracker = SeqGapTracker::new();
            loop {
                let stripe = rx.pop_next_stripe();
                stats.stripes.fetch_add(1, Ordering::Relaxed);
                stats.bytes.fetch_add(stripe.byte_len() as u64, Ordering::Relaxed);
                match tracker.observe(stripe.seq_number) {
                    SeqStatus::Gap { missed } => {
                        stats.gaps.fetch_add(1, Ordering::Relaxed);
                        stats.missed.fetch_add(missed, Ordering::Relaxed);
                        debug!("Gap before stripe {} ({} missed) — resync", stripe.seq_number, missed);
                    }
                    SeqStatus::Stale => warn!("Stale stripe {}", stripe.seq_number),
                    SeqStatus::First | SeqStatus::InOrder => {}
                }
            }
        })
        .context("Spawning consumer thread")?;
    Ok(())
}

// ── Frame generator ───────────────────────────────────────────────────────────

/// Fill `buf` with a horizontal gradient that scrolls one row per frame.
fn render_frame(buf: &mut [u8], display: &DisplayGeometry, tick: u64) {
    let row_bytes = display.row_bytes();
    for (row, chunk) in buf.chunks_exact_mut(row_bytes).enumerate() {
        chunk.fill((row as u64).wrapping_add(tick) as u8);
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Stripecast simulator v{}", env!("CARGO_PKG_VERSION"));

    let settings = SimSettings::from_env()?;
    let config = load_config()?;
    let display = settings.display;

    let frames = Arc::new(SharedFrameBuffer::new(display));
    let clients = Arc::new(ClientTracker::new());
    let composer = StripeComposer::start(config, &display, frames.clone(), clients.clone())
        .context("Starting stripe composer")?;

    let consumer_stats = Arc::new(ConsumerStats::default());
    spawn_consumer(composer.receiver(), Arc::clone(&consumer_stats))?;
    clients.connect();

    info!(
        "Simulating {} at {} fps ({})",
        settings.display,
        settings.fps,
        settings
            .duration
            .map(|d| format!("{}s", d.as_secs()))
            .unwrap_or_else(|| "until Ctrl-C".to_owned())
    );

    let mut frame_ticker = tokio::time::interval(Duration::from_secs(1) / settings.fps);
    let mut status_ticker = tokio::time::interval(Duration::from_secs(1));
    let deadline = async {
        match settings.duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut buf = vec![0u8; display.frame_bytes()];
    let mut tick: u64 = 0;
    let mut last_stripes = 0u64;
    let mut window_start = Instant::now();

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Ctrl-C — stopping");
                break;
            }

            _ = &mut deadline => {
                info!("Duration elapsed — stopping");
                break;
            }

            _ = frame_ticker.tick() => {
                render_frame(&mut buf, &display, tick);
                tick += 1;
                if let Err(e) = frames.publish(&buf) {
                    warn!("publish: {:#}", e);
                }
            }

            _ = status_ticker.tick() => {
                let stats = composer.stats();
                let received = consumer_stats.stripes.load(Ordering::Relaxed);
                let elapsed = window_start.elapsed().as_secs_f32().max(f32::EPSILON);
                let rate = (received - last_stripes) as f32 / elapsed;
                last_stripes = received;
                window_start = Instant::now();
                info!(
                    "frames={} stripes={} ({:.0}/s) queued={} evicted={} gaps={} missed={}",
                    stats.frames_captured,
                    received,
                    rate,
                    stats.queued,
                    stats.stripes_evicted,
                    consumer_stats.gaps.load(Ordering::Relaxed),
                    consumer_stats.missed.load(Ordering::Relaxed),
                );
            }
        }
    }

    // ── Cleanup ───────────────────────────────────────────────────────────
    clients.disconnect();
    composer.shutdown();
    info!(
        "Consumed {} stripes ({} MiB)",
        consumer_stats.stripes.load(Ordering::Relaxed),
        consumer_stats.bytes.load(Ordering::Relaxed) / (1024 * 1024)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_bounds() {
        assert!(check_fps(0).is_err());
        assert_eq!(check_fps(1).unwrap(), 1);
        assert_eq!(check_fps(MAX_FPS).unwrap(), MAX_FPS);
        assert!(check_fps(2_000_000_000).is_err());
        assert!(!(Duration::from_secs(1) / MAX_FPS).is_zero());
    }

    #[test]
    fn gradient_scrolls_with_tick() {
        let display = DisplayGeometry::new(2, 3, 1);
        let mut buf = vec![0u8; display.frame_bytes()];
        render_frame(&mut buf, &display, 0);
        assert_eq!(buf, vec![0, 0, 1, 1, 2, 2]);
        render_frame(&mut buf, &display, 1);
        assert_eq!(buf, vec![1, 1, 2, 2, 3, 3]);
    }
}
