//! `StripeComposer` — background worker that turns frames into stripes.
//!
//! ```text
//! ConnectionTracker ──(≥1 client)──┐
//!                                  ▼
//! FrameSource ──(new frame)──► copy frame ──► stripe_layout ──► N × push
//!                                                                  │
//!                                                                  ▼
//!                                             BoundedQueue<Stripe> (drop oldest half)
//!                                                                  │
//!                                    StripeReceiver::pop_next_stripe ◄── encoder threads
//! ```
//!
//! # Lifecycle
//!
//! [`StripeComposer::start`] spawns the worker; it runs until
//! [`StripeComposer::shutdown`] (or drop). Shutdown marks the composer
//! closed, interrupts both collaborators so a parked worker wakes up, and
//! joins the thread. The closed flag is checked at the top of each
//! iteration, so a frame already being sliced is always pushed in full.
//! Once `shutdown` returns, no more stripes are pushed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use stripecast_core::{
    stripe_layout, ComposerConfig, DisplayGeometry, ScreenOrientation, Stripe, StripeError, StripeRect,
    StripeSeqNumber,
};
use tracing::{debug, error, info, trace, warn};

use crate::jitter::PopJitter;
use crate::queue::BoundedQueue;
use crate::source::{ConnectionTracker, FrameSource, ScreenGeometry};

/// Stripe sequence counter start. The counter is bumped before each stripe,
/// so the first stripe carries `FIRST_STRIPE_SEQ + 1`.
const FIRST_STRIPE_SEQ: u64 = 1;

// ── Stats ─────────────────────────────────────────────────────────────────────

/// Snapshot of composer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposerStats {
    /// Frames copied out of the frame source and sliced.
    pub frames_captured: u64,
    /// Frames announced by the source but unreadable.
    pub frames_skipped: u64,
    /// Stripes pushed onto the queue.
    pub stripes_produced: u64,
    /// Stripes dropped by the overflow policy.
    pub stripes_evicted: u64,
    /// Stripes currently buffered.
    pub queued: usize,
}

#[derive(Default)]
struct Shared {
    closed: AtomicBool,
    frames_captured: AtomicU64,
    frames_skipped: AtomicU64,
    stripes_produced: AtomicU64,
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

// ── StripeReceiver ────────────────────────────────────────────────────────────

/// Consumer handle onto the stripe queue. Cheap to clone across encoder threads.
#[derive(Clone)]
pub struct StripeReceiver {
    queue: Arc<BoundedQueue<Stripe>>,
    stripe_count: u16,
    jitter: Option<Arc<PopJitter>>,
}

impl StripeReceiver {
    /// Block until a stripe is available and take it.
    pub fn pop_next_stripe(&self) -> Stripe {
        let stripe = self.queue.pop();
        match &self.jitter {
            Some(jitter) if jitter.roll() => {
                thread::sleep(jitter.delay());
                trace!("Jitter: requeueing stripe {}", stripe.seq_number);
                self.queue.push(stripe);
                self.queue.pop()
            }
            _ => stripe,
        }
    }

    /// Number of stripes each frame is cut into.
    pub fn stripe_count(&self) -> u16 {
        self.stripe_count
    }

    /// Stripes currently buffered.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

// ── StripeComposer ────────────────────────────────────────────────────────────

/// Owns the stripe-making worker thread and the stripe queue.
pub struct StripeComposer {
    shared: Arc<Shared>,
    receiver: StripeReceiver,
    frames: Arc<dyn FrameSource>,
    connections: Arc<dyn ConnectionTracker>,
    worker: Option<JoinHandle<()>>,
}

impl StripeComposer {
    /// Validate `config` against the display and spawn the worker.
    ///
    /// The worker starts producing as soon as a client is connected and a
    /// frame is published; there is no separate "run" step.
    pub fn start(
        config: ComposerConfig,
        screen: &impl ScreenGeometry,
        frames: Arc<dyn FrameSource>,
        connections: Arc<dyn ConnectionTracker>,
    ) -> Result<Self, StripeError> {
        let geometry = screen.geometry();
        config.validate(&geometry)?;
        let layout = stripe_layout(geometry.height, config.num_stripes)?;

        let queue = Arc::new(BoundedQueue::with_half_eviction(config.max_queue_elements));
        let jitter = config.pop_jitter.as_ref().map(|j| {
            warn!(
                "Pop jitter enabled (p={}, delay={}ms) — stress configuration",
                j.probability, j.delay_ms
            );
            Arc::new(PopJitter::new(j))
        });
        let shared = Arc::new(Shared::default());

        let worker = StripeMaker {
            shared: Arc::clone(&shared),
            queue: Arc::clone(&queue),
            frames: Arc::clone(&frames),
            connections: Arc::clone(&connections),
            geometry,
            layout,
            orientation: config.orientation,
        };
        let handle = thread::Builder::new()
            .name("stripe-maker".to_owned())
            .spawn(move || worker.run())?;

        info!(
            "Stripe composer started: display={} stripes={} queue_capacity={} orientation={}",
            geometry, config.num_stripes, config.max_queue_elements, config.orientation
        );

        Ok(Self {
            shared,
            receiver: StripeReceiver { queue, stripe_count: config.num_stripes, jitter },
            frames,
            connections,
            worker: Some(handle),
        })
    }

    /// A new consumer handle onto the stripe queue.
    pub fn receiver(&self) -> StripeReceiver {
        self.receiver.clone()
    }

    /// Block until a stripe is available and take it.
    pub fn pop_next_stripe(&self) -> Stripe {
        self.receiver.pop_next_stripe()
    }

    /// Number of stripes each frame is cut into.
    pub fn stripe_count(&self) -> u16 {
        self.receiver.stripe_count
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    pub fn stats(&self) -> ComposerStats {
        ComposerStats {
            frames_captured: self.shared.frames_captured.load(Ordering::Relaxed),
            frames_skipped: self.shared.frames_skipped.load(Ordering::Relaxed),
            stripes_produced: self.shared.stripes_produced.load(Ordering::Relaxed),
            stripes_evicted: self.receiver.queue.evicted(),
            queued: self.receiver.queue.len(),
        }
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// Interrupting the collaborators is terminal for them; do not share a
    /// frame source or tracker with a composer that should keep running.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(handle) = self.worker.take() else { return };
        self.shared.closed.store(true, Ordering::Release);
        self.connections.interrupt();
        self.frames.interrupt();
        if handle.join().is_err() {
            error!("Stripe maker thread panicked");
        }
        let stats = self.stats();
        info!(
            "Stripe composer stopped: frames={} stripes={} evicted={} skipped={}",
            stats.frames_captured, stats.stripes_produced, stats.stripes_evicted, stats.frames_skipped
        );
    }
}

impl Drop for StripeComposer {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

struct StripeMaker {
    shared: Arc<Shared>,
    queue: Arc<BoundedQueue<Stripe>>,
    frames: Arc<dyn FrameSource>,
    connections: Arc<dyn ConnectionTracker>,
    geometry: DisplayGeometry,
    layout: Vec<StripeRect>,
    orientation: ScreenOrientation,
}

impl StripeMaker {
    fn run(self) {
        let frame_len = self.geometry.frame_bytes();
        let mut previous_seq: u32 = 0;
        let mut stripe_seq = StripeSeqNumber::new(FIRST_STRIPE_SEQ);
        let mut raw_screen: Vec<u8> = Vec::with_capacity(frame_len);

        while !self.shared.is_closed() {
            if !self.connections.wait_for_at_least_one_connection() {
                debug!("Connection tracker interrupted");
                break;
            }
            let Some(frame) = self.frames.wait_for_new_frame_since(previous_seq) else {
                debug!("Frame source interrupted");
                break;
            };
            previous_seq = frame.seq;

            // Shared frame memory is rewritten out-of-band; take a private copy.
            match self.frames.offset_to_readable_range(frame.offset, frame_len) {
                Ok(bytes) => {
                    raw_screen.clear();
                    raw_screen.extend_from_slice(&**bytes);
                }
                Err(e) => {
                    warn!("Skipping frame seq={}: {}", frame.seq, e);
                    self.shared.frames_skipped.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            }
            self.shared.frames_captured.fetch_add(1, Ordering::Relaxed);

            for rect in &self.layout {
                stripe_seq = stripe_seq.next();
                let stripe = Stripe {
                    index: rect.index,
                    frame_id: frame.seq,
                    x: 0,
                    y: rect.y,
                    width: self.geometry.width,
                    height: rect.height,
                    raw_data: Bytes::copy_from_slice(&raw_screen[rect.byte_range(&self.geometry)]),
                    seq_number: stripe_seq,
                    orientation: self.orientation,
                };
                trace!(
                    "Stripe {} frame={} index={} y={} h={}",
                    stripe.seq_number, stripe.frame_id, stripe.index, stripe.y, stripe.height
                );
                self.queue.push(stripe);
                self.shared.stripes_produced.fetch_add(1, Ordering::Relaxed);
            }
            debug!(
                "Frame seq={} sliced into {} stripes (last seq {})",
                frame.seq,
                self.layout.len(),
                stripe_seq
            );
        }

        info!("Stripe maker exiting");
    }
}
