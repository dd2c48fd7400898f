//! stripecast-composer — frame → stripe production for remote display.
//!
//! A single background worker samples a shared frame buffer, cuts each new
//! frame into fixed full-width stripes, and hands them to encoder threads
//! through a bounded blocking queue.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stripecast_composer::{ClientTracker, SharedFrameBuffer, StripeComposer};
//! use stripecast_core::{ComposerConfig, DisplayGeometry};
//!
//! # fn main() -> Result<(), stripecast_core::StripeError> {
//! let display = DisplayGeometry::new(720, 1280, 4);
//! let frames  = Arc::new(SharedFrameBuffer::new(display));
//! let clients = Arc::new(ClientTracker::new());
//!
//! let composer = StripeComposer::start(
//!     ComposerConfig::default(),
//!     &display,
//!     frames.clone(),
//!     clients.clone(),
//! )?;
//!
//! clients.connect();
//! frames.publish(&vec![0u8; display.frame_bytes()])?;
//! let stripe = composer.pop_next_stripe();
//! assert_eq!(stripe.frame_id, 1);
//! composer.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! # Queue discipline
//!
//! | Situation | Behaviour |
//! |-----------|-----------|
//! | queue below capacity | push appends, wakes one popper |
//! | queue at capacity | oldest `capacity / 2` stripes dropped, then append |
//! | queue empty | `pop_next_stripe` blocks |
//!
//! Dropped stripes show up to consumers as `seq_number` gaps; see
//! [`stripecast_core::SeqGapTracker`].

pub mod composer;
pub mod jitter;
pub mod queue;
pub mod sim;
pub mod source;

pub use composer::{ComposerStats, StripeComposer, StripeReceiver};
pub use jitter::PopJitter;
pub use queue::{erase_oldest_half, BoundedQueue, OverflowFn};
pub use sim::{ClientTracker, SharedFrameBuffer};
pub use source::{ConnectionTracker, FrameBytes, FrameHandle, FrameOffset, FrameSource, ScreenGeometry};
