//! Collaborator contracts consumed by the composer.
//!
//! The composer never owns the display: it samples a [`FrameSource`], waits
//! on a [`ConnectionTracker`] so no capture work happens with zero clients,
//! and reads dimensions from a [`ScreenGeometry`].

use std::ops::Deref;

use stripecast_core::{DisplayGeometry, StripeError};

/// Location of a frame inside shared frame memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameOffset(pub usize);

/// A newly published frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHandle {
    /// Frame sequence number.
    pub seq: u32,
    pub offset: FrameOffset,
}

/// Readable view of shared frame bytes. Holds whatever guard the source
/// needs for the duration of the read.
pub type FrameBytes<'a> = Box<dyn Deref<Target = [u8]> + 'a>;

/// Shared frame buffer written out-of-band by the display side.
pub trait FrameSource: Send + Sync {
    /// Block until a frame newer than `last_seq` is published.
    ///
    /// Returns `None` once the source has been interrupted.
    fn wait_for_new_frame_since(&self, last_seq: u32) -> Option<FrameHandle>;

    /// Map `offset` to `len` readable bytes.
    fn offset_to_readable_range(&self, offset: FrameOffset, len: usize) -> Result<FrameBytes<'_>, StripeError>;

    /// Release every waiter in [`wait_for_new_frame_since`](Self::wait_for_new_frame_since).
    /// Terminal: later waits return `None` immediately.
    fn interrupt(&self) {}
}

/// Tracks connected stripe consumers (clients).
pub trait ConnectionTracker: Send + Sync {
    /// Block until at least one client is connected.
    ///
    /// Returns `false` once the tracker has been interrupted.
    fn wait_for_at_least_one_connection(&self) -> bool;

    /// Release every waiter. Terminal, like [`FrameSource::interrupt`].
    fn interrupt(&self) {}
}

/// Screen dimensions, assumed stable for the process lifetime.
pub trait ScreenGeometry {
    fn screen_width(&self) -> u32;
    fn screen_height(&self) -> u32;
    fn bytes_per_pixel(&self) -> u32;

    fn geometry(&self) -> DisplayGeometry {
        DisplayGeometry::new(self.screen_width(), self.screen_height(), self.bytes_per_pixel())
    }
}

impl ScreenGeometry for DisplayGeometry {
    fn screen_width(&self) -> u32 {
        self.width
    }

    fn screen_height(&self) -> u32 {
        self.height
    }

    fn bytes_per_pixel(&self) -> u32 {
        self.bytes_per_pixel
    }

    fn geometry(&self) -> DisplayGeometry {
        *self
    }
}
