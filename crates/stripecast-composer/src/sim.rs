//! In-process collaborators: a shared frame buffer and a client tracker.
//!
//! These back the simulator binary and the tests. A real deployment swaps
//! them for its display server's frame region and connection bookkeeping.

use parking_lot::{Condvar, MappedMutexGuard, Mutex, MutexGuard};
use stripecast_core::{DisplayGeometry, StripeError};
use tracing::{debug, trace};

use crate::source::{ConnectionTracker, FrameBytes, FrameHandle, FrameOffset, FrameSource, ScreenGeometry};

// ── SharedFrameBuffer ─────────────────────────────────────────────────────────

/// Default number of frame slots in a [`SharedFrameBuffer`].
pub const DEFAULT_FRAME_SLOTS: usize = 3;

#[derive(Debug, Default)]
struct FrameState {
    seq: u32,
    offset: FrameOffset,
    interrupted: bool,
}

/// Ring of frame slots in one contiguous region. Each publish writes the next
/// slot and bumps the frame sequence (first frame is seq 1).
pub struct SharedFrameBuffer {
    geometry: DisplayGeometry,
    slots: usize,
    memory: Mutex<Vec<u8>>,
    state: Mutex<FrameState>,
    new_frame: Condvar,
}

impl SharedFrameBuffer {
    pub fn new(geometry: DisplayGeometry) -> Self {
        Self::with_slots(geometry, DEFAULT_FRAME_SLOTS)
    }

    /// # Panics
    /// Panics if `slots` is 0.
    pub fn with_slots(geometry: DisplayGeometry, slots: usize) -> Self {
        assert!(slots > 0, "frame buffer needs at least one slot");
        Self {
            geometry,
            slots,
            memory: Mutex::new(vec![0u8; geometry.frame_bytes() * slots]),
            state: Mutex::new(FrameState::default()),
            new_frame: Condvar::new(),
        }
    }

    /// Copy `frame` into the next slot and announce it to waiters.
    pub fn publish(&self, frame: &[u8]) -> Result<FrameHandle, StripeError> {
        let frame_len = self.geometry.frame_bytes();
        if frame.len() != frame_len {
            return Err(StripeError::InvalidGeometry {
                reason: format!("frame is {} bytes, display {} needs {}", frame.len(), self.geometry, frame_len),
            });
        }

        let seq = self.state.lock().seq.wrapping_add(1);
        let offset = FrameOffset((seq as usize % self.slots) * frame_len);
        {
            let mut memory = self.memory.lock();
            memory[offset.0..offset.0 + frame_len].copy_from_slice(frame);
        }

        let handle = {
            let mut state = self.state.lock();
            state.seq = seq;
            state.offset = offset;
            FrameHandle { seq, offset }
        };
        self.new_frame.notify_all();
        trace!("Published frame seq={} offset={}", seq, offset.0);
        Ok(handle)
    }

    /// Sequence number of the most recent frame (0 before the first publish).
    pub fn latest_seq(&self) -> u32 {
        self.state.lock().seq
    }
}

impl FrameSource for SharedFrameBuffer {
    fn wait_for_new_frame_since(&self, last_seq: u32) -> Option<FrameHandle> {
        let mut state = self.state.lock();
        while state.seq == last_seq && !state.interrupted {
            self.new_frame.wait(&mut state);
        }
        if state.interrupted {
            return None;
        }
        Some(FrameHandle { seq: state.seq, offset: state.offset })
    }

    fn offset_to_readable_range(&self, offset: FrameOffset, len: usize) -> Result<FrameBytes<'_>, StripeError> {
        let memory = self.memory.lock();
        let available = memory.len();
        let end = offset.0.checked_add(len).filter(|&end| end <= available);
        let Some(end) = end else {
            return Err(StripeError::FrameOutOfRange { offset: offset.0, len, available });
        };
        let view: MappedMutexGuard<'_, [u8]> = MutexGuard::map(memory, |m| &mut m[offset.0..end]);
        Ok(Box::new(view))
    }

    fn interrupt(&self) {
        self.state.lock().interrupted = true;
        self.new_frame.notify_all();
        debug!("Frame buffer interrupted");
    }
}

impl ScreenGeometry for SharedFrameBuffer {
    fn screen_width(&self) -> u32 {
        self.geometry.width
    }

    fn screen_height(&self) -> u32 {
        self.geometry.height
    }

    fn bytes_per_pixel(&self) -> u32 {
        self.geometry.bytes_per_pixel
    }
}

// ── ClientTracker ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ClientState {
    count: usize,
    interrupted: bool,
}

/// Counts connected clients and parks the composer while there are none.
#[derive(Default)]
pub struct ClientTracker {
    state: Mutex<ClientState>,
    changed: Condvar,
}

impl ClientTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client. Returns the new client count.
    pub fn connect(&self) -> usize {
        let count = {
            let mut state = self.state.lock();
            state.count += 1;
            state.count
        };
        self.changed.notify_all();
        debug!("Client connected ({} total)", count);
        count
    }

    /// Drop a client. Returns the remaining client count.
    pub fn disconnect(&self) -> usize {
        let mut state = self.state.lock();
        state.count = state.count.saturating_sub(1);
        debug!("Client disconnected ({} left)", state.count);
        state.count
    }

    pub fn count(&self) -> usize {
        self.state.lock().count
    }
}

impl ConnectionTracker for ClientTracker {
    fn wait_for_at_least_one_connection(&self) -> bool {
        let mut state = self.state.lock();
        while state.count == 0 && !state.interrupted {
            self.changed.wait(&mut state);
        }
        !state.interrupted
    }

    fn interrupt(&self) {
        self.state.lock().interrupted = true;
        self.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn tiny() -> DisplayGeometry {
        DisplayGeometry::new(2, 4, 1)
    }

    #[test]
    fn publish_advances_seq_and_rotates_slots() {
        let fb = SharedFrameBuffer::with_slots(tiny(), 2);
        assert_eq!(fb.latest_seq(), 0);
        let a = fb.publish(&[1; 8]).unwrap();
        let b = fb.publish(&[2; 8]).unwrap();
        assert_eq!((a.seq, b.seq), (1, 2));
        assert_ne!(a.offset, b.offset);

        let bytes = fb.offset_to_readable_range(b.offset, 8).unwrap();
        assert_eq!(&**bytes, &[2u8; 8][..]);
    }

    #[test]
    fn publish_rejects_wrong_frame_size() {
        let fb = SharedFrameBuffer::new(tiny());
        assert!(fb.publish(&[0; 7]).is_err());
    }

    #[test]
    fn readable_range_is_bounds_checked() {
        let fb = SharedFrameBuffer::with_slots(tiny(), 1);
        assert!(matches!(
            fb.offset_to_readable_range(FrameOffset(4), 8),
            Err(StripeError::FrameOutOfRange { available: 8, .. })
        ));
    }

    #[test]
    fn wait_returns_latest_frame_newer_than_last_seen() {
        let fb = Arc::new(SharedFrameBuffer::new(tiny()));
        let waiter = {
            let fb = Arc::clone(&fb);
            thread::spawn(move || fb.wait_for_new_frame_since(0))
        };
        fb.publish(&[9; 8]).unwrap();
        let handle = waiter.join().unwrap().expect("frame");
        assert_eq!(handle.seq, 1);

        fb.publish(&[8; 8]).unwrap();
        fb.publish(&[7; 8]).unwrap();
        assert_eq!(fb.wait_for_new_frame_since(1).map(|h| h.seq), Some(3));
    }

    #[test]
    fn interrupt_releases_waiters() {
        let fb = Arc::new(SharedFrameBuffer::new(tiny()));
        let clients = Arc::new(ClientTracker::new());
        let frame_waiter = {
            let fb = Arc::clone(&fb);
            thread::spawn(move || fb.wait_for_new_frame_since(0))
        };
        let client_waiter = {
            let clients = Arc::clone(&clients);
            thread::spawn(move || clients.wait_for_at_least_one_connection())
        };
        fb.interrupt();
        clients.interrupt();
        assert_eq!(frame_waiter.join().unwrap(), None);
        assert!(!client_waiter.join().unwrap());
    }

    #[test]
    fn client_tracker_counts() {
        let clients = ClientTracker::new();
        assert_eq!(clients.connect(), 1);
        assert_eq!(clients.connect(), 2);
        assert!(clients.wait_for_at_least_one_connection());
        assert_eq!(clients.disconnect(), 1);
        assert_eq!(clients.disconnect(), 0);
        assert_eq!(clients.disconnect(), 0);
    }
}
