use bytes::Bytes;
use serde::{Deserialize, Serialize};

// MARK: - StripeSeqNumber

/// Global stripe sequence number.
///
/// Strictly increasing over the lifetime of one composer; independent of the
/// per-frame stripe index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct StripeSeqNumber(pub u64);

impl StripeSeqNumber {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for StripeSeqNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// MARK: - ScreenOrientation

/// Display rotation tag carried on every stripe. Fixed per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenOrientation {
    #[default]
    Portrait,
    Landscape,
}

impl std::fmt::Display for ScreenOrientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Portrait => write!(f, "portrait"),
            Self::Landscape => write!(f, "landscape"),
        }
    }
}

// MARK: - DisplayGeometry

/// Screen dimensions of the captured display. Stable for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayGeometry {
    pub width: u32,
    pub height: u32,
    #[serde(alias = "bytesPerPixel")]
    pub bytes_per_pixel: u32,
}

impl DisplayGeometry {
    pub fn new(width: u32, height: u32, bytes_per_pixel: u32) -> Self {
        Self { width, height, bytes_per_pixel }
    }

    /// Bytes in one full-width pixel row.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.bytes_per_pixel as usize
    }

    /// Bytes in one complete frame.
    pub fn frame_bytes(&self) -> usize {
        self.row_bytes() * self.height as usize
    }
}

impl std::fmt::Display for DisplayGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}×{}B", self.width, self.height, self.bytes_per_pixel)
    }
}

// MARK: - Stripe

/// A horizontal band of one captured frame, the unit handed to the encoder.
///
/// Stripes are built whole by the composer and never mutated afterwards.
/// `raw_data` is a private copy of the frame rows `[y, y + height)`; it never
/// aliases shared frame memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stripe {
    /// Position within the frame's partition, `0..stripe_count`.
    pub index: u16,
    /// Sequence number of the frame this stripe was cut from.
    pub frame_id: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub raw_data: Bytes,
    pub seq_number: StripeSeqNumber,
    pub orientation: ScreenOrientation,
}

impl Stripe {
    pub fn byte_len(&self) -> usize {
        self.raw_data.len()
    }

    /// First row below this stripe.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}
