//! Frame → stripe partitioning.
//!
//! A frame of height `H` is cut into `N` full-width bands of `H / N` rows.
//! The last band also takes the `H % N` leftover rows, so the bands cover
//! the frame exactly with no gap or overlap.
//!
//! ```text
//! H = 402, N = 4
//!
//!   y=0   ┌──────────────┐  stripe 0  h=100
//!   y=100 ├──────────────┤  stripe 1  h=100
//!   y=200 ├──────────────┤  stripe 2  h=100
//!   y=300 ├──────────────┤  stripe 3  h=102
//!   y=402 └──────────────┘
//! ```

use std::ops::Range;

use crate::errors::StripeError;
use crate::types::DisplayGeometry;

/// Vertical placement of one stripe within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripeRect {
    pub index: u16,
    pub y: u32,
    pub height: u32,
}

impl StripeRect {
    /// Byte range of this stripe's rows inside a tightly packed frame.
    pub fn byte_range(&self, geometry: &DisplayGeometry) -> Range<usize> {
        let row = geometry.row_bytes();
        let start = self.y as usize * row;
        start..start + self.height as usize * row
    }
}

/// Compute the stripe partition for a frame `screen_height` rows tall.
pub fn stripe_layout(screen_height: u32, stripe_count: u16) -> Result<Vec<StripeRect>, StripeError> {
    if stripe_count == 0 {
        return Err(StripeError::InvalidGeometry {
            reason: "stripe count must be at least 1".to_owned(),
        });
    }
    let n = u32::from(stripe_count);
    if screen_height < n {
        return Err(StripeError::InvalidGeometry {
            reason: format!("screen height {screen_height} is smaller than stripe count {n}"),
        });
    }

    let base = screen_height / n;
    let remainder = screen_height % n;

    Ok((0..stripe_count)
        .map(|i| {
            let last = i + 1 == stripe_count;
            StripeRect {
                index: i,
                y: base * u32::from(i),
                height: base + if last { remainder } else { 0 },
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_goes_to_last_stripe() {
        let rects = stripe_layout(402, 4).unwrap();
        let heights: Vec<u32> = rects.iter().map(|r| r.height).collect();
        let ys: Vec<u32> = rects.iter().map(|r| r.y).collect();
        assert_eq!(heights, vec![100, 100, 100, 102]);
        assert_eq!(ys, vec![0, 100, 200, 300]);
    }

    #[test]
    fn heights_cover_frame_exactly() {
        for h in [8u32, 9, 63, 480, 1080, 1281] {
            for n in [1u16, 2, 3, 7, 8] {
                let rects = stripe_layout(h, n).unwrap();
                assert_eq!(rects.len(), n as usize);
                assert_eq!(rects.iter().map(|r| r.height).sum::<u32>(), h, "h={h} n={n}");
                let mut next_y = 0;
                for r in &rects {
                    assert_eq!(r.y, next_y, "gap or overlap at stripe {}", r.index);
                    assert!(r.height > 0);
                    next_y += r.height;
                }
            }
        }
    }

    #[test]
    fn evenly_divisible_height_is_uniform() {
        let rects = stripe_layout(1280, 8).unwrap();
        assert!(rects.iter().all(|r| r.height == 160));
    }

    #[test]
    fn rejects_zero_stripes_and_short_screens() {
        assert!(matches!(stripe_layout(100, 0), Err(StripeError::InvalidGeometry { .. })));
        assert!(matches!(stripe_layout(3, 4), Err(StripeError::InvalidGeometry { .. })));
    }

    #[test]
    fn byte_range_spans_full_width_rows() {
        let g = DisplayGeometry::new(10, 402, 4);
        let rects = stripe_layout(g.height, 4).unwrap();
        assert_eq!(rects[0].byte_range(&g), 0..4_000);
        assert_eq!(rects[3].byte_range(&g), 12_000..16_080);
        assert_eq!(rects[3].byte_range(&g).end, g.frame_bytes());
    }
}
