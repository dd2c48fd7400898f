//! Stripe sequence gap detection for consumers.
//!
//! The stripe queue drops its oldest half when full and does not tell anyone.
//! A consumer that needs a complete picture watches `seq_number` and treats a
//! gap as a request to resync (redraw the full screen).

use crate::types::StripeSeqNumber;

/// Outcome of observing one stripe sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqStatus {
    /// First stripe seen by this tracker.
    First,
    /// Directly follows the previous stripe.
    InOrder,
    /// `missed` stripes were skipped since the previous one.
    Gap { missed: u64 },
    /// Not newer than the last observed stripe.
    Stale,
}

#[derive(Debug, Default, Clone)]
pub struct SeqGapTracker {
    last: Option<StripeSeqNumber>,
    gaps: u64,
    missed: u64,
}

impl SeqGapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, seq: StripeSeqNumber) -> SeqStatus {
        let status = match self.last {
            None => SeqStatus::First,
            Some(last) if seq <= last => return SeqStatus::Stale,
            Some(last) if seq == last.next() => SeqStatus::InOrder,
            Some(last) => {
                let missed = seq.get() - last.get() - 1;
                self.gaps += 1;
                self.missed += missed;
                SeqStatus::Gap { missed }
            }
        };
        self.last = Some(seq);
        status
    }

    /// Number of gaps observed so far.
    pub fn gaps(&self) -> u64 {
        self.gaps
    }

    /// Total stripes skipped across all gaps.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    pub fn last(&self) -> Option<StripeSeqNumber> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: u64) -> StripeSeqNumber {
        StripeSeqNumber::new(v)
    }

    #[test]
    fn tracks_order_gaps_and_stale() {
        let mut t = SeqGapTracker::new();
        assert_eq!(t.observe(s(2)), SeqStatus::First);
        assert_eq!(t.observe(s(3)), SeqStatus::InOrder);
        assert_eq!(t.observe(s(10)), SeqStatus::Gap { missed: 6 });
        assert_eq!(t.observe(s(9)), SeqStatus::Stale);
        assert_eq!(t.observe(s(11)), SeqStatus::InOrder);
        assert_eq!(t.gaps(), 1);
        assert_eq!(t.missed(), 6);
        assert_eq!(t.last(), Some(s(11)));
    }
}
