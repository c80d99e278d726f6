//! Watched ranges - the played-through intervals of a video.

use serde::{Deserialize, Serialize};

/// One contiguous interval of video, in seconds, that was actually played.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatchedRange {
    /// Start of the interval (inclusive)
    pub start: f64,
    /// End of the interval
    pub end: f64,
}

impl WatchedRange {
    /// Create a range, returning `None` for negative, non-finite or empty input.
    pub fn new(start: f64, end: f64) -> Option<Self> {
        let range = Self { start, end };
        range.is_valid().then_some(range)
    }

    /// Whether `0 <= start < end` holds with finite bounds.
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start >= 0.0 && self.start < self.end
    }

    /// Length in seconds.
    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    /// Restrict the range to `[0, max]`.
    pub fn clamped(&self, max: f64) -> Option<Self> {
        Self::new(self.start.max(0.0), self.end.min(max))
    }
}

/// A normalized set of watched ranges.
///
/// Ranges are kept sorted and strictly separated: for consecutive ranges
/// `a`, `b` it always holds that `a.end < b.start`. Overlapping or touching
/// input is merged on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<WatchedRange>", into = "Vec<WatchedRange>")]
pub struct WatchedRanges {
    ranges: Vec<WatchedRange>,
}

impl WatchedRanges {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a normalized set from untrusted ranges.
    ///
    /// Invalid ranges are dropped and the rest merged.
    pub fn from_ranges(ranges: impl IntoIterator<Item = WatchedRange>) -> Self {
        let mut set = Self::new();
        for range in ranges {
            set.insert(range);
        }
        set
    }

    /// Fold a range into the set.
    ///
    /// Returns `true` if the watched coverage grew.
    pub fn insert(&mut self, range: WatchedRange) -> bool {
        if !range.is_valid() {
            return false;
        }

        let mut start = range.start;
        let mut end = range.end;

        // First range that ends at or after the new start (touching counts)
        let first = self.ranges.partition_point(|r| r.end < start);
        let mut last = first;
        while last < self.ranges.len() && self.ranges[last].start <= end {
            start = start.min(self.ranges[last].start);
            end = end.max(self.ranges[last].end);
            last += 1;
        }

        let merged = WatchedRange { start, end };
        if last - first == 1 && self.ranges[first] == merged {
            return false;
        }

        self.ranges.splice(first..last, std::iter::once(merged));
        true
    }

    /// Sum of all range lengths in seconds.
    pub fn total_seconds(&self) -> f64 {
        self.ranges.iter().map(WatchedRange::len).sum()
    }

    /// Number of ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether no time has been watched.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Iterate ranges in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &WatchedRange> {
        self.ranges.iter()
    }

    /// The ranges as a slice.
    pub fn as_slice(&self) -> &[WatchedRange] {
        &self.ranges
    }
}

impl From<Vec<WatchedRange>> for WatchedRanges {
    fn from(ranges: Vec<WatchedRange>) -> Self {
        Self::from_ranges(ranges)
    }
}

impl From<WatchedRanges> for Vec<WatchedRange> {
    fn from(set: WatchedRanges) -> Self {
        set.ranges
    }
}

/// Watched percentage, clamped to 100.
///
/// Returns 0 when the duration is unknown (non-positive or non-finite).
pub fn watched_percentage(total_seconds: f64, duration_seconds: f64) -> u8 {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 || !total_seconds.is_finite() {
        return 0;
    }
    let pct = (total_seconds.max(0.0) / duration_seconds * 100.0).round();
    pct.min(100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(start: f64, end: f64) -> WatchedRange {
        WatchedRange::new(start, end).unwrap()
    }

    fn assert_separated(set: &WatchedRanges) {
        for pair in set.as_slice().windows(2) {
            assert!(pair[0].end < pair[1].start, "ranges overlap or touch: {:?}", pair);
        }
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        assert!(WatchedRange::new(5.0, 5.0).is_none());
        assert!(WatchedRange::new(10.0, 5.0).is_none());
        assert!(WatchedRange::new(-1.0, 5.0).is_none());
        assert!(WatchedRange::new(0.0, f64::NAN).is_none());
        assert!(WatchedRange::new(0.0, f64::INFINITY).is_none());
    }

    #[test]
    fn test_touching_ranges_merge() {
        let mut set = WatchedRanges::new();
        assert!(set.insert(r(0.0, 5.0)));
        assert!(set.insert(r(5.0, 10.0)));
        assert_eq!(set.as_slice(), &[r(0.0, 10.0)]);
        assert_eq!(set.total_seconds(), 10.0);
    }

    #[test]
    fn test_overlapping_ranges_merge() {
        let mut set = WatchedRanges::new();
        set.insert(r(20.0, 30.0));
        set.insert(r(0.0, 10.0));
        set.insert(r(8.0, 22.0));
        assert_eq!(set.as_slice(), &[r(0.0, 30.0)]);
    }

    #[test]
    fn test_bridging_range_swallows_many() {
        let mut set = WatchedRanges::new();
        set.insert(r(0.0, 1.0));
        set.insert(r(2.0, 3.0));
        set.insert(r(4.0, 5.0));
        set.insert(r(10.0, 11.0));
        assert_eq!(set.len(), 4);

        set.insert(r(0.5, 4.5));
        assert_eq!(set.as_slice(), &[r(0.0, 5.0), r(10.0, 11.0)]);
        assert_separated(&set);
    }

    #[test]
    fn test_contained_range_is_no_change() {
        let mut set = WatchedRanges::new();
        set.insert(r(0.0, 30.0));
        assert!(!set.insert(r(5.0, 10.0)));
        assert_eq!(set.total_seconds(), 30.0);
    }

    #[test]
    fn test_disjoint_ranges_stay_sorted() {
        let mut set = WatchedRanges::new();
        set.insert(r(40.0, 60.0));
        set.insert(r(0.0, 30.0));
        set.insert(r(70.0, 71.0));
        assert_eq!(set.as_slice(), &[r(0.0, 30.0), r(40.0, 60.0), r(70.0, 71.0)]);
        assert_eq!(set.total_seconds(), 51.0);
    }

    #[test]
    fn test_from_ranges_normalizes_untrusted_input() {
        let raw = vec![
            WatchedRange { start: 40.0, end: 60.0 },
            WatchedRange { start: 50.0, end: 20.0 },
            WatchedRange { start: 0.0, end: 30.0 },
            WatchedRange { start: 25.0, end: 35.0 },
        ];
        let set = WatchedRanges::from_ranges(raw);
        assert_eq!(set.as_slice(), &[r(0.0, 35.0), r(40.0, 60.0)]);
    }

    #[test]
    fn test_deserialize_merges() {
        let json = r#"[{"start":0,"end":10},{"start":5,"end":15}]"#;
        let set: WatchedRanges = serde_json::from_str(json).unwrap();
        assert_eq!(set.as_slice(), &[r(0.0, 15.0)]);
    }

    #[test]
    fn test_clamped() {
        assert_eq!(r(90.0, 120.0).clamped(100.0), Some(r(90.0, 100.0)));
        assert_eq!(r(110.0, 120.0).clamped(100.0), None);
    }

    #[test]
    fn test_watched_percentage() {
        assert_eq!(watched_percentage(50.0, 100.0), 50);
        assert_eq!(watched_percentage(79.6, 100.0), 80);
        assert_eq!(watched_percentage(150.0, 100.0), 100);
        assert_eq!(watched_percentage(50.0, 0.0), 0);
        assert_eq!(watched_percentage(50.0, -5.0), 0);
        assert_eq!(watched_percentage(50.0, f64::NAN), 0);
    }
}
