//! Address coverage: a sorted set of non-overlapping half-open intervals.

/// A set of addresses, kept as sorted, coalesced `[begin, end)` ranges.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Coverage {
    ranges: Vec<(u64, u64)>,
}

impl Coverage {
    pub fn new() -> Self {
        Coverage::default()
    }

    pub fn of(begin: u64, end: u64) -> Self {
        let mut cov = Coverage::new();
        cov.add(begin, end);
        cov
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of covered addresses.
    pub fn length(&self) -> u64 {
        self.ranges.iter().map(|(b, e)| e - b).sum()
    }

    pub fn ranges(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.ranges.iter().copied()
    }

    /// Lowest covered address, if any.
    pub fn low(&self) -> Option<u64> {
        self.ranges.first().map(|&(b, _)| b)
    }

    /// One past the highest covered address, if any.
    pub fn high(&self) -> Option<u64> {
        self.ranges.last().map(|&(_, e)| e)
    }

    /// Adds `[begin, end)`, coalescing with adjacent and overlapping
    /// ranges. Empty ranges are ignored.
    pub fn add(&mut self, begin: u64, end: u64) {
        if begin >= end {
            return;
        }

        let mut begin = begin;
        let mut end = end;

        // All ranges that touch [begin, end) get folded into it.
        let mut i = 0;
        while i < self.ranges.len() {
            let (b, e) = self.ranges[i];
            if e < begin {
                i += 1;
                continue;
            }
            if b > end {
                break;
            }
            begin = begin.min(b);
            end = end.max(e);
            self.ranges.remove(i);
        }

        // Everything before `i` now ends below `begin`; everything at `i`
        // and later starts above `end`.
        self.ranges.insert(i, (begin, end));
    }

    pub fn add_all(&mut self, other: &Coverage) {
        for (b, e) in other.ranges() {
            self.add(b, e);
        }
    }

    /// Removes `[begin, end)` from the set.
    pub fn remove(&mut self, begin: u64, end: u64) {
        if begin >= end {
            return;
        }

        let mut result = Vec::with_capacity(self.ranges.len() + 1);
        for &(b, e) in &self.ranges {
            if e <= begin || b >= end {
                result.push((b, e));
                continue;
            }
            if b < begin {
                result.push((b, begin));
            }
            if e > end {
                result.push((end, e));
            }
        }
        self.ranges = result;
    }

    pub fn remove_all(&mut self, other: &Coverage) {
        for (b, e) in other.ranges() {
            self.remove(b, e);
        }
    }

    pub fn contains_point(&self, addr: u64) -> bool {
        self.ranges.iter().any(|&(b, e)| b <= addr && addr < e)
    }

    pub fn contains_range(&self, begin: u64, end: u64) -> bool {
        begin >= end || self.ranges.iter().any(|&(b, e)| b <= begin && end <= e)
    }

    pub fn contains_all(&self, other: &Coverage) -> bool {
        other.ranges().all(|(b, e)| self.contains_range(b, e))
    }

    pub fn overlaps(&self, other: &Coverage) -> bool {
        self.ranges()
            .any(|(b, e)| other.ranges().any(|(ob, oe)| b < oe && ob < e))
    }

    /// The set of addresses covered by both.
    pub fn intersect(&self, other: &Coverage) -> Coverage {
        let mut out = Coverage::new();
        for (b, e) in self.ranges() {
            for (ob, oe) in other.ranges() {
                let begin = b.max(ob);
                let end = e.min(oe);
                if begin < end {
                    out.add(begin, end);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_coalesces() {
        let mut cov = Coverage::new();
        cov.add(10, 20);
        cov.add(30, 40);
        assert_eq!(cov.ranges().collect::<Vec<_>>(), [(10, 20), (30, 40)]);

        // Bridging range folds everything into one.
        cov.add(15, 35);
        assert_eq!(cov.ranges().collect::<Vec<_>>(), [(10, 40)]);

        // Adjacent ranges coalesce.
        cov.add(40, 50);
        assert_eq!(cov.ranges().collect::<Vec<_>>(), [(10, 50)]);

        // Empty ranges are no-ops.
        cov.add(60, 60);
        assert_eq!(cov.ranges().collect::<Vec<_>>(), [(10, 50)]);
    }

    #[test]
    fn add_keeps_order() {
        let mut cov = Coverage::new();
        cov.add(30, 40);
        cov.add(10, 20);
        cov.add(50, 60);
        assert_eq!(
            cov.ranges().collect::<Vec<_>>(),
            [(10, 20), (30, 40), (50, 60)]
        );
    }

    #[test]
    fn remove_splits() {
        let mut cov = Coverage::of(10, 50);
        cov.remove(20, 30);
        assert_eq!(cov.ranges().collect::<Vec<_>>(), [(10, 20), (30, 50)]);

        cov.remove(0, 15);
        assert_eq!(cov.ranges().collect::<Vec<_>>(), [(15, 20), (30, 50)]);

        cov.remove(0, 100);
        assert!(cov.is_empty());
    }

    #[test]
    fn queries() {
        let mut cov = Coverage::new();
        cov.add(10, 20);
        cov.add(30, 40);

        assert!(cov.contains_point(10));
        assert!(!cov.contains_point(20));
        assert!(cov.contains_range(12, 18));
        assert!(!cov.contains_range(18, 32));

        assert_eq!(cov.length(), 20);
        assert_eq!(cov.low(), Some(10));
        assert_eq!(cov.high(), Some(40));

        let other = Coverage::of(15, 35);
        assert!(cov.overlaps(&other));
        assert_eq!(
            cov.intersect(&other).ranges().collect::<Vec<_>>(),
            [(15, 20), (30, 35)]
        );
        assert!(!cov.overlaps(&Coverage::of(20, 30)));
    }

    #[test]
    fn set_algebra() {
        let mut a = Coverage::of(0, 100);
        let b = Coverage::of(25, 75);
        a.remove_all(&b);
        assert_eq!(a.ranges().collect::<Vec<_>>(), [(0, 25), (75, 100)]);

        let mut c = a.clone();
        c.add_all(&b);
        assert_eq!(c.ranges().collect::<Vec<_>>(), [(0, 100)]);
        assert!(c.contains_all(&a));
        assert!(!a.contains_all(&c));
    }
}
