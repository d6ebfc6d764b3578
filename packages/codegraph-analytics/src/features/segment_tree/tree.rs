//! Iterative array-backed segment tree with lazy range-add.
//!
//! # Layout
//!
//! Values are padded to the next power of two `n`; internal nodes sit in
//! `[1, n)`, leaves in `[n, 2n)`, and node x covers `2^(height - depth(x))`
//! leaves. The iterative layout is deliberate: the pointer-free array walk
//! is what keeps per-call cost down on the hot path, where every path
//! operation issues O(log V) of these calls.
//!
//! ```text
//! index:   1           combine of the whole array
//!          2     3     halves
//!          4 5   6 7   quarters
//!          8..15       leaves (n = 8)
//! ```
//!
//! # Lazy deltas
//!
//! Pending range-add deltas sit in `lazy` (internal nodes only). A node's
//! own `tree[x]` already includes its pending delta, so interior reads are
//! self-consistent; only the ancestors on a query's two boundary paths must
//! be pushed first. That push mutates the arrays, which is why queries need
//! exclusive access just like updates.
//!
//! # Complexity
//!
//! | operation | cost |
//! |---|---|
//! | `build` | O(N) |
//! | `query` / `update` / `range_update` | O(log N) |
//! | `get_value` | O(log N) |

use super::agg::AggFunc;
use crate::shared::constants::MAX_SEGMENT_TREE_SIZE;
use crate::shared::models::{GraphError, Result};

pub struct SegmentTree {
    /// Logical size (one slot per decomposition position)
    size: usize,
    /// Padded power-of-two capacity
    n: usize,
    height: u32,
    tree: Vec<i64>,
    lazy: Vec<i64>,
    agg: AggFunc,
    /// Monotonic mutation counter; external caches key on it
    version: u64,
}

impl SegmentTree {
    /// Build in O(N) from a value array aligned with decomposition positions.
    pub fn build(values: &[i64], agg: AggFunc) -> Result<Self> {
        if values.is_empty() {
            return Err(GraphError::EmptyArray);
        }
        if values.len() > MAX_SEGMENT_TREE_SIZE {
            return Err(GraphError::ArrayTooLarge(values.len()));
        }

        let size = values.len();
        let n = size.next_power_of_two();
        let mut tree = vec![agg.identity(); 2 * n];
        tree[n..n + size].copy_from_slice(values);
        for i in (1..n).rev() {
            tree[i] = agg.combine(tree[2 * i], tree[2 * i + 1]);
        }

        Ok(Self {
            size,
            n,
            height: n.trailing_zeros(),
            tree,
            lazy: vec![0; n],
            agg,
            version: 0,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn agg(&self) -> AggFunc {
        self.agg
    }

    /// Mutation counter: any observer that reads a value after observing
    /// version V sees the effects of every update up to V.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    fn check_range(&self, l: usize, r: usize) -> Result<()> {
        if l > r || r >= self.size {
            return Err(GraphError::InvalidRange {
                l,
                r,
                size: self.size,
            });
        }
        Ok(())
    }

    // ── Lazy plumbing ────────────────────────────────────────────────────

    /// Add `delta` to node `x` covering `k` leaves; defer to children via
    /// `lazy` when x is internal.
    #[inline]
    fn apply(&mut self, x: usize, delta: i64, k: usize) {
        self.tree[x] = self.tree[x].saturating_add(delta.saturating_mul(k as i64));
        if x < self.n {
            self.lazy[x] = self.lazy[x].saturating_add(delta);
        }
    }

    /// Push pending deltas down the root-to-leaf path of `leaf`.
    fn push_path(&mut self, leaf: usize) {
        for s in (1..=self.height).rev() {
            let x = leaf >> s;
            if self.lazy[x] != 0 {
                let delta = self.lazy[x];
                let child_k = 1usize << (s - 1);
                self.apply(2 * x, delta, child_k);
                self.apply(2 * x + 1, delta, child_k);
                self.lazy[x] = 0;
            }
        }
    }

    /// Recompute ancestors of `leaf`, re-applying each ancestor's own
    /// pending delta on top of the children's combination.
    fn pull_path(&mut self, leaf: usize) {
        let mut x = leaf >> 1;
        let mut k = 2usize;
        while x >= 1 {
            let combined = self.agg.combine(self.tree[2 * x], self.tree[2 * x + 1]);
            self.tree[x] = if self.lazy[x] != 0 {
                combined.saturating_add(self.lazy[x].saturating_mul(k as i64))
            } else {
                combined
            };
            x >>= 1;
            k <<= 1;
        }
    }

    // ── Operations ───────────────────────────────────────────────────────

    /// Range aggregate over `[l, r]` inclusive. Pushes lazy state down the
    /// boundary paths first, so this takes `&mut self`.
    pub fn query(&mut self, l: usize, r: usize) -> Result<i64> {
        self.check_range(l, r)?;
        let (mut ll, mut rr) = (l + self.n, r + self.n + 1);
        self.push_path(ll);
        self.push_path(rr - 1);

        let mut left = self.agg.identity();
        let mut right = self.agg.identity();
        while ll < rr {
            if ll & 1 == 1 {
                left = self.agg.combine(left, self.tree[ll]);
                ll += 1;
            }
            if rr & 1 == 1 {
                rr -= 1;
                right = self.agg.combine(self.tree[rr], right);
            }
            ll >>= 1;
            rr >>= 1;
        }
        Ok(self.agg.combine(left, right))
    }

    /// Single-point read
    pub fn get_value(&mut self, i: usize) -> Result<i64> {
        self.query(i, i)
    }

    /// Point assignment: clears pending deltas on the path, sets the leaf,
    /// walks back up combining.
    pub fn update(&mut self, i: usize, value: i64) -> Result<()> {
        self.check_range(i, i)?;
        let leaf = i + self.n;
        self.push_path(leaf);
        self.tree[leaf] = value;
        self.pull_path(leaf);
        self.version += 1;
        Ok(())
    }

    /// Add `delta` to every slot in `[l, r]` inclusive. SUM only: under MIN,
    /// MAX, or GCD a deferred uniform delta cannot be folded into interior
    /// aggregates, so the call is rejected with no state change.
    pub fn range_update(&mut self, l: usize, r: usize, delta: i64) -> Result<()> {
        if self.agg != AggFunc::Sum {
            return Err(GraphError::RangeUpdateNotSupported(self.agg.as_str()));
        }
        self.check_range(l, r)?;

        let (first, last) = (l + self.n, r + self.n);
        let (mut ll, mut rr) = (first, last + 1);
        let mut k = 1usize;
        while ll < rr {
            if ll & 1 == 1 {
                self.apply(ll, delta, k);
                ll += 1;
            }
            if rr & 1 == 1 {
                rr -= 1;
                self.apply(rr, delta, k);
            }
            ll >>= 1;
            rr >>= 1;
            k <<= 1;
        }
        self.pull_path(first);
        self.pull_path(last);
        self.version += 1;
        Ok(())
    }

    /// Materialize the logical array (test and debugging aid)
    pub fn snapshot(&mut self) -> Vec<i64> {
        (0..self.size)
            .map(|i| self.get_value(i).expect("index in range"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rejects_empty() {
        assert!(matches!(
            SegmentTree::build(&[], AggFunc::Sum),
            Err(GraphError::EmptyArray)
        ));
    }

    #[test]
    fn test_build_non_power_of_two() {
        let mut t = SegmentTree::build(&[3, 1, 4, 1, 5], AggFunc::Sum).unwrap();
        assert_eq!(t.size(), 5);
        assert_eq!(t.query(0, 4).unwrap(), 14);
        assert_eq!(t.query(2, 2).unwrap(), 4);
    }

    #[test]
    fn test_min_max_gcd_queries() {
        let values = [12, 18, -6, 30];

        let mut min = SegmentTree::build(&values, AggFunc::Min).unwrap();
        assert_eq!(min.query(0, 3).unwrap(), -6);
        assert_eq!(min.query(0, 1).unwrap(), 12);

        let mut max = SegmentTree::build(&values, AggFunc::Max).unwrap();
        assert_eq!(max.query(0, 3).unwrap(), 30);
        assert_eq!(max.query(1, 2).unwrap(), 18);

        let mut gcd = SegmentTree::build(&values, AggFunc::Gcd).unwrap();
        assert_eq!(gcd.query(0, 3).unwrap(), 6);
        assert_eq!(gcd.query(0, 1).unwrap(), 6);
        assert_eq!(gcd.query(3, 3).unwrap(), 30);
    }

    #[test]
    fn test_point_update() {
        let mut t = SegmentTree::build(&[1, 2, 3, 4], AggFunc::Sum).unwrap();
        t.update(2, 10).unwrap();
        assert_eq!(t.query(0, 3).unwrap(), 17);
        assert_eq!(t.get_value(2).unwrap(), 10);
    }

    #[test]
    fn test_range_update_then_query() {
        let mut t = SegmentTree::build(&[0; 8], AggFunc::Sum).unwrap();
        t.range_update(2, 5, 7).unwrap();
        assert_eq!(t.query(0, 7).unwrap(), 28);
        assert_eq!(t.query(2, 2).unwrap(), 7);
        assert_eq!(t.query(0, 1).unwrap(), 0);
        assert_eq!(t.query(5, 6).unwrap(), 7);
    }

    #[test]
    fn test_overlapping_range_updates() {
        let mut t = SegmentTree::build(&[1, 1, 1, 1, 1], AggFunc::Sum).unwrap();
        t.range_update(0, 4, 2).unwrap();
        t.range_update(1, 3, -1).unwrap();
        assert_eq!(t.snapshot(), vec![3, 2, 2, 2, 3]);
        assert_eq!(t.query(0, 4).unwrap(), 12);
    }

    #[test]
    fn test_point_update_after_range_update() {
        let mut t = SegmentTree::build(&[0; 4], AggFunc::Sum).unwrap();
        t.range_update(0, 3, 5).unwrap();
        t.update(1, 100).unwrap();
        assert_eq!(t.snapshot(), vec![5, 100, 5, 5]);
        assert_eq!(t.query(0, 3).unwrap(), 115);
    }

    #[test]
    fn test_range_update_rejected_for_non_sum() {
        for agg in [AggFunc::Min, AggFunc::Max, AggFunc::Gcd] {
            let mut t = SegmentTree::build(&[5, 3, 9], agg).unwrap();
            let before = t.version();
            assert!(matches!(
                t.range_update(0, 2, 1),
                Err(GraphError::RangeUpdateNotSupported(_))
            ));
            assert_eq!(t.version(), before, "no version bump on rejection");
            assert_eq!(t.query(0, 2).unwrap(), agg.combine(agg.combine(5, 3), 9));
        }
    }

    #[test]
    fn test_invalid_ranges() {
        let mut t = SegmentTree::build(&[1, 2, 3], AggFunc::Sum).unwrap();
        assert!(matches!(
            t.query(2, 1),
            Err(GraphError::InvalidRange { .. })
        ));
        assert!(matches!(
            t.query(0, 3),
            Err(GraphError::InvalidRange { .. })
        ));
        assert!(matches!(
            t.update(3, 1),
            Err(GraphError::InvalidRange { .. })
        ));
        assert!(matches!(
            t.range_update(1, 3, 1),
            Err(GraphError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_version_monotonic() {
        let mut t = SegmentTree::build(&[0; 4], AggFunc::Sum).unwrap();
        assert_eq!(t.version(), 0);
        t.update(0, 1).unwrap();
        assert_eq!(t.version(), 1);
        t.range_update(0, 3, 1).unwrap();
        assert_eq!(t.version(), 2);
        t.query(0, 3).unwrap();
        assert_eq!(t.version(), 2, "queries do not advance the version");
    }

    #[test]
    fn test_sum_saturates_instead_of_wrapping() {
        let mut t = SegmentTree::build(&[i64::MAX - 1, 5], AggFunc::Sum).unwrap();
        assert_eq!(t.query(0, 1).unwrap(), i64::MAX);
        t.range_update(0, 0, 10).unwrap();
        assert_eq!(t.get_value(0).unwrap(), i64::MAX);
    }

    #[test]
    fn test_single_slot_tree() {
        let mut t = SegmentTree::build(&[42], AggFunc::Sum).unwrap();
        assert_eq!(t.query(0, 0).unwrap(), 42);
        t.range_update(0, 0, -2).unwrap();
        assert_eq!(t.get_value(0).unwrap(), 40);
        t.update(0, 7).unwrap();
        assert_eq!(t.get_value(0).unwrap(), 7);
    }

    #[test]
    fn test_matches_naive_reference() {
        // deterministic pseudo-random walk compared against a plain vector
        let mut values: Vec<i64> = (0..37).map(|i| (i * 31 % 17) - 8).collect();
        let mut t = SegmentTree::build(&values, AggFunc::Sum).unwrap();

        let mut state = 0x9e37u64;
        let mut next = |m: usize| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) as usize % m
        };

        for _ in 0..200 {
            let a = next(values.len());
            let b = next(values.len());
            let (l, r) = if a <= b { (a, b) } else { (b, a) };
            match next(3) {
                0 => {
                    let delta = next(21) as i64 - 10;
                    t.range_update(l, r, delta).unwrap();
                    for v in &mut values[l..=r] {
                        *v += delta;
                    }
                }
                1 => {
                    let value = next(100) as i64 - 50;
                    t.update(l, value).unwrap();
                    values[l] = value;
                }
                _ => {
                    let expected: i64 = values[l..=r].iter().sum();
                    assert_eq!(t.query(l, r).unwrap(), expected);
                }
            }
        }
        let expected: i64 = values.iter().sum();
        assert_eq!(t.query(0, values.len() - 1).unwrap(), expected);
    }
}
