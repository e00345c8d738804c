//! Dual-locus spatial index
//!
//! A breakpoint spans two genomic loci, so candidates are bucketed on a
//! coarse 2-D grid per ordered chromosome pair: one bin axis per endpoint,
//! bin width = the configured maximum window size. Distance-bounded lookups
//! touch the target bin plus its neighbors within `ceil(d / bin_width)` in
//! each dimension, then filter on exact endpoint distance. This keeps each
//! query to a handful of buckets instead of an all-pairs scan over millions
//! of candidates.

use rustc_hash::FxHashMap;

use crate::breakpoint::Loci;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BinKey {
    chrom1: u32,
    chrom2: u32,
    bin1: i64,
    bin2: i64,
}

pub struct DualLocusGrid {
    bin_width: i64,
    bins: FxHashMap<BinKey, Vec<(u32, Loci)>>,
    len: usize,
}

impl DualLocusGrid {
    /// Panics if `bin_width` is not positive.
    pub fn new(bin_width: i64) -> Self {
        assert!(bin_width > 0, "bin width must be positive");
        DualLocusGrid {
            bin_width,
            bins: FxHashMap::default(),
            len: 0,
        }
    }

    fn key_for(&self, loci: &Loci) -> BinKey {
        BinKey {
            chrom1: loci.chrom1,
            chrom2: loci.chrom2,
            bin1: loci.pos1.div_euclid(self.bin_width),
            bin2: loci.pos2.div_euclid(self.bin_width),
        }
    }

    /// O(1) amortized append of a breakpoint (by caller-assigned index) under
    /// its canonical loci.
    pub fn insert(&mut self, index: u32, loci: Loci) {
        let key = self.key_for(&loci);
        self.bins.entry(key).or_default().push((index, loci));
        self.len += 1;
    }

    /// Indices of all stored breakpoints whose endpoints are both within `d`
    /// of `loci`, on the same chromosome pair. Neighboring bins are expanded
    /// so matches straddling a bin boundary are not missed.
    pub fn query(&self, loci: &Loci, d: i64) -> Vec<u32> {
        let center = self.key_for(loci);
        let reach = (d + self.bin_width - 1) / self.bin_width;

        let mut hits = Vec::new();
        for bin1 in (center.bin1 - reach)..=(center.bin1 + reach) {
            for bin2 in (center.bin2 - reach)..=(center.bin2 + reach) {
                let key = BinKey {
                    chrom1: center.chrom1,
                    chrom2: center.chrom2,
                    bin1,
                    bin2,
                };
                if let Some(bucket) = self.bins.get(&key) {
                    for (index, stored) in bucket {
                        if stored.within(loci, d) {
                            hits.push(*index);
                        }
                    }
                }
            }
        }
        hits
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_query_same_bin() {
        let mut grid = DualLocusGrid::new(1000);
        grid.insert(0, Loci::new(0, 1000, 0, 5000));
        grid.insert(1, Loci::new(0, 1004, 0, 4996));

        let mut hits = grid.query(&Loci::new(0, 1002, 0, 4998), 10);
        hits.sort();
        assert_eq!(hits, vec![0, 1]);
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_query_across_bin_boundary() {
        let mut grid = DualLocusGrid::new(1000);
        // 999 and 1001 land in different bins on the first axis.
        grid.insert(0, Loci::new(0, 999, 0, 5000));
        let hits = grid.query(&Loci::new(0, 1001, 0, 5000), 10);
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn test_exact_distance_filter() {
        let mut grid = DualLocusGrid::new(1000);
        grid.insert(0, Loci::new(0, 1000, 0, 5000));
        // Same bin, but the second endpoint is 50 bp away.
        assert!(grid.query(&Loci::new(0, 1000, 0, 5050), 10).is_empty());
        // Boundary inclusive.
        assert_eq!(grid.query(&Loci::new(0, 1000, 0, 5010), 10), vec![0]);
    }

    #[test]
    fn test_chromosome_pairs_are_separate() {
        let mut grid = DualLocusGrid::new(1000);
        grid.insert(0, Loci::new(0, 1000, 0, 5000));
        grid.insert(1, Loci::new(0, 1000, 1, 5000));
        assert_eq!(grid.query(&Loci::new(0, 1000, 1, 5000), 10), vec![1]);
    }

    #[test]
    fn test_distance_wider_than_bin() {
        let mut grid = DualLocusGrid::new(10);
        grid.insert(0, Loci::new(0, 100, 0, 500));
        // d=25 spans three bins of width 10 in each direction.
        assert_eq!(grid.query(&Loci::new(0, 124, 0, 478), 25), vec![0]);
        assert!(grid.query(&Loci::new(0, 126, 0, 478), 25).is_empty());
    }
}
