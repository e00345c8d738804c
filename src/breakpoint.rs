use std::cmp::Ordering;
use std::fmt;

use crate::segment::{Segment, SegmentId, SegmentStore, Strand};

/// Structural-variant class inferred from the strand and coordinate pattern
/// of one adjacent segment pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SvType {
    Deletion,
    Insertion,
    Duplication,
    Inversion,
    Translocation,
    /// Member breakpoints of a cluster disagree with no majority.
    Ambiguous,
}

impl fmt::Display for SvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SvType::Deletion => "DEL",
            SvType::Insertion => "INS",
            SvType::Duplication => "DUP",
            SvType::Inversion => "INV",
            SvType::Translocation => "TRA",
            SvType::Ambiguous => "AMBIGUOUS",
        };
        write!(f, "{label}")
    }
}

impl SvType {
    /// Classify an adjacent segment pair.
    ///
    /// Different chromosomes dominate, then a strand flip, then the gap sign:
    /// a positive reference gap is a deletion, an abutting or overlapping pair
    /// with the second segment landing before the first is a (tandem)
    /// duplication, the remaining overlaps imply inserted material.
    pub fn infer(first: &Segment, second: &Segment) -> SvType {
        if first.chrom != second.chrom {
            return SvType::Translocation;
        }
        if first.strand != second.strand {
            return SvType::Inversion;
        }
        let gap = second.start - first.end;
        if gap > 0 {
            SvType::Deletion
        } else if second.start < first.start {
            SvType::Duplication
        } else {
            SvType::Insertion
        }
    }
}

/// The two genomic loci of a breakpoint in canonical orientation:
/// `(chrom1, pos1) <= (chrom2, pos2)`, so the same junction observed from
/// either direction keys identically in the spatial index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Loci {
    pub chrom1: u32,
    pub pos1: i64,
    pub chrom2: u32,
    pub pos2: i64,
}

impl Loci {
    pub fn new(chrom1: u32, pos1: i64, chrom2: u32, pos2: i64) -> Self {
        if (chrom2, pos2) < (chrom1, pos1) {
            Loci {
                chrom1: chrom2,
                pos1: pos2,
                chrom2: chrom1,
                pos2: pos1,
            }
        } else {
            Loci {
                chrom1,
                pos1,
                chrom2,
                pos2,
            }
        }
    }

    /// Both endpoints within `d`, on the same chromosome pair.
    pub fn within(&self, other: &Loci, d: i64) -> bool {
        self.chrom1 == other.chrom1
            && self.chrom2 == other.chrom2
            && (self.pos1 - other.pos1).abs() <= d
            && (self.pos2 - other.pos2).abs() <= d
    }
}

// Total order: chromosome pair first, then first endpoint, then second.
impl Ord for Loci {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.chrom1, self.chrom2, self.pos1, self.pos2).cmp(&(
            other.chrom1,
            other.chrom2,
            other.pos1,
            other.pos2,
        ))
    }
}

impl PartialOrd for Loci {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A candidate breakpoint between two segments adjacent in read order.
///
/// Holds segment ids, not segments: dropping a `Breakpoint` leaves the store
/// untouched. The owning lifecycle goes through [`Breakpoint::detach`].
#[derive(Debug, Clone)]
pub struct Breakpoint {
    pub first: SegmentId,
    pub second: SegmentId,
    pub loci: Loci,
    /// `second.start - first.end`, same-chromosome pairs only. Negative for
    /// overlapping segments (micro-homology), large for inserted material.
    pub gap: Option<i64>,
    pub read_id: u32,
    pub min_identity: f64,
    pub min_mapq: f64,
    pub sv_type: SvType,
}

impl Breakpoint {
    /// Builds the breakpoint implied by two adjacent segments of one read.
    ///
    /// The first locus is where the first segment's alignment ends in read
    /// orientation, the second where the next segment's alignment begins.
    pub fn from_pair(store: &SegmentStore, first: SegmentId, second: SegmentId) -> Breakpoint {
        let a = store.get(first);
        let b = store.get(second);
        debug_assert_eq!(a.read_id, b.read_id);

        let gap = (a.chrom == b.chrom).then(|| b.start - a.end);
        Breakpoint {
            first,
            second,
            loci: Loci::new(a.chrom, a.trailing_pos(), b.chrom, b.leading_pos()),
            gap,
            read_id: a.read_id,
            min_identity: a.identity.min(b.identity),
            min_mapq: a.mapq.min(b.mapq),
            sv_type: SvType::infer(a, b),
        }
    }

    /// Takes ownership of both segments out of the store. The counterpart of
    /// the non-owning drop: after this, the store no longer holds the pair
    /// and any later access through the old ids panics.
    pub fn detach(self, store: &mut SegmentStore) -> DetachedBreakpoint {
        let first = store.detach(self.first);
        let second = store.detach(self.second);
        DetachedBreakpoint {
            first,
            second,
            loci: self.loci,
            gap: self.gap,
            read_id: self.read_id,
            sv_type: self.sv_type,
        }
    }
}

/// A breakpoint that owns its two segments, removed from the store.
#[derive(Debug)]
pub struct DetachedBreakpoint {
    pub first: Segment,
    pub second: Segment,
    pub loci: Loci,
    pub gap: Option<i64>,
    pub read_id: u32,
    pub sv_type: SvType,
}
