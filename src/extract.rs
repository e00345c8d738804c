//! Candidate breakpoint extraction
//!
//! Scans each read's segments in alignment order and pairs up the adjacent
//! ones that pass the per-segment quality gates. Extraction is read-local and
//! runs in parallel across reads; nothing here can fail, a read that yields no
//! pairs simply produces an empty sequence.

use log::debug;
use rayon::prelude::*;

use crate::breakpoint::Breakpoint;
use crate::config::Config;
use crate::segment::{Read, SegmentId, SegmentStore};

/// Lazy single-pass iterator over one read's candidate breakpoints.
pub struct BreakpointIter<'a> {
    store: &'a SegmentStore,
    config: &'a Config,
    segments: &'a [SegmentId],
    next_pair: usize,
}

impl<'a> Iterator for BreakpointIter<'a> {
    type Item = Breakpoint;

    fn next(&mut self) -> Option<Breakpoint> {
        while self.next_pair + 1 < self.segments.len() {
            let first = self.segments[self.next_pair];
            let second = self.segments[self.next_pair + 1];
            self.next_pair += 1;

            if self.passes_quality(first) && self.passes_quality(second) {
                return Some(Breakpoint::from_pair(self.store, first, second));
            }
        }
        None
    }
}

impl BreakpointIter<'_> {
    fn passes_quality(&self, id: SegmentId) -> bool {
        let segment = self.store.get(id);
        segment.identity >= self.config.min_identity && segment.mapq >= self.config.min_map_quality
    }
}

/// Candidate breakpoints of a single read.
///
/// Single-segment reads have nothing to pair; reads at or above
/// `config.max_split` segments are treated as ambiguous mappings. Both yield
/// an empty iterator, never an error.
pub fn read_breakpoints<'a>(
    store: &'a SegmentStore,
    read: &'a Read,
    config: &'a Config,
) -> BreakpointIter<'a> {
    let n = read.segments.len();
    let segments: &[SegmentId] = if n < 2 || n >= config.max_split {
        if n >= config.max_split {
            debug!(
                "Skipping read '{}': {} segments >= max split {}",
                read.name, n, config.max_split
            );
        }
        &[]
    } else {
        &read.segments
    };
    BreakpointIter {
        store,
        config,
        segments,
        next_pair: 0,
    }
}

/// Extracts candidates from every read in parallel, concatenated in read
/// order. Segments are read-only here, so the workers share the store without
/// synchronization.
pub fn extract_all(store: &SegmentStore, reads: &[Read], config: &Config) -> Vec<Breakpoint> {
    reads
        .par_iter()
        .flat_map_iter(|read| read_breakpoints(store, read, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Segment, Strand};

    fn store_with_read(qualities: &[(f64, f64)]) -> (SegmentStore, Read) {
        let mut store = SegmentStore::new();
        let mut segments = Vec::new();
        for (i, &(identity, mapq)) in qualities.iter().enumerate() {
            let start = 1000 * (i as i64 + 1);
            segments.push(store.push(Segment {
                chrom: 0,
                start,
                end: start + 100,
                strand: Strand::Forward,
                identity,
                mapq,
                read_id: 0,
                order: i as u32,
            }));
        }
        let read = Read {
            id: 0,
            name: "read0".to_string(),
            segments,
        };
        (store, read)
    }

    #[test]
    fn test_single_segment_read_yields_nothing() {
        let (store, read) = store_with_read(&[(99.0, 60.0)]);
        let config = Config::default();
        assert_eq!(read_breakpoints(&store, &read, &config).count(), 0);
    }

    #[test]
    fn test_oversplit_read_yields_nothing() {
        let quals = vec![(99.0, 60.0); 10];
        let (store, read) = store_with_read(&quals);
        let config = Config {
            max_split: 5,
            ..Config::default()
        };
        assert_eq!(read_breakpoints(&store, &read, &config).count(), 0);
    }

    #[test]
    fn test_max_split_boundary_is_exclusive() {
        let quals = vec![(99.0, 60.0); 5];
        let (store, read) = store_with_read(&quals);
        let config = Config {
            max_split: 5,
            ..Config::default()
        };
        // Exactly max_split segments: still discarded.
        assert_eq!(read_breakpoints(&store, &read, &config).count(), 0);

        let config = Config {
            max_split: 6,
            ..Config::default()
        };
        assert_eq!(read_breakpoints(&store, &read, &config).count(), 4);
    }

    #[test]
    fn test_quality_gates_apply_to_both_segments() {
        let (store, read) = store_with_read(&[(99.0, 60.0), (70.0, 60.0), (99.0, 60.0)]);
        let config = Config {
            min_identity: 80.0,
            min_map_quality: 20.0,
            ..Config::default()
        };
        // Middle segment fails identity, so both pairs touching it are dropped.
        assert_eq!(read_breakpoints(&store, &read, &config).count(), 0);
    }

    #[test]
    fn test_emitted_breakpoints_pass_thresholds() {
        let (store, read) = store_with_read(&[
            (99.0, 60.0),
            (85.0, 30.0),
            (75.0, 60.0),
            (99.0, 10.0),
            (99.0, 60.0),
        ]);
        let config = Config {
            min_identity: 80.0,
            min_map_quality: 20.0,
            max_split: 8,
            ..Config::default()
        };
        let bps: Vec<_> = read_breakpoints(&store, &read, &config).collect();
        assert_eq!(bps.len(), 1); // only the (0,1) pair survives
        for bp in &bps {
            assert!(bp.min_identity >= config.min_identity);
            assert!(bp.min_mapq >= config.min_map_quality);
        }
    }

    #[test]
    fn test_parallel_extraction_matches_serial() {
        let mut store = SegmentStore::new();
        let mut reads = Vec::new();
        for r in 0..50u32 {
            let mut segments = Vec::new();
            for i in 0..3u32 {
                segments.push(store.push(Segment {
                    chrom: r % 3,
                    start: (r as i64) * 10_000 + (i as i64) * 2000,
                    end: (r as i64) * 10_000 + (i as i64) * 2000 + 500,
                    strand: Strand::Forward,
                    identity: 99.0,
                    mapq: 60.0,
                    read_id: r,
                    order: i,
                }));
            }
            reads.push(Read {
                id: r,
                name: format!("read{r}"),
                segments,
            });
        }
        let config = Config::default();

        let parallel = extract_all(&store, &reads, &config);
        let serial: Vec<_> = reads
            .iter()
            .flat_map(|read| read_breakpoints(&store, read, &config))
            .collect();

        assert_eq!(parallel.len(), serial.len());
        for (p, s) in parallel.iter().zip(serial.iter()) {
            assert_eq!(p.loci, s.loci);
            assert_eq!(p.read_id, s.read_id);
        }
    }
}
