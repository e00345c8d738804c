//! BAM ingestion
//!
//! Turns split alignments into per-read ordered segment sequences. Each
//! primary record carries its supplementary alignments in the `SA` aux tag
//! (rname, pos, strand, CIGAR, mapq, NM per entry), so one pass over primary
//! records reconstructs every split read. Segments are ordered by where they
//! start along the forward-strand read, recovered from CIGAR clipping.
//!
//! Malformed per-read input is absorbed with a warning and a skip; only
//! file-level problems surface as errors.

use log::{debug, warn};
use rust_htslib::bam::record::{Aux, Cigar, CigarString};
use rust_htslib::bam::{self, Read as BamRead};

use crate::segment::{ChromIndex, Read, Segment, SegmentStore, Strand};

#[derive(Debug)]
pub enum BamError {
    Open(String),
    Record(String),
    Header(String),
}

impl std::fmt::Display for BamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BamError::Open(msg) => write!(f, "Failed to open BAM file: {msg}"),
            BamError::Record(msg) => write!(f, "Failed to read BAM record: {msg}"),
            BamError::Header(msg) => write!(f, "Invalid BAM header: {msg}"),
        }
    }
}

impl std::error::Error for BamError {}

/// Everything parsed from one alignment file.
pub struct ParsedBatch {
    pub store: SegmentStore,
    pub reads: Vec<Read>,
    pub chroms: ChromIndex,
}

struct RawSegment {
    chrom: u32,
    pos: i64,
    strand: Strand,
    cigar: Vec<Cigar>,
    mapq: u8,
    nm: Option<i64>,
}

/// Parses split reads from a BAM file: every primary record with an `SA` tag
/// becomes one [`Read`] whose segments are the primary alignment plus all
/// supplementary entries, ordered along the read.
pub fn reads_from_bam(path: &str) -> Result<ParsedBatch, BamError> {
    let mut reader = bam::Reader::from_path(path).map_err(|e| BamError::Open(e.to_string()))?;

    let mut chroms = ChromIndex::new();
    for name in reader.header().target_names() {
        let name =
            std::str::from_utf8(name).map_err(|e| BamError::Header(e.to_string()))?;
        chroms.get_or_insert_id(name);
    }

    let mut store = SegmentStore::new();
    let mut reads = Vec::new();
    let mut record = bam::Record::new();
    while let Some(result) = reader.read(&mut record) {
        result.map_err(|e| BamError::Record(e.to_string()))?;
        if record.is_unmapped() || record.is_secondary() || record.is_supplementary() {
            continue;
        }
        let sa_value = match string_aux_tag(&record, b"SA") {
            Some(value) => value,
            None => continue, // not a split read
        };
        let name = match std::str::from_utf8(record.qname()) {
            Ok(name) => name.to_owned(),
            Err(_) => {
                warn!("Skipping record with non-UTF-8 read name");
                continue;
            }
        };

        let mut raw = vec![RawSegment {
            chrom: record.tid() as u32,
            pos: record.pos(),
            strand: if record.is_reverse() {
                Strand::Reverse
            } else {
                Strand::Forward
            },
            cigar: record.cigar().iter().copied().collect(),
            mapq: record.mapq(),
            nm: int_aux_tag(&record, b"NM"),
        }];
        match parse_sa_aux_val(&sa_value, &chroms) {
            Ok(segments) => raw.extend(segments),
            Err(msg) => {
                warn!("Skipping read '{name}': {msg}");
                continue;
            }
        }

        // Alignment order along the read, from forward-strand clip offsets.
        raw.sort_by_key(|seg| fwd_read_start(&seg.cigar, seg.strand));

        let read_id = reads.len() as u32;
        let segments = raw
            .into_iter()
            .enumerate()
            .map(|(order, seg)| {
                store.push(Segment {
                    chrom: seg.chrom,
                    start: seg.pos,
                    end: seg.pos + reference_span(&seg.cigar),
                    strand: seg.strand,
                    identity: percent_identity(&seg.cigar, seg.nm),
                    mapq: seg.mapq as f64,
                    read_id,
                    order: order as u32,
                })
            })
            .collect();
        reads.push(Read {
            id: read_id,
            name,
            segments,
        });
    }

    debug!(
        "Parsed {} split reads ({} segments) from '{}'",
        reads.len(),
        store.len(),
        path
    );
    Ok(ParsedBatch {
        store,
        reads,
        chroms,
    })
}

fn parse_sa_aux_val(value: &str, chroms: &ChromIndex) -> Result<Vec<RawSegment>, String> {
    value
        .split_terminator(';')
        .map(|entry| parse_sa_segment(entry, chroms))
        .collect()
}

fn parse_sa_segment(entry: &str, chroms: &ChromIndex) -> Result<RawSegment, String> {
    let fields: Vec<&str> = entry.split_terminator(',').collect();
    if fields.len() != 6 {
        return Err(format!("unexpected SA tag segment '{entry}'"));
    }
    let chrom = chroms
        .get_id(fields[0])
        .ok_or_else(|| format!("SA tag references unknown chromosome '{}'", fields[0]))?;
    let pos = fields[1]
        .parse::<i64>()
        .map_err(|e| format!("invalid SA position '{}': {e}", fields[1]))?
        - 1;
    let strand = match fields[2] {
        "+" => Strand::Forward,
        "-" => Strand::Reverse,
        other => return Err(format!("invalid SA strand '{other}'")),
    };
    let cigar = CigarString::try_from(fields[3].as_bytes())
        .map_err(|e| format!("invalid SA CIGAR '{}': {e}", fields[3]))?;
    let mapq = fields[4]
        .parse::<u8>()
        .map_err(|e| format!("invalid SA mapq '{}': {e}", fields[4]))?;
    let nm = fields[5].parse::<i64>().ok();
    Ok(RawSegment {
        chrom,
        pos,
        strand,
        cigar: cigar.0,
        mapq,
        nm,
    })
}

/// Offset of the first aligned base in forward-strand read coordinates.
/// Leading clips give the offset directly for a forward alignment; a reverse
/// alignment starts at `read_len - trailing_clipped_end`.
fn fwd_read_start(cigar: &[Cigar], strand: Strand) -> usize {
    let (read_start, read_end, read_len) = clip_positions(cigar);
    match strand {
        Strand::Forward => read_start,
        Strand::Reverse => read_len - read_end,
    }
}

/// (first position after left clipping, first position of right clipping,
/// full read length), all in pre-hard-clip read coordinates.
fn clip_positions(cigar: &[Cigar]) -> (usize, usize, usize) {
    let mut read_pos = 0;
    let mut left_clip = 0;
    let mut right_clip = 0;
    let mut leading = true;
    for op in cigar {
        match op {
            Cigar::HardClip(len) | Cigar::SoftClip(len) => {
                if leading {
                    left_clip += *len as usize;
                } else {
                    right_clip += *len as usize;
                }
            }
            _ => leading = false,
        }
        match op {
            Cigar::HardClip(len)
            | Cigar::SoftClip(len)
            | Cigar::Ins(len)
            | Cigar::Match(len)
            | Cigar::Equal(len)
            | Cigar::Diff(len) => read_pos += *len as usize,
            _ => {}
        }
    }
    (left_clip, read_pos - right_clip, read_pos)
}

/// Number of reference bases the alignment covers.
fn reference_span(cigar: &[Cigar]) -> i64 {
    cigar
        .iter()
        .map(|op| match op {
            Cigar::Match(len)
            | Cigar::Equal(len)
            | Cigar::Diff(len)
            | Cigar::Del(len)
            | Cigar::RefSkip(len) => *len as i64,
            _ => 0,
        })
        .sum()
}

/// Percent identity from the NM edit distance over the aligned columns.
/// Records without an NM tag are taken at face value.
fn percent_identity(cigar: &[Cigar], nm: Option<i64>) -> f64 {
    let nm = match nm {
        Some(nm) => nm as f64,
        None => return 100.0,
    };
    let columns: i64 = cigar
        .iter()
        .map(|op| match op {
            Cigar::Match(len)
            | Cigar::Equal(len)
            | Cigar::Diff(len)
            | Cigar::Ins(len)
            | Cigar::Del(len) => *len as i64,
            _ => 0,
        })
        .sum();
    if columns == 0 {
        return 0.0;
    }
    100.0 * (1.0 - nm / columns as f64)
}

fn string_aux_tag(record: &bam::Record, tag: &[u8]) -> Option<String> {
    match record.aux(tag) {
        Ok(Aux::String(value)) => Some(value.to_string()),
        _ => None,
    }
}

fn int_aux_tag(record: &bam::Record, tag: &[u8]) -> Option<i64> {
    match record.aux(tag) {
        Ok(Aux::U32(v)) => Some(v as i64),
        Ok(Aux::I32(v)) => Some(v as i64),
        Ok(Aux::U16(v)) => Some(v as i64),
        Ok(Aux::I16(v)) => Some(v as i64),
        Ok(Aux::U8(v)) => Some(v as i64),
        Ok(Aux::I8(v)) => Some(v as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chroms() -> ChromIndex {
        let mut idx = ChromIndex::new();
        idx.get_or_insert_id("chr1");
        idx.get_or_insert_id("chr2");
        idx.get_or_insert_id("chr3");
        idx.get_or_insert_id("chr4");
        idx
    }

    #[test]
    fn test_parse_sa_aux_val() {
        let value = "chr3,10001,+,5535S10=1D39=11438S,60,2;\
                     chr4,20001,-,23=1I226=7362S,22,4;";
        let segments = parse_sa_aux_val(value, &chroms()).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].pos, 10_000);
        assert_eq!(segments[0].strand, Strand::Forward);
        assert_eq!(segments[1].strand, Strand::Reverse);
        assert_eq!(segments[1].mapq, 22);
        assert_eq!(segments[1].nm, Some(4));
    }

    #[test]
    fn test_parse_sa_rejects_malformed_entries() {
        let idx = chroms();
        assert!(parse_sa_aux_val("chr1,100,+,50M,60", &idx).is_err());
        assert!(parse_sa_aux_val("chrUn,100,+,50M,60,0;", &idx).is_err());
        assert!(parse_sa_aux_val("chr1,100,*,50M,60,0;", &idx).is_err());
    }

    #[test]
    fn test_fwd_read_start_ordering() {
        // Read of length 100: 30M70S maps the first 30 bases, 70S30M the last.
        let head = CigarString::try_from(&b"30M70S"[..]).unwrap().0;
        let tail = CigarString::try_from(&b"70S30M"[..]).unwrap().0;
        assert_eq!(fwd_read_start(&head, Strand::Forward), 0);
        assert_eq!(fwd_read_start(&tail, Strand::Forward), 70);
        // The same tail piece aligned reverse-strand sits at the read's start.
        assert_eq!(fwd_read_start(&tail, Strand::Reverse), 0);
    }

    #[test]
    fn test_reference_span() {
        let cigar = CigarString::try_from(&b"10S40M5D20M3I10M"[..]).unwrap().0;
        assert_eq!(reference_span(&cigar), 75);
    }

    #[test]
    fn test_percent_identity() {
        let cigar = CigarString::try_from(&b"100M"[..]).unwrap().0;
        assert_eq!(percent_identity(&cigar, Some(5)), 95.0);
        assert_eq!(percent_identity(&cigar, None), 100.0);
    }
}
