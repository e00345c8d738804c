//! Consensus call formatting
//!
//! Writes calls as BEDPE-style TSV: one line per call with both loci, the
//! inferred SV type, the distinct-read support, and the aggregate quality
//! minimums. The engine itself never serializes anything; this is the output
//! collaborator.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use crate::cluster::ConsensusCall;
use crate::segment::ChromIndex;

pub fn write_calls(
    calls: &[ConsensusCall],
    chroms: &ChromIndex,
    output_path: Option<&str>,
) -> io::Result<()> {
    let mut writer: Box<dyn Write> = match output_path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    writeln!(
        writer,
        "#chrom1\tstart1\tend1\tchrom2\tstart2\tend2\ttype\tsupport\tmin_identity\tmin_mapq"
    )?;
    for call in calls {
        let chrom1 = chrom_name(chroms, call.loci.chrom1)?;
        let chrom2 = chrom_name(chroms, call.loci.chrom2)?;
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.2}\t{:.2}",
            chrom1,
            call.loci.pos1,
            call.loci.pos1 + 1,
            chrom2,
            call.loci.pos2,
            call.loci.pos2 + 1,
            call.sv_type,
            call.support,
            call.min_identity,
            call.min_mapq,
        )?;
    }
    writer.flush()
}

fn chrom_name(chroms: &ChromIndex, id: u32) -> io::Result<&str> {
    chroms.get_name(id).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("chromosome id {id} missing from index"),
        )
    })
}
