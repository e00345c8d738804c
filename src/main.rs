use clap::Parser;
use log::info;
use rayon::ThreadPoolBuilder;
use splitsv::bam::reads_from_bam;
use splitsv::cluster::cluster_breakpoints;
use splitsv::config::Config;
use splitsv::extract::extract_all;
use splitsv::output::write_calls;
use std::io;
use std::num::NonZeroUsize;

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Path to the BAM file with split-read alignments.
    #[clap(short = 'f', long, value_parser)]
    bam_file: String,

    /// Number of threads for parallel processing.
    #[clap(short = 't', long, value_parser, default_value_t = NonZeroUsize::new(4).unwrap())]
    num_threads: NonZeroUsize,

    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// Command-line tool for calling structural-variant breakpoints from split reads.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Extract, cluster, and report consensus breakpoint calls
    Call {
        #[clap(flatten)]
        common: CommonOpts,

        /// Maximum number of segments per read before the read is discarded
        #[clap(short = 's', long, value_parser, default_value_t = 8)]
        split: usize,

        /// Maximum distance to cluster SVs together
        #[clap(short = 'd', long, value_parser, default_value_t = 10)]
        distance: i64,

        /// Minimum percentage identity to reference, per segment
        #[clap(short = 'p', long, value_parser, default_value_t = 80.0)]
        min_pid: f64,

        /// Minimum mapping quality, per segment
        #[clap(short = 'm', long, value_parser, default_value_t = 20.0)]
        min_mapq: f64,

        /// Bin width of the spatial index
        #[clap(short = 'w', long, value_parser, default_value_t = 1000)]
        max_window_size: i64,

        /// Minimum number of supporting reads per consensus call
        #[clap(short = 'n', long, value_parser, default_value_t = 2)]
        cluster: usize,

        /// Maximum mate distance for read-pair evidence (reserved; no fusion
        /// algorithm consumes it yet)
        #[clap(short = 'r', long, value_parser, default_value_t = 300)]
        mate_distance: i64,

        /// Write calls to this file instead of stdout
        #[clap(short = 'o', long, value_parser)]
        output: Option<String>,
    },
    /// Print split-read statistics for a BAM file
    Stats {
        #[clap(flatten)]
        common: CommonOpts,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::Call {
            common,
            split,
            distance,
            min_pid,
            min_mapq,
            max_window_size,
            cluster,
            mate_distance,
            output,
        } => {
            let config = Config {
                max_threads: common.num_threads.into(),
                max_split: split,
                clustering_distance: distance,
                min_identity: min_pid,
                min_map_quality: min_mapq,
                max_window_size,
                min_cluster_support: cluster,
                mate_distance,
            };
            initialize(common.verbose, config.max_threads)?;

            let batch = reads_from_bam(&common.bam_file)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
            info!(
                "Parsed {} split reads ({} segments)",
                batch.reads.len(),
                batch.store.len()
            );

            let breakpoints = extract_all(&batch.store, &batch.reads, &config);
            info!("Extracted {} candidate breakpoints", breakpoints.len());

            let calls = cluster_breakpoints(&breakpoints, &config);
            write_calls(&calls, &batch.chroms, output.as_deref())?;
        }
        Args::Stats { common } => {
            let config = Config {
                max_threads: common.num_threads.into(),
                ..Config::default()
            };
            initialize(common.verbose, config.max_threads)?;
            let batch = reads_from_bam(&common.bam_file)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
            let breakpoints = extract_all(&batch.store, &batch.reads, &config);
            println!("Split reads: {}", batch.reads.len());
            println!("Segments: {}", batch.store.len());
            println!("Chromosomes: {}", batch.chroms.len());
            println!(
                "Candidate breakpoints (default thresholds): {}",
                breakpoints.len()
            );
        }
    }

    Ok(())
}

/// Initialize logging and size the thread pool from the configuration
fn initialize(verbose: u8, max_threads: usize) -> io::Result<()> {
    env_logger::Builder::new()
        .filter_level(match verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    ThreadPoolBuilder::new()
        .num_threads(max_threads)
        .build_global()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    Ok(())
}
