/// Thresholds and limits for extraction and clustering.
///
/// Built once by the CLI layer and passed by reference into each component;
/// nothing mutates it after startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Thread pool size for parallel extraction.
    pub max_threads: usize,
    /// Reads with this many segments or more are discarded as ambiguous mappings.
    pub max_split: usize,
    /// Maximum distance on both endpoints for two breakpoints to merge.
    pub clustering_distance: i64,
    /// Minimum percent identity to reference, per segment.
    pub min_identity: f64,
    /// Minimum mapping quality, per segment.
    pub min_map_quality: f64,
    /// Bin width of the spatial index.
    pub max_window_size: i64,
    /// Minimum number of distinct supporting reads for a consensus call.
    pub min_cluster_support: usize,
    /// Maximum mate distance for read-pair evidence fusion. Accepted and
    /// stored, but no fusion algorithm consumes it yet.
    pub mate_distance: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_threads: num_cpus::get(),
            max_split: 8,
            clustering_distance: 10,
            min_identity: 80.0,
            min_map_quality: 20.0,
            max_window_size: 1000,
            min_cluster_support: 2,
            mate_distance: 300,
        }
    }
}
