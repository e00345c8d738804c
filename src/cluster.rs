//! Consensus clustering of candidate breakpoints
//!
//! Online single-linkage clustering under a dual-distance threshold: a new
//! breakpoint joins every existing cluster it can reach within the clustering
//! distance on both endpoints, and reachable clusters are unified with each
//! other. Unifying all matches (rather than picking one) is what makes the
//! final membership independent of arrival order. A read contributes at most
//! once to any cluster's support; further breakpoints from the same read are
//! kept for spatial linkage but not counted as evidence.

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::breakpoint::{Breakpoint, Loci, SvType};
use crate::config::Config;
use crate::grid::DualLocusGrid;

struct Cluster {
    /// Lowest loci among all members, under the total order (chromosome
    /// pair, first endpoint, second endpoint).
    representative: Loci,
    /// Every entry assigned here, counted or not.
    members: Vec<u32>,
    /// Distinct contributing reads; support count is this set's size.
    reads: FxHashSet<u32>,
    min_identity: f64,
    min_mapq: f64,
    type_votes: FxHashMap<SvType, usize>,
}

/// A cluster promoted to a call: support reached the configured minimum.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusCall {
    pub loci: Loci,
    pub sv_type: SvType,
    pub support: usize,
    pub min_identity: f64,
    pub min_mapq: f64,
}

pub struct ClusterEngine<'a> {
    config: &'a Config,
    grid: DualLocusGrid,
    /// Cluster slot of each breakpoint, indexed by grid insertion order.
    cluster_of: Vec<usize>,
    clusters: Vec<Option<Cluster>>,
}

impl<'a> ClusterEngine<'a> {
    pub fn new(config: &'a Config) -> Self {
        ClusterEngine {
            config,
            grid: DualLocusGrid::new(config.max_window_size),
            cluster_of: Vec::new(),
            clusters: Vec::new(),
        }
    }

    /// Processes one candidate breakpoint. Arrival order may change which
    /// cluster slot survives a merge, never the final membership.
    pub fn push(&mut self, bp: &Breakpoint) {
        let index = self.cluster_of.len() as u32;
        let d = self.config.clustering_distance;

        let mut matched: Vec<usize> = self
            .grid
            .query(&bp.loci, d)
            .into_iter()
            .map(|hit| self.cluster_of[hit as usize])
            .collect();
        matched.sort_unstable();
        matched.dedup();

        let target = if matched.is_empty() {
            self.new_cluster(bp)
        } else {
            // Join the cluster with the closest representative; ties break on
            // the representative's total order.
            let target = matched
                .iter()
                .copied()
                .min_by_key(|&slot| {
                    let rep = self.clusters[slot].as_ref().unwrap().representative;
                    let dist = (rep.pos1 - bp.loci.pos1)
                        .abs()
                        .max((rep.pos2 - bp.loci.pos2).abs());
                    (dist, rep)
                })
                .unwrap();
            for slot in matched {
                if slot != target {
                    self.unify(target, slot);
                }
            }
            self.absorb(target, bp);
            target
        };

        self.cluster_of.push(target);
        self.grid.insert(index, bp.loci);
    }

    fn new_cluster(&mut self, bp: &Breakpoint) -> usize {
        let slot = self.clusters.len();
        let mut type_votes = FxHashMap::default();
        type_votes.insert(bp.sv_type, 1);
        let mut reads = FxHashSet::default();
        reads.insert(bp.read_id);
        self.clusters.push(Some(Cluster {
            representative: bp.loci,
            members: vec![self.cluster_of.len() as u32],
            reads,
            min_identity: bp.min_identity,
            min_mapq: bp.min_mapq,
            type_votes,
        }));
        slot
    }

    /// Adds `bp` to an existing cluster. Evidence from a read the cluster
    /// already counts is redundant: the entry stays for linkage but support,
    /// aggregates, and the type vote are untouched.
    fn absorb(&mut self, slot: usize, bp: &Breakpoint) {
        let cluster = self.clusters[slot].as_mut().unwrap();
        cluster.members.push(self.cluster_of.len() as u32);
        if bp.loci < cluster.representative {
            cluster.representative = bp.loci;
        }
        if cluster.reads.insert(bp.read_id) {
            cluster.min_identity = cluster.min_identity.min(bp.min_identity);
            cluster.min_mapq = cluster.min_mapq.min(bp.min_mapq);
            *cluster.type_votes.entry(bp.sv_type).or_insert(0) += 1;
        } else {
            debug!(
                "Redundant breakpoint from read {} at ({}, {})",
                bp.read_id, bp.loci.pos1, bp.loci.pos2
            );
        }
    }

    /// Single-linkage merge of cluster `source` into `target`.
    fn unify(&mut self, target: usize, source: usize) {
        let src = self.clusters[source]
            .take()
            .expect("unify source cluster already merged");
        for &member in &src.members {
            self.cluster_of[member as usize] = target;
        }
        let dst = self.clusters[target].as_mut().unwrap();
        dst.members.extend(src.members);
        dst.reads.extend(src.reads);
        for (sv_type, votes) in src.type_votes {
            *dst.type_votes.entry(sv_type).or_insert(0) += votes;
        }
        dst.min_identity = dst.min_identity.min(src.min_identity);
        dst.min_mapq = dst.min_mapq.min(src.min_mapq);
        if src.representative < dst.representative {
            dst.representative = src.representative;
        }
    }

    /// Number of live clusters, promoted or not.
    pub fn cluster_count(&self) -> usize {
        self.clusters.iter().filter(|c| c.is_some()).count()
    }

    pub fn breakpoint_count(&self) -> usize {
        self.cluster_of.len()
    }

    /// Clusters whose distinct-read support reached `min_cluster_support`
    /// (boundary inclusive), in representative order. The SV type is the
    /// majority vote over counted members; a tied vote reports `Ambiguous`.
    pub fn calls(&self) -> Vec<ConsensusCall> {
        let mut calls: Vec<ConsensusCall> = self
            .clusters
            .iter()
            .flatten()
            .filter(|cluster| cluster.reads.len() >= self.config.min_cluster_support)
            .map(|cluster| ConsensusCall {
                loci: cluster.representative,
                sv_type: majority_type(&cluster.type_votes),
                support: cluster.reads.len(),
                min_identity: cluster.min_identity,
                min_mapq: cluster.min_mapq,
            })
            .collect();
        calls.sort_by_key(|call| call.loci);
        info!(
            "{} consensus calls from {} clusters ({} breakpoints)",
            calls.len(),
            self.cluster_count(),
            self.breakpoint_count()
        );
        calls
    }
}

fn majority_type(votes: &FxHashMap<SvType, usize>) -> SvType {
    let top = votes.values().copied().max().unwrap_or(0);
    let mut leaders = votes.iter().filter(|(_, &count)| count == top);
    let leader = leaders.next().map(|(&sv_type, _)| sv_type);
    match (leader, leaders.next()) {
        (Some(sv_type), None) => sv_type,
        _ => SvType::Ambiguous,
    }
}

/// Runs the full consensus pass over extracted candidates. Extraction is
/// parallel upstream; merging happens here on one thread because merge
/// decisions depend on global cluster state.
pub fn cluster_breakpoints(breakpoints: &[Breakpoint], config: &Config) -> Vec<ConsensusCall> {
    let mut engine = ClusterEngine::new(config);
    for bp in breakpoints {
        engine.push(bp);
    }
    engine.calls()
}
