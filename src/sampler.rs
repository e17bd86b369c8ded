use crate::cluster_loader::Clusters;
use crate::config::ReconcilePolicy;
use crate::spool::{SeededRng, Spool};
use crate::{DistError, Document};
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

/// Share of the spool each cluster should supply
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterShare {
    pub cluster: String,
    pub population: usize,
    pub percentage: f64,
}

/// The designated cluster keeps `designated_percentage`, the rest split the
/// remainder by population. Without a designated cluster every cluster shares
/// the whole.
pub fn cluster_shares(clusters: &Clusters, designated: Option<usize>, designated_percentage: f64) -> Vec<ClusterShare> {
    let total = clusters.total_documents();
    let (pool, pool_percentage) = match designated {
        Some(slot) => {
            let pinned = clusters.iter().nth(slot).map(|c| c.documents.len()).unwrap_or(0);
            (total - pinned, 1.0 - designated_percentage)
        }
        None => (total, 1.0),
    };

    clusters
        .iter()
        .enumerate()
        .map(|(slot, cluster)| {
            let population = cluster.documents.len();
            let percentage = if Some(slot) == designated {
                designated_percentage
            } else if pool == 0 {
                0.0
            } else {
                (population as f64 / pool as f64) * pool_percentage
            };
            ClusterShare {
                cluster: cluster.id.clone(),
                population,
                percentage,
            }
        })
        .collect()
}

/// Per-cluster sample size, rounding halves to even
pub fn quota(total_pickings: usize, percentage: f64) -> usize {
    (total_pickings as f64 * percentage).round_ties_even() as usize
}

#[derive(Debug)]
pub struct StratifiedSample {
    pub spool: Spool,
    pub shares: Vec<ClusterShare>,
    /// Documents actually drawn per cluster, in cluster order
    pub drawn: Vec<(String, usize)>,
    pub total_pickings: usize,
}

pub struct StratifiedSampler {
    rng: SeededRng,
    designated_substring: String,
    designated_percentage: f64,
    reconcile: ReconcilePolicy,
}

impl StratifiedSampler {
    pub fn new(rng: SeededRng, designated_substring: impl Into<String>, designated_percentage: f64, reconcile: ReconcilePolicy) -> Self {
        Self {
            rng,
            designated_substring: designated_substring.into(),
            designated_percentage,
            reconcile,
        }
    }

    /// Fill a spool of `total_pickings` documents, removing each pick from
    /// its cluster.
    pub fn sample(&self, clusters: &mut Clusters, total_pickings: usize) -> Result<StratifiedSample, DistError> {
        let designated = clusters.find_designated(&self.designated_substring);
        match designated {
            Some(slot) => debug!(
                "[sampler] Designated cluster '{}' pinned at {}",
                clusters.iter().nth(slot).map(|c| c.id.as_str()).unwrap_or_default(),
                self.designated_percentage
            ),
            None => warn!(
                "[sampler] No single cluster matches '{}', sharing proportionally",
                self.designated_substring
            ),
        }

        let shares = cluster_shares(clusters, designated, self.designated_percentage);
        let mut spool = Spool::new();
        let mut origin: FxHashMap<Document, usize> = FxHashMap::default();
        let mut drawn = Vec::with_capacity(shares.len());

        for (slot, share) in shares.iter().enumerate() {
            let units = quota(total_pickings, share.percentage);
            let cluster = clusters.at_mut(slot);
            if units > cluster.documents.len() {
                return Err(DistError::InsufficientCluster {
                    cluster: cluster.id.clone(),
                    requested: units,
                    available: cluster.documents.len(),
                });
            }
            let sample = self.rng.take_sample(&mut cluster.documents, units);
            debug!("[sampler] Cluster '{}': {} of {} picked", share.cluster, sample.len(), share.population);
            let pooled = self.pool(&mut spool, &mut origin, sample, slot);
            drawn.push((share.cluster.clone(), pooled));
        }

        if spool.len() != total_pickings {
            self.reconcile(clusters, &mut spool, &mut origin, &mut drawn, total_pickings);
        }

        info!("[sampler] Spool holds {} documents (target {})", spool.len(), total_pickings);
        Ok(StratifiedSample {
            spool,
            shares,
            drawn,
            total_pickings,
        })
    }

    /// Add `sample` to the spool, returning how many were new to it
    fn pool(&self, spool: &mut Spool, origin: &mut FxHashMap<Document, usize>, sample: Vec<Document>, slot: usize) -> usize {
        let mut pooled = 0;
        for doc in sample {
            if spool.push(doc.clone()) {
                origin.insert(doc, slot);
                pooled += 1;
            } else {
                warn!("[sampler] '{}' listed under several clusters, pooled once", doc);
            }
        }
        pooled
    }

    fn reconcile(
        &self,
        clusters: &mut Clusters,
        spool: &mut Spool,
        origin: &mut FxHashMap<Document, usize>,
        drawn: &mut [(String, usize)],
        total_pickings: usize,
    ) {
        let have = spool.len();
        if self.reconcile == ReconcilePolicy::Strict {
            warn!("[sampler] Spool has {} documents, {} requested; left as is", have, total_pickings);
            return;
        }

        if have > total_pickings {
            for doc in spool.pop_tail(have - total_pickings) {
                if let Some(slot) = origin.remove(&doc) {
                    drawn[slot].1 -= 1;
                    clusters.at_mut(slot).documents.push(doc);
                }
            }
            debug!("[sampler] Trimmed {} surplus documents", have - total_pickings);
            return;
        }

        // Smallest original population first, ties in cluster order
        let mut order: Vec<usize> = (0..clusters.len()).collect();
        order.sort_by_key(|&slot| drawn[slot].1 + clusters.iter().nth(slot).map(|c| c.documents.len()).unwrap_or(0));

        for slot in order {
            let missing = total_pickings - spool.len();
            if missing == 0 {
                break;
            }
            let cluster = clusters.at_mut(slot);
            let units = missing.min(cluster.documents.len());
            if units == 0 {
                continue;
            }
            let extra = self.rng.take_sample(&mut cluster.documents, units);
            debug!("[sampler] Topping up {} from cluster '{}'", extra.len(), cluster.id);
            drawn[slot].1 += self.pool(spool, origin, extra, slot);
        }

        if spool.len() < total_pickings {
            warn!(
                "[sampler] Corpus exhausted: spool has {} documents, {} requested",
                spool.len(),
                total_pickings
            );
        }
    }
}
