//! K-means partitioning of embedding vectors with silhouette cohesion.
//!
//! Centroids are seeded with k-means++ (D²-weighted sampling from a
//! `StdRng` with a fixed seed) and refined with Lloyd iterations until every
//! centroid moves less than `tolerance` or `max_iter` is reached.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum ClusterError {
    #[error("need at least 2 clusters, got {0}")]
    TooFewClusters(usize),
    #[error("cannot cluster {n} vectors into {k} clusters")]
    TooFewSamples { n: usize, k: usize },
    #[error("vectors have mixed dimensions ({expected} vs {actual})")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("silhouette undefined for {labels} distinct labels over {n} samples")]
    SilhouetteUndefined { labels: usize, n: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct KMeansParams {
    pub seed: u64,
    pub max_iter: usize,
    pub tolerance: f32,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self { seed: 42, max_iter: 300, tolerance: 1e-4 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub n_clusters: usize,
    pub labels: Vec<usize>,
    pub cohesion: f32,
    pub iterations: usize,
}

/// Cluster count actually used for `n` samples when `k` was requested.
pub fn effective_k(n: usize, k: usize) -> usize {
    if n < k {
        (n / 2).max(2)
    } else {
        k
    }
}

/// Partition `vectors` into `effective_k(n, k)` groups.
pub fn kmeans<V: AsRef<[f32]>>(vectors: &[V], k: usize, params: &KMeansParams) -> Result<Clustering, ClusterError> {
    let n = vectors.len();
    let k = effective_k(n, k);
    if k < 2 {
        return Err(ClusterError::TooFewClusters(k));
    }
    if n < k {
        return Err(ClusterError::TooFewSamples { n, k });
    }
    let dim = vectors[0].as_ref().len();
    if let Some(bad) = vectors.iter().map(|v| v.as_ref().len()).find(|&d| d != dim) {
        return Err(ClusterError::DimensionMismatch { expected: dim, actual: bad });
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut centroids = plusplus_init(vectors, k, &mut rng);
    let mut labels = assign(vectors, &centroids);
    let mut iterations = 0;
    for iter in 0..params.max_iter {
        iterations = iter + 1;
        let updated = update(vectors, &labels, &centroids);
        let converged = centroids
            .iter()
            .zip(&updated)
            .all(|(old, new)| sq_dist(old, new) <= params.tolerance * params.tolerance);
        centroids = updated;
        labels = assign(vectors, &centroids);
        if converged {
            break;
        }
    }
    debug!(n, k, iterations, "k-means converged");

    let cohesion = silhouette(vectors, &labels)?;
    Ok(Clustering { n_clusters: k, labels, cohesion, iterations })
}

fn sq_dist(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn plusplus_init<V: AsRef<[f32]>>(vectors: &[V], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let n = vectors.len();
    let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);
    centroids.push(vectors[rng.gen_range(0..n)].as_ref().to_vec());
    let mut nearest: Vec<f32> = vectors.iter().map(|v| sq_dist(v.as_ref(), &centroids[0])).collect();

    while centroids.len() < k {
        let total: f32 = nearest.iter().sum();
        let pick = if total > 0.0 {
            let mut target = rng.gen::<f32>() * total;
            let mut chosen = n - 1;
            for (i, d) in nearest.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // All points coincide with a centroid.
            rng.gen_range(0..n)
        };
        let c = vectors[pick].as_ref().to_vec();
        for (d, v) in nearest.iter_mut().zip(vectors) {
            *d = d.min(sq_dist(v.as_ref(), &c));
        }
        centroids.push(c);
    }
    centroids
}

fn assign<V: AsRef<[f32]>>(vectors: &[V], centroids: &[Vec<f32>]) -> Vec<usize> {
    vectors
        .iter()
        .map(|v| {
            let mut best = (0, f32::INFINITY);
            for (c, centroid) in centroids.iter().enumerate() {
                let d = sq_dist(v.as_ref(), centroid);
                if d < best.1 {
                    best = (c, d);
                }
            }
            best.0
        })
        .collect()
}

/// Mean of each cluster's members; an empty cluster keeps its old centroid.
fn update<V: AsRef<[f32]>>(vectors: &[V], labels: &[usize], old: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let dim = old.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0f32; dim]; old.len()];
    let mut counts = vec![0usize; old.len()];
    for (v, &l) in vectors.iter().zip(labels) {
        counts[l] += 1;
        for (s, x) in sums[l].iter_mut().zip(v.as_ref()) {
            *s += x;
        }
    }
    sums.into_iter()
        .zip(counts)
        .zip(old)
        .map(|((mut s, count), prev)| {
            if count == 0 {
                return prev.clone();
            }
            for x in s.iter_mut() {
                *x /= count as f32;
            }
            s
        })
        .collect()
}

/// Mean silhouette coefficient with Euclidean distance.
///
/// Defined only for 2 ≤ distinct labels ≤ n - 1. Members of singleton
/// clusters score 0.
pub fn silhouette<V: AsRef<[f32]>>(vectors: &[V], labels: &[usize]) -> Result<f32, ClusterError> {
    let n = vectors.len();
    let n_labels = labels.iter().max().map_or(0, |&m| m + 1);
    let mut sizes = vec![0usize; n_labels];
    for &l in labels {
        sizes[l] += 1;
    }
    let distinct = sizes.iter().filter(|&&s| s > 0).count();
    if distinct < 2 || distinct + 1 > n {
        return Err(ClusterError::SilhouetteUndefined { labels: distinct, n });
    }

    let mut total = 0f32;
    for i in 0..n {
        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }
        let mut sums = vec![0f32; n_labels];
        for j in 0..n {
            if i != j {
                sums[labels[j]] += sq_dist(vectors[i].as_ref(), vectors[j].as_ref()).sqrt();
            }
        }
        let a = sums[own] / (sizes[own] - 1) as f32;
        let b = (0..n_labels)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f32)
            .fold(f32::INFINITY, f32::min);
        let max_ab = a.max(b);
        if max_ab > 0.0 {
            total += (b - a) / max_ab;
        }
    }
    Ok(total / n as f32)
}
