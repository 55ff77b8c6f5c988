//! Brute-force cosine ranking.
//!
//! Candidates are expected to be L2-normalized already; the query is
//! normalized here, so a dot product is the cosine. Results are sorted by
//! descending score with a stable sort: equal scores keep candidate order.

/// Score forced onto an entry that must never surface (below any cosine).
pub const EXCLUDED_SCORE: f32 = f32::NEG_INFINITY;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    pub index: usize,
    pub score: f32,
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalize in place. Zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

pub fn normalized(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    normalize(&mut out);
    out
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity of arbitrary (not necessarily normalized) vectors.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let (na, nb) = (l2_norm(a), l2_norm(b));
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    dot(a, b) / (na * nb)
}

/// Score every candidate against an already-normalized query.
pub fn score_all<V: AsRef<[f32]>>(query_normalized: &[f32], candidates: &[V]) -> Vec<f32> {
    candidates.iter().map(|c| dot(query_normalized, c.as_ref())).collect()
}

/// Stable descending sort of `(index, score)` pairs, truncated to `top_k`.
pub fn top_k(scores: impl IntoIterator<Item = (usize, f32)>, top_k: usize) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = scores.into_iter().map(|(index, score)| Ranked { index, score }).collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(top_k);
    ranked
}

/// Rank `candidates` (pre-normalized) by cosine similarity to `query`.
pub fn rank<V: AsRef<[f32]>>(query: &[f32], candidates: &[V], k: usize) -> Vec<Ranked> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }
    let q = normalized(query);
    top_k(score_all(&q, candidates).into_iter().enumerate(), k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_candidates_rank_to_nothing() {
        let empty: Vec<Vec<f32>> = Vec::new();
        assert!(rank(&[1.0, 0.0], &empty, 5).is_empty());
    }

    #[test]
    fn ties_keep_catalog_order() {
        let c = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]];
        let r = rank(&[2.0, 0.0], &c, 4);
        let order: Vec<usize> = r.iter().map(|x| x.index).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn query_is_normalized_before_scoring() {
        let c = vec![normalized(&[3.0, 4.0])];
        let r = rank(&[30.0, 40.0], &c, 1);
        assert!((r[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn excluded_score_sorts_last() {
        let r = top_k(vec![(0, EXCLUDED_SCORE), (1, -1.0), (2, 0.5)], 3);
        assert_eq!(r.last().map(|x| x.index), Some(0));
    }

    #[test]
    fn zero_vectors_have_zero_cosine() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }
}
