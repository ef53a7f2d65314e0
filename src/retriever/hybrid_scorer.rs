//! Fuses lexical and vector search results into one ranked candidate list.

use std::collections::{HashMap, HashSet};

use super::models::{BlendMode, NormalizeMode, ScoringPrefs};

/// One item's fused score, with the lane-level detail preserved for
/// downstream display and debugging.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridScore {
    /// Item identifier.
    pub item_id: String,
    /// Final fused score.
    pub score: f64,
    /// Raw lexical score, if the item matched that lane.
    pub score_text: Option<f64>,
    /// Raw vector score, if the item matched that lane.
    pub score_vec: Option<f64>,
    /// Lexical-lane rank (1-based), if matched.
    pub rank_text: Option<u32>,
    /// Vector-lane rank (1-based), if matched.
    pub rank_vec: Option<u32>,
}

/// Fuses two single-lane result sets into one ranked list.
pub struct HybridScorer {
    prefs: ScoringPrefs,
}

impl HybridScorer {
    /// Builds a scorer from explicit preferences.
    #[must_use]
    pub const fn new(prefs: ScoringPrefs) -> Self {
        Self { prefs }
    }

    /// Fuses `text_results` and `vec_results`, keeping at most `top_k`.
    ///
    /// Both inputs are `(item_id, raw_score)` pairs from their respective
    /// lanes; an item present in only one lane still participates, with
    /// the other lane's rank/score left as `None`.
    #[must_use]
    pub fn fuse(
        &self,
        text_results: &[(String, f64)],
        vec_results: &[(String, f64)],
        top_k: usize,
    ) -> Vec<HybridScore> {
        let text_scores: HashMap<&str, f64> =
            text_results.iter().map(|(id, s)| (id.as_str(), *s)).collect();
        let vec_scores: HashMap<&str, f64> =
            vec_results.iter().map(|(id, s)| (id.as_str(), *s)).collect();

        let text_ranked = rank_items(text_results, &text_scores);
        let vec_ranked = rank_items(vec_results, &vec_scores);

        let text_norm = if self.prefs.blend == BlendMode::Linear {
            normalize_scores(&text_scores, self.prefs.normalize)
        } else {
            HashMap::new()
        };
        let vec_norm = if self.prefs.blend == BlendMode::Linear {
            normalize_scores(&vec_scores, self.prefs.normalize)
        } else {
            HashMap::new()
        };

        let mut item_ids: Vec<&str> = text_scores.keys().copied().collect::<HashSet<_>>().into_iter().collect();
        for id in vec_scores.keys() {
            if !text_scores.contains_key(id) {
                item_ids.push(id);
            }
        }

        let mut fused: Vec<HybridScore> = item_ids
            .into_iter()
            .map(|item_id| {
                let rank_text = text_ranked.get(item_id).copied();
                let rank_vec = vec_ranked.get(item_id).copied();
                let score = if self.prefs.blend == BlendMode::Linear {
                    let s_text = text_norm.get(item_id).copied().unwrap_or(0.0);
                    let s_vec = vec_norm.get(item_id).copied().unwrap_or(0.0);
                    self.prefs.w_text * s_text + self.prefs.w_vec * s_vec
                } else {
                    self.rrf_score(rank_text, rank_vec)
                };
                HybridScore {
                    item_id: item_id.to_string(),
                    score,
                    score_text: text_scores.get(item_id).copied(),
                    score_vec: vec_scores.get(item_id).copied(),
                    rank_text,
                    rank_vec,
                }
            })
            .collect();

        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        fused.truncate(top_k);
        fused
    }

    fn rrf_score(&self, rank_text: Option<u32>, rank_vec: Option<u32>) -> f64 {
        let mut score = 0.0;
        if let Some(r) = rank_text {
            score += 1.0 / f64::from(self.prefs.k + r);
        }
        if let Some(r) = rank_vec {
            score += 1.0 / f64::from(self.prefs.k + r);
        }
        score
    }
}

impl Default for HybridScorer {
    fn default() -> Self {
        Self::new(ScoringPrefs::default())
    }
}

/// Ranks are always computed on descending raw score; ties break on the
/// item's position in `results` (its first-seen insertion order), not on
/// `HashMap` iteration order.
fn rank_items<'a>(results: &[(String, f64)], scores: &HashMap<&'a str, f64>) -> HashMap<&'a str, u32> {
    let mut sorted: Vec<(&str, f64, usize)> = results
        .iter()
        .enumerate()
        .filter_map(|(idx, (id, _))| scores.get_key_value(id.as_str()).map(|(k, s)| (*k, *s, idx)))
        .collect();
    sorted.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.2.cmp(&b.2))
    });
    sorted
        .into_iter()
        .enumerate()
        .map(|(idx, (id, _, _))| (id, u32::try_from(idx + 1).unwrap_or(u32::MAX)))
        .collect()
}

fn normalize_scores<'a>(scores: &HashMap<&'a str, f64>, mode: NormalizeMode) -> HashMap<&'a str, f64> {
    match mode {
        NormalizeMode::None => scores.clone(),
        NormalizeMode::Sigmoid => scores.iter().map(|(id, s)| (*id, sigmoid(*s))).collect(),
        NormalizeMode::Minmax => {
            if scores.is_empty() {
                return HashMap::new();
            }
            let min = scores.values().copied().fold(f64::INFINITY, f64::min);
            let max = scores.values().copied().fold(f64::NEG_INFINITY, f64::max);
            if (max - min).abs() < f64::EPSILON {
                return scores.keys().map(|id| (*id, 1.0)).collect();
            }
            scores.iter().map(|(id, s)| (*id, (*s - min) / (max - min))).collect()
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rrf_fusion_orders_candidates() {
        let scorer = HybridScorer::new(ScoringPrefs {
            k: 60,
            ..ScoringPrefs::default()
        });
        let text_results = vec![("a".to_string(), 0.9), ("b".to_string(), 0.8)];
        let vec_results = vec![("b".to_string(), 0.95), ("c".to_string(), 0.7)];
        let fused = scorer.fuse(&text_results, &vec_results, 3);
        let ids: Vec<&str> = fused.iter().map(|f| f.item_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_tied_scores_rank_by_insertion_order() {
        let text_results = vec![
            ("z".to_string(), 0.5),
            ("a".to_string(), 0.5),
            ("m".to_string(), 0.5),
        ];
        let text_scores: HashMap<&str, f64> = text_results.iter().map(|(id, s)| (id.as_str(), *s)).collect();
        let ranked = rank_items(&text_results, &text_scores);
        assert_eq!(ranked["z"], 1);
        assert_eq!(ranked["a"], 2);
        assert_eq!(ranked["m"], 3);
    }

    #[test]
    fn test_linear_blend_respects_weights() {
        let scorer = HybridScorer::new(ScoringPrefs {
            blend: BlendMode::Linear,
            w_text: 0.8,
            w_vec: 0.2,
            normalize: NormalizeMode::None,
            ..ScoringPrefs::default()
        });
        let text_results = vec![("a".to_string(), 0.2), ("b".to_string(), 0.1)];
        let vec_results = vec![("a".to_string(), 0.1), ("b".to_string(), 0.3)];
        let fused = scorer.fuse(&text_results, &vec_results, 2);
        assert_eq!(fused[0].item_id, "a");
    }

    #[test]
    fn test_sigmoid_normalize_bounds() {
        let scores: HashMap<&str, f64> = [("a", 0.0), ("b", 100.0)].into_iter().collect();
        let norm = normalize_scores(&scores, NormalizeMode::Sigmoid);
        assert!((norm[&"a"] - 0.5).abs() < 1e-9);
        assert!(norm[&"b"] > 0.99);
    }
}
