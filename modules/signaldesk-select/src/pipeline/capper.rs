//! Source-tier capper: bounds scorer volume before the model is called.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::info;

use signaldesk_common::TierCaps;

use super::aggregate::ArticleMap;
use super::article::{ScoredArticle, SourceTier};

fn cap_for(caps: &TierCaps, tier: SourceTier) -> usize {
    match tier {
        SourceTier::Critical => caps.critical,
        SourceTier::High => caps.high,
        SourceTier::Other => caps.other,
    }
}

/// Tier ascending, embedding score descending, article id ascending.
pub fn pre_scoring_order(a: &ScoredArticle, b: &ScoredArticle) -> Ordering {
    a.source_tier
        .cmp(&b.source_tier)
        .then_with(|| b.embedding_score.total_cmp(&a.embedding_score))
        .then_with(|| a.id().cmp(&b.id()))
}

/// Keep at most `caps[tier]` articles per distinct source, best first, then
/// truncate the whole list to `max_total`. The result stays in
/// [`pre_scoring_order`].
pub fn cap_by_source_tier(map: ArticleMap, caps: &TierCaps, max_total: usize) -> Vec<ScoredArticle> {
    let before = map.len();
    let mut articles = map.into_articles();
    articles.sort_by(pre_scoring_order);

    let mut per_source: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<ScoredArticle> = Vec::with_capacity(articles.len().min(max_total));

    for article in articles {
        let count = per_source.entry(article.source_key()).or_insert(0);
        if *count >= cap_for(caps, article.source_tier) {
            continue;
        }
        *count += 1;
        kept.push(article);
    }

    let after_tier_caps = kept.len();
    kept.truncate(max_total);

    info!(
        before,
        after_tier_caps,
        kept = kept.len(),
        sources = per_source.len(),
        "Source-tier capping complete"
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{article, candidate};
    use signaldesk_common::SignalStrength;

    fn map_of(entries: &[(&str, f64, SourceTier)]) -> ArticleMap {
        let mut map = ArticleMap::new();
        for (i, (source, score, tier)) in entries.iter().enumerate() {
            let a = article(&format!("Acme expansion story number {i}"), source);
            map.fold(candidate("Acme", &a, *score, SignalStrength::Strong), *tier);
        }
        map
    }

    #[test]
    fn caps_apply_per_source_by_tier() {
        let caps = TierCaps { critical: 3, high: 2, other: 1 };
        let mut entries = Vec::new();
        for i in 0..5 {
            entries.push(("Reuters", 0.5 + i as f64 / 100.0, SourceTier::Critical));
            entries.push(("Adweek", 0.6 + i as f64 / 100.0, SourceTier::High));
            entries.push(("Local Gazette", 0.9 + i as f64 / 100.0, SourceTier::Other));
        }

        let kept = cap_by_source_tier(map_of(&entries), &caps, 100);
        let count = |s: &str| kept.iter().filter(|a| a.article.source_name == s).count();
        assert_eq!(count("Reuters"), 3);
        assert_eq!(count("Adweek"), 2);
        assert_eq!(count("Local Gazette"), 1);
    }

    #[test]
    fn keeps_best_embedding_scores_within_a_source() {
        let caps = TierCaps { critical: 2, high: 2, other: 2 };
        let kept = cap_by_source_tier(
            map_of(&[
                ("Reuters", 0.41, SourceTier::Critical),
                ("Reuters", 0.93, SourceTier::Critical),
                ("Reuters", 0.77, SourceTier::Critical),
            ]),
            &caps,
            100,
        );
        let scores: Vec<f64> = kept.iter().map(|a| a.embedding_score).collect();
        assert_eq!(scores, vec![0.93, 0.77]);
    }

    #[test]
    fn higher_tiers_come_first_and_survive_global_truncation() {
        let caps = TierCaps::default();
        let kept = cap_by_source_tier(
            map_of(&[
                ("Local Gazette", 0.99, SourceTier::Other),
                ("Adweek", 0.70, SourceTier::High),
                ("Reuters", 0.40, SourceTier::Critical),
            ]),
            &caps,
            2,
        );
        let tiers: Vec<SourceTier> = kept.iter().map(|a| a.source_tier).collect();
        assert_eq!(tiers, vec![SourceTier::Critical, SourceTier::High]);
    }

    #[test]
    fn source_names_are_grouped_after_normalisation() {
        let caps = TierCaps { critical: 1, high: 1, other: 1 };
        let kept = cap_by_source_tier(
            map_of(&[
                ("Reuters", 0.8, SourceTier::Critical),
                ("www.reuters", 0.7, SourceTier::Critical),
            ]),
            &caps,
            100,
        );
        assert_eq!(kept.len(), 1);
    }
}
