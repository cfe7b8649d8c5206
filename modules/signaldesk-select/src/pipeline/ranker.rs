//! Diversity-constrained ranking of scored articles.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::info;

use signaldesk_common::SelectionConfig;

use super::article::SelectedArticle;

/// Relevance descending, then source tier ascending, then embedding score
/// descending, then article id ascending. Total, so ranking is repeatable.
pub fn ranking_order(a: &SelectedArticle, b: &SelectedArticle) -> Ordering {
    b.relevance_score
        .cmp(&a.relevance_score)
        .then_with(|| a.source_tier.cmp(&b.source_tier))
        .then_with(|| b.embedding_score.total_cmp(&a.embedding_score))
        .then_with(|| a.id().cmp(&b.id()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiversityLimits {
    /// Max accepted articles from any one (normalised) source.
    pub max_per_source: usize,
    /// Max accepted articles overall.
    pub hard_cap: usize,
}

impl DiversityLimits {
    pub fn from_config(config: &SelectionConfig) -> Self {
        Self {
            max_per_source: config.max_per_source(),
            hard_cap: config.hard_cap,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RankedSelection {
    /// Accepted articles in ranking order.
    pub accepted: Vec<SelectedArticle>,
    /// Skipped because their source was already at its limit.
    pub dropped_by_diversity: usize,
    /// Never examined because the hard cap was reached first.
    pub truncated: usize,
}

/// Sort into ranking order, then walk the list accepting each article whose
/// source is still under `max_per_source`, stopping at `hard_cap`.
pub fn rank(mut articles: Vec<SelectedArticle>, limits: DiversityLimits) -> RankedSelection {
    articles.sort_by(ranking_order);
    let total = articles.len();

    let mut per_source: HashMap<String, usize> = HashMap::new();
    let mut selection = RankedSelection::default();
    let mut examined = 0;

    for article in articles {
        if selection.accepted.len() >= limits.hard_cap {
            break;
        }
        examined += 1;

        let count = per_source.entry(article.source_key()).or_insert(0);
        if *count >= limits.max_per_source {
            selection.dropped_by_diversity += 1;
            continue;
        }
        *count += 1;
        selection.accepted.push(article);
    }
    selection.truncated = total - examined;

    info!(
        candidates = total,
        accepted = selection.accepted.len(),
        dropped_by_diversity = selection.dropped_by_diversity,
        truncated = selection.truncated,
        max_per_source = limits.max_per_source,
        "Ranking complete"
    );
    selection
}
