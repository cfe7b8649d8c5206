//! Regroups the ranked set by target and computes distribution statistics.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use signaldesk_common::{
    CrossTargetConnection, SignalStrength, Target, TargetPriority, TargetType,
};

use super::article::SelectedArticle;

/// One article as it appears under a target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetSignal {
    pub article_id: Uuid,
    pub title: String,
    pub url: String,
    pub source_name: String,
    pub published_at: Option<DateTime<Utc>>,
    pub relevance_score: u8,
    pub similarity_score: f64,
    pub signal_strength: SignalStrength,
    pub signal_category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetSignals {
    pub target_id: Uuid,
    pub target_name: String,
    pub target_type: TargetType,
    pub priority: TargetPriority,
    pub articles: Vec<TargetSignal>,
}

/// Group `accepted` (already in ranking order) under every target that
/// matched each article. Targets without accepted articles are omitted.
/// Output is ordered by target priority, then name.
pub fn group_by_target(accepted: &[SelectedArticle], targets: &[Target]) -> Vec<TargetSignals> {
    let mut by_target: HashMap<Uuid, Vec<TargetSignal>> = HashMap::new();

    for selected in accepted {
        for m in &selected.target_matches {
            by_target.entry(m.target_id).or_default().push(TargetSignal {
                article_id: selected.id(),
                title: selected.article.title.clone(),
                url: selected.article.url.clone(),
                source_name: selected.article.source_name.clone(),
                published_at: selected.article.published_at,
                relevance_score: selected.relevance_score,
                similarity_score: m.similarity_score,
                signal_strength: m.signal_strength,
                signal_category: m.signal_category.clone(),
            });
        }
    }

    let mut groups: Vec<TargetSignals> = targets
        .iter()
        .filter_map(|t| {
            let articles = by_target.remove(&t.id)?;
            Some(TargetSignals {
                target_id: t.id,
                target_name: t.name.clone(),
                target_type: t.target_type,
                priority: t.priority,
                articles,
            })
        })
        .collect();

    groups.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.target_name.cmp(&b.target_name))
            .then_with(|| a.target_id.cmp(&b.target_id))
    });
    groups
}

/// Accepted-article count per source. Sources that differ only in case or a
/// `www.` prefix share one entry, labelled with the first spelling seen.
pub fn source_distribution(accepted: &[SelectedArticle]) -> BTreeMap<String, usize> {
    let mut labels: HashMap<String, String> = HashMap::new();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for selected in accepted {
        let label = labels
            .entry(selected.source_key())
            .or_insert_with(|| selected.article.source_name.trim().to_string());
        *counts.entry(label.clone()).or_insert(0) += 1;
    }
    counts
}

/// Keep connections that really span `min_targets` distinct targets, most
/// connected first.
pub fn tidy_connections(
    mut connections: Vec<CrossTargetConnection>,
    min_targets: usize,
) -> Vec<CrossTargetConnection> {
    for c in &mut connections {
        c.targets.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.target_id.cmp(&b.target_id))
        });
        let mut seen = HashSet::new();
        c.targets.retain(|t| seen.insert(t.target_id));
    }
    connections.retain(|c| c.targets.len() >= min_targets);
    connections.sort_by(|a, b| {
        b.targets
            .len()
            .cmp(&a.targets.len())
            .then_with(|| a.article_id.cmp(&b.article_id))
    });
    let mut seen = HashSet::new();
    connections.retain(|c| seen.insert(c.article_id));
    connections
}
