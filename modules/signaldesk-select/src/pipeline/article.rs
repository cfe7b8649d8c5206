use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};
use uuid::Uuid;

use signaldesk_common::{Article, CandidateMatch, SignalStrength};

use super::sources::normalize_source;

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Publisher classification. Declaration order gives `Critical < High < Other`
/// so ascending sorts put the most valuable sources first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceTier {
    Critical,
    High,
    Other,
}

impl SourceTier {
    /// 1 = critical, 2 = high, 3 = other.
    pub fn rank(self) -> u8 {
        match self {
            SourceTier::Critical => 1,
            SourceTier::High => 2,
            SourceTier::Other => 3,
        }
    }
}

impl Serialize for SourceTier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.rank())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTier {
    High,
    Medium,
    Low,
}

impl PriorityTier {
    /// high ≥ 70, medium ≥ 50, low otherwise.
    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            PriorityTier::High
        } else if score >= 50 {
            PriorityTier::Medium
        } else {
            PriorityTier::Low
        }
    }
}

/// Whether a relevance score came from the model or the embedding fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreOrigin {
    Model,
    Fallback,
}

// ---------------------------------------------------------------------------
// Per-target match detail
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetMatch {
    pub target_id: Uuid,
    pub target_name: String,
    pub similarity_score: f64,
    pub signal_strength: SignalStrength,
    pub signal_category: String,
}

impl TargetMatch {
    fn from_candidate(candidate: &CandidateMatch) -> Self {
        Self {
            target_id: candidate.target_id,
            target_name: candidate.target_name.clone(),
            similarity_score: candidate.similarity_score,
            signal_strength: candidate.signal_strength,
            signal_category: candidate.signal_category.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScoredArticle: mutable during a run, up to and including scoring
// ---------------------------------------------------------------------------

/// One entry of the aggregation map. Created by the aggregator, removed by
/// the capper, given a relevance score by the scorer client.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredArticle {
    pub article: Article,
    /// Union of target names that surfaced this article.
    pub matched_targets: BTreeSet<String>,
    /// Best match per target, keyed by target id.
    pub target_matches: BTreeMap<Uuid, TargetMatch>,
    /// Max similarity seen across all contributing targets.
    pub embedding_score: f64,
    /// Fixed at aggregation time.
    pub source_tier: SourceTier,
    pub relevance_score: Option<u8>,
}

impl ScoredArticle {
    pub fn new(candidate: CandidateMatch, source_tier: SourceTier) -> Self {
        let target_match = TargetMatch::from_candidate(&candidate);
        let mut matched_targets = BTreeSet::new();
        matched_targets.insert(candidate.target_name.clone());
        let mut target_matches = BTreeMap::new();
        target_matches.insert(candidate.target_id, target_match);

        Self {
            embedding_score: candidate.similarity_score,
            article: candidate.article,
            matched_targets,
            target_matches,
            source_tier,
            relevance_score: None,
        }
    }

    /// Fold another target's match for the same article into this entry.
    /// Commutative and idempotent: only unions and maxima are taken.
    pub fn absorb(&mut self, candidate: &CandidateMatch) {
        self.matched_targets.insert(candidate.target_name.clone());
        if candidate.similarity_score > self.embedding_score {
            self.embedding_score = candidate.similarity_score;
        }

        let incoming = TargetMatch::from_candidate(candidate);
        match self.target_matches.get_mut(&candidate.target_id) {
            Some(existing) => {
                let stronger = incoming
                    .similarity_score
                    .total_cmp(&existing.similarity_score)
                    .then_with(|| incoming.signal_strength.cmp(&existing.signal_strength))
                    .then_with(|| existing.signal_category.cmp(&incoming.signal_category))
                    .is_gt();
                if stronger {
                    *existing = incoming;
                }
            }
            None => {
                self.target_matches.insert(candidate.target_id, incoming);
            }
        }
    }

    pub fn id(&self) -> Uuid {
        self.article.id
    }

    /// Normalised source name used for per-source caps.
    pub fn source_key(&self) -> String {
        normalize_source(&self.article.source_name)
    }

    /// `round(embedding_score × 100)`, clamped to 0–100.
    pub fn fallback_score(&self) -> u8 {
        (self.embedding_score * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

// ---------------------------------------------------------------------------
// SelectedArticle: read-only from ranking onward
// ---------------------------------------------------------------------------

/// An article whose relevance score is guaranteed present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedArticle {
    #[serde(flatten)]
    pub article: Article,
    pub matched_targets: Vec<String>,
    #[serde(skip)]
    pub target_matches: Vec<TargetMatch>,
    pub embedding_score: f64,
    pub source_tier: SourceTier,
    pub relevance_score: u8,
    pub score_origin: ScoreOrigin,
    pub priority_tier: PriorityTier,
}

impl SelectedArticle {
    pub fn id(&self) -> Uuid {
        self.article.id
    }

    pub fn source_key(&self) -> String {
        normalize_source(&self.article.source_name)
    }
}

impl From<ScoredArticle> for SelectedArticle {
    /// Resolves the relevance score: the model's when present, otherwise the
    /// embedding fallback.
    fn from(scored: ScoredArticle) -> Self {
        let (relevance_score, score_origin) = match scored.relevance_score {
            Some(score) => (score.min(100), ScoreOrigin::Model),
            None => (scored.fallback_score(), ScoreOrigin::Fallback),
        };

        Self {
            matched_targets: scored.matched_targets.into_iter().collect(),
            target_matches: scored.target_matches.into_values().collect(),
            embedding_score: scored.embedding_score,
            source_tier: scored.source_tier,
            relevance_score,
            score_origin,
            priority_tier: PriorityTier::from_score(relevance_score),
            article: scored.article,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{article, candidate};

    #[test]
    fn priority_tier_thresholds() {
        assert_eq!(PriorityTier::from_score(100), PriorityTier::High);
        assert_eq!(PriorityTier::from_score(70), PriorityTier::High);
        assert_eq!(PriorityTier::from_score(69), PriorityTier::Medium);
        assert_eq!(PriorityTier::from_score(50), PriorityTier::Medium);
        assert_eq!(PriorityTier::from_score(49), PriorityTier::Low);
        assert_eq!(PriorityTier::from_score(0), PriorityTier::Low);
    }

    #[test]
    fn source_tier_serializes_as_rank() {
        assert_eq!(serde_json::to_value(SourceTier::Critical).unwrap(), 1);
        assert_eq!(serde_json::to_value(SourceTier::Other).unwrap(), 3);
    }

    #[test]
    fn same_target_ties_resolve_by_category_in_any_order() {
        let a = article("Acme names new chief financial officer", "Reuters");
        let mut funding = candidate("Acme", &a, 0.7, SignalStrength::Strong);
        funding.signal_category = "funding".to_string();
        let mut leadership = candidate("Acme", &a, 0.7, SignalStrength::Strong);
        leadership.signal_category = "leadership".to_string();

        let mut forward = ScoredArticle::new(funding.clone(), SourceTier::Critical);
        forward.absorb(&leadership);
        let mut backward = ScoredArticle::new(leadership, SourceTier::Critical);
        backward.absorb(&funding);

        assert_eq!(forward, backward);
        assert_eq!(forward.target_matches[&funding.target_id].signal_category, "funding");
    }

    #[test]
    fn absorb_unions_targets_and_keeps_max_similarity() {
        let a = article("Acme expands retail footprint in Europe", "Reuters");
        let mut scored =
            ScoredArticle::new(candidate("Acme", &a, 0.61, SignalStrength::Moderate), SourceTier::Critical);
        scored.absorb(&candidate("Retail", &a, 0.83, SignalStrength::Strong));
        scored.absorb(&candidate("Europe", &a, 0.40, SignalStrength::Weak));

        assert_eq!(scored.matched_targets.len(), 3);
        assert_eq!(scored.embedding_score, 0.83);
        assert_eq!(scored.target_matches.len(), 3);
    }

    #[test]
    fn absorbing_the_same_candidate_twice_is_idempotent() {
        let a = article("Acme expands retail footprint in Europe", "Reuters");
        let c = candidate("Acme", &a, 0.7, SignalStrength::Strong);
        let mut once = ScoredArticle::new(c.clone(), SourceTier::Critical);
        let twice = {
            let mut s = once.clone();
            s.absorb(&c);
            s
        };
        once.absorb(&c);
        assert_eq!(once, twice);
    }

    #[test]
    fn fallback_score_rounds_embedding() {
        let a = article("Acme expands retail footprint in Europe", "Reuters");
        let scored =
            ScoredArticle::new(candidate("Acme", &a, 0.675, SignalStrength::Strong), SourceTier::High);
        assert_eq!(scored.fallback_score(), 68);
    }

    #[test]
    fn conversion_prefers_model_score_over_fallback() {
        let a = article("Acme expands retail footprint in Europe", "Reuters");
        let mut scored =
            ScoredArticle::new(candidate("Acme", &a, 0.9, SignalStrength::Strong), SourceTier::High);
        scored.relevance_score = Some(42);
        let selected = SelectedArticle::from(scored.clone());
        assert_eq!(selected.relevance_score, 42);
        assert_eq!(selected.score_origin, ScoreOrigin::Model);
        assert_eq!(selected.priority_tier, PriorityTier::Low);

        scored.relevance_score = None;
        let selected = SelectedArticle::from(scored);
        assert_eq!(selected.relevance_score, 90);
        assert_eq!(selected.score_origin, ScoreOrigin::Fallback);
    }
}
