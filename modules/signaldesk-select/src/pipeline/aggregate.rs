//! Candidate aggregation.
//!
//! Per-target candidate lists are fetched concurrently, then screened and
//! folded sequentially into a single `ArticleMap`. The fold only takes unions
//! and maxima, so target order never changes the result.

use std::collections::HashMap;
use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use signaldesk_common::{Article, CandidateMatch, SignalStrength, Target};

use super::article::{ScoredArticle, SourceTier};
use super::quality::{garbage_reason, GarbageReason};
use super::recency::{RecencyPolicy, RecencyVerdict};
use super::sources::SourcePolicy;
use crate::traits::{ArticleStore, EmbeddingStore};

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// Embedding-store query parameters shared by every target in a request.
#[derive(Debug, Clone, Copy)]
pub struct CandidateQuery {
    pub min_strength: SignalStrength,
    pub since: DateTime<Utc>,
    pub limit: usize,
}

/// Fetch one target's candidates and join article metadata.
///
/// The store's strength filter, ordering and limit are re-applied here so a
/// sloppy store cannot widen the candidate set. Matches whose article is
/// missing from the article store are dropped.
pub async fn fetch_target_candidates(
    embeddings: &dyn EmbeddingStore,
    articles: &dyn ArticleStore,
    target: &Target,
    query: &CandidateQuery,
) -> Result<Vec<CandidateMatch>> {
    let mut matches = embeddings
        .matches_for_target(target.id, query.min_strength, query.since, query.limit)
        .await?;

    matches.retain(|m| m.signal_strength >= query.min_strength);
    matches.sort_by(|a, b| {
        b.similarity_score
            .total_cmp(&a.similarity_score)
            .then_with(|| a.article_id.cmp(&b.article_id))
    });
    matches.truncate(query.limit);

    if matches.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = matches.iter().map(|m| m.article_id).collect();
    let by_id: HashMap<Uuid, Article> = articles
        .articles_by_ids(&ids)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    let candidates = matches
        .into_iter()
        .filter_map(|m| {
            let Some(article) = by_id.get(&m.article_id) else {
                debug!(article_id = %m.article_id, "Matched article missing from store");
                return None;
            };
            Some(CandidateMatch {
                target_id: target.id,
                target_name: target.name.clone(),
                article: article.clone(),
                similarity_score: m.similarity_score.clamp(0.0, 1.0),
                signal_strength: m.signal_strength,
                signal_category: m.signal_category,
            })
        })
        .collect();

    Ok(candidates)
}

/// Result of the concurrent fan-out over all targets.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Successful fetches, in target order.
    pub fetched: Vec<(Target, Vec<CandidateMatch>)>,
    /// Targets whose fetch errored or never finished before `stop`.
    pub failed: usize,
}

/// Fetch all targets with at most `concurrency` requests in flight. Targets
/// still pending when `stop` resolves count as failed.
pub async fn fetch_all<F>(
    embeddings: &dyn EmbeddingStore,
    articles: &dyn ArticleStore,
    targets: &[Target],
    query: CandidateQuery,
    concurrency: usize,
    stop: F,
) -> FetchReport
where
    F: Future<Output = ()>,
{
    let query = &query;
    let fetches: Vec<_> = targets
        .iter()
        .enumerate()
        .map(|(idx, target)| async move {
            (idx, fetch_target_candidates(embeddings, articles, target, query).await)
        })
        .collect();
    let results: Vec<(usize, Result<Vec<CandidateMatch>>)> = stream::iter(fetches)
        .buffer_unordered(concurrency.max(1))
        .take_until(stop)
        .collect()
        .await;

    let mut report = FetchReport {
        failed: targets.len() - results.len(),
        ..FetchReport::default()
    };
    if report.failed > 0 {
        warn!(pending = report.failed, "Candidate fetch stopped before all targets finished");
    }

    let mut ok: Vec<(usize, Vec<CandidateMatch>)> = Vec::with_capacity(results.len());
    for (idx, result) in results {
        match result {
            Ok(candidates) => {
                debug!(target_name = %targets[idx].name, candidates = candidates.len(), "Fetched candidates");
                ok.push((idx, candidates));
            }
            Err(e) => {
                warn!(target_name = %targets[idx].name, error = %e, "Candidate fetch failed, treating as empty");
                report.failed += 1;
            }
        }
    }

    ok.sort_by_key(|(idx, _)| *idx);
    report.fetched = ok
        .into_iter()
        .map(|(idx, candidates)| (targets[idx].clone(), candidates))
        .collect();
    report
}

// ---------------------------------------------------------------------------
// Screening
// ---------------------------------------------------------------------------

/// Why a candidate was discarded before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Garbage(GarbageReason),
    Old(RecencyVerdict),
    Blocked,
    IndustryIrrelevant,
}

/// Quality, recency and source checks, run in that order.
#[derive(Debug, Clone)]
pub struct CandidateScreen {
    pub now: DateTime<Utc>,
    pub recency: RecencyPolicy,
    pub sources: SourcePolicy,
}

impl CandidateScreen {
    /// The candidate's source tier when it survives every check.
    pub fn screen(&self, article: &Article) -> Result<SourceTier, Rejection> {
        if let Some(reason) = garbage_reason(article) {
            return Err(Rejection::Garbage(reason));
        }

        let verdict = self.recency.verdict(article, self.now);
        if !verdict.is_fresh() {
            return Err(Rejection::Old(verdict));
        }

        let class = self.sources.classify(&article.source_name);
        if class.blocked {
            return Err(Rejection::Blocked);
        }
        if class.industry_irrelevant {
            return Err(Rejection::IndustryIrrelevant);
        }
        Ok(class.tier)
    }
}

/// Per-reason rejection counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterTally {
    pub total_matches: u32,
    pub garbage: u32,
    pub old: u32,
    pub blocked: u32,
    pub industry_irrelevant: u32,
}

impl FilterTally {
    pub fn record(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::Garbage(_) => self.garbage += 1,
            Rejection::Old(_) => self.old += 1,
            Rejection::Blocked => self.blocked += 1,
            Rejection::IndustryIrrelevant => self.industry_irrelevant += 1,
        }
    }

    pub fn rejected(&self) -> u32 {
        self.garbage + self.old + self.blocked + self.industry_irrelevant
    }
}

// ---------------------------------------------------------------------------
// Folding
// ---------------------------------------------------------------------------

/// One `ScoredArticle` per distinct article id. Owned by a single run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleMap {
    entries: HashMap<Uuid, ScoredArticle>,
}

impl ArticleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new article or merge another target's match into it.
    /// `tier` is only used on insert.
    pub fn fold(&mut self, candidate: CandidateMatch, tier: SourceTier) {
        match self.entries.get_mut(&candidate.article.id) {
            Some(existing) => existing.absorb(&candidate),
            None => {
                self.entries
                    .insert(candidate.article.id, ScoredArticle::new(candidate, tier));
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<&ScoredArticle> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by article id.
    pub fn into_articles(self) -> Vec<ScoredArticle> {
        let mut articles: Vec<ScoredArticle> = self.entries.into_values().collect();
        articles.sort_by_key(|a| a.id());
        articles
    }
}

/// Screen every fetched candidate and fold the survivors, one target after
/// another.
pub fn aggregate(
    fetched: &[(Target, Vec<CandidateMatch>)],
    screen: &CandidateScreen,
) -> (ArticleMap, FilterTally) {
    let mut map = ArticleMap::new();
    let mut tally = FilterTally::default();

    for (target, candidates) in fetched {
        let before = map.len();
        for candidate in candidates {
            tally.total_matches += 1;
            match screen.screen(&candidate.article) {
                Ok(tier) => map.fold(candidate.clone(), tier),
                Err(rejection) => {
                    debug!(
                        target_name = %target.name,
                        article_id = %candidate.article.id,
                        ?rejection,
                        "Candidate rejected"
                    );
                    tally.record(rejection);
                }
            }
        }
        debug!(target_name = %target.name, new_articles = map.len() - before, "Folded target");
    }

    info!(
        matches = tally.total_matches,
        garbage = tally.garbage,
        old = tally.old,
        blocked = tally.blocked,
        industry_irrelevant = tally.industry_irrelevant,
        aggregated = map.len(),
        "Aggregation complete"
    );
    (map, tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{article, candidate, profile, target};
    use chrono::Duration;
    use signaldesk_common::{Industry, SelectionConfig};

    fn screen(now: DateTime<Utc>) -> CandidateScreen {
        let config = SelectionConfig::default();
        CandidateScreen {
            now,
            recency: RecencyPolicy::from_config(&config, Duration::days(1)),
            sources: SourcePolicy::for_organization(&profile(Industry::Marketing)),
        }
    }

    #[test]
    fn screen_runs_quality_before_source_checks() {
        let s = screen(Utc::now());
        let a = article("566046", "PR Newswire");
        assert_eq!(
            s.screen(&a),
            Err(Rejection::Garbage(GarbageReason::NumericTitle))
        );
    }

    #[test]
    fn blocked_source_never_reaches_the_map() {
        let now = Utc::now();
        let t = target("Acme");
        let a = article("Acme launches flagship campaign in Paris", "Business Wire");
        let fetched = vec![(t.clone(), vec![candidate("Acme", &a, 0.99, SignalStrength::Strong)])];

        let (map, tally) = aggregate(&fetched, &screen(now));
        assert!(map.is_empty());
        assert_eq!(tally.blocked, 1);
        assert_eq!(tally.total_matches, 1);
    }

    #[test]
    fn industry_irrelevant_source_is_tallied_separately() {
        let t = target("Acme");
        let a = article("Acme chief joins defence procurement panel", "Defense One");
        let fetched = vec![(t, vec![candidate("Acme", &a, 0.8, SignalStrength::Strong)])];

        let (map, tally) = aggregate(&fetched, &screen(Utc::now()));
        assert!(map.is_empty());
        assert_eq!(tally.industry_irrelevant, 1);
        assert_eq!(tally.blocked, 0);
    }

    #[test]
    fn fold_is_order_independent() {
        let a = article("Acme and Globex announce joint venture", "Reuters");
        let b = article("Globex opens new flagship store in Berlin", "Retail Dive");
        let t1 = (
            target("Acme"),
            vec![candidate("Acme", &a, 0.72, SignalStrength::Strong)],
        );
        let t2 = (
            target("Globex"),
            vec![
                candidate("Globex", &a, 0.91, SignalStrength::Strong),
                candidate("Globex", &b, 0.66, SignalStrength::Moderate),
            ],
        );

        let s = screen(Utc::now());
        let (forward, _) = aggregate(&[t1.clone(), t2.clone()], &s);
        let (backward, _) = aggregate(&[t2, t1], &s);

        assert_eq!(forward, backward);
        let merged = forward.get(&a.id).unwrap();
        assert_eq!(merged.matched_targets.len(), 2);
        assert_eq!(merged.embedding_score, 0.91);
    }
}
