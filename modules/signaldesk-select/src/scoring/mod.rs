//! Relevance scoring client.
//!
//! Capped articles are chunked into fixed-size batches and sent to the
//! `RelevanceScorer` concurrently. Each batch resolves to a `BatchOutcome`;
//! failures of any kind leave that batch's articles unscored. The embedding
//! fallback is applied afterwards by [`finalize_scores`], a pure step.

pub mod claude;
pub mod parse;
pub mod prompt;

use std::future::Future;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ai_client::AiError;
use signaldesk_common::SelectionConfig;

pub use claude::ClaudeScorer;
pub use parse::ParseFailure;
pub use prompt::intelligence_context;

use crate::pipeline::article::{ScoredArticle, SelectedArticle};
use crate::traits::RelevanceScorer;

/// One article as presented to the scorer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringItem {
    pub id: Uuid,
    pub title: String,
    pub source: String,
    pub matched_targets: Vec<String>,
}

impl ScoringItem {
    pub fn from_article(article: &ScoredArticle) -> Self {
        Self {
            id: article.id(),
            title: article.article.title.clone(),
            source: article.article.source_name.clone(),
            matched_targets: article.matched_targets.iter().cloned().collect(),
        }
    }
}

/// What a scorer hands back: scores it already parsed, or raw text for the
/// defensive parser.
#[derive(Debug, Clone, PartialEq)]
pub enum ScorerReply {
    Scores(Vec<i64>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BatchFailure {
    #[error("scorer error: {message}")]
    Scorer { message: String, transient: bool },
    #[error("batch timed out after {0:?}")]
    Timeout(Duration),
    #[error("unusable reply: {0}")]
    Parse(#[from] ParseFailure),
    #[error("abandoned before completion")]
    Abandoned,
}

impl BatchFailure {
    /// Whether sending the same batch again could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BatchFailure::Scorer { transient, .. } => *transient,
            BatchFailure::Timeout(_) => true,
            BatchFailure::Parse(_) | BatchFailure::Abandoned => false,
        }
    }

    fn from_scorer_error(error: &anyhow::Error) -> Self {
        let transient = error
            .downcast_ref::<AiError>()
            .is_some_and(AiError::is_transient);
        BatchFailure::Scorer {
            message: format!("{error:#}"),
            transient,
        }
    }
}

/// Result of one scorer batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// One score per item, in item order.
    Scored(Vec<u8>),
    Failed(BatchFailure),
}

#[derive(Debug, Clone, Copy)]
pub struct ScoringOptions {
    pub batch_size: usize,
    pub concurrency: usize,
    pub batch_timeout: Duration,
}

impl ScoringOptions {
    pub fn from_config(config: &SelectionConfig) -> Self {
        Self {
            batch_size: config.scoring_batch_size,
            concurrency: config.scoring_concurrency,
            batch_timeout: Duration::from_secs(config.scoring_batch_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoringReport {
    pub batches_sent: u32,
    pub batches_failed: u32,
    /// Batches still outstanding when the run was stopped.
    pub batches_abandoned: u32,
}

/// Send one batch and turn whatever comes back into a `BatchOutcome`.
pub async fn score_batch(
    scorer: &dyn RelevanceScorer,
    intelligence_context: &str,
    items: &[ScoringItem],
    timeout: Duration,
) -> BatchOutcome {
    let call = scorer.score_batch(intelligence_context, items);
    let reply = match tokio::time::timeout(timeout, call).await {
        Err(_) => return BatchOutcome::Failed(BatchFailure::Timeout(timeout)),
        Ok(Err(e)) => return BatchOutcome::Failed(BatchFailure::from_scorer_error(&e)),
        Ok(Ok(reply)) => reply,
    };

    let parsed = match reply {
        ScorerReply::Scores(raw) => parse::accept_scores(&raw, items.len()),
        ScorerReply::Text(text) => parse::parse_scores(&text, items.len()),
    };

    match parsed {
        Ok(scores) => BatchOutcome::Scored(scores),
        Err(failure) => BatchOutcome::Failed(failure.into()),
    }
}

/// Score `articles` in place. Articles in failed or abandoned batches keep
/// `relevance_score == None`. Batches still in flight when `stop` resolves
/// are abandoned.
pub async fn score_articles<F>(
    scorer: &dyn RelevanceScorer,
    intelligence_context: &str,
    articles: &mut [ScoredArticle],
    options: ScoringOptions,
    stop: F,
) -> ScoringReport
where
    F: Future<Output = ()>,
{
    let batch_size = options.batch_size.max(1);
    let batches: Vec<Vec<ScoringItem>> = articles
        .chunks(batch_size)
        .map(|chunk| chunk.iter().map(ScoringItem::from_article).collect())
        .collect();

    let mut report = ScoringReport {
        batches_sent: batches.len() as u32,
        ..ScoringReport::default()
    };
    if batches.is_empty() {
        return report;
    }

    info!(
        scorer = scorer.name(),
        articles = articles.len(),
        batches = batches.len(),
        "Scoring articles"
    );

    let batch_futures: Vec<_> = batches
        .iter()
        .enumerate()
        .map(|(idx, items)| async move {
            let timeout = options.batch_timeout;
            (idx, score_batch(scorer, intelligence_context, items, timeout).await)
        })
        .collect();
    let finished: Vec<(usize, BatchOutcome)> = stream::iter(batch_futures)
        .buffer_unordered(options.concurrency.max(1))
        .take_until(stop)
        .collect()
        .await;

    let mut outcomes = vec![BatchOutcome::Failed(BatchFailure::Abandoned); batches.len()];
    for (idx, outcome) in finished {
        outcomes[idx] = outcome;
    }

    for (idx, (chunk, outcome)) in articles.chunks_mut(batch_size).zip(outcomes).enumerate() {
        match outcome {
            BatchOutcome::Scored(scores) => {
                for (article, score) in chunk.iter_mut().zip(scores) {
                    article.relevance_score = Some(score);
                }
                debug!(batch = idx, size = chunk.len(), "Batch scored");
            }
            BatchOutcome::Failed(BatchFailure::Abandoned) => {
                report.batches_failed += 1;
                report.batches_abandoned += 1;
            }
            BatchOutcome::Failed(failure) => {
                warn!(
                    batch = idx,
                    size = chunk.len(),
                    error = %failure,
                    transient = failure.is_transient(),
                    "Scoring batch failed, using embedding scores"
                );
                report.batches_failed += 1;
            }
        }
    }

    if report.batches_abandoned > 0 {
        warn!(
            abandoned = report.batches_abandoned,
            "Scoring stopped early, remaining batches use embedding scores"
        );
    }
    report
}

/// Resolve every article's relevance score, falling back to
/// `round(embedding_score × 100)` where the scorer produced none.
pub fn finalize_scores(articles: Vec<ScoredArticle>) -> Vec<SelectedArticle> {
    articles.into_iter().map(SelectedArticle::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::article::{ScoreOrigin, SourceTier};
    use crate::testing::{article, candidate, StubScorer};
    use signaldesk_common::SignalStrength;
    use std::future::pending;

    fn scored(n: usize) -> Vec<ScoredArticle> {
        (0..n)
            .map(|i| {
                let a = article(&format!("Acme regional expansion update {i}"), "Reuters");
                ScoredArticle::new(
                    candidate("Acme", &a, 0.50 + i as f64 / 100.0, SignalStrength::Strong),
                    SourceTier::Critical,
                )
            })
            .collect()
    }

    fn options(batch_size: usize) -> ScoringOptions {
        ScoringOptions {
            batch_size,
            concurrency: 2,
            batch_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn every_batch_scored() {
        let scorer = StubScorer::constant(77);
        let mut articles = scored(5);
        let report = score_articles(&scorer, "ctx", &mut articles, options(2), pending()).await;

        assert_eq!(report.batches_sent, 3);
        assert_eq!(report.batches_failed, 0);
        assert!(articles.iter().all(|a| a.relevance_score == Some(77)));
    }

    #[tokio::test]
    async fn truncated_reply_with_wrong_count_falls_back() {
        let scorer = StubScorer::replying("[80, 45, 6");
        let mut articles = scored(4);
        let report = score_articles(&scorer, "ctx", &mut articles, options(4), pending()).await;
        assert_eq!(report.batches_failed, 1);
        assert!(articles.iter().all(|a| a.relevance_score.is_none()));

        let finalized = finalize_scores(articles.clone());
        for (selected, original) in finalized.iter().zip(&articles) {
            assert_eq!(selected.relevance_score, original.fallback_score());
            assert_eq!(selected.score_origin, ScoreOrigin::Fallback);
        }
    }

    #[tokio::test]
    async fn failing_scorer_only_degrades_its_batch() {
        let scorer = StubScorer::constant(90).failing_when_title_contains("update 2");
        let mut articles = scored(6);
        let report = score_articles(&scorer, "ctx", &mut articles, options(2), pending()).await;

        assert_eq!(report.batches_failed, 1);
        let scored_count = articles.iter().filter(|a| a.relevance_score.is_some()).count();
        assert_eq!(scored_count, 4);
        assert!(articles[2].relevance_score.is_none());
        assert!(articles[3].relevance_score.is_none());
    }

    struct RejectingScorer(fn() -> AiError);

    #[async_trait::async_trait]
    impl RelevanceScorer for RejectingScorer {
        async fn score_batch(&self, _: &str, _: &[ScoringItem]) -> anyhow::Result<ScorerReply> {
            Err(anyhow::Error::new((self.0)()).context("scoring request failed"))
        }

        fn name(&self) -> &str {
            "rejecting"
        }
    }

    #[tokio::test]
    async fn overloaded_scorer_failure_is_transient() {
        let scorer = RejectingScorer(|| AiError::Api { status: 503, body: "overloaded".into() });
        let items = vec![ScoringItem::from_article(&scored(1)[0])];
        let outcome = score_batch(&scorer, "ctx", &items, Duration::from_secs(5)).await;

        let BatchOutcome::Failed(failure) = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(failure.is_transient());
        assert!(failure.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn rejected_request_is_not_transient() {
        let scorer = RejectingScorer(|| AiError::Api { status: 400, body: "bad request".into() });
        let items = vec![ScoringItem::from_article(&scored(1)[0])];
        let outcome = score_batch(&scorer, "ctx", &items, Duration::from_secs(5)).await;
        assert!(matches!(
            outcome,
            BatchOutcome::Failed(BatchFailure::Scorer { transient: false, .. })
        ));

        let plain = StubScorer::constant(50).failing_when_title_contains("update");
        let outcome = score_batch(&plain, "ctx", &items, Duration::from_secs(5)).await;
        assert!(matches!(
            outcome,
            BatchOutcome::Failed(BatchFailure::Scorer { transient: false, .. })
        ));
    }

    #[tokio::test]
    async fn slow_batches_time_out() {
        let scorer = StubScorer::constant(60).with_delay(Duration::from_millis(200));
        let mut articles = scored(2);
        let opts = ScoringOptions {
            batch_timeout: Duration::from_millis(20),
            ..options(2)
        };
        let report = score_articles(&scorer, "ctx", &mut articles, opts, pending()).await;
        assert_eq!(report.batches_failed, 1);
        assert!(articles.iter().all(|a| a.relevance_score.is_none()));
    }

    #[tokio::test]
    async fn stop_signal_abandons_in_flight_batches() {
        let scorer = StubScorer::constant(60).with_delay(Duration::from_secs(30));
        let mut articles = scored(3);
        let report = score_articles(
            &scorer,
            "ctx",
            &mut articles,
            options(1),
            tokio::time::sleep(Duration::from_millis(10)),
        )
        .await;
        assert_eq!(report.batches_abandoned, 3);
        assert!(articles.iter().all(|a| a.relevance_score.is_none()));
    }
}
