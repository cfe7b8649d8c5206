//! Pipeline entry point: request in, ranked and grouped selection out.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use signaldesk_common::{CrossTargetConnection, SelectionConfig, SignalStrength};

use super::aggregate::{aggregate, fetch_all, CandidateQuery, CandidateScreen};
use super::article::{ScoreOrigin, SelectedArticle};
use super::assembler::{group_by_target, source_distribution, tidy_connections, TargetSignals};
use super::capper::cap_by_source_tier;
use super::ranker::{rank, DiversityLimits};
use super::recency::RecencyPolicy;
use super::sources::SourcePolicy;
use super::stats::SelectionStats;
use crate::error::SelectionError;
use crate::scoring::{finalize_scores, intelligence_context, score_articles, ScoringOptions};
use crate::traits::{ArticleStore, ConnectionFinder, EmbeddingStore, ProfileStore, RelevanceScorer};

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

/// One year.
const MAX_HOURS_BACK: i64 = 24 * 365;

fn default_true() -> bool {
    true
}

/// One selection request. Unset fields fall back to `SelectionConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    /// Lookback in hours. Mutually exclusive with `use_today_boundary`.
    #[serde(default)]
    pub hours_back: Option<i64>,
    /// Look back to the most recent UTC midnight.
    #[serde(default)]
    pub use_today_boundary: bool,
    #[serde(default)]
    pub min_signal_strength: Option<SignalStrength>,
    #[serde(default)]
    pub max_articles_per_target: Option<usize>,
    #[serde(default = "default_true")]
    pub include_connections: bool,
    /// Diagnostics: assign embedding-derived scores without calling the scorer.
    #[serde(default)]
    pub skip_scoring: bool,
    /// Overall deadline. Scoring still in flight when it passes is abandoned.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for SelectionRequest {
    fn default() -> Self {
        Self {
            organization_id: None,
            hours_back: None,
            use_today_boundary: false,
            min_signal_strength: None,
            max_articles_per_target: None,
            include_connections: true,
            skip_scoring: false,
            timeout_secs: None,
        }
    }
}

impl SelectionRequest {
    pub fn for_organization(organization_id: Uuid) -> Self {
        Self {
            organization_id: Some(organization_id),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<Uuid, SelectionError> {
        let id = self.organization_id.ok_or(SelectionError::MissingOrganization)?;
        if self.hours_back.is_some() && self.use_today_boundary {
            return Err(SelectionError::InvalidRequest(
                "hours_back and use_today_boundary are mutually exclusive".into(),
            ));
        }
        if matches!(self.hours_back, Some(h) if h <= 0 || h > MAX_HOURS_BACK) {
            return Err(SelectionError::InvalidRequest(format!(
                "hours_back must be between 1 and {MAX_HOURS_BACK}"
            )));
        }
        if self.max_articles_per_target == Some(0) {
            return Err(SelectionError::InvalidRequest(
                "max_articles_per_target must be greater than zero".into(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(SelectionError::InvalidRequest(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(id)
    }

    /// Start of the lookback window.
    pub fn since(&self, now: DateTime<Utc>, config: &SelectionConfig) -> DateTime<Utc> {
        if self.use_today_boundary {
            return now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc())
                .unwrap_or(now);
        }
        now - Duration::hours(self.hours_back.unwrap_or(config.default_hours_back))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionResult {
    pub organization_id: Uuid,
    pub since: DateTime<Utc>,
    /// Final set in ranking order.
    pub articles: Vec<SelectedArticle>,
    pub source_distribution: BTreeMap<String, usize>,
    pub target_signals: Vec<TargetSignals>,
    pub connections: Vec<CrossTargetConnection>,
    pub stats: SelectionStats,
    pub selection_duration_ms: u64,
}

impl SelectionResult {
    fn empty(organization_id: Uuid, since: DateTime<Utc>, stats: SelectionStats, started: Instant) -> Self {
        info!("{stats}");
        Self {
            organization_id,
            since,
            articles: Vec::new(),
            source_distribution: BTreeMap::new(),
            target_signals: Vec::new(),
            connections: Vec::new(),
            stats,
            selection_duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

// ---------------------------------------------------------------------------
// ArticleSelector
// ---------------------------------------------------------------------------

/// Collaborators and tuning for the selection pipeline. Holds no per-run
/// state, so one instance serves concurrent requests.
#[derive(Clone, TypedBuilder)]
pub struct ArticleSelector {
    pub embeddings: Arc<dyn EmbeddingStore>,
    pub articles: Arc<dyn ArticleStore>,
    pub profiles: Arc<dyn ProfileStore>,
    #[builder(default, setter(strip_option))]
    pub connections: Option<Arc<dyn ConnectionFinder>>,
    /// `None` forces skip-scoring mode.
    #[builder(default)]
    pub scorer: Option<Arc<dyn RelevanceScorer>>,
    #[builder(default)]
    pub config: SelectionConfig,
}

/// Resolves when the run is cancelled or its deadline passes.
async fn stop_signal(cancel: CancellationToken, deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep_until(at) => {}
            }
        }
        None => cancel.cancelled().await,
    }
}

impl ArticleSelector {
    pub async fn select(&self, request: &SelectionRequest) -> Result<SelectionResult, SelectionError> {
        self.run(request, Utc::now(), &CancellationToken::new()).await
    }

    /// Run the full pipeline as of `now`. Only input errors and an unknown
    /// organization are returned as errors; every collaborator failure
    /// degrades into a smaller (possibly empty) result.
    pub async fn run(
        &self,
        request: &SelectionRequest,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<SelectionResult, SelectionError> {
        let organization_id = request.validate()?;
        self.config
            .validate()
            .map_err(|e| SelectionError::InvalidConfig(e.to_string()))?;
        let started = Instant::now();
        let deadline = request
            .timeout_secs
            .map(|secs| tokio::time::Instant::now() + StdDuration::from_secs(secs));
        let config = &self.config;
        let since = request.since(now, config);
        let mut stats = SelectionStats::default();

        info!(%organization_id, %since, "Starting article selection");

        // 1. Organization profile and targets
        let profile = match self.profiles.organization(organization_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return Err(SelectionError::OrganizationNotFound(organization_id)),
            Err(e) => {
                warn!(%organization_id, error = %e, "Profile store unavailable");
                stats.profile_unavailable = true;
                return Ok(SelectionResult::empty(organization_id, since, stats, started));
            }
        };

        let targets = match self.profiles.active_targets(organization_id).await {
            Ok(targets) => targets,
            Err(e) => {
                warn!(%organization_id, error = %e, "Failed to load active targets");
                stats.profile_unavailable = true;
                return Ok(SelectionResult::empty(organization_id, since, stats, started));
            }
        };
        if targets.is_empty() {
            info!(%organization_id, "No active targets");
            return Ok(SelectionResult::empty(organization_id, since, stats, started));
        }

        // 2. Concurrent fetch, sequential fold
        let query = CandidateQuery {
            min_strength: request
                .min_signal_strength
                .unwrap_or(config.default_min_signal_strength),
            since,
            limit: request
                .max_articles_per_target
                .unwrap_or(config.default_max_articles_per_target),
        };
        let fetch = fetch_all(
            self.embeddings.as_ref(),
            self.articles.as_ref(),
            &targets,
            query,
            config.target_fetch_concurrency,
            stop_signal(cancel.clone(), deadline),
        )
        .await;
        stats.targets_queried = targets.len() as u32;
        stats.targets_failed = fetch.failed as u32;
        if stats.all_targets_failed() {
            warn!(%organization_id, targets = targets.len(), "Every target fetch failed");
        }

        let screen = CandidateScreen {
            now,
            recency: RecencyPolicy::from_config(config, now - since),
            sources: SourcePolicy::for_organization(&profile),
        };
        let (map, tally) = aggregate(&fetch.fetched, &screen);
        stats.record_filters(&tally);
        stats.articles_aggregated = map.len() as u32;

        // 3. Bound scorer volume
        let mut capped = cap_by_source_tier(map, &config.tier_caps, config.max_candidates_to_score);
        stats.post_cap = capped.len() as u32;

        // 4. Score
        match self.scorer.as_deref() {
            Some(scorer) if !request.skip_scoring => {
                let context = intelligence_context(&profile, &targets);
                let report = score_articles(
                    scorer,
                    &context,
                    &mut capped,
                    ScoringOptions::from_config(config),
                    stop_signal(cancel.clone(), deadline),
                )
                .await;
                stats.record_scoring(&report);
            }
            Some(_) => {
                info!("Scoring skipped by request, using embedding scores");
                stats.scoring_skipped = true;
            }
            None => {
                warn!("No relevance scorer configured, using embedding scores");
                stats.scoring_skipped = true;
            }
        }

        let finalized = finalize_scores(capped);
        stats.scored_by_model = finalized
            .iter()
            .filter(|a| a.score_origin == ScoreOrigin::Model)
            .count() as u32;
        stats.scored_by_fallback = finalized.len() as u32 - stats.scored_by_model;

        // 5. Rank with diversity
        let ranked = rank(finalized, DiversityLimits::from_config(config));
        stats.dropped_by_diversity = ranked.dropped_by_diversity as u32;
        stats.final_count = ranked.accepted.len() as u32;

        // 6. Assemble
        let target_signals = group_by_target(&ranked.accepted, &targets);
        let distribution = source_distribution(&ranked.accepted);
        let connections = if request.include_connections {
            self.find_connections(organization_id, since).await
        } else {
            Vec::new()
        };
        stats.connections = connections.len() as u32;

        info!("{stats}");
        Ok(SelectionResult {
            organization_id,
            since,
            articles: ranked.accepted,
            source_distribution: distribution,
            target_signals,
            connections,
            stats,
            selection_duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn find_connections(&self, organization_id: Uuid, since: DateTime<Utc>) -> Vec<CrossTargetConnection> {
        let Some(finder) = self.connections.as_deref() else {
            return Vec::new();
        };
        let min_targets = self.config.connection_min_targets;
        match finder.cross_target_connections(organization_id, min_targets, since).await {
            Ok(connections) => tidy_connections(connections, min_targets),
            Err(e) => {
                warn!(%organization_id, error = %e, "Connection finder failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_organization_is_an_input_error() {
        let err = SelectionRequest::default().validate().unwrap_err();
        assert!(matches!(err, SelectionError::MissingOrganization));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn conflicting_lookbacks_rejected() {
        let request = SelectionRequest {
            hours_back: Some(12),
            use_today_boundary: true,
            ..SelectionRequest::for_organization(Uuid::new_v4())
        };
        assert!(matches!(request.validate(), Err(SelectionError::InvalidRequest(_))));
    }

    #[test]
    fn since_defaults_to_config_lookback() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 15, 30, 0).unwrap();
        let request = SelectionRequest::for_organization(Uuid::new_v4());
        let config = SelectionConfig::default();
        assert_eq!(request.since(now, &config), now - Duration::hours(24));

        let request = SelectionRequest {
            hours_back: Some(6),
            ..request
        };
        assert_eq!(request.since(now, &config), now - Duration::hours(6));
    }

    #[test]
    fn today_boundary_is_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 15, 30, 0).unwrap();
        let request = SelectionRequest {
            use_today_boundary: true,
            ..SelectionRequest::for_organization(Uuid::new_v4())
        };
        assert_eq!(
            request.since(now, &SelectionConfig::default()),
            Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let request: SelectionRequest = serde_json::from_value(serde_json::json!({
            "organization_id": Uuid::nil(),
        }))
        .unwrap();
        assert!(request.include_connections);
        assert!(!request.skip_scoring);
        assert_eq!(request.hours_back, None);
    }
}
