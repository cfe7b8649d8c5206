// Trait abstractions for the selection pipeline's collaborators.
//
// EmbeddingStore, ArticleStore, ProfileStore and ConnectionFinder are
// read-only views over data produced elsewhere (embedding jobs, scrapers,
// profile editors). RelevanceScorer is the expensive, unreliable model call.
//
// PgStore implements the four stores; ClaudeScorer implements the scorer.
// The mocks in `testing` implement all five for deterministic tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use signaldesk_common::{
    Article, CrossTargetConnection, EmbeddingMatch, OrganizationProfile, SignalStrength, Target,
};

use crate::scoring::{ScorerReply, ScoringItem};

// ---------------------------------------------------------------------------
// EmbeddingStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Precomputed matches for one target with strength at or above
    /// `min_strength`, matched since `since`, ordered by similarity
    /// descending and bounded by `limit`.
    async fn matches_for_target(
        &self,
        target_id: Uuid,
        min_strength: SignalStrength,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<EmbeddingMatch>>;
}

// ---------------------------------------------------------------------------
// ArticleStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Batch fetch by id. Unknown ids are silently absent from the result.
    async fn articles_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Article>>;
}

// ---------------------------------------------------------------------------
// ProfileStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` means the organization does not exist.
    async fn organization(&self, organization_id: Uuid) -> Result<Option<OrganizationProfile>>;

    /// Targets currently being monitored for the organization.
    async fn active_targets(&self, organization_id: Uuid) -> Result<Vec<Target>>;
}

// ---------------------------------------------------------------------------
// ConnectionFinder
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ConnectionFinder: Send + Sync {
    /// Articles matched by at least `min_targets` distinct targets of the
    /// organization since `since`.
    async fn cross_target_connections(
        &self,
        organization_id: Uuid,
        min_targets: usize,
        since: DateTime<Utc>,
    ) -> Result<Vec<CrossTargetConnection>>;
}

// ---------------------------------------------------------------------------
// RelevanceScorer
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Score one batch. The reply should hold exactly one score per item, in
    /// item order, but callers must not trust that.
    async fn score_batch(
        &self,
        intelligence_context: &str,
        items: &[ScoringItem],
    ) -> Result<ScorerReply>;

    fn name(&self) -> &str;
}
