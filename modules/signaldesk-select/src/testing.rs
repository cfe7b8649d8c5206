// Test mocks for the selection pipeline.
//
// One mock per collaborator boundary:
// - MockCorpus (EmbeddingStore + ArticleStore): in-memory articles and matches
// - MockProfiles (ProfileStore): organizations and their targets
// - MockConnections (ConnectionFinder): canned connection rows
// - StubScorer (RelevanceScorer): deterministic scores, canned text, delays
//
// Plus fixture helpers for articles, targets, candidates and profiles.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use signaldesk_common::{
    Article, CandidateMatch, CrossTargetConnection, EmbeddingMatch, Industry, OrganizationProfile,
    SignalStrength, SourcePriorityLists, Target, TargetPriority, TargetType,
};

use crate::scoring::{ScorerReply, ScoringItem};
use crate::traits::{ArticleStore, ConnectionFinder, EmbeddingStore, ProfileStore, RelevanceScorer};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Stable id for a target name, so candidates and targets built separately
/// agree.
pub fn target_id(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

pub fn target(name: &str) -> Target {
    Target {
        id: target_id(name),
        name: name.to_string(),
        target_type: TargetType::Company,
        priority: TargetPriority::Medium,
    }
}

/// A well-formed article published an hour ago.
pub fn article(title: &str, source: &str) -> Article {
    article_at(title, source, Utc::now() - chrono::Duration::hours(1))
}

pub fn article_at(title: &str, source: &str, published_at: DateTime<Utc>) -> Article {
    let id = Uuid::new_v4();
    Article {
        id,
        title: title.to_string(),
        description: None,
        url: format!("https://news.example.com/{id}"),
        source_name: source.to_string(),
        published_at: Some(published_at),
        created_at: Some(published_at),
    }
}

pub fn candidate(
    target_name: &str,
    article: &Article,
    similarity_score: f64,
    signal_strength: SignalStrength,
) -> CandidateMatch {
    CandidateMatch {
        target_id: target_id(target_name),
        target_name: target_name.to_string(),
        article: article.clone(),
        similarity_score,
        signal_strength,
        signal_category: "general".to_string(),
    }
}

pub fn profile(industry: Industry) -> OrganizationProfile {
    OrganizationProfile {
        id: Uuid::new_v4(),
        name: "Northwind Agency".to_string(),
        industry,
        description: Some("Independent brand and communications agency".to_string()),
        service_lines: vec!["brand strategy".to_string(), "media relations".to_string()],
        competitors: vec!["Contoso Partners".to_string()],
        strategic_priorities: vec!["retail media".to_string()],
        source_priorities: SourcePriorityLists::default(),
    }
}

// ---------------------------------------------------------------------------
// MockCorpus
// ---------------------------------------------------------------------------

/// Articles plus per-target embedding matches. Builder pattern:
/// `.with_match()`, `.failing_target()`, `.failing_articles()`.
#[derive(Default)]
pub struct MockCorpus {
    articles: HashMap<Uuid, Article>,
    matches: HashMap<Uuid, Vec<EmbeddingMatch>>,
    failing_targets: HashSet<Uuid>,
    fail_articles: bool,
    queried: Mutex<Vec<Uuid>>,
}

impl MockCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_match(
        mut self,
        target: &Target,
        article: &Article,
        similarity_score: f64,
        signal_strength: SignalStrength,
    ) -> Self {
        self.articles.insert(article.id, article.clone());
        self.matches.entry(target.id).or_default().push(EmbeddingMatch {
            article_id: article.id,
            similarity_score,
            signal_strength,
            signal_category: "general".to_string(),
        });
        self
    }

    /// Register a match whose article is missing from the article store.
    pub fn with_dangling_match(mut self, target: &Target, article_id: Uuid, similarity_score: f64) -> Self {
        self.matches.entry(target.id).or_default().push(EmbeddingMatch {
            article_id,
            similarity_score,
            signal_strength: SignalStrength::Strong,
            signal_category: "general".to_string(),
        });
        self
    }

    pub fn failing_target(mut self, target: &Target) -> Self {
        self.failing_targets.insert(target.id);
        self
    }

    pub fn failing_articles(mut self) -> Self {
        self.fail_articles = true;
        self
    }

    /// Target ids in the order they were queried.
    pub fn queried_targets(&self) -> Vec<Uuid> {
        self.queried.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmbeddingStore for MockCorpus {
    async fn matches_for_target(
        &self,
        target_id: Uuid,
        min_strength: SignalStrength,
        _since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<EmbeddingMatch>> {
        if let Ok(mut q) = self.queried.lock() {
            q.push(target_id);
        }
        if self.failing_targets.contains(&target_id) {
            bail!("MockCorpus: embedding store unavailable for target {target_id}");
        }
        let mut matches: Vec<EmbeddingMatch> = self
            .matches
            .get(&target_id)
            .map(|m| {
                m.iter()
                    .filter(|m| m.signal_strength >= min_strength)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matches.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        matches.truncate(limit);
        Ok(matches)
    }
}

#[async_trait]
impl ArticleStore for MockCorpus {
    async fn articles_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Article>> {
        if self.fail_articles {
            bail!("MockCorpus: article store unavailable");
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.articles.get(id).cloned())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MockProfiles
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockProfiles {
    organizations: HashMap<Uuid, OrganizationProfile>,
    targets: HashMap<Uuid, Vec<Target>>,
    unavailable: bool,
}

impl MockProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_organization(mut self, profile: OrganizationProfile, targets: Vec<Target>) -> Self {
        self.targets.insert(profile.id, targets);
        self.organizations.insert(profile.id, profile);
        self
    }

    /// Every call errors.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

#[async_trait]
impl ProfileStore for MockProfiles {
    async fn organization(&self, organization_id: Uuid) -> Result<Option<OrganizationProfile>> {
        if self.unavailable {
            bail!("MockProfiles: profile store unavailable");
        }
        Ok(self.organizations.get(&organization_id).cloned())
    }

    async fn active_targets(&self, organization_id: Uuid) -> Result<Vec<Target>> {
        if self.unavailable {
            bail!("MockProfiles: profile store unavailable");
        }
        Ok(self.targets.get(&organization_id).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MockConnections
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockConnections {
    connections: Vec<CrossTargetConnection>,
    fail: bool,
}

impl MockConnections {
    pub fn new(connections: Vec<CrossTargetConnection>) -> Self {
        Self {
            connections,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            connections: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl ConnectionFinder for MockConnections {
    async fn cross_target_connections(
        &self,
        _organization_id: Uuid,
        _min_targets: usize,
        _since: DateTime<Utc>,
    ) -> Result<Vec<CrossTargetConnection>> {
        if self.fail {
            bail!("MockConnections: connection finder unavailable");
        }
        Ok(self.connections.clone())
    }
}

// ---------------------------------------------------------------------------
// StubScorer
// ---------------------------------------------------------------------------

type ScoreFn = Box<dyn Fn(&ScoringItem) -> u8 + Send + Sync>;

enum StubReply {
    Constant(u8),
    Text(String),
    Computed(ScoreFn),
}

/// Deterministic `RelevanceScorer`.
pub struct StubScorer {
    reply: StubReply,
    fail_on_title: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubScorer {
    fn with_reply(reply: StubReply) -> Self {
        Self {
            reply,
            fail_on_title: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every item gets `score`.
    pub fn constant(score: u8) -> Self {
        Self::with_reply(StubReply::Constant(score))
    }

    /// Every batch gets the same raw text, parsed by the scoring client.
    pub fn replying(text: &str) -> Self {
        Self::with_reply(StubReply::Text(text.to_string()))
    }

    /// Each item's score is computed from the item.
    pub fn computed(f: impl Fn(&ScoringItem) -> u8 + Send + Sync + 'static) -> Self {
        Self::with_reply(StubReply::Computed(Box::new(f)))
    }

    /// Batches containing an item whose title contains `needle` error out.
    pub fn failing_when_title_contains(mut self, needle: &str) -> Self {
        self.fail_on_title = Some(needle.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of batches received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelevanceScorer for StubScorer {
    async fn score_batch(
        &self,
        _intelligence_context: &str,
        items: &[ScoringItem],
    ) -> Result<ScorerReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(needle) = &self.fail_on_title {
            if items.iter().any(|i| i.title.contains(needle.as_str())) {
                bail!("StubScorer: upstream error");
            }
        }
        Ok(match &self.reply {
            StubReply::Constant(score) => ScorerReply::Scores(vec![*score as i64; items.len()]),
            StubReply::Text(text) => ScorerReply::Text(text.clone()),
            StubReply::Computed(f) => {
                ScorerReply::Scores(items.iter().map(|i| f(i) as i64).collect())
            }
        })
    }

    fn name(&self) -> &str {
        "stub"
    }
}
