use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use signaldesk_common::{
    Article, ConnectionTarget, CrossTargetConnection, EmbeddingMatch, Industry,
    OrganizationProfile, SignalStrength, SourcePriorityLists, Target, TargetPriority, TargetType,
};

use crate::traits::{ArticleStore, ConnectionFinder, EmbeddingStore, ProfileStore};

/// Postgres-backed read side for every selection collaborator except the
/// scorer.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

type ArticleRow = (
    Uuid,
    String,
    Option<String>,
    String,
    String,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

type OrganizationRow = (
    Uuid,
    String,
    String,
    Option<String>,
    Vec<String>,
    Vec<String>,
    Vec<String>,
    Vec<String>,
    Vec<String>,
    Vec<String>,
);

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;
        info!(max_connections, "Connected to database");
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn article_from_row(row: ArticleRow) -> Article {
    let (id, title, description, url, source_name, published_at, created_at) = row;
    Article {
        id,
        title,
        description,
        url,
        source_name,
        published_at,
        created_at,
    }
}

#[async_trait]
impl EmbeddingStore for PgStore {
    async fn matches_for_target(
        &self,
        target_id: Uuid,
        min_strength: SignalStrength,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<EmbeddingMatch>> {
        let strengths: Vec<String> = min_strength
            .at_or_above()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let rows = sqlx::query_as::<_, (Uuid, f64, String, String)>(
            r#"
            SELECT article_id, similarity_score, signal_strength, signal_category
            FROM article_target_matches
            WHERE target_id = $1
              AND signal_strength = ANY($2)
              AND matched_at >= $3
            ORDER BY similarity_score DESC, article_id
            LIMIT $4
            "#,
        )
        .bind(target_id)
        .bind(&strengths)
        .bind(since)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(article_id, similarity_score, strength, signal_category)| {
                match strength.parse::<SignalStrength>() {
                    Ok(signal_strength) => Some(EmbeddingMatch {
                        article_id,
                        similarity_score,
                        signal_strength,
                        signal_category,
                    }),
                    Err(e) => {
                        warn!(%article_id, error = %e, "Skipping match with unknown strength");
                        None
                    }
                }
            })
            .collect())
    }
}

#[async_trait]
impl ArticleStore for PgStore {
    async fn articles_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Article>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT id, title, description, url, source_name, published_at, created_at
            FROM articles
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(article_from_row).collect())
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn organization(&self, organization_id: Uuid) -> Result<Option<OrganizationProfile>> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, name, industry, description,
                   service_lines, competitors, strategic_priorities,
                   critical_sources, high_sources, blocked_sources
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((
            id,
            name,
            industry,
            description,
            service_lines,
            competitors,
            strategic_priorities,
            critical,
            high,
            blocked,
        )) = row
        else {
            return Ok(None);
        };

        Ok(Some(OrganizationProfile {
            id,
            name,
            industry: industry.parse().unwrap_or(Industry::Other),
            description,
            service_lines,
            competitors,
            strategic_priorities,
            source_priorities: SourcePriorityLists {
                critical,
                high,
                blocked,
            },
        }))
    }

    async fn active_targets(&self, organization_id: Uuid) -> Result<Vec<Target>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, String)>(
            r#"
            SELECT id, name, target_type, priority
            FROM intelligence_targets
            WHERE organization_id = $1 AND active
            ORDER BY name, id
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, target_type, priority)| Target {
                id,
                name,
                target_type: target_type.parse().unwrap_or(TargetType::Other),
                priority: priority.parse().unwrap_or(TargetPriority::Medium),
            })
            .collect())
    }
}

#[async_trait]
impl ConnectionFinder for PgStore {
    async fn cross_target_connections(
        &self,
        organization_id: Uuid,
        min_targets: usize,
        since: DateTime<Utc>,
    ) -> Result<Vec<CrossTargetConnection>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, Uuid, String, f64)>(
            r#"
            WITH recent AS (
                SELECT m.article_id, m.target_id, m.similarity_score, t.name AS target_name
                FROM article_target_matches m
                JOIN intelligence_targets t ON t.id = m.target_id
                WHERE t.organization_id = $1
                  AND t.active
                  AND m.matched_at >= $2
            ),
            connected AS (
                SELECT article_id
                FROM recent
                GROUP BY article_id
                HAVING COUNT(DISTINCT target_id) >= $3
            )
            SELECT a.id, a.title, a.source_name, r.target_id, r.target_name, r.similarity_score
            FROM recent r
            JOIN connected c ON c.article_id = r.article_id
            JOIN articles a ON a.id = r.article_id
            ORDER BY a.id, r.similarity_score DESC
            "#,
        )
        .bind(organization_id)
        .bind(since)
        .bind(min_targets as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: BTreeMap<Uuid, CrossTargetConnection> = BTreeMap::new();
        for (article_id, title, source_name, target_id, target_name, similarity) in rows {
            grouped
                .entry(article_id)
                .or_insert_with(|| CrossTargetConnection {
                    article_id,
                    title,
                    source_name,
                    targets: Vec::new(),
                })
                .targets
                .push(ConnectionTarget {
                    target_id,
                    target_name,
                    similarity,
                });
        }
        Ok(grouped.into_values().collect())
    }
}
