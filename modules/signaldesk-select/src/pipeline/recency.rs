//! Recency filter.
//!
//! A trustworthy `published_at` is held to the strict window. Without one,
//! `created_at` is accepted against the fallback window, except for sources
//! whose scrapers are known to surface old undated content.

use chrono::{DateTime, Duration, Utc};

use signaldesk_common::{Article, SelectionConfig};

use super::sources::normalize_source;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecencyVerdict {
    Fresh,
    /// `published_at` further in the future than the tolerance allows.
    FutureDated,
    /// Older than the applicable window.
    Stale,
    /// Undated article from a source that must provide a publish date.
    MissingPublishedDate,
    /// Neither timestamp present.
    Undated,
}

impl RecencyVerdict {
    pub fn is_fresh(&self) -> bool {
        matches!(self, RecencyVerdict::Fresh)
    }
}

/// Request-scoped recency rules.
#[derive(Debug, Clone)]
pub struct RecencyPolicy {
    pub strict_window: Duration,
    pub fallback_window: Duration,
    pub future_tolerance: Duration,
    /// Normalised source names.
    requires_published_date: Vec<String>,
}

impl RecencyPolicy {
    pub fn new(
        strict_window: Duration,
        fallback_window: Duration,
        future_tolerance: Duration,
        requires_published_date: &[String],
    ) -> Self {
        Self {
            strict_window,
            fallback_window,
            future_tolerance,
            requires_published_date: requires_published_date
                .iter()
                .map(|s| normalize_source(s))
                .collect(),
        }
    }

    /// Build from config with the request's strict window.
    pub fn from_config(config: &SelectionConfig, strict_window: Duration) -> Self {
        Self::new(
            strict_window,
            Duration::hours(config.fallback_window_hours),
            Duration::hours(config.future_tolerance_hours),
            &config.requires_published_date,
        )
    }

    pub fn requires_published_date(&self, source_name: &str) -> bool {
        let key = normalize_source(source_name);
        self.requires_published_date.iter().any(|s| *s == key)
    }

    pub fn verdict(&self, article: &Article, now: DateTime<Utc>) -> RecencyVerdict {
        if let Some(published) = article.published_at {
            if published > now + self.future_tolerance {
                return RecencyVerdict::FutureDated;
            }
            if published < now - self.strict_window {
                return RecencyVerdict::Stale;
            }
            return RecencyVerdict::Fresh;
        }

        if self.requires_published_date(&article.source_name) {
            return RecencyVerdict::MissingPublishedDate;
        }

        match article.created_at {
            Some(created) if created < now - self.fallback_window => RecencyVerdict::Stale,
            Some(_) => RecencyVerdict::Fresh,
            None => RecencyVerdict::Undated,
        }
    }

    pub fn is_recent(&self, article: &Article, now: DateTime<Utc>) -> bool {
        self.verdict(article, now).is_fresh()
    }
}
