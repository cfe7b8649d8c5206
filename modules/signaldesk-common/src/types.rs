use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::SignalDeskError;

// --- Articles ---

/// A scraped document as stored by the article store. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub source_name: String,
    /// Publish date extracted by the scraper, when it found one.
    pub published_at: Option<DateTime<Utc>>,
    /// When the scraper stored the row. Used as a fallback timestamp.
    pub created_at: Option<DateTime<Utc>>,
}

// --- Signal strength ---

/// Ordinal confidence label attached to an embedding match.
/// Declaration order gives `Weak < Moderate < Strong`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStrength {
    Weak,
    Moderate,
    Strong,
}

impl SignalStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStrength::Weak => "weak",
            SignalStrength::Moderate => "moderate",
            SignalStrength::Strong => "strong",
        }
    }

    /// Every strength label at or above `self`, strongest first.
    pub fn at_or_above(self) -> Vec<SignalStrength> {
        [SignalStrength::Strong, SignalStrength::Moderate, SignalStrength::Weak]
            .into_iter()
            .filter(|s| *s >= self)
            .collect()
    }
}

impl std::fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SignalStrength {
    type Err = SignalDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weak" => Ok(SignalStrength::Weak),
            "moderate" => Ok(SignalStrength::Moderate),
            "strong" => Ok(SignalStrength::Strong),
            other => Err(SignalDeskError::UnknownValue {
                field: "signal_strength",
                value: other.to_string(),
            }),
        }
    }
}

// --- Targets ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Company,
    Topic,
    Person,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetType::Company => write!(f, "company"),
            TargetType::Topic => write!(f, "topic"),
            TargetType::Person => write!(f, "person"),
            TargetType::Other => write!(f, "other"),
        }
    }
}

impl FromStr for TargetType {
    type Err = SignalDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "company" | "competitor" | "client" => TargetType::Company,
            "topic" | "theme" => TargetType::Topic,
            "person" | "executive" => TargetType::Person,
            _ => TargetType::Other,
        })
    }
}

/// Monitoring priority of a target. Declaration order gives
/// `High < Medium < Low`, so an ascending sort puts high priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPriority {
    High,
    Medium,
    Low,
}

impl FromStr for TargetPriority {
    type Err = SignalDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "critical" => Ok(TargetPriority::High),
            "medium" | "normal" => Ok(TargetPriority::Medium),
            "low" => Ok(TargetPriority::Low),
            other => Err(SignalDeskError::UnknownValue {
                field: "target_priority",
                value: other.to_string(),
            }),
        }
    }
}

/// An intelligence target (company, topic, person) an organization monitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub target_type: TargetType,
    pub priority: TargetPriority,
}

// --- Embedding matches ---

/// One row from the embedding similarity store, before the article is joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMatch {
    pub article_id: Uuid,
    pub similarity_score: f64,
    pub signal_strength: SignalStrength,
    pub signal_category: String,
}

/// An (article, target) pairing surfaced by the embedding store, with the
/// article metadata joined in.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMatch {
    pub target_id: Uuid,
    pub target_name: String,
    pub article: Article,
    pub similarity_score: f64,
    pub signal_strength: SignalStrength,
    pub signal_category: String,
}

// --- Cross-target connections ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    pub target_id: Uuid,
    pub target_name: String,
    pub similarity: f64,
}

/// An article matched by two or more distinct targets within the lookback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossTargetConnection {
    pub article_id: Uuid,
    pub title: String,
    pub source_name: String,
    pub targets: Vec<ConnectionTarget>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_ordering_is_weak_moderate_strong() {
        assert!(SignalStrength::Weak < SignalStrength::Moderate);
        assert!(SignalStrength::Moderate < SignalStrength::Strong);
    }

    #[test]
    fn at_or_above_moderate_excludes_weak() {
        assert_eq!(
            SignalStrength::Moderate.at_or_above(),
            vec![SignalStrength::Strong, SignalStrength::Moderate]
        );
        assert_eq!(SignalStrength::Weak.at_or_above().len(), 3);
    }

    #[test]
    fn strength_parses_case_insensitively() {
        assert_eq!("Strong".parse::<SignalStrength>().unwrap(), SignalStrength::Strong);
        assert!("very strong".parse::<SignalStrength>().is_err());
    }

    #[test]
    fn target_type_round_trips_through_serde() {
        let target = Target {
            id: Uuid::nil(),
            name: "Acme".into(),
            target_type: TargetType::Company,
            priority: TargetPriority::High,
        };
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json["type"], "company");
        assert_eq!(json["priority"], "high");
    }

    #[test]
    fn unknown_target_type_maps_to_other() {
        let parsed: TargetType = serde_json::from_str("\"regulator\"").unwrap();
        assert_eq!(parsed, TargetType::Other);
    }
}
