use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::SignalDeskError;

/// Industry an organization operates in. Drives which outlets count as
/// industry-relevant (tier 2) or industry-irrelevant (dropped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Marketing,
    PublicRelations,
    Technology,
    FinancialServices,
    Healthcare,
    Energy,
    Retail,
    #[serde(other)]
    Other,
}

impl Industry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::Marketing => "marketing",
            Industry::PublicRelations => "public_relations",
            Industry::Technology => "technology",
            Industry::FinancialServices => "financial_services",
            Industry::Healthcare => "healthcare",
            Industry::Energy => "energy",
            Industry::Retail => "retail",
            Industry::Other => "other",
        }
    }

    /// Human label used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Industry::Marketing => "marketing and advertising",
            Industry::PublicRelations => "public relations and communications",
            Industry::Technology => "technology",
            Industry::FinancialServices => "financial services",
            Industry::Healthcare => "healthcare",
            Industry::Energy => "energy",
            Industry::Retail => "retail and consumer goods",
            Industry::Other => "general business",
        }
    }
}

impl std::fmt::Display for Industry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Industry {
    type Err = SignalDeskError;

    /// Lenient: free-text industries from profile forms map onto the closest
    /// known variant, anything unrecognised becomes `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let industry = match lower.as_str() {
            "marketing" | "advertising" | "marketing_advertising" | "agency" => Industry::Marketing,
            "public_relations" | "pr" | "communications" | "public relations" => {
                Industry::PublicRelations
            }
            "technology" | "tech" | "software" | "saas" => Industry::Technology,
            "financial_services" | "finance" | "fintech" | "banking" | "financial services" => {
                Industry::FinancialServices
            }
            "healthcare" | "health" | "pharma" | "life_sciences" => Industry::Healthcare,
            "energy" | "utilities" | "oil_and_gas" => Industry::Energy,
            "retail" | "consumer" | "cpg" | "ecommerce" => Industry::Retail,
            _ => Industry::Other,
        };
        Ok(industry)
    }
}

/// Organization-configured source overrides. Names are matched
/// case-insensitively against `Article::source_name`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcePriorityLists {
    #[serde(default)]
    pub critical: Vec<String>,
    #[serde(default)]
    pub high: Vec<String>,
    #[serde(default)]
    pub blocked: Vec<String>,
}

/// Per-organization configuration from the profile store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationProfile {
    pub id: Uuid,
    pub name: String,
    pub industry: Industry,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub service_lines: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<String>,
    #[serde(default)]
    pub strategic_priorities: Vec<String>,
    #[serde(default)]
    pub source_priorities: SourcePriorityLists,
}
