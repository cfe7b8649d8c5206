//! Source classification: blocked, industry-irrelevant, or a tier.
//!
//! Built-in lists are merged with the organization's own priority lists once
//! per request into a `SourcePolicy`. All comparisons use normalised names.

use std::collections::HashSet;

use signaldesk_common::{Industry, OrganizationProfile};

use super::article::SourceTier;

/// Press-release distributors and content farms. Never worth scoring.
pub const ALWAYS_BLOCKED: &[&str] = &[
    "PR Newswire",
    "Business Wire",
    "GlobeNewswire",
    "Globe Newswire",
    "Accesswire",
    "EIN Presswire",
    "PRWeb",
    "Newsfile",
    "openPR",
    "Benzinga Press Releases",
    "MarketScreener Press Releases",
    "Digital Journal",
    "Newsbreak",
    "MSN",
];

/// Majors treated as critical for every organization.
pub const DEFAULT_CRITICAL: &[&str] = &[
    "Reuters",
    "Bloomberg",
    "Financial Times",
    "The Wall Street Journal",
    "Wall Street Journal",
    "The New York Times",
    "New York Times",
    "The Washington Post",
    "Associated Press",
    "AP News",
    "The Economist",
    "BBC News",
    "CNBC",
    "Axios",
];

/// Outlets that are on-topic (tier 2) or off-topic (dropped) for an industry.
#[derive(Debug, Clone, Copy)]
pub struct IndustrySources {
    pub relevant: &'static [&'static str],
    pub irrelevant: &'static [&'static str],
}

const POLICY_THINK_TANKS: &[&str] = &[
    "War on the Rocks",
    "Defense One",
    "Lawfare",
    "Foreign Policy",
    "RAND Corporation",
    "Council on Foreign Relations",
    "Brookings",
    "CSIS",
    "Breaking Defense",
];

pub fn industry_sources(industry: Industry) -> IndustrySources {
    match industry {
        Industry::Marketing => IndustrySources {
            relevant: &[
                "Adweek",
                "Ad Age",
                "Advertising Age",
                "Campaign",
                "The Drum",
                "Marketing Dive",
                "Digiday",
                "MediaPost",
                "Marketing Week",
                "AdExchanger",
            ],
            irrelevant: POLICY_THINK_TANKS,
        },
        Industry::PublicRelations => IndustrySources {
            relevant: &[
                "PRWeek",
                "PR Daily",
                "Ragan",
                "O'Dwyer's",
                "Holmes Report",
                "PRovoke Media",
                "Adweek",
                "The Drum",
            ],
            irrelevant: POLICY_THINK_TANKS,
        },
        Industry::Technology => IndustrySources {
            relevant: &[
                "TechCrunch",
                "The Verge",
                "Wired",
                "Ars Technica",
                "The Information",
                "VentureBeat",
                "ZDNet",
                "Protocol",
                "The Register",
            ],
            irrelevant: &["Lawfare", "War on the Rocks", "RAND Corporation"],
        },
        Industry::FinancialServices => IndustrySources {
            relevant: &[
                "American Banker",
                "Barron's",
                "MarketWatch",
                "Institutional Investor",
                "Risk.net",
                "Finextra",
                "The Banker",
            ],
            irrelevant: &["Adweek", "Ad Age", "War on the Rocks", "Defense One"],
        },
        Industry::Healthcare => IndustrySources {
            relevant: &[
                "STAT",
                "STAT News",
                "Fierce Healthcare",
                "Fierce Pharma",
                "Modern Healthcare",
                "Healthcare Dive",
                "Endpoints News",
                "MedPage Today",
            ],
            irrelevant: &["War on the Rocks", "Defense One", "Adweek"],
        },
        Industry::Energy => IndustrySources {
            relevant: &[
                "Utility Dive",
                "S&P Global Commodity Insights",
                "Platts",
                "Oilprice.com",
                "Canary Media",
                "Energy Voice",
                "Rigzone",
            ],
            irrelevant: &["Adweek", "Ad Age", "Lawfare"],
        },
        Industry::Retail => IndustrySources {
            relevant: &[
                "Retail Dive",
                "Modern Retail",
                "Chain Store Age",
                "Retail Week",
                "Grocery Dive",
                "Progressive Grocer",
                "WWD",
                "Business of Fashion",
            ],
            irrelevant: POLICY_THINK_TANKS,
        },
        Industry::Other => IndustrySources {
            relevant: &[],
            irrelevant: &[],
        },
    }
}

/// Trim, lower-case and strip a leading `www.`.
pub fn normalize_source(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.trim().to_string(),
        None => lower,
    }
}

fn normalized_set<'a>(names: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    names
        .into_iter()
        .map(normalize_source)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Output of classifying one source name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceClassification {
    pub blocked: bool,
    pub tier: SourceTier,
    pub industry_irrelevant: bool,
}

impl SourceClassification {
    /// Neither blocked nor industry-irrelevant.
    pub fn admissible(&self) -> bool {
        !self.blocked && !self.industry_irrelevant
    }
}

/// Merged built-in and organization source lists for one request.
#[derive(Debug, Clone, Default)]
pub struct SourcePolicy {
    critical: HashSet<String>,
    high: HashSet<String>,
    blocked: HashSet<String>,
    industry_relevant: HashSet<String>,
    industry_irrelevant: HashSet<String>,
    /// Sources the organization itself listed as critical or high.
    org_priority: HashSet<String>,
}

impl SourcePolicy {
    pub fn for_organization(profile: &OrganizationProfile) -> Self {
        let lists = &profile.source_priorities;
        let industry = industry_sources(profile.industry);

        let org_critical = normalized_set(lists.critical.iter().map(String::as_str));
        let org_high = normalized_set(lists.high.iter().map(String::as_str));
        let org_priority = org_critical.union(&org_high).cloned().collect();

        let mut critical = normalized_set(DEFAULT_CRITICAL.iter().copied());
        critical.extend(org_critical);

        let mut blocked = normalized_set(ALWAYS_BLOCKED.iter().copied());
        blocked.extend(normalized_set(lists.blocked.iter().map(String::as_str)));

        Self {
            critical,
            high: org_high,
            blocked,
            industry_relevant: normalized_set(industry.relevant.iter().copied()),
            industry_irrelevant: normalized_set(industry.irrelevant.iter().copied()),
            org_priority,
        }
    }

    pub fn classify(&self, source_name: &str) -> SourceClassification {
        let key = normalize_source(source_name);

        let tier = if self.critical.contains(&key) {
            SourceTier::Critical
        } else if self.high.contains(&key) || self.industry_relevant.contains(&key) {
            SourceTier::High
        } else {
            SourceTier::Other
        };

        SourceClassification {
            blocked: self.blocked.contains(&key),
            tier,
            industry_irrelevant: self.industry_irrelevant.contains(&key)
                && !self.org_priority.contains(&key),
        }
    }
}
