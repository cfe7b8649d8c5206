use serde::Serialize;

use super::aggregate::FilterTally;
use crate::scoring::ScoringReport;

/// Per-stage counters for one selection run. Always returned, so callers can
/// tell "nothing relevant" apart from "a dependency was unavailable".
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SelectionStats {
    // Fetch
    pub targets_queried: u32,
    pub targets_failed: u32,
    pub profile_unavailable: bool,

    // Filters
    pub total_matches: u32,
    pub filtered_garbage: u32,
    pub filtered_old: u32,
    pub filtered_blocked: u32,
    pub filtered_industry_irrelevant: u32,

    // Aggregation and capping
    pub articles_aggregated: u32,
    pub post_cap: u32,

    // Scoring
    pub batches_sent: u32,
    pub batches_failed: u32,
    pub scored_by_model: u32,
    pub scored_by_fallback: u32,
    pub scoring_skipped: bool,

    // Ranking
    pub dropped_by_diversity: u32,
    pub final_count: u32,

    pub connections: u32,
}

impl SelectionStats {
    pub fn record_filters(&mut self, tally: &FilterTally) {
        self.total_matches = tally.total_matches;
        self.filtered_garbage = tally.garbage;
        self.filtered_old = tally.old;
        self.filtered_blocked = tally.blocked;
        self.filtered_industry_irrelevant = tally.industry_irrelevant;
    }

    pub fn record_scoring(&mut self, report: &ScoringReport) {
        self.batches_sent = report.batches_sent;
        self.batches_failed = report.batches_failed;
    }

    /// True when every queried target failed to fetch.
    pub fn all_targets_failed(&self) -> bool {
        self.targets_queried > 0 && self.targets_failed == self.targets_queried
    }
}

impl std::fmt::Display for SelectionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Selection Complete ===")?;
        if self.profile_unavailable {
            writeln!(f, "Organization profile unavailable, nothing selected")?;
            return Ok(());
        }
        writeln!(f, "Targets queried:    {}", self.targets_queried)?;
        writeln!(f, "Targets failed:     {}", self.targets_failed)?;
        writeln!(f, "Matches seen:       {}", self.total_matches)?;
        writeln!(f, "\nFiltered:")?;
        writeln!(f, "  Garbage:          {}", self.filtered_garbage)?;
        writeln!(f, "  Too old:          {}", self.filtered_old)?;
        writeln!(f, "  Blocked source:   {}", self.filtered_blocked)?;
        writeln!(f, "  Off-industry:     {}", self.filtered_industry_irrelevant)?;
        writeln!(f, "\nArticles aggregated: {}", self.articles_aggregated)?;
        writeln!(f, "After tier caps:     {}", self.post_cap)?;
        if self.scoring_skipped {
            writeln!(f, "\nScoring skipped, embedding scores used")?;
        } else {
            writeln!(f, "\nScoring batches:    {} ({} failed)", self.batches_sent, self.batches_failed)?;
        }
        let scored = (self.scored_by_model + self.scored_by_fallback).max(1);
        writeln!(
            f,
            "  By model:         {} ({:.0}%)",
            self.scored_by_model,
            self.scored_by_model as f64 / scored as f64 * 100.0
        )?;
        writeln!(f, "  By fallback:      {}", self.scored_by_fallback)?;
        writeln!(f, "\nDiversity drops:    {}", self.dropped_by_diversity)?;
        writeln!(f, "Final selection:    {}", self.final_count)?;
        writeln!(f, "Connections:        {}", self.connections)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_every_required_counter() {
        let stats = SelectionStats {
            targets_queried: 4,
            total_matches: 120,
            filtered_garbage: 7,
            filtered_old: 30,
            filtered_blocked: 5,
            filtered_industry_irrelevant: 2,
            articles_aggregated: 60,
            post_cap: 55,
            batches_sent: 2,
            scored_by_model: 40,
            scored_by_fallback: 15,
            final_count: 50,
            ..SelectionStats::default()
        };
        let text = stats.to_string();
        assert!(text.contains("=== Selection Complete ==="));
        assert!(text.contains("Matches seen:       120"));
        assert!(text.contains("Blocked source:   5"));
        assert!(text.contains("After tier caps:     55"));
        assert!(text.contains("Final selection:    50"));
    }

    #[test]
    fn all_targets_failed_needs_at_least_one_target() {
        let mut stats = SelectionStats::default();
        assert!(!stats.all_targets_failed());
        stats.targets_queried = 3;
        stats.targets_failed = 3;
        assert!(stats.all_targets_failed());
    }
}
