use std::fmt::Write;

use signaldesk_common::{OrganizationProfile, Target};

use super::ScoringItem;

/// Titles are clipped before they go into the prompt.
const MAX_TITLE_BYTES: usize = 300;

pub const SCORING_SYSTEM_PROMPT: &str = r#"You score news articles for business relevance to one specific organization.

Score every article from 0 to 100 using this rubric:
- 90-100: explicitly names the organization or one of its named competitors.
- 70-89: squarely on-topic for the organization's specific industry or clients.
- 50-69: relevant market news with business implications for the organization.
- 30-49: tangential.
- 0-29: unrelated.

Score LOW (below 30) anything about:
- unrelated policy or geopolitics,
- generic sector news that is not centered on the organization's industry,
- wire-service press releases.

Respond with exactly one JSON array of integers, one per article, in the order given.
No prose, no keys, no comments. Example for three articles: [82, 35, 7]"#;

/// Textual summary of the organization the scorer judges relevance against.
pub fn intelligence_context(profile: &OrganizationProfile, targets: &[Target]) -> String {
    let mut ctx = String::new();
    let _ = writeln!(ctx, "Organization: {}", profile.name);
    let _ = writeln!(ctx, "Industry: {}", profile.industry.label());

    if let Some(description) = profile.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(ctx, "Description: {}", description.trim());
    }
    if !profile.service_lines.is_empty() {
        let _ = writeln!(ctx, "Service lines: {}", profile.service_lines.join(", "));
    }
    if !profile.strategic_priorities.is_empty() {
        let _ = writeln!(
            ctx,
            "Strategic priorities: {}",
            profile.strategic_priorities.join("; ")
        );
    }
    if !profile.competitors.is_empty() {
        let _ = writeln!(ctx, "Named competitors: {}", profile.competitors.join(", "));
    }
    if !targets.is_empty() {
        let names: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
        let _ = writeln!(ctx, "Monitored targets: {}", names.join(", "));
    }
    ctx
}

/// User message: the context followed by a numbered article list.
pub fn scoring_user_prompt(intelligence_context: &str, items: &[ScoringItem]) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "## Organization\n{}", intelligence_context.trim_end());
    let _ = writeln!(prompt, "\n## Articles ({})", items.len());

    for (i, item) in items.iter().enumerate() {
        let title = ai_client::truncate_to_char_boundary(item.title.trim(), MAX_TITLE_BYTES);
        let _ = writeln!(
            prompt,
            "{}. {} | source: {} | matched: {}",
            i + 1,
            title,
            item.source,
            item.matched_targets.join(", ")
        );
    }

    let _ = write!(
        prompt,
        "\nReturn a JSON array of exactly {} integers.",
        items.len()
    );
    prompt
}
