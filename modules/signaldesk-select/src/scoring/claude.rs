use anyhow::Result;
use async_trait::async_trait;

use ai_client::Claude;

use super::prompt::{scoring_user_prompt, SCORING_SYSTEM_PROMPT};
use super::{ScorerReply, ScoringItem};
use crate::traits::RelevanceScorer;

/// Relevance scorer backed by the Anthropic Messages API. Returns the raw
/// reply text; parsing happens in the scoring client.
pub struct ClaudeScorer {
    claude: Claude,
}

impl ClaudeScorer {
    pub fn new(claude: Claude) -> Self {
        Self { claude }
    }
}

#[async_trait]
impl RelevanceScorer for ClaudeScorer {
    async fn score_batch(
        &self,
        intelligence_context: &str,
        items: &[ScoringItem],
    ) -> Result<ScorerReply> {
        let user = scoring_user_prompt(intelligence_context, items);
        let text = self
            .claude
            .chat_completion(SCORING_SYSTEM_PROMPT, user)
            .await?;
        Ok(ScorerReply::Text(text))
    }

    fn name(&self) -> &str {
        self.claude.model()
    }
}
