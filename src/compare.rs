//! Prompt A/B comparison and ground-truth checks.
//!
//! Thin orchestrations over the same provider seam the sweep uses: generate
//! candidate responses, then ask the service to judge them.

use std::sync::Arc;

use crate::chat::{ChatMessage, ChatProvider, GenerationParams};
use crate::error::SweepError;

const JUDGE_SYSTEM_PROMPT: &str = "You are a critical evaluator of AI responses.";
const COMPARISON_SYSTEM_PROMPT: &str = "You are a comparison evaluator.";

/// Outcome of an A/B comparison: both candidate responses plus the verdict.
#[derive(Debug, Clone)]
pub struct AbComparison {
    pub response_a: String,
    pub response_b: String,
    pub verdict: String,
}

/// Outcome of a ground-truth check.
#[derive(Debug, Clone)]
pub struct GroundTruthComparison {
    pub response: String,
    pub assessment: String,
}

/// Runs comparison flows against one provider and fixed generation params.
pub struct Comparator {
    provider: Arc<dyn ChatProvider>,
    system_prompt: String,
    params: GenerationParams,
}

impl Comparator {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        system_prompt: impl Into<String>,
        params: GenerationParams,
    ) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
            params,
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, SweepError> {
        let messages = [
            ChatMessage::system().content(&self.system_prompt).build(),
            ChatMessage::user().content(prompt).build(),
        ];
        Ok(self
            .provider
            .chat(&messages, &self.params)
            .await?
            .trim()
            .to_string())
    }

    async fn judge(&self, system: &str, prompt: String) -> Result<String, SweepError> {
        let messages = [
            ChatMessage::system().content(system).build(),
            ChatMessage::user().content(prompt).build(),
        ];
        Ok(self
            .provider
            .chat(&messages, &self.params)
            .await?
            .trim()
            .to_string())
    }

    /// Generates responses to two prompt variants and asks the service which
    /// is more helpful, clear, and relevant.
    pub async fn ab_compare(
        &self,
        prompt_a: &str,
        prompt_b: &str,
    ) -> Result<AbComparison, SweepError> {
        let response_a = self.generate(prompt_a).await?;
        let response_b = self.generate(prompt_b).await?;

        let critique_prompt = format!(
            "Two responses were given to similar prompts. Evaluate both and pick the better one.\n\n\
             Prompt A:\n{prompt_a}\n\n\
             Response A:\n{response_a}\n\n\
             Prompt B:\n{prompt_b}\n\n\
             Response B:\n{response_b}\n\n\
             Which response is more helpful, clear, and relevant? Justify your answer."
        );
        let verdict = self.judge(JUDGE_SYSTEM_PROMPT, critique_prompt).await?;

        Ok(AbComparison {
            response_a,
            response_b,
            verdict,
        })
    }

    /// Generates a response and asks the service to compare it against a
    /// known-good answer.
    pub async fn ground_truth(
        &self,
        prompt: &str,
        expected: &str,
    ) -> Result<GroundTruthComparison, SweepError> {
        let response = self.generate(prompt).await?;

        let comparison_prompt = format!(
            "Compare the following model response to the ground truth answer.\n\
             Point out what's accurate, what's missing, and what's incorrect.\n\n\
             Prompt:\n{prompt}\n\n\
             Model Response:\n{response}\n\n\
             Ground Truth:\n{expected}"
        );
        let assessment = self
            .judge(COMPARISON_SYSTEM_PROMPT, comparison_prompt)
            .await?;

        Ok(GroundTruthComparison {
            response,
            assessment,
        })
    }
}
