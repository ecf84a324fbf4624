use std::sync::Arc;

use futures::StreamExt;

use crate::chat::ChatProvider;
use crate::config::SweepConfig;
use crate::error::SweepError;
use crate::metrics;
use crate::report::{ResultRow, ResultTable};
use crate::scorer::Scorer;

use super::{EvaluationRequest, Generator, SweepPlan};

/// Drives a whole sweep: enumerate, generate, score, measure, aggregate.
///
/// Per-row failure containment is the central contract here: no generation
/// or scoring error ever aborts the remaining requests, and every request
/// ends up as exactly one row.
pub struct SweepRunner {
    generator: Generator,
    scorer: Scorer,
    third_criterion: String,
    concurrency: usize,
}

impl SweepRunner {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        system_prompt: impl Into<String>,
        third_criterion: impl Into<String>,
        concurrency: usize,
    ) -> Self {
        let third_criterion = third_criterion.into();
        Self {
            generator: Generator::new(provider.clone(), system_prompt),
            scorer: Scorer::new(provider, third_criterion.clone()),
            third_criterion,
            concurrency: concurrency.max(1),
        }
    }

    /// Builds a runner from configuration, wiring the provider through the
    /// retry layer.
    pub fn from_config(config: &SweepConfig) -> Result<Self, SweepError> {
        let api_key = config.api_key()?;
        let backend = crate::backends::OpenAiCompatible::new(
            api_key,
            config.provider.base_url.clone(),
            config.provider.timeout_seconds,
        )?;
        let provider = crate::resilient::Resilient::new(backend, config.retry.clone());
        Ok(Self::new(
            Arc::new(provider),
            config.generation.system_prompt.clone(),
            config.scoring.third_criterion.clone(),
            config.concurrency,
        ))
    }

    /// Runs the full sweep and returns the finalized table.
    ///
    /// A plan that enumerates zero requests is a configuration error; it is
    /// rejected before any network call.
    pub async fn run(&self, plan: &SweepPlan) -> Result<ResultTable, SweepError> {
        let requests: Vec<EvaluationRequest> = plan.enumerate().collect();
        if requests.is_empty() {
            return Err(SweepError::Config(
                "sweep plan enumerates zero requests".to_string(),
            ));
        }
        let expected = requests.len();
        log::info!(
            "running sweep: {expected} requests, concurrency {}",
            self.concurrency
        );

        let mut table = ResultTable::new(&self.third_criterion);
        if self.concurrency == 1 {
            for request in requests {
                table.push(self.process(request).await);
            }
        } else {
            // Rows complete in arbitrary order; finalize() restores it.
            let rows: Vec<ResultRow> = futures::stream::iter(requests)
                .map(|request| self.process(request))
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
            for row in rows {
                table.push(row);
            }
        }
        table.finalize();
        debug_assert_eq!(table.len(), expected);
        Ok(table)
    }

    async fn process(&self, request: EvaluationRequest) -> ResultRow {
        log::debug!(
            "request {}: model={} temp={} max_tokens={}",
            request.index,
            request.model,
            request.temperature,
            request.max_tokens
        );
        let response = self.generator.generate(&request).await;
        let score = self.scorer.score(&request, &response).await;
        let metrics = metrics::measure(&response.text);
        ResultRow::record(request, response, score, metrics)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::chat::{ChatMessage, ChatRole, GenerationParams};

    /// Deterministic stand-in for the completion service. Generation calls
    /// echo the prompt; scoring calls return a fixed JSON record. Prompts
    /// containing "fail" make the generation call error out.
    struct ScriptedProvider;

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            _params: &GenerationParams,
        ) -> Result<String, SweepError> {
            let system = &messages[0];
            assert_eq!(system.role, ChatRole::System);
            let user = &messages[1].content;
            if system.content.contains("strict evaluator") {
                return Ok(
                    r#"{"Clarity": 8, "Specificity": 6, "Verbosity": 4, "Comments": "ok"}"#
                        .to_string(),
                );
            }
            if user.contains("fail") {
                return Err(SweepError::Provider("injected failure".to_string()));
            }
            Ok(format!("echo: {user}. Done."))
        }
    }

    fn plan(prompts: &[&str], temps: &[f32]) -> SweepPlan {
        SweepPlan {
            prompts: prompts.iter().map(|s| s.to_string()).collect(),
            models: vec!["stub-model".to_string()],
            temperatures: temps.to_vec(),
            max_tokens: vec![100],
        }
    }

    fn runner(concurrency: usize) -> SweepRunner {
        SweepRunner::new(
            Arc::new(ScriptedProvider),
            "You are a helpful assistant.",
            "Verbosity",
            concurrency,
        )
    }

    #[tokio::test]
    async fn every_request_becomes_exactly_one_row() {
        let plan = plan(&["velvet", "this one will fail"], &[0.2, 0.7]);
        let table = runner(1).run(&plan).await.unwrap();
        assert_eq!(table.len(), plan.enumerate().count());
        assert_eq!(table.len(), 4);

        let failed: Vec<_> = table.rows().iter().filter(|r| r.error.is_some()).collect();
        assert_eq!(failed.len(), 2);
        for row in failed {
            assert!(row.response.is_empty());
            assert!(!row.score.parse_succeeded);
            assert_eq!(row.word_count, 0);
        }
    }

    #[tokio::test]
    async fn successful_rows_carry_scores_and_metrics() {
        let plan = plan(&["velvet"], &[0.2]);
        let table = runner(1).run(&plan).await.unwrap();
        let row = &table.rows()[0];
        assert_eq!(row.response, "echo: velvet. Done.");
        assert_eq!(row.score.clarity, Some(8));
        assert!(row.score.parse_succeeded);
        assert_eq!(row.sentence_count, 2);
        assert!(row.word_count > 0);
    }

    #[tokio::test]
    async fn deterministic_stub_produces_identical_tables() {
        let plan = plan(&["a", "b"], &[0.1, 0.9]);
        let first = runner(1).run(&plan).await.unwrap();
        let second = runner(1).run(&plan).await.unwrap();
        assert_eq!(first.to_csv(), second.to_csv());
    }

    #[tokio::test]
    async fn parallel_run_exports_in_enumeration_order() {
        let plan = plan(&["a", "b", "c"], &[0.1, 0.5, 0.9]);
        let sequential = runner(1).run(&plan).await.unwrap();
        let parallel = runner(4).run(&plan).await.unwrap();
        assert_eq!(sequential.to_csv(), parallel.to_csv());
        let indices: Vec<_> = parallel.rows().iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..9).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn empty_plan_is_a_config_error() {
        let plan = plan(&[], &[0.2]);
        let err = runner(1).run(&plan).await.unwrap_err();
        assert!(matches!(err, SweepError::Config(_)));
    }
}
