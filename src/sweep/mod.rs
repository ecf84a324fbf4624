//! Sweep plans and their enumeration into evaluation requests.

mod generator;
mod runner;

pub use generator::{GeneratedResponse, Generator};
pub use runner::SweepRunner;

use serde::Deserialize;

/// Parameter axes of one sweep: the run evaluates their Cartesian product.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepPlan {
    /// Prompts to evaluate, outermost axis.
    pub prompts: Vec<String>,
    /// Model identifiers.
    pub models: Vec<String>,
    /// Sampling temperatures.
    pub temperatures: Vec<f32>,
    /// Token budgets, innermost axis.
    pub max_tokens: Vec<u32>,
}

/// One point in the sweep's parameter space.
///
/// Created by [`SweepPlan::enumerate`], consumed once by the generator,
/// never mutated. `index` is the enumeration position and fixes the row
/// order of the exported table.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    pub index: usize,
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl SweepPlan {
    /// Lazily enumerates the full Cartesian product in a fixed nesting order
    /// (prompt, then model, then temperature, then token budget), so repeated
    /// runs are comparable row-for-row. Empty axes yield zero requests.
    pub fn enumerate(&self) -> impl Iterator<Item = EvaluationRequest> + '_ {
        self.prompts
            .iter()
            .flat_map(move |prompt| {
                self.models.iter().flat_map(move |model| {
                    self.temperatures.iter().flat_map(move |temperature| {
                        self.max_tokens
                            .iter()
                            .map(move |max_tokens| (prompt, model, temperature, max_tokens))
                    })
                })
            })
            .enumerate()
            .map(
                |(index, (prompt, model, temperature, max_tokens))| EvaluationRequest {
                    index,
                    prompt: prompt.clone(),
                    model: model.clone(),
                    temperature: *temperature,
                    max_tokens: *max_tokens,
                },
            )
    }

    /// Number of requests the plan enumerates.
    pub fn len(&self) -> usize {
        self.prompts.len() * self.models.len() * self.temperatures.len() * self.max_tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> SweepPlan {
        SweepPlan {
            prompts: vec!["a".into(), "b".into()],
            models: vec!["m1".into(), "m2".into()],
            temperatures: vec![0.2, 0.7, 1.0],
            max_tokens: vec![50, 150],
        }
    }

    #[test]
    fn yields_full_cartesian_product() {
        let plan = plan();
        let requests: Vec<_> = plan.enumerate().collect();
        assert_eq!(requests.len(), 2 * 2 * 3 * 2);
        assert_eq!(requests.len(), plan.len());

        // All tuples distinct.
        for (i, a) in requests.iter().enumerate() {
            for b in &requests[i + 1..] {
                assert!(
                    (a.prompt.as_str(), a.model.as_str(), a.temperature, a.max_tokens)
                        != (b.prompt.as_str(), b.model.as_str(), b.temperature, b.max_tokens)
                );
            }
        }
    }

    #[test]
    fn order_is_deterministic_and_indexed() {
        let plan = plan();
        let first: Vec<_> = plan.enumerate().collect();
        let second: Vec<_> = plan.enumerate().collect();
        assert_eq!(first, second);
        for (i, req) in first.iter().enumerate() {
            assert_eq!(req.index, i);
        }
        // Prompt is the outermost axis, token budget the innermost.
        assert_eq!(first[0].prompt, "a");
        assert_eq!(first[0].max_tokens, 50);
        assert_eq!(first[1].max_tokens, 150);
        assert_eq!(first[first.len() - 1].prompt, "b");
    }

    #[test]
    fn empty_axis_yields_no_requests() {
        let mut plan = plan();
        plan.models.clear();
        assert_eq!(plan.enumerate().count(), 0);
        assert!(plan.is_empty());
    }
}
