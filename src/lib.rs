//! Parameter sweeps and self-scored evaluation runs against chat completion
//! APIs.
//!
//! The pipeline enumerates the Cartesian product of prompts, models,
//! temperatures, and token budgets, generates one completion per tuple,
//! asks the same service to grade its own output, computes simple text
//! statistics, and aggregates everything into a tabular result set.
//!
//! # Modules
//!
//! - [`chat`]: message types and the provider trait seam
//! - [`backends`]: OpenAI-compatible HTTP client
//! - [`resilient`]: retry with bounded exponential backoff
//! - [`config`]: sweep configuration from TOML plus the environment
//! - [`sweep`]: plan enumeration, generation, and the sweep runner
//! - [`scorer`]: self-scoring with defensive reply parsing
//! - [`metrics`]: deterministic word/sentence counts
//! - [`report`]: result table, delimited export, summaries, charts
//! - [`compare`]: A/B prompt comparison and ground-truth checks
//!
//! # Example
//!
//! ```no_run
//! use promptsweep::config::SweepConfig;
//! use promptsweep::sweep::SweepRunner;
//!
//! # async fn run() -> Result<(), promptsweep::error::SweepError> {
//! let config = SweepConfig::load("sweep.toml")?;
//! let runner = SweepRunner::from_config(&config)?;
//! let table = runner.run(&config.plan).await?;
//! table.write_csv(&config.output.path, config.output.policy)?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod chat;
pub mod compare;
pub mod config;
pub mod error;
pub mod metrics;
pub mod report;
pub mod resilient;
pub mod scorer;
pub mod sweep;

pub use chat::{ChatMessage, ChatProvider, ChatRole, GenerationParams};
pub use config::SweepConfig;
pub use error::SweepError;
pub use report::{ResultRow, ResultTable};
pub use scorer::ScoreRecord;
pub use sweep::{EvaluationRequest, SweepPlan, SweepRunner};
