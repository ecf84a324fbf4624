use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use promptsweep::compare::Comparator;
use promptsweep::config::SweepConfig;
use promptsweep::report::{charts, summary};
use promptsweep::sweep::SweepRunner;
use promptsweep::{ChatProvider, GenerationParams};

#[derive(Parser)]
#[command(name = "promptsweep", version, about = "Parameter sweeps and self-scored evaluation runs against chat completion APIs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the configured sweep and export the result table
    Run {
        /// Path to the sweep configuration file
        #[arg(long, default_value = "sweep.toml")]
        config: PathBuf,
        /// Override the configured output path
        #[arg(long)]
        output: Option<String>,
        /// Render comparison charts after the export
        #[arg(long)]
        charts: bool,
        /// Override the configured worker pool size
        #[arg(long)]
        concurrency: Option<usize>,
        /// Print the enumerated plan without issuing any requests
        #[arg(long)]
        dry_run: bool,
    },
    /// Compare two prompt variants, or one prompt against a ground truth
    Compare {
        #[arg(long, default_value = "sweep.toml")]
        config: PathBuf,
        /// First prompt variant
        #[arg(long)]
        prompt_a: String,
        /// Second prompt variant (ignored when --ground-truth is given)
        #[arg(long)]
        prompt_b: Option<String>,
        /// Known-good answer to compare prompt A's response against
        #[arg(long)]
        ground_truth: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            config,
            output,
            charts,
            concurrency,
            dry_run,
        } => run_sweep(config, output, charts, concurrency, dry_run).await,
        Command::Compare {
            config,
            prompt_a,
            prompt_b,
            ground_truth,
        } => run_compare(config, prompt_a, prompt_b, ground_truth).await,
    }
}

async fn run_sweep(
    config_path: PathBuf,
    output: Option<String>,
    render_charts: bool,
    concurrency: Option<usize>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let mut config = SweepConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(path) = output {
        config.output.path = path;
    }
    if let Some(n) = concurrency {
        config.concurrency = n;
    }
    if render_charts {
        config.output.charts = true;
    }
    config.validate()?;

    if dry_run {
        for request in config.plan.enumerate() {
            println!(
                "{:>4}  {}  temp={:<4} max_tokens={:<6} {}",
                request.index,
                request.model,
                request.temperature,
                request.max_tokens,
                request.prompt
            );
        }
        println!("{} requests total", config.plan.len());
        return Ok(());
    }

    let runner = SweepRunner::from_config(&config)?;
    let table = runner.run(&config.plan).await?;
    table.write_csv(&config.output.path, config.output.policy)?;
    println!("wrote {} rows to {}", table.len(), config.output.path);

    if config.output.charts {
        let third = &config.scoring.third_criterion;
        print!(
            "{}",
            charts::render("Mean scores by model", third, &summary::by_model(table.rows()))
        );
        print!(
            "{}",
            charts::render("Mean scores by prompt", third, &summary::by_prompt(table.rows()))
        );
    }
    Ok(())
}

async fn run_compare(
    config_path: PathBuf,
    prompt_a: String,
    prompt_b: Option<String>,
    ground_truth: Option<String>,
) -> anyhow::Result<()> {
    let config = SweepConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let model = config
        .plan
        .models
        .first()
        .context("config declares no models")?
        .clone();
    let params = GenerationParams::new(model, 0.3, 300);

    let api_key = config.api_key()?;
    let backend = promptsweep::backends::OpenAiCompatible::new(
        api_key,
        config.provider.base_url.clone(),
        config.provider.timeout_seconds,
    )?;
    let provider: Arc<dyn ChatProvider> = Arc::new(promptsweep::resilient::Resilient::new(
        backend,
        config.retry.clone(),
    ));
    let comparator = Comparator::new(provider, config.generation.system_prompt.clone(), params);

    if let Some(expected) = ground_truth {
        let result = comparator.ground_truth(&prompt_a, &expected).await?;
        println!("Response:\n{}\n", result.response);
        println!("Assessment:\n{}", result.assessment);
    } else {
        let prompt_b = prompt_b.context("provide --prompt-b or --ground-truth")?;
        let result = comparator.ab_compare(&prompt_a, &prompt_b).await?;
        println!("Response A:\n{}\n", result.response_a);
        println!("Response B:\n{}\n", result.response_b);
        println!("Verdict:\n{}", result.verdict);
    }
    Ok(())
}
