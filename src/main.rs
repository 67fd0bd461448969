use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use factcheck::models::{Claim, EvidenceSet, Verdict};
use factcheck::pipeline::{
    CancellationToken, DummySearch, EvidenceSearch, FactCheckPipeline, OpenAiModel, TavilySearch,
    VerifyProgress,
};
use factcheck::{Config, FactCheckError, GatewayError, VerificationRun};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "factcheck")]
#[command(version, about = "Verify the factual claims in a document against web evidence")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./factcheck.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract and verify every claim in a text file ("-" reads stdin)
    Check {
        #[arg(default_value = "-")]
        file: PathBuf,
        /// Print the run as JSON
        #[arg(long)]
        json: bool,
        /// Also write the run JSON to this path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Only list the claims that would be verified
    Extract {
        #[arg(default_value = "-")]
        file: PathBuf,
    },
}

enum Search {
    Tavily(TavilySearch),
    Dummy(DummySearch),
}

#[async_trait]
impl EvidenceSearch for Search {
    async fn search(&self, query: &str, max_results: usize) -> Result<EvidenceSet, GatewayError> {
        match self {
            Search::Tavily(s) => s.search(query, max_results).await,
            Search::Dummy(s) => s.search(query, max_results).await,
        }
    }
}

struct ConsoleProgress;

impl VerifyProgress for ConsoleProgress {
    fn claim_started(&self, claim: &Claim, total: usize) {
        eprintln!("  [{}/{}] checking: {}", claim.index + 1, total, claim.preview(50));
    }
}

fn valid_api_key(key: &str) -> bool {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.contains("...") {
        return false;
    }
    true
}

fn read_document(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn build_pipeline(config: &Config) -> anyhow::Result<FactCheckPipeline<OpenAiModel, Search>> {
    let model = match config.llm.api_key.as_deref() {
        Some(key) if valid_api_key(key) => OpenAiModel::new(key, &config.llm),
        _ => bail!("no model API key configured; set OPENROUTER_API_KEY or [llm].api_key"),
    };
    let search = match config.search.api_key.as_deref() {
        Some(key) if valid_api_key(key) => Search::Tavily(TavilySearch::new(key, &config.search)?),
        _ => {
            warn!("no search API key configured; every claim will be Unverifiable");
            Search::Dummy(DummySearch)
        }
    };
    Ok(FactCheckPipeline::new(Arc::new(model), Arc::new(search), config))
}

fn print_verdict(verdict: &Verdict) {
    println!(
        "{} {} (claim {}, {}, confidence {:.0}%)",
        verdict.status.emoji(),
        verdict.status,
        verdict.claim_index + 1,
        verdict.category,
        verdict.confidence * 100.0
    );
    println!("   {}", verdict.claim);
    println!("   {}", verdict.explanation);
    if let Some(correction) = &verdict.correct_information {
        println!("   correct: {correction}");
    }
    for source in &verdict.sources {
        println!("   - {source}");
    }
}

fn print_run(run: &VerificationRun) {
    let counts = &run.report.counts;
    println!(
        "✅ {}  ⚠️ {}  ❌ {}  ❓ {}",
        counts.verified, counts.inaccurate, counts.false_, counts.unverifiable
    );
    if run.report.is_empty() {
        println!("No verifiable claims found.");
        return;
    }
    for verdict in run.report.prioritized() {
        println!();
        print_verdict(verdict);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let pipeline = build_pipeline(&config)?;

    match cli.command {
        Commands::Extract { file } => {
            let text = read_document(&file)?;
            let claims = pipeline.extract(&text).await?;
            if claims.is_empty() {
                println!("No verifiable claims found.");
            }
            for claim in claims {
                println!("{}. [{}] {}", claim.index + 1, claim.category, claim.text);
            }
        }
        Commands::Check { file, json, out } => {
            let text = read_document(&file)?;
            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("cancelling after in-flight claims...");
                    on_ctrl_c.cancel();
                }
            });

            let run = pipeline.run_with(&text, &cancel, &ConsoleProgress).await?;
            let dump = run.to_json_pretty()?;
            if let Some(path) = out {
                std::fs::write(&path, &dump)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            if json {
                println!("{dump}");
            } else {
                print_run(&run);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        let code = err
            .downcast_ref::<FactCheckError>()
            .map_or(1, FactCheckError::exit_code);
        std::process::exit(code);
    }
}
