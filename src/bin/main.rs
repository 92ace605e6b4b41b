use clap::Parser;
use finance_query_agent::{AgentConfig, Orchestrator, PipelineOutcome};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const SEPARATOR: &str = "==================================================";

/// Ask a finance question in plain language
#[derive(Parser, Debug)]
#[command(name = "finance-agent", version, about)]
struct Cli {
    /// The question, e.g. "What is the latest news for Tesla?"
    query: String,

    /// Print the full run report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let orchestrator = match AgentConfig::from_env().and_then(|config| Orchestrator::from_config(&config)) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!("Startup failed: {}", e);
            return ExitCode::from(2);
        }
    };

    info!("Financial Query Agent starting");
    let report = orchestrator.execute(&cli.query).await;

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Could not render report: {}", e),
        }
    }

    match &report.outcome {
        PipelineOutcome::Answer(answer) => {
            if !cli.json {
                println!("\n{}", SEPARATOR);
                println!("{}", answer);
                println!("{}", SEPARATOR);
            }
            ExitCode::SUCCESS
        }
        PipelineOutcome::Error(e) => {
            eprintln!("\n{}", SEPARATOR);
            eprintln!("Query failed during {} ({:?}): {}", e.stage, e.kind, e.message);
            if let Some(raw) = &e.raw_data {
                eprintln!("\nRetrieved data:\n{}", raw);
            }
            eprintln!("{}", SEPARATOR);
            ExitCode::FAILURE
        }
    }
}
