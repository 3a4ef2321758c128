use clap::{Parser, Subcommand};
use deepquant_agent::{
    backtest::BacktestRunner,
    config::Settings,
    logging::init_tracing,
    market_data,
    parser::RegexPolicyParser,
    progress::log_progress,
    store::{JsonPolicyStore, PolicyStore},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "deepquant", about = "Moving-average crossover backtests from plain-text prompts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a prompt and run its backtest in the foreground
    Backtest {
        #[arg(required = true)]
        prompt: Vec<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the strategy a prompt parses to
    Parse {
        #[arg(required = true)]
        prompt: Vec<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// List stored policies
    Policies,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    let settings = Settings::from_env();
    init_tracing(&settings.log_level);

    let cli = Cli::parse();
    let parser = RegexPolicyParser::new();

    match cli.command {
        Command::Backtest { prompt, name } => {
            let parsed = parser.parse_text(&prompt.join(" "), name.as_deref());
            info!(ticker = %parsed.strategy.ticker, name = %parsed.name, "Running backtest");

            let data = market_data::from_settings(&settings)?.with_progress(log_progress());
            let runner = BacktestRunner::new(Arc::new(data)).with_progress(log_progress());
            let result = runner.run(&parsed.strategy, None).await?;
            print_json(&result)?;
        }
        Command::Parse { prompt, name } => {
            let parsed = parser.parse_text(&prompt.join(" "), name.as_deref());
            print_json(&parsed)?;
        }
        Command::Policies => {
            let store = JsonPolicyStore::open(&settings.policy_db_path).await?;
            print_json(&store.list().await?)?;
        }
    }

    Ok(())
}
