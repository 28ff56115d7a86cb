use std::io;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rusty_ledger::config::AppConfig;
use rusty_ledger::insights::GeminiProvider;
use rusty_ledger::runner::Command;
use rusty_ledger::storage::FileStore;
use rusty_ledger::App;

#[derive(Parser, Debug)]
#[command(name = "rusty-ledger", version, about = "Personal finance ledger with local accounts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rusty_ledger=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(err) = run_app(cli).await {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

async fn run_app(cli: Cli) -> rusty_ledger::Result<()> {
    let config = AppConfig::load()?;
    let storage = Arc::new(FileStore::open(&config.storage.data_dir)?);
    let insights = Box::new(GeminiProvider::new(config.insights.clone())?);

    let mut app = App::open(storage, insights)?;
    app.run(cli.command, &mut io::stdout()).await
}
