use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands::*, TraceLevel};
use macroboard_sync::{api, config::Config, endp::monday::Monday, sync};
use tracing::{info, subscriber, trace, Level};
use tracing_subscriber::FmtSubscriber;

mod cli;

fn preprocess(trace_level: Level) {
    dotenv::dotenv().ok();
    let my_subscriber = FmtSubscriber::builder()
        .with_max_level(trace_level)
        .finish();
    subscriber::set_global_default(my_subscriber).expect("Set subscriber");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.trace {
        TraceLevel::DEBUG => Level::DEBUG,
        TraceLevel::INFO => Level::INFO,
        TraceLevel::WARN => Level::WARN,
        TraceLevel::ERROR => Level::ERROR,
    };

    preprocess(log_level);
    trace!("Command line input recorded: {cli:#?}");

    // credentials, board id, column map, and routing policy are read exactly
    // once; everything below takes the Config by reference
    let cfg = Config::from_env()?;
    let http_client = api::build_client()?;

    // cli framework:
    // "> macroboard <COMMAND>"
    match &cli.command {
        // "> macroboard sync [--dry-run]"
        // one full pass: enumerate rows, fetch, route, write, report
        Sync { dry_run } => {
            let summary = sync::run(&http_client, &cfg, *dry_run).await?;
            summary.print();
        }

        // "> macroboard rows"
        // read-only look at what the board holds
        Rows => {
            let items = Monday::items(&http_client, &cfg).await?;
            info!("{} rows on board {}", items.len(), cfg.board_id);
            for item in &items {
                println!(
                    "{}  {}  [{}]  {}",
                    item.id,
                    item.name,
                    item.group_title().unwrap_or("-"),
                    item.text_of(&cfg.columns.symbol).unwrap_or("-"),
                );
            }
        }
    }

    Ok(())
}
