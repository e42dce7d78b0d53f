use clap::Parser;
use spendwise::args::{Args, Command};
use spendwise::prompt::TerminalChooser;
use spendwise::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().spendwise_home().path();

    // When SPENDWISE_IN_TEST_MODE is set and non-empty, online lookups are answered from canned
    // data instead of the network.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init => commands::init(home).await?.print(),

        Command::Categorize(categorize_args) => {
            let config = Config::load(home).await?;
            let mut chooser = TerminalChooser;
            commands::categorize(&config, mode, categorize_args, &mut chooser)
                .await?
                .print()
        }

        Command::Learn(learn_args) => {
            let config = Config::load(home).await?;
            commands::learn(&config, learn_args.merchant(), learn_args.category())
                .await?
                .print()
        }

        Command::Forget(merchant_args) => {
            let config = Config::load(home).await?;
            commands::forget(&config, merchant_args.merchant())
                .await?
                .print()
        }

        Command::Lookup(merchant_args) => {
            let config = Config::load(home).await?;
            commands::lookup(&config, merchant_args.merchant())
                .await?
                .print()
        }

        Command::Guess(merchant_args) => {
            let config = Config::load(home).await?;
            commands::guess(&config, mode, merchant_args.merchant())
                .await?
                .print()
        }

        Command::Mappings => commands::mappings(&Config::load(home).await?)
            .await?
            .print(),
    };
    Ok(())
}

/// Initializes the tracing subscriber. Logs go to stderr so that stdout carries only the
/// categorized statement.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        None => {
            // RUST_LOG does not exist; use the given level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
