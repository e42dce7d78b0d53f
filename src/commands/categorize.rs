use crate::args::CategorizeArgs;
use crate::commands::Out;
use crate::memory::MerchantMap;
use crate::pipeline::{ResolutionPipeline, ResolveSummary};
use crate::prompt::Chooser;
use crate::report::{apply_splits, export, write_csv, Totals};
use crate::signal::{ExternalSignals, Mode};
use crate::statement::{load_statement, ColumnMap};
use crate::{Config, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// What `categorize` did.
#[derive(Debug, Clone, Serialize)]
pub struct Categorized {
    pub resolution: ResolveSummary,
    /// Merchants a human picked a category for.
    pub confirmed: usize,
    /// Merchants left without a category.
    pub skipped: usize,
    pub shared: usize,
    pub output: Option<PathBuf>,
    pub totals: Totals,
}

/// Categorizes a statement: the merchant map first, then online hints, then the `chooser` for
/// whatever is left. Decisions made through the `chooser` are saved to the merchant map. If the
/// `chooser` fails, the merchants not yet asked about are left uncategorized. The categorized
/// statement goes to `--output` or, without it, to stdout.
pub async fn categorize(
    config: &Config,
    mode: Mode,
    args: &CategorizeArgs,
    chooser: &mut dyn Chooser,
) -> Result<Out<Categorized>> {
    let columns = ColumnMap::new(
        args.date_column(),
        args.description_column(),
        args.amount_column(),
    );
    let mut transactions = load_statement(args.file(), &columns, args.negate()).await?;
    if transactions.is_empty() {
        warn!("No readable transactions in {}", args.file().display());
    }

    let memory = MerchantMap::from_config(config).await?;
    let mut pipeline = ResolutionPipeline::new(Box::new(memory))
        .auto_accept_external(config.auto_accept_external());
    if config.online().enabled() && !args.offline() {
        pipeline = pipeline.with_provider(Box::new(ExternalSignals::from_config(config, mode)?));
    } else {
        debug!("Online lookups are off");
    }

    let resolution = pipeline
        .resolve(transactions.iter().map(|t| t.merchant()))
        .await;

    let mut confirmed = 0;
    let mut skipped = 0;
    let mut prompting = !args.no_prompt();
    for pending in pipeline.pending() {
        if !prompting {
            skipped += 1;
            continue;
        }
        let category = match chooser.choose(&pending.merchant, pending.suggestion.as_ref()) {
            Ok(Some(category)) => category,
            Ok(None) => {
                skipped += 1;
                continue;
            }
            Err(e) => {
                warn!(
                    "Unable to ask about '{}', the remaining merchants stay uncategorized: {e}",
                    pending.merchant
                );
                prompting = false;
                skipped += 1;
                continue;
            }
        };
        match pipeline.confirm(&pending.merchant, category).await {
            Ok(()) => confirmed += 1,
            Err(e) => {
                warn!("Unable to save a category for '{}': {e}", pending.merchant);
                skipped += 1;
            }
        }
    }

    pipeline.apply(&mut transactions);
    let shared = apply_splits(&mut transactions, args.splits());
    if shared == 0 && !args.splits().is_empty() {
        warn!("None of the --split merchants appear in the statement");
    }
    let totals = Totals::from_transactions(&transactions);

    match args.output() {
        Some(path) => {
            export(path, &transactions).await?;
            info!("Wrote {} transactions to {}", transactions.len(), path.display());
        }
        None => write_csv(std::io::stdout().lock(), &transactions)?,
    }

    let message = format!(
        "Categorized {} merchants: {} from the merchant map, {} online, {} by you, {} skipped\n{totals}",
        resolution.merchants, resolution.memory, resolution.external, confirmed, skipped
    );
    Ok(Out::new(
        message,
        Categorized {
            resolution,
            confirmed,
            skipped,
            shared,
            output: args.output().map(PathBuf::from),
            totals,
        },
    ))
}
