use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use ledger::backend::domain::BalanceService;
use ledger::backend::storage::{JsonFileSource, RecordSource};
use ledger::{Backend, LedgerConfig};
use log::{error, info};
use rust_decimal::Decimal;
use shared::{LedgerSummary, Locale, Period};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "ledger", version, about = "Aggregate a snapshot of financial records")]
struct Cli {
    /// Snapshot file (JSON array of raw records)
    #[arg(short = 'i', long = "input", conflicts_with = "data_dir")]
    input: Option<PathBuf>,

    /// Directory holding <owner>.json snapshots (overrides the config)
    #[arg(long = "data-dir")]
    data_dir: Option<PathBuf>,

    /// Owner whose snapshot to aggregate (overrides the config)
    #[arg(long = "owner")]
    owner: Option<String>,

    /// Year of the selected period (defaults to the current one)
    #[arg(long = "year", requires = "month")]
    year: Option<i32>,

    /// Month of the selected period, 1-12
    #[arg(long = "month", requires = "year")]
    month: Option<u32>,

    /// YAML config file (defaults to $LEDGER_CONFIG)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    #[arg(long = "format", value_enum, default_value = "text")]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = LedgerConfig::load_from_env_or(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_directory = Some(dir);
    }
    if let Some(owner) = cli.owner {
        config.default_owner = Some(owner);
    }

    let backend = Backend::new(config)?;
    let period = match (cli.year, cli.month) {
        (Some(year), Some(month)) => Some(Period { year, month }),
        _ => None,
    };

    let summary = match cli.input {
        Some(path) => {
            info!("Reading snapshot from {}", path.display());
            let snapshot = JsonFileSource::read_snapshot_file(&path).await?;
            match &backend.config.default_owner {
                Some(owner) => backend.aggregation_service.aggregate_for_owner(owner, &snapshot, period)?,
                None => backend.aggregation_service.aggregate(&snapshot, period)?,
            }
        }
        None => {
            let source = backend
                .json_source()
                .ok_or_else(|| anyhow!("Either --input or a data directory is required"))?;
            let owner = backend
                .config
                .default_owner
                .clone()
                .ok_or_else(|| anyhow!("An owner is required when reading from a data directory"))?;
            let snapshot = source
                .fetch_records(&owner)
                .await
                .with_context(|| format!("Failed to load records for {}", owner))?;
            backend.aggregation_service.aggregate_for_owner(&owner, &snapshot, period)?
        }
    };

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print!("{}", render_text(&summary, backend.config.locale)),
    }
    Ok(())
}

/// "R$ 1.234,56" / "$1,234.56", with a leading minus for negative amounts
fn format_currency(amount: Decimal, locale: Locale) -> String {
    let rounded = BalanceService::round_for_display(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (units, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let (group_separator, decimal_separator, symbol) = match locale {
        Locale::PtBr => ('.', ',', "R$ "),
        Locale::EnUs => (',', '.', "$"),
    };

    let mut grouped = String::new();
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(group_separator);
        }
        grouped.push(digit);
    }

    format!("{}{}{}{}{}", sign, symbol, grouped, decimal_separator, cents)
}

fn render_text(summary: &LedgerSummary, locale: Locale) -> String {
    let mut out = String::new();
    out.push_str(&format!("Total balance: {}\n", format_currency(summary.total_balance, locale)));
    out.push_str(&format!(
        "Balance for {}: {}\n",
        summary.period,
        format_currency(summary.period_balance, locale)
    ));

    for section in &summary.sections {
        out.push_str(&format!("\n{} ({})\n", section.label, format_currency(section.balance, locale)));
        for record in &section.records {
            let date = record
                .occurred_on
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            out.push_str(&format!(
                "  {}  {:<20} {:>16}  {}\n",
                date,
                record.category,
                format_currency(record.signed_amount(), locale),
                record.description.as_deref().unwrap_or("")
            ));
        }
    }

    if summary.skipped_count > 0 {
        out.push_str(&format!("\n{} record(s) skipped\n", summary.skipped_count));
    }
    if !summary.flagged.is_empty() {
        out.push_str(&format!(
            "{} record(s) with an unknown direction counted as outflow\n",
            summary.flagged.len()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(Decimal::new(123456, 2), Locale::PtBr), "R$ 1.234,56");
        assert_eq!(format_currency(Decimal::new(-9999, 2), Locale::PtBr), "-R$ 99,99");
        assert_eq!(format_currency(Decimal::new(64951, 2), Locale::EnUs), "$649.51");
        assert_eq!(format_currency(Decimal::new(100000000, 2), Locale::EnUs), "$1,000,000.00");
        assert_eq!(format_currency(Decimal::ZERO, Locale::PtBr), "R$ 0,00");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["ledger", "--input", "snap.json", "--year", "2024", "--month", "2", "--format", "json"])
            .unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("snap.json")));
        assert_eq!(cli.month, Some(2));
        assert!(matches!(cli.format, OutputFormat::Json));

        assert!(Cli::try_parse_from(["ledger", "--year", "2024"]).is_err());
    }
}
