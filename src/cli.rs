//! CLI definition and dispatch.

use chrono::{Datelike, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::category::{
    BalanceKey, InvestmentBucket, OptionKey, OptionType, StockKey, Strike,
};
use crate::domain::error::LedgerError;
use crate::domain::filter::BalanceFilter;
use crate::domain::ledger::{BalanceSnapshot, LocState, NotionalReturn};
use crate::domain::provider::LedgerProvider;
use crate::domain::transaction::{DATE_FORMAT, TransactionRecord, TransactionType};
use crate::ports::clock_port::{Clock, SystemClock};
use crate::ports::config_port::ConfigPort;
use crate::ports::transaction_port::TransactionJournal;

#[derive(Parser, Debug)]
#[command(name = "tradeledger", about = "Point-in-time balances from a trading journal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub account: Option<String>,
    #[arg(long)]
    pub currency: Option<String>,
    /// May be repeated; matches any of the given tickers
    #[arg(long = "ticker")]
    pub tickers: Vec<String>,
    #[arg(long)]
    pub margin: Option<String>,
    /// regular or temp
    #[arg(long)]
    pub investment_type: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Balance of a category on one date
    Balance {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        category: String,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Mean daily balance of a category over a date range
    Average {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        category: String,
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,
        #[arg(long, value_parser = parse_date)]
        end: NaiveDate,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Revenue earned over a date range
    Revenue {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Open stock and option positions
    Positions {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Accounts, currencies and tickers in the journal
    Dimensions {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Revenue against average notional, month to date and for prior months
    Ron {
        #[arg(short, long)]
        config: PathBuf,
        /// Number of monthly periods, counting the current month
        #[arg(long, default_value_t = 1)]
        months: usize,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Close all or part of an open stock or option position
    Close {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        account: String,
        #[arg(long)]
        ticker: String,
        #[arg(long, default_value = "USD")]
        currency: String,
        #[arg(long, default_value = "0%")]
        margin: String,
        /// Stk, Put or Call
        #[arg(long = "type", default_value = "Stk")]
        trans_type: String,
        #[arg(long)]
        strike: Option<f64>,
        #[arg(long, value_parser = parse_date)]
        expiry: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Shares or contracts to close, always positive
        #[arg(long)]
        quantity: f64,
        /// Cash moved by the close: positive when received, negative when paid
        #[arg(long, allow_hyphen_values = true)]
        net: f64,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Append a confirmed transaction to the journal
    Add {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        account: String,
        #[arg(long)]
        ticker: String,
        #[arg(long, default_value = "USD")]
        currency: String,
        #[arg(long, default_value = "0%")]
        margin: String,
        #[arg(long)]
        date: Option<String>,
        /// Journal label: Stk, Put, Call, Cash, Cap Gains, Div, Int / Tax
        #[arg(long = "type")]
        trans_type: String,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        shares: String,
        #[arg(long, default_value = "0")]
        strike: String,
        #[arg(long, default_value = "9999-12-31")]
        expiry: String,
        #[arg(long, allow_hyphen_values = true)]
        net_gains: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| format!("invalid date {s:?} (expected YYYY-MM-DD): {e}"))
}

/// Settings read from the INI file.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub transactions_path: PathBuf,
    pub loc: LocState,
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli, Arc::new(SystemClock)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            (&err).into()
        }
    }
}

/// Dispatch one command with "today" taken from `clock`.
pub fn execute(cli: Cli, clock: Arc<dyn Clock>) -> Result<(), LedgerError> {
    match cli.command {
        Command::Balance {
            config,
            category,
            date,
            filters,
        } => run_balance(&config, &category, date, &filters, clock),
        Command::Average {
            config,
            category,
            start,
            end,
            filters,
        } => run_average(&config, &category, start, end, &filters, clock),
        Command::Revenue {
            config,
            start,
            end,
            filters,
        } => run_revenue(&config, start, end, &filters, clock),
        Command::Positions {
            config,
            date,
            filters,
        } => run_positions(&config, date, &filters, clock),
        Command::Dimensions { config } => run_dimensions(&config, clock),
        Command::Ron {
            config,
            months,
            filters,
        } => run_ron(&config, months, &filters, clock),
        Command::Close {
            config,
            account,
            ticker,
            currency,
            margin,
            trans_type,
            strike,
            expiry,
            date,
            quantity,
            net,
            notes,
        } => {
            let key = position_key(
                account,
                ticker,
                currency,
                margin,
                &trans_type,
                strike,
                expiry,
            )?;
            let date = date.unwrap_or_else(|| clock.today());
            run_close(&config, &key, date, quantity, net, &notes, clock)
        }
        Command::Add {
            config,
            account,
            ticker,
            currency,
            margin,
            date,
            trans_type,
            shares,
            strike,
            expiry,
            net_gains,
            notes,
        } => {
            let date = date.unwrap_or_else(|| clock.today().format(DATE_FORMAT).to_string());
            let record = TransactionRecord {
                account: Some(account),
                ticker: Some(ticker),
                currency: Some(currency),
                margin: Some(margin),
                date: Some(date),
                trans_type: Some(trans_type),
                shares: Some(shares),
                strike: Some(strike),
                expiry: Some(expiry),
                net_gains: Some(net_gains),
                notes: Some(notes),
            };
            run_add(&config, &record, clock)
        }
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, LedgerError> {
    FileConfigAdapter::from_file(path).map_err(|e| LedgerError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn optional_double(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, LedgerError> {
    match config.get_string(section, key) {
        None => Ok(0.0),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|e| LedgerError::ConfigInvalid {
                section: section.into(),
                key: key.into(),
                reason: e.to_string(),
            }),
    }
}

/// Missing LOC values default to zero; present but non-numeric ones are errors.
pub fn build_ledger_config(config: &dyn ConfigPort) -> Result<LedgerConfig, LedgerError> {
    let transactions_path = config
        .get_string("ledger", "transactions_path")
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| LedgerError::ConfigMissing {
            section: "ledger".into(),
            key: "transactions_path".into(),
        })?;

    let limit = optional_double(config, "loc", "limit")?;
    let usage = optional_double(config, "loc", "usage")?;

    Ok(LedgerConfig {
        transactions_path: PathBuf::from(transactions_path),
        loc: LocState::new(limit, usage),
    })
}

pub fn build_filter(args: &FilterArgs) -> Result<BalanceFilter, LedgerError> {
    let mut filter = BalanceFilter::new();
    filter.account = args.account.clone();
    filter.currency = args.currency.clone();
    filter.margin = args.margin.clone();
    if !args.tickers.is_empty() {
        filter = filter.tickers(args.tickers.iter().cloned());
    }
    if let Some(name) = &args.investment_type {
        filter = filter.investment_type(name.parse::<InvestmentBucket>()?);
    }
    Ok(filter)
}

/// Key of the stock or option position a `close` targets.
pub fn position_key(
    account: String,
    ticker: String,
    currency: String,
    margin: String,
    trans_type: &str,
    strike: Option<f64>,
    expiry: Option<NaiveDate>,
) -> Result<BalanceKey, LedgerError> {
    let kind = TransactionType::parse(trans_type);
    if kind == TransactionType::Stock {
        return Ok(BalanceKey::Stock(StockKey {
            account,
            currency,
            margin,
            ticker,
        }));
    }
    let option_type = OptionType::from_transaction_type(&kind).ok_or_else(|| {
        LedgerError::InvalidClose {
            reason: format!("{trans_type:?} is not Stk, Put or Call"),
        }
    })?;
    let (Some(strike), Some(expiry)) = (strike, expiry) else {
        return Err(LedgerError::InvalidClose {
            reason: "option closes need --strike and --expiry".into(),
        });
    };
    Ok(BalanceKey::Option(OptionKey {
        account,
        currency,
        margin,
        ticker,
        option_type,
        strike: Strike::from_price(strike),
        expiry,
    }))
}

/// `(start, end)` windows for the current month to date and the
/// `count - 1` whole months before it, newest first.
pub fn monthly_windows(today: NaiveDate, count: usize) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::with_capacity(count);
    let mut end = today;
    for _ in 0..count {
        let start = end.with_day(1).unwrap_or(end);
        windows.push((start, end));
        match start.pred_opt() {
            Some(previous) => end = previous,
            None => break,
        }
    }
    windows
}

fn open_ledger(
    config_path: &PathBuf,
    clock: Arc<dyn Clock>,
) -> Result<(LedgerConfig, LedgerProvider), LedgerError> {
    let adapter = load_config(config_path)?;
    let config = build_ledger_config(&adapter)?;
    let source = CsvAdapter::new(config.transactions_path.clone());
    let (provider, report) = LedgerProvider::open(&source, config.loc, clock)?;
    if !report.rejected.is_empty() {
        eprintln!(
            "warning: skipped {} of {} journal rows",
            report.rejected.len(),
            report.total()
        );
    }
    Ok((config, provider))
}

fn print_snapshot(snapshot: &BalanceSnapshot) {
    for (key, value) in &snapshot.breakdown {
        println!("{key}\t{value:.2}");
    }
    println!("TOTAL\t{:.2}", snapshot.total);
}

fn run_balance(
    config_path: &PathBuf,
    category: &str,
    date: Option<NaiveDate>,
    filters: &FilterArgs,
    clock: Arc<dyn Clock>,
) -> Result<(), LedgerError> {
    let filter = build_filter(filters)?;
    let date = date.unwrap_or_else(|| clock.today());
    let (_, provider) = open_ledger(config_path, clock)?;
    let snapshot = provider.read(|ledger| ledger.spot_balance_by_name(date, category, &filter))?;
    print_snapshot(&snapshot);
    Ok(())
}

fn run_average(
    config_path: &PathBuf,
    category: &str,
    start: NaiveDate,
    end: NaiveDate,
    filters: &FilterArgs,
    clock: Arc<dyn Clock>,
) -> Result<(), LedgerError> {
    let filter = build_filter(filters)?;
    let (_, provider) = open_ledger(config_path, clock)?;
    let snapshot =
        provider.read(|ledger| ledger.average_balance_by_name(start, end, category, &filter))?;
    print_snapshot(&snapshot);
    Ok(())
}

fn run_revenue(
    config_path: &PathBuf,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    filters: &FilterArgs,
    clock: Arc<dyn Clock>,
) -> Result<(), LedgerError> {
    let filter = build_filter(filters)?;
    let end = end.unwrap_or_else(|| clock.today());
    let (_, provider) = open_ledger(config_path, clock)?;
    let snapshot = provider.read(|ledger| {
        // lifetime when no start is given
        let start = start.or(ledger.first_transaction_date()).unwrap_or(end);
        ledger.revenue_between(start, end, &filter)
    })?;
    print_snapshot(&snapshot);
    Ok(())
}

fn run_positions(
    config_path: &PathBuf,
    date: Option<NaiveDate>,
    filters: &FilterArgs,
    clock: Arc<dyn Clock>,
) -> Result<(), LedgerError> {
    let filter = build_filter(filters)?;
    let date = date.unwrap_or_else(|| clock.today());
    let (_, provider) = open_ledger(config_path, clock)?;
    let positions = provider.read(|ledger| ledger.positions(date, &filter));

    for stock in &positions.stocks {
        let k = &stock.key;
        println!(
            "STK\t{}\t{}\t{}\t{}\t{}\t{:.2}",
            k.account, k.currency, k.margin, k.ticker, stock.shares, stock.notional
        );
    }
    for option in &positions.options {
        let k = &option.key;
        println!(
            "OPT\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.2}",
            k.account,
            k.currency,
            k.margin,
            k.ticker,
            k.option_type,
            k.strike,
            k.expiry,
            option.contracts,
            option.notional
        );
    }
    Ok(())
}

fn run_dimensions(config_path: &PathBuf, clock: Arc<dyn Clock>) -> Result<(), LedgerError> {
    let (_, provider) = open_ledger(config_path, clock)?;
    provider.read(|ledger| {
        let dims = ledger.dimensions();
        println!("accounts\t{}", dims.accounts.join(","));
        println!("currencies\t{}", dims.currencies.join(","));
        println!("tickers\t{}", dims.tickers.join(","));
        if let Some(first) = ledger.first_transaction_date() {
            println!("inception\t{first}");
        }
        let loc = ledger.get_loc_info();
        println!(
            "loc\tlimit={:.2}\tusage={:.2}\tavailable={:.2}",
            loc.limit,
            loc.usage,
            loc.available()
        );
    });
    Ok(())
}

fn run_ron(
    config_path: &PathBuf,
    months: usize,
    filters: &FilterArgs,
    clock: Arc<dyn Clock>,
) -> Result<(), LedgerError> {
    let filter = build_filter(filters)?;
    let windows = monthly_windows(clock.today(), months);
    let (_, provider) = open_ledger(config_path, clock)?;

    let mut total = NotionalReturn::default();
    for (i, (start, end)) in windows.iter().enumerate() {
        let ron = provider.read(|ledger| ledger.return_on_notional(*start, *end, &filter))?;
        let period = if i == 0 {
            "MTD".to_string()
        } else {
            end.format("%m/%y").to_string()
        };
        println!(
            "{period}\t{:.2}\t{:.2}\t{:.2}%",
            ron.revenue,
            ron.average_notional,
            ron.percent()
        );
        total.revenue += ron.revenue;
        total.average_notional += ron.average_notional;
    }

    if !windows.is_empty() {
        println!(
            "Avg\t{:.2}\t{:.2}\t{:.2}%",
            total.revenue,
            total.average_notional / windows.len() as f64,
            total.percent()
        );
    }
    Ok(())
}

/// Append every record to the ledger and then to the journal.
fn confirm(
    config: &LedgerConfig,
    provider: &LedgerProvider,
    records: &[TransactionRecord],
) -> Result<(), LedgerError> {
    let journal = CsvAdapter::new(config.transactions_path.clone());
    for record in records {
        let tx = provider.append(record).map_err(|rejection| LedgerError::Source {
            reason: format!("transaction rejected: {}", rejection.error),
        })?;
        journal.append_record(record)?;
        println!(
            "added\t{}\t{}\t{}\t{}\t{:.2}",
            tx.account, tx.ticker, tx.kind, tx.date, tx.net_amount
        );
    }
    Ok(())
}

fn run_close(
    config_path: &PathBuf,
    key: &BalanceKey,
    date: NaiveDate,
    quantity: f64,
    net: f64,
    notes: &str,
    clock: Arc<dyn Clock>,
) -> Result<(), LedgerError> {
    let (config, provider) = open_ledger(config_path, clock)?;
    let records =
        provider.read(|ledger| ledger.closing_records(key, date, quantity, net, notes))?;
    confirm(&config, &provider, &records)
}

fn run_add(
    config_path: &PathBuf,
    record: &TransactionRecord,
    clock: Arc<dyn Clock>,
) -> Result<(), LedgerError> {
    let (config, provider) = open_ledger(config_path, clock)?;
    confirm(&config, &provider, std::slice::from_ref(record))
}
