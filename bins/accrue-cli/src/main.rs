//! accrue-cli: Command-line front end for a persistent Accrue ledger.
//!
//! Opens the RocksDB ledger under the configured data directory, runs one
//! operation, and prints the result as text or JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use accrue_core::clock::{ManualClock, SystemClock};
use accrue_core::constants::{PRECISION, WITHDRAW_ALL};
use accrue_core::traits::Clock;
use accrue_core::types::{AccountId, AccountState};
use accrue_ledger::{AccrualLedger, LedgerConfig, RocksStore, TracingSink};

/// Accrue ledger command-line interface.
#[derive(Parser)]
#[command(name = "accrue-cli")]
#[command(version, about = "Linear-interest deposit ledger")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to a TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Pin the clock to this Unix timestamp instead of wall-clock time.
    #[arg(long, global = true)]
    at: Option<u64>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Log level (overrides config).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format, "text" or "json" (overrides config).
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Global rate subcommands.
    Rate {
        #[command(subcommand)]
        action: RateAction,
    },
    /// Deposit into an account, freezing the current global rate for it.
    Deposit(AmountArgs),
    /// Withdraw from an account ("all" withdraws the full balance).
    Withdraw(WithdrawArgs),
    /// Show an account's current balance including accrued interest.
    Balance(AccountArgs),
    /// Fold an account's accrued interest into its principal.
    Accrue(AccountArgs),
    /// Show an account's stored record.
    Account(AccountArgs),
    /// List all accounts.
    Accounts,
    /// Show total supply.
    Supply,
}

#[derive(Subcommand)]
enum RateAction {
    /// Show the global rate.
    Show,
    /// Lower the global rate (fixed-point, 10^18 = 1.0 per second).
    Set {
        /// New rate; must not exceed the current rate.
        rate: u64,
    },
}

#[derive(Args)]
struct AccountArgs {
    /// Account as 64 hex characters, or a label hashed into an identifier.
    account: String,
}

#[derive(Args)]
struct AmountArgs {
    /// Account as 64 hex characters, or a label hashed into an identifier.
    account: String,

    /// Amount in base units.
    amount: u64,
}

#[derive(Args)]
struct WithdrawArgs {
    /// Account as 64 hex characters, or a label hashed into an identifier.
    account: String,

    /// Amount in base units, or "all".
    amount: String,
}

/// Resolve a command-line account argument.
///
/// Exactly 64 hex characters are taken as raw bytes; anything else is a label.
fn parse_account(arg: &str) -> AccountId {
    if arg.len() == 64 {
        if let Ok(id) = arg.parse() {
            return id;
        }
    }
    AccountId::from_label(arg)
}

fn parse_withdraw_amount(arg: &str) -> Result<u64> {
    match arg {
        "all" | "max" => Ok(WITHDRAW_ALL),
        n => n
            .parse()
            .with_context(|| format!("invalid amount {n:?}: expected an integer or \"all\"")),
    }
}

#[derive(Serialize)]
struct AccountView {
    account: AccountId,
    #[serde(flatten)]
    state: AccountState,
}

#[derive(Serialize)]
struct OperationView {
    account: AccountId,
    amount: u64,
    interest: u64,
    principal: u64,
    frozen_rate: u64,
    last_update: u64,
}

/// Supply can exceed `u64`, which `serde_json::Value` cannot hold.
#[derive(Serialize)]
struct SupplyView {
    total_supply: u128,
}

fn print<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

/// Render a fixed-point rate as a decimal per-second figure.
fn format_rate(rate: u64) -> String {
    format!("{}.{:018}", rate / PRECISION, rate % PRECISION)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = LedgerConfig::load(cli.global.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(dir) = cli.global.data_dir.clone() {
        config.data_dir = dir;
    }
    if let Some(level) = cli.global.log_level.clone() {
        config.log_level = level;
    }
    if let Some(format) = cli.global.log_format.clone() {
        config.log_format = format;
    }

    init_logging(&config.log_level, &config.log_format);

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create data_dir {:?}", config.data_dir))?;

    let clock: Arc<dyn Clock> = match cli.global.at {
        Some(at) => Arc::new(ManualClock::new(at)),
        None => Arc::new(SystemClock),
    };
    let store = RocksStore::open(config.db_path()).context("failed to open ledger store")?;
    let ledger = AccrualLedger::open(
        store,
        config.initial_global_rate,
        clock.clone(),
        Arc::new(TracingSink),
    )
    .context("failed to open ledger")?;
    info!(data_dir = ?config.data_dir, now = clock.now(), "ledger ready");

    let json = cli.global.json;
    let result = run(&ledger, cli.command, json);
    ledger.store().flush().context("failed to flush ledger store")?;
    result
}

fn run(ledger: &AccrualLedger<RocksStore>, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Rate { action } => match action {
            RateAction::Show => {
                let rate = ledger.global_rate();
                print(json, &serde_json::json!({ "global_rate": rate }), || {
                    format!("global rate: {rate} ({}/s)", format_rate(rate))
                })
            }
            RateAction::Set { rate } => {
                let old = ledger.global_rate();
                ledger.set_global_rate(rate).context("rate update rejected")?;
                print(
                    json,
                    &serde_json::json!({ "old": old, "new": rate }),
                    || format!("global rate: {old} -> {rate}"),
                )
            }
        },
        Commands::Deposit(args) => {
            let account = parse_account(&args.account);
            let t = ledger
                .deposit(&account, args.amount)
                .context("deposit failed")?;
            let view = OperationView {
                account,
                amount: t.amount,
                interest: t.interest,
                principal: t.state.principal,
                frozen_rate: t.state.frozen_rate,
                last_update: t.state.last_update,
            };
            print(json, &view, || {
                format!(
                    "deposited {} to {account} (interest folded: {}, principal: {}, frozen rate: {})",
                    view.amount, view.interest, view.principal, view.frozen_rate
                )
            })
        }
        Commands::Withdraw(args) => {
            let account = parse_account(&args.account);
            let amount = parse_withdraw_amount(&args.amount)?;
            let t = ledger
                .withdraw(&account, amount)
                .context("withdraw failed")?;
            let view = OperationView {
                account,
                amount: t.amount,
                interest: t.interest,
                principal: t.state.principal,
                frozen_rate: t.state.frozen_rate,
                last_update: t.state.last_update,
            };
            print(json, &view, || {
                format!(
                    "withdrew {} from {account} (interest folded: {}, principal: {})",
                    view.amount, view.interest, view.principal
                )
            })
        }
        Commands::Balance(args) => {
            let account = parse_account(&args.account);
            let balance = ledger.current_balance(&account)?;
            print(
                json,
                &serde_json::json!({ "account": account, "balance": balance }),
                || format!("{account}: {balance}"),
            )
        }
        Commands::Accrue(args) => {
            let account = parse_account(&args.account);
            let t = ledger.accrue(&account)?;
            print(
                json,
                &serde_json::json!({
                    "account": account,
                    "interest": t.interest,
                    "principal": t.state.principal,
                }),
                || format!("{account}: +{} (principal: {})", t.interest, t.state.principal),
            )
        }
        Commands::Account(args) => {
            let account = parse_account(&args.account);
            let view = AccountView {
                account,
                state: ledger.account(&account)?,
            };
            print(json, &view, || {
                format!(
                    "{account}\n  principal:   {}\n  frozen rate: {}\n  last update: {}",
                    view.state.principal, view.state.frozen_rate, view.state.last_update
                )
            })
        }
        Commands::Accounts => {
            let views: Vec<AccountView> = ledger
                .accounts()?
                .into_iter()
                .map(|(account, state)| AccountView { account, state })
                .collect();
            print(json, &views, || {
                if views.is_empty() {
                    return "no accounts".to_string();
                }
                views
                    .iter()
                    .map(|v| {
                        format!(
                            "{} principal={} frozen_rate={} last_update={}",
                            v.account, v.state.principal, v.state.frozen_rate, v.state.last_update
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        }
        Commands::Supply => {
            let view = SupplyView {
                total_supply: ledger.total_supply()?,
            };
            print(json, &view, || format!("total supply: {}", view.total_supply))
        }
    }
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Logs go to stderr so stdout carries only command output.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
