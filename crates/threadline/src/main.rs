//! `threadline` - email ingestion and threading daemon.
//!
//! Pulls POP3 mailboxes into conversation entries, threads replies onto
//! their parent cases, alerts on unanswered threads and delivers the
//! resulting mail over SMTP.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, bail};
use clap::Parser;
use threadline_core::settings::default_settings_path;
use threadline_core::{
    Account, AccountId, AccountPull, AccountService, CaseKinds, Context, EngineSettings, Error,
    Ingestor, OutboxDispatcher, Pop3Connector, PullMode, RunMode, Scheduler, SmtpMailer, Store,
    ThreadResolver, UnrepliedNotifier,
};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{AccountsCommand, Cli, Command};

const DEFAULT_LOG_FILTER: &str = "threadline=info,threadline_core=info,threadline_pop3=info";

/// Everything a command needs, wired from the settings.
struct Engine {
    settings: EngineSettings,
    store: Store,
    kinds: CaseKinds,
    accounts: AccountService,
    scheduler: Scheduler,
}

impl Engine {
    async fn open(settings: EngineSettings) -> anyhow::Result<Self> {
        let store = Store::open(&settings.database_path)
            .await
            .with_context(|| format!("opening database {}", settings.database_path.display()))?;
        let kinds = CaseKinds::builtin();
        let connector = Arc::new(Pop3Connector::new());
        let mailer = Arc::new(SmtpMailer::new());

        let ingestor = Ingestor::new(
            store.clone(),
            ThreadResolver::new(kinds.clone()),
            connector.clone(),
            settings.delivery,
        );
        let notifier = UnrepliedNotifier::new(store.clone(), settings.unreplied_lookback_factor);
        let dispatcher = OutboxDispatcher::new(
            store.clone(),
            mailer.clone(),
            settings.outbox_max_attempts,
            settings.outbox_batch_size,
        );
        let scheduler = Scheduler::new(
            store.clone(),
            ingestor,
            notifier,
            dispatcher,
            Arc::new(Context::normal()),
        );
        let accounts = AccountService::new(store.clone(), kinds.clone(), connector, mailer);

        Ok(Self {
            settings,
            store,
            kinds,
            accounts,
            scheduler,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_settings_path);
    let settings = EngineSettings::load(&config_path)
        .await
        .with_context(|| format!("loading settings from {}", config_path.display()))?;

    // Initialize logging
    let fallback = settings
        .log_filter
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if matches!(cli.command, Command::Init) {
        return init_settings(&config_path, &settings).await;
    }

    let engine = Engine::open(settings).await?;
    match cli.command {
        Command::Init => Ok(()),
        Command::Run => run(&engine).await,
        Command::Pull { parallel } => {
            let mode = if parallel { PullMode::Spawned } else { PullMode::Inline };
            let results = engine.scheduler.pull(mode).await?;
            print_pulls(&results);
            if results.iter().any(|r| r.outcome.is_err()) {
                bail!("some mailboxes could not be pulled completely");
            }
            Ok(())
        }
        Command::Notify => {
            let report = engine.scheduler.notify_unreplied().await?;
            println!(
                "{} accounts, {} entries examined, {} alerts queued, {} failed",
                report.accounts, report.examined, report.notified, report.failed
            );
            Ok(())
        }
        Command::Dispatch => {
            let report = engine.scheduler.dispatch_outbox().await?;
            println!(
                "{} sent, {} to retry, {} failed",
                report.sent, report.retrying, report.failed
            );
            Ok(())
        }
        Command::Accounts(command) => accounts(&engine, command).await,
        Command::Kinds => {
            for name in engine.kinds.names() {
                let key = if engine.kinds.has_email_field(name) {
                    " (unique by sender)"
                } else {
                    ""
                };
                println!("{name}{key}");
            }
            Ok(())
        }
    }
}

async fn init_settings(path: &Path, settings: &EngineSettings) -> anyhow::Result<()> {
    if tokio::fs::try_exists(path).await? {
        println!("{} already exists", path.display());
        return Ok(());
    }
    settings.save(path).await?;
    println!("wrote {}", path.display());
    Ok(())
}

/// Runs the three periodic jobs until Ctrl-C.
async fn run(engine: &Engine) -> anyhow::Result<()> {
    let settings = &engine.settings;
    let mut pull = interval(Duration::from_secs(settings.poll_interval_secs.max(1)));
    let mut sweep = interval(Duration::from_secs(settings.notify_interval_secs.max(1)));
    let mut dispatch = interval(Duration::from_secs(settings.dispatch_interval_secs.max(1)));
    for timer in [&mut pull, &mut sweep, &mut dispatch] {
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        database = %settings.database_path.display(),
        delivery = ?settings.delivery,
        "Starting threadline"
    );
    loop {
        tokio::select! {
            _ = pull.tick() => match engine.scheduler.pull(PullMode::Spawned).await {
                Ok(results) => {
                    let failed = results.iter().filter(|r| r.outcome.is_err()).count();
                    if failed > 0 {
                        warn!(accounts = results.len(), failed, "Pull round finished with failures");
                    }
                }
                Err(e) => error!("Pull round failed: {}", e),
            },
            _ = sweep.tick() => {
                if let Err(e) = engine.scheduler.notify_unreplied().await {
                    error!("Unreplied sweep failed: {}", e);
                }
            }
            _ = dispatch.tick() => {
                if let Err(e) = engine.scheduler.dispatch_outbox().await {
                    error!("Outbox dispatch failed: {}", e);
                }
            }
            signal = &mut shutdown => {
                signal.context("listening for Ctrl-C")?;
                info!("Shutting down");
                return Ok(());
            }
        }
    }
}

async fn accounts(engine: &Engine, command: AccountsCommand) -> anyhow::Result<()> {
    match command {
        AccountsCommand::List => {
            for account in engine.store.accounts().list().await? {
                print_account(&account);
            }
        }
        AccountsCommand::Import { file, skip_check } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let mut imported: Vec<Account> = if text.trim_start().starts_with('[') {
                serde_json::from_str(&text)?
            } else {
                vec![serde_json::from_str(&text)?]
            };

            let mode = if skip_check { RunMode::Install } else { RunMode::Normal };
            let ctx = Context::with_mode(mode);
            for account in &mut imported {
                match engine.accounts.save(account, &ctx).await {
                    Ok(()) => print_account(account),
                    Err(e) => {
                        error!(email = %account.email, "Import failed: {}", e);
                        return Err(e).with_context(|| format!("importing {}", account.email));
                    }
                }
            }
        }
        AccountsCommand::Check { id } => {
            let account = engine
                .store
                .accounts()
                .get(AccountId::new(id))
                .await?
                .ok_or_else(|| Error::AccountNotFound(id.to_string()))?;
            engine.accounts.check_connectivity(&account).await?;
            println!("{}: ok", account.email);
        }
        AccountsCommand::Delete { id } => {
            engine.accounts.delete(AccountId::new(id)).await?;
            println!("deleted account {id}");
        }
    }
    Ok(())
}

fn print_account(account: &Account) {
    let id = account.id.map_or_else(|| "-".to_string(), |id| id.to_string());
    let mut flags = Vec::new();
    if account.incoming.enabled {
        flags.push("incoming");
    }
    if account.outgoing.enabled {
        flags.push("outgoing");
    }
    if account.default_incoming {
        flags.push("default-incoming");
    }
    if account.default_outgoing {
        flags.push("default-outgoing");
    }
    println!(
        "{id:>4}  {:<32} {:<24} {:<14} [{}]",
        account.email,
        account.name,
        account.append_to.as_deref().unwrap_or("-"),
        flags.join(", ")
    );
}

fn print_pulls(results: &[AccountPull]) {
    for pull in results {
        match &pull.outcome {
            Ok(report) => println!(
                "{}: {} fetched, {} ingested, {} new cases",
                pull.email, report.fetched, report.ingested, report.cases_created
            ),
            Err(e) => println!("{}: {}", pull.email, e),
        }
    }
}
