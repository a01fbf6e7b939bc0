use std::{error::Error, sync::Arc};

use chrono::Utc;
use clap::Parser;
use ledger::{
    ErrorKind, ExpenseCmd, Ledger, LedgerError, LedgerEvent, LedgerObserver, NewGroupCmd,
    SettleCmd,
};
use migration::{Migrator, MigratorTrait};
use uuid::Uuid;

use cli::{Cli, Command, ExpenseCommand, GroupCommand, SettleCommand};

mod cli;
mod settings;

/// Logs every committed write with the resulting balances.
struct EventLog;

impl LedgerObserver for EventLog {
    fn notify(&self, event: &LedgerEvent) {
        match serde_json::to_string(event) {
            Ok(json) => tracing::debug!("ledger event: {json}"),
            Err(err) => tracing::error!("failed to encode ledger event: {err}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::load(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tripsplit={level},ledger={level}",
            level = settings.app.level
        ))
        .init();

    let url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database.url());
    let db = connect_db(&url).await?;
    let ledger = Ledger::builder()
        .database(db)
        .settings(settings.ledger)
        .observer(Arc::new(EventLog))
        .build()
        .await?;

    if let Err(err) = run(&ledger, cli.command).await {
        eprintln!("error: {err}");
        std::process::exit(match err.kind() {
            ErrorKind::Validation => 2,
            ErrorKind::NotFound => 3,
            ErrorKind::Conflict => 4,
            ErrorKind::Internal => 1,
        });
    }
    Ok(())
}

async fn connect_db(
    database_url: &str,
) -> Result<sea_orm::DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = sea_orm::Database::connect(database_url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

async fn run(ledger: &Ledger, command: Command) -> Result<(), LedgerError> {
    match command {
        Command::Group(cli::Group {
            command: GroupCommand::Create(args),
        }) => {
            let id = ledger
                .create_group(
                    NewGroupCmd::new(args.name, args.currency, args.created_by)
                        .members(args.members),
                )
                .await?;
            println!("{id}");
        }
        Command::Group(cli::Group {
            command: GroupCommand::Show { group },
        }) => {
            let group = ledger.group(group).await?;
            println!("{} ({}) {}", group.name, group.currency, group.id);
            for member in &group.members {
                println!(
                    "  {:<16} {:<24} {:<7} {}",
                    member.id,
                    member.name,
                    member.role.as_str(),
                    member.kind.as_str()
                );
            }
        }
        Command::Expense(cli::Expense {
            command: ExpenseCommand::Add(args),
        }) => {
            let split = args.split_method();
            let mut cmd = ExpenseCmd::new(
                args.member_id,
                args.description,
                args.amount,
                Utc::now(),
            )
            .participants(args.participants)
            .split(split);
            cmd = match args.paid_by {
                Some(payer) => cmd.paid_by(payer),
                None => args
                    .payers
                    .into_iter()
                    .fold(cmd, |cmd, p| cmd.payer(p.member_id, p.amount)),
            };
            if let Some(category) = args.category {
                cmd = cmd.category(category);
            }
            if let Some(note) = args.note {
                cmd = cmd.note(note);
            }
            if let Some(key) = args.key {
                cmd = cmd.idempotency_key(key);
            }
            let id = ledger.create_expense(args.group, cmd).await?;
            println!("{id}");
        }
        Command::Expense(cli::Expense {
            command: ExpenseCommand::Delete { group, expense },
        }) => ledger.delete_expense(group, expense).await?,
        Command::Expense(cli::Expense {
            command: ExpenseCommand::List { group },
        }) => {
            let info = ledger.group(group).await?;
            for expense in ledger.list_expenses(group).await? {
                println!(
                    "{} {} {:>10} {} [{}]",
                    expense.id,
                    expense.occurred_at.format("%Y-%m-%d"),
                    expense.amount,
                    expense.description,
                    expense.split.as_str()
                );
                for share in &expense.allocations {
                    println!(
                        "    {:<24} paid {:>10} owes {:>10}",
                        info.display_name(&share.member_id),
                        expense.paid_by(&share.member_id),
                        share.amount
                    );
                }
            }
        }
        Command::Settle(cli::Settle {
            command: SettleCommand::Record(args),
        }) => {
            let mut cmd = SettleCmd::new(args.member_id, args.from, args.to, args.amount, Utc::now());
            if let Some(method) = args.method {
                cmd = cmd.method(method);
            }
            if let Some(remarks) = args.remarks {
                cmd = cmd.remarks(remarks);
            }
            if let Some(key) = args.key {
                cmd = cmd.idempotency_key(key);
            }
            let id = ledger.record_settlement(args.group, cmd).await?;
            println!("{id}");
        }
        Command::Settle(cli::Settle {
            command: SettleCommand::Delete { group, settlement },
        }) => ledger.delete_settlement(group, settlement).await?,
        Command::Settle(cli::Settle {
            command: SettleCommand::List { group },
        }) => {
            let info = ledger.group(group).await?;
            for record in ledger.list_settlements(group).await? {
                println!(
                    "{} {} {} -> {} {:>10} {}",
                    record.id,
                    record.settled_at.format("%Y-%m-%d"),
                    info.display_name(&record.from),
                    info.display_name(&record.to),
                    record.amount,
                    record.method.as_deref().unwrap_or("")
                );
            }
        }
        Command::Balances { group } => print_balances(ledger, group).await?,
        Command::Plan { group } => {
            let info = ledger.group(group).await?;
            let transfers = ledger.settlement_plan(group).await?;
            if transfers.is_empty() {
                println!("all settled");
            }
            for transfer in transfers {
                println!(
                    "{} -> {}: {} {}",
                    info.display_name(&transfer.from),
                    info.display_name(&transfer.to),
                    transfer.amount,
                    info.currency
                );
            }
        }
        Command::Recompute { group } => {
            ledger.recompute_balances(group).await?;
            print_balances(ledger, group).await?;
        }
    }
    Ok(())
}

async fn print_balances(ledger: &Ledger, group_id: Uuid) -> Result<(), LedgerError> {
    let group = ledger.group(group_id).await?;
    let balances = ledger.balances(group_id).await?;
    for member in &group.members {
        println!(
            "{:<24} {:>10} {}",
            member.name,
            balances.get(&member.id),
            group.currency
        );
    }
    Ok(())
}
