use std::{collections::BTreeMap, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueEnum};
use ledger::{Currency, Member, MemberAmount, Money, SplitMethod};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "tripsplit")]
#[command(about = "Shared trip expenses: split, track balances, settle up")]
pub struct Cli {
    /// Optional settings file (TOML). Defaults to `./settings.toml` if present.
    #[arg(long)]
    pub config: Option<String>,

    /// Database connection string, overriding the settings file.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create or inspect groups.
    Group(Group),
    /// Add, delete or list expenses.
    Expense(Expense),
    /// Record, delete or list payments between members.
    Settle(Settle),
    /// Show the balance of every member.
    Balances { group: Uuid },
    /// Suggest transfers that settle the group.
    Plan { group: Uuid },
    /// Rebuild balances from the stored expenses and settlements.
    Recompute { group: Uuid },
}

#[derive(Args, Debug)]
pub struct Group {
    #[command(subcommand)]
    pub command: GroupCommand,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    Create(GroupCreateArgs),
    Show { group: Uuid },
}

#[derive(Args, Debug)]
pub struct GroupCreateArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "EUR", value_parser = parse_currency)]
    pub currency: Currency,
    /// Member as `id` or `id:Display Name`; repeat for each member.
    #[arg(long = "member", required = true, value_parser = parse_member)]
    pub members: Vec<Member>,
    /// Acting member id (must be one of `--member`).
    #[arg(long = "by")]
    pub created_by: String,
}

#[derive(Args, Debug)]
pub struct Expense {
    #[command(subcommand)]
    pub command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
pub enum ExpenseCommand {
    Add(ExpenseAddArgs),
    Delete { group: Uuid, expense: Uuid },
    List { group: Uuid },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SplitKind {
    Equal,
    Percentage,
    Shares,
    Exact,
}

#[derive(Args, Debug)]
pub struct ExpenseAddArgs {
    pub group: Uuid,
    /// Acting member id.
    #[arg(long = "by")]
    pub member_id: String,
    #[arg(long)]
    pub description: String,
    #[arg(long, value_parser = parse_money)]
    pub amount: Money,
    /// Single payer covering the whole amount.
    #[arg(long, conflicts_with = "payers")]
    pub paid_by: Option<String>,
    /// Payer as `id=amount`; repeat for several payers.
    #[arg(long = "payer", value_parser = parse_payer)]
    pub payers: Vec<MemberAmount>,
    #[arg(long = "participant", required = true)]
    pub participants: Vec<String>,
    #[arg(long, value_enum, default_value = "equal")]
    pub split: SplitKind,
    /// Split detail as `id=value` (percentage, share count or exact amount).
    #[arg(long = "detail", value_parser = parse_detail)]
    pub details: Vec<(String, Decimal)>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub note: Option<String>,
    /// Idempotency key; resubmitting with the same key is a no-op.
    #[arg(long)]
    pub key: Option<String>,
}

impl ExpenseAddArgs {
    pub fn split_method(&self) -> SplitMethod {
        let details: BTreeMap<String, Decimal> = self.details.iter().cloned().collect();
        match self.split {
            SplitKind::Equal => SplitMethod::Equal,
            SplitKind::Percentage => SplitMethod::Percentage(details),
            SplitKind::Shares => SplitMethod::Shares(details),
            SplitKind::Exact => SplitMethod::Exact(details),
        }
    }
}

#[derive(Args, Debug)]
pub struct Settle {
    #[command(subcommand)]
    pub command: SettleCommand,
}

#[derive(Subcommand, Debug)]
pub enum SettleCommand {
    Record(SettleRecordArgs),
    Delete { group: Uuid, settlement: Uuid },
    List { group: Uuid },
}

#[derive(Args, Debug)]
pub struct SettleRecordArgs {
    pub group: Uuid,
    /// Acting member id.
    #[arg(long = "by")]
    pub member_id: String,
    #[arg(long)]
    pub from: String,
    #[arg(long)]
    pub to: String,
    #[arg(long, value_parser = parse_money)]
    pub amount: Money,
    /// Free text, e.g. "cash" or "bank transfer".
    #[arg(long)]
    pub method: Option<String>,
    #[arg(long)]
    pub remarks: Option<String>,
    #[arg(long)]
    pub key: Option<String>,
}

fn parse_currency(raw: &str) -> Result<Currency, String> {
    Currency::try_from(raw).map_err(|err| err.to_string())
}

fn parse_money(raw: &str) -> Result<Money, String> {
    Money::from_str(raw).map_err(|err| err.to_string())
}

fn split_pair(raw: &str) -> Result<(&str, &str), String> {
    raw.split_once('=')
        .map(|(id, value)| (id.trim(), value.trim()))
        .filter(|(id, value)| !id.is_empty() && !value.is_empty())
        .ok_or_else(|| format!("expected `id=value`, got `{raw}`"))
}

fn parse_payer(raw: &str) -> Result<MemberAmount, String> {
    let (id, amount) = split_pair(raw)?;
    Ok(MemberAmount::new(id, parse_money(amount)?))
}

fn parse_detail(raw: &str) -> Result<(String, Decimal), String> {
    let (id, value) = split_pair(raw)?;
    let value = Decimal::from_str(value).map_err(|err| format!("invalid number `{value}`: {err}"))?;
    Ok((id.to_string(), value))
}

fn parse_member(raw: &str) -> Result<Member, String> {
    let (id, name) = raw.split_once(':').unwrap_or((raw, raw));
    let (id, name) = (id.trim(), name.trim());
    if id.is_empty() {
        return Err(format!("invalid member `{raw}`"));
    }
    Ok(Member::new(id, if name.is_empty() { id } else { name }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_member_with_and_without_name() {
        let member = parse_member("m1:Ann Lee").unwrap();
        assert_eq!((member.id.as_str(), member.name.as_str()), ("m1", "Ann Lee"));
        let member = parse_member("m2").unwrap();
        assert_eq!((member.id.as_str(), member.name.as_str()), ("m2", "m2"));
        assert!(parse_member(":Ghost").is_err());
    }

    #[test]
    fn parses_payer_and_detail_pairs() {
        let payer = parse_payer("m1=12,50").unwrap();
        assert_eq!(payer, MemberAmount::new("m1", Money::new(1250)));
        let detail = parse_detail("m2 = 33.5").unwrap();
        assert_eq!(detail, ("m2".to_string(), Decimal::new(335, 1)));
        assert!(parse_payer("m1").is_err());
        assert!(parse_detail("m1=abc").is_err());
    }

    #[test]
    fn cli_parses_expense_add() {
        let cli = Cli::try_parse_from([
            "tripsplit",
            "expense",
            "add",
            "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "--by",
            "m1",
            "--description",
            "Dinner",
            "--amount",
            "300",
            "--paid-by",
            "m1",
            "--participant",
            "m1",
            "--participant",
            "m2",
            "--split",
            "shares",
            "--detail",
            "m1=2",
            "--detail",
            "m2=1",
        ])
        .unwrap();
        let Command::Expense(Expense {
            command: ExpenseCommand::Add(args),
        }) = cli.command
        else {
            panic!("expected expense add");
        };
        assert_eq!(args.amount, Money::new(30_000));
        assert!(matches!(args.split_method(), SplitMethod::Shares(ref d) if d.len() == 2));
    }
}
