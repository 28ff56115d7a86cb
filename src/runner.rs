//! The runner wires the account and ledger stores to the command line:
//! it restores the persisted session on start-up, executes one command and
//! writes a human-readable result to the provided writer.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use clap::Subcommand;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::backup::{backup_file_name, read_backup_file, write_backup_file};
use crate::csv_utils::export_transactions;
use crate::insights::{fetch_insights, InsightProvider};
use crate::storage::KeyValueStore;
use crate::stores::{AccountStore, LedgerStore};
use crate::summary;
use crate::{
    Category, CategoryPatch, Error, FinancialGoal, Result, Session, Transaction, TransactionType,
    UserConfig, UserProfile, DEFAULT_CURRENCY,
};

const DEFAULT_CATEGORY_COLOR: &str = "#3b82f6";
const RECENT_FLOW_LEN: usize = 10;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a local account and sign in
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in to an existing account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Save the financial profile (completes onboarding)
    Onboard {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "moderate")]
        profile: UserProfile,
        #[arg(long, default_value = "0")]
        income_goal: Decimal,
        #[arg(long, default_value = DEFAULT_CURRENCY)]
        currency: String,
    },
    /// Manage transactions
    #[command(subcommand)]
    Tx(TxCommand),
    /// Manage savings goals
    #[command(subcommand)]
    Goal(GoalCommand),
    /// Manage categories
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Show dashboard totals
    Summary,
    /// Export or import a JSON backup
    #[command(subcommand)]
    Backup(BackupCommand),
    /// Ask the AI for insights on the ledger
    Insights,
}

#[derive(Debug, Subcommand)]
pub enum TxCommand {
    Add {
        #[arg(long)]
        description: String,
        #[arg(long)]
        amount: Decimal,
        /// Defaults to the first category
        #[arg(long)]
        category: Option<String>,
        #[arg(long = "type", default_value = "expense")]
        tx_type: TransactionType,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Delete {
        id: String,
    },
    ExportCsv {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum GoalCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        target: Decimal,
        #[arg(long)]
        deadline: Option<NaiveDate>,
    },
    List,
    /// Set the amount saved so far
    Set {
        id: String,
        amount: Decimal,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = DEFAULT_CATEGORY_COLOR)]
        color: String,
    },
    List,
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Import {
        path: PathBuf,
    },
}

/// Account and ledger state for one process.
pub struct App<S> {
    accounts: AccountStore<S>,
    ledger: LedgerStore<S>,
    insights: Box<dyn InsightProvider>,
}

impl<S: KeyValueStore> App<S> {
    /// Restores the persisted session and loads its ledger.
    pub fn open(storage: Arc<S>, insights: Box<dyn InsightProvider>) -> Result<Self> {
        let mut accounts = AccountStore::new(storage.clone());
        let mut ledger = LedgerStore::new(storage);
        let session = accounts.restore_session()?;
        ledger.switch_account(session.as_ref())?;
        Ok(Self {
            accounts,
            ledger,
            insights,
        })
    }

    pub fn ledger(&self) -> &LedgerStore<S> {
        &self.ledger
    }

    fn session(&self) -> Result<Session> {
        self.accounts.current().cloned().ok_or(Error::NoActiveSession)
    }

    /// Session of an account that has finished onboarding.
    fn onboarded(&self) -> Result<Session> {
        let session = self.session()?;
        if !self.ledger.is_configured() {
            return Err(Error::OnboardingRequired);
        }
        Ok(session)
    }

    /// Executes one command, writing its output to `out`.
    pub async fn run<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        match command {
            Command::Signup {
                name,
                email,
                password,
            } => {
                let session = self.accounts.register(&name, &email, &password)?;
                self.ledger.switch_account(Some(&session))?;
                writeln!(
                    out,
                    "Welcome, {}! Run `onboard` to set up your profile.",
                    session.name
                )?;
            }
            Command::Login { email, password } => {
                let session = self.accounts.authenticate(&email, &password)?;
                self.ledger.switch_account(Some(&session))?;
                writeln!(out, "Signed in as {}.", session.name)?;
            }
            Command::Logout => {
                self.accounts.end_session()?;
                self.ledger.switch_account(None)?;
                writeln!(out, "Signed out.")?;
            }
            Command::Whoami => {
                let session = self.session()?;
                let state = if self.ledger.is_configured() {
                    "configured"
                } else {
                    "onboarding pending"
                };
                writeln!(out, "{} <{}> ({state})", session.name, session.email)?;
            }
            Command::Onboard {
                name,
                profile,
                income_goal,
                currency,
            } => {
                let session = self.session()?;
                let config = UserConfig {
                    name: name.unwrap_or_else(|| session.name.clone()),
                    profile,
                    monthly_income_goal: income_goal,
                    currency,
                };
                self.ledger.set_user_config(&session, config)?;
                writeln!(out, "Profile saved.")?;
            }
            Command::Tx(cmd) => self.run_tx(cmd, out)?,
            Command::Goal(cmd) => self.run_goal(cmd, out)?,
            Command::Category(cmd) => self.run_category(cmd, out)?,
            Command::Summary => self.write_summary(out)?,
            Command::Backup(cmd) => self.run_backup(cmd, out).await?,
            Command::Insights => {
                self.onboarded()?;
                let insights = fetch_insights(
                    self.insights.as_ref(),
                    self.ledger.transactions(),
                    &self.ledger.user_config(),
                    self.ledger.goals(),
                )
                .await;
                for insight in insights {
                    let kind = insight.kind.to_string().to_uppercase();
                    writeln!(out, "[{kind}] {}: {}", insight.title, insight.message)?;
                }
            }
        }
        Ok(())
    }

    fn run_tx<W: Write>(&mut self, cmd: TxCommand, out: &mut W) -> Result<()> {
        let session = self.onboarded()?;
        let currency = self.ledger.user_config().currency;
        match cmd {
            TxCommand::Add {
                description,
                amount,
                category,
                tx_type,
                date,
            } => {
                let category = match category {
                    Some(category) => category,
                    None => self
                        .ledger
                        .categories()
                        .first()
                        .map(|c| c.name.clone())
                        .unwrap_or_default(),
                };
                let day = date.unwrap_or_else(|| Utc::now().date_naive());
                let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
                let id = Uuid::new_v4().to_string();
                self.ledger.add_transaction(
                    &session,
                    Transaction {
                        id: id.clone(),
                        description,
                        amount,
                        date: day.and_time(noon).and_utc(),
                        category,
                        tx_type,
                    },
                )?;
                writeln!(out, "Added transaction {id}.")?;
            }
            TxCommand::List { search } => {
                let query = search.as_deref().unwrap_or("");
                let transactions = summary::search(self.ledger.transactions(), query);
                if transactions.is_empty() {
                    writeln!(out, "No transactions.")?;
                }
                for t in transactions {
                    writeln!(
                        out,
                        "{}  {}  {:<24} {:<14} {} {:.2}",
                        t.id,
                        t.date.format("%Y-%m-%d"),
                        t.description,
                        t.category,
                        currency,
                        t.signed_amount()
                    )?;
                }
            }
            TxCommand::Delete { id } => {
                self.ledger.delete_transaction(&session, &id)?;
                writeln!(out, "Deleted transaction {id}.")?;
            }
            TxCommand::ExportCsv { output } => match output {
                Some(path) => {
                    export_transactions(std::fs::File::create(&path)?, self.ledger.transactions())?;
                    writeln!(out, "Wrote {}.", path.display())?;
                }
                None => export_transactions(&mut *out, self.ledger.transactions())?,
            },
        }
        Ok(())
    }

    fn run_goal<W: Write>(&mut self, cmd: GoalCommand, out: &mut W) -> Result<()> {
        let session = self.onboarded()?;
        let currency = self.ledger.user_config().currency;
        match cmd {
            GoalCommand::Add {
                name,
                target,
                deadline,
            } => {
                let id = Uuid::new_v4().to_string();
                self.ledger.add_goal(
                    &session,
                    FinancialGoal {
                        id: id.clone(),
                        name,
                        target_amount: target,
                        current_amount: Decimal::ZERO,
                        deadline,
                    },
                )?;
                writeln!(out, "Added goal {id}.")?;
            }
            GoalCommand::List => {
                if self.ledger.goals().is_empty() {
                    writeln!(out, "No goals.")?;
                }
                for goal in self.ledger.goals() {
                    let deadline = goal
                        .deadline
                        .map(|d| format!(" by {d}"))
                        .unwrap_or_default();
                    let done = if goal.is_complete() { " (complete)" } else { "" };
                    writeln!(
                        out,
                        "{}  {}: {currency} {:.2} / {:.2} ({:.0}%){deadline}{done}",
                        goal.id,
                        goal.name,
                        goal.current_amount,
                        goal.target_amount,
                        goal.progress() * Decimal::ONE_HUNDRED,
                    )?;
                }
            }
            GoalCommand::Set { id, amount } => {
                self.ledger.update_goal_amount(&session, &id, amount)?;
                writeln!(out, "Updated goal {id}.")?;
            }
            GoalCommand::Delete { id } => {
                self.ledger.delete_goal(&session, &id)?;
                writeln!(out, "Deleted goal {id}.")?;
            }
        }
        Ok(())
    }

    fn run_category<W: Write>(&mut self, cmd: CategoryCommand, out: &mut W) -> Result<()> {
        let session = self.onboarded()?;
        match cmd {
            CategoryCommand::Add { name, color } => {
                let id = Uuid::new_v4().to_string();
                self.ledger
                    .add_category(&session, Category { id: id.clone(), name, color })?;
                writeln!(out, "Added category {id}.")?;
            }
            CategoryCommand::List => {
                for c in self.ledger.categories() {
                    writeln!(out, "{}  {} {}", c.id, c.color, c.name)?;
                }
            }
            CategoryCommand::Update { id, name, color } => {
                self.ledger
                    .update_category(&session, &id, CategoryPatch { name, color })?;
                writeln!(out, "Updated category {id}.")?;
            }
            CategoryCommand::Delete { id } => {
                self.ledger.delete_category(&session, &id)?;
                writeln!(out, "Deleted category {id}.")?;
            }
        }
        Ok(())
    }

    fn write_summary<W: Write>(&self, out: &mut W) -> Result<()> {
        self.onboarded()?;
        let config = self.ledger.user_config();
        let currency = &config.currency;
        let transactions = self.ledger.transactions();
        let totals = summary::totals(transactions);

        writeln!(out, "Income:  {currency} {:.2}", totals.income)?;
        writeln!(out, "Expense: {currency} {:.2}", totals.expense)?;
        writeln!(out, "Balance: {currency} {:.2}", totals.balance)?;
        if config.monthly_income_goal > Decimal::ZERO {
            writeln!(out, "Monthly income goal: {currency} {:.2}", config.monthly_income_goal)?;
        }

        let by_category = summary::expenses_by_category(transactions);
        if !by_category.is_empty() {
            writeln!(out, "\nExpenses by category:")?;
            for c in by_category {
                writeln!(out, "  {:<14} {currency} {:.2}", c.category, c.amount)?;
            }
        }

        let months = summary::monthly_totals(transactions);
        if !months.is_empty() {
            writeln!(out, "\nMonthly:")?;
            for m in months {
                writeln!(
                    out,
                    "  {}-{:02}  +{:.2}  -{:.2}",
                    m.year, m.month, m.income, m.expense
                )?;
            }
        }

        let flow = summary::recent_flow(transactions, RECENT_FLOW_LEN);
        if !flow.is_empty() {
            writeln!(out, "\nRecent flow:")?;
            for point in flow {
                writeln!(out, "  {}  {:.2}", point.date.format("%Y-%m-%d"), point.amount)?;
            }
        }

        let goals = self.ledger.goals();
        if !goals.is_empty() {
            let complete = goals.iter().filter(|g| g.is_complete()).count();
            writeln!(out, "\nGoals: {complete}/{} complete", goals.len())?;
        }
        Ok(())
    }

    async fn run_backup<W: Write>(&mut self, cmd: BackupCommand, out: &mut W) -> Result<()> {
        let session = self.onboarded()?;
        match cmd {
            BackupCommand::Export { output } => {
                let backup = self.ledger.export_backup(&session)?;
                let path = output.unwrap_or_else(|| {
                    PathBuf::from(backup_file_name(backup.timestamp.date_naive()))
                });
                write_backup_file(&path, &backup).await?;
                writeln!(out, "Backup written to {}.", path.display())?;
            }
            BackupCommand::Import { path } => {
                let data = read_backup_file(&path).await?;
                self.ledger.restore(&session, data)?;
                info!(path = %path.display(), "backup restored");
                writeln!(out, "Backup imported; ledger reloaded.")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::{unavailable_insight, Insight, InsightKind};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    struct NoInsights;

    #[async_trait]
    impl InsightProvider for NoInsights {
        async fn insights(
            &self,
            _: &[Transaction],
            _: &UserConfig,
            _: &[FinancialGoal],
        ) -> Result<Vec<Insight>> {
            Err(Error::Insights("offline".into()))
        }
    }

    fn open(storage: &Arc<MemoryStore>) -> App<MemoryStore> {
        App::open(storage.clone(), Box::new(NoInsights)).unwrap()
    }

    async fn run(app: &mut App<MemoryStore>, command: Command) -> Result<String> {
        let mut output = Vec::new();
        app.run(command, &mut output).await?;
        Ok(String::from_utf8(output).unwrap())
    }

    fn signup() -> Command {
        Command::Signup {
            name: "Ana".into(),
            email: "ana@x.com".into(),
            password: "secret1".into(),
        }
    }

    fn onboard() -> Command {
        Command::Onboard {
            name: None,
            profile: UserProfile::Student,
            income_goal: Decimal::from(2000),
            currency: "R$".into(),
        }
    }

    #[tokio::test]
    async fn test_commands_require_session() {
        let storage = Arc::new(MemoryStore::new());
        let mut app = open(&storage);
        assert!(matches!(
            run(&mut app, Command::Summary).await,
            Err(Error::NoActiveSession)
        ));
        assert!(matches!(
            run(&mut app, Command::Whoami).await,
            Err(Error::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_onboarding_gate() -> Result<()> {
        let storage = Arc::new(MemoryStore::new());
        let mut app = open(&storage);
        run(&mut app, signup()).await?;

        assert!(matches!(
            run(&mut app, Command::Goal(GoalCommand::List)).await,
            Err(Error::OnboardingRequired)
        ));
        assert!(run(&mut app, Command::Whoami).await?.contains("onboarding pending"));

        run(&mut app, onboard()).await?;
        assert_eq!(run(&mut app, Command::Goal(GoalCommand::List)).await?, "No goals.\n");
        assert_eq!(app.ledger().user_config().name, "Ana");
        Ok(())
    }

    #[tokio::test]
    async fn test_session_survives_restart() -> Result<()> {
        let storage = Arc::new(MemoryStore::new());
        {
            let mut app = open(&storage);
            run(&mut app, signup()).await?;
            run(&mut app, onboard()).await?;
            run(
                &mut app,
                Command::Tx(TxCommand::Add {
                    description: "Lunch".into(),
                    amount: Decimal::new(1250, 2),
                    category: None,
                    tx_type: TransactionType::Expense,
                    date: NaiveDate::from_ymd_opt(2024, 3, 1),
                }),
            )
            .await?;
        }

        let mut app = open(&storage);
        let listing = run(&mut app, Command::Tx(TxCommand::List { search: None })).await?;
        assert!(listing.contains("2024-03-01"));
        assert!(listing.contains("Lunch"));
        assert!(listing.contains("Food"));
        assert!(listing.contains("-12.50"));

        run(&mut app, Command::Logout).await?;
        let mut app = open(&storage);
        assert!(app.ledger().owner().is_none());
        assert!(matches!(
            run(&mut app, Command::Whoami).await,
            Err(Error::NoActiveSession)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_summary_output() -> Result<()> {
        let storage = Arc::new(MemoryStore::new());
        let mut app = open(&storage);
        run(&mut app, signup()).await?;
        run(&mut app, onboard()).await?;
        for (description, amount, tx_type) in [
            ("Salary", 3000, TransactionType::Income),
            ("Rent", 1000, TransactionType::Expense),
        ] {
            run(
                &mut app,
                Command::Tx(TxCommand::Add {
                    description: description.into(),
                    amount: Decimal::from(amount),
                    category: Some(description.into()),
                    tx_type,
                    date: NaiveDate::from_ymd_opt(2024, 4, 1),
                }),
            )
            .await?;
        }

        let summary = run(&mut app, Command::Summary).await?;
        assert!(summary.contains("Income:  R$ 3000.00"));
        assert!(summary.contains("Expense: R$ 1000.00"));
        assert!(summary.contains("Balance: R$ 2000.00"));
        assert!(summary.contains("2024-04  +3000.00  -1000.00"));
        Ok(())
    }

    #[tokio::test]
    async fn test_insights_fall_back() -> Result<()> {
        let storage = Arc::new(MemoryStore::new());
        let mut app = open(&storage);
        run(&mut app, signup()).await?;
        run(&mut app, onboard()).await?;

        let output = run(&mut app, Command::Insights).await?;
        let expected = unavailable_insight();
        assert_eq!(
            output,
            format!("[WARNING] {}: {}\n", expected.title, expected.message)
        );
        assert_eq!(expected.kind, InsightKind::Warning);
        Ok(())
    }

    #[tokio::test]
    async fn test_backup_commands() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("backup.json");
        let storage = Arc::new(MemoryStore::new());
        let mut app = open(&storage);
        run(&mut app, signup()).await?;
        run(&mut app, onboard()).await?;
        run(
            &mut app,
            Command::Goal(GoalCommand::Add {
                name: "Bike".into(),
                target: Decimal::from(800),
                deadline: None,
            }),
        )
        .await?;

        let export = BackupCommand::Export {
            output: Some(path.clone()),
        };
        run(&mut app, Command::Backup(export)).await?;
        let goal_id = app.ledger().goals()[0].id.clone();
        run(&mut app, Command::Goal(GoalCommand::Delete { id: goal_id })).await?;
        assert!(app.ledger().goals().is_empty());

        run(&mut app, Command::Backup(BackupCommand::Import { path })).await?;
        assert_eq!(app.ledger().goals().len(), 1);
        assert_eq!(app.ledger().goals()[0].name, "Bike");
        Ok(())
    }
}
