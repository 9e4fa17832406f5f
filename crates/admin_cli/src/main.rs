use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{Engine, Money, VerificationReport};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "campus_ledger_admin")]
#[command(about = "Operator utilities for the campus ledger (balance checks, fee quotes)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./campus_ledger.db?mode=rwc"
    )]
    database_url: String,

    /// Log filter, e.g. `engine=debug`.
    #[arg(long, env = "RUST_LOG", default_value = "engine=warn")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replays one user's transactions and repairs the wallet if it drifted.
    Verify(VerifyArgs),
    /// Verifies every wallet.
    ReconcileAll,
    /// Shows the platform fee for an order subtotal.
    Quote(QuoteArgs),
}

#[derive(Args, Debug)]
struct VerifyArgs {
    #[arg(long)]
    user: String,
}

#[derive(Args, Debug)]
struct QuoteArgs {
    /// Subtotal in naira, e.g. `15000` or `1,250.50`.
    #[arg(long)]
    amount: Money,
    #[arg(long)]
    campus: Option<String>,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn print_report(report: &VerificationReport) {
    let state = if report.corrected { "corrected" } else { "ok" };
    println!(
        "{:<24} {:>9} balance {} (stored {}) pending {} (stored {})",
        report.user_id,
        state,
        Money::new(report.calculated_balance),
        Money::new(report.db_balance),
        Money::new(report.calculated_pending_balance),
        Money::new(report.db_pending_balance),
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(cli.log.as_str())
        .with_writer(std::io::stderr)
        .init();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Verify(args) => {
            let report = engine.verify_balance(&args.user).await?;
            print_report(&report);
        }
        Command::ReconcileAll => {
            let reports = engine.reconcile_all().await?;
            let corrected = reports.iter().filter(|r| r.corrected).count();
            for report in &reports {
                print_report(report);
            }
            println!("{} wallets checked, {corrected} corrected", reports.len());
        }
        Command::Quote(args) => {
            let quote = engine.quote_fee(args.amount.minor(), args.campus.as_deref())?;
            println!(
                "subtotal {}  fee {}  total {}",
                Money::new(quote.amount),
                Money::new(quote.fee),
                Money::new(quote.total)
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_amount_is_read_in_naira() {
        let cli = Cli::try_parse_from([
            "campus_ledger_admin",
            "quote",
            "--amount",
            "1,500.50",
            "--campus",
            "unilag",
        ])
        .unwrap();
        match cli.command {
            Command::Quote(args) => {
                assert_eq!(args.amount.minor(), 150_050);
                assert_eq!(args.campus.as_deref(), Some("unilag"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn malformed_quote_amount_is_rejected() {
        assert!(Cli::try_parse_from(["campus_ledger_admin", "quote", "--amount", "12.345"]).is_err());
    }
}
