use sea_orm::Database;
use sea_orm_migration::prelude::*;

const USAGE: &str = "usage: migration [up [steps] | down [steps] | fresh | status]";

fn steps(raw: Option<String>) -> Result<Option<u32>, String> {
    raw.map(|value| {
        value
            .parse::<u32>()
            .map_err(|_| format!("invalid step count: {value}"))
    })
    .transpose()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "up".to_string());
    let count = steps(args.next())?;

    let url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:./campus_ledger.db?mode=rwc".to_string());
    let db = Database::connect(&url).await?;

    match command.as_str() {
        "up" => migration::Migrator::up(&db, count).await?,
        // One step unless a count is given.
        "down" => migration::Migrator::down(&db, Some(count.unwrap_or(1))).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "status" => migration::Migrator::status(&db).await?,
        other => {
            eprintln!("unknown command {other:?}\n{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}
