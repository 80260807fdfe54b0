use chrono::Utc;
use clap::{Parser, Subcommand};
use eatoutBot::clients::sqlite_store::SqliteStore;
use eatoutBot::config::Settings;
use eatoutBot::models::eat_out::{local_date, parse_date};
use eatoutBot::service::routing::status_reply;
use eatoutBot::service::status_resolver;
use eatoutBot::service::status_store::{ScheduleStore, StatusStore};
use inquire::Confirm;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved status for an entity (today by default).
    Status {
        entity: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Record whether an entity eats out on a date.
    Set {
        entity: String,
        date: String,
        #[arg(action = clap::ArgAction::Set)]
        will_eat_out: bool,
    },
    /// Ask interactively and record today's answer.
    Decide { entity: String },
    /// List persisted reminder times.
    Schedules,
}

pub async fn cli(settings: Settings) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Fine to exit on bad arguments here
    let cli = Cli::parse();
    let store = SqliteStore::open(&settings.db_location)?;
    let today = local_date(Utc::now(), &settings.timezone);

    match cli.command {
        Commands::Status { entity, date } => {
            let date = match date {
                Some(raw) => parse_date(&raw)?,
                None => today,
            };
            let status = status_resolver::resolve(&store, &entity, date).await?;
            println!("{} {}: {:?} ({})", entity, date, status, status_reply(status));
        }
        Commands::Set {
            entity,
            date,
            will_eat_out,
        } => {
            let date = parse_date(&date)?;
            let rows = store.set_status(&entity, date, will_eat_out).await?;
            println!("Stored {} {} -> {} ({} row)", entity, date, will_eat_out, rows);
        }
        Commands::Decide { entity } => {
            let will_eat_out = Confirm::new("今日は外で食べる？")
                .with_default(false)
                .prompt()?;
            store.set_status(&entity, today, will_eat_out).await?;
            println!("Stored {} {} -> {}", entity, today, will_eat_out);
        }
        Commands::Schedules => {
            let schedules = store.load_schedules().await?;
            if schedules.is_empty() {
                println!("No reminders registered.");
            }
            for (entity, spec) in schedules {
                println!("{}\t{}", entity, spec);
            }
        }
    }
    Ok(())
}
