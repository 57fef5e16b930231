use anyhow::Result;
use clap::{Parser, Subcommand};
use relay::{PersistedCounter, NOTIFICATION_COUNTER_KEY};
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    /// Defaults to the database the launcher uses.
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect or adjust a persisted counter.
    Counter {
        #[arg(long, default_value = NOTIFICATION_COUNTER_KEY)]
        key: String,
        #[command(subcommand)]
        action: CounterAction,
    },
    /// List every persisted counter.
    Counters,
}

#[derive(Subcommand, Debug)]
enum CounterAction {
    Show,
    Next,
    /// Move the counter forward. Lower values are refused.
    Advance {
        #[arg(long)]
        value: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let database_url = cli
        .database_url
        .unwrap_or_else(|| storage::database_url_in(&storage::default_data_dir()));
    let storage = Storage::new(&database_url).await?;

    match cli.command {
        Command::Counter { key, action } => {
            let counter = PersistedCounter::with_key(storage.clone(), key);
            match action {
                CounterAction::Show => {
                    let next = counter.peek().await?;
                    match storage.counter(counter.key()).await? {
                        Some(stored) => println!(
                            "{} next={next} updated_at={}",
                            stored.name,
                            stored.updated_at.to_rfc3339()
                        ),
                        None => println!("{} next={next} (never written)", counter.key()),
                    }
                }
                CounterAction::Next => {
                    let value = counter.next().await?;
                    println!("allocated {}={value}", counter.key());
                }
                CounterAction::Advance { value } => {
                    counter.advance_to(value).await?;
                    println!("advanced {}={value}", counter.key());
                }
            }
        }
        Command::Counters => {
            for stored in storage.list_counters().await? {
                println!(
                    "{:20} {:>10} {}",
                    stored.name,
                    stored.value,
                    stored.updated_at.to_rfc3339()
                );
            }
        }
    }

    Ok(())
}
