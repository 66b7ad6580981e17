use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::domain::RsvpRecord;
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/rsvps.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every stored RSVP as a JSON array.
    Export,
    /// Load a JSON array of RSVPs; ids already stored are skipped.
    Import { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::Export => {
            let records = storage.list_rsvps().await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Import { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read '{}'", file.display()))?;
            let records = parse_records(&raw)
                .with_context(|| format!("'{}' is not a JSON array of RSVPs", file.display()))?;
            let inserted = storage.import_rsvps(&records).await?;
            println!(
                "imported {inserted} of {} rsvps ({} already present)",
                records.len(),
                records.len() - inserted
            );
        }
    }

    Ok(())
}

fn parse_records(raw: &str) -> Result<Vec<RsvpRecord>> {
    Ok(serde_json::from_str(raw)?)
}
