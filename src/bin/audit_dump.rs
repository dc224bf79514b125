//! Dumps the audit log for human review, one JSON object per line.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use loanshield::logic::audit::AuditStore;

#[derive(Parser, Debug)]
#[command(about = "Dump loan_audits records as JSON lines")]
struct Args {
    #[arg(long, default_value = "audit.db")]
    db: PathBuf,

    /// Stop after this many records.
    #[arg(long)]
    limit: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let store = AuditStore::open(&args.db)
        .with_context(|| format!("opening audit database {}", args.db.display()))?;

    let records = store.fetch(args.limit)?;
    if records.is_empty() {
        println!("The loan_audits table is currently empty.");
        return Ok(());
    }
    for stored in &records {
        println!("{}", serde_json::to_string(stored)?);
    }
    eprintln!("{} audit record(s)", records.len());
    Ok(())
}
