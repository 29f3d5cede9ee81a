//! goalctl - encrypted goal ledger tooling

use clap::Parser;
use goal_cipher::{derive_key, DescriptionCipher};
use goal_ledger::cli::{Args, Commands};
use goal_ledger::{init_tracing, run_demo};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let config = args.resolve_config()?;
    init_tracing(&config.logging)?;

    match args.command {
        Commands::Encrypt { owner, plaintext } => {
            let blob = DescriptionCipher::for_identifier(&owner).encrypt(&plaintext)?;
            println!("{blob}");
        }
        Commands::Decrypt { owner, blob } => {
            let plaintext = DescriptionCipher::for_identifier(&owner).decrypt(&blob)?;
            println!("{plaintext}");
        }
        Commands::DeriveKey { owner } => {
            println!("{}", derive_key(&owner).fingerprint());
        }
        Commands::Demo { .. } => {
            info!(ledger_id = %config.ledger_id, "Running demo");
            let report = run_demo(&config).await?;
            for event in &report.events {
                println!("{}", serde_json::to_string(event)?);
            }
            info!(
                goal_id = %report.goal_id,
                description = %report.description,
                progress = report.progress,
                priority = report.priority,
                rejected = report.rejected.len(),
                "Demo finished"
            );
        }
    }

    Ok(())
}
