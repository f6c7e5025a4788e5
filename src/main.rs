// ============================================================================
// dedup-probe - Inspect and drive delivery records from the shell
// ============================================================================
//
// Uses the same MD_* environment configuration as the library, so it talks
// to the same backend a service would.
//
// ============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use message_dedup::{telemetry, Config, DeliveryTracker, StorageBackend};

#[derive(Parser, Debug)]
#[command(name = "dedup-probe")]
#[command(author, version, about = "Inspect and drive delivery records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Print whether the message may be delivered to the subscriber
    Check {
        message_id: String,
        subscriber_name: String,
    },
    /// Check and take the in-progress claim in one step
    Claim {
        message_id: String,
        subscriber_name: String,
    },
    /// Mark the delivery as in progress
    Start {
        message_id: String,
        subscriber_name: String,
    },
    /// Mark an in-progress delivery as delivered
    Deliver {
        message_id: String,
        subscriber_name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    telemetry::init(&config)?;

    let storage = StorageBackend::from_config(&config)
        .await
        .context("Failed to initialize delivery storage")?;
    let tracker = DeliveryTracker::from_config(storage, &config);

    match cli.command {
        Command::Check {
            message_id,
            subscriber_name,
        } => {
            let verdict = tracker.can_be_delivered(&message_id, &subscriber_name).await?;
            println!("{}", verdict);
        }
        Command::Claim {
            message_id,
            subscriber_name,
        } => {
            let verdict = tracker.try_claim(&message_id, &subscriber_name).await?;
            println!("{}", verdict);
        }
        Command::Start {
            message_id,
            subscriber_name,
        } => {
            tracker.set_in_progress(&message_id, &subscriber_name).await?;
            println!("in_progress");
        }
        Command::Deliver {
            message_id,
            subscriber_name,
        } => {
            tracker.set_as_delivered(&message_id, &subscriber_name).await?;
            println!("delivered");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_subcommand_with_ids() {
        let cli = Cli::try_parse_from([
            "dedup-probe",
            "claim",
            "121212121",
            "some service_random-name2!",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Command::Claim {
                message_id: "121212121".to_string(),
                subscriber_name: "some service_random-name2!".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_missing_or_unknown_arguments() {
        assert!(Cli::try_parse_from(["dedup-probe", "check", "only-message"]).is_err());
        assert!(Cli::try_parse_from(["dedup-probe", "purge", "m", "s"]).is_err());
        assert!(Cli::try_parse_from(["dedup-probe"]).is_err());
    }
}
