use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use helpdesk_relay::correlation::{classify, extract_correlation_key};
use reqwest::Client;
use serde_json::json;

#[derive(Parser)]
#[command(name = "helpdesk-relay-cli")]
#[command(about = "Helpdesk relay operator CLI", long_about = None)]
struct Cli {
    #[arg(short, long, env = "HELPDESK_RELAY_ENDPOINT", default_value = "http://localhost:3000")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,

    /// List open DOWN alerts
    Alerts,

    /// Show recent webhook events
    Logs {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Post a synthetic Freshdesk webhook event
    SendEvent {
        #[arg(short, long, default_value = "ticket.created")]
        event_type: String,

        #[arg(short, long)]
        ticket_id: u64,
    },

    /// Show the correlation key and state derived from a subject (offline)
    ExtractKey {
        #[arg(value_name = "SUBJECT")]
        subject: String,
    },
}

async fn print_json(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .context("Server returned a non-JSON body")?;

    println!("{}", serde_json::to_string_pretty(&body)?);

    if !status.is_success() {
        bail!("Request failed with status {}", status);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await
                .with_context(|| format!("Could not reach {}", cli.endpoint))?;
            print_json(response).await?;
        }

        Commands::Alerts => {
            let response = client
                .get(format!("{}/v1/down-alerts", cli.endpoint))
                .send()
                .await
                .with_context(|| format!("Could not reach {}", cli.endpoint))?;
            print_json(response).await?;
        }

        Commands::Logs { limit } => {
            let response = client
                .get(format!("{}/webhook/logs", cli.endpoint))
                .query(&[("limit", limit)])
                .send()
                .await
                .with_context(|| format!("Could not reach {}", cli.endpoint))?;
            print_json(response).await?;
        }

        Commands::SendEvent {
            event_type,
            ticket_id,
        } => {
            let response = client
                .post(format!("{}/webhook/freshdesk", cli.endpoint))
                .json(&json!({
                    "event_type": event_type,
                    "ticket_id": ticket_id,
                }))
                .send()
                .await
                .with_context(|| format!("Could not reach {}", cli.endpoint))?;
            print_json(response).await?;
        }

        Commands::ExtractKey { subject } => {
            let key = extract_correlation_key(Some(&subject));
            let state = classify(&subject);
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "subject": subject,
                    "correlation_key": key,
                    "state": state,
                }))?
            );
        }
    }

    Ok(())
}
