//! `twctl` — a command-line client for submitting and polling tasks against
//! a running broker.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use taskwheel_client::BrokerClient;
use taskwheel_proto::TaskRequest;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "twctl")]
#[command(about = "Submit and poll tasks against a taskwheel broker")]
struct Cli {
    /// Broker address, `host:port`.
    #[arg(short, long, global = true, default_value = "127.0.0.1:7000")]
    broker: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a new task.
    Submit {
        /// Executable name, resolved under the worker's configured bin_path.
        bin_name: String,

        /// Arguments passed to the executable, as a single string.
        #[arg(default_value = "")]
        args: String,

        /// Unix seconds to run at; 0 (default) means "as soon as possible".
        #[arg(long, default_value = "0")]
        start_time: i64,

        /// Retry back-off schedule, space-separated seconds (e.g. "2 4 8").
        #[arg(long, default_value = "")]
        time_interval: String,
    },

    /// Poll for a previously submitted task's result.
    Poll {
        /// The uuid returned by `submit`.
        uuid: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut client = BrokerClient::connect(&cli.broker)
        .await
        .with_context(|| format!("failed to connect to broker at {}", cli.broker))?;

    match cli.command {
        Commands::Submit {
            bin_name,
            args,
            start_time,
            time_interval,
        } => {
            let uuid = Uuid::new_v4().to_string();
            let req = TaskRequest {
                uuid: uuid.clone(),
                bin_name,
                args,
                start_time,
                time_interval,
                index: 0,
            };
            let status = client.submit(&req).await.context("submit failed")?;
            if status.status == 0 {
                println!("{uuid}");
            } else {
                anyhow::bail!("broker rejected submission: {}", status.message);
            }
        }
        Commands::Poll { uuid } => {
            let reply = client.poll(&uuid).await.context("poll failed")?;
            if reply.is_result_exist == 0 {
                println!("not ready");
            } else if reply.is_success == 1 {
                println!("ok: {}", reply.result);
            } else {
                println!("failed: {}", reply.result);
            }
        }
    }

    client.close().await.context("failed to close connection")?;
    Ok(())
}
