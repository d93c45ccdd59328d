use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use iga_provider::{
    host::{DataSource, ReadDataRequest, ResourceResponse, Severity},
    provider::Provider,
    resources::{ConnectionDataSource, EndpointsDataSource},
    telemetry::init_tracing,
};
use serde_json::{Value, json};

/// Inspect an IGA tenant with the provider's own codecs.
#[derive(Debug, Parser)]
#[command(name = "igactl", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the resolved configuration with the password hidden
    Config,
    /// Fetch one connection and print its decoded state
    Connection {
        /// Connector family slug or connection type, e.g. `okta` or `SAP`
        family: String,
        name: String,
        /// Include sensitive attributes
        #[arg(long)]
        authenticate: bool,
    },
    /// Fetch one endpoint and print its decoded state
    Endpoint { name: String },
}

fn print_response(response: ResourceResponse) -> Result<()> {
    for diagnostic in response.diagnostics.iter() {
        let level = match diagnostic.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        eprintln!("{level}: {}: {}", diagnostic.summary, diagnostic.detail);
    }
    if response.diagnostics.has_errors() {
        bail!("lookup failed");
    }
    let state = response.state.unwrap_or(Value::Null);
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let provider = Provider::from_env().context("loading configuration")?;
    init_tracing(provider.config()).context("initializing tracing")?;

    if let Command::Config = cli.command {
        println!("{}", provider.config().redacted_json()?);
        return Ok(());
    }

    let clients = provider.configure(&Value::Null).await?;

    match cli.command {
        Command::Config => Ok(()),
        Command::Connection {
            family,
            name,
            authenticate,
        } => {
            let codec = provider
                .registry()
                .resolve(&family)
                .with_context(|| format!("unknown connector family '{family}'"))?;
            let mut source = ConnectionDataSource::new(codec);
            source.configure(Some(Arc::clone(&clients).into_provider_data()))?;
            let response = source
                .read(ReadDataRequest {
                    config: json!({ "connection_name": name, "authenticate": authenticate }),
                    ..Default::default()
                })
                .await;
            print_response(response)
        }
        Command::Endpoint { name } => {
            let mut source = EndpointsDataSource::new();
            source.configure(Some(clients.into_provider_data()))?;
            let response = source
                .read(ReadDataRequest {
                    config: json!({ "endpoint_name": name }),
                    ..Default::default()
                })
                .await;
            print_response(response)
        }
    }
}
