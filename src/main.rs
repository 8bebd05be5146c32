use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use schemascope::aggregate::AggregateOptions;
use schemascope::http::HttpServer;
use schemascope::neo4j::{DbCredentials, Neo4jHttpConnector};
use schemascope::store::open_store;
use schemascope::{Config, SchemaService};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "schemascope")]
#[command(about = "Introspect a Neo4j graph and serve a label-keyed schema summary")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Run one fetch cycle and print the aggregate
    Refresh {
        #[arg(long)]
        uri: Option<String>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long, env = "NEO4J_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long)]
        database: Option<String>,
    },
    /// Print properties and relationship statements for labels
    Labels {
        #[arg(required = true)]
        labels: Vec<String>,
    },
}

/// Wire the service from configuration.
fn build_service(config: &Config) -> Result<Arc<SchemaService>> {
    let connector = Neo4jHttpConnector::new(
        config.default_credentials(),
        Duration::from_secs(config.store.timeout_secs),
    )?;
    let store = open_store(config.aggregate.backend, config.aggregate_path());
    let options = AggregateOptions {
        dedup_relationships: config.aggregate.dedup_relationships,
    };

    Ok(Arc::new(SchemaService::new(Arc::new(connector), store, options)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", &config.schemascope.log_level)
    ).init();

    log::info!("Starting Schemascope v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Graph store: {}", config.store.uri);
    log::info!("Aggregate snapshot: {} ({:?})", config.aggregate_path().display(), config.aggregate.backend);

    let service = build_service(&config)?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let server = HttpServer::new(service, config.http_server.allowed_origins.clone());
            server.run(&config.http_server.host, config.http_server.port).await?;
        }
        Command::Refresh { uri, user, password, database } => {
            let credentials = DbCredentials { uri, user, password, database };
            let aggregate = service
                .refresh_aggregate(&credentials)
                .await
                .context("Fetch cycle failed")?;
            println!("{}", serde_json::to_string_pretty(&aggregate)?);
        }
        Command::Labels { labels } => {
            let infos = match service.get_label_info(&labels).await {
                Err(e) if e.is_missing_aggregate() => {
                    anyhow::bail!("No schema available yet ({}). Run `schemascope refresh` first.", e)
                }
                other => other?,
            };
            println!("{}", serde_json::to_string_pretty(&infos)?);
        }
    }

    Ok(())
}
