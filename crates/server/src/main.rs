//! `engine` binary: serve both transports, or run one-shot operations
//!
//! Exit codes: 0 success, 1 usage, 2 configuration, 3 runtime failure.

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use engine::{AuthTokens, EngineConfig, SemanticEngine};
use rdf_model::io::TurtleReader;
use server::{mcp::McpServer, rpc::RpcServer};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "engine", version, about = "Semantic knowledge-graph engine")]
struct Cli {
    /// Serve only the line-delimited tool transport over stdio
    #[arg(long)]
    mcp: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start both the tool and binary RPC transports
    Serve,
    /// Batch-load a Turtle/N-Triples file
    Ingest {
        /// Target namespace
        #[arg(long)]
        namespace: String,
        /// File to load
        file: PathBuf,
    },
    /// Run a one-shot SPARQL query
    Sparql {
        /// Target namespace
        #[arg(long)]
        namespace: String,
        /// Query text
        query: String,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    // keep stdout clean for the stdio transport
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(2);
        }
    };
    let auth = match AuthTokens::from_env() {
        Ok(auth) => auth,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    if !cli.mcp && cli.command.is_none() {
        eprintln!("nothing to do: pass --mcp or a subcommand (see --help)");
        return ExitCode::from(1);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("runtime error: {e}");
            return ExitCode::from(3);
        }
    };
    match runtime.block_on(run(cli, config, auth)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(3)
        }
    }
}

async fn run(cli: Cli, config: EngineConfig, auth: Option<AuthTokens>) -> anyhow::Result<()> {
    let rpc_port = config.rpc_port;
    let engine = Arc::new(SemanticEngine::open(config)?);

    if cli.mcp {
        McpServer::new(Arc::clone(&engine)).run().await?;
        engine.flush()?;
        return Ok(());
    }

    match cli.command.expect("checked in main") {
        Command::Serve => {
            let shutdown = CancellationToken::new();
            let mcp = McpServer::new(Arc::clone(&engine));
            let rpc = RpcServer::new(Arc::clone(&engine), auth, rpc_port);

            tokio::select! {
                result = mcp.run() => result?,
                result = rpc.run(shutdown.clone()) => result?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutting down");
                    shutdown.cancel();
                }
            }
            engine.flush()?;
            engine.compact()?;
        }
        Command::Ingest { namespace, file } => {
            let content = std::fs::read_to_string(&file)?;
            let triples = TurtleReader::new().parse(&content)?;
            let count = triples.len();
            let report = engine
                .ingest_terms(
                    &namespace,
                    triples,
                    &file.display().to_string(),
                    &CancellationToken::new(),
                )
                .await?;
            engine.flush()?;
            println!(
                "parsed {count} triples: {} stored, {} new nodes",
                report.edges_added, report.nodes_added
            );
        }
        Command::Sparql { namespace, query } => {
            let results = engine.sparql(&namespace, &query, &CancellationToken::new())?;
            println!("{}", serde_json::to_string_pretty(&results.to_json())?);
        }
    }
    Ok(())
}
