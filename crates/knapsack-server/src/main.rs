//! Knapsack matcher — AI-assisted need/resource matching server.

use std::path::PathBuf;
use std::sync::Arc;

use knapsack_core::KnapsackConfig;
use knapsack_oracle::{HttpOracle, OracleConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod routes;
mod state;

use state::AppState;

fn oracle_config_path() -> Option<PathBuf> {
    std::env::var("KNAPSACK_ORACLE_CONFIG").ok().map(PathBuf::from)
}

fn print_help() {
    println!("Knapsack matcher — ranks combinations of resources against a need");
    println!();
    println!("Usage: knapsack [command]");
    println!();
    println!("Commands:");
    println!("  (none)      Start the server");
    println!("  check       Verify the configured oracle provider is reachable");
    println!("  help        Show this help message");
    println!();
    println!("Environment:");
    println!("  KNAPSACK_HOST, PORT                 Bind address (default 0.0.0.0:8003)");
    println!("  KNAPSACK_ORACLE_CONFIG              Path to oracle config JSON");
    println!("  ANTHROPIC_API_KEY, GROQ_API_KEY,");
    println!("  OPENAI_API_KEY                      Oracle provider keys");
    println!("  RUST_LOG                            Log filter (default info)");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--check" | "check" => {
                let config = KnapsackConfig::from_env()?;
                let oracle_config = OracleConfig::load(oracle_config_path().as_deref());
                let oracle = HttpOracle::new(&oracle_config, config.oracle_timeout)?;
                let status = oracle_config.status();
                match oracle.test_connection().await {
                    Ok(()) => {
                        println!("Oracle reachable: {} ({})", status.provider, status.model);
                        std::process::exit(0);
                    }
                    Err(e) => {
                        eprintln!("Oracle check failed for {}: {}", status.provider, e);
                        std::process::exit(1);
                    }
                }
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'knapsack help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let config = KnapsackConfig::from_env()?;
    let oracle_config = OracleConfig::load(oracle_config_path().as_deref());

    let oracle = match HttpOracle::new(&oracle_config, config.oracle_timeout) {
        Ok(oracle) => oracle,
        Err(e) => {
            tracing::error!("Oracle is not configured: {}", e);
            return Err(e.into());
        }
    };
    let oracle_status = oracle_config.status();
    info!(
        "Oracle provider: {} (model {})",
        oracle_status.provider, oracle_status.model
    );

    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(config, Arc::new(oracle), oracle_status));
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Knapsack matcher listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
