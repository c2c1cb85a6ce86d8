//! Edge gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                     EDGE GATEWAY                      │
//!                    │                                                       │
//!  Client Request    │  ┌────────┐   ┌─────────┐   ┌───────────────────────┐ │
//!  ──────────────────┼─▶│  http  │──▶│ routing │──▶│     filter chain      │ │
//!                    │  │ server │   │ matcher │   │ authenticate / admin /│ │
//!                    │  └────────┘   └─────────┘   │ hash_password / login │ │
//!                    │                             └───────────┬───────────┘ │
//!                    │                                         │             │
//!                    │                  ┌──────────┐   ┌───────▼────────┐    │
//!                    │                  │   auth   │◀──│    upstream    │    │
//!                    │                  │ reissue  │   │resolve/forward │────┼──▶ Backend
//!                    │                  └──────────┘   └───────┬────────┘    │
//!  Client Response   │  ┌──────────────────────────┐           │             │
//!  ◀─────────────────┼──│ response (pending headers)│◀──────────┘             │
//!                    │  └──────────────────────────┘                         │
//!                    │                                                       │
//!                    │  config · observability · lifecycle · resilience      │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use axum::http::Method;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use edge_gateway::config::{load_config, GatewayConfig};
use edge_gateway::lifecycle::{build_state, shutdown_signal, StartupError};
use edge_gateway::observability::{logging, metrics};
use edge_gateway::routing::{MethodMatcher, Route};
use edge_gateway::{GatewayServer, Shutdown};

#[derive(Parser)]
#[command(name = "edge-gateway", version, about = "Authenticating edge gateway")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "gateway.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the gateway (default).
    Serve,
    /// Load and validate the configuration, then print the route table.
    Check,
    /// Show which route and filters would handle a request.
    Route {
        method: String,
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Check => {
            let state = build_state(&config)?;
            println!("{} ok", cli.config.display());
            for route in state.router.routes() {
                print_route(route);
            }
            Ok(())
        }
        Command::Route { method, path } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            let state = build_state(&config)?;
            match state.router.match_route(&method, &path) {
                Some(route) => print_route(route),
                None => println!("no route for {method} {path}"),
            }
            Ok(())
        }
    }
}

async fn serve(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(&config.observability.log_level);
    tracing::info!("edge-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        upstreams = config.upstreams.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr).map_err(StartupError::from)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = GatewayServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn print_route(route: &Route) {
    let methods = match route.methods() {
        MethodMatcher::Any => "*".to_string(),
        MethodMatcher::OneOf(methods) => methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(","),
    };
    let paths = route
        .patterns()
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    println!(
        "{:<20} {:<12} {:<40} -> {:<10} priority={} filters=[{}]",
        route.id(),
        methods,
        paths,
        route.upstream(),
        route.priority(),
        route.chain().names().join(", ")
    );
}
