//! Flowbridge CLI: run workflows and serve the MCP bridge.
//!
//! Reuses the same engine (flowbridge-core) and server bootstrap
//! (flowbridge-server) as the HTTP deployment.

use clap::{Parser, Subcommand};

use flowbridge_cli::commands;

/// Flowbridge: workflow engine and MCP bridge for service proxies
#[derive(Parser)]
#[command(name = "flowbridge", version, about = "Flowbridge: workflow engine and MCP bridge")]
pub struct Cli {
    /// Register the in-memory sandbox services
    #[arg(long, global = true, env = "FLOWBRIDGE_SANDBOX")]
    sandbox: bool,

    /// Provider that bridge tool calls are routed to
    #[arg(long, global = true, env = "FLOWBRIDGE_PROVIDER", default_value = "workspace")]
    provider: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Flowbridge HTTP server
    Server {
        /// Host to bind to
        #[arg(long, env = "FLOWBRIDGE_HOST", default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, env = "FLOWBRIDGE_PORT", default_value_t = 3220)]
        port: u16,
    },

    /// Serve the MCP bridge over stdio, one JSON-RPC message per line
    Mcp,

    /// Run a workflow file (YAML or JSON) and print the execution record
    Run {
        /// Path to the workflow file
        file: String,
        /// Provider token as provider=token (repeatable)
        #[arg(long = "token", value_name = "PROVIDER=TOKEN")]
        tokens: Vec<String>,
    },

    /// Send a raw JSON-RPC request to an in-process bridge
    Rpc {
        /// JSON-RPC method name (e.g. "tools/list")
        #[arg(long)]
        method: String,
        /// JSON-RPC params as a JSON string
        #[arg(long, default_value = "{}")]
        params: String,
    },

    /// List registered providers, services and functions
    Services,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // stdout belongs to command output (and to the protocol for `mcp`)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "flowbridge_core=warn,flowbridge_server=info,flowbridge_cli=info".into()
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = if let Some(command) = cli.command {
        match command {
            Commands::Server { host, port } => {
                commands::server::run(host, port, cli.provider, cli.sandbox).await
            }

            Commands::Mcp => {
                let state = commands::init_state(cli.sandbox, &cli.provider).await;
                commands::mcp::run(&state).await
            }

            Commands::Run { file, tokens } => {
                let state = commands::init_state(cli.sandbox, &cli.provider).await;
                commands::run::run(&state, &file, &tokens).await
            }

            Commands::Rpc { method, params } => {
                let state = commands::init_state(cli.sandbox, &cli.provider).await;
                commands::rpc::call(&state, &method, &params).await
            }

            Commands::Services => {
                let state = commands::init_state(cli.sandbox, &cli.provider).await;
                commands::services::list(&state).await
            }
        }
    } else {
        use clap::CommandFactory;
        Cli::command().print_help().ok();
        println!();
        Ok(())
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
