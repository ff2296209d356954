use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

mod rpc_cmd;
mod scaffold_cmd;

#[derive(Parser)]
#[command(name = "toolbox", about = "Toolbox CLI - call MCP tools and scaffold new ones")]
struct Cli {
    /// Toolbox server URL
    #[arg(long, env = "TOOLBOX_URL", default_value = "http://localhost:8787")]
    toolbox_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tools the server exposes
    List {
        /// Ask for a one-shot event-stream reply instead of JSON
        #[arg(long)]
        sse: bool,
    },

    /// Invoke a tool
    Call {
        /// Tool name
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,

        #[arg(long)]
        sse: bool,
    },

    /// Check that the server answers
    Ping {
        #[arg(long)]
        sse: bool,
    },

    /// Generate a new tool module and register it
    Scaffold {
        /// Tool name, e.g. `get-weather` or `getWeather`
        name: String,

        /// Tool description
        description: Vec<String>,

        /// Workspace root
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { sse } => {
            rpc_cmd::run(&cli.toolbox_url, "tools/list", None, sse).await?;
        }
        Commands::Call { tool, args, sse } => {
            let arguments = rpc_cmd::parse_arguments(&args)?;
            let params = json!({ "name": tool, "arguments": arguments });
            rpc_cmd::run(&cli.toolbox_url, "tools/call", Some(params), sse).await?;
        }
        Commands::Ping { sse } => {
            rpc_cmd::run(&cli.toolbox_url, "ping", None, sse).await?;
        }
        Commands::Scaffold {
            name,
            description,
            root,
        } => {
            let path = scaffold_cmd::run(&root, &name, &description.join(" "))?;
            println!("Created tool: {}", path.display());
            println!("- updated {}/mod.rs", scaffold_cmd::TOOLS_DIR);
        }
    }

    Ok(())
}
