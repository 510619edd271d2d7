use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::logging::{init_logging_with_config, LogConfig};
use crate::node::memory::MemoryNode;
use crate::node::Node;
use crate::router::Router;
use crate::runtime_config::RuntimeConfig;
use crate::server::ControlServer;

/// Command-line interface for brrtcontrol
#[derive(Parser)]
#[command(name = "brrtcontrol")]
#[command(about = "Control API for runtime nodes", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the control API for an in-memory node
    Serve {
        /// Listening URI; host and port are required
        #[arg(short, long, env = "BRRTC_URI", default_value = "http://127.0.0.1:5001")]
        uri: String,

        /// Node identifier (a fresh UUID if omitted)
        #[arg(long)]
        node_id: Option<String>,
    },
    /// Print the route table in match order
    Routes,
}

/// One line per route: verb, template, handler name.
#[must_use]
pub fn format_routes(router: &Router) -> String {
    router
        .routes()
        .iter()
        .map(|route| {
            format!(
                "{:<7} {:<38} {}\n",
                route.method.as_str(),
                route.template.as_str(),
                route.id.handler_name()
            )
        })
        .collect()
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { uri, node_id } => {
            init_logging_with_config(&LogConfig::from_env())?;
            serve(&uri, node_id)
        }
        Commands::Routes => {
            print!("{}", format_routes(&Router::new()));
            Ok(())
        }
    }
}

fn serve(uri: &str, node_id: Option<String>) -> Result<()> {
    let config = RuntimeConfig::from_env();
    may::config().set_stack_size(config.stack_size);

    let node = Arc::new(match node_id {
        Some(id) => MemoryNode::with_id(id),
        None => MemoryNode::new(),
    });
    let control_node: Arc<dyn Node> = Arc::clone(&node) as Arc<dyn Node>;
    let handle = ControlServer::start(control_node, uri, &config)
        .with_context(|| format!("failed to start control API on {uri}"))?;
    info!(node_id = %node.id(), addr = %handle.local_addr(), "Node ready");

    wait_for_shutdown(&node, config.tick_interval)?;
    handle.stop();
    Ok(())
}

/// Fire queued node callbacks. Returns true once the node has been told to stop.
fn pump(node: &MemoryNode) -> bool {
    node.run_pending();
    if node.is_stopped() {
        info!(node_id = %node.id(), "Node stop requested");
        return true;
    }
    false
}

#[cfg(unix)]
fn wait_for_shutdown(node: &MemoryNode, interval: Duration) -> Result<()> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGTERM, SIGINT]).context("failed to install signal handlers")?;
    loop {
        if let Some(signal) = signals.pending().next() {
            info!(signal, "shutdown signal received");
            return Ok(());
        }
        if pump(node) {
            return Ok(());
        }
        thread::sleep(interval);
    }
}

#[cfg(not(unix))]
fn wait_for_shutdown(node: &MemoryNode, interval: Duration) -> Result<()> {
    while !pump(node) {
        thread::sleep(interval);
    }
    Ok(())
}
