//! Command-line interface definition for the relay client.

use clap::{Parser, Subcommand};

use fusion_mcp_config::{Config, ServerAddress};

/// Command-line client for the Fusion MCP relay.
#[derive(Parser, Debug)]
#[command(name = "fusion-mcp", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Relay address as `tcp://host:port` or `host:port`; overrides
    /// `--host` and `--port`.
    #[arg(long, value_name = "ADDRESS")]
    pub(crate) address: Option<ServerAddress>,
    /// Request to send.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Requests the CLI can send.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Prints information about the open model.
    ModelInfo,
    /// Runs a command in the host application.
    Command {
        /// Command name, for example `create_circle`.
        name: String,
        /// Command parameters as a JSON object.
        #[arg(long, value_name = "JSON")]
        params: Option<String>,
    },
    /// Requests generated text for a prompt.
    Prompt {
        /// Prompt text.
        text: String,
        /// Model name; the server default is used when omitted.
        #[arg(long)]
        model: Option<String>,
    },
}

impl Cli {
    /// Applies `--address` on top of the loaded configuration.
    pub(crate) fn resolve_config(&self, mut config: Config) -> Config {
        if let Some(address) = &self.address {
            config.host.clone_from(&address.host);
            config.port = address.port;
        }
        config
    }
}
