//! Client for the Fusion MCP relay.
//!
//! [`McpClient`] opens a TCP connection to a running `fusion-mcpd`, sends
//! newline-delimited JSON requests, and decodes the replies. The `fusion-mcp`
//! binary wraps it in a small CLI: configuration flags come first, then one
//! subcommand naming the request. The reply is printed as pretty JSON and the
//! exit code reflects its `status`.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;

use fusion_mcp_config::Config;
use fusion_mcp_protocol::{Message, Payload};

mod cli;
mod client;
mod config;
mod errors;
mod telemetry;
mod transport;

use cli::{Cli, CliCommand};
use config::{command_arguments, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use errors::AppError;

pub use client::{McpClient, ResponseHandler};
pub use errors::ClientError;

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Exit status for replies reporting `status: "error"`.
const ERROR_REPLY_EXIT: u8 = 1;

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    stdout: &'a mut W,
    stderr: &'a mut E,
    loader: &'a L,
    install_telemetry: bool,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);

        let cli = match Cli::try_parse_from(command_arguments(&args, &split)) {
            Ok(cli) => cli,
            Err(error) => return self.report_usage(error),
        };

        let result = self.loader.load(&split.config_arguments).and_then(|config| {
            let config = cli.resolve_config(config);
            if self.install_telemetry {
                telemetry::install(&config)?;
            }
            self.execute(&config, cli.command)
        });

        match result {
            Ok(exit_code) => exit_code,
            Err(error) => {
                // Nothing useful can be done if stderr itself is gone.
                writeln!(self.stderr, "fusion-mcp: {error}").ok();
                ExitCode::FAILURE
            }
        }
    }

    fn execute(&mut self, config: &Config, command: CliCommand) -> Result<ExitCode, AppError> {
        let request = build_request(command)?;
        let mut client = McpClient::from_config(config);
        client.try_connect()?;
        let reply = client.request(&request);
        client.disconnect();
        let reply = reply?;

        let rendered =
            serde_json::to_string_pretty(reply.fields()).map_err(AppError::RenderReply)?;
        writeln!(self.stdout, "{rendered}").map_err(AppError::WriteReply)?;
        self.stdout.flush().map_err(AppError::WriteReply)?;

        if reply.is_success() {
            Ok(ExitCode::SUCCESS)
        } else {
            Ok(ExitCode::from(ERROR_REPLY_EXIT))
        }
    }

    fn report_usage(&mut self, error: clap::Error) -> ExitCode {
        if error.use_stderr() {
            writeln!(self.stderr, "{}", AppError::CliUsage(error)).ok();
            ExitCode::FAILURE
        } else {
            write!(self.stdout, "{error}").ok();
            ExitCode::SUCCESS
        }
    }
}

fn build_request(command: CliCommand) -> Result<Message, AppError> {
    match command {
        CliCommand::ModelInfo => Ok(Message::get_model_info()),
        CliCommand::Command { name, params } => {
            let params = params.as_deref().map(parse_params).transpose()?;
            Ok(Message::fusion_command(name, params.unwrap_or_default()))
        }
        CliCommand::Prompt { text, model } => Ok(Message::llm_request(text, model.as_deref())),
    }
}

fn parse_params(text: &str) -> Result<Payload, AppError> {
    match serde_json::from_str(text).map_err(AppError::InvalidParams)? {
        Value::Object(params) => Ok(params),
        _ => Err(AppError::ParamsNotObject),
    }
}

/// Runs the CLI with the given arguments and output streams.
///
/// Configuration is layered by `ortho-config` from the leading flags, the
/// environment, and an optional configuration file.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    CliRunner {
        stdout,
        stderr,
        loader: &OrthoConfigLoader,
        install_telemetry: true,
    }
    .run(args)
}

/// Runs the CLI with a custom configuration loader and no log subscriber.
#[cfg(test)]
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner {
        stdout,
        stderr,
        loader,
        install_telemetry: false,
    }
    .run(args)
}

#[cfg(test)]
mod tests;
