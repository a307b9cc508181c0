//! `fusion-mcp`: sends one request to a running relay and prints the reply.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    fusion_mcp_client::run(std::env::args_os(), &mut stdout, &mut stderr)
}
