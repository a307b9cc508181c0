use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match fusion_mcpd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let mut stderr = io::stderr().lock();
            // Nothing useful can be done if stderr itself is gone.
            writeln!(stderr, "fusion-mcpd: {error}").ok();
            ExitCode::FAILURE
        }
    }
}
