//! Test support for client and CLI coverage.
//!
//! [`FakeServer`] accepts a single connection, records the request, and plays
//! back canned reply lines, so client behaviour can be checked without a
//! running relay.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, ensure};
use rstest::fixture;
use serde_json::Value;

use fusion_mcp_config::Config;

use crate::errors::AppError;
use crate::{ConfigLoader, run_with_loader};

#[derive(Debug, Clone)]
enum Script {
    Reply(Vec<String>),
    Fragmented(String),
    Silent,
}

/// Single-connection relay double.
pub(crate) struct FakeServer {
    port: u16,
    requests: Arc<Mutex<Vec<Value>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeServer {
    /// Replies to the first request with `lines`, then hangs up.
    pub(crate) fn replying(lines: Vec<String>) -> Result<Self> {
        Self::spawn(Script::Reply(lines))
    }

    /// Replies with `line` split into two writes.
    pub(crate) fn fragmenting(line: String) -> Result<Self> {
        Self::spawn(Script::Fragmented(line))
    }

    /// Reads the request and never answers.
    pub(crate) fn silent() -> Result<Self> {
        Self::spawn(Script::Silent)
    }

    /// Reserves a port and releases it so connections are refused.
    pub(crate) fn refusing() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind throwaway listener")?;
        let port = listener.local_addr().context("throwaway local addr")?.port();
        drop(listener);
        Ok(Self {
            port,
            requests: Arc::new(Mutex::new(Vec::new())),
            handle: None,
        })
    }

    pub(crate) const fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the server thread and returns the decoded requests.
    pub(crate) fn requests(mut self) -> Result<Vec<Value>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake server thread panicked"))?
                .context("fake server failed")?;
        }
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }

    fn spawn(script: Script) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake server")?;
        let port = listener.local_addr().context("local addr")?.port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().context("accept client")?;
            serve(stream, &script, &recorded)
        });
        Ok(Self {
            port,
            requests,
            handle: Some(handle),
        })
    }
}

fn serve(mut stream: TcpStream, script: &Script, requests: &Mutex<Vec<Value>>) -> Result<()> {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .context("set read timeout")?;
    let mut reader = BufReader::new(stream.try_clone().context("clone stream")?);
    let mut line = String::new();
    if reader.read_line(&mut line).context("read request")? == 0 {
        return Ok(());
    }
    let request: Value = serde_json::from_str(&line).context("request is JSON")?;
    requests
        .lock()
        .map_err(|error| anyhow!("lock requests: {error}"))?
        .push(request);

    match script {
        Script::Reply(lines) => {
            for reply in lines {
                stream
                    .write_all(format!("{reply}\n").as_bytes())
                    .context("write reply")?;
            }
        }
        Script::Fragmented(reply) => {
            let (head, tail) = reply.split_at(reply.len() / 2);
            stream.write_all(head.as_bytes()).context("write head")?;
            stream.flush().context("flush head")?;
            thread::sleep(Duration::from_millis(50));
            stream
                .write_all(format!("{tail}\n").as_bytes())
                .context("write tail")?;
        }
        Script::Silent => {
            // Hold the connection until the client gives up.
            let mut sink = Vec::new();
            reader.read_to_end(&mut sink).ok();
        }
    }
    stream.flush().context("flush replies")
}

/// Loader that returns a fixed configuration.
pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(crate) const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// CLI scenario state.
#[derive(Default)]
pub(crate) struct CliWorld {
    pub(crate) config: Config,
    pub(crate) server: Option<FakeServer>,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
    pub(crate) exit_code: Option<ExitCode>,
    pub(crate) requests: Vec<Value>,
}

impl CliWorld {
    pub(crate) fn start_server(&mut self, reply: &str) -> Result<()> {
        let server = FakeServer::replying(vec![reply.to_owned()])?;
        self.use_port(server.port());
        self.server = Some(server);
        Ok(())
    }

    pub(crate) fn stop_listening(&mut self) -> Result<()> {
        let server = FakeServer::refusing()?;
        self.use_port(server.port());
        self.server = None;
        Ok(())
    }

    fn use_port(&mut self, port: u16) {
        self.config.host = "127.0.0.1".to_owned();
        self.config.port = port;
        self.config.connect_timeout_secs = 1;
    }

    pub(crate) fn run(&mut self, tokens: &[&str]) -> Result<()> {
        self.stdout.clear();
        self.stderr.clear();
        let args: Vec<OsString> = std::iter::once("fusion-mcp")
            .chain(tokens.iter().copied())
            .map(OsString::from)
            .collect();
        let loader = StaticConfigLoader::new(self.config.clone());
        let exit = run_with_loader(args, &mut self.stdout, &mut self.stderr, &loader);
        self.exit_code = Some(exit);
        if let Some(server) = self.server.take() {
            self.requests = server.requests()?;
        }
        Ok(())
    }

    pub(crate) fn stdout_json(&self) -> Result<Value> {
        serde_json::from_slice(&self.stdout).context("stdout holds one JSON document")
    }

    pub(crate) fn stderr_text(&self) -> Result<String> {
        String::from_utf8(self.stderr.clone()).context("stderr is UTF-8")
    }

    pub(crate) fn assert_exit_code(&self, expected: ExitCode) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(exit == expected, "expected exit code {expected:?}, got {exit:?}");
        Ok(())
    }
}

#[fixture]
pub(crate) fn world() -> std::cell::RefCell<CliWorld> {
    std::cell::RefCell::new(CliWorld::default())
}
