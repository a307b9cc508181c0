//! BDD test world: loader, reporter, daemon, running server, and connected clients.

use std::cell::RefCell;
use std::sync::Arc;

use serde_json::Value;

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, bootstrap_with};
use crate::process::default_dispatch_table;
use crate::server::{ServerError, ServerHandle};

use super::client::TestClient;
use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::reporter::RecordingHealthReporter;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingHealthReporter>,
    daemon: Option<Daemon>,
    bootstrap_error: Option<BootstrapError>,
    server: Option<ServerHandle>,
    server_error: Option<ServerError>,
    clients: Vec<TestClient>,
    replies: Vec<Value>,
}

impl TestWorld {
    /// Builds a world with a successful configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader::new()),
            reporter: Arc::new(RecordingHealthReporter::default()),
            daemon: None,
            bootstrap_error: None,
            server: None,
            server_error: None,
            clients: Vec::new(),
            replies: Vec::new(),
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
        self.reset_results();
    }

    /// Installs a loader that succeeds.
    pub fn use_successful_loader(&mut self) {
        self.loader = Box::new(TestConfigLoader::new());
        self.reset_results();
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.daemon.is_some() || self.bootstrap_error.is_some() {
            return;
        }

        match bootstrap_with(&*self.loader, self.reporter.clone()) {
            Ok(daemon) => self.daemon = Some(daemon),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Bootstraps if needed, then starts a server with the default table.
    pub fn start_server(&mut self) {
        self.bootstrap();
        let Some(daemon) = self.daemon.as_ref() else {
            return;
        };
        match daemon.start_server(default_dispatch_table()) {
            Ok(handle) => self.server = Some(handle),
            Err(error) => self.server_error = Some(error),
        }
    }

    /// Stops the running server, recording the stop with the reporter.
    pub fn stop_server(&mut self) {
        if let (Some(daemon), Some(server)) = (self.daemon.as_ref(), self.server.as_ref()) {
            daemon.stop_server(server).expect("server should stop cleanly");
        }
    }

    /// Returns whether bootstrap produced an error.
    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns true when the daemon handle is available.
    #[must_use]
    pub fn daemon_started(&self) -> bool {
        self.daemon.is_some()
    }

    /// Returns the running server, panicking when none was started.
    pub fn server(&self) -> &ServerHandle {
        match (self.server.as_ref(), self.server_error.as_ref()) {
            (Some(server), _) => server,
            (None, Some(error)) => panic!("server failed to start: {error}"),
            (None, None) => panic!("server was not started"),
        }
    }

    /// Opens a new client connection and returns its index.
    pub fn connect_client(&mut self) -> usize {
        let client = TestClient::connect(self.server().local_addr());
        self.clients.push(client);
        self.clients.len() - 1
    }

    /// Sends raw bytes on the most recent client and records the reply.
    pub fn send_raw(&mut self, bytes: &[u8]) {
        let client = self.clients.last_mut().expect("no client connected");
        client.send(bytes);
        let reply = client.read_reply();
        self.replies.push(reply);
    }

    /// Sends bytes on the most recent client without waiting for a reply.
    pub fn send_fragment(&mut self, bytes: &[u8]) {
        let client = self.clients.last_mut().expect("no client connected");
        client.send(bytes);
        // Give the server a chance to read the fragment on its own.
        std::thread::sleep(std::time::Duration::from_millis(20));
    }

    /// Sends one JSON line on the most recent client and records the reply.
    pub fn request(&mut self, line: &str) {
        let client = self.clients.last_mut().expect("no client connected");
        let reply = client.request(line);
        self.replies.push(reply);
    }

    /// The most recent reply.
    #[must_use]
    pub fn last_reply(&self) -> &Value {
        self.replies.last().expect("no reply received")
    }

    /// Returns true when the most recent client observes end of stream.
    pub fn last_client_closed(&mut self) -> bool {
        self.clients
            .last_mut()
            .is_some_and(TestClient::is_closed_by_peer)
    }

    fn reset_results(&mut self) {
        self.clients.clear();
        self.replies.clear();
        self.server = None;
        self.server_error = None;
        self.daemon = None;
        self.bootstrap_error = None;
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
