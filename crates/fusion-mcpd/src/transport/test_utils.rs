//! Test helpers for the transport module.

use std::io::Read;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use super::{ConnectionHandler, ConnectionStream};

/// Counts accepted connections and closes them immediately.
pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: ConnectionStream) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counts connections and keeps each open until the peer or listener closes it.
pub(crate) struct HoldingHandler {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl HoldingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<Self>) {
        let opened = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            opened: Arc::clone(&opened),
            closed: Arc::clone(&closed),
        });
        (opened, closed, handler)
    }
}

impl ConnectionHandler for HoldingHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let mut chunk = [0_u8; 64];
        while matches!(stream.read(&mut chunk), Ok(read) if read > 0) {}
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
