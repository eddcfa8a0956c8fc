//! Shared handle between the ingest thread and the rest of the process.
//!
//! The ingest loop is the only writer of the connection flag, the peer address
//! and the counters; the UI only reads them through [`IngestController::status`].
//! The stop flag goes the other way: written once by the shutdown path and
//! polled by the ingest loop.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::ingest::ConnectionState;

/// Point-in-time view of the ingest side, for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestStatus {
    pub state: ConnectionState,
    pub peer: Option<SocketAddr>,
    pub local_addr: Option<SocketAddr>,
    /// Records accepted by the parser.
    pub records: u64,
    pub parse_errors: u64,
    /// Records dropped unread because the queue was full.
    pub evicted: u64,
    pub log_errors: u64,
    pub connections: u64,
    /// Set when the ingest loop stopped for good (e.g. the port could not be bound).
    pub fatal: Option<String>,
}

#[derive(Clone, Default)]
pub struct IngestController {
    pub(crate) inner: Arc<IngestCtrlInner>,
}

#[derive(Default)]
pub(crate) struct IngestCtrlInner {
    pub(crate) stop: AtomicBool,
    pub(crate) connected: AtomicBool,
    pub(crate) records: AtomicU64,
    pub(crate) parse_errors: AtomicU64,
    pub(crate) evicted: AtomicU64,
    pub(crate) log_errors: AtomicU64,
    pub(crate) connections: AtomicU64,
    pub(crate) peer: Mutex<Option<SocketAddr>>,
    pub(crate) local_addr: Mutex<Option<SocketAddr>>,
    pub(crate) fatal: Mutex<Option<String>>,
}

impl IngestController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the ingest loop to exit at its next poll.
    pub fn request_stop(&self) {
        self.inner.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.inner.stop.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Relaxed)
    }

    /// Address the listener is bound to, once bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self
            .inner
            .local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> IngestStatus {
        let inner = &self.inner;
        IngestStatus {
            state: if inner.connected.load(Ordering::Relaxed) {
                ConnectionState::Connected
            } else {
                ConnectionState::Listening
            },
            peer: *inner.peer.lock().unwrap_or_else(PoisonError::into_inner),
            local_addr: self.local_addr(),
            records: inner.records.load(Ordering::Relaxed),
            parse_errors: inner.parse_errors.load(Ordering::Relaxed),
            evicted: inner.evicted.load(Ordering::Relaxed),
            log_errors: inner.log_errors.load(Ordering::Relaxed),
            connections: inner.connections.load(Ordering::Relaxed),
            fatal: inner
                .fatal
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    // ── Writer side (ingest loop only) ───────────────────────────────────────

    pub(crate) fn set_local_addr(&self, addr: SocketAddr) {
        *self
            .inner
            .local_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(addr);
    }

    pub(crate) fn set_connected(&self, peer: Option<SocketAddr>) {
        if peer.is_some() {
            self.inner.connections.fetch_add(1, Ordering::Relaxed);
        }
        *self.inner.peer.lock().unwrap_or_else(PoisonError::into_inner) = peer;
        self.inner.connected.store(peer.is_some(), Ordering::Relaxed);
    }

    pub(crate) fn set_fatal(&self, msg: String) {
        *self
            .inner
            .fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(msg);
    }

    pub(crate) fn count(&self, counter: Counter) {
        let c = match counter {
            Counter::Record => &self.inner.records,
            Counter::ParseError => &self.inner.parse_errors,
            Counter::Evicted => &self.inner.evicted,
            Counter::LogError => &self.inner.log_errors,
        };
        c.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Counter {
    Record,
    ParseError,
    Evicted,
    LogError,
}
