//! TCP ingest loop: accept one sensor connection at a time and feed its records
//! to the CSV log and the render queue.
//!
//! The loop lives on its own thread. Every blocking call is bounded by the
//! configured poll timeout so the stop flag in [`IngestController`] is seen
//! promptly; there is no other way to interrupt it.
//!
//! ```text
//! Listening --accept--> Connected --EOF / socket error--> Listening
//!     \                     |
//!      \------ stop --------+--> (thread exits)
//! ```

use std::fs::File;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::config::{ListenConfig, MonitorConfig};
use crate::controllers::{Counter, IngestController};
use crate::data::parser::RecordParser;
use crate::data::queue::SampleQueue;
use crate::error::IngestError;
use crate::persistence::CsvLog;

/// Pause after an unexpected error in the accept loop.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Listening,
    Connected,
}

// ─────────────────────────────────────────────────────────────────────────────
// Line framing
// ─────────────────────────────────────────────────────────────────────────────

/// Splits a byte stream into newline-terminated lines.
///
/// Bytes after the last newline are carried over to the next [`push`](Self::push),
/// so a record split across two reads is reassembled, and several records in
/// one read come out separately. Returned lines are trimmed and never empty.
///
/// The carry never holds more than `max_pending` bytes between pushes. A longer
/// run without a newline is discarded and counted in [`take_overflows`](Self::take_overflows).
#[derive(Debug)]
pub struct LineFramer {
    carry: Vec<u8>,
    max_pending: usize,
    overflows: u64,
}

impl LineFramer {
    pub fn new(max_pending: usize) -> Self {
        Self {
            carry: Vec::with_capacity(max_pending),
            max_pending: max_pending.max(1),
            overflows: 0,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);
        let lines = match self.carry.iter().rposition(|&b| b == b'\n') {
            Some(last_nl) => {
                let rest = self.carry.split_off(last_nl + 1);
                let complete = std::mem::replace(&mut self.carry, rest);
                complete
                    .split(|&b| b == b'\n')
                    .filter_map(decode_line)
                    .collect()
            }
            None => Vec::new(),
        };
        if self.carry.len() > self.max_pending {
            self.carry.clear();
            self.overflows += 1;
        }
        lines
    }

    /// Take whatever is left without a terminating newline, e.g. when the peer
    /// closes or goes quiet.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.carry);
        decode_line(&rest)
    }

    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// Number of oversized partial lines discarded since the last call.
    pub fn take_overflows(&mut self) -> u64 {
        std::mem::take(&mut self.overflows)
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(bytes);
    let line = line.trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// IngestLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the listening socket, the parser (and its session clock) and the log.
///
/// Reconnects do not recreate the loop, so the session clock and the log
/// handle survive across clients.
pub struct IngestLoop<W: Write = File> {
    listener: TcpListener,
    local_addr: SocketAddr,
    listen: ListenConfig,
    parser: RecordParser,
    log: CsvLog<W>,
    queue: Arc<SampleQueue>,
    ctrl: IngestController,
}

impl IngestLoop<File> {
    /// Bind the listener and open the log. Either failure is fatal to ingest.
    pub fn bind(
        config: &MonitorConfig,
        queue: Arc<SampleQueue>,
        ctrl: IngestController,
    ) -> Result<Self, IngestError> {
        let (listener, local_addr) = bind_listener(&config.listen, &ctrl)?;
        let log = CsvLog::open(&config.log.path)?;
        Ok(Self::assemble(config, listener, local_addr, log, queue, ctrl))
    }
}

impl<W: Write> IngestLoop<W> {
    /// Bind the listener and write accepted records to an already open `log`.
    pub fn with_log(
        config: &MonitorConfig,
        log: CsvLog<W>,
        queue: Arc<SampleQueue>,
        ctrl: IngestController,
    ) -> Result<Self, IngestError> {
        let (listener, local_addr) = bind_listener(&config.listen, &ctrl)?;
        Ok(Self::assemble(config, listener, local_addr, log, queue, ctrl))
    }

    fn assemble(
        config: &MonitorConfig,
        listener: TcpListener,
        local_addr: SocketAddr,
        log: CsvLog<W>,
        queue: Arc<SampleQueue>,
        ctrl: IngestController,
    ) -> Self {
        Self {
            listener,
            local_addr,
            listen: config.listen.clone(),
            parser: RecordParser::new(),
            log,
            queue,
            ctrl,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn parser(&self) -> &RecordParser {
        &self.parser
    }

    /// Accept and serve clients until stop is requested.
    pub fn run(&mut self) {
        let poll = self.listen.poll_timeout();
        while !self.ctrl.stop_requested() {
            match self.listener.accept() {
                Ok((stream, peer)) => self.serve(stream, peer),
                Err(e) if is_poll_timeout(&e) => thread::sleep(poll),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    error!(error = %e, "accept failed");
                    self.pause(ERROR_BACKOFF);
                }
            }
        }
        info!("ingest loop stopped");
    }

    fn serve(&mut self, mut stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = configure_stream(&stream, self.listen.poll_timeout()) {
            error!(%peer, error = %e, "failed to configure client socket");
            self.pause(ERROR_BACKOFF);
            return;
        }
        self.ctrl.set_connected(Some(peer));
        info!(%peer, "sensor connected");

        let mut framer = LineFramer::new(self.listen.recv_buffer_size);
        let mut buf = vec![0u8; self.listen.recv_buffer_size];
        let reason = loop {
            if self.ctrl.stop_requested() {
                break "shutdown";
            }
            match stream.read(&mut buf) {
                Ok(0) => break "closed by peer",
                Ok(n) => {
                    for line in framer.push(&buf[..n]) {
                        self.handle_line(&line);
                    }
                    let overflows = framer.take_overflows();
                    if overflows > 0 {
                        warn!(
                            %peer,
                            limit = self.listen.recv_buffer_size,
                            "dropping oversized partial line"
                        );
                        for _ in 0..overflows {
                            self.ctrl.count(Counter::ParseError);
                        }
                    }
                }
                // A quiet link ends an unterminated record.
                Err(e) if is_poll_timeout(&e) => {
                    if let Some(line) = framer.finish() {
                        self.handle_line(&line);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(%peer, error = %e, "receive failed");
                    break "receive error";
                }
            }
        };
        if let Some(line) = framer.finish() {
            self.handle_line(&line);
        }

        let _ = stream.shutdown(Shutdown::Both);
        self.ctrl.set_connected(None);
        info!(%peer, reason, "connection closed, listening again");
    }

    /// Parse one line, then log it and queue it for display.
    fn handle_line(&mut self, line: &str) {
        let parsed = match self.parser.parse(line, Local::now()) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, line, "dropping malformed line");
                self.ctrl.count(Counter::ParseError);
                return;
            }
        };

        if let Err(e) = self.log.append(parsed.arrival, &parsed.fields) {
            error!(error = %e, path = %self.log.path().display(), "failed to write log row");
            self.ctrl.count(Counter::LogError);
        }

        let record = parsed.record;
        if self.queue.push(record).is_some() {
            self.ctrl.count(Counter::Evicted);
        }
        self.ctrl.count(Counter::Record);
        debug!(
            pressure_kpa = record.pressure_kpa,
            temperature_c = record.temperature_c,
            relative_time_s = record.relative_time_s,
            "record received"
        );
    }

    /// Sleep for `total`, waking early if stop is requested.
    fn pause(&self, total: Duration) {
        let step = self.listen.poll_timeout();
        let start = Instant::now();
        while !self.ctrl.stop_requested() && start.elapsed() < total {
            thread::sleep(step.min(total));
        }
    }
}

fn bind_listener(
    listen: &ListenConfig,
    ctrl: &IngestController,
) -> Result<(TcpListener, SocketAddr), IngestError> {
    let addr = listen.bind_addr();
    let listener = TcpListener::bind(&addr).map_err(|source| IngestError::Bind {
        addr: addr.clone(),
        source,
    })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| IngestError::Bind { addr, source })?;
    listener
        .set_nonblocking(true)
        .map_err(|source| IngestError::Listener {
            addr: local_addr,
            source,
        })?;
    ctrl.set_local_addr(local_addr);
    info!(addr = %local_addr, "listening for sensor connections");
    Ok((listener, local_addr))
}

fn configure_stream(stream: &TcpStream, timeout: Duration) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(timeout))
}

fn is_poll_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Background thread
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to the ingest thread.
///
/// Dropping the handle requests a stop but does not wait; use
/// [`shutdown`](Self::shutdown) for a bounded join.
pub struct IngestHandle {
    join: Option<JoinHandle<Result<(), IngestError>>>,
    done: Receiver<()>,
    ctrl: IngestController,
}

/// Start the ingest loop on a background thread.
///
/// Binding happens on that thread: a bind failure ends only the ingest side
/// and is reported through [`IngestController::status`] and the join result.
pub fn spawn_ingest(
    config: &MonitorConfig,
    queue: Arc<SampleQueue>,
    ctrl: IngestController,
) -> Result<IngestHandle, IngestError> {
    let (done_tx, done_rx) = mpsc::channel();
    let config = config.clone();
    let thread_ctrl = ctrl.clone();
    let join = thread::Builder::new()
        .name("ingest".to_string())
        .spawn(move || {
            let result = IngestLoop::bind(&config, queue, thread_ctrl.clone()).map(|mut ingest| {
                ingest.run();
            });
            if let Err(e) = &result {
                error!(error = %e, "ingest loop terminated, no longer receiving data");
                thread_ctrl.set_fatal(e.to_string());
            }
            let _ = done_tx.send(());
            result
        })
        .map_err(IngestError::Spawn)?;

    Ok(IngestHandle {
        join: Some(join),
        done: done_rx,
        ctrl,
    })
}

impl IngestHandle {
    pub fn controller(&self) -> &IngestController {
        &self.ctrl
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }

    /// Request a stop and wait up to `timeout` for the thread to exit.
    pub fn shutdown(mut self, timeout: Duration) -> Result<(), IngestError> {
        self.ctrl.request_stop();
        self.join_timeout(timeout)
    }

    /// Wait up to `timeout` for the thread to exit on its own and return its result.
    pub fn join_timeout(&mut self, timeout: Duration) -> Result<(), IngestError> {
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                warn!(?timeout, "ingest thread did not stop in time, detaching");
                return Err(IngestError::ShutdownTimeout(timeout));
            }
        }
        match self.join.take() {
            Some(join) => join.join().map_err(|_| IngestError::Panicked)?,
            None => Ok(()),
        }
    }
}

impl Drop for IngestHandle {
    fn drop(&mut self) {
        self.ctrl.request_stop();
    }
}
