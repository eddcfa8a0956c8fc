use std::fs;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use breathplot::config::MonitorConfig;
use breathplot::controllers::IngestController;
use breathplot::data::queue::SampleQueue;
use breathplot::error::IngestError;
use breathplot::ingest::{
    spawn_ingest, ConnectionState, IngestHandle, IngestLoop, LineFramer,
};
use breathplot::persistence::CsvLog;

const TIMEOUT: Duration = Duration::from_secs(5);

fn test_config(log_path: &Path, port: u16) -> MonitorConfig {
    let mut cfg = MonitorConfig::default();
    cfg.listen.host = "127.0.0.1".to_string();
    cfg.listen.port = port;
    cfg.listen.poll_timeout_ms = 20;
    cfg.log.path = log_path.to_path_buf();
    cfg
}

fn wait_until<F: FnMut() -> bool>(mut cond: F) -> bool {
    let start = Instant::now();
    while start.elapsed() < TIMEOUT {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

fn start(cfg: &MonitorConfig, capacity: usize) -> (IngestHandle, Arc<SampleQueue>, SocketAddr) {
    let queue = Arc::new(SampleQueue::new(capacity));
    let ctrl = IngestController::new();
    let handle = spawn_ingest(cfg, Arc::clone(&queue), ctrl.clone()).unwrap();
    assert!(wait_until(|| ctrl.local_addr().is_some()), "listener never bound");
    let addr = ctrl.local_addr().unwrap();
    (handle, queue, addr)
}

#[test]
fn framer_splits_and_reassembles_lines() {
    let mut framer = LineFramer::new(64);
    assert_eq!(framer.push(b"1,100,36\r\n2,101"), vec!["1,100,36"]);
    assert_eq!(framer.pending(), 5);
    assert_eq!(framer.push(b",37\n\n   \n3,"), vec!["2,101,37"]);
    assert_eq!(framer.finish(), Some("3,".to_string()));
    assert_eq!(framer.finish(), None);
}

#[test]
fn framer_caps_pending_bytes() {
    let mut framer = LineFramer::new(4096);
    let chunk = vec![b'1'; 4096];
    for _ in 0..10 {
        assert!(framer.push(&chunk).is_empty());
        assert!(framer.pending() <= 4096);
    }
    assert_eq!(framer.take_overflows(), 5);
    assert_eq!(framer.take_overflows(), 0);
    assert_eq!(framer.push(b"\n5,1,2\n"), vec!["5,1,2"]);
}

#[test]
fn sequential_clients_share_log_and_clock() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("session.csv");
    let cfg = test_config(&log_path, 0);
    let (handle, queue, addr) = start(&cfg, 100);

    {
        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"5,101.3,36.6\n").unwrap();
        assert!(wait_until(|| queue.len() == 1));
    }
    assert!(wait_until(|| handle.controller().status().state == ConnectionState::Listening));
    thread::sleep(Duration::from_millis(50));
    {
        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"6,101.5,36.7,0.25,PEAK\n").unwrap();
        assert!(wait_until(|| queue.len() == 2));
    }

    let first = queue.pop().unwrap();
    let second = queue.pop().unwrap();
    assert_eq!(first.relative_time_s, 0.0);
    assert_eq!((first.pressure_kpa, first.temperature_c), (101.3, 36.6));
    assert!(second.relative_time_s >= 0.05, "clock must survive reconnects");
    assert_eq!(second.valve_opening, Some(0.25));

    assert!(wait_until(|| handle.controller().status().records == 2));
    assert_eq!(handle.controller().status().connections, 2);
    handle.shutdown(TIMEOUT).unwrap();

    let text = fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("timestamp,"));
    assert!(lines[1].ends_with(",5,101.3,36.6"));
    assert!(lines[2].ends_with(",6,101.5,36.7,0.25,PEAK"));
    assert_eq!(lines.iter().filter(|l| l.starts_with("timestamp,")).count(), 1);
}

#[test]
fn several_records_in_one_write_and_split_records() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config(&dir.path().join("log.csv"), 0);
    // Long enough that the pause between the two writes is not a quiet link.
    cfg.listen.poll_timeout_ms = 1000;
    let (handle, queue, addr) = start(&cfg, 100);

    let mut client = TcpStream::connect(addr).unwrap();
    client.write_all(b"1,100,36\n2,101,36.5\n3,10").unwrap();
    client.flush().unwrap();
    thread::sleep(Duration::from_millis(50));
    client.write_all(b"2,37\n").unwrap();
    assert!(wait_until(|| queue.len() == 3));

    let pressures: Vec<f64> = queue.drain_batch(10).iter().map(|r| r.pressure_kpa).collect();
    assert_eq!(pressures, vec![100.0, 101.0, 102.0]);
    drop(client);
    handle.shutdown(TIMEOUT).unwrap();
}

#[test]
fn malformed_lines_are_dropped_and_loop_continues() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("log.csv");
    let cfg = test_config(&log_path, 0);
    let (handle, queue, addr) = start(&cfg, 100);

    let mut client = TcpStream::connect(addr).unwrap();
    client
        .write_all(b"hello\n1,abc,36\n1,2\n7,99.9,21.0\n")
        .unwrap();
    assert!(wait_until(|| handle.controller().status().records == 1));
    assert_eq!(handle.controller().status().parse_errors, 3);
    assert_eq!(queue.pop().unwrap().pressure_kpa, 99.9);

    drop(client);
    handle.shutdown(TIMEOUT).unwrap();
    // Header plus the single accepted row.
    assert_eq!(fs::read_to_string(&log_path).unwrap().lines().count(), 2);
}

#[test]
fn trailing_record_without_newline_is_kept_on_close() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir.path().join("log.csv"), 0);
    let (handle, queue, addr) = start(&cfg, 100);

    {
        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"9,88.8,30.0").unwrap();
    }
    assert!(wait_until(|| queue.len() == 1));
    assert_eq!(queue.pop().unwrap().temperature_c, 30.0);
    handle.shutdown(TIMEOUT).unwrap();
}

#[test]
fn full_queue_counts_evictions() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir.path().join("log.csv"), 0);
    let (handle, queue, addr) = start(&cfg, 3);

    let mut client = TcpStream::connect(addr).unwrap();
    let payload: String = (1..=5).map(|i| format!("{i},{i}.0,36.0\n")).collect();
    client.write_all(payload.as_bytes()).unwrap();
    assert!(wait_until(|| handle.controller().status().records == 5));

    assert_eq!(handle.controller().status().evicted, 2);
    let pressures: Vec<f64> = queue.drain_batch(10).iter().map(|r| r.pressure_kpa).collect();
    assert_eq!(pressures, vec![3.0, 4.0, 5.0]);
    drop(client);
    handle.shutdown(TIMEOUT).unwrap();
}

#[test]
fn shutdown_while_client_is_connected() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir.path().join("log.csv"), 0);
    let (handle, _queue, addr) = start(&cfg, 10);

    let _client = TcpStream::connect(addr).unwrap();
    assert!(wait_until(|| handle.controller().is_connected()));

    let started = Instant::now();
    handle.shutdown(Duration::from_secs(2)).unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn bind_to_port_in_use_is_fatal() {
    let blocker = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = blocker.local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir.path().join("log.csv"), port);

    let queue = Arc::new(SampleQueue::new(10));
    let ctrl = IngestController::new();
    let mut handle = spawn_ingest(&cfg, Arc::clone(&queue), ctrl.clone()).unwrap();

    // The thread ends on its own, without a stop request and without retrying.
    let result = handle.join_timeout(TIMEOUT);
    assert!(matches!(result, Err(IngestError::Bind { .. })), "{result:?}");
    assert!(handle.is_finished());
    assert!(!ctrl.stop_requested());
    assert!(ctrl.status().fatal.is_some());

    // The rest of the process keeps working.
    queue.push(breathplot::SensorRecord {
        relative_time_s: 0.0,
        pressure_kpa: 1.0,
        temperature_c: 2.0,
        valve_opening: None,
        state: None,
    });
    assert_eq!(queue.len(), 1);
    // The log is never created when the bind fails.
    assert!(!dir.path().join("log.csv").exists());
}

#[test]
fn bind_reports_address_and_opens_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("log.csv");
    let cfg = test_config(&log_path, 0);
    let ctrl = IngestController::new();
    let ingest = IngestLoop::bind(&cfg, Arc::new(SampleQueue::new(4)), ctrl.clone()).unwrap();

    assert_ne!(ingest.local_addr().port(), 0);
    assert_eq!(ctrl.local_addr(), Some(ingest.local_addr()));
    assert!(ingest.parser().clock().start().is_none());
    assert!(log_path.exists());

    let err = IngestLoop::bind(
        &test_config(&log_path, ingest.local_addr().port()),
        Arc::new(SampleQueue::new(4)),
        IngestController::new(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, IngestError::Bind { .. }));
}

#[test]
fn unterminated_records_arrive_while_connected() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("log.csv");
    let cfg = test_config(&log_path, 0);
    let (handle, queue, addr) = start(&cfg, 100);

    let mut client = TcpStream::connect(addr).unwrap();
    client.write_all(b"5,101.3,36.6").unwrap();
    assert!(wait_until(|| queue.len() == 1));
    client.write_all(b"6,101.4,36.7").unwrap();
    assert!(wait_until(|| queue.len() == 2));

    let records = queue.drain_batch(10);
    assert_eq!(
        records
            .iter()
            .map(|r| (r.pressure_kpa, r.temperature_c))
            .collect::<Vec<_>>(),
        vec![(101.3, 36.6), (101.4, 36.7)]
    );
    assert_eq!(handle.controller().status().parse_errors, 0);
    drop(client);
    handle.shutdown(TIMEOUT).unwrap();

    let text = fs::read_to_string(&log_path).unwrap();
    let rows: Vec<&str> = text.lines().skip(1).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].ends_with(",5,101.3,36.6"));
    assert!(rows[1].ends_with(",6,101.4,36.7"));
}

#[test]
fn oversized_partial_line_is_dropped_as_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config(&dir.path().join("log.csv"), 0);
    cfg.listen.recv_buffer_size = 16;
    cfg.listen.poll_timeout_ms = 500;
    let (handle, queue, addr) = start(&cfg, 100);

    let mut payload = vec![b'1'; 100];
    payload.extend_from_slice(b"\n7,99.9,21.0\n");
    let mut client = TcpStream::connect(addr).unwrap();
    client.write_all(&payload).unwrap();

    assert!(wait_until(|| handle.controller().status().records == 1));
    assert!(handle.controller().status().parse_errors >= 1);
    assert_eq!(queue.pop().unwrap().pressure_kpa, 99.9);
    drop(client);
    handle.shutdown(TIMEOUT).unwrap();
}

/// Sink that rejects every write, like a full disk.
struct FailingSink;

impl Write for FailingSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn failed_log_write_still_queues_record() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir.path().join("unused.csv"), 0);
    let queue = Arc::new(SampleQueue::new(10));
    let ctrl = IngestController::new();
    let log = CsvLog::from_writer("full-disk.csv", FailingSink, false).unwrap();
    let mut ingest = IngestLoop::with_log(&cfg, log, Arc::clone(&queue), ctrl.clone()).unwrap();
    let addr = ingest.local_addr();
    let worker = thread::spawn(move || ingest.run());

    let mut client = TcpStream::connect(addr).unwrap();
    client.write_all(b"5,101.3,36.6\n").unwrap();
    assert!(wait_until(|| ctrl.status().records == 1));

    let status = ctrl.status();
    assert_eq!(status.log_errors, 1);
    assert_eq!(status.parse_errors, 0);
    assert_eq!(queue.pop().unwrap().pressure_kpa, 101.3);

    drop(client);
    ctrl.request_stop();
    worker.join().unwrap();
}
