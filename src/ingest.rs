//! ==============================================================================
//! ingest.rs - serial ingest task
//! ==============================================================================
//!
//! purpose:
//!     turns the microcontroller's text stream into published readings.
//!     the device sends three line shapes, in any order:
//!
//!         Condition:<text>
//!         Latitude:<decimal>
//!         Longitude:<decimal>
//!
//!     every Longitude line closes a record and publishes it.
//!
//! relationships:
//!     - used by: main.rs (spawned on a blocking thread)
//!     - uses: store.rs (persists each published record)
//!     - feeds: the refresh loop through a tokio watch channel
//!
//! failure model:
//!     - port cannot be opened  -> logged, task ends, dashboard never updates
//!     - read error mid-stream  -> logged, short pause, loop continues
//!     - read timeout           -> not an error, keep waiting
//!
//! ==============================================================================

use crate::config::{EmptyConditionPolicy, SerialConfig};
use crate::domain::LatestReading;
use crate::store::RecordStore;

use anyhow::{Context, Result};
use serialport::SerialPort;
use std::io::{BufRead, ErrorKind};
use std::time::Duration;
use tokio::sync::watch;

const CONDITION_PREFIX: &str = "Condition:";
const LATITUDE_PREFIX: &str = "Latitude:";
const LONGITUDE_PREFIX: &str = "Longitude:";

/// one classified line from the device
#[derive(Debug, PartialEq, Eq)]
pub enum SerialLine<'a> {
    Condition(&'a str),
    Latitude(&'a str),
    Longitude(&'a str),
    Other,
}

/// classify a raw line; prefixes are case sensitive and values are trimmed
pub fn classify(line: &str) -> SerialLine<'_> {
    let line = line.trim();
    if let Some(value) = line.strip_prefix(CONDITION_PREFIX) {
        SerialLine::Condition(value.trim())
    } else if let Some(value) = line.strip_prefix(LATITUDE_PREFIX) {
        SerialLine::Latitude(value.trim())
    } else if let Some(value) = line.strip_prefix(LONGITUDE_PREFIX) {
        SerialLine::Longitude(value.trim())
    } else {
        SerialLine::Other
    }
}

/// best-effort decode, invalid utf-8 sequences are dropped
pub fn decode_line(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

// ==============================================================================
// ingest state - owned by the reader thread only
// ==============================================================================

#[derive(Debug, Default)]
pub struct IngestState {
    current: LatestReading,
    policy: EmptyConditionPolicy,
}

impl IngestState {
    pub fn new(policy: EmptyConditionPolicy) -> Self {
        Self { current: LatestReading::empty(), policy }
    }

    /// apply one line, returning the record to publish if the line closes one
    ///
    /// the in-memory fields are never reset: a Longitude line published as
    /// empty under `Clear` still leaves lat/lon in place for the next record.
    pub fn handle_line(&mut self, line: &str) -> Option<LatestReading> {
        match classify(line) {
            SerialLine::Condition(value) => {
                self.current.condition = value.to_string();
                None
            }
            SerialLine::Latitude(value) => {
                self.current.lat = value.to_string();
                None
            }
            SerialLine::Longitude(value) => {
                self.current.lon = value.to_string();
                if !self.current.condition.is_empty() {
                    return Some(self.current.clone());
                }
                match self.policy {
                    EmptyConditionPolicy::Clear => Some(LatestReading::empty()),
                    EmptyConditionPolicy::KeepCoordinates => Some(self.current.clone()),
                }
            }
            SerialLine::Other => None,
        }
    }
}

// ==============================================================================
// sinks - where closed records go
// ==============================================================================

pub trait ReadingSink {
    fn publish(&mut self, reading: &LatestReading) -> Result<()>;
}

/// writes every record to the record file and hands it to the dashboard
pub struct RecordPublisher {
    store: RecordStore,
    tx: watch::Sender<LatestReading>,
}

impl RecordPublisher {
    pub fn new(store: RecordStore, tx: watch::Sender<LatestReading>) -> Self {
        Self { store, tx }
    }
}

impl ReadingSink for RecordPublisher {
    fn publish(&mut self, reading: &LatestReading) -> Result<()> {
        // the channel first: the dashboard should not wait on a slow disk
        self.tx.send_replace(reading.clone());
        self.store.save(reading)
    }
}

// ==============================================================================
// reader loop
// ==============================================================================

/// open the configured serial port (8N1)
pub fn open_port(config: &SerialConfig) -> Result<Box<dyn SerialPort>> {
    serialport::new(&config.port, config.baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .stop_bits(serialport::StopBits::One)
        .parity(serialport::Parity::None)
        .timeout(config.read_timeout())
        .open()
        .with_context(|| format!("could not open serial port {}", config.port))
}

/// read lines until the stream ends
///
/// with a real device the stream never ends, so this runs for the process
/// lifetime. `echo` logs every line at info instead of debug.
pub fn run<R, S>(mut reader: R, state: &mut IngestState, sink: &mut S, retry_pause: Duration, echo: bool)
where
    R: BufRead,
    S: ReadingSink,
{
    let mut buf = Vec::new();

    loop {
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                if !buf.is_empty() {
                    process_line(&buf, state, sink, echo);
                }
                tracing::warn!("[SERIAL] Stream closed, ingest stopped");
                return;
            }
            Ok(_) => {
                process_line(&buf, state, sink, echo);
                buf.clear();
            }
            // partial bytes stay in buf, the next read continues the line
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
            Err(e) => {
                tracing::warn!("[SERIAL] ⚠ Read error: {}", e);
                buf.clear();
                std::thread::sleep(retry_pause);
            }
        }
    }
}

fn process_line<S: ReadingSink>(bytes: &[u8], state: &mut IngestState, sink: &mut S, echo: bool) {
    let line = decode_line(bytes);
    let line = line.trim();

    if echo {
        tracing::info!("[SERIAL] {}", line);
    } else {
        tracing::debug!("[SERIAL] {}", line);
    }

    if let Some(reading) = state.handle_line(line) {
        if let Err(e) = sink.publish(&reading) {
            tracing::warn!("[SERIAL] ⚠ Failed to publish reading: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[derive(Default)]
    struct VecSink(Vec<LatestReading>);

    impl ReadingSink for VecSink {
        fn publish(&mut self, reading: &LatestReading) -> Result<()> {
            self.0.push(reading.clone());
            Ok(())
        }
    }

    fn reading(condition: &str, lat: &str, lon: &str) -> LatestReading {
        LatestReading { condition: condition.into(), lat: lat.into(), lon: lon.into() }
    }

    fn ingest(input: &[u8], policy: EmptyConditionPolicy) -> Vec<LatestReading> {
        let mut state = IngestState::new(policy);
        let mut sink = VecSink::default();
        run(Cursor::new(input.to_vec()), &mut state, &mut sink, Duration::ZERO, false);
        sink.0
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("Condition: ALERT"), SerialLine::Condition("ALERT"));
        assert_eq!(classify("  Latitude:12.5 \r"), SerialLine::Latitude("12.5"));
        assert_eq!(classify("Longitude:  77.5"), SerialLine::Longitude("77.5"));
        assert_eq!(classify("condition: lower"), SerialLine::Other);
        assert_eq!(classify("GPS fix acquired"), SerialLine::Other);
        assert_eq!(classify(""), SerialLine::Other);
    }

    #[test]
    fn test_only_leading_label_is_stripped() {
        assert_eq!(classify("Condition:Condition:x"), SerialLine::Condition("Condition:x"));
        assert_eq!(classify("Latitude: Latitude:1"), SerialLine::Latitude("Latitude:1"));
    }

    #[test]
    fn test_full_record_is_trimmed() {
        let out = ingest(
            b"Condition:  ALERT-tilt \r\nLatitude: 12.5 \r\nLongitude:\t77.5\r\n",
            EmptyConditionPolicy::Clear,
        );
        assert_eq!(out, vec![reading("ALERT-tilt", "12.5", "77.5")]);
    }

    #[test]
    fn test_empty_condition_clears_record() {
        let out = ingest(b"Latitude:12.5\nLongitude:77.5\n", EmptyConditionPolicy::Clear);
        assert_eq!(out, vec![LatestReading::empty()]);

        let out = ingest(b"Condition:\nLatitude:1\nLongitude:2\n", EmptyConditionPolicy::Clear);
        assert_eq!(out, vec![LatestReading::empty()]);
    }

    #[test]
    fn test_keep_coordinates_policy() {
        let out = ingest(b"Latitude:12.5\nLongitude:77.5\n", EmptyConditionPolicy::KeepCoordinates);
        assert_eq!(out, vec![reading("", "12.5", "77.5")]);
    }

    #[test]
    fn test_unrecognised_lines_never_publish() {
        let out = ingest(b"hello\nCONDITION:x\nlatitude:1\n\n", EmptyConditionPolicy::Clear);
        assert!(out.is_empty());
    }

    #[test]
    fn test_every_longitude_publishes() {
        let out = ingest(
            b"Condition:tilt\nLatitude:1\nLongitude:2\nLongitude:2\nLatitude:3\nLongitude:4\n",
            EmptyConditionPolicy::Clear,
        );
        assert_eq!(
            out,
            vec![reading("tilt", "1", "2"), reading("tilt", "1", "2"), reading("tilt", "3", "4")]
        );
    }

    #[test]
    fn test_state_survives_cleared_publish() {
        let mut state = IngestState::new(EmptyConditionPolicy::Clear);
        state.handle_line("Latitude:1");
        assert_eq!(state.handle_line("Longitude:2"), Some(LatestReading::empty()));
        assert_eq!(state.current, reading("", "1", "2"));

        // a later condition reuses the coordinates still held in memory
        assert_eq!(state.handle_line("Condition:height"), None);
        assert_eq!(state.handle_line("Longitude:3"), Some(reading("height", "1", "3")));
    }

    #[test]
    fn test_invalid_utf8_is_dropped() {
        assert_eq!(decode_line(b"Cond\xffition:ok"), "Condition:ok");
        let out = ingest(b"Condition:al\xfe\xffert\nLatitude:1\nLongitude:2\n", EmptyConditionPolicy::Clear);
        assert_eq!(out, vec![reading("alert", "1", "2")]);
    }

    #[test]
    fn test_last_line_without_newline() {
        let out = ingest(b"Condition:tilt\nLatitude:1\nLongitude:2", EmptyConditionPolicy::Clear);
        assert_eq!(out, vec![reading("tilt", "1", "2")]);
    }

    /// reader that fails or times out between chunks of a scripted stream
    struct FlakyReader {
        steps: Vec<std::io::Result<Vec<u8>>>,
    }

    impl Read for FlakyReader {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            if self.steps.is_empty() {
                return Ok(0);
            }
            match self.steps.remove(0) {
                Ok(bytes) => {
                    out[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Err(e) => Err(e),
            }
        }
    }

    #[test]
    fn test_timeouts_keep_partial_line() {
        let reader = FlakyReader {
            steps: vec![
                Ok(b"Condition:ti".to_vec()),
                Err(ErrorKind::TimedOut.into()),
                Ok(b"lt\nLatitude:1\nLongitude:2\n".to_vec()),
            ],
        };
        let mut state = IngestState::new(EmptyConditionPolicy::Clear);
        let mut sink = VecSink::default();
        run(std::io::BufReader::new(reader), &mut state, &mut sink, Duration::ZERO, false);
        assert_eq!(sink.0, vec![reading("tilt", "1", "2")]);
    }

    #[test]
    fn test_read_errors_do_not_stop_loop() {
        let reader = FlakyReader {
            steps: vec![
                Ok(b"Condition:tilt\nLatit".to_vec()),
                Err(std::io::Error::new(ErrorKind::Other, "device hiccup")),
                Ok(b"Latitude:1\nLongitude:2\n".to_vec()),
            ],
        };
        let mut state = IngestState::new(EmptyConditionPolicy::Clear);
        let mut sink = VecSink::default();
        run(std::io::BufReader::new(reader), &mut state, &mut sink, Duration::ZERO, false);
        assert_eq!(sink.0, vec![reading("tilt", "1", "2")]);
    }

    #[test]
    fn test_publisher_writes_file_and_channel() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("coordinates.json"));
        let (tx, rx) = watch::channel(LatestReading::empty());
        let mut publisher = RecordPublisher::new(store.clone(), tx);

        publisher.publish(&reading("tilt", "1", "2")).unwrap();
        assert_eq!(*rx.borrow(), reading("tilt", "1", "2"));
        assert_eq!(store.load(), reading("tilt", "1", "2"));
    }

    #[test]
    fn test_open_missing_port_fails() {
        let config = SerialConfig { port: "/dev/does-not-exist-gps".into(), ..Default::default() };
        assert!(open_port(&config).is_err());
    }
}
