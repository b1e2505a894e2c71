//! Per-request access log.
//!
//! # Responsibilities
//! - Serialize one JSON record per completed request
//! - Append it to a dedicated sink with a single write
//!
//! # Design Decisions
//! - The sink is behind a mutex so concurrent records never interleave
//! - Write failures are traced and dropped, never surfaced to the request

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Fields recorded for every handled request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRecord {
    pub uuid: String,
    pub remote_addr: String,
    pub method: String,
    pub host: String,
    pub path: String,
    pub status: u16,
}

#[derive(Serialize)]
struct AccessLine<'a> {
    time: String,
    level: &'static str,
    msg: &'static str,
    #[serde(flatten)]
    record: &'a AccessRecord,
}

/// Append-only structured access log.
pub struct AccessLogger {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl AccessLogger {
    /// Open (or create) an append-mode log file.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing::info!(path = %path.display(), "Access log opened");
        Ok(Self::from_writer(file))
    }

    /// Log to an arbitrary writer.
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(writer)),
        }
    }

    /// Append one record. Errors are reported via tracing only.
    pub fn record(&self, record: &AccessRecord) {
        let line = AccessLine {
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: "INFO",
            msg: "",
            record,
        };
        let mut buf = match serde_json::to_vec(&line) {
            Ok(buf) => buf,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode access record");
                return;
            }
        };
        buf.push(b'\n');

        let mut sink = match self.sink.lock() {
            Ok(sink) => sink,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = sink.write_all(&buf).and_then(|_| sink.flush()) {
            tracing::warn!(error = %e, "Failed to write access record");
        }
    }
}

impl std::fmt::Debug for AccessLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessLogger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Writer sharing its buffer with the test.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn record(status: u16) -> AccessRecord {
        AccessRecord {
            uuid: "6f1c0f5e-2d3b-4a51-9d6e-0c7b8a9f1e22".into(),
            remote_addr: "5.6.7.8:9999".into(),
            method: "GET".into(),
            host: "app.example.com".into(),
            path: "/index.html".into(),
            status,
        }
    }

    #[test]
    fn test_one_json_line_per_record() {
        let buf = SharedBuf::default();
        let logger = AccessLogger::from_writer(buf.clone());
        logger.record(&record(200));
        logger.record(&record(503));

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        let keys = |v: &serde_json::Value| {
            let mut k: Vec<_> = v.as_object().unwrap().keys().cloned().collect();
            k.sort();
            k
        };
        assert_eq!(keys(&first), keys(&second));
        assert_eq!(first["uuid"], "6f1c0f5e-2d3b-4a51-9d6e-0c7b8a9f1e22");
        assert_eq!(first["remote_addr"], "5.6.7.8:9999");
        assert_eq!(first["status"], 200);
        assert_eq!(second["status"], 503);
    }

    #[test]
    fn test_concurrent_records_do_not_interleave() {
        let buf = SharedBuf::default();
        let logger = Arc::new(AccessLogger::from_writer(buf.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let logger = Arc::clone(&logger);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        logger.record(&record(200));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text.lines().count(), 400);
        for line in text.lines() {
            serde_json::from_str::<serde_json::Value>(line).unwrap();
        }
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let logger = AccessLogger::from_writer(FailingWriter);
        logger.record(&record(200));
    }
}
