//! Persistence sink: a single append-only write per session at session
//! end, keyed by `sessionId`. The engine never reads back.

use crate::error::{ProctorError, Result};
use crate::session::SessionReport;
use log::warn;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// The store contract: one append-only write per session. Implementors
/// must not fail the caller's session teardown — failures are logged,
/// not propagated.
pub trait PersistenceSink: Send + Sync {
    fn store_report(&self, report: &SessionReport) -> Result<()>;
}

/// Write `report` to `sink`, downgrading any error to a logged warning
/// per the persistence sink's non-fatal failure contract.
pub fn store_report_best_effort(sink: &dyn PersistenceSink, report: &SessionReport) {
    if let Err(err) = sink.store_report(report) {
        warn!(
            "failed to persist session report for {}: {err}",
            report.session_id
        );
    }
}

/// `rusqlite`-backed durable sink, one row per session report.
pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| ProctorError::Storage(e.to_string()))?;

        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))
            .map_err(|e| ProctorError::Storage(e.to_string()))?;
        conn.execute_batch("PRAGMA busy_timeout=5000;")
            .map_err(|e| ProctorError::Storage(e.to_string()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS session_reports (
                session_id       TEXT PRIMARY KEY,
                student_id       TEXT NOT NULL,
                exam_id          TEXT NOT NULL,
                started_at       TEXT NOT NULL,
                ended_at         TEXT NOT NULL,
                risk_level       TEXT NOT NULL,
                report_json      TEXT NOT NULL
            );",
        )
        .map_err(|e| ProctorError::Storage(e.to_string()))?;

        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl PersistenceSink for SqliteSink {
    fn store_report(&self, report: &SessionReport) -> Result<()> {
        let report_json = serde_json::to_string(report)
            .map_err(|e| ProctorError::Storage(format!("serialize report: {e}")))?;
        let risk_level = serde_json::to_value(report.risk_level)
            .map_err(|e| ProctorError::Storage(format!("serialize risk level: {e}")))?;

        let conn = self.conn.lock().expect("sqlite connection mutex poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO session_reports
                (session_id, student_id, exam_id, started_at, ended_at, risk_level, report_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                report.session_id.to_string(),
                report.student_id,
                report.exam_id,
                report.started_at.to_rfc3339(),
                report.ended_at.to_rfc3339(),
                risk_level.as_str().unwrap_or("UNKNOWN"),
                report_json,
            ],
        )
        .map_err(|e| ProctorError::Storage(e.to_string()))?;

        Ok(())
    }
}

/// In-memory sink for tests and dry runs: reports accumulate in a
/// vector instead of touching disk.
#[derive(Default)]
pub struct InMemorySink {
    reports: Mutex<Vec<SessionReport>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<SessionReport> {
        self.reports.lock().expect("in-memory sink mutex poisoned").clone()
    }
}

impl PersistenceSink for InMemorySink {
    fn store_report(&self, report: &SessionReport) -> Result<()> {
        self.reports
            .lock()
            .expect("in-memory sink mutex poisoned")
            .push(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::state::{Session, SessionIdentity};
    use crate::session::report::build_report;
    use chrono::Utc;
    use std::time::Instant;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn sample_report() -> SessionReport {
        let session = Session::new(
            SessionIdentity {
                student_id: "s1".into(),
                exam_id: "e1".into(),
                session_id: Uuid::new_v4(),
            },
            40,
        );
        build_report(&session, Utc::now(), Utc::now(), Instant::now())
    }

    #[test]
    fn test_sqlite_sink_roundtrip_does_not_error() {
        let dir = tempdir().unwrap();
        let sink = SqliteSink::open(dir.path().join("proctor.db")).expect("open sink");
        let report = sample_report();
        sink.store_report(&report).expect("store report");
    }

    #[test]
    fn test_in_memory_sink_accumulates() {
        let sink = InMemorySink::new();
        let report = sample_report();
        sink.store_report(&report).unwrap();
        assert_eq!(sink.reports().len(), 1);
    }

    #[test]
    fn test_store_report_best_effort_never_panics_on_bad_path() {
        // A sink that always errors must not cause the caller to panic.
        struct FailingSink;
        impl PersistenceSink for FailingSink {
            fn store_report(&self, _report: &SessionReport) -> Result<()> {
                Err(ProctorError::Storage("disk full".into()))
            }
        }
        store_report_best_effort(&FailingSink, &sample_report());
    }
}
