//! Append-only audit trail kept outside the primary store.
//!
//! Every applied transaction, every status change and every reconciliation
//! correction is written as one JSON object per line, stamped with an
//! RFC 3339 UTC timestamp. Records are written after the unit commits; a
//! failing write is logged and never undoes the ledger operation.

use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Direction, TransactionKind, TransactionStatus};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    TransactionApplied {
        transaction_id: Uuid,
        wallet_id: Uuid,
        user_id: String,
        kind: TransactionKind,
        direction: Direction,
        status: TransactionStatus,
        amount: i64,
        balance: i64,
        pending_balance: i64,
    },
    StatusChanged {
        transaction_id: Uuid,
        wallet_id: Uuid,
        kind: TransactionKind,
        from: TransactionStatus,
        to: TransactionStatus,
        amount: i64,
        balance: i64,
        pending_balance: i64,
    },
    BalanceCorrection {
        wallet_id: Uuid,
        user_id: String,
        balance_before: i64,
        balance_after: i64,
        pending_before: i64,
        pending_after: i64,
        balance_discrepancy: i64,
        pending_discrepancy: i64,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AuditEvent,
}

#[derive(Clone, Debug)]
enum Sink {
    Disabled,
    File(Arc<Mutex<File>>),
    Memory(Arc<Mutex<Vec<AuditRecord>>>),
}

#[derive(Clone, Debug)]
pub struct AuditLog {
    sink: Sink,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::disabled()
    }
}

impl AuditLog {
    /// Audit events only reach the tracing subscriber.
    pub fn disabled() -> Self {
        Self {
            sink: Sink::Disabled,
        }
    }

    /// Opens (or creates) `path` in append mode.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            sink: Sink::File(Arc::new(Mutex::new(file))),
        })
    }

    /// Keeps records in memory; used by tests to inspect the trail.
    pub fn memory() -> Self {
        Self {
            sink: Sink::Memory(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Records held by a [`memory`](Self::memory) log. Empty for other sinks.
    pub fn records(&self) -> Vec<AuditRecord> {
        match &self.sink {
            Sink::Memory(records) => records.lock().map(|r| r.clone()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    pub fn record(&self, event: AuditEvent) {
        let record = AuditRecord {
            timestamp: Utc::now(),
            event,
        };
        tracing::debug!(target: "ledger_audit", ?record, "audit");

        match &self.sink {
            Sink::Disabled => {}
            Sink::Memory(records) => match records.lock() {
                Ok(mut records) => records.push(record),
                Err(_) => tracing::error!("audit buffer poisoned"),
            },
            Sink::File(file) => {
                if let Err(err) = write_line(file, &record) {
                    tracing::error!("failed to write audit record: {err}");
                }
            }
        }
    }
}

fn write_line(file: &Mutex<File>, record: &AuditRecord) -> io::Result<()> {
    let mut line = serde_json::to_string(record).map_err(io::Error::other)?;
    line.push('\n');
    let mut file = file
        .lock()
        .map_err(|_| io::Error::other("audit file lock poisoned"))?;
    file.write_all(line.as_bytes())?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correction() -> AuditEvent {
        AuditEvent::BalanceCorrection {
            wallet_id: Uuid::nil(),
            user_id: "ada".to_string(),
            balance_before: 500,
            balance_after: 400,
            pending_before: 0,
            pending_after: 0,
            balance_discrepancy: 100,
            pending_discrepancy: 0,
        }
    }

    #[test]
    fn memory_sink_keeps_records() {
        let log = AuditLog::memory();
        log.record(correction());
        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event, correction());
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let path = std::env::temp_dir().join(format!("ledger_audit_{}.log", Uuid::new_v4()));
        let log = AuditLog::open(&path).unwrap();
        log.record(correction());
        log.record(correction());

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "balance_correction");
        assert!(
            DateTime::parse_from_rfc3339(parsed["timestamp"].as_str().unwrap()).is_ok()
        );
        let _ = std::fs::remove_file(path);
    }
}
