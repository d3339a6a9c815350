//! SQLite-based store implementation

use async_trait::async_trait;
use chrono::{DateTime, Local};
use lapse_api::{Decision, RunMode, RunReport};
use lapse_cloud_api::{CloudError, CloudResult, ReportingSink};
use lapse_util::{InstanceId, RunId};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::{AuditEvent, DecisionRecord, RunSummary, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- One row per recorded run
            CREATE TABLE IF NOT EXISTS runs (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL UNIQUE,
                mode TEXT NOT NULL,
                evaluated_at TEXT NOT NULL,
                summary_json TEXT NOT NULL
            );

            -- Decisions per run, in snapshot order
            CREATE TABLE IF NOT EXISTS decisions (
                run_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                instance_id TEXT NOT NULL,
                action TEXT NOT NULL,
                decision_json TEXT NOT NULL,
                PRIMARY KEY (run_id, position)
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_decisions_instance ON decisions(instance_id);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn parse_mode(s: &str) -> StoreResult<RunMode> {
    s.parse().map_err(StoreError::Serialization)
}

fn parse_run_id(s: &str) -> StoreResult<RunId> {
    s.parse()
        .map_err(|e| StoreError::Serialization(format!("bad run id '{}': {}", s, e)))
}

impl Store for SqliteStore {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Local))
                .unwrap_or_else(|_| lapse_util::now());
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn record_run(&self, report: &RunReport) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let run_id = report.run_id.to_string();
        let summary_json = serde_json::to_string(&RunSummary::from_report(report))?;

        let tx = conn.transaction()?;

        tx.execute("DELETE FROM decisions WHERE run_id = ?", [&run_id])?;
        tx.execute("DELETE FROM runs WHERE run_id = ?", [&run_id])?;
        tx.execute(
            "INSERT INTO runs (run_id, mode, evaluated_at, summary_json) VALUES (?, ?, ?, ?)",
            params![
                run_id,
                report.mode.as_str(),
                report.evaluated_at.to_rfc3339(),
                summary_json
            ],
        )?;

        for (position, entry) in report.entries.iter().enumerate() {
            let decision = &entry.decision;
            tx.execute(
                r#"
                INSERT INTO decisions (run_id, position, instance_id, action, decision_json)
                VALUES (?, ?, ?, ?, ?)
                "#,
                params![
                    run_id,
                    position as i64,
                    decision.instance_id.as_str(),
                    decision.action.as_str(),
                    serde_json::to_string(decision)?
                ],
            )?;
        }

        tx.commit()?;

        debug!(run_id = %report.run_id, decisions = report.entries.len(), "Run recorded");
        Ok(())
    }

    fn recent_runs(&self, limit: usize) -> StoreResult<Vec<RunSummary>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare("SELECT summary_json FROM runs ORDER BY seq DESC LIMIT ?")?;
        let rows = stmt.query_map([limit], |row| row.get::<_, String>(0))?;

        let mut runs = Vec::new();
        for row in rows {
            runs.push(serde_json::from_str(&row?)?);
        }

        Ok(runs)
    }

    fn get_run_decisions(&self, run_id: &RunId) -> StoreResult<Vec<Decision>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT decision_json FROM decisions WHERE run_id = ? ORDER BY position",
        )?;
        let rows = stmt.query_map([run_id.to_string()], |row| row.get::<_, String>(0))?;

        let mut decisions = Vec::new();
        for row in rows {
            decisions.push(serde_json::from_str(&row?)?);
        }

        Ok(decisions)
    }

    fn latest_decision(&self, instance_id: &InstanceId) -> StoreResult<Option<DecisionRecord>> {
        let conn = self.conn.lock().unwrap();

        let row: Option<(String, String, String)> = conn
            .query_row(
                r#"
                SELECT d.run_id, r.mode, d.decision_json
                FROM decisions d JOIN runs r ON r.run_id = d.run_id
                WHERE d.instance_id = ?
                ORDER BY r.seq DESC
                LIMIT 1
                "#,
                [instance_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match row {
            Some((run_id, mode, json)) => Ok(Some(DecisionRecord {
                run_id: parse_run_id(&run_id)?,
                mode: parse_mode(&mode)?,
                decision: serde_json::from_str(&json)?,
            })),
            None => Ok(None),
        }
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[async_trait]
impl ReportingSink for SqliteStore {
    async fn publish(&self, report: &RunReport) -> CloudResult<()> {
        self.record_run(report)
            .map_err(|e| CloudError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuditEventType;
    use chrono::TimeZone;
    use lapse_api::{Instance, InstanceState, LifecycleAction, ReportEntry};

    fn report(entries: &[(&str, LifecycleAction)]) -> RunReport {
        let at = Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        RunReport {
            run_id: RunId::new(),
            mode: RunMode::Execute,
            dry_run: false,
            evaluated_at: at,
            entries: entries
                .iter()
                .map(|(id, action)| ReportEntry {
                    instance: Instance::new(*id, InstanceState::Running),
                    decision: Decision::new((*id).into(), *action, "test", at),
                })
                .collect(),
            instructions: vec![],
            outcomes: vec![],
        }
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();
        let run_id = RunId::new();

        store
            .append_audit(AuditEvent::new(AuditEventType::RunStarted {
                run_id: run_id.clone(),
                mode: RunMode::Notify,
                dry_run: true,
            }))
            .unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::RunFailed {
                run_id: run_id.clone(),
                reason: "inventory unavailable".into(),
            }))
            .unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].event, AuditEventType::RunFailed { .. }));
        assert!(matches!(
            events[1].event,
            AuditEventType::RunStarted { mode: RunMode::Notify, dry_run: true, .. }
        ));
    }

    #[test]
    fn test_record_run_and_read_back() {
        let store = SqliteStore::in_memory().unwrap();
        let report = report(&[("i-2", LifecycleAction::Stop), ("i-1", LifecycleAction::None)]);

        store.record_run(&report).unwrap();

        let decisions = store.get_run_decisions(&report.run_id).unwrap();
        let ids: Vec<&str> = decisions.iter().map(|d| d.instance_id.as_str()).collect();
        assert_eq!(ids, vec!["i-2", "i-1"]);
        assert_eq!(decisions[0], report.entries[0].decision);

        let runs = store.recent_runs(5).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].counts.stop, 1);
        assert_eq!(runs[0].mode, RunMode::Execute);
    }

    #[test]
    fn test_recording_twice_replaces() {
        let store = SqliteStore::in_memory().unwrap();
        let report = report(&[("i-1", LifecycleAction::Warn)]);

        store.record_run(&report).unwrap();
        store.record_run(&report).unwrap();

        assert_eq!(store.get_run_decisions(&report.run_id).unwrap().len(), 1);
        assert_eq!(store.recent_runs(5).unwrap().len(), 1);
    }

    #[test]
    fn test_latest_decision_across_runs() {
        let store = SqliteStore::in_memory().unwrap();
        let first = report(&[("i-1", LifecycleAction::Warn)]);
        let second = report(&[("i-1", LifecycleAction::Stop)]);

        store.record_run(&first).unwrap();
        store.record_run(&second).unwrap();

        let latest = store.latest_decision(&InstanceId::new("i-1")).unwrap().unwrap();
        assert_eq!(latest.run_id, second.run_id);
        assert_eq!(latest.decision.action, LifecycleAction::Stop);

        assert!(store.latest_decision(&InstanceId::new("i-9")).unwrap().is_none());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lapse.db");
        let report = report(&[("i-1", LifecycleAction::None)]);

        {
            let store = SqliteStore::open(&path).unwrap();
            store.record_run(&report).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_run_decisions(&report.run_id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_records_run() {
        let store = SqliteStore::in_memory().unwrap();
        let report = report(&[("i-1", LifecycleAction::Warn)]);

        store.publish(&report).await.unwrap();
        assert_eq!(store.recent_runs(1).unwrap()[0].run_id, report.run_id);
    }
}
