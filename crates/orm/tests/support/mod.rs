//! In-memory collaborators for migration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keel_orm::{
    Database, DatabaseValue, MigrationDirection, MigrationOperation, MigrationReporter, OrmError,
    OrmResult,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    table_created: bool,
    ledger: BTreeMap<String, DateTime<Utc>>,
    ledger_writes: usize,
    statements: Vec<String>,
    failing: HashSet<String>,
    unreachable: bool,
}

/// Database fake that understands the ledger statements and logs everything else
#[derive(Default, Clone)]
pub struct FakeDatabase {
    state: Arc<Mutex<State>>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the server were down
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    /// Make `sql` fail when executed
    pub fn fail_on(&self, sql: &str) {
        self.state.lock().unwrap().failing.insert(sql.trim().to_string());
    }

    /// Pre-populate a ledger row
    pub fn seed_ledger(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.table_created = true;
        state.ledger.insert(id.to_string(), Utc::now());
    }

    /// Ledger ids, ascending
    pub fn ledger_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().ledger.keys().cloned().collect()
    }

    /// Number of INSERT/DELETE statements run against the ledger
    pub fn ledger_writes(&self) -> usize {
        self.state.lock().unwrap().ledger_writes
    }

    /// Every statement passed to `execute`, in order
    pub fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statements.clone()
    }

    pub fn table_created(&self) -> bool {
        self.state.lock().unwrap().table_created
    }

    fn check_reachable(state: &State) -> OrmResult<()> {
        if state.unreachable {
            return Err(OrmError::Connection("connection refused".to_string()));
        }
        Ok(())
    }

    fn check_table(state: &State) -> OrmResult<()> {
        if !state.table_created {
            return Err(OrmError::Database("relation does not exist".to_string()));
        }
        Ok(())
    }
}

fn first_param(params: &[DatabaseValue]) -> OrmResult<String> {
    params
        .first()
        .and_then(|p| p.as_str())
        .map(str::to_string)
        .ok_or_else(|| OrmError::Database("missing id parameter".to_string()))
}

#[async_trait]
impl Database for FakeDatabase {
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        let mut state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        state.statements.push(sql.to_string());

        if state.failing.contains(sql.trim()) {
            return Err(OrmError::Database(format!("statement failed: {}", sql.trim())));
        }

        if sql.starts_with("CREATE TABLE IF NOT EXISTS") {
            state.table_created = true;
            return Ok(0);
        }

        if sql.starts_with("INSERT INTO") && sql.contains("(id, created)") {
            Self::check_table(&state)?;
            let id = first_param(params)?;
            if state.ledger.contains_key(&id) {
                return Err(OrmError::Database(format!("duplicate key value: {}", id)));
            }
            state.ledger.insert(id, Utc::now());
            state.ledger_writes += 1;
            return Ok(1);
        }

        if sql.starts_with("DELETE FROM") {
            Self::check_table(&state)?;
            let id = first_param(params)?;
            state.ledger_writes += 1;
            return Ok(u64::from(state.ledger.remove(&id).is_some()));
        }

        Ok(0)
    }

    async fn query_one(&self, sql: &str, _params: &[DatabaseValue]) -> OrmResult<Option<DatabaseValue>> {
        let state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        Self::check_table(&state)?;

        if sql.contains("ORDER BY id DESC LIMIT 1") {
            return Ok(state.ledger.keys().next_back().cloned().map(DatabaseValue::String));
        }
        Err(OrmError::Database(format!("unsupported query: {}", sql)))
    }

    async fn query_all(&self, sql: &str, _params: &[DatabaseValue]) -> OrmResult<Vec<Vec<DatabaseValue>>> {
        let state = self.state.lock().unwrap();
        Self::check_reachable(&state)?;
        Self::check_table(&state)?;

        if sql.starts_with("SELECT id, created FROM") {
            return Ok(state
                .ledger
                .iter()
                .map(|(id, created)| vec![DatabaseValue::String(id.clone()), DatabaseValue::DateTime(*created)])
                .collect());
        }
        Err(OrmError::Database(format!("unsupported query: {}", sql)))
    }
}

/// Shared log of operation invocations such as `"up A"`
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Operation that logs its invocation and optionally fails
pub struct RecordingOperation {
    label: String,
    log: CallLog,
    fail: bool,
}

impl RecordingOperation {
    pub fn new(label: impl Into<String>, log: &CallLog) -> Self {
        Self {
            label: label.into(),
            log: Arc::clone(log),
            fail: false,
        }
    }

    pub fn failing(label: impl Into<String>, log: &CallLog) -> Self {
        Self {
            fail: true,
            ..Self::new(label, log)
        }
    }
}

#[async_trait]
impl MigrationOperation for RecordingOperation {
    async fn apply(&self, _db: &dyn Database) -> OrmResult<()> {
        self.log.lock().unwrap().push(self.label.clone());
        if self.fail {
            return Err(OrmError::Database(format!("{} exploded", self.label)));
        }
        Ok(())
    }
}

/// Reporter that keeps every event as a string
#[derive(Default, Clone)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl MigrationReporter for RecordingReporter {
    fn no_migrations_registered(&self) {
        self.push("no migrations registered".to_string());
    }

    fn nothing_to_do(&self) {
        self.push("nothing to do".to_string());
    }

    fn applied(&self, id: &str) {
        self.push(format!("applied {}", id));
    }

    fn reverted(&self, id: &str) {
        self.push(format!("reverted {}", id));
    }

    fn failed(&self, id: &str, direction: MigrationDirection, _error: &OrmError) {
        self.push(format!("failed {} {}", direction, id));
    }
}
