//! In-memory driver that records every call and only makes statements
//! visible once their transaction commits.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlcreds::{
    Connection, ConnectionProvider, CredentialError, PrepareFailure, Result, Transaction,
};

pub const UNSUPPORTED_IN_PREPARED_PROTOCOL: u16 = 1295;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect,
    Begin,
    Prepare(String),
    ExecutePrepared(String),
    Execute(String),
    Commit,
    Rollback,
    /// Transaction dropped without commit or rollback.
    Abandoned,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub events: Vec<Event>,
    pub visible: Vec<String>,
    pub unsupported: Vec<String>,
    pub prepare_failures: Vec<String>,
    pub execute_failures: Vec<String>,
    pub fail_connect: bool,
    pub fail_commit: bool,
    pub delay: Option<Duration>,
    pub open_transactions: usize,
    pub max_open_transactions: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockDb(Arc<Mutex<MockState>>);

impl MockDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().unwrap()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    pub fn visible(&self) -> Vec<String> {
        self.state().visible.clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.state().events.iter().filter(|e| *e == event).count()
    }

    pub fn provider(&self) -> MockProvider {
        MockProvider {
            db: self.clone(),
            password: String::new(),
        }
    }

    pub fn connection(&self) -> MockConnection {
        MockConnection(self.clone())
    }

    fn record(&self, event: Event) {
        self.state().events.push(event);
    }

    fn delay(&self) -> Option<Duration> {
        self.state().delay
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Error {code}: {message}")]
pub struct MockError {
    pub code: u16,
    pub message: String,
}

fn matches_any(patterns: &[String], sql: &str) -> bool {
    patterns.iter().any(|p| sql.contains(p.as_str()))
}

pub struct MockProvider {
    db: MockDb,
    password: String,
}

#[async_trait]
impl ConnectionProvider for MockProvider {
    type Connection = MockConnection;

    fn type_name(&self) -> &'static str {
        "mock"
    }

    async fn initialize(&mut self, config: &Map<String, Value>, _verify: bool) -> Result<()> {
        self.password = config
            .get("password")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(())
    }

    async fn connection(&mut self) -> Result<MockConnection> {
        if self.db.state().fail_connect {
            return Err(CredentialError::Connection(format!(
                "access denied for admin:{}@localhost",
                self.password
            )));
        }
        self.db.record(Event::Connect);
        Ok(self.db.connection())
    }

    fn secret_values(&self) -> Vec<(String, String)> {
        vec![(self.password.clone(), "[password]".to_string())]
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct MockConnection(MockDb);

#[async_trait]
impl Connection for MockConnection {
    type Transaction = MockTransaction;

    async fn begin(&self) -> std::result::Result<MockTransaction, MockError> {
        let mut state = self.0.state();
        state.events.push(Event::Begin);
        state.open_transactions += 1;
        state.max_open_transactions = state.max_open_transactions.max(state.open_transactions);
        Ok(MockTransaction {
            db: self.0.clone(),
            pending: Vec::new(),
            finished: false,
        })
    }
}

pub struct MockTransaction {
    db: MockDb,
    pending: Vec<String>,
    finished: bool,
}

impl MockTransaction {
    async fn run(&mut self, sql: &str, event: Event) -> std::result::Result<(), MockError> {
        if let Some(delay) = self.db.delay() {
            tokio::time::sleep(delay).await;
        }
        self.db.record(event);
        if matches_any(&self.db.state().execute_failures, sql) {
            return Err(MockError {
                code: 1396,
                message: format!("Operation failed for '{sql}'"),
            });
        }
        self.pending.push(sql.to_string());
        Ok(())
    }

    fn finish(&mut self, event: Event) {
        self.finished = true;
        let mut state = self.db.state();
        state.events.push(event);
        state.open_transactions -= 1;
    }
}

#[async_trait]
impl Transaction for MockTransaction {
    type Statement = String;
    type Error = MockError;

    async fn prepare(&mut self, sql: &str) -> std::result::Result<String, MockError> {
        self.db.record(Event::Prepare(sql.to_string()));
        let state = self.db.state();
        if matches_any(&state.unsupported, sql) {
            return Err(MockError {
                code: UNSUPPORTED_IN_PREPARED_PROTOCOL,
                message: "This command is not supported in the prepared statement protocol yet"
                    .to_string(),
            });
        }
        if matches_any(&state.prepare_failures, sql) {
            return Err(MockError {
                code: 1064,
                message: format!("You have an error in your SQL syntax near '{sql}'"),
            });
        }
        Ok(sql.to_string())
    }

    async fn execute_prepared(&mut self, statement: &String) -> std::result::Result<(), MockError> {
        self.run(statement, Event::ExecutePrepared(statement.clone()))
            .await
    }

    async fn execute(&mut self, sql: &str) -> std::result::Result<(), MockError> {
        self.run(sql, Event::Execute(sql.to_string())).await
    }

    async fn commit(mut self) -> std::result::Result<(), MockError> {
        if self.db.state().fail_commit {
            self.finish(Event::Commit);
            return Err(MockError {
                code: 2013,
                message: "Lost connection to MySQL server during query".to_string(),
            });
        }
        let pending = std::mem::take(&mut self.pending);
        self.db.state().visible.extend(pending);
        self.finish(Event::Commit);
        Ok(())
    }

    async fn rollback(mut self) -> std::result::Result<(), MockError> {
        self.pending.clear();
        self.finish(Event::Rollback);
        Ok(())
    }

    fn classify_prepare_error(error: &MockError) -> PrepareFailure {
        if error.code == UNSUPPORTED_IN_PREPARED_PROTOCOL {
            PrepareFailure::Unsupported
        } else {
            PrepareFailure::Other
        }
    }
}

impl Drop for MockTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(Event::Abandoned);
        }
    }
}

pub fn statements(sql: &[&str]) -> Vec<String> {
    sql.iter().map(|s| s.to_string()).collect()
}
