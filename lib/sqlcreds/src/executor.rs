//! Driver traits and transactional batch execution.
//!
//! Implemented by database-specific crates (e.g. `sqlcreds-mysql`). The
//! coordinator only talks to the database through these traits.

use std::future::Future;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::{CredentialError, Phase, Result};

/// How a failed prepare should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareFailure {
    /// The statement type cannot go through the prepared protocol; run it directly.
    Unsupported,
    /// Any other failure; the batch is aborted.
    Other,
}

/// How statements in a batch are sent to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Prepare each statement, falling back to direct execution when the
    /// driver reports the statement type as unsupported.
    Prepared,
    /// Send every statement as plain text.
    Direct,
}

/// Supplies live connections and owns their lifecycle.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// The connection type handed out per operation.
    type Connection: Connection;

    /// Short name of the database type, e.g. `mysql`.
    fn type_name(&self) -> &'static str;

    /// Apply configuration, optionally verifying that a connection can be made.
    async fn initialize(&mut self, config: &Map<String, Value>, verify: bool) -> Result<()>;

    /// Return a live connection, opening one if none is cached.
    async fn connection(&mut self) -> Result<Self::Connection>;

    /// Secret values that must never appear in error text, paired with the
    /// label that replaces them.
    fn secret_values(&self) -> Vec<(String, String)>;

    /// Release any cached connection.
    async fn close(&mut self) -> Result<()>;
}

/// A connection transactions can be started on.
#[async_trait]
pub trait Connection: Send + Sync {
    type Transaction: Transaction;

    async fn begin(
        &self,
    ) -> std::result::Result<Self::Transaction, <Self::Transaction as Transaction>::Error>;
}

/// An open transaction.
///
/// Every server-side prepared statement must be released once it has
/// executed. Dropping the transaction without committing must roll it back.
#[async_trait]
pub trait Transaction: Send + Sized {
    type Statement: Send + Sync;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn prepare(&mut self, sql: &str) -> std::result::Result<Self::Statement, Self::Error>;

    /// Execute a prepared statement with no bound parameters.
    async fn execute_prepared(
        &mut self,
        statement: &Self::Statement,
    ) -> std::result::Result<(), Self::Error>;

    /// Execute a statement without preparing it.
    async fn execute(&mut self, sql: &str) -> std::result::Result<(), Self::Error>;

    async fn commit(self) -> std::result::Result<(), Self::Error>;

    async fn rollback(self) -> std::result::Result<(), Self::Error>;

    /// Decide whether a prepare error allows falling back to direct execution.
    fn classify_prepare_error(error: &Self::Error) -> PrepareFailure;
}

/// Run `future` unless `cancel` fires first.
pub(crate) async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    phase: Phase,
    future: F,
) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CredentialError::Cancelled(phase)),
        output = future => Ok(output),
    }
}

/// Execute `statements` in one transaction on `connection`.
///
/// Commits only if every statement succeeds. Any failure, or cancellation
/// before commit, rolls the transaction back. Rollback errors are logged and
/// never replace the original error.
pub async fn execute_batch<C: Connection>(
    cancel: &CancellationToken,
    connection: &C,
    statements: &[String],
    mode: BatchMode,
) -> Result<()> {
    let mut tx = until_cancelled(cancel, Phase::Begin, connection.begin())
        .await?
        .map_err(|e| CredentialError::Begin(e.to_string()))?;

    let outcome = until_cancelled(cancel, Phase::Execute, run(&mut tx, statements, mode))
        .await
        .and_then(|result| result);

    if let Err(err) = outcome {
        rollback(tx).await;
        return Err(err);
    }

    if cancel.is_cancelled() {
        rollback(tx).await;
        return Err(CredentialError::Cancelled(Phase::Commit));
    }

    tx.commit()
        .await
        .map_err(|e| CredentialError::Commit(e.to_string()))
}

async fn run<T: Transaction>(tx: &mut T, statements: &[String], mode: BatchMode) -> Result<()> {
    for (index, sql) in statements.iter().enumerate() {
        match mode {
            BatchMode::Prepared => execute_prepared(tx, index, sql).await?,
            BatchMode::Direct => execute_direct(tx, index, sql).await?,
        }
    }
    Ok(())
}

async fn execute_prepared<T: Transaction>(tx: &mut T, index: usize, sql: &str) -> Result<()> {
    let statement = match tx.prepare(sql).await {
        Ok(statement) => statement,
        Err(e) => match T::classify_prepare_error(&e) {
            PrepareFailure::Unsupported => {
                tracing::debug!(index, "prepared protocol unsupported, executing directly");
                return execute_direct(tx, index, sql).await;
            }
            PrepareFailure::Other => {
                return Err(CredentialError::Prepare {
                    index,
                    message: e.to_string(),
                });
            }
        },
    };

    tx.execute_prepared(&statement)
        .await
        .map_err(|e| CredentialError::Execute {
            index,
            message: e.to_string(),
        })
}

async fn execute_direct<T: Transaction>(tx: &mut T, index: usize, sql: &str) -> Result<()> {
    tx.execute(sql).await.map_err(|e| CredentialError::Execute {
        index,
        message: e.to_string(),
    })
}

async fn rollback<T: Transaction>(tx: T) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "failed to roll back transaction");
    }
}
