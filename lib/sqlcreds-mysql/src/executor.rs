//! MySQL implementation of the sqlcreds driver traits.

use std::ops::Deref;

use async_trait::async_trait;
use sqlcreds::{Connection, PrepareFailure, Transaction};
use sqlx::mysql::{MySqlDatabaseError, MySqlStatement};
use sqlx::{Executor, MySql};

/// ER_UNSUPPORTED_PS: "This command is not supported in the prepared statement protocol yet".
pub const ER_UNSUPPORTED_PS: u16 = 1295;

/// True when the server refused to prepare a statement because its type
/// can only be sent as plain text.
pub fn is_unsupported_in_prepared_protocol(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error
            .try_downcast_ref::<MySqlDatabaseError>()
            .is_some_and(|e| e.number() == ER_UNSUPPORTED_PS),
        _ => false,
    }
}

/// Wrapper around sqlx::MySqlPool that implements Connection.
#[derive(Clone, Debug)]
pub struct MySqlPool(sqlx::MySqlPool);

impl MySqlPool {
    /// Create a new MySqlPool from an sqlx MySqlPool.
    pub fn new(pool: sqlx::MySqlPool) -> Self {
        Self(pool)
    }

    /// Get the inner sqlx::MySqlPool.
    pub fn inner(&self) -> &sqlx::MySqlPool {
        &self.0
    }
}

impl Deref for MySqlPool {
    type Target = sqlx::MySqlPool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl Connection for MySqlPool {
    type Transaction = MySqlTransaction;

    async fn begin(&self) -> Result<MySqlTransaction, sqlx::Error> {
        let tx = self.0.begin().await?;
        Ok(MySqlTransaction { tx })
    }
}

/// MySQL transaction wrapper implementing Transaction.
///
/// sqlx rolls the transaction back if it is dropped before commit. Server-side
/// statements are closed after each prepare and execute only while the
/// connection's statement cache is disabled (see [`crate::MySqlConfig::connect_options`]).
pub struct MySqlTransaction {
    tx: sqlx::Transaction<'static, MySql>,
}

#[async_trait]
impl Transaction for MySqlTransaction {
    type Statement = MySqlStatement<'static>;
    type Error = sqlx::Error;

    async fn prepare(&mut self, sql: &str) -> Result<MySqlStatement<'static>, sqlx::Error> {
        let statement = (&mut *self.tx).prepare(sql).await?;
        Ok(sqlx::Statement::to_owned(&statement))
    }

    async fn execute_prepared(
        &mut self,
        statement: &MySqlStatement<'static>,
    ) -> Result<(), sqlx::Error> {
        sqlx::Statement::query(statement)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        (&mut *self.tx).execute(sqlx::raw_sql(sql)).await?;
        Ok(())
    }

    async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }

    async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await
    }

    fn classify_prepare_error(error: &sqlx::Error) -> PrepareFailure {
        if is_unsupported_in_prepared_protocol(error) {
            PrepareFailure::Unsupported
        } else {
            PrepareFailure::Other
        }
    }
}
