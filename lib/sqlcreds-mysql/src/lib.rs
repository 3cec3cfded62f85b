//! MySQL implementation for sqlcreds.
//!
//! This crate provides the MySQL connection provider and the transaction
//! driver used by [`sqlcreds::CredentialManager`]. Statements the server
//! refuses to prepare (error 1295) are executed as plain text inside the same
//! transaction.
//!
//! # Usage
//!
//! ```text
//! use sqlcreds::{CancellationToken, Database, InitializeRequest, NamingScheme};
//!
//! let db = sqlcreds_mysql::new(NamingScheme::Modern);
//! db.initialize(&cancel, InitializeRequest { config, verify_connection: true }).await?;
//! let resp = db.new_user(&cancel, request).await?;
//! ```

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

mod config;
mod executor;
mod producer;

pub use config::MySqlConfig;
pub use executor::{
    ER_UNSUPPORTED_PS, MySqlPool, MySqlTransaction, is_unsupported_in_prepared_protocol,
};
pub use producer::MySqlConnectionProducer;

use sqlcreds::{CredentialManager, ErrorSanitizer};

/// Database type name reported to the host.
pub const TYPE_NAME: &str = "mysql";

/// Credential manager over a MySQL connection producer.
pub type MySql = CredentialManager<MySqlConnectionProducer>;

/// The sanitized plugin returned by [`new`].
pub type Db = ErrorSanitizer<MySql>;

/// Build a MySQL database plugin whose errors never expose the connection password.
pub fn new(scheme: NamingScheme) -> Db {
    ErrorSanitizer::new(CredentialManager::new(MySqlConnectionProducer::new(), scheme))
}

// Re-export core types for convenience
pub use sqlcreds::{
    CancellationToken, CredentialError, Database, DeleteUserRequest, InitializeRequest,
    NamingScheme, NewUserRequest, Statements, UpdateUserRequest,
};
