//! Sqlcreds - lifecycle management for dynamically provisioned database credentials.
//!
//! This crate provides the driver-independent core: it generates account
//! names, renders templated SQL statements, and runs them transactionally
//! against a connection supplied by a database-specific crate.
//!
//! # Core Concepts
//!
//! - **Account identifier**: a generated username of the form
//!   `v-<display>-<role>-<random>`, bounded by a [`NamingScheme`].
//! - **Template**: SQL containing `{{name}}`, `{{username}}`, `{{password}}`
//!   or `{{expiration}}` placeholders, possibly several statements separated by `;`.
//! - **Batch**: all statements rendered for one operation, executed in one transaction.
//!
//! # Traits
//!
//! - [`ConnectionProvider`]: Supplies connections (implemented per database)
//! - [`Connection`] / [`Transaction`]: The driver calls a batch is built from
//! - [`Database`]: The plugin surface (`initialize`, `new_user`, `update_user`, `delete_user`)

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

mod database;
mod error;
mod executor;
mod manager;
mod request;
pub mod template;
mod time;
mod username;

pub use database::{Database, ErrorSanitizer};
pub use error::{CredentialError, Phase, Result};
pub use executor::{
    BatchMode, Connection, ConnectionProvider, PrepareFailure, Transaction, execute_batch,
};
pub use manager::{CredentialManager, DEFAULT_REVOCATION_STATEMENTS, DEFAULT_ROTATION_STATEMENTS};
pub use request::{
    ChangeExpiration, ChangePassword, DeleteUserRequest, DeleteUserResponse, InitializeRequest,
    InitializeResponse, NewUserRequest, NewUserResponse, Statements, UpdateUserRequest,
    UpdateUserResponse, UsernameMetadata,
};
pub use time::{EXPIRATION_FORMAT, Expiration};
pub use username::{NamingScheme, generate_username, generate_username_with};

// Re-export for driver crates and callers
pub use tokio_util::sync::CancellationToken;
