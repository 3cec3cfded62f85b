//! Request and response shapes of the plugin surface.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Expiration;

/// Templated statements supplied by role configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statements {
    #[serde(default)]
    pub commands: Vec<String>,
}

impl Statements {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub config: Map<String, Value>,
    #[serde(default)]
    pub verify_connection: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub config: Map<String, Value>,
}

/// Inputs to the generated username.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameMetadata {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub role_name: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct NewUserRequest {
    #[serde(default)]
    pub username_config: UsernameMetadata,
    #[serde(default)]
    pub statements: Statements,
    /// Accepted for compatibility; creation is already atomic so these are not run.
    #[serde(default)]
    pub rollback_statements: Statements,
    pub password: String,
    pub expiration: Expiration,
}

impl fmt::Debug for NewUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUserRequest")
            .field("username_config", &self.username_config)
            .field("statements", &self.statements.commands.len())
            .field("rollback_statements", &self.rollback_statements.commands.len())
            .field("password", &"[redacted]")
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUserResponse {
    pub username: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ChangePassword {
    pub new_password: String,
    #[serde(default)]
    pub statements: Statements,
}

impl fmt::Debug for ChangePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangePassword")
            .field("new_password", &"[redacted]")
            .field("statements", &self.statements.commands.len())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeExpiration {
    pub new_expiration: Expiration,
    #[serde(default)]
    pub statements: Statements,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    #[serde(default)]
    pub password: Option<ChangePassword>,
    #[serde(default)]
    pub expiration: Option<ChangeExpiration>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserResponse {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUserRequest {
    pub username: String,
    #[serde(default)]
    pub statements: Statements,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteUserResponse {}
