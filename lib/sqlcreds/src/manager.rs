//! Credential lifecycle coordinator.
//!
//! Every operation holds the provider lock from connection acquisition until
//! its transaction is committed or rolled back, so operations on one manager
//! never interleave on the shared connection.

use std::sync::RwLock;

use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::executor::{BatchMode, ConnectionProvider, execute_batch, until_cancelled};
use crate::template::{self, Substitutions, keys};
use crate::{
    CredentialError, DeleteUserRequest, NamingScheme, NewUserRequest, Phase, Result,
    UpdateUserRequest, generate_username,
};

/// Revokes all privileges and drops the account.
pub const DEFAULT_REVOCATION_STATEMENTS: &str =
    "REVOKE ALL PRIVILEGES, GRANT OPTION FROM '{{name}}'@'%'; DROP USER '{{name}}'@'%'";

/// Sets a new password on the account.
pub const DEFAULT_ROTATION_STATEMENTS: &str =
    "ALTER USER '{{username}}'@'%' IDENTIFIED BY '{{password}}';";

const PASSWORD_LABEL: &str = "[password]";

/// Creates, rotates and revokes database accounts through a shared connection provider.
pub struct CredentialManager<P> {
    provider: Mutex<P>,
    scheme: NamingScheme,
    type_name: &'static str,
    secrets: RwLock<Vec<(String, String)>>,
}

impl<P: ConnectionProvider> CredentialManager<P> {
    pub fn new(provider: P, scheme: NamingScheme) -> Self {
        let type_name = provider.type_name();
        let secrets = RwLock::new(provider.secret_values());
        Self {
            provider: Mutex::new(provider),
            scheme,
            type_name,
            secrets,
        }
    }

    pub fn scheme(&self) -> NamingScheme {
        self.scheme
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Secrets known to the provider as of the last initialization.
    pub fn secret_values(&self) -> Vec<(String, String)> {
        match self.secrets.read() {
            Ok(secrets) => secrets.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn lock(&self, cancel: &CancellationToken) -> Result<MutexGuard<'_, P>> {
        until_cancelled(cancel, Phase::Lock, self.provider.lock()).await
    }

    /// Configure the provider. Holds the lock so no operation runs against a
    /// half-configured provider.
    pub async fn initialize(
        &self,
        cancel: &CancellationToken,
        config: &serde_json::Map<String, serde_json::Value>,
        verify: bool,
    ) -> Result<()> {
        let mut provider = self.lock(cancel).await?;
        until_cancelled(cancel, Phase::Connect, provider.initialize(config, verify)).await??;

        let secrets = provider.secret_values();
        match self.secrets.write() {
            Ok(mut current) => *current = secrets,
            Err(poisoned) => *poisoned.into_inner() = secrets,
        }
        Ok(())
    }

    pub async fn close(&self, cancel: &CancellationToken) -> Result<()> {
        let mut provider = self.lock(cancel).await?;
        provider.close().await
    }

    async fn execute_locked(
        &self,
        cancel: &CancellationToken,
        statements: &[String],
        mode: BatchMode,
    ) -> Result<()> {
        let mut provider = self.lock(cancel).await?;
        let connection = until_cancelled(cancel, Phase::Connect, provider.connection()).await??;
        execute_batch(cancel, &connection, statements, mode).await
    }

    /// Create an account and return its generated username.
    pub async fn create_user(
        &self,
        cancel: &CancellationToken,
        req: &NewUserRequest,
    ) -> Result<String> {
        if req.statements.is_empty() {
            return Err(CredentialError::EmptyCreationStatements);
        }

        let username = generate_username(
            &req.username_config.display_name,
            &req.username_config.role_name,
            self.scheme,
        )?;
        let expiration = req.expiration.to_string();

        let substitutions = Substitutions::from([
            (keys::NAME, username.as_str()),
            (keys::USERNAME, username.as_str()),
            (keys::PASSWORD, req.password.as_str()),
            (keys::EXPIRATION, expiration.as_str()),
        ]);
        let statements = template::render(&req.statements.commands, &substitutions);

        self.execute_locked(cancel, &statements, BatchMode::Prepared)
            .await
            .map_err(|e| e.redact(&[(req.password.as_str(), PASSWORD_LABEL)]))?;

        tracing::info!(
            username = %username,
            statements = statements.len(),
            "created database user"
        );
        Ok(username)
    }

    /// Set a new password, using the default `ALTER USER` when no statements are given.
    pub async fn rotate_password(
        &self,
        cancel: &CancellationToken,
        username: &str,
        password: &str,
        statements: &[String],
    ) -> Result<()> {
        if username.is_empty() || password.is_empty() {
            return Err(CredentialError::MissingCredentials);
        }

        let default = [DEFAULT_ROTATION_STATEMENTS.to_string()];
        let templates = if statements.is_empty() {
            &default[..]
        } else {
            statements
        };

        let substitutions = Substitutions::from([
            (keys::NAME, username),
            (keys::USERNAME, username),
            (keys::PASSWORD, password),
        ]);
        let rendered = template::render(templates, &substitutions);

        self.execute_locked(cancel, &rendered, BatchMode::Prepared)
            .await
            .map_err(|e| e.redact(&[(password, PASSWORD_LABEL)]))?;

        tracing::info!(username = %username, "rotated database user password");
        Ok(())
    }

    /// Apply a password and/or expiration change.
    ///
    /// Expiration is tracked by the caller's lease, so an expiration-only
    /// change succeeds without touching the database.
    pub async fn update_user(
        &self,
        cancel: &CancellationToken,
        req: &UpdateUserRequest,
    ) -> Result<()> {
        if req.password.is_none() && req.expiration.is_none() {
            return Err(CredentialError::NoChangeRequested);
        }

        if let Some(change) = &req.password {
            self.rotate_password(
                cancel,
                &req.username,
                &change.new_password,
                &change.statements.commands,
            )
            .await
            .map_err(|e| CredentialError::PasswordChange(Box::new(e)))?;
        }

        if let Some(change) = &req.expiration {
            tracing::debug!(
                username = %req.username,
                expiration = %change.new_expiration,
                "expiration change requires no database action"
            );
        }

        Ok(())
    }

    /// Revoke and drop an account, using the default revocation when no
    /// statements are given. Revocation statements are always executed
    /// directly, never prepared.
    pub async fn delete_user(
        &self,
        cancel: &CancellationToken,
        req: &DeleteUserRequest,
    ) -> Result<()> {
        if req.username.is_empty() {
            return Err(CredentialError::MissingUsername);
        }

        let statements = revocation_statements(&req.username, &req.statements.commands);
        self.execute_locked(cancel, &statements, BatchMode::Direct).await?;

        tracing::info!(username = %req.username, "revoked database user");
        Ok(())
    }
}

/// Fill `{{name}}` and `{{username}}` by plain replacement.
fn revocation_statements(username: &str, templates: &[String]) -> Vec<String> {
    let default = [DEFAULT_REVOCATION_STATEMENTS.to_string()];
    let templates = if templates.is_empty() {
        &default[..]
    } else {
        templates
    };

    template::split_statements(templates)
        .map(|statement| {
            statement
                .replace("{{name}}", username)
                .replace("{{username}}", username)
        })
        .collect()
}
