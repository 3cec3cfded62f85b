use std::fmt;

use thiserror::Error;

/// Result type for credential lifecycle operations.
pub type Result<T> = std::result::Result<T, CredentialError>;

/// The stage of an operation an error or cancellation was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lock,
    Connect,
    Begin,
    Execute,
    Commit,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Lock => "lock acquisition",
            Phase::Connect => "connection",
            Phase::Begin => "transaction begin",
            Phase::Execute => "statement execution",
            Phase::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// Errors returned by credential lifecycle operations.
///
/// Driver errors are carried as strings and never include statement text.
/// Statements are identified by their position in the rendered batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("empty creation statements")]
    EmptyCreationStatements,

    #[error("must provide both username and password")]
    MissingCredentials,

    #[error("must provide a username")]
    MissingUsername,

    #[error("no change requested")]
    NoChangeRequested,

    #[error("error generating username: {0}")]
    UsernameGeneration(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to obtain connection: {0}")]
    Connection(String),

    #[error("failed to begin transaction: {0}")]
    Begin(String),

    #[error("failed to prepare statement {index}: {message}")]
    Prepare { index: usize, message: String },

    #[error("failed to execute statement {index}: {message}")]
    Execute { index: usize, message: String },

    /// The batch outcome is unknown; the database may or may not have applied it.
    #[error("failed to commit transaction: {0}")]
    Commit(String),

    #[error("operation cancelled during {0}")]
    Cancelled(Phase),

    #[error("failed to change password: {0}")]
    PasswordChange(Box<CredentialError>),
}

impl CredentialError {
    /// True for errors raised before any database interaction.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CredentialError::EmptyCreationStatements
                | CredentialError::MissingCredentials
                | CredentialError::MissingUsername
                | CredentialError::NoChangeRequested
        )
    }

    /// Replace every occurrence of each secret with its label.
    ///
    /// `secrets` holds `(secret, label)` pairs. Empty secrets are ignored.
    pub fn redact(self, secrets: &[(&str, &str)]) -> Self {
        let clean = |message: String| scrub(message, secrets);
        match self {
            CredentialError::UsernameGeneration(m) => {
                CredentialError::UsernameGeneration(clean(m))
            }
            CredentialError::Config(m) => CredentialError::Config(clean(m)),
            CredentialError::Connection(m) => CredentialError::Connection(clean(m)),
            CredentialError::Begin(m) => CredentialError::Begin(clean(m)),
            CredentialError::Prepare { index, message } => CredentialError::Prepare {
                index,
                message: clean(message),
            },
            CredentialError::Execute { index, message } => CredentialError::Execute {
                index,
                message: clean(message),
            },
            CredentialError::Commit(m) => CredentialError::Commit(clean(m)),
            CredentialError::PasswordChange(inner) => {
                CredentialError::PasswordChange(Box::new(inner.redact(secrets)))
            }
            other => other,
        }
    }
}

fn scrub(mut message: String, secrets: &[(&str, &str)]) -> String {
    for (secret, label) in secrets {
        if !secret.is_empty() && message.contains(secret) {
            message = message.replace(secret, label);
        }
    }
    message
}
