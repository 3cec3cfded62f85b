//! Account identifier generation.
//!
//! Identifiers have the shape `v-<display>-<role>-<random>-<unix time>`, with
//! empty name segments left out, and are cut to the scheme's maximum length, so the tail of the random segment and
//! the timestamp only survive when the name segments are short:
//!
//! ```text
//! Modern
//! v_  displayname_ metadata_ random
//! -2- -----14----- ----11--- ---5--
//! --------------32-----------------
//!
//! Legacy
//! v_  displayname_ metadata_ random
//! -2- -----6------ ----5---- ---3--
//! --------------16-----------------
//! ```

use rand::RngCore;
use rand::rngs::OsRng;

use crate::{CredentialError, Result};

const VERSION_MARKER: &str = "v";
const SEPARATOR: &str = "-";
const RANDOM_LEN: usize = 20;
const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

// Largest multiple of the alphabet size that fits in a byte; bytes at or above it are
// rejected so every character is equally likely.
const REJECTION_BOUND: u8 = (256 / ALPHANUMERIC.len() * ALPHANUMERIC.len()) as u8;

/// Length rules for generated account identifiers.
///
/// Chosen once when the database is constructed and fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingScheme {
    /// MySQL 5.7 and later: 32 character user names.
    #[default]
    Modern,
    /// Older servers limited to 16 character user names.
    Legacy,
}

impl NamingScheme {
    pub const fn display_name_len(self) -> usize {
        match self {
            NamingScheme::Modern => 13,
            NamingScheme::Legacy => 5,
        }
    }

    pub const fn role_name_len(self) -> usize {
        match self {
            NamingScheme::Modern => 10,
            NamingScheme::Legacy => 4,
        }
    }

    pub const fn max_len(self) -> usize {
        match self {
            NamingScheme::Modern => 32,
            NamingScheme::Legacy => 16,
        }
    }
}

/// Generate a username using the operating system's entropy source.
pub fn generate_username(
    display_name: &str,
    role_name: &str,
    scheme: NamingScheme,
) -> Result<String> {
    generate_username_with(&mut OsRng, display_name, role_name, scheme)
}

/// Generate a username drawing random bits from `rng`.
///
/// Fails only when `rng` cannot supply bytes. Over-length inputs are truncated.
pub fn generate_username_with<R: RngCore + ?Sized>(
    rng: &mut R,
    display_name: &str,
    role_name: &str,
    scheme: NamingScheme,
) -> Result<String> {
    let display = segment(display_name, scheme.display_name_len());
    let role = segment(role_name, scheme.role_name_len());
    let random = random_alphanumeric(rng, RANDOM_LEN)?;
    let timestamp = chrono::Utc::now().timestamp().to_string();

    let mut username = [VERSION_MARKER, &display, &role, &random, &timestamp]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(SEPARATOR);
    // Every segment is ASCII, so byte truncation lands on a char boundary.
    username.truncate(scheme.max_len());
    Ok(username)
}

/// Strip everything but ASCII alphanumerics and keep at most `max_len` characters.
fn segment(value: &str, max_len: usize) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(max_len)
        .collect()
}

fn random_alphanumeric<R: RngCore + ?Sized>(rng: &mut R, len: usize) -> Result<String> {
    let mut out = String::with_capacity(len);
    let mut buf = [0u8; 32];

    while out.len() < len {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| CredentialError::UsernameGeneration(e.to_string()))?;

        for byte in buf.iter().filter(|b| **b < REJECTION_BOUND) {
            if out.len() == len {
                break;
            }
            out.push(ALPHANUMERIC[*byte as usize % ALPHANUMERIC.len()] as char);
        }
    }

    Ok(out)
}
