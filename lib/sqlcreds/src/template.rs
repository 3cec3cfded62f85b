//! Statement templating.
//!
//! Templates are split on `;` before substitution, so substituted values may
//! contain semicolons but template literals may not. Splitting is purely
//! textual; a `;` inside a quoted literal in a template splits the statement.

use std::collections::BTreeMap;

/// Placeholder keys filled in by the lifecycle operations.
pub mod keys {
    pub const NAME: &str = "name";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const EXPIRATION: &str = "expiration";
}

/// Values substituted for `{{key}}` placeholders.
pub type Substitutions<'a> = BTreeMap<&'a str, &'a str>;

/// Split templates into trimmed, non-empty statements in template order.
pub fn split_statements<S: AsRef<str>>(templates: &[S]) -> impl Iterator<Item = &str> {
    templates
        .iter()
        .flat_map(|template| template.as_ref().split(';'))
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
}

/// Replace every `{{key}}` occurrence for each key in `substitutions`.
///
/// Placeholders without a value are left untouched.
pub fn substitute(statement: &str, substitutions: &Substitutions<'_>) -> String {
    substitutions
        .iter()
        .fold(statement.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{{{key}}}}}"), value)
        })
}

/// Split and substitute a batch of templates into individual statements.
pub fn render<S: AsRef<str>>(templates: &[S], substitutions: &Substitutions<'_>) -> Vec<String> {
    split_statements(templates)
        .map(|statement| substitute(statement, substitutions))
        .collect()
}
