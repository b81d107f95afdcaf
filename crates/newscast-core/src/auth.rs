//! Bearer-token identity checks for the HTTP endpoints wrapping the engine.

use std::collections::HashMap;

/// Validates bearer tokens issued by the identity provider.
pub trait IdentityValidator: Send + Sync {
    fn is_valid_bearer(&self, token: &str) -> bool;

    /// The subject the token was issued to, if the token is valid.
    fn subject_of(&self, token: &str) -> Option<String>;
}

/// Validator backed by a fixed token → subject table from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, String>,
}

impl StaticTokenValidator {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

impl IdentityValidator for StaticTokenValidator {
    fn is_valid_bearer(&self, token: &str) -> bool {
        !token.is_empty() && self.tokens.contains_key(token)
    }

    fn subject_of(&self, token: &str) -> Option<String> {
        self.tokens.get(token).cloned()
    }
}
