//! Secrets held in memory that must never reach logs.

use std::fmt;

use secrecy::{ExposeSecret, SecretBox};

/// A sync secret or API key. `Debug` and `Display` print `[REDACTED]`.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Only call this where the secret is actually sent or compared.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Compare against a presented token without short-circuiting on the
    /// first differing byte.
    pub fn matches(&self, presented: &str) -> bool {
        let expected = self.expose().as_bytes();
        let presented = presented.as_bytes();
        if expected.len() != presented.len() {
            return false;
        }
        expected
            .iter()
            .zip(presented)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
