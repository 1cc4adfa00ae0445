//! Access credentials for the catalog service
//!
//! A [`CredentialProvider`] only answers one question: is there a usable credential right
//! now, and if so what `Authorization` header value carries it. Obtaining and storing the
//! credential (OAuth exchange, keychain) happens elsewhere.

use std::sync::{Arc, RwLock};

/// Source of the `Authorization` header for catalog requests
pub trait CredentialProvider: Send + Sync {
    /// Header value to send, or `None` when no credential is available
    fn authorization(&self) -> Option<String>;

    /// Whether a credential is currently available
    fn is_authenticated(&self) -> bool {
        self.authorization().is_some()
    }
}

/// Fixed personal access token (`Authorization: Discogs token=...`)
#[derive(Clone)]
pub struct PersonalToken {
    token: String,
}

impl PersonalToken {
    /// Wrap a personal access token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for PersonalToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonalToken")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl CredentialProvider for PersonalToken {
    fn authorization(&self) -> Option<String> {
        let token = self.token.trim();
        if token.is_empty() {
            None
        } else {
            Some(format!("Discogs token={token}"))
        }
    }
}

/// Credential that can be swapped at runtime (sign-in, sign-out)
///
/// Holds a complete header value, so any scheme (personal token, pre-signed OAuth header)
/// can be installed. Mutating it while a collection fetch is running is the caller's
/// responsibility to avoid.
#[derive(Clone, Default)]
pub struct SharedCredentials {
    header: Arc<RwLock<Option<String>>>,
}

impl SharedCredentials {
    /// Start signed out
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a personal access token
    pub fn set_token(&self, token: impl Into<String>) {
        let header = PersonalToken::new(token).authorization();
        self.set_header(header);
    }

    /// Install a raw `Authorization` header value, or `None` to sign out
    pub fn set_header(&self, header: Option<String>) {
        match self.header.write() {
            Ok(mut guard) => *guard = header,
            Err(poisoned) => *poisoned.into_inner() = header,
        }
    }

    /// Forget the credential
    pub fn sign_out(&self) {
        tracing::info!("Clearing catalog credentials");
        self.set_header(None);
    }
}

impl std::fmt::Debug for SharedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCredentials")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl CredentialProvider for SharedCredentials {
    fn authorization(&self) -> Option<String> {
        match self.header.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Provider that never has a credential
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn authorization(&self) -> Option<String> {
        None
    }
}
