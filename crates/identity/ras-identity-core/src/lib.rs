//! Core identity provider traits and types.
//!
//! Every identity backend implements [`AuthProvider`] and reports the result of
//! each login or logout as an [`AuthOutcome`] through the [`CompletionSink`] it
//! was attached to.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

mod context;
mod provider;
pub mod validation;

pub use context::PresentationContext;
pub use provider::{AuthCompletion, AuthProvider, CompletionSink, SinkSlot, TokenCallback};
pub use validation::{EmailValidationError, validate_email};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Shared, type-erased error carried by [`AuthOutcome::Failed`]
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Identity backends the session layer can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ProviderId {
    Facebook,
    Google,
}

impl ProviderId {
    pub const ALL: &'static [ProviderId] = &[ProviderId::Facebook, ProviderId::Google];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Facebook => "facebook",
            ProviderId::Google => "google",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = IdentityError;

    fn from_str(s: &str) -> IdentityResult<Self> {
        ProviderId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| IdentityError::UnknownProvider(s.to_string()))
    }
}

/// Result of a single login or logout attempt.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// The user backed out of the flow
    Cancelled,
    /// The backend reported an error
    Failed(SharedError),
    /// The flow completed with the given provider
    Succeeded(ProviderId),
}

impl AuthOutcome {
    pub fn failed<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        AuthOutcome::Failed(Arc::new(error))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Succeeded(_))
    }

    /// The provider carried by a successful outcome
    pub fn provider_id(&self) -> Option<ProviderId> {
        match self {
            AuthOutcome::Succeeded(id) => Some(*id),
            AuthOutcome::Cancelled | AuthOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            AuthOutcome::Failed(error) => Some(error.as_ref()),
            AuthOutcome::Cancelled | AuthOutcome::Succeeded(_) => None,
        }
    }
}

impl fmt::Display for AuthOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthOutcome::Cancelled => write!(f, "cancelled"),
            AuthOutcome::Failed(error) => write!(f, "failed: {}", error),
            AuthOutcome::Succeeded(id) => write!(f, "succeeded with {}", id),
        }
    }
}
