//! Contract violations reported by the session coordinator.

use ras_identity_core::ProviderId;
use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

/// Caller bugs, not runtime failures. Provider failures travel as
/// [`AuthOutcome`](ras_identity_core::AuthOutcome) values instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Provider not registered: {0}")]
    UnknownProvider(ProviderId),

    #[error("No active provider")]
    NoActiveProvider,

    #[error("Provider {active} is already active, refusing to set {requested:?}")]
    ProviderAlreadyActive {
        active: ProviderId,
        requested: Option<ProviderId>,
    },

    #[error("Access token is not cached, call get_access_token instead")]
    NoCachedToken,
}
