//! Session coordination across interchangeable identity providers.
//!
//! [`SessionCoordinator`] owns the active provider and the cached access token,
//! routes `login`/`logout`/`get_access_token` to the selected
//! [`AuthProvider`](ras_identity_core::AuthProvider), and fans provider
//! completions back out to its listener slots and session event subscribers.
//!
//! The coordinator is an explicitly constructed value. Build one per process
//! and pass clones of the handle to whatever needs it.

mod config;
mod coordinator;
mod error;
mod listener;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;


pub use config::SessionConfig;
pub use coordinator::{SessionCoordinator, SessionCoordinatorBuilder, SessionState};
pub use error::{SessionError, SessionResult};
pub use listener::{LoginListener, LogoutListener, SessionEvent};

// Re-export common types for convenience
pub use ras_identity_core::{AuthOutcome, AuthProvider, PresentationContext, ProviderId};
pub use ras_notify_core::SubscriptionId;
