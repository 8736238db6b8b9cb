//! Completion listeners and session events.

use crate::SessionCoordinator;
use ras_identity_core::AuthOutcome;

/// Receives the outcome of every login flow.
pub trait LoginListener: Send + Sync {
    fn login_did_complete(&self, coordinator: &SessionCoordinator, outcome: &AuthOutcome);
}

/// Receives the outcome of every logout flow.
pub trait LogoutListener: Send + Sync {
    fn logout_did_complete(&self, coordinator: &SessionCoordinator, outcome: &AuthOutcome);
}

impl<F> LoginListener for F
where
    F: Fn(&SessionCoordinator, &AuthOutcome) + Send + Sync,
{
    fn login_did_complete(&self, coordinator: &SessionCoordinator, outcome: &AuthOutcome) {
        self(coordinator, outcome)
    }
}

impl<F> LogoutListener for F
where
    F: Fn(&SessionCoordinator, &AuthOutcome) + Send + Sync,
{
    fn logout_did_complete(&self, coordinator: &SessionCoordinator, outcome: &AuthOutcome) {
        self(coordinator, outcome)
    }
}

/// Published to event subscribers after the matching listener slot ran
#[derive(Debug, Clone)]
pub enum SessionEvent {
    LoginCompleted(AuthOutcome),
    LogoutCompleted(AuthOutcome),
}

impl SessionEvent {
    pub fn outcome(&self) -> &AuthOutcome {
        match self {
            SessionEvent::LoginCompleted(outcome) | SessionEvent::LogoutCompleted(outcome) => {
                outcome
            }
        }
    }
}
