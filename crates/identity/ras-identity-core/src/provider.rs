//! The contract every identity backend implements.

use crate::{AuthOutcome, PresentationContext, ProviderId};
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;
use url::Url;

/// Receives a token exactly once. `None` means no token is available.
pub type TokenCallback = Box<dyn FnOnce(Option<String>) + Send>;

/// Where providers report completed login and logout flows.
///
/// Implemented by the session layer, never by providers.
pub trait AuthCompletion: Send + Sync {
    /// A login flow finished, with the access token it produced if any
    fn complete_login(&self, outcome: AuthOutcome, access_token: Option<String>);

    /// A logout flow finished
    fn complete_logout(&self, outcome: AuthOutcome);
}

/// Cloneable handle a provider uses to report completions.
///
/// The target is held weakly, so a provider can never keep the session layer
/// alive. Reports made after the target is gone are dropped.
#[derive(Clone)]
pub struct CompletionSink {
    target: Weak<dyn AuthCompletion>,
}

impl CompletionSink {
    pub fn new<C>(target: &Arc<C>) -> Self
    where
        C: AuthCompletion + 'static,
    {
        let target: Weak<C> = Arc::downgrade(target);
        let target: Weak<dyn AuthCompletion> = target;
        Self { target }
    }

    pub fn from_weak(target: Weak<dyn AuthCompletion>) -> Self {
        Self { target }
    }

    /// A sink that is not connected to anything
    pub fn detached() -> Self {
        let target: Weak<dyn AuthCompletion> = Weak::<Detached>::new();
        Self { target }
    }

    pub fn is_attached(&self) -> bool {
        self.target.strong_count() > 0
    }

    pub fn complete_login(&self, outcome: AuthOutcome, access_token: Option<String>) {
        match self.target.upgrade() {
            Some(target) => target.complete_login(outcome, access_token),
            None => debug!(%outcome, "Dropping login completion, sink is detached"),
        }
    }

    pub fn complete_logout(&self, outcome: AuthOutcome) {
        match self.target.upgrade() {
            Some(target) => target.complete_logout(outcome),
            None => debug!(%outcome, "Dropping logout completion, sink is detached"),
        }
    }
}

impl Default for CompletionSink {
    fn default() -> Self {
        Self::detached()
    }
}

impl fmt::Debug for CompletionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSink")
            .field("attached", &self.is_attached())
            .finish()
    }
}

struct Detached;

impl AuthCompletion for Detached {
    fn complete_login(&self, _outcome: AuthOutcome, _access_token: Option<String>) {}
    fn complete_logout(&self, _outcome: AuthOutcome) {}
}

/// Interior-mutable storage for the sink a provider was attached to.
///
/// Providers embed one of these to implement [`AuthProvider::attach`].
#[derive(Debug, Default)]
pub struct SinkSlot {
    sink: RwLock<CompletionSink>,
}

impl SinkSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, sink: CompletionSink) {
        *self.sink.write() = sink;
    }

    pub fn get(&self) -> CompletionSink {
        self.sink.read().clone()
    }
}

/// An identity backend.
///
/// All entry points return immediately; results arrive later through the
/// attached [`CompletionSink`] or the supplied callback, on whatever execution
/// context the backend uses.
///
/// Implementations must report exactly one [`AuthOutcome`] for every call to
/// [`login`](Self::login) and [`logout`](Self::logout), and must invoke the
/// [`TokenCallback`] given to [`access_token`](Self::access_token). Retries,
/// timeouts and cancellation are the implementation's business.
pub trait AuthProvider: Send + Sync {
    /// Which backend this is
    fn provider_id(&self) -> ProviderId;

    /// Connect the provider to the sink it must report completions to
    fn attach(&self, sink: CompletionSink);

    /// Start the backend's login flow
    fn login(&self, context: PresentationContext);

    /// Start the backend's logout flow
    fn logout(&self);

    /// Resolve the backend's current access token.
    ///
    /// Absence is reported as `None`, never as an error.
    fn access_token(&self, callback: TokenCallback);

    /// Offer an inbound redirect URL (e.g. an OAuth callback) to the provider.
    ///
    /// Returns `true` if the provider claimed it.
    fn handle_redirect(&self, _url: &Url) -> bool {
        false
    }
}
