//! The session coordinator and its state.

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::listener::{LoginListener, LogoutListener, SessionEvent};
use parking_lot::Mutex;
use ras_identity_core::{
    AuthCompletion, AuthOutcome, AuthProvider, CompletionSink, PresentationContext, ProviderId,
};
use ras_notify_core::{MulticastNotifier, SubscriptionId};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use url::Url;

/// Point-in-time copy of the coordinator's session fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Provider of the authenticated session, if any
    pub active_provider: Option<ProviderId>,
    /// Provider whose login flow was started and has not completed yet
    pub pending_provider: Option<ProviderId>,
    /// Last token seen from a login completion or a token fetch
    pub cached_access_token: Option<String>,
}

#[derive(Default)]
struct Listeners {
    login: Option<Weak<dyn LoginListener>>,
    logout: Option<Weak<dyn LogoutListener>>,
}

struct Inner {
    self_ref: Weak<Inner>,
    config: SessionConfig,
    providers: Vec<Arc<dyn AuthProvider>>,
    state: Mutex<SessionState>,
    listeners: Mutex<Listeners>,
    events: MulticastNotifier<SessionEvent>,
}

/// Routes session operations to the selected provider and owns the
/// resulting session state.
///
/// Cloning yields another handle to the same session. The coordinator
/// assumes a single logical owner issuing one operation at a time: starting a
/// second `login` while one is in flight is the caller's problem, not
/// something the coordinator queues or rejects.
///
/// No internal lock is held while a provider, listener or event subscriber
/// runs, so any of them may call back into the coordinator.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

impl SessionCoordinator {
    pub fn builder() -> SessionCoordinatorBuilder {
        SessionCoordinatorBuilder::new()
    }

    /// Start a login flow with `provider_id`.
    ///
    /// The outcome arrives later through the login listener. The provider
    /// becomes *pending*; it only becomes active once it reports success.
    pub fn login(
        &self,
        provider_id: ProviderId,
        context: PresentationContext,
    ) -> SessionResult<()> {
        let provider = self
            .inner
            .provider(provider_id)
            .ok_or_else(|| self.inner.violation(SessionError::UnknownProvider(provider_id)))?;

        self.inner.state.lock().pending_provider = Some(provider_id);

        info!(provider = %provider_id, "Starting login");
        provider.login(context);
        Ok(())
    }

    /// Start a logout flow with the active provider.
    pub fn logout(&self) -> SessionResult<()> {
        let active = self.inner.state.lock().active_provider;
        let Some(active) = active else {
            return Err(self.inner.violation(SessionError::NoActiveProvider));
        };

        let provider = self
            .inner
            .provider(active)
            .ok_or_else(|| self.inner.violation(SessionError::UnknownProvider(active)))?;

        info!(provider = %active, "Starting logout");
        provider.logout();
        Ok(())
    }

    /// Resolve a fresh access token from the active provider.
    ///
    /// Without an active provider `completion` runs immediately with `None`.
    /// Otherwise the resolved token is cached before `completion` runs.
    pub fn get_access_token<F>(&self, completion: F)
    where
        F: FnOnce(Option<String>) + Send + 'static,
    {
        let active = self.inner.state.lock().active_provider;
        let Some(provider) = active.and_then(|id| self.inner.provider(id)) else {
            debug!("No active provider, access token resolves empty");
            completion(None);
            return;
        };

        let inner = self.inner.self_ref.clone();
        provider.access_token(Box::new(move |token| {
            if let Some(inner) = inner.upgrade() {
                inner.cache_resolved_token(token.clone());
            }
            completion(token);
        }));
    }

    /// Async form of [`get_access_token`](Self::get_access_token).
    ///
    /// Resolves to `None` if the provider drops the callback without calling it.
    pub async fn access_token(&self) -> Option<String> {
        let (tx, rx) = oneshot::channel();
        self.get_access_token(move |token| {
            let _ = tx.send(token);
        });
        rx.await.ok().flatten()
    }

    /// The last cached token.
    ///
    /// Only guaranteed after a fresh login: a provider may hold a valid token
    /// the coordinator has not seen yet. Prefer
    /// [`get_access_token`](Self::get_access_token) when a token is required.
    pub fn current_access_token(&self) -> SessionResult<String> {
        let token = self.inner.state.lock().cached_access_token.clone();
        token.ok_or_else(|| self.inner.violation(SessionError::NoCachedToken))
    }

    pub fn active_provider_id(&self) -> Option<ProviderId> {
        self.inner.state.lock().active_provider
    }

    /// Seed the active provider, e.g. from an identity persisted by a
    /// previous run.
    ///
    /// Only valid while no provider is active. Anything else would silently
    /// replace a live session, so it is rejected as a contract violation.
    pub fn set_active_provider_id(&self, provider_id: Option<ProviderId>) -> SessionResult<()> {
        // Registry lookup runs provider code, so it happens before the lock.
        let registered = provider_id.is_none_or(|id| self.inner.provider(id).is_some());

        let rejected = {
            let mut state = self.inner.state.lock();
            match state.active_provider {
                Some(active) => Some(SessionError::ProviderAlreadyActive {
                    active,
                    requested: provider_id,
                }),
                None => match provider_id {
                    Some(id) if !registered => Some(SessionError::UnknownProvider(id)),
                    Some(id) => {
                        state.active_provider = Some(id);
                        None
                    }
                    None => None,
                },
            }
        };

        if let Some(error) = rejected {
            return Err(self.inner.violation(error));
        }
        if let Some(provider_id) = provider_id {
            info!(provider = %provider_id, "Active provider restored");
        }
        Ok(())
    }

    pub fn pending_provider_id(&self) -> Option<ProviderId> {
        self.inner.state.lock().pending_provider
    }

    pub fn is_authenticated(&self) -> bool {
        self.active_provider_id().is_some()
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.lock().clone()
    }

    /// Registered providers, in registration order
    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.inner
            .providers
            .iter()
            .map(|provider| provider.provider_id())
            .collect()
    }

    /// Offer an inbound redirect URL to each provider until one claims it.
    pub fn handle_redirect_url(&self, url: &Url) -> bool {
        match self
            .inner
            .providers
            .iter()
            .find(|provider| provider.handle_redirect(url))
        {
            Some(provider) => {
                debug!(provider = %provider.provider_id(), %url, "Redirect handled");
                true
            }
            None => {
                warn!(%url, "No provider claimed redirect");
                false
            }
        }
    }

    /// Install the login listener, replacing any previous one.
    ///
    /// Only a weak reference is kept.
    pub fn set_login_listener<L>(&self, listener: &Arc<L>)
    where
        L: LoginListener + 'static,
    {
        let listener: Weak<L> = Arc::downgrade(listener);
        let listener: Weak<dyn LoginListener> = listener;
        self.inner.listeners.lock().login = Some(listener);
    }

    pub fn clear_login_listener(&self) {
        self.inner.listeners.lock().login = None;
    }

    /// Install the logout listener, replacing any previous one.
    ///
    /// Only a weak reference is kept.
    pub fn set_logout_listener<L>(&self, listener: &Arc<L>)
    where
        L: LogoutListener + 'static,
    {
        let listener: Weak<L> = Arc::downgrade(listener);
        let listener: Weak<dyn LogoutListener> = listener;
        self.inner.listeners.lock().logout = Some(listener);
    }

    pub fn clear_logout_listener(&self) {
        self.inner.listeners.lock().logout = None;
    }

    /// Subscribe to every login and logout completion for as long as `owner`
    /// lives.
    pub fn subscribe_events<O, F>(&self, owner: &Arc<O>, handler: F) -> SubscriptionId
    where
        O: Any + Send + Sync,
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(owner, handler)
    }

    pub fn unsubscribe_events<O>(&self, owner: &Arc<O>) -> usize
    where
        O: ?Sized,
    {
        self.inner.events.unregister(owner)
    }
}

impl fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let providers = self.provider_ids();
        let state = self.inner.state.lock();
        f.debug_struct("SessionCoordinator")
            .field("providers", &providers)
            .field("active_provider", &state.active_provider)
            .field("pending_provider", &state.pending_provider)
            .field("has_token", &state.cached_access_token.is_some())
            .finish()
    }
}

impl Inner {
    fn provider(&self, provider_id: ProviderId) -> Option<Arc<dyn AuthProvider>> {
        self.providers
            .iter()
            .find(|provider| provider.provider_id() == provider_id)
            .cloned()
    }

    fn violation(&self, error: SessionError) -> SessionError {
        error!(%error, "Session contract violation");
        if self.config.strict_preconditions {
            panic!("session contract violation: {error}");
        }
        error
    }

    fn cache_resolved_token(&self, token: Option<String>) {
        if token.is_none() && !self.config.cache_empty_tokens {
            debug!("Provider resolved no token, keeping cached token");
            return;
        }
        debug!(present = token.is_some(), "Caching resolved access token");
        self.state.lock().cached_access_token = token;
    }

    fn handle(&self) -> Option<SessionCoordinator> {
        self.self_ref
            .upgrade()
            .map(|inner| SessionCoordinator { inner })
    }

    fn dispatch(&self, event: SessionEvent) {
        let Some(coordinator) = self.handle() else {
            return;
        };

        match &event {
            SessionEvent::LoginCompleted(outcome) => {
                let listener = self.listeners.lock().login.clone();
                if let Some(listener) = listener.and_then(|weak| weak.upgrade()) {
                    listener.login_did_complete(&coordinator, outcome);
                }
            }
            SessionEvent::LogoutCompleted(outcome) => {
                let listener = self.listeners.lock().logout.clone();
                if let Some(listener) = listener.and_then(|weak| weak.upgrade()) {
                    listener.logout_did_complete(&coordinator, outcome);
                }
            }
        }

        self.events.notify(&event);
    }
}

impl AuthCompletion for Inner {
    fn complete_login(&self, outcome: AuthOutcome, access_token: Option<String>) {
        let registered = match &outcome {
            AuthOutcome::Succeeded(provider_id) => self.provider(*provider_id).is_some(),
            AuthOutcome::Cancelled | AuthOutcome::Failed(_) => false,
        };

        {
            let mut state = self.state.lock();
            state.pending_provider = None;

            match &outcome {
                AuthOutcome::Succeeded(provider_id) if !registered => {
                    warn!(
                        provider = %provider_id,
                        "Login succeeded for an unregistered provider, not committing"
                    );
                }
                AuthOutcome::Succeeded(provider_id) => {
                    // Bypasses the set_active_provider_id guard. Overlapping
                    // logins may switch identity without a logout.
                    if let Some(previous) = state.active_provider.filter(|p| p != provider_id) {
                        warn!(
                            previous = %previous,
                            provider = %provider_id,
                            "Login success replaced an active provider without logout"
                        );
                    }
                    state.active_provider = Some(*provider_id);
                    info!(provider = %provider_id, "Login committed");
                }
                AuthOutcome::Cancelled | AuthOutcome::Failed(_) => {
                    debug!(%outcome, "Login did not succeed, active provider unchanged");
                }
            }

            state.cached_access_token = access_token;
        }

        self.dispatch(SessionEvent::LoginCompleted(outcome));
    }

    fn complete_logout(&self, outcome: AuthOutcome) {
        let previous = {
            let mut state = self.state.lock();
            state.cached_access_token = None;
            state.active_provider.take()
        };

        info!(previous = ?previous, %outcome, "Logout completed");
        self.dispatch(SessionEvent::LogoutCompleted(outcome));
    }
}

/// Builds a [`SessionCoordinator`] over a fixed set of providers.
#[derive(Default)]
pub struct SessionCoordinatorBuilder {
    config: SessionConfig,
    providers: Vec<Arc<dyn AuthProvider>>,
}

impl SessionCoordinatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a provider. A later provider with the same id replaces the
    /// earlier one in place.
    pub fn provider(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        let provider_id = provider.provider_id();
        match self
            .providers
            .iter_mut()
            .find(|existing| existing.provider_id() == provider_id)
        {
            Some(existing) => {
                warn!(provider = %provider_id, "Replacing previously registered provider");
                *existing = provider;
            }
            None => self.providers.push(provider),
        }
        self
    }

    pub fn build(self) -> SessionCoordinator {
        let SessionCoordinatorBuilder { config, providers } = self;

        let inner = Arc::new_cyclic(|self_ref| Inner {
            self_ref: self_ref.clone(),
            config,
            providers,
            state: Mutex::new(SessionState::default()),
            listeners: Mutex::new(Listeners::default()),
            events: MulticastNotifier::new(),
        });

        for provider in &inner.providers {
            provider.attach(CompletionSink::new(&inner));
        }

        debug!(providers = inner.providers.len(), "Session coordinator ready");
        SessionCoordinator { inner }
    }
}
