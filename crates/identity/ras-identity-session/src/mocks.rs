//! Scripted identity provider for exercising the coordinator.
//!
//! [`ScriptedProvider`] reports whatever outcome it was told to report, either
//! straight away from inside `login`/`logout`/`access_token` or later, when the
//! test calls [`ScriptedProvider::fire_pending`].

use parking_lot::Mutex;
use ras_identity_core::{
    AuthOutcome, AuthProvider, CompletionSink, PresentationContext, ProviderId, SinkSlot,
    TokenCallback,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

#[derive(Default)]
struct Script {
    login_result: Option<AuthOutcome>,
    logout_result: Option<AuthOutcome>,
    access_token: Option<String>,
    redirect_scheme: Option<String>,
    deferred: bool,
}

enum PendingCall {
    Login,
    Logout,
    Token(TokenCallback),
}

/// Test double for [`AuthProvider`].
///
/// With no login or logout result scripted, the matching flow never
/// completes, which models a flow still in flight.
pub struct ScriptedProvider {
    id: ProviderId,
    sink: SinkSlot,
    script: Mutex<Script>,
    pending: Mutex<VecDeque<PendingCall>>,
    last_context: Mutex<Option<PresentationContext>>,
    login_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    token_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(id: ProviderId) -> Self {
        Self {
            id,
            sink: SinkSlot::new(),
            script: Mutex::new(Script::default()),
            pending: Mutex::new(VecDeque::new()),
            last_context: Mutex::new(None),
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            token_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_login_result(&self, outcome: Option<AuthOutcome>) {
        self.script.lock().login_result = outcome;
    }

    pub fn set_logout_result(&self, outcome: Option<AuthOutcome>) {
        self.script.lock().logout_result = outcome;
    }

    pub fn set_access_token(&self, token: Option<&str>) {
        self.script.lock().access_token = token.map(str::to_string);
    }

    /// Claim redirect URLs with this scheme
    pub fn set_redirect_scheme(&self, scheme: Option<&str>) {
        self.script.lock().redirect_scheme = scheme.map(str::to_string);
    }

    /// Queue calls until [`fire_pending`](Self::fire_pending) instead of
    /// completing them inline
    pub fn set_deferred(&self, deferred: bool) {
        self.script.lock().deferred = deferred;
    }

    /// Complete every queued call in arrival order. Returns how many ran.
    pub fn fire_pending(&self) -> usize {
        let calls: Vec<PendingCall> = self.pending.lock().drain(..).collect();
        let count = calls.len();
        for call in calls {
            self.complete(call);
        }
        count
    }

    /// Forget queued calls without completing them
    pub fn drop_pending(&self) -> usize {
        self.pending.lock().drain(..).count()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Report a login completion the coordinator did not ask for
    pub fn report_login(&self, outcome: AuthOutcome, access_token: Option<&str>) {
        self.sink
            .get()
            .complete_login(outcome, access_token.map(str::to_string));
    }

    /// Report a logout completion the coordinator did not ask for
    pub fn report_logout(&self, outcome: AuthOutcome) {
        self.sink.get().complete_logout(outcome);
    }

    pub fn is_attached(&self) -> bool {
        self.sink.get().is_attached()
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn last_context(&self) -> Option<PresentationContext> {
        self.last_context.lock().clone()
    }

    fn dispatch(&self, call: PendingCall) {
        let deferred = self.script.lock().deferred;
        if deferred {
            self.pending.lock().push_back(call);
        } else {
            self.complete(call);
        }
    }

    fn complete(&self, call: PendingCall) {
        // Read the script first so no lock is held while the sink runs
        let (login_result, logout_result, access_token) = {
            let script = self.script.lock();
            (
                script.login_result.clone(),
                script.logout_result.clone(),
                script.access_token.clone(),
            )
        };

        match call {
            PendingCall::Login => {
                if let Some(outcome) = login_result {
                    self.sink.get().complete_login(outcome, access_token);
                }
            }
            PendingCall::Logout => {
                if let Some(outcome) = logout_result {
                    self.sink.get().complete_logout(outcome);
                }
            }
            PendingCall::Token(callback) => callback(access_token),
        }
    }
}

impl AuthProvider for ScriptedProvider {
    fn provider_id(&self) -> ProviderId {
        self.id
    }

    fn attach(&self, sink: CompletionSink) {
        self.sink.set(sink);
    }

    fn login(&self, context: PresentationContext) {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock() = Some(context);
        self.dispatch(PendingCall::Login);
    }

    fn logout(&self) {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.dispatch(PendingCall::Logout);
    }

    fn access_token(&self, callback: TokenCallback) {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        self.dispatch(PendingCall::Token(callback));
    }

    fn handle_redirect(&self, url: &Url) -> bool {
        self.script.lock().redirect_scheme.as_deref() == Some(url.scheme())
    }
}
