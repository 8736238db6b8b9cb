//! Session coordinator configuration.

/// Behavior switches for [`SessionCoordinator`](crate::SessionCoordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Panic on contract violations instead of returning
    /// [`SessionError`](crate::SessionError). Meant for development builds
    /// that want assertion-style failures.
    pub strict_preconditions: bool,
    /// Whether an empty token resolved by `get_access_token` replaces the
    /// cached one.
    pub cache_empty_tokens: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            strict_preconditions: false,
            cache_empty_tokens: true,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict_preconditions(mut self, strict: bool) -> Self {
        self.strict_preconditions = strict;
        self
    }

    pub fn with_cache_empty_tokens(mut self, cache: bool) -> Self {
        self.cache_empty_tokens = cache;
        self
    }
}
