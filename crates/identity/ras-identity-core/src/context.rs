//! Opaque presentation context handed through to providers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Whatever a provider needs to present its login flow (a window handle,
/// a browser launcher, a terminal prompt...).
///
/// The session layer passes it through untouched; only the provider that
/// knows the concrete type can look inside.
#[derive(Clone, Default)]
pub struct PresentationContext {
    inner: Option<Arc<dyn Any + Send + Sync>>,
}

impl PresentationContext {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            inner: Some(Arc::new(value)),
        }
    }

    /// Context for providers that present nothing
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.inner.is_none()
    }

    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: Any,
    {
        self.inner.as_deref().and_then(|value| value.downcast_ref::<T>())
    }
}

impl fmt::Debug for PresentationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentationContext")
            .field("present", &self.inner.is_some())
            .finish()
    }
}
