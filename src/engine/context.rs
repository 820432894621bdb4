use std::fmt;
use std::sync::{Arc, Weak};

use uuid::Uuid;

/// Identity of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Execution context a render call runs in.
///
/// A worker creates one context and passes it to every render it performs.
/// Views configured with a non-shared engine keep one engine per context,
/// until the context and all its clones are dropped.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    id: ContextId,
    name: Option<String>,
    lease: Arc<()>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: ContextId::new(),
            name: Some(name.into()),
            lease: Arc::default(),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Handle that stops upgrading once every clone of this context is gone.
    pub(crate) fn lease(&self) -> Weak<()> {
        Arc::downgrade(&self.lease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_are_distinct() {
        let a = RenderContext::new();
        let b = RenderContext::named("worker-1");
        assert_ne!(a.id(), b.id());
        assert_eq!(b.name(), Some("worker-1"));
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn test_lease_ends_with_last_clone() {
        let ctx = RenderContext::new();
        let lease = ctx.lease();
        let clone = ctx.clone();
        drop(ctx);
        assert!(lease.upgrade().is_some());
        drop(clone);
        assert!(lease.upgrade().is_none());
    }
}
