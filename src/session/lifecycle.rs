// SPDX-License-Identifier: GPL-3.0-only

//! Screen lifecycle scope
//!
//! A [`LifecycleScope`] bounds how long camera resources live. Resources are
//! adopted while the scope is active and released, newest first, when the
//! scope ends. Ending happens explicitly through [`LifecycleScope::end`] or
//! implicitly when the last handle is dropped.

use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// A resource whose lifetime is bound to a [`LifecycleScope`]
pub trait ScopedResource: Send {
    /// Short name for logging
    fn name(&self) -> &str;

    /// Release the resource. Called exactly once.
    fn release(self: Box<Self>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeState {
    Active,
    Ended,
}

struct ScopeInner {
    label: String,
    state: ScopeState,
    resources: Vec<Box<dyn ScopedResource>>,
}

impl ScopeInner {
    fn release_all(&mut self) {
        self.state = ScopeState::Ended;
        while let Some(resource) = self.resources.pop() {
            debug!(scope = %self.label, resource = resource.name(), "Releasing scoped resource");
            resource.release();
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if !self.resources.is_empty() {
            info!(scope = %self.label, "Lifecycle scope dropped - releasing remaining resources");
        }
        self.release_all();
    }
}

/// Shared handle to a screen's lifecycle
#[derive(Clone)]
pub struct LifecycleScope {
    inner: Arc<Mutex<ScopeInner>>,
}

impl LifecycleScope {
    /// Create a new, active scope
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScopeInner {
                label: label.into(),
                state: ScopeState::Active,
                resources: Vec::new(),
            })),
        }
    }

    /// Whether resources can still be adopted
    pub fn is_active(&self) -> bool {
        self.inner.lock().unwrap().state == ScopeState::Active
    }

    /// Number of resources currently owned by the scope
    pub fn resource_count(&self) -> usize {
        self.inner.lock().unwrap().resources.len()
    }

    /// Hand a resource over to the scope
    ///
    /// If the scope has already ended the resource is released immediately
    /// and `false` is returned.
    pub fn adopt(&self, resource: Box<dyn ScopedResource>) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == ScopeState::Ended {
            warn!(
                scope = %inner.label,
                resource = resource.name(),
                "Scope already ended - releasing resource immediately"
            );
            drop(inner);
            resource.release();
            return false;
        }

        debug!(scope = %inner.label, resource = resource.name(), "Adopting scoped resource");
        inner.resources.push(resource);
        true
    }

    /// End the scope and release everything it owns. Idempotent.
    pub fn end(&self) {
        let released: Vec<Box<dyn ScopedResource>> = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == ScopeState::Ended {
                return;
            }
            info!(scope = %inner.label, count = inner.resources.len(), "Ending lifecycle scope");
            inner.state = ScopeState::Ended;
            std::mem::take(&mut inner.resources)
        };

        // Release outside the lock; a resource may call back into the scope
        for resource in released.into_iter().rev() {
            debug!(resource = resource.name(), "Releasing scoped resource");
            resource.release();
        }
    }
}

impl std::fmt::Debug for LifecycleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("LifecycleScope")
            .field("label", &inner.label)
            .field("state", &inner.state)
            .field("resources", &inner.resources.len())
            .finish()
    }
}
