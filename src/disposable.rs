//! Cancellation handles.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Action = Box<dyn FnOnce() + Send>;

struct DisposableInner {
    disposed: AtomicBool,
    children: Mutex<Vec<Action>>,
}

/// An idempotent cancellation handle.
///
/// A `Disposable` is a composite: it owns zero or more children (cleanup
/// actions or other disposables) and runs each of them exactly once, the
/// first time [`dispose`](Disposable::dispose) is called. Handles are cheap
/// to clone; all clones share the same state.
#[derive(Clone)]
pub struct Disposable {
    inner: Arc<DisposableInner>,
}

impl Disposable {
    /// Create an empty, live handle.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DisposableInner {
                disposed: AtomicBool::new(false),
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Create a handle that runs `action` when disposed.
    pub fn from_action(action: impl FnOnce() + Send + 'static) -> Self {
        let disposable = Self::new();
        disposable.add_action(action);
        disposable
    }

    /// Create a handle that is already disposed.
    pub fn disposed() -> Self {
        let disposable = Self::new();
        disposable.dispose();
        disposable
    }

    /// Whether [`dispose`](Disposable::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Register a cleanup action.
    ///
    /// If the handle is already disposed, the action runs immediately.
    pub fn add_action(&self, action: impl FnOnce() + Send + 'static) {
        {
            let mut children = self.inner.children.lock();
            if !self.is_disposed() {
                children.push(Box::new(action));
                return;
            }
        }
        action();
    }

    /// Register a child handle, disposed together with this one.
    pub fn add(&self, child: Disposable) {
        if Arc::ptr_eq(&self.inner, &child.inner) {
            return;
        }
        self.add_action(move || child.dispose());
    }

    /// Dispose this handle and every child. Only the first call has an effect.
    pub fn dispose(&self) {
        let children = {
            let mut children = self.inner.children.lock();
            if self.inner.disposed.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut *children)
        };

        tracing::trace!(children = children.len(), "disposing");
        for child in children {
            child();
        }
    }

    /// Wrap this handle so it is disposed when the wrapper is dropped.
    pub fn scoped(self) -> ScopedDisposable {
        ScopedDisposable { inner: self }
    }
}

impl Default for Disposable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Disposes the wrapped [`Disposable`] when dropped.
#[must_use = "dropping a ScopedDisposable disposes it immediately"]
#[derive(Debug)]
pub struct ScopedDisposable {
    inner: Disposable,
}

impl ScopedDisposable {
    /// The wrapped handle.
    pub fn handle(&self) -> &Disposable {
        &self.inner
    }
}

impl Drop for ScopedDisposable {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        (count, move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_dispose_runs_children_once() {
        let (count, action) = counter();
        let disposable = Disposable::from_action(action);

        assert!(!disposable.is_disposed());
        disposable.dispose();
        disposable.dispose();
        disposable.clone().dispose();

        assert!(disposable.is_disposed());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_add_after_dispose_runs_immediately() {
        let disposable = Disposable::disposed();
        let (count, action) = counter();

        disposable.add_action(action);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_children_propagate() {
        let parent = Disposable::new();
        let child = Disposable::new();
        let (count, action) = counter();
        child.add_action(action);
        parent.add(child.clone());

        parent.dispose();
        assert!(child.is_disposed());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Disposing the child again must not re-run its actions.
        child.dispose();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_adding_self_is_ignored() {
        let disposable = Disposable::new();
        disposable.add(disposable.clone());
        disposable.dispose();
        assert!(disposable.is_disposed());
    }

    #[test]
    fn test_child_may_touch_parent_while_disposing() {
        let parent = Disposable::new();
        let parent_clone = parent.clone();
        let (count, action) = counter();
        parent.add_action(move || {
            assert!(parent_clone.is_disposed());
            parent_clone.add_action(action);
        });

        parent.dispose();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scoped_disposes_on_drop() {
        let (count, action) = counter();
        let disposable = Disposable::from_action(action);
        {
            let _scoped = disposable.clone().scoped();
        }
        assert!(disposable.is_disposed());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
