//! Mutual-exclusion wrapper for state shared across threads.
//!
//! Every read and write goes through [`Guarded::with`]: acquire, run the
//! transformation, release. No reference to the inner value escapes the
//! closure, so no thread ever observes a half-updated value.

use parking_lot::Mutex;

/// A value that can only be touched inside a critical section.
#[derive(Debug, Default)]
pub struct Guarded<T> {
    inner: Mutex<T>,
}

impl<T> Guarded<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Run `f` with exclusive access to the value and return its result.
    ///
    /// Callers must not acquire another guard from inside `f`.
    pub fn with<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
        let mut guard = self.inner.lock();
        f(&mut *guard)
    }
}

impl<T: Clone> Guarded<T> {
    /// A copy of the current value, taken under the guard.
    pub fn snapshot(&self) -> T {
        self.with(|value| value.clone())
    }
}
