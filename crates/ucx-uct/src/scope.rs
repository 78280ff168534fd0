//! Scoped acquisition of UCT resources.
//!
//! Every acquiring call in the hierarchy returns a [`Scoped`] value that owns
//! the matching release action. The action runs exactly once: through
//! [`Scoped::release`] when the caller wants the error, or on drop otherwise.
//! Guards declared later in a scope drop first, so nested resources unwind in
//! reverse acquisition order on every exit path.

use std::fmt;
use std::ops::Deref;

use crate::error::UctResult;

type ReleaseFn<'a, T> = Box<dyn FnOnce(T) -> UctResult<()> + 'a>;

/// A resource together with the action that releases it.
pub struct Scoped<'a, T> {
    what: &'static str,
    value: Option<T>,
    release: Option<ReleaseFn<'a, T>>,
}

impl<'a, T> Scoped<'a, T> {
    /// Pairs `value` with its release action. `what` names the resource in
    /// log messages.
    pub fn new(
        what: &'static str,
        value: T,
        release: impl FnOnce(T) -> UctResult<()> + 'a,
    ) -> Self {
        Self {
            what,
            value: Some(value),
            release: Some(Box::new(release)),
        }
    }

    /// Releases the resource now and reports the outcome.
    pub fn release(mut self) -> UctResult<()> {
        self.run_release()
    }

    /// Derives a new value from the held one while keeping the original
    /// release action. If `f` fails the resource is released immediately.
    pub fn try_map<U>(
        mut self,
        f: impl FnOnce(&T) -> UctResult<U>,
    ) -> UctResult<Scoped<'a, U>>
    where
        T: 'a,
    {
        let mapped = f(&*self)?;
        let value = self.value.take();
        let release = self.release.take();
        Ok(Scoped {
            what: self.what,
            value: Some(mapped),
            release: Some(Box::new(move |_| match (value, release) {
                (Some(value), Some(release)) => release(value),
                _ => Ok(()),
            })),
        })
    }

    /// The kind of resource held, as used in log messages.
    pub fn what(&self) -> &'static str {
        self.what
    }

    fn run_release(&mut self) -> UctResult<()> {
        match (self.value.take(), self.release.take()) {
            (Some(value), Some(release)) => release(value),
            _ => Ok(()),
        }
    }
}

impl<T> Deref for Scoped<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `run_release` empties the slot, and it consumes or drops self.
        match self.value.as_ref() {
            Some(value) => value,
            None => unreachable!("scoped {} accessed after release", self.what),
        }
    }
}

impl<T> Drop for Scoped<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.run_release() {
            log::error!("error releasing {}: {}", self.what, e);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Scoped<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scoped")
            .field("what", &self.what)
            .field("value", &self.value)
            .finish()
    }
}
