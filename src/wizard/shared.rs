//! Thread-shared engine handle
//!
//! The engines themselves are plain `&mut self` state machines. When a UI
//! thread drives the wizard while a worker thread reports progress, both hold
//! a [`Shared`] handle and every access goes through one mutex, so mutations
//! are serialized and reads never observe a half-applied transition.

use std::sync::{Arc, Mutex};

use crate::wizard::error::WizardError;

/// Cloneable, mutex-guarded handle to a wizard engine (or driver).
#[derive(Debug, Default)]
pub struct Shared<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(value)),
        }
    }

    /// Run `f` with exclusive access.
    ///
    /// # Errors
    ///
    /// - `LockPoisoned` if another thread panicked while holding the lock
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, WizardError> {
        let mut guard = self.inner.lock().map_err(|_| WizardError::LockPoisoned)?;
        Ok(f(&mut guard))
    }

    /// Like [`Shared::with`] for closures that already return a wizard result.
    pub fn try_with<R>(
        &self,
        f: impl FnOnce(&mut T) -> Result<R, WizardError>,
    ) -> Result<R, WizardError> {
        self.with(f)?
    }
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
