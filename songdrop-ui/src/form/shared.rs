//! Shared handle to the form state

use std::sync::{Arc, PoisonError, RwLock};

use super::FormState;

/// Cloneable handle to the single [`FormState`]
///
/// The lock is synchronous and only held inside the closures passed to
/// [`SharedForm::read`] and [`SharedForm::write`], never across an `.await`.
#[derive(Clone, Default)]
pub struct SharedForm {
    inner: Arc<RwLock<FormState>>,
}

impl SharedForm {
    pub fn new(form: FormState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(form)),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&FormState) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut FormState) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

/// Clears the in-progress flag when dropped
///
/// Holding one for the lifetime of a submission task guarantees the flag is
/// lowered on every exit path, panics included.
pub struct SubmissionGuard {
    form: SharedForm,
}

impl SubmissionGuard {
    /// Raise the flag; `None` if a submission is already running
    pub fn acquire(form: &SharedForm) -> Option<Self> {
        if form.write(|f| f.begin_submission()) {
            Some(Self { form: form.clone() })
        } else {
            None
        }
    }
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        self.form.write(|f| f.end_submission());
    }
}
