//! Submission controller
//!
//! Two entry points share one pipeline: [`FormInstance::submit`] hands the
//! validated values to the form's `on_submit`, while
//! [`FormInstance::handle_native_submit`] is meant for a rendering layer
//! intercepting its own submit action and hands them to `on_finish`
//! instead. Both raise `is_submitting`, validate every ruled field, report
//! failures to `on_validation_failed` and return the same errors.

use super::error::SubmitError;
use super::store::{FormInner, FormInstance};
use super::value::Values;
use std::future::Future;

/// Keeps `is_submitting` raised while any submission is in flight
struct SubmittingGuard<'a> {
    inner: &'a FormInner,
}

impl<'a> SubmittingGuard<'a> {
    fn enter(inner: &'a FormInner) -> Self {
        inner.state().submitting += 1;
        Self { inner }
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.state();
        state.submitting = state.submitting.saturating_sub(1);
    }
}

impl FormInstance {
    /// Validate every ruled field, then await `on_submit` with the values.
    ///
    /// `on_submit` is not called when validation fails; the validation error
    /// is returned instead.
    pub async fn submit(&self) -> Result<(), SubmitError> {
        let handler = self.inner.on_submit.clone();
        self.run_submission(|values| async move {
            match handler {
                Some(handler) => handler(values).await,
                None => Ok(()),
            }
        })
        .await
    }

    /// Form-level submit: same pipeline as [`submit`](Self::submit), but the
    /// values go to `on_finish` and `on_submit` is never invoked.
    pub async fn handle_native_submit<F, Fut>(&self, on_finish: F) -> Result<(), SubmitError>
    where
        F: FnOnce(Values) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        self.run_submission(on_finish).await
    }

    async fn run_submission<F, Fut>(&self, on_success: F) -> Result<(), SubmitError>
    where
        F: FnOnce(Values) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let _submitting = SubmittingGuard::enter(&self.inner);
        tracing::debug!(form_id = %self.inner.id, "submitting form");

        match self.validate_fields().await {
            Ok(values) => on_success(values).await.map_err(|err| {
                tracing::debug!(form_id = %self.inner.id, error = %err, "submit handler failed");
                SubmitError::Handler(err)
            }),
            Err(err) => {
                if let Some(hook) = &self.inner.on_validation_failed {
                    hook(&err.error_fields);
                }
                Err(err.into())
            }
        }
    }
}
