//! Form store: values, errors, touched flags and watchers of one form
//!
//! A `FormInstance` is a cheap handle around shared state so a field
//! binding, a submit path and a pending validation can all work on the same
//! form. The lock is only held for plain reads and writes; it is released
//! before any `.await` and before user callbacks run.

use super::error::{AggregateValidationError, FieldErrors};
use super::evaluator::Evaluator;
use super::messages::Messages;
use super::rules::Rule;
use super::value::{self, Values};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use uuid::Uuid;

/// Called with the new value of a watched field
pub type WatchCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Called once per `set_values` with `(changed, all)`
pub type ValuesChangeHandler = Arc<dyn Fn(&Values, &Values) + Send + Sync>;

/// Called with every failing field when a submission does not validate
pub type ValidationFailedHandler = Arc<dyn Fn(&[FieldErrors]) + Send + Sync>;

/// Receives the validated values of a successful submission
pub type SubmitHandler =
    Arc<dyn Fn(Values) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Everything needed to create a form
#[derive(Clone, Default)]
pub struct FormOptions {
    initial_values: Values,
    rules: Vec<(String, Vec<Rule>)>,
    on_submit: Option<SubmitHandler>,
    on_values_change: Option<ValuesChangeHandler>,
    on_validation_failed: Option<ValidationFailedHandler>,
    messages: Messages,
}

impl FormOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial values as a JSON object; other JSON shapes are treated as empty
    pub fn initial_values(mut self, values: Value) -> Self {
        if !values.is_object() && !values.is_null() {
            tracing::warn!("initial values must be a JSON object; ignoring");
        }
        self.initial_values = value::into_values(values);
        self
    }

    /// Register the rule list for `name`.
    ///
    /// Fields are validated in registration order. Registering a name again
    /// replaces its list in place; an empty list unregisters the field.
    pub fn rule(mut self, name: impl Into<String>, rules: Vec<Rule>) -> Self {
        let name = name.into();
        let existing = self.rules.iter().position(|(n, _)| *n == name);
        match (existing, rules.is_empty()) {
            (Some(idx), true) => {
                self.rules.remove(idx);
            }
            (Some(idx), false) => self.rules[idx].1 = rules,
            (None, true) => {}
            (None, false) => self.rules.push((name, rules)),
        }
        self
    }

    pub fn rules<I, S>(self, rules: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<Rule>)>,
        S: Into<String>,
    {
        rules
            .into_iter()
            .fold(self, |opts, (name, list)| opts.rule(name, list))
    }

    pub fn on_submit<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Values) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_submit = Some(Arc::new(move |values: Values| handler(values).boxed()));
        self
    }

    pub fn on_values_change<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Values, &Values) + Send + Sync + 'static,
    {
        self.on_values_change = Some(Arc::new(handler));
        self
    }

    pub fn on_validation_failed<F>(mut self, handler: F) -> Self
    where
        F: Fn(&[FieldErrors]) + Send + Sync + 'static,
    {
        self.on_validation_failed = Some(Arc::new(handler));
        self
    }

    pub fn messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }
}

/// Create a form from its options
pub fn create_form(options: FormOptions) -> FormInstance {
    FormInstance::new(options)
}

/// Immutable view of a form, suitable for driving a rendering layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSnapshot {
    pub values: Values,
    pub errors: BTreeMap<String, Vec<String>>,
    pub touched: BTreeMap<String, bool>,
    pub is_submitting: bool,
    pub is_validating: bool,
    pub is_dirty: bool,
    pub is_valid: bool,
}

pub(super) struct StoreState {
    values: Values,
    initial_values: Values,
    errors: BTreeMap<String, Vec<String>>,
    touched: BTreeMap<String, bool>,
    pub(super) submitting: usize,
    validating: usize,
    watchers: HashMap<String, Vec<(u64, WatchCallback)>>,
    next_watch_id: u64,
}

pub(super) struct FormInner {
    pub(super) id: Uuid,
    rules: Vec<(String, Vec<Rule>)>,
    evaluator: Evaluator,
    pub(super) on_submit: Option<SubmitHandler>,
    on_values_change: Option<ValuesChangeHandler>,
    pub(super) on_validation_failed: Option<ValidationFailedHandler>,
    state: Mutex<StoreState>,
}

impl FormInner {
    pub(super) fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rules_for(&self, name: &str) -> Option<&[Rule]> {
        self.rules
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, rules)| rules.as_slice())
    }
}

/// Keeps `is_validating` raised while a validation call is in flight,
/// including when its future is dropped midway.
struct ValidatingGuard<'a> {
    inner: &'a FormInner,
}

impl<'a> ValidatingGuard<'a> {
    fn enter(inner: &'a FormInner) -> Self {
        inner.state().validating += 1;
        Self { inner }
    }
}

impl Drop for ValidatingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.state();
        state.validating = state.validating.saturating_sub(1);
    }
}

/// Handle returned by [`FormInstance::watch`].
///
/// The watcher stays registered for as long as this handle lives; dropping
/// it unsubscribes.
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes its watcher immediately"]
pub struct Subscription {
    form: Weak<FormInner>,
    name: String,
    id: u64,
}

impl Subscription {
    /// Remove exactly the callback this subscription registered
    pub fn unsubscribe(self) {
        drop(self);
    }

    fn remove(&self) -> Vec<WatchCallback> {
        let Some(inner) = self.form.upgrade() else {
            return Vec::new();
        };
        let mut state = inner.state();
        let Some(list) = state.watchers.get_mut(&self.name) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(list).into_iter().partition(|(id, _)| *id == self.id);
        if kept.is_empty() {
            state.watchers.remove(&self.name);
        } else {
            *list = kept;
        }
        removed.into_iter().map(|(_, callback)| callback).collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Callbacks may own subscriptions themselves; drop them after the lock is released.
        let removed = self.remove();
        drop(removed);
    }
}

/// Shared handle to one form's state
#[derive(Clone)]
pub struct FormInstance {
    pub(super) inner: Arc<FormInner>,
}

impl FormInstance {
    pub fn new(options: FormOptions) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(form_id = %id, fields = options.rules.len(), "form created");

        let state = StoreState {
            values: options.initial_values.clone(),
            initial_values: options.initial_values,
            errors: BTreeMap::new(),
            touched: BTreeMap::new(),
            submitting: 0,
            validating: 0,
            watchers: HashMap::new(),
            next_watch_id: 0,
        };

        Self {
            inner: Arc::new(FormInner {
                id,
                rules: options.rules,
                evaluator: Evaluator::new(options.messages),
                on_submit: options.on_submit,
                on_values_change: options.on_values_change,
                on_validation_failed: options.on_validation_failed,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Names of all ruled fields, in validation order
    pub fn field_names(&self) -> Vec<String> {
        self.inner.rules.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn has_rules(&self, name: &str) -> bool {
        self.inner.rules_for(name).is_some()
    }

    // ---- values ----

    /// Current value of `name`; `Null` when the field was never set
    pub fn get_value(&self, name: &str) -> Value {
        self.inner
            .state()
            .values
            .get(name)
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn get_values(&self) -> Values {
        self.inner.state().values.clone()
    }

    pub fn set_value(&self, name: impl Into<String>, value: Value) {
        let mut partial = Values::new();
        partial.insert(name.into(), value);
        self.set_values(partial);
    }

    /// Merge `partial` into the values.
    ///
    /// Watchers of every key in `partial` are notified with the new value,
    /// then `on_values_change` runs once. Both see a snapshot taken before
    /// notification starts, so watchers added or removed by a callback
    /// only take effect on the next call.
    pub fn set_values(&self, partial: Values) {
        if partial.is_empty() {
            return;
        }

        let (notify, all) = {
            let mut guard = self.inner.state();
            let state = &mut *guard;
            let mut notify: Vec<(WatchCallback, Value)> = Vec::new();
            for (name, value) in &partial {
                state.values.insert(name.clone(), value.clone());
                if let Some(list) = state.watchers.get(name) {
                    notify.extend(list.iter().map(|(_, cb)| (Arc::clone(cb), value.clone())));
                }
            }
            (notify, state.values.clone())
        };

        tracing::trace!(
            form_id = %self.inner.id,
            fields = ?partial.keys().collect::<Vec<_>>(),
            "values changed"
        );

        for (callback, value) in notify {
            callback(&value);
        }
        if let Some(handler) = &self.inner.on_values_change {
            handler(&partial, &all);
        }
    }

    /// Restore the initial values and clear every error and touched flag
    pub fn reset_fields(&self) {
        let mut state = self.inner.state();
        state.values = state.initial_values.clone();
        state.errors.clear();
        state.touched.clear();
        tracing::debug!(form_id = %self.inner.id, "form reset");
    }

    pub fn is_dirty(&self) -> bool {
        let state = self.inner.state();
        state.values != state.initial_values
    }

    pub fn is_field_dirty(&self, name: &str) -> bool {
        let state = self.inner.state();
        state.values.get(name) != state.initial_values.get(name)
    }

    // ---- watchers ----

    /// Call `callback` whenever `name` is written through `set_value(s)`
    pub fn watch<F>(&self, name: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let name = name.into();
        let mut state = self.inner.state();
        let id = state.next_watch_id;
        state.next_watch_id += 1;
        state
            .watchers
            .entry(name.clone())
            .or_default()
            .push((id, Arc::new(callback)));

        Subscription {
            form: Arc::downgrade(&self.inner),
            name,
            id,
        }
    }

    // ---- errors & touched ----

    pub fn get_field_error(&self, name: &str) -> Vec<String> {
        self.inner
            .state()
            .errors
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Every validated field with its messages, in rule registration order
    pub fn get_fields_error(&self) -> Vec<FieldErrors> {
        let state = self.inner.state();
        self.inner
            .rules
            .iter()
            .filter_map(|(name, _)| {
                state
                    .errors
                    .get(name)
                    .map(|errors| FieldErrors::new(name.clone(), errors.clone()))
            })
            .collect()
    }

    /// Overwrite the messages of a ruled field, e.g. with server-side results.
    ///
    /// Returns `false` and leaves the store untouched for fields without rules.
    pub fn set_field_error(&self, name: &str, errors: Vec<String>) -> bool {
        if !self.has_rules(name) {
            tracing::warn!(
                form_id = %self.inner.id,
                field = name,
                "refusing error override for a field without rules"
            );
            return false;
        }
        self.inner.state().errors.insert(name.to_string(), errors);
        true
    }

    pub fn is_field_touched(&self, name: &str) -> bool {
        self.inner
            .state()
            .touched
            .get(name)
            .copied()
            .unwrap_or(false)
    }

    pub fn set_field_touched(&self, name: &str, touched: bool) {
        self.inner
            .state()
            .touched
            .insert(name.to_string(), touched);
    }

    // ---- validation ----

    /// Validate one field and store its messages.
    ///
    /// Fields without rules resolve immediately. A failure carries exactly
    /// this field; callers interested only in the stored errors may ignore it.
    pub async fn validate_field(&self, name: &str) -> Result<(), AggregateValidationError> {
        let Some(rules) = self.inner.rules_for(name) else {
            return Ok(());
        };
        let _validating = ValidatingGuard::enter(&self.inner);

        let errors = self.run_field(name, rules).await;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AggregateValidationError::single(name, errors))
        }
    }

    /// Validate every ruled field, one after another, in registration order.
    ///
    /// Fields without rules are never checked. On success the current
    /// values are returned; otherwise all failing fields are reported.
    pub async fn validate_fields(&self) -> Result<Values, AggregateValidationError> {
        let _validating = ValidatingGuard::enter(&self.inner);

        let mut failed = Vec::new();
        for (name, rules) in &self.inner.rules {
            let errors = self.run_field(name, rules).await;
            if !errors.is_empty() {
                failed.push(FieldErrors::new(name.clone(), errors));
            }
        }

        if failed.is_empty() {
            Ok(self.get_values())
        } else {
            tracing::debug!(
                form_id = %self.inner.id,
                failed = failed.len(),
                "form validation failed"
            );
            Err(AggregateValidationError::new(failed))
        }
    }

    /// Evaluate `rules` against the current value of `name` and store the result.
    ///
    /// There is no staleness check: if the value changes while async rules
    /// are pending, the result computed for the old value still wins.
    async fn run_field(&self, name: &str, rules: &[Rule]) -> Vec<String> {
        let value = self.get_value(name);
        let errors = self.inner.evaluator.evaluate_all(&value, rules).await;

        let mut state = self.inner.state();
        if state.values.get(name).unwrap_or(&Value::Null) != &value {
            tracing::debug!(
                form_id = %self.inner.id,
                field = name,
                "storing validation result computed for a previous value"
            );
        }
        state.errors.insert(name.to_string(), errors.clone());
        tracing::debug!(
            form_id = %self.inner.id,
            field = name,
            errors = errors.len(),
            "field validated"
        );
        errors
    }

    // ---- snapshot ----

    pub fn is_submitting(&self) -> bool {
        self.inner.state().submitting > 0
    }

    pub fn is_validating(&self) -> bool {
        self.inner.state().validating > 0
    }

    pub fn get_state(&self) -> FormSnapshot {
        let state = self.inner.state();
        FormSnapshot {
            values: state.values.clone(),
            errors: state.errors.clone(),
            touched: state.touched.clone(),
            is_submitting: state.submitting > 0,
            is_validating: state.validating > 0,
            is_dirty: state.values != state.initial_values,
            is_valid: state.errors.values().all(Vec::is_empty),
        }
    }
}

impl fmt::Debug for FormInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormInstance")
            .field("id", &self.inner.id)
            .field("fields", &self.field_names())
            .finish()
    }
}
