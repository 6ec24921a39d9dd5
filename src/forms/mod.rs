//! Form state and validation engine
//!
//! A form is created once per logical form (e.g. each time a modal opens)
//! from initial values and a rule map, and discarded when it closes.
//! Rendering layers talk to it through [`FieldBinding`]s and submit it
//! through [`FormInstance::submit`] or [`FormInstance::handle_native_submit`].

mod binding;
mod error;
mod evaluator;
mod messages;
mod rules;
mod store;
mod submit;
mod value;

pub use binding::{extract_value, FieldBinding, FieldDescriptor, FieldProps, FieldWidget};
pub use error::{AggregateValidationError, BindingError, FieldErrors, RuleFault, SubmitError};
pub use evaluator::{evaluate, evaluate_async, Evaluator};
pub use messages::Messages;
pub use rules::{rules_from_specs, AsyncRule, Pattern, Rule, RuleSpec, SyncCheck, TypeKind};
pub use store::{
    create_form, FormInstance, FormOptions, FormSnapshot, Subscription, SubmitHandler,
    ValidationFailedHandler, ValuesChangeHandler, WatchCallback,
};
pub use value::{into_values, is_empty, Values};
