//! Field binding: connects one named field of a form to one rendered input
//!
//! The input never reaches into the form itself. It implements
//! [`FieldWidget`] and receives explicit [`FieldProps`]; the rendering
//! layer forwards its events to [`FieldBinding::handle_event`].

use super::error::BindingError;
use super::store::FormInstance;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

fn default_value_prop_name() -> String {
    "value".to_string()
}

fn default_change_event_name() -> String {
    "onChange".to_string()
}

fn default_validate_event_names() -> Vec<String> {
    vec!["onBlur".to_string()]
}

/// How a field is wired to its input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default = "default_value_prop_name")]
    pub value_prop_name: String,
    #[serde(default = "default_change_event_name")]
    pub change_event_name: String,
    #[serde(default = "default_validate_event_names")]
    pub validate_event_names: Vec<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_prop_name: default_value_prop_name(),
            change_event_name: default_change_event_name(),
            validate_event_names: default_validate_event_names(),
        }
    }

    pub fn value_prop_name(mut self, prop: impl Into<String>) -> Self {
        self.value_prop_name = prop.into();
        self
    }

    pub fn change_event_name(mut self, event: impl Into<String>) -> Self {
        self.change_event_name = event.into();
        self
    }

    pub fn validate_on<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validate_event_names = events.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_validate_trigger(&self, event: &str) -> bool {
        self.validate_event_names.iter().any(|e| e == event)
    }
}

/// Display state handed to an input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldProps {
    pub name: String,
    pub value_prop_name: String,
    pub value: Value,
    pub errors: Vec<String>,
    pub touched: bool,
}

impl FieldProps {
    /// First message, the one most inputs show
    pub fn error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }

    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Value as display text; `Null` shows as empty
    pub fn text(&self) -> String {
        match &self.value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A rendered input bound to one field
#[cfg_attr(test, mockall::automock)]
pub trait FieldWidget: Send {
    /// Called on mount and after every change or validation
    fn render(&mut self, props: &FieldProps);
}

/// Pull the new value out of a change payload.
///
/// A native-style event `{"target": {<value_prop_name>: v}}` is unwrapped
/// to `v`; any other payload is the value itself.
pub fn extract_value(payload: Value, value_prop_name: &str) -> Value {
    match payload {
        Value::Object(mut event) => {
            let unwrapped = match event.get_mut("target") {
                Some(Value::Object(target)) => target.remove(value_prop_name),
                _ => None,
            };
            unwrapped.unwrap_or(Value::Object(event))
        }
        other => other,
    }
}

/// Bridge between one `FieldDescriptor` and one `FieldWidget`
pub struct FieldBinding {
    form: FormInstance,
    descriptor: FieldDescriptor,
    widget: Option<Box<dyn FieldWidget>>,
}

impl FieldBinding {
    pub fn new(form: FormInstance, descriptor: FieldDescriptor) -> Self {
        Self {
            form,
            descriptor,
            widget: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    pub fn form(&self) -> &FormInstance {
        &self.form
    }

    /// Current display state read from the form
    pub fn props(&self) -> FieldProps {
        let name = &self.descriptor.name;
        FieldProps {
            name: name.clone(),
            value_prop_name: self.descriptor.value_prop_name.clone(),
            value: self.form.get_value(name),
            errors: self.form.get_field_error(name),
            touched: self.form.is_field_touched(name),
        }
    }

    /// Mount the input and render its initial state.
    ///
    /// A binding drives exactly one input; attaching a second one without
    /// detaching the first fails.
    pub fn attach(&mut self, widget: impl FieldWidget + 'static) -> Result<(), BindingError> {
        if self.widget.is_some() {
            return Err(BindingError::AlreadyAttached(self.descriptor.name.clone()));
        }
        self.widget = Some(Box::new(widget));
        self.refresh();
        Ok(())
    }

    pub fn detach(&mut self) -> Option<Box<dyn FieldWidget>> {
        self.widget.take()
    }

    pub fn is_attached(&self) -> bool {
        self.widget.is_some()
    }

    /// Re-render the input from the form's current state
    pub fn refresh(&mut self) {
        let props = self.props();
        if let Some(widget) = self.widget.as_mut() {
            widget.render(&props);
        }
    }

    /// Store the value carried by a change event
    pub fn on_change(&mut self, payload: Value) {
        let value = extract_value(payload, &self.descriptor.value_prop_name);
        self.form.set_value(self.descriptor.name.clone(), value);
        self.refresh();
    }

    /// Mark the field touched and validate it.
    ///
    /// A failed validation is not an error here: the form already holds the
    /// messages and the re-rendered input shows them.
    pub async fn on_validate_trigger(&mut self) {
        let name = self.descriptor.name.clone();
        self.form.set_field_touched(&name, true);
        if let Err(err) = self.form.validate_field(&name).await {
            tracing::trace!(form_id = %self.form.id(), field = %name, error = %err, "field invalid");
        }
        self.refresh();
    }

    /// Dispatch a widget event by name.
    ///
    /// An event configured both as the change event and as a validate
    /// trigger applies the change first. Returns `false` for events the
    /// descriptor does not mention.
    pub async fn handle_event(&mut self, event: &str, payload: Value) -> bool {
        let is_change = event == self.descriptor.change_event_name;
        let is_trigger = self.descriptor.is_validate_trigger(event);

        if is_change {
            self.on_change(payload);
        }
        if is_trigger {
            self.on_validate_trigger().await;
        }
        if !is_change && !is_trigger {
            tracing::trace!(field = %self.descriptor.name, event, "ignored field event");
        }
        is_change || is_trigger
    }
}

impl fmt::Debug for FieldBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("descriptor", &self.descriptor)
            .field("attached", &self.widget.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{create_form, FormOptions, Rule};
    use mockall::predicate::always;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Widget that records every props it was rendered with
    #[derive(Clone, Default)]
    struct RecordingWidget {
        renders: Arc<Mutex<Vec<FieldProps>>>,
    }

    impl RecordingWidget {
        fn last(&self) -> FieldProps {
            self.renders.lock().unwrap().last().cloned().unwrap()
        }

        fn count(&self) -> usize {
            self.renders.lock().unwrap().len()
        }
    }

    impl FieldWidget for RecordingWidget {
        fn render(&mut self, props: &FieldProps) {
            self.renders.lock().unwrap().push(props.clone());
        }
    }

    fn instrument_form() -> FormInstance {
        create_form(
            FormOptions::new()
                .initial_values(json!({"serial": "SN-1"}))
                .rule(
                    "serial",
                    vec![Rule::pattern("^SN-[0-9]{4}$").with_message("serial must look like SN-0000")],
                ),
        )
    }

    mod descriptor {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_defaults() {
            let descriptor = FieldDescriptor::new("serial");
            assert_eq!(descriptor.value_prop_name, "value");
            assert_eq!(descriptor.change_event_name, "onChange");
            assert_eq!(descriptor.validate_event_names, vec!["onBlur".to_string()]);
        }

        #[test]
        fn test_deserialize_fills_defaults() {
            let descriptor: FieldDescriptor =
                serde_json::from_str(r#"{"name": "calibrated", "value_prop_name": "checked"}"#)
                    .unwrap();
            assert_eq!(descriptor.value_prop_name, "checked");
            assert_eq!(descriptor.change_event_name, "onChange");
            assert!(descriptor.is_validate_trigger("onBlur"));
        }
    }

    mod extract {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_unwraps_native_event() {
            let payload = json!({"target": {"value": "abc"}});
            assert_eq!(extract_value(payload, "value"), json!("abc"));
        }

        #[test]
        fn test_uses_value_prop_name() {
            let payload = json!({"target": {"checked": true, "value": "on"}});
            assert_eq!(extract_value(payload, "checked"), json!(true));
        }

        #[test]
        fn test_plain_payload_is_value() {
            assert_eq!(extract_value(json!("raw"), "value"), json!("raw"));
            assert_eq!(extract_value(json!(["a", "b"]), "value"), json!(["a", "b"]));
        }

        #[test]
        fn test_object_without_target_is_value() {
            let payload = json!({"start": "08:00", "end": "16:00"});
            assert_eq!(extract_value(payload.clone(), "value"), payload);
        }
    }

    mod binding {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_attach_renders_initial_state() {
            let form = instrument_form();
            let widget = RecordingWidget::default();
            let mut binding = FieldBinding::new(form, FieldDescriptor::new("serial"));
            binding.attach(widget.clone()).unwrap();

            assert_eq!(widget.count(), 1);
            let props = widget.last();
            assert_eq!(props.value, json!("SN-1"));
            assert!(props.errors.is_empty());
            assert!(!props.touched);
        }

        #[test]
        fn test_single_input_per_binding() {
            let mut binding = FieldBinding::new(instrument_form(), FieldDescriptor::new("serial"));
            binding.attach(RecordingWidget::default()).unwrap();
            assert_eq!(
                binding.attach(RecordingWidget::default()),
                Err(BindingError::AlreadyAttached("serial".to_string()))
            );
            assert!(binding.detach().is_some());
            assert!(binding.attach(RecordingWidget::default()).is_ok());
        }

        #[test]
        fn test_change_event_sets_value() {
            let form = instrument_form();
            let widget = RecordingWidget::default();
            let mut binding = FieldBinding::new(form.clone(), FieldDescriptor::new("serial"));
            binding.attach(widget.clone()).unwrap();

            binding.on_change(json!({"target": {"value": "SN-12"}}));

            assert_eq!(form.get_value("serial"), json!("SN-12"));
            assert_eq!(widget.last().value, json!("SN-12"));
            // change alone does not validate or touch
            assert!(form.get_fields_error().is_empty());
            assert!(!form.is_field_touched("serial"));
        }

        #[tokio::test]
        async fn test_blur_touches_and_validates_without_failing() {
            let form = instrument_form();
            let widget = RecordingWidget::default();
            let mut binding = FieldBinding::new(form.clone(), FieldDescriptor::new("serial"));
            binding.attach(widget.clone()).unwrap();

            assert!(binding.handle_event("onBlur", Value::Null).await);

            assert!(form.is_field_touched("serial"));
            let props = widget.last();
            assert!(props.touched);
            assert_eq!(props.error(), Some("serial must look like SN-0000"));
        }

        #[tokio::test]
        async fn test_change_before_validate_when_both() {
            let form = instrument_form();
            let descriptor = FieldDescriptor::new("serial").validate_on(["onChange", "onBlur"]);
            let mut binding = FieldBinding::new(form.clone(), descriptor);

            assert!(binding.handle_event("onChange", json!("SN-0042")).await);

            assert_eq!(form.get_value("serial"), json!("SN-0042"));
            assert_eq!(form.get_state().errors.get("serial"), Some(&Vec::new()));
        }

        #[tokio::test]
        async fn test_unknown_event_is_ignored() {
            let form = instrument_form();
            let mut binding = FieldBinding::new(form.clone(), FieldDescriptor::new("serial"));
            assert!(!binding.handle_event("onFocus", json!("x")).await);
            assert_eq!(form.get_value("serial"), json!("SN-1"));
            assert!(!form.is_field_touched("serial"));
        }

        #[tokio::test]
        async fn test_mock_widget_rendered_on_each_step() {
            let mut widget = MockFieldWidget::new();
            widget.expect_render().with(always()).times(3).return_const(());
            let mut binding = FieldBinding::new(instrument_form(), FieldDescriptor::new("serial"));

            binding.attach(widget).unwrap();
            binding.on_change(json!("SN-0001"));
            binding.on_validate_trigger().await;
        }

        #[test]
        fn test_props_text() {
            let binding = FieldBinding::new(
                create_form(FormOptions::new().initial_values(json!({"qty": 3}))),
                FieldDescriptor::new("qty"),
            );
            assert_eq!(binding.props().text(), "3");
            let empty = FieldBinding::new(create_form(FormOptions::new()), FieldDescriptor::new("x"));
            assert_eq!(empty.props().text(), "");
        }
    }
}
