//! Terminal widgets bound to form fields

use labconsole_forms::forms::{FieldProps, FieldWidget};
use std::sync::{Arc, Mutex, PoisonError};

/// Single-line text input.
///
/// The binding owns one handle and pushes props into it; the draw loop reads
/// them back through a clone of the same handle.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    props: Arc<Mutex<Option<FieldProps>>>,
}

impl TextInput {
    /// Props from the latest render, if any
    pub fn props(&self) -> Option<FieldProps> {
        self.props
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FieldWidget for TextInput {
    fn render(&mut self, props: &FieldProps) {
        *self.props.lock().unwrap_or_else(PoisonError::into_inner) = Some(props.clone());
    }
}
