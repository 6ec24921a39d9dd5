//! Application state and core logic for the personnel registration modal

use crate::ui::widgets::TextInput;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use labconsole_forms::config::FormsConfig;
use labconsole_forms::forms::{
    create_form, rules_from_specs, FieldBinding, FieldProps, FormInstance, FormOptions, Rule,
    RuleSpec, SubmitError,
};
use serde_json::{json, Value};
use std::time::Duration;

/// Badge ids already handed out by the lab
const ISSUED_BADGES: &[&str] = &["LAB-0001", "LAB-0042", "LAB-1337"];

/// Simulated latency of the badge registry lookup
const BADGE_LOOKUP_DELAY: Duration = Duration::from_millis(250);

/// One visible input of the modal
pub struct FieldRow {
    pub label: &'static str,
    pub binding: FieldBinding,
    pub input: TextInput,
}

impl FieldRow {
    /// Props last rendered into the input
    pub fn props(&self) -> FieldProps {
        self.input.props().unwrap_or_else(|| self.binding.props())
    }
}

/// Main application struct
pub struct App {
    pub form: FormInstance,
    pub rows: Vec<FieldRow>,
    /// Index of the focused row
    pub active_field: usize,
    /// Feedback shown in the status bar
    pub status_message: Option<String>,
    /// Names registered during this session
    pub roster: Vec<String>,
    quit: bool,
}

impl App {
    pub fn new(config: &FormsConfig) -> Result<Self> {
        let form = create_form(
            FormOptions::new()
                .initial_values(json!({
                    "full_name": "",
                    "email": "",
                    "badge_id": "",
                    "role": "technician",
                    "note": ""
                }))
                .rules(personnel_rules()?)
                .messages(config.messages.clone())
                .on_validation_failed(|fields| {
                    tracing::info!(failed = fields.len(), "personnel form rejected");
                }),
        );

        let mut rows = Vec::new();
        for (name, label) in [
            ("full_name", "Full Name"),
            ("email", "Email"),
            ("badge_id", "Badge ID"),
            ("role", "Role"),
            ("note", "Note (optional)"),
        ] {
            let input = TextInput::default();
            let mut binding = FieldBinding::new(form.clone(), config.descriptor(name));
            binding.attach(input.clone())?;
            rows.push(FieldRow {
                label,
                binding,
                input,
            });
        }

        Ok(Self {
            form,
            rows,
            active_field: 0,
            status_message: None,
            roster: Vec::new(),
            quit: false,
        })
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Handle a key press in the modal
    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => self.quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.quit = true
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => self.reset(),
            KeyCode::Tab | KeyCode::Down => self.move_focus(1).await,
            KeyCode::BackTab | KeyCode::Up => self.move_focus(self.rows.len() - 1).await,
            KeyCode::Enter => {
                self.blur_active().await;
                self.submit().await;
            }
            KeyCode::Char(c) => {
                let mut text = self.active_row().props().text();
                text.push(c);
                self.change_active(text).await;
            }
            KeyCode::Backspace => {
                let mut text = self.active_row().props().text();
                text.pop();
                self.change_active(text).await;
            }
            _ => {}
        }
        Ok(())
    }

    fn active_row(&self) -> &FieldRow {
        &self.rows[self.active_field]
    }

    /// Emit a native-style change event for the focused input
    async fn change_active(&mut self, text: String) {
        let row = &mut self.rows[self.active_field];
        let event = row.binding.descriptor().change_event_name.clone();
        row.binding
            .handle_event(&event, json!({ "target": { "value": text } }))
            .await;
    }

    async fn blur_active(&mut self) {
        self.rows[self.active_field]
            .binding
            .handle_event("onBlur", Value::Null)
            .await;
    }

    async fn move_focus(&mut self, step: usize) {
        self.blur_active().await;
        self.active_field = (self.active_field + step) % self.rows.len();
    }

    fn refresh_all(&mut self) {
        for row in &mut self.rows {
            row.binding.refresh();
        }
    }

    fn reset(&mut self) {
        self.form.reset_fields();
        self.refresh_all();
        self.active_field = 0;
        self.status_message = Some("Form reset".to_string());
    }

    /// Submit through the form-level path, as the modal's "Register" action
    async fn submit(&mut self) {
        let form = self.form.clone();
        let mut registered = None;
        let result = form
            .handle_native_submit(|values| {
                registered = values
                    .get("full_name")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                async { Ok(()) }
            })
            .await;

        match result {
            Ok(()) => {
                let name = registered.unwrap_or_default();
                self.status_message = Some(format!("Registered {name}"));
                self.roster.push(name);
                self.form.reset_fields();
                self.active_field = 0;
            }
            Err(SubmitError::Validation(err)) => {
                let fields: Vec<&str> = err.error_fields.iter().map(|f| f.name.as_str()).collect();
                self.status_message = Some(format!("Please fix: {}", fields.join(", ")));
            }
            Err(err) => {
                self.status_message = Some(format!("Registration failed: {err}"));
            }
        }
        self.refresh_all();
    }
}

/// Rule map of the personnel form, declared in the console's descriptor format
fn personnel_rules() -> Result<Vec<(&'static str, Vec<Rule>)>> {
    let specs = |value: Value| -> Result<Vec<Rule>> {
        let specs: Vec<RuleSpec> = serde_json::from_value(value)?;
        Ok(rules_from_specs(specs))
    };

    let mut badge_rules = specs(json!([
        {"required": true, "message": "badge id is required"},
        {"pattern": "^LAB-[0-9]{4}$", "message": "badge ids look like LAB-0000"}
    ]))?;
    badge_rules.push(Rule::custom_async(|value| async move {
        tokio::time::sleep(BADGE_LOOKUP_DELAY).await;
        let taken = value
            .as_str()
            .is_some_and(|badge| ISSUED_BADGES.contains(&badge));
        Ok(taken.then(|| "badge already issued".to_string()))
    }));

    Ok(vec![
        (
            "full_name",
            specs(json!([
                {"required": true, "message": "full name is required"},
                {"min": 2, "max": 60}
            ]))?,
        ),
        (
            "email",
            specs(json!([
                {"required": true},
                {"type": "email", "message": "enter a lab email address"}
            ]))?,
        ),
        ("badge_id", badge_rules),
        (
            "role",
            specs(json!([
                {"required": true},
                {"pattern": "^(technician|scientist|manager)$",
                 "message": "role must be technician, scientist or manager"}
            ]))?,
        ),
    ])
}
