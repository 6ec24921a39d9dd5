//! Default validation messages

use serde::{Deserialize, Serialize};

/// Texts substituted when a rule carries no message of its own.
///
/// Templates may contain `{n}` (length limits) or `{kind}` (type checks).
/// Every field is optional in JSON, so a config file can override a
/// single message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub required: String,
    pub invalid: String,
    pub min_length: String,
    pub max_length: String,
    pub type_mismatch: String,
    /// Used when a custom rule fails without any usable description
    pub rule_fault: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            required: "this field is required".to_string(),
            invalid: "please enter a valid value".to_string(),
            min_length: "must be at least {n} characters".to_string(),
            max_length: "must be at most {n} characters".to_string(),
            type_mismatch: "please enter a valid {kind}".to_string(),
            rule_fault: "validation failed".to_string(),
        }
    }
}

impl Messages {
    pub fn min_length(&self, n: usize) -> String {
        self.min_length.replace("{n}", &n.to_string())
    }

    pub fn max_length(&self, n: usize) -> String {
        self.max_length.replace("{n}", &n.to_string())
    }

    pub fn type_mismatch(&self, kind: &str) -> String {
        self.type_mismatch.replace("{kind}", kind)
    }
}
