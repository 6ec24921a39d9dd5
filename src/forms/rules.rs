//! Validation rule definitions

use super::error::RuleFault;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Value shapes a `Type` rule can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    String,
    Number,
    Email,
    Url,
    Array,
}

impl TypeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Email => "email",
            Self::Url => "url",
            Self::Array => "array",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Email => value
                .as_str()
                .is_some_and(email_address::EmailAddress::is_valid),
            Self::Url => value.as_str().is_some_and(|s| url::Url::parse(s).is_ok()),
            Self::Array => value.is_array(),
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A regex compiled once when the rule is built.
///
/// An uncompilable source is kept so the rule can still report a message
/// instead of failing at construction.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    compiled: Option<Regex>,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = match Regex::new(&source) {
            Ok(re) => Some(re),
            Err(err) => {
                tracing::warn!(pattern = %source, error = %err, "uncompilable validation pattern");
                None
            }
        };
        Self { source, compiled }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> Option<&Regex> {
        self.compiled.as_ref()
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self {
        Self {
            source: re.as_str().to_string(),
            compiled: Some(re),
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)
    }
}

/// Synchronous custom check; `Err` becomes the field's message
pub type SyncCheck = Arc<dyn Fn(&Value) -> Result<(), RuleFault> + Send + Sync>;

/// Asynchronous custom check.
///
/// `Ok(Some(msg))` reports `msg` for the field, `Ok(None)` passes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AsyncRule: Send + Sync {
    async fn check(&self, value: &Value) -> Result<Option<String>, RuleFault>;
}

/// Adapts a closure returning a future into an `AsyncRule`
struct FnAsyncRule<F>(F);

#[async_trait]
impl<F, Fut> AsyncRule for FnAsyncRule<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<String>, RuleFault>> + Send + 'static,
{
    async fn check(&self, value: &Value) -> Result<Option<String>, RuleFault> {
        (self.0)(value.clone()).await
    }
}

/// One validation check attached to a field.
///
/// A field's rules form an ordered list; every rule is evaluated, so one
/// field can report several messages at once.
#[derive(Clone)]
pub enum Rule {
    Required {
        message: Option<String>,
    },
    MinLength {
        min: usize,
        message: Option<String>,
    },
    MaxLength {
        max: usize,
        message: Option<String>,
    },
    Pattern {
        pattern: Pattern,
        message: Option<String>,
    },
    Type {
        kind: TypeKind,
        message: Option<String>,
    },
    Custom(SyncCheck),
    CustomAsync(Arc<dyn AsyncRule>),
}

impl Rule {
    pub fn required() -> Self {
        Self::Required { message: None }
    }

    pub fn min_length(min: usize) -> Self {
        Self::MinLength { min, message: None }
    }

    pub fn max_length(max: usize) -> Self {
        Self::MaxLength { max, message: None }
    }

    pub fn pattern(pattern: impl Into<Pattern>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: None,
        }
    }

    pub fn of_type(kind: TypeKind) -> Self {
        Self::Type {
            kind,
            message: None,
        }
    }

    pub fn email() -> Self {
        Self::of_type(TypeKind::Email)
    }

    pub fn url() -> Self {
        Self::of_type(TypeKind::Url)
    }

    pub fn custom<F>(check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), RuleFault> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(check))
    }

    pub fn custom_async<F, Fut>(check: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<String>, RuleFault>> + Send + 'static,
    {
        Self::CustomAsync(Arc::new(FnAsyncRule(check)))
    }

    pub fn from_async_rule(rule: impl AsyncRule + 'static) -> Self {
        Self::CustomAsync(Arc::new(rule))
    }

    /// Replace the message of a declarative rule. Custom rules report their
    /// own errors, so this is a no-op for them.
    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        match &mut self {
            Self::Required { message }
            | Self::MinLength { message, .. }
            | Self::MaxLength { message, .. }
            | Self::Pattern { message, .. }
            | Self::Type { message, .. } => *message = Some(text.into()),
            Self::Custom(_) | Self::CustomAsync(_) => {}
        }
        self
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Self::CustomAsync(_))
    }
}

impl From<&str> for Pattern {
    fn from(source: &str) -> Self {
        Pattern::new(source)
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Pattern::new(source)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required { message } => f
                .debug_struct("Required")
                .field("message", message)
                .finish(),
            Self::MinLength { min, message } => f
                .debug_struct("MinLength")
                .field("min", min)
                .field("message", message)
                .finish(),
            Self::MaxLength { max, message } => f
                .debug_struct("MaxLength")
                .field("max", max)
                .field("message", message)
                .finish(),
            Self::Pattern { pattern, message } => f
                .debug_struct("Pattern")
                .field("pattern", pattern)
                .field("message", message)
                .finish(),
            Self::Type { kind, message } => f
                .debug_struct("Type")
                .field("kind", kind)
                .field("message", message)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::CustomAsync(_) => f.write_str("CustomAsync(..)"),
        }
    }
}

/// Declarative rule in object-literal form, e.g. `{"required": true, "message": "M"}`.
///
/// One descriptor may set several checks; they expand in the order
/// required, type, min, max, pattern, all sharing `message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSpec {
    pub required: bool,
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub pattern: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TypeKind>,
    pub message: Option<String>,
}

impl RuleSpec {
    pub fn into_rules(self) -> Vec<Rule> {
        let message = self.message;
        let mut rules = Vec::new();

        if self.required {
            rules.push(Rule::Required {
                message: message.clone(),
            });
        }
        if let Some(kind) = self.kind {
            rules.push(Rule::Type {
                kind,
                message: message.clone(),
            });
        }
        if let Some(min) = self.min {
            rules.push(Rule::MinLength {
                min,
                message: message.clone(),
            });
        }
        if let Some(max) = self.max {
            rules.push(Rule::MaxLength {
                max,
                message: message.clone(),
            });
        }
        if let Some(source) = self.pattern {
            rules.push(Rule::Pattern {
                pattern: Pattern::new(source),
                message,
            });
        }

        rules
    }
}

/// Expand a list of descriptors into one ordered rule list
pub fn rules_from_specs(specs: impl IntoIterator<Item = RuleSpec>) -> Vec<Rule> {
    specs.into_iter().flat_map(RuleSpec::into_rules).collect()
}
