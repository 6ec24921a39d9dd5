//! Rule evaluation
//!
//! Evaluation never stops at the first failure: every rule in the list is
//! visited in declaration order and each failing rule contributes its own
//! message. `Required` only fires on empty values; every other rule is
//! skipped while the value is empty, so an optional field without input
//! is never length-, type- or pattern-checked.
//!
//! Async rules run after the synchronous pass, one at a time, so their
//! messages always follow the synchronous ones in a stable order.

use super::error::RuleFault;
use super::messages::Messages;
use super::rules::Rule;
use super::value;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Checks values against rule lists using a set of default messages
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    messages: Messages,
}

impl Evaluator {
    pub fn new(messages: Messages) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Run the synchronous rules of `rules`; async rules are ignored here
    pub fn evaluate(&self, value: &Value, rules: &[Rule]) -> Vec<String> {
        let empty = value::is_empty(value);
        let mut errors = Vec::new();

        for rule in rules {
            if rule.is_async() {
                continue;
            }
            if let Rule::Required { message } = rule {
                if empty {
                    errors.push(self.message_or(message, &self.messages.required));
                }
                continue;
            }
            if empty {
                continue;
            }
            if let Some(error) = self.check(value, rule) {
                errors.push(error);
            }
        }

        errors
    }

    /// Run only the async rules, sequentially in declaration order
    pub async fn evaluate_async(&self, value: &Value, rules: &[Rule]) -> Vec<String> {
        let mut errors = Vec::new();
        if value::is_empty(value) {
            return errors;
        }

        for rule in rules {
            let Rule::CustomAsync(check) = rule else {
                continue;
            };
            match AssertUnwindSafe(check.check(value)).catch_unwind().await {
                Ok(Ok(Some(message))) => errors.push(message),
                Ok(Ok(None)) => {}
                Ok(Err(fault)) => errors.push(self.fault_message(fault)),
                Err(payload) => errors.push(self.panic_message(payload)),
            }
        }

        errors
    }

    /// Synchronous pass followed by the async pass
    pub async fn evaluate_all(&self, value: &Value, rules: &[Rule]) -> Vec<String> {
        let mut errors = self.evaluate(value, rules);
        if rules.iter().any(Rule::is_async) {
            errors.extend(self.evaluate_async(value, rules).await);
        }
        errors
    }

    fn check(&self, value: &Value, rule: &Rule) -> Option<String> {
        match rule {
            Rule::Required { .. } | Rule::CustomAsync(_) => None,
            Rule::MinLength { min, message } => match value::length(value) {
                Some(len) if len < *min => {
                    Some(self.message_or(message, &self.messages.min_length(*min)))
                }
                _ => None,
            },
            Rule::MaxLength { max, message } => match value::length(value) {
                Some(len) if len > *max => {
                    Some(self.message_or(message, &self.messages.max_length(*max)))
                }
                _ => None,
            },
            Rule::Pattern { pattern, message } => {
                let Some(re) = pattern.regex() else {
                    return Some(self.message_or(message, &self.messages.invalid));
                };
                let matched = value::pattern_subject(value).is_some_and(|s| re.is_match(&s));
                (!matched).then(|| self.message_or(message, &self.messages.invalid))
            }
            Rule::Type { kind, message } => (!kind.matches(value))
                .then(|| self.message_or(message, &self.messages.type_mismatch(kind.label()))),
            Rule::Custom(check) => match panic::catch_unwind(AssertUnwindSafe(|| check(value))) {
                Ok(Ok(())) => None,
                Ok(Err(fault)) => Some(self.fault_message(fault)),
                Err(payload) => Some(self.panic_message(payload)),
            },
        }
    }

    fn message_or(&self, message: &Option<String>, fallback: &str) -> String {
        match message {
            Some(m) if !m.is_empty() => m.clone(),
            _ => fallback.to_string(),
        }
    }

    fn fault_message(&self, fault: RuleFault) -> String {
        let text = fault.to_string();
        if text.trim().is_empty() {
            self.messages.rule_fault.clone()
        } else {
            text
        }
    }

    fn panic_message(&self, payload: Box<dyn Any + Send>) -> String {
        let text = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned());
        tracing::debug!(message = ?text, "custom rule panicked");
        match text {
            Some(t) if !t.trim().is_empty() => t,
            _ => self.messages.rule_fault.clone(),
        }
    }
}

/// Synchronous evaluation with the default messages
pub fn evaluate(value: &Value, rules: &[Rule]) -> Vec<String> {
    Evaluator::default().evaluate(value, rules)
}

/// Async-only evaluation with the default messages
pub async fn evaluate_async(value: &Value, rules: &[Rule]) -> Vec<String> {
    Evaluator::default().evaluate_async(value, rules).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::rules::{MockAsyncRule, TypeKind};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    mod sync_pass {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_required_reports_message_on_empty() {
            let rules = vec![Rule::required().with_message("M")];
            assert_eq!(evaluate(&json!(""), &rules), vec!["M".to_string()]);
            assert!(evaluate(&json!("x"), &rules).is_empty());
        }

        #[test]
        fn test_required_default_message() {
            let rules = vec![Rule::required()];
            assert_eq!(
                evaluate(&Value::Null, &rules),
                vec!["this field is required".to_string()]
            );
            assert_eq!(evaluate(&json!([]), &rules).len(), 1);
        }

        #[test]
        fn test_only_pattern_fires_for_non_empty_value() {
            let rules = vec![
                Rule::required(),
                Rule::pattern("^[0-9]+$").with_message("digits only"),
            ];
            assert_eq!(evaluate(&json!("abc"), &rules), vec!["digits only".to_string()]);
        }

        #[test]
        fn test_does_not_short_circuit() {
            let rules = vec![
                Rule::required(),
                Rule::min_length(5).with_message("too short"),
                Rule::pattern("^[0-9]+$").with_message("bad format"),
            ];
            assert_eq!(
                evaluate(&json!("ab"), &rules),
                vec!["too short".to_string(), "bad format".to_string()]
            );
        }

        #[test]
        fn test_empty_value_skips_non_required_rules() {
            let rules = vec![
                Rule::min_length(3),
                Rule::email(),
                Rule::pattern("^x$"),
                Rule::custom(|_| Err("never".into())),
            ];
            assert!(evaluate(&json!(""), &rules).is_empty());
            assert!(evaluate(&Value::Null, &rules).is_empty());
        }

        #[test]
        fn test_required_failure_still_visits_later_rules() {
            let calls = Arc::new(AtomicUsize::new(0));
            let seen = Arc::clone(&calls);
            let rules = vec![
                Rule::required().with_message("first"),
                Rule::required().with_message("second"),
                Rule::custom(move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            ];
            assert_eq!(
                evaluate(&json!(""), &rules),
                vec!["first".to_string(), "second".to_string()]
            );
            // skipped because the value is empty, but the pass did not stop early
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }

        #[test]
        fn test_length_rules_on_strings_and_arrays() {
            let rules = vec![Rule::min_length(2), Rule::max_length(3)];
            assert_eq!(
                evaluate(&json!("a"), &rules),
                vec!["must be at least 2 characters".to_string()]
            );
            assert_eq!(
                evaluate(&json!([1, 2, 3, 4]), &rules),
                vec!["must be at most 3 characters".to_string()]
            );
            assert!(evaluate(&json!("abc"), &rules).is_empty());
            assert!(evaluate(&json!(7), &rules).is_empty());
        }

        #[test]
        fn test_type_checks() {
            let rules = vec![Rule::of_type(TypeKind::Number)];
            assert_eq!(
                evaluate(&json!("12"), &rules),
                vec!["please enter a valid number".to_string()]
            );
            assert!(evaluate(&json!(12), &rules).is_empty());

            let rules = vec![Rule::email().with_message("bad email")];
            assert_eq!(evaluate(&json!("bad"), &rules), vec!["bad email".to_string()]);
            assert!(evaluate(&json!("a@b.example"), &rules).is_empty());
        }

        #[test]
        fn test_pattern_coerces_numbers() {
            let rules = vec![Rule::pattern("^[0-9]+$")];
            assert!(evaluate(&json!(123), &rules).is_empty());
            assert_eq!(evaluate(&json!({"a": 1}), &rules).len(), 1);
        }

        #[test]
        fn test_invalid_pattern_degrades_to_message() {
            let rules = vec![Rule::pattern("(")];
            assert_eq!(
                evaluate(&json!("x"), &rules),
                vec!["please enter a valid value".to_string()]
            );
            let rules = vec![Rule::pattern("(").with_message("bad")];
            assert_eq!(evaluate(&json!("x"), &rules), vec!["bad".to_string()]);
        }

        #[test]
        fn test_custom_error_message_is_used() {
            let rules = vec![Rule::custom(|v| {
                if v.as_str() == Some("reserved") {
                    Err("name is reserved".into())
                } else {
                    Ok(())
                }
            })];
            assert_eq!(
                evaluate(&json!("reserved"), &rules),
                vec!["name is reserved".to_string()]
            );
            assert!(evaluate(&json!("free"), &rules).is_empty());
        }

        #[test]
        fn test_custom_panic_is_caught() {
            let rules = vec![
                Rule::custom(|_| panic!("instrument offline")),
                Rule::max_length(1).with_message("after"),
            ];
            assert_eq!(
                evaluate(&json!("ab"), &rules),
                vec!["instrument offline".to_string(), "after".to_string()]
            );
        }

        #[test]
        fn test_custom_blank_error_uses_fallback() {
            let rules = vec![Rule::custom(|_| Err("".into()))];
            assert_eq!(evaluate(&json!("x"), &rules), vec!["validation failed".to_string()]);
        }

        #[test]
        fn test_custom_messages_are_applied() {
            let evaluator = Evaluator::new(Messages {
                required: "obligatoire".to_string(),
                ..Default::default()
            });
            assert_eq!(
                evaluator.evaluate(&json!(""), &[Rule::required()]),
                vec!["obligatoire".to_string()]
            );
        }

        #[test]
        fn test_sync_pass_ignores_async_rules() {
            let rules = vec![Rule::custom_async(|_| async { Ok(Some("async".to_string())) })];
            assert!(evaluate(&json!("x"), &rules).is_empty());
        }
    }

    mod async_pass {
        use super::*;
        use pretty_assertions::assert_eq;

        #[tokio::test]
        async fn test_async_message_is_appended() {
            let rules = vec![Rule::custom_async(|_| async { Ok(Some("taken".to_string())) })];
            assert_eq!(evaluate_async(&json!("A"), &rules).await, vec!["taken".to_string()]);
        }

        #[tokio::test]
        async fn test_async_rules_run_sequentially_in_order() {
            let log = Arc::new(Mutex::new(Vec::new()));
            let first_log = Arc::clone(&log);
            let second_log = Arc::clone(&log);
            let rules = vec![
                Rule::custom_async(move |_| {
                    let log = Arc::clone(&first_log);
                    async move {
                        log.lock().unwrap().push("first:start");
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        log.lock().unwrap().push("first:end");
                        Ok(Some("one".to_string()))
                    }
                }),
                Rule::custom_async(move |_| {
                    let log = Arc::clone(&second_log);
                    async move {
                        log.lock().unwrap().push("second:start");
                        Ok(Some("two".to_string()))
                    }
                }),
            ];

            let errors = evaluate_async(&json!("x"), &rules).await;
            assert_eq!(errors, vec!["one".to_string(), "two".to_string()]);
            assert_eq!(
                *log.lock().unwrap(),
                vec!["first:start", "first:end", "second:start"]
            );
        }

        #[tokio::test]
        async fn test_sync_errors_precede_async_errors() {
            let rules = vec![
                Rule::custom_async(|_| async { Ok(Some("async".to_string())) }),
                Rule::min_length(5).with_message("sync"),
            ];
            let errors = Evaluator::default().evaluate_all(&json!("ab"), &rules).await;
            assert_eq!(errors, vec!["sync".to_string(), "async".to_string()]);
        }

        #[tokio::test]
        async fn test_async_fault_and_panic_are_converted() {
            let rules = vec![
                Rule::custom_async(|_| async { Err("lookup service down".into()) }),
                Rule::custom_async(|_| async { panic!("boom") }),
            ];
            assert_eq!(
                evaluate_async(&json!("x"), &rules).await,
                vec!["lookup service down".to_string(), "boom".to_string()]
            );
        }

        #[tokio::test]
        async fn test_async_rules_skipped_for_empty_value() {
            let mut mock = MockAsyncRule::new();
            mock.expect_check().times(0);
            let rules = vec![Rule::from_async_rule(mock)];
            assert!(evaluate_async(&json!(""), &rules).await.is_empty());
        }

        #[tokio::test]
        async fn test_mocked_async_rule_receives_value() {
            let mut mock = MockAsyncRule::new();
            mock.expect_check()
                .withf(|v| v == &json!("LAB-0001"))
                .times(1)
                .returning(|_| Ok(Some("badge already issued".to_string())));
            let rules = vec![Rule::from_async_rule(mock)];
            assert_eq!(
                evaluate_async(&json!("LAB-0001"), &rules).await,
                vec!["badge already issued".to_string()]
            );
        }

        #[test]
        fn test_evaluate_all_without_async_rules_completes_immediately() {
            let rules = vec![Rule::required().with_message("M")];
            let errors =
                tokio_test::block_on(Evaluator::default().evaluate_all(&json!(""), &rules));
            assert_eq!(errors, vec!["M".to_string()]);
        }
    }
}
