//! Input validation against an action's declared schema.
//!
//! # Responsibilities
//! - Required-parameter checks
//! - Type checks against the declared input type
//! - Rule checks (pattern, numeric range, length, enum)
//!
//! # Design Decisions
//! - Returns every violation, not just the first
//! - A wrongly-typed value gets one type error and no rule errors
//! - A rule that cannot apply to the value's type is skipped, never an error
//! - Pure: neither the manifest nor the observed parameters are mutated

use crate::input::value::{format_number, ParamMap, ParamValue};
use crate::manifest::{ActionDefinition, InputDefinition, ValidationRule};

/// Outcome of validating one request's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub valid: bool,
    /// Violations in input declaration order.
    pub errors: Vec<String>,
    /// Observed parameters plus declared defaults for absent optional inputs.
    pub params: ParamMap,
}

/// Validate `observed` against every input `action` declares.
pub fn validate_inputs(action: &ActionDefinition, observed: &ParamMap) -> ValidationResult {
    let mut errors = Vec::new();
    let mut params = observed.clone();

    for input in &action.inputs {
        let value = observed.get(&input.name).filter(|v| !v.is_null());

        let Some(value) = value else {
            if input.required {
                errors.push(format!("Parameter '{}' is required", input.name));
            } else if let Some(default) = &input.default {
                params.insert(input.name.clone(), default.clone());
            }
            continue;
        };

        if !value.matches(input.kind) {
            errors.push(format!("Parameter '{}' should be {}", input.name, input.kind));
            continue;
        }

        if let Some(rule) = &input.validation {
            check_rules(input, rule, value, &mut errors);
        }
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
        params,
    }
}

fn check_rules(
    input: &InputDefinition,
    rule: &ValidationRule,
    value: &ParamValue,
    errors: &mut Vec<String>,
) {
    let name = &input.name;

    if let (Some(pattern), ParamValue::String(text)) = (&rule.pattern, value) {
        if pattern.matches_start(text) == Some(false) {
            errors.push(format!("Parameter '{}' does not match required pattern", name));
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = rule.min.filter(|min| n < *min) {
            errors.push(format!("Parameter '{}' must be >= {}", name, format_number(min)));
        }
        if let Some(max) = rule.max.filter(|max| n > *max) {
            errors.push(format!("Parameter '{}' must be <= {}", name, format_number(max)));
        }
    }

    if let Some(len) = value.length() {
        if let Some(min) = rule.min_length.filter(|min| len < *min) {
            errors.push(format!("Parameter '{}' must have length >= {}", name, min));
        }
        if let Some(max) = rule.max_length.filter(|max| len > *max) {
            errors.push(format!("Parameter '{}' must have length <= {}", name, max));
        }
    }

    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|candidate| candidate.loosely_equals(value)) {
            let listed = allowed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            errors.push(format!("Parameter '{}' must be one of: {}", name, listed));
        }
    }
}
