//! Manifest semantic checks.
//!
//! Serde handles the structural shape; this module checks what serde cannot:
//! uniqueness, method and path syntax, and internally consistent rules.
//! Every problem is reported, not just the first.

use std::collections::{HashMap, HashSet};

use crate::manifest::error::ManifestIssue;
use crate::manifest::schema::{ActionDefinition, ActionManifest, InputDefinition};

/// Checks a parsed manifest. Pure function; warnings are only logged.
pub fn validate_manifest(manifest: &ActionManifest) -> Result<(), Vec<ManifestIssue>> {
    let mut issues = Vec::new();
    let mut ids = HashSet::new();
    let mut routes = HashSet::new();
    let mut shapes: HashMap<String, &str> = HashMap::new();

    for (idx, action) in manifest.actions.iter().enumerate() {
        let at = format!("actions[{}]", idx);

        if action.id.trim().is_empty() {
            issues.push(ManifestIssue::new(&at, "action id must not be empty"));
        } else if !ids.insert(action.id.as_str()) {
            issues.push(ManifestIssue::new(
                &at,
                format!("duplicate action id '{}'", action.id),
            ));
        }

        match action.http_method() {
            Some(method) => {
                if !routes.insert((method.clone(), action.endpoint.as_str())) {
                    issues.push(ManifestIssue::new(
                        &at,
                        format!("{} {} is declared more than once", method, action.endpoint),
                    ));
                }
            }
            None => issues.push(ManifestIssue::new(
                format!("{}.method", at),
                format!("unsupported HTTP method '{}'", action.method),
            )),
        }

        if let Some(shape) = check_endpoint(&at, &action.endpoint, &mut issues) {
            match shapes.get(&shape) {
                Some(&other) if other != action.endpoint => issues.push(ManifestIssue::new(
                    format!("{}.endpoint", at),
                    format!("conflicts with '{}' (same path, different parameter names)", other),
                )),
                Some(_) => {}
                None => {
                    shapes.insert(shape, action.endpoint.as_str());
                }
            }
        }
        check_inputs(&at, action, &mut issues);
    }

    for workflow in &manifest.workflows {
        for step in &workflow.steps {
            if !ids.contains(step.as_str()) {
                tracing::warn!(
                    workflow = %workflow.id,
                    step = %step,
                    "Workflow step references an undeclared action"
                );
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Returns the endpoint with parameter names erased when it is well formed.
fn check_endpoint(at: &str, endpoint: &str, issues: &mut Vec<ManifestIssue>) -> Option<String> {
    let location = format!("{}.endpoint", at);
    if !endpoint.starts_with('/') {
        issues.push(ManifestIssue::new(&location, "must start with '/'"));
        return None;
    }

    let before = issues.len();
    let mut shape = Vec::new();
    for segment in endpoint.split('/') {
        if segment.starts_with(':') || segment.starts_with('*') {
            issues.push(ManifestIssue::new(
                &location,
                format!("segment '{}' must use {{param}} syntax", segment),
            ));
        } else if segment.contains(['{', '}']) {
            let name = segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .map(|s| s.strip_prefix('*').unwrap_or(s));
            match name {
                Some(name) if !name.is_empty() && !name.contains(['{', '}']) => {
                    shape.push(if segment.starts_with("{*") { "{*}" } else { "{}" });
                    continue;
                }
                _ => issues.push(ManifestIssue::new(
                    &location,
                    format!("segment '{}' is not a valid path parameter", segment),
                )),
            }
        }
        shape.push(segment);
    }

    (issues.len() == before).then(|| shape.join("/"))
}

fn check_inputs(at: &str, action: &ActionDefinition, issues: &mut Vec<ManifestIssue>) {
    let mut names = HashSet::new();
    for (idx, input) in action.inputs.iter().enumerate() {
        let location = format!("{}.inputs[{}]", at, idx);
        if !names.insert(input.name.as_str()) {
            issues.push(ManifestIssue::new(
                &location,
                format!("duplicate input name '{}'", input.name),
            ));
        }
        check_input(&location, input, issues);
    }
}

fn check_input(location: &str, input: &InputDefinition, issues: &mut Vec<ManifestIssue>) {
    if input.name.trim().is_empty() {
        issues.push(ManifestIssue::new(location, "input name must not be empty"));
    }

    if let Some(default) = &input.default {
        if !default.matches(input.kind) {
            issues.push(ManifestIssue::new(
                location,
                format!(
                    "default for '{}' is {} but the input is declared {}",
                    input.name,
                    default.type_name(),
                    input.kind
                ),
            ));
        }
    }

    let Some(rule) = &input.validation else {
        return;
    };
    if let (Some(min), Some(max)) = (rule.min, rule.max) {
        if min > max {
            issues.push(ManifestIssue::new(location, "min is greater than max"));
        }
    }
    if let (Some(min), Some(max)) = (rule.min_length, rule.max_length) {
        if min > max {
            issues.push(ManifestIssue::new(
                location,
                "minLength is greater than maxLength",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(actions: serde_json::Value) -> ActionManifest {
        serde_json::from_value(serde_json::json!({ "actions": actions })).unwrap()
    }

    #[test]
    fn test_valid_manifest_passes() {
        let m = manifest(serde_json::json!([
            {"id": "search", "method": "GET", "endpoint": "/api/search"},
            {"id": "view", "method": "get", "endpoint": "/product/{product_id}"}
        ]));
        assert!(validate_manifest(&m).is_ok());
    }

    #[test]
    fn test_reports_all_issues() {
        let m = manifest(serde_json::json!([
            {"id": "a", "method": "GET", "endpoint": "/a"},
            {"id": "a", "method": "FETCH", "endpoint": "b"},
            {"id": "c", "method": "GET", "endpoint": "/a"}
        ]));
        let issues = validate_manifest(&m).unwrap_err();
        assert_eq!(issues.len(), 4);
        assert!(issues[0].message.contains("duplicate action id"));
        assert!(issues[1].message.contains("unsupported HTTP method"));
        assert!(issues[2].message.contains("must start with '/'"));
        assert!(issues[3].message.contains("declared more than once"));
    }

    #[test]
    fn test_colon_path_segments_rejected() {
        let m = manifest(serde_json::json!([
            {"id": "view", "method": "GET", "endpoint": "/product/:id"}
        ]));
        let issues = validate_manifest(&m).unwrap_err();
        assert_eq!(issues[0].location, "actions[0].endpoint");
    }

    #[test]
    fn test_conflicting_parameter_names_rejected() {
        let m = manifest(serde_json::json!([
            {"id": "view", "method": "GET", "endpoint": "/product/{id}"},
            {"id": "edit", "method": "PUT", "endpoint": "/product/{sku}"},
            {"id": "bad", "method": "GET", "endpoint": "/oops/{open"}
        ]));
        let issues = validate_manifest(&m).unwrap_err();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].message.contains("conflicts with '/product/{id}'"));
        assert!(issues[1].message.contains("not a valid path parameter"));
    }

    #[test]
    fn test_default_must_match_type() {
        let m = manifest(serde_json::json!([
            {"id": "list", "method": "GET", "endpoint": "/list", "inputs": [
                {"name": "page", "type": "integer", "default": "one"}
            ]}
        ]));
        let issues = validate_manifest(&m).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("declared integer"));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let m = manifest(serde_json::json!([
            {"id": "rate", "method": "POST", "endpoint": "/rate", "inputs": [
                {"name": "stars", "type": "integer", "validation": {"min": 5, "max": 1}},
                {"name": "stars", "type": "string", "validation": {"minLength": 4, "maxLength": 2}}
            ]}
        ]));
        let issues = validate_manifest(&m).unwrap_err();
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn test_unknown_workflow_step_is_only_a_warning() {
        let m: ActionManifest = serde_json::from_value(serde_json::json!({
            "actions": [{"id": "search", "method": "GET", "endpoint": "/search"}],
            "workflows": [{"id": "buy", "steps": ["search", "checkout"]}]
        }))
        .unwrap();
        assert!(validate_manifest(&m).is_ok());
    }
}
