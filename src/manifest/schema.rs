//! Manifest document schema.
//!
//! These types mirror the JSON manifest a service publishes to describe the
//! actions machine callers may invoke. All types derive Serde traits; fields
//! the gateway does not act on (selectors, output descriptions) are ignored
//! on parse.

use std::fmt;

use axum::http::Method;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::input::ParamValue;

/// The full declared capability set of a service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared actions, in document order.
    pub actions: Vec<ActionDefinition>,

    /// Named sequences of action ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workflows: Vec<Workflow>,

    #[serde(default)]
    pub rate_limits: RateLimitSettings,

    #[serde(default)]
    pub authentication: AuthenticationSettings,
}

impl ActionManifest {
    /// A manifest with no actions. Every gated request resolves to
    /// `unknown_action` against it.
    pub fn empty() -> Self {
        Self {
            version: Some("1.0".to_string()),
            name: None,
            description: None,
            actions: Vec::new(),
            workflows: Vec::new(),
            rate_limits: RateLimitSettings::default(),
            authentication: AuthenticationSettings::default(),
        }
    }

    /// Whether invoking `action` needs an authenticated caller.
    ///
    /// The action's own flag always wins; otherwise the manifest-wide
    /// `authentication.required` applies unless the action is listed in
    /// `authentication.optional_for`.
    pub fn requires_auth(&self, action: &ActionDefinition) -> bool {
        if action.authentication_required {
            return true;
        }
        self.authentication.required
            && !self
                .authentication
                .optional_for
                .iter()
                .any(|id| id == &action.id)
    }
}

/// One invocable action.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionDefinition {
    /// Unique action identifier.
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Free-form category (`search`, `form_submission`, ...).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// HTTP method (e.g., "POST").
    pub method: String,

    /// Endpoint path; path parameters use `{name}` segments.
    pub endpoint: String,

    #[serde(default)]
    pub authentication_required: bool,

    /// Declared parameters, in document order.
    #[serde(default)]
    pub inputs: Vec<InputDefinition>,
}

impl ActionDefinition {
    /// Parsed HTTP method, if the declared method is a standard one.
    pub fn http_method(&self) -> Option<Method> {
        match self.method.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "PATCH" => Some(Method::PATCH),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            _ => None,
        }
    }

    pub fn input(&self, name: &str) -> Option<&InputDefinition> {
        self.inputs.iter().find(|i| i.name == name)
    }
}

/// One parameter of an action.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputDefinition {
    pub name: String,

    #[serde(default, rename = "type")]
    pub kind: InputType,

    #[serde(default)]
    pub required: bool,

    /// Value used when an optional parameter is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRule>,
}

/// Declared parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputType::String => "string",
            InputType::Integer => "integer",
            InputType::Number => "number",
            InputType::Boolean => "boolean",
            InputType::Array => "array",
            InputType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Constraints on a parameter's value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<ParamValue>>,
}

/// A regular expression compiled once at manifest load.
///
/// An expression that fails to compile is kept as source text only; the
/// validator skips it instead of failing the request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub struct Pattern {
    source: String,
    compiled: Option<Regex>,
}

impl Pattern {
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    /// Tests `value` against the expression, requiring the match to begin
    /// at the first character. `None` when the expression did not compile.
    pub fn matches_start(&self, value: &str) -> Option<bool> {
        self.compiled
            .as_ref()
            .map(|re| re.find(value).is_some_and(|m| m.start() == 0))
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        let compiled = match Regex::new(&source) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(pattern = %source, error = %e, "Ignoring invalid validation pattern");
                None
            }
        };
        Self { source, compiled }
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.source
    }
}

/// A named sequence of actions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Workflow {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub steps: Vec<String>,
}

/// Manifest-level rate-limit settings. Absent values fall back to the
/// limiter's defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RateLimitSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_minute: Option<u32>,

    /// Published for callers; not enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_hour: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burst_limit: Option<u32>,

    /// Published for callers; not enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrent_requests: Option<u32>,
}

/// Manifest-level authentication settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthenticationSettings {
    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_for: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
}
