//! Validation-rule model.
//!
//! Hosts declare per-field rules either as `|`-delimited strings
//! (`"required|integer|in:a,b"`) or as arrays whose items are plain tokens or
//! custom rule objects. Both shapes are parsed once into [`Rule`] values.

use crate::type_resolver::rule_to_type;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

/// A single parsed validation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// `required`
    Required,
    /// `present`
    Present,
    /// A token that implies an OpenAPI type (`integer`, `numeric`, ...)
    Type(String),
    /// `in:a,b,c`
    Enum(Vec<String>),
    /// Any other plain token, kept verbatim (`max:255`, `email`, ...)
    Token(String),
    /// A rule object; `description` is what it reports about itself, if anything
    Custom {
        name: String,
        description: Option<String>,
    },
}

impl Rule {
    /// Parses a single plain token.
    pub fn parse(token: &str) -> Rule {
        let token = token.trim();
        match token {
            "required" => Rule::Required,
            "present" => Rule::Present,
            _ if rule_to_type(token).is_some() => Rule::Type(token.to_string()),
            _ => match token.strip_prefix("in:") {
                Some(values) => Rule::Enum(values.split(',').map(str::to_string).collect()),
                None => Rule::Token(token.to_string()),
            },
        }
    }

    /// Text of the rule as it was declared. Custom rules show their description.
    pub fn display(&self) -> Option<String> {
        match self {
            Rule::Required => Some("required".to_string()),
            Rule::Present => Some("present".to_string()),
            Rule::Type(kind) => Some(kind.clone()),
            Rule::Enum(values) => Some(format!("in:{}", values.join(","))),
            Rule::Token(token) => Some(token.clone()),
            Rule::Custom { name, description } => {
                if description.is_none() {
                    debug!("Rule {} has no description", name);
                }
                description.clone()
            }
        }
    }

    /// Whether the rule is already expressed by a schema's `type`/`required`.
    pub fn is_structural(&self) -> bool {
        matches!(self, Rule::Required | Rule::Type(_))
    }
}

/// Parses a `|`-delimited rule string. Empty segments are skipped.
pub fn parse_rule_str(rules: &str) -> Vec<Rule> {
    rules
        .split('|')
        .filter(|token| !token.trim().is_empty())
        .map(Rule::parse)
        .collect()
}

/// Whether the rule list makes a field mandatory (`required` or `present`).
pub fn is_required(rules: &[Rule]) -> bool {
    rules
        .iter()
        .any(|rule| matches!(rule, Rule::Required | Rule::Present))
}

/// Values of the last `in:` rule, if any.
pub fn enum_values(rules: &[Rule]) -> Option<Vec<String>> {
    rules.iter().rev().find_map(|rule| match rule {
        Rule::Enum(values) => Some(values.clone()),
        _ => None,
    })
}

/// Rules for one field, deserialisable from either declared shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawRules")]
pub struct FieldRules(pub Vec<Rule>);

impl FieldRules {
    pub fn rules(&self) -> &[Rule] {
        &self.0
    }
}

impl From<&str> for FieldRules {
    fn from(rules: &str) -> Self {
        FieldRules(parse_rule_str(rules))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRules {
    Delimited(String),
    List(Vec<RawRule>),
    Malformed(Value),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRule {
    Token(String),
    Object {
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
    Malformed(Value),
}

/// Keeps an unreadable rule as an opaque custom rule, which types as `string`.
fn malformed(value: Value) -> Rule {
    warn!("Ignoring malformed validation rule {}", value);
    Rule::Custom {
        name: value.to_string(),
        description: None,
    }
}

impl From<RawRules> for FieldRules {
    fn from(raw: RawRules) -> Self {
        match raw {
            RawRules::Delimited(rules) => FieldRules(parse_rule_str(&rules)),
            RawRules::List(items) => FieldRules(
                items
                    .into_iter()
                    .map(|item| match item {
                        RawRule::Token(token) => Rule::parse(&token),
                        RawRule::Object { name, description } => Rule::Custom { name, description },
                        RawRule::Malformed(value) => malformed(value),
                    })
                    .collect(),
            ),
            RawRules::Malformed(value) => FieldRules(vec![malformed(value)]),
        }
    }
}
