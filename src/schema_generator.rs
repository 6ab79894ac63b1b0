use crate::extractor::Attachment;
use crate::rules::{FieldRules, Rule};
use crate::type_resolver::{default_for_type, parameter_type, value_type};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Placeholder key used for uploads that have no temporary path.
pub const UPLOAD_PLACEHOLDER_KEY: &str = "File";

const UPLOAD_PLACEHOLDER: &str = "[uploaded_file]";

/// Schema generator - builds request object schemas and their examples from
/// declared rules and live request parameters
pub struct SchemaGenerator {
    /// Display strings for opaque values, keyed by type name
    placeholders: BTreeMap<String, String>,
}

/// Object schema stored under `components.schemas`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSchema {
    /// Always `object`
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Property>,
    /// Names of fields whose rules include `required`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// Property definition for object schemas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Nested fields, for live objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Property>>,
}

impl Property {
    fn of_type(property_type: &str) -> Self {
        Self {
            property_type: property_type.to_string(),
            description: None,
            properties: None,
        }
    }
}

impl SchemaGenerator {
    pub fn new(placeholders: BTreeMap<String, String>) -> Self {
        debug!("Initializing SchemaGenerator");
        Self { placeholders }
    }

    /// Merges attachments into the live input.
    ///
    /// Each attachment replaces the value at its dot path. Uploads become
    /// `{"value": <temp path>}`, or the upload placeholder when the path is unknown;
    /// other objects become their configured display string, or their type name.
    pub fn live_parameters(&self, input: &Value, attachments: &[(String, Attachment)]) -> Value {
        let mut live = input.clone();
        if live.is_null() {
            live = Value::Object(Map::new());
        }

        for (path, attachment) in attachments {
            let replacement = match attachment {
                Attachment::Upload {
                    temp_path: Some(temp_path),
                } => serde_json::json!({ "value": temp_path }),
                Attachment::Upload { temp_path: None } => Value::String(
                    self.placeholders
                        .get(UPLOAD_PLACEHOLDER_KEY)
                        .cloned()
                        .unwrap_or_else(|| UPLOAD_PLACEHOLDER.to_string()),
                ),
                Attachment::Object { type_name } => Value::String(
                    self.placeholders
                        .get(type_name)
                        .cloned()
                        .unwrap_or_else(|| type_name.clone()),
                ),
            };
            set_dot_path(&mut live, path, replacement);
        }

        live
    }

    /// Builds the request object schema for one observation.
    ///
    /// Properties come from the body rules; live keys no rule covers are typed from
    /// their value. The example is the live payload with typed nulls backfilled.
    pub fn request_schema(
        &self,
        rules: &BTreeMap<String, FieldRules>,
        attributes: &BTreeMap<String, String>,
        annotations: &BTreeMap<String, String>,
        live: &Value,
    ) -> RequestSchema {
        let mut properties = BTreeMap::new();
        let mut required = Vec::new();

        for (field, field_rules) in rules {
            let rules = field_rules.rules();
            if rules.iter().any(|rule| matches!(rule, Rule::Required)) {
                required.push(field.clone());
            }

            properties.insert(
                field.clone(),
                Property {
                    property_type: parameter_type(rules).to_string(),
                    description: Some(field_description(
                        field,
                        rules,
                        attributes,
                        annotations,
                        true,
                    )),
                    properties: None,
                },
            );
        }

        if let Some(live) = live.as_object() {
            for (key, value) in live {
                properties
                    .entry(key.clone())
                    .or_insert_with(|| live_property(value));
            }
        }

        debug!(
            "Generated request schema with {} properties, {} required",
            properties.len(),
            required.len()
        );

        let example = replace_nulls(live, &mut Vec::new(), None, &properties);

        RequestSchema {
            schema_type: "object".to_string(),
            properties,
            required,
            example: Some(example),
        }
    }
}

/// Description of a rule-declared field.
///
/// The annotation for the field wins, then its attribute label, then the rule
/// list joined with `, `. With `skip_structural`, rules already expressed by the
/// schema (`required` and type tokens) are left out of the joined list.
pub fn field_description(
    field: &str,
    rules: &[Rule],
    attributes: &BTreeMap<String, String>,
    annotations: &BTreeMap<String, String>,
    skip_structural: bool,
) -> String {
    if let Some(annotation) = annotations.get(field).filter(|a| !a.is_empty()) {
        return annotation.clone();
    }
    if let Some(attribute) = attributes.get(field) {
        return attribute.clone();
    }

    rules
        .iter()
        .filter(|rule| !(skip_structural && rule.is_structural()))
        .filter_map(Rule::display)
        .collect::<Vec<_>>()
        .join(", ")
}

fn live_property(value: &Value) -> Property {
    let mut property = Property::of_type(value_type(value));
    if let Value::Object(fields) = value {
        property.properties = Some(
            fields
                .iter()
                .map(|(key, child)| (key.clone(), live_property(child)))
                .collect(),
        );
    }
    property
}

/// Walks the live value and swaps each `null` for the default of its known type.
///
/// A value's property is looked up by its full dot path in the top-level map
/// (array indices as `*`), then in the enclosing property's nested map, then by its
/// own key in the top-level map. Nulls of unknown type stay `null`.
fn replace_nulls(
    value: &Value,
    path: &mut Vec<String>,
    nested: Option<&BTreeMap<String, Property>>,
    top: &BTreeMap<String, Property>,
) -> Value {
    match value {
        Value::Object(fields) => {
            let mut example = Map::new();
            for (key, child) in fields {
                path.push(key.clone());
                let property = lookup(path, Some(key.as_str()), nested, top);
                example.insert(key.clone(), replace_child(child, path, property, nested, top));
                path.pop();
            }
            Value::Object(example)
        }
        Value::Array(items) => {
            path.push("*".to_string());
            let property = lookup(path, None, nested, top);
            let example = items
                .iter()
                .map(|item| replace_child(item, path, property, nested, top))
                .collect();
            path.pop();
            Value::Array(example)
        }
        other => other.clone(),
    }
}

fn replace_child(
    child: &Value,
    path: &mut Vec<String>,
    property: Option<&Property>,
    nested: Option<&BTreeMap<String, Property>>,
    top: &BTreeMap<String, Property>,
) -> Value {
    match child {
        Value::Null => property
            .and_then(|property| default_for_type(&property.property_type))
            .unwrap_or(Value::Null),
        Value::Object(_) | Value::Array(_) => {
            let scope = property.and_then(|property| property.properties.as_ref());
            replace_nulls(child, path, scope.or(nested), top)
        }
        other => other.clone(),
    }
}

fn lookup<'a>(
    path: &[String],
    key: Option<&str>,
    nested: Option<&'a BTreeMap<String, Property>>,
    top: &'a BTreeMap<String, Property>,
) -> Option<&'a Property> {
    top.get(&path.join("."))
        .or_else(|| key.and_then(|key| nested.and_then(|nested| nested.get(key))))
        .or_else(|| key.and_then(|key| top.get(key)))
}

/// Sets `value` at a dot path, creating intermediate objects as needed.
fn set_dot_path(root: &mut Value, path: &str, value: Value) {
    let mut current = root;

    for segment in path.split('.') {
        let index = match &*current {
            Value::Array(items) => segment.parse::<usize>().ok().filter(|i| *i < items.len()),
            _ => None,
        };

        current = match index {
            Some(index) => &mut current[index],
            None => {
                if !current.is_object() {
                    *current = Value::Object(Map::new());
                }
                match current {
                    Value::Object(fields) => fields.entry(segment.to_string()).or_insert(Value::Null),
                    _ => return,
                }
            }
        };
    }

    *current = value;
}
