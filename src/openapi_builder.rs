use crate::config::{Config, SecurityMode};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Methods recognised as operations inside a path item.
pub const HTTP_METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// Builder for the empty document new accumulations start from
pub struct OpenApiBuilder {
    /// OpenAPI version string
    openapi: String,
    /// OpenAPI info section
    info: Option<Info>,
    /// Declared servers
    servers: Vec<Server>,
    /// Security schemes by name
    security_schemes: BTreeMap<String, Value>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// OpenAPI version
    #[serde(default)]
    pub openapi: String,
    /// API info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,
    /// Base URLs
    #[serde(default)]
    pub servers: Vec<Server>,
    /// API paths, keyed by normalized URI
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
    /// Components (schemas, security schemes)
    #[serde(default)]
    pub components: Components,
    #[serde(default)]
    pub tags: Vec<Value>,
    #[serde(rename = "externalDocs", default, skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
    /// Any other top-level key, kept as-is
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// OpenAPI License object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl License {
    /// Drops empty entries; `None` when nothing is left.
    pub fn pruned(self) -> Option<License> {
        let license = License {
            name: self.name.filter(|name| !name.is_empty()),
            url: self.url.filter(|url| !url.is_empty()),
        };
        if license.name.is_none() && license.url.is_none() {
            None
        } else {
            Some(license)
        }
    }
}

/// OpenAPI Server object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI External Documentation object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalDocs {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions
    #[serde(default)]
    pub schemas: BTreeMap<String, Value>,
    /// Security scheme definitions
    #[serde(rename = "securitySchemes", default)]
    pub security_schemes: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// OpenAPI PathItem object - operations by lowercase method, plus any other keys
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Value>", into = "BTreeMap<String, Value>")]
pub struct PathItem {
    pub operations: BTreeMap<String, Operation>,
    /// Path-level keys such as `summary` or shared `parameters`
    pub extensions: BTreeMap<String, Value>,
}

impl TryFrom<BTreeMap<String, Value>> for PathItem {
    type Error = serde_json::Error;

    fn try_from(raw: BTreeMap<String, Value>) -> Result<Self, Self::Error> {
        let mut item = PathItem::default();
        for (key, value) in raw {
            if HTTP_METHODS.contains(&key.as_str()) {
                item.operations.insert(key, serde_json::from_value(value)?);
            } else {
                item.extensions.insert(key, value);
            }
        }
        Ok(item)
    }
}

impl From<PathItem> for BTreeMap<String, Value> {
    fn from(item: PathItem) -> Self {
        let mut raw = item.extensions;
        for (method, operation) in item.operations {
            // Operation holds only string-keyed maps, so this cannot fail.
            raw.insert(method, serde_json::to_value(operation).unwrap_or(Value::Null));
        }
        raw
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "operationId", default, skip_serializing_if = "String::is_empty")]
    pub operation_id: String,
    /// Parameters (path, query, header)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses by status code
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub responses: BTreeMap<String, Response>,
    /// Security requirements; at most one entry is ever recorded
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<BTreeMap<String, Vec<String>>>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl Operation {
    /// Whether a parameter with this location and name is already recorded.
    pub fn has_parameter(&self, location: ParameterLocation, name: &str) -> bool {
        self.parameters
            .iter()
            .any(|parameter| parameter.location == Some(location) && parameter.name == name)
    }
}

/// The location of a parameter in an HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
    Cookie,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ParameterLocation>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<ParameterSchema>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// Schema of a single parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl ParameterSchema {
    pub fn of_type(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Default::default()
        }
    }
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Media types by MIME type
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Captured example; `Some(Value::Null)` is a recorded `null` body
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl MediaType {
    pub fn with_example(example: Value) -> Self {
        Self {
            example: Some(example),
            ..Default::default()
        }
    }
}

/// Response content: a media type, or a placeholder for content that cannot be previewed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaContent {
    Placeholder(String),
    Media(MediaType),
}

/// OpenAPI Response object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaContent>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// `$ref` value pointing at a component schema.
pub fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{}", name) })
}

fn deserialize_some<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Document {
    pub fn operation(&self, uri: &str, method: &str) -> Option<&Operation> {
        self.paths.get(uri)?.operations.get(method)
    }

    /// Number of `(path, method)` pairs in the document.
    pub fn operation_count(&self) -> usize {
        self.paths.values().map(|item| item.operations.len()).sum()
    }
}

/// Definition written to `components.securitySchemes` for a security mode.
pub fn security_scheme(mode: SecurityMode) -> Value {
    match mode {
        SecurityMode::Jwt => json!({
            "type": "apiKey",
            "name": "Authorization",
            "in": "header",
        }),
        SecurityMode::Laravel => json!({
            "type": "apiKey",
            "name": "Cookie",
            "in": "header",
        }),
    }
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with no info
    pub fn new() -> Self {
        Self {
            openapi: "3.0.0".to_string(),
            info: None,
            servers: Vec::new(),
            security_schemes: BTreeMap::new(),
        }
    }

    /// Seed builder from configuration
    pub fn from_config(config: &Config, security: Option<SecurityMode>) -> Self {
        let mut builder = Self::new()
            .with_version(&config.swagger.version)
            .with_servers(config.servers.clone());

        if !config.info.is_empty() {
            builder = builder.with_info(config.info.to_info());
        }
        if let Some(mode) = security {
            builder = builder.with_security(mode);
        }
        builder
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.openapi = version.to_string();
        self
    }

    /// Set custom info for the API; an empty license is dropped
    pub fn with_info(mut self, mut info: Info) -> Self {
        info.license = info.license.and_then(License::pruned);
        self.info = Some(info);
        self
    }

    pub fn with_servers(mut self, servers: Vec<Server>) -> Self {
        self.servers = servers;
        self
    }

    pub fn with_security(mut self, mode: SecurityMode) -> Self {
        self.security_schemes
            .insert(mode.as_str().to_string(), security_scheme(mode));
        self
    }

    /// Build the empty document
    pub fn build(self) -> Document {
        debug!("Building empty OpenAPI document");

        Document {
            openapi: self.openapi,
            info: self.info,
            servers: self.servers,
            paths: BTreeMap::new(),
            components: Components {
                schemas: BTreeMap::new(),
                security_schemes: self.security_schemes,
                extensions: BTreeMap::new(),
            },
            tags: Vec::new(),
            external_docs: Some(ExternalDocs::default()),
            extensions: BTreeMap::new(),
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn info(license: Option<License>) -> Info {
        Info {
            title: "Orders API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            license,
            extensions: BTreeMap::new(),
        }
    }

    #[test]
    fn test_new_builder() {
        let document = OpenApiBuilder::new().build();

        assert_eq!(document.openapi, "3.0.0");
        assert!(document.info.is_none());
        assert!(document.paths.is_empty());
        assert!(document.components.security_schemes.is_empty());
        assert_eq!(document.external_docs, Some(ExternalDocs::default()));
    }

    #[test]
    fn test_with_info_prunes_empty_license_entries() {
        let document = OpenApiBuilder::new()
            .with_info(info(Some(License {
                name: Some("MIT".to_string()),
                url: Some(String::new()),
            })))
            .build();

        let license = document.info.unwrap().license.unwrap();
        assert_eq!(license.name, Some("MIT".to_string()));
        assert_eq!(license.url, None);
    }

    #[test]
    fn test_with_info_drops_empty_license() {
        let document = OpenApiBuilder::new()
            .with_info(info(Some(License {
                name: Some(String::new()),
                url: None,
            })))
            .build();

        let json = serde_json::to_value(&document).unwrap();
        assert!(json["info"].get("license").is_none());
    }

    #[test]
    fn test_with_security() {
        let document = OpenApiBuilder::new().with_security(SecurityMode::Jwt).build();

        assert_eq!(
            document.components.security_schemes["jwt"],
            json!({"type": "apiKey", "name": "Authorization", "in": "header"})
        );
    }

    #[test]
    fn test_path_item_keeps_non_operation_keys() {
        let raw = json!({
            "summary": "Users",
            "parameters": [{"$ref": "#/components/parameters/Tenant"}],
            "get": {"responses": {"200": {"description": "OK"}}}
        });

        let item: PathItem = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(item.operations.len(), 1);
        assert_eq!(item.extensions.len(), 2);
        assert_eq!(item.operations["get"].responses["200"].description, "OK");

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["summary"], raw["summary"]);
        assert_eq!(back["parameters"], raw["parameters"]);
    }

    #[test]
    fn test_media_content_shapes() {
        let placeholder: MediaContent = serde_json::from_value(json!("*Unavailable for preview*")).unwrap();
        assert_eq!(placeholder, MediaContent::Placeholder("*Unavailable for preview*".to_string()));

        let media: MediaContent = serde_json::from_value(json!({"example": null})).unwrap();
        assert_eq!(media, MediaContent::Media(MediaType::with_example(Value::Null)));
    }

    #[test]
    fn test_parameter_serialization() {
        let parameter = Parameter {
            location: Some(ParameterLocation::Path),
            name: "id".to_string(),
            description: Some(String::new()),
            required: Some(true),
            schema: Some(ParameterSchema::of_type("string")),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&parameter).unwrap(),
            json!({
                "in": "path",
                "name": "id",
                "description": "",
                "required": true,
                "schema": {"type": "string"}
            })
        );
    }

    #[test]
    fn test_document_operation_lookup() {
        let raw = json!({
            "openapi": "3.0.0",
            "paths": {
                "/a": {"get": {}, "post": {}},
                "/b": {"get": {}}
            },
            "x-generator": "hand-written"
        });

        let document: Document = serde_json::from_value(raw).unwrap();
        assert_eq!(document.operation_count(), 3);
        assert!(document.operation("/a", "post").is_some());
        assert!(document.operation("/b", "post").is_none());
        assert_eq!(document.extensions["x-generator"], "hand-written");
    }
}
