use openapi_from_traffic::{
    config::Config,
    driver::{DocumentDriver, StorageDriver},
    extractor::recorded::Recording,
    openapi_builder::Document,
    serializer::serialize_json,
    service::AutoDoc,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const USERS_RECORDING: &str = r#"{
    "routes": [
        {"method": "GET", "template": "/api/users/{id}"},
        {"method": "POST", "template": "/api/users"}
    ],
    "handlers": {
        "UserController@show": ["builtin", {"concrete": "ShowUserRequest"}],
        "UserController@store": [{"interface": "StoresUsers"}]
    },
    "bindings": {"StoresUsers": "CreateUserRequest"},
    "requests": {
        "ShowUserRequest": {
            "query_rules": {"id": "required|integer"}
        },
        "CreateUserRequest": {
            "doc_comment": "/**\n * @summary Create a user\n * @_201 User created\n */",
            "body_rules": {
                "name": "required|string|max:255",
                "age": "integer",
                "role": ["required", "in:admin,member"]
            },
            "attributes": {"name": "Full name"}
        }
    },
    "exchanges": [
        {
            "request": {
                "method": "GET",
                "uri": "/api/users/7?id=7",
                "headers": {"authorization": "Bearer token"},
                "input": {"id": "7"},
                "route": {"controller": "UserController", "action": "show"}
            },
            "response": {"status": 200, "headers": {"content-type": "application/json"}, "body": {"id": 7, "name": "Ann"}}
        },
        {
            "request": {
                "method": "GET",
                "uri": "/api/users/8?id=8",
                "input": {"id": "8"},
                "route": {"controller": "UserController", "action": "show"}
            },
            "response": {"status": 200, "headers": {"content-type": "application/json"}, "body": {"id": 8, "name": "Bob"}}
        },
        {
            "request": {
                "method": "POST",
                "uri": "/api/users",
                "headers": {"content-type": "application/json", "authorization": "Bearer token", "x-request-id": "abc"},
                "input": {"name": "Cid", "age": null, "role": "member"},
                "route": {"template": "/api/users", "controller": "UserController", "action": "store"}
            },
            "response": {"status": 201, "headers": {"content-type": "application/json"}, "body": {"id": 9}}
        },
        {
            "request": {
                "method": "GET",
                "uri": "/api/users/9/avatar",
                "route": {"template": "/api/users/{id}/avatar"}
            },
            "response": {"status": 200, "headers": {"content-type": "video/mp4"}, "body": "binary"}
        }
    ]
}"#;

/// Helper function to write a configuration file into a temporary directory
fn write_config(dir: &Path, driver: &str, extra: &str) -> Config {
    let config_path = dir.join("autodoc.yaml");
    let content = format!(
        r#"config_version: "2.1"
enabled: true
driver: {driver}
drivers:
  local:
    production_path: {production}
  storage:
    production_path: {production}
    temporary_path: {temporary}
security: jwt
base_path: /api
info:
  title: Users API
  version: "1.0.0"
  license:
    name: MIT
    url: ""
{extra}"#,
        driver = driver,
        production = dir.join("documentation.json").display(),
        temporary = dir.join("documentation.tmp.json").display(),
        extra = extra,
    );
    fs::write(&config_path, content).expect("Failed to write config");
    Config::load(&config_path).expect("Failed to load config")
}

fn replay(autodoc: &AutoDoc, recording: &Recording) {
    for exchange in &recording.exchanges {
        let (request, response) = exchange.to_captured().expect("Invalid exchange");
        autodoc
            .observe(&request, &response, recording)
            .expect("Failed to observe exchange");
    }
}

fn final_json(dir: &Path) -> Value {
    let content = fs::read_to_string(dir.join("documentation.json")).expect("No final document");
    serde_json::from_str(&content).expect("Final document is not JSON")
}

#[test]
fn test_users_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path(), "local", "");
    let recording = Recording::from_json_str(USERS_RECORDING).unwrap();

    let autodoc = AutoDoc::new(config).unwrap();
    replay(&autodoc, &recording);
    autodoc.flush().unwrap();

    let doc = final_json(temp_dir.path());

    assert_eq!(doc["openapi"], json!("3.0.0"));
    assert_eq!(
        doc["info"],
        json!({"title": "Users API", "version": "1.0.0", "license": {"name": "MIT"}})
    );
    assert_eq!(
        doc["components"]["securitySchemes"]["jwt"],
        json!({"type": "apiKey", "name": "Authorization", "in": "header"})
    );

    let show = &doc["paths"]["/users/{id}"]["get"];
    assert_eq!(
        show["parameters"],
        json!([
            {"in": "path", "name": "id", "description": "", "required": true, "schema": {"type": "string"}},
            {"in": "query", "name": "id", "description": "required, integer", "required": true, "schema": {"type": "integer"}}
        ])
    );
    assert_eq!(show["tags"], json!(["users"]));
    assert_eq!(show["summary"], json!("show user"));
    assert_eq!(show["operationId"], json!("Get/users/{id}UsersIdId"));
    assert_eq!(show["security"], json!([{"jwt": []}]));
    assert_eq!(
        show["responses"]["200"],
        json!({
            "description": "OK",
            "content": {"application/json": {"example": {"id": 7, "name": "Ann"}}}
        })
    );
    assert!(show.get("requestBody").is_none());

    let store = &doc["paths"]["/users"]["post"];
    assert_eq!(store["summary"], json!("Create a user"));
    assert_eq!(store["responses"]["201"]["description"], json!("User created"));
    assert_eq!(
        store["requestBody"],
        json!({
            "description": "",
            "required": true,
            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/usersRequestObject"}}}
        })
    );
    assert_eq!(
        store["parameters"],
        json!([{
            "in": "header",
            "name": "x-request-id",
            "required": true,
            "example": "abc",
            "schema": {"type": "string"}
        }])
    );

    assert_eq!(
        doc["components"]["schemas"]["usersRequestObject"],
        json!({
            "type": "object",
            "properties": {
                "age": {"type": "integer", "description": ""},
                "name": {"type": "string", "description": "Full name"},
                "role": {"type": "string", "description": "in:admin,member"}
            },
            "required": ["name", "role"],
            "example": {"name": "Cid", "age": 0, "role": "member"}
        })
    );

    let avatar = &doc["paths"]["/users/{id}/avatar"]["get"];
    assert!(avatar.get("description").is_none());
    assert!(avatar.get("operationId").is_none());
    assert_eq!(
        avatar["responses"]["200"]["content"]["video/mp4"],
        json!("*Unavailable for preview*")
    );
}

#[test]
fn test_replay_twice_is_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path(), "storage", "");
    let recording = Recording::from_json_str(USERS_RECORDING).unwrap();

    let autodoc = AutoDoc::new(config.clone()).unwrap();
    replay(&autodoc, &recording);
    let first = fs::read_to_string(temp_dir.path().join("documentation.tmp.json")).unwrap();

    // A second instance picks up the stored transient document
    let again = AutoDoc::new(config).unwrap();
    replay(&again, &recording);
    let second = fs::read_to_string(temp_dir.path().join("documentation.tmp.json")).unwrap();

    assert_eq!(first, second);

    let flushed = again.flush().unwrap();
    assert_eq!(serialize_json(&flushed).unwrap(), first);
    assert!(!temp_dir.path().join("documentation.tmp.json").exists());
}

#[test]
fn test_read_merges_supplements() {
    let temp_dir = TempDir::new().unwrap();
    let supplements = temp_dir.path().join("supplements");
    fs::create_dir_all(&supplements).unwrap();
    fs::write(
        supplements.join("static.json"),
        json!({
            "paths": {
                "/users/{id}": {
                    "get": {"summary": "hand-written"},
                    "delete": {"summary": "Delete a user", "responses": {"204": {"description": "Deleted"}}}
                },
                "/health": {"get": {"responses": {"200": {"description": "Alive"}}}}
            },
            "components": {"schemas": {"Error": {"type": "object"}}}
        })
        .to_string(),
    )
    .unwrap();

    let config = write_config(
        temp_dir.path(),
        "local",
        &format!("additional_paths:\n  - {}\n", supplements.display()),
    );
    let recording = Recording::from_json_str(USERS_RECORDING).unwrap();

    let autodoc = AutoDoc::new(config).unwrap();
    replay(&autodoc, &recording);
    autodoc.flush().unwrap();

    let document = autodoc.read().unwrap();
    assert_eq!(
        document.operation("/users/{id}", "get").unwrap().summary.as_deref(),
        Some("show user")
    );
    assert_eq!(
        document.operation("/users/{id}", "delete").unwrap().summary.as_deref(),
        Some("Delete a user")
    );
    assert!(document.operation("/health", "get").is_some());
    assert!(document.components.schemas.contains_key("Error"));
    assert!(document.components.schemas.contains_key("usersRequestObject"));

    // Supplements are applied at read time only
    let stored = final_json(temp_dir.path());
    assert!(stored["paths"].get("/health").is_none());
}

#[test]
fn test_final_document_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let driver = StorageDriver::new(
        temp_dir.path().join("final.json"),
        temp_dir.path().join("transient.json"),
    )
    .unwrap();
    let document: Document = serde_json::from_value(json!({
        "openapi": "3.0.0",
        "info": {"title": "t", "version": "1"},
        "servers": [{"url": "https://api.example.com"}],
        "paths": {
            "/files/{id}": {
                "get": {
                    "tags": ["files"],
                    "parameters": [{"in": "path", "name": "id", "required": true, "schema": {"type": "string"}}],
                    "responses": {"200": {"description": "OK", "content": {"application/pdf": {"example": "JVBERg=="}}}},
                    "security": [{"jwt": []}],
                    "description": "",
                    "operationId": "Get/files/{id}FilesId"
                }
            }
        },
        "components": {"schemas": {}, "securitySchemes": {"jwt": {"type": "apiKey", "name": "Authorization", "in": "header"}}},
        "tags": [],
        "externalDocs": {"url": ""},
        "x-extra": {"kept": true}
    }))
    .unwrap();

    driver.save_final(&document).unwrap();

    assert_eq!(driver.load_final().unwrap(), document);
}
