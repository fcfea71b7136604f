//! Flattens one OpenAPI 3 / Swagger 2 document into searchable [`IndexedDocument`]s.
//!
//! Extraction never fails: a document without `paths` or schema containers simply
//! yields fewer (or zero) documents.

use crate::types::IndexedDocument;
use serde_json::{Map, Value};

pub const HTTP_METHODS: [&str; 7] = ["get", "post", "put", "delete", "patch", "options", "head"];

const SEP: &str = " | ";

/// Endpoints first (paths in source order, methods in path-item order), then schemas.
pub fn extract(spec: &Value, service: &str) -> Vec<IndexedDocument> {
    let mut docs = Vec::new();

    if let Some(paths) = spec.get("paths").and_then(Value::as_object) {
        for (path, item) in paths {
            let Some(item) = item.as_object() else { continue };
            for (key, op) in item {
                let method = key.to_ascii_lowercase();
                if !HTTP_METHODS.contains(&method.as_str()) {
                    continue;
                }
                let Some(op) = op.as_object() else { continue };
                docs.push(endpoint_doc(service, &method, path, op));
            }
        }
    }

    if let Some(schemas) = schema_container(spec) {
        for (name, schema) in schemas {
            docs.push(schema_doc(service, name, schema));
        }
    }

    docs
}

fn schema_container(spec: &Value) -> Option<&Map<String, Value>> {
    spec.get("components")
        .and_then(|c| c.get("schemas"))
        .and_then(Value::as_object)
        .or_else(|| spec.get("definitions").and_then(Value::as_object))
}

fn endpoint_doc(service: &str, method: &str, path: &str, op: &Map<String, Value>) -> IndexedDocument {
    let operation_id = str_field(op, "operationId").map(str::to_string);
    let tags = op
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    let mut parts = vec![
        format!("{} {}", method.to_uppercase(), path),
        str_field(op, "summary").unwrap_or_default().to_string(),
        str_field(op, "description").unwrap_or_default().to_string(),
        tags,
        format!("operationId: {}", operation_id.as_deref().unwrap_or_default()),
    ];
    if let Some(params) = op.get("parameters").filter(|p| !p.is_null()) {
        parts.push(params.to_string());
    }
    if let Some(responses) = op.get("responses").and_then(Value::as_object) {
        parts.push(responses.keys().map(String::as_str).collect::<Vec<_>>().join(", "));
    }

    IndexedDocument::endpoint(service, method, path, operation_id, join_parts(parts))
}

fn schema_doc(service: &str, name: &str, schema: &Value) -> IndexedDocument {
    let description = schema.get("description").and_then(Value::as_str).unwrap_or_default();
    let ty = schema.get("type").and_then(Value::as_str).unwrap_or("object");

    let mut parts = vec![format!("Schema: {}", name), description.to_string(), format!("Type: {}", ty)];
    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        parts.push(props.keys().map(String::as_str).collect::<Vec<_>>().join(", "));
    }

    IndexedDocument::schema(service, name, join_parts(parts))
}

fn join_parts(parts: Vec<String>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join(SEP)
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

/// `servers[0].url` for OpenAPI 3, `{scheme}://{host}{basePath}` for Swagger 2.
pub fn base_url(spec: &Value) -> Option<String> {
    if let Some(url) = spec
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|s| s.first())
        .and_then(|s| s.get("url"))
        .and_then(Value::as_str)
    {
        return Some(url.to_string());
    }
    let host = spec.get("host").and_then(Value::as_str)?;
    let scheme = spec
        .get("schemes")
        .and_then(Value::as_array)
        .and_then(|s| s.first())
        .and_then(Value::as_str)
        .unwrap_or("https");
    let base_path = spec.get("basePath").and_then(Value::as_str).unwrap_or("");
    Some(format!("{}://{}{}", scheme, host, base_path))
}

pub fn service_title(spec: &Value) -> Option<String> {
    spec.get("info")
        .and_then(|i| i.get("title"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// `{service}-description` document from `info.title`, `info.description` and the base URL.
/// `None` when the spec has neither a title nor a description.
pub fn describe(spec: &Value, service: &str) -> Option<IndexedDocument> {
    let title = service_title(spec);
    let description = spec
        .get("info")
        .and_then(|i| i.get("description"))
        .and_then(Value::as_str)
        .filter(|d| !d.trim().is_empty());
    if title.is_none() && description.is_none() {
        return None;
    }
    let parts = vec![
        format!("Service: {}", title.as_deref().unwrap_or(service)),
        description.unwrap_or_default().to_string(),
        base_url(spec).unwrap_or_default(),
    ];
    Some(IndexedDocument::description(service, join_parts(parts)))
}

/// [`extract`] followed by the service's [`describe`] document, as one batch.
pub fn extract_service(spec: &Value, service: &str) -> Vec<IndexedDocument> {
    let mut docs = extract(spec, service);
    docs.extend(describe(spec, service));
    docs
}
