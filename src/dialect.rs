//! Dialect path builders: turn one operation's metadata into one
//! path/operation object, in either Swagger 2.0 or OpenAPI 3.0 shape.
//!
//! The build steps (classify parameters, synthesize the request body, fill
//! the response map, apply the fixed patches, attach auth) are shared; the
//! two builders only differ in how parameters, bodies, responses, and the
//! document envelope are encoded.

use crate::Result;
use crate::metamodel::{OperationInfo, ParamInfo, ParamLocation};
use anyhow::bail;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};

/// Spec dialect, selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Swagger,
    Openapi,
}

impl Dialect {
    pub fn builder(self) -> Box<dyn PathBuilder> {
        match self {
            Self::Swagger => Box::new(SwaggerBuilder),
            Self::Openapi => Box::new(OpenapiBuilder),
        }
    }
}

/// One HTTP operation in its dialect encoding.
///
/// `path` and `method` are carried along for the patch and id-assignment
/// steps; document assembly drops them since the paths dict re-encodes both.
#[derive(Debug, Clone, Serialize)]
pub struct PathObject {
    pub tags: Vec<String>,
    pub path: String,
    pub method: String,

    #[serde(rename = "operationId")]
    pub operation_id: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,

    pub parameters: Vec<Value>,

    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,

    pub responses: BTreeMap<String, Value>,

    pub security: Vec<Value>,
}

/// Dialect-specific encoding behind a shared build procedure. One stateless
/// instance per run, passed by reference wherever a dialect decision occurs.
pub trait PathBuilder {
    /// Prefix for schema references ("#/definitions/" or
    /// "#/components/schemas/").
    fn ref_prefix(&self) -> &'static str;

    /// Encode one non-body parameter.
    fn encode_parameter(&self, param: &ParamInfo, location: ParamLocation) -> Value;

    /// Fold the body-class parameters into the operation. Swagger appends a
    /// single `in: body` parameter; OpenAPI fills `requestBody`.
    fn attach_request_body(
        &self,
        path_obj: &mut PathObject,
        body_params: &[ParamInfo],
    ) -> Result<()>;

    /// Encode one response entry; `type_name` is absent for empty responses.
    fn encode_response(&self, description: &str, type_name: Option<&str>) -> Value;

    /// Wrap the finalized paths and definitions in the document envelope.
    fn envelope(&self, package: &str, paths: Value, definitions: Value) -> Value;

    /// Build one path object from one operation's metadata.
    fn build_path(
        &self,
        op: &OperationInfo,
        error_map: &BTreeMap<String, u16>,
    ) -> Result<PathObject> {
        let method = op.method.to_lowercase();

        // 1) Classify parameters; body-class ones are folded separately.
        let mut parameters: Vec<Value> = Vec::new();
        let mut body_params: Vec<ParamInfo> = Vec::new();
        for param in &op.params {
            let location = classify_param(param, &op.path, &method);
            if location == ParamLocation::Body {
                body_params.push(param.clone());
            } else {
                parameters.push(self.encode_parameter(param, location));
            }
        }

        // 2) Responses: declared output plus declared errors resolved
        // through the error-code map.
        let mut responses: BTreeMap<String, Value> = BTreeMap::new();
        match &op.output {
            Some(output) => {
                let description = if output.documentation.is_empty() {
                    "Operation result"
                } else {
                    output.documentation.as_str()
                };
                responses.insert(
                    "200".to_string(),
                    self.encode_response(description, Some(&output.output_type)),
                );
            }
            None => {
                responses.insert("204".to_string(), self.encode_response("No content", None));
            }
        }
        for error in &op.errors {
            let Some(status) = error_map.get(error) else {
                bail!("no error code mapping for error type '{}'", error);
            };
            responses.insert(
                status.to_string(),
                self.encode_response(error, Some(error)),
            );
        }

        // 3) Assemble, with baseline auth on every operation.
        let mut path_obj = PathObject {
            tags: vec![tag_from_service(&op.service)],
            path: op.path.clone(),
            method,
            operation_id: op.operation_id.clone(),
            summary: op.documentation.clone(),
            parameters,
            request_body: None,
            responses,
            security: vec![json!({"basic_auth": []})],
        };

        if !body_params.is_empty() {
            self.attach_request_body(&mut path_obj, &body_params)?;
        }

        post_process_path(&mut path_obj);

        Ok(path_obj)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SwaggerBuilder;

impl PathBuilder for SwaggerBuilder {
    fn ref_prefix(&self) -> &'static str {
        "#/definitions/"
    }

    fn encode_parameter(&self, param: &ParamInfo, location: ParamLocation) -> Value {
        // Non-body Swagger parameters carry a primitive `type` inline.
        json!({
            "name": param.name,
            "in": location_str(location),
            "required": param.required,
            "type": primitive_type(&param.param_type).unwrap_or("string"),
            "description": param.documentation,
        })
    }

    fn attach_request_body(
        &self,
        path_obj: &mut PathObject,
        body_params: &[ParamInfo],
    ) -> Result<()> {
        let schema = body_schema(self.ref_prefix(), body_params)?;
        path_obj.parameters.push(json!({
            "name": "request_body",
            "in": "body",
            "required": body_params.iter().any(|p| p.required),
            "schema": schema,
        }));
        Ok(())
    }

    fn encode_response(&self, description: &str, type_name: Option<&str>) -> Value {
        match type_name {
            Some(name) => json!({
                "description": description,
                "schema": schema_for(self.ref_prefix(), name),
            }),
            None => json!({"description": description}),
        }
    }

    fn envelope(&self, package: &str, paths: Value, definitions: Value) -> Value {
        json!({
            "swagger": "2.0",
            "info": {"title": package, "version": "1.0.0"},
            "paths": paths,
            "definitions": definitions,
            "securityDefinitions": {"basic_auth": {"type": "basic"}},
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OpenapiBuilder;

impl PathBuilder for OpenapiBuilder {
    fn ref_prefix(&self) -> &'static str {
        "#/components/schemas/"
    }

    fn encode_parameter(&self, param: &ParamInfo, location: ParamLocation) -> Value {
        json!({
            "name": param.name,
            "in": location_str(location),
            "required": param.required,
            "description": param.documentation,
            "schema": schema_for(self.ref_prefix(), &param.param_type),
        })
    }

    fn attach_request_body(
        &self,
        path_obj: &mut PathObject,
        body_params: &[ParamInfo],
    ) -> Result<()> {
        let schema = body_schema(self.ref_prefix(), body_params)?;
        path_obj.request_body = Some(json!({
            "required": body_params.iter().any(|p| p.required),
            "content": {"application/json": {"schema": schema}},
        }));
        Ok(())
    }

    fn encode_response(&self, description: &str, type_name: Option<&str>) -> Value {
        match type_name {
            Some(name) => json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": schema_for(self.ref_prefix(), name),
                    }
                },
            }),
            None => json!({"description": description}),
        }
    }

    fn envelope(&self, package: &str, paths: Value, definitions: Value) -> Value {
        json!({
            "openapi": "3.0.0",
            "info": {"title": package, "version": "1.0.0"},
            "paths": paths,
            "components": {
                "schemas": definitions,
                "securitySchemes": {"basic_auth": {"type": "http", "scheme": "basic"}},
            },
        })
    }
}

/// Decide where a parameter travels. An explicit location from the metamodel
/// wins; otherwise a `{name}` match in the URL template means path, body-less
/// methods default to query, and everything else goes into the body.
fn classify_param(param: &ParamInfo, url: &str, method: &str) -> ParamLocation {
    if let Some(location) = param.location {
        return location;
    }
    if url.contains(&format!("{{{}}}", param.name)) {
        return ParamLocation::Path;
    }
    match method {
        "get" | "delete" | "head" => ParamLocation::Query,
        _ => ParamLocation::Body,
    }
}

const fn location_str(location: ParamLocation) -> &'static str {
    match location {
        ParamLocation::Path => "path",
        ParamLocation::Query => "query",
        ParamLocation::Header => "header",
        ParamLocation::Body => "body",
    }
}

/// Metamodel primitive -> JSON schema type; None means user-defined.
fn primitive_type(name: &str) -> Option<&'static str> {
    match name {
        "string" | "secret" | "binary" | "datetime" | "id" | "uri" => Some("string"),
        "boolean" => Some("boolean"),
        "long" | "integer" => Some("integer"),
        "double" | "number" => Some("number"),
        _ => None,
    }
}

fn schema_for(ref_prefix: &str, type_name: &str) -> Value {
    match primitive_type(type_name) {
        Some(kind) => json!({"type": kind}),
        None => json!({"$ref": format!("{}{}", ref_prefix, type_name)}),
    }
}

/// Synthesize the request-body schema from the body-class parameters. A
/// single parameter maps to its own schema; several wrap into an object with
/// one property per parameter.
fn body_schema(ref_prefix: &str, body_params: &[ParamInfo]) -> Result<Value> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for param in body_params {
        if !seen.insert(param.name.as_str()) {
            bail!(
                "cannot build a request body: duplicate body parameter '{}'",
                param.name
            );
        }
    }

    if let [single] = body_params {
        return Ok(schema_for(ref_prefix, &single.param_type));
    }

    let mut properties = serde_json::Map::new();
    let mut required: Vec<Value> = Vec::new();
    for param in body_params {
        properties.insert(param.name.clone(), schema_for(ref_prefix, &param.param_type));
        if param.required {
            required.push(Value::String(param.name.clone()));
        }
    }

    let mut schema = json!({"type": "object", "properties": properties});
    if !required.is_empty() {
        if let Value::Object(map) = &mut schema {
            map.insert("required".to_string(), Value::Array(required));
        }
    }
    Ok(schema)
}

/// "com.vmware.cis.session" -> "session".
fn tag_from_service(service: &str) -> String {
    service.rsplit('.').next().unwrap_or(service).to_string()
}

/// Fixed patches for known special-case operations. Matched exactly, never
/// inferred from metadata; the metamodel does not describe either behavior.
fn post_process_path(path_obj: &mut PathObject) {
    // The session login operation authenticates through a custom header.
    if path_obj.path == "/com/vmware/cis/session" && path_obj.method == "post" {
        path_obj.parameters = vec![json!({
            "in": "header",
            "required": true,
            "type": "string",
            "name": "vmware-use-header-authn",
            "description": "Custom header to protect against CSRF attacks in browser based clients",
            "schema": {"type": "string"},
        })];
    }

    // Allow invoking $task operations from the api-explorer.
    if path_obj.operation_id.ends_with("$task") {
        path_obj.path = add_query_param(&path_obj.path, "vmw-task=true");
    }
}

fn add_query_param(url: &str, param: &str) -> String {
    if url.contains('?') {
        format!("{}&{}", url, param)
    } else {
        format!("{}?{}", url, param)
    }
}
