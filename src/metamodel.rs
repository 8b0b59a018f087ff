//! Metamodel input (metamodel.json): the already-introspected description of
//! a product's services that feeds the generator.
//!
//! JSON shape:
//! {
//!   "error_map": { "com.vmware.vapi.std.errors.not_found": 404, ... },
//!   "rest": {
//!     "cis": {
//!       "operations": [
//!         {
//!           "service": "com.vmware.cis.session",
//!           "operation_id": "create",
//!           "method": "POST",
//!           "path": "/com/vmware/cis/session",
//!           "documentation": "Creates a session...",
//!           "params": [ { "name": "spec", "type": "com.vmware.cis.create_spec" } ],
//!           "errors": ["com.vmware.vapi.std.errors.unauthenticated"],
//!           "output": { "type": "com.vmware.cis.session_info" }
//!         }
//!       ],
//!       "types": { "com.vmware.cis.session_info": { ... } },
//!       "structures": { ... },
//!       "enums": { ... }
//!     }
//!   },
//!   "api": { ... same shape, CamelCase identifiers ... }
//! }
//!
//! The `rest` and `api` sections are independent namespaces; downstream
//! merging relies on their naming conventions never colliding.

use crate::Result;
use crate::dialect::PathBuilder;
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metamodel {
    /// Declared error type -> HTTP status code.
    #[serde(default)]
    pub error_map: BTreeMap<String, u16>,

    #[serde(default)]
    pub rest: BTreeMap<String, PackageModel>,

    #[serde(default)]
    pub api: BTreeMap<String, PackageModel>,
}

/// One package's introspected operations plus the schema definitions they
/// reference.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageModel {
    #[serde(default)]
    pub operations: Vec<OperationInfo>,

    #[serde(default)]
    pub types: BTreeMap<String, Value>,

    #[serde(default)]
    pub structures: BTreeMap<String, Value>,

    #[serde(default)]
    pub enums: BTreeMap<String, Value>,
}

/// One operation as introspected upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationInfo {
    pub service: String,
    pub operation_id: String,
    pub method: String,
    pub path: String,

    #[serde(default)]
    pub documentation: String,

    #[serde(default)]
    pub params: Vec<ParamInfo>,

    #[serde(default)]
    pub errors: Vec<String>,

    #[serde(default)]
    pub output: Option<OutputInfo>,

    /// Unreleased operations are dropped unless the run opts into them.
    #[serde(default = "default_released")]
    pub released: bool,
}

const fn default_released() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParamInfo {
    pub name: String,

    #[serde(rename = "type")]
    pub param_type: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub documentation: String,

    /// Explicit wire location; when absent the builder classifies from the
    /// URL template and HTTP method.
    #[serde(default)]
    pub location: Option<ParamLocation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Body,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputInfo {
    #[serde(rename = "type")]
    pub output_type: String,

    #[serde(default)]
    pub documentation: String,
}

/// Working spec for one package: url -> {method -> path object}, plus the
/// schema definitions the paths reference.
#[derive(Debug, Clone, Default)]
pub struct PackageSpec {
    pub path_dict: BTreeMap<String, Value>,
    pub type_dict: BTreeMap<String, Value>,
}

pub type PackageSpecs = BTreeMap<String, PackageSpec>;

/// Build per-package (path_dict, type_dict) pairs for one namespace by
/// running every operation through the dialect builder.
///
/// Type, structure, and enum definitions all land in the shared type dict;
/// they occupy one reference namespace in the finished document.
pub fn build_package_specs(
    packages: &BTreeMap<String, PackageModel>,
    error_map: &BTreeMap<String, u16>,
    builder: &dyn PathBuilder,
    show_unreleased_apis: bool,
) -> Result<PackageSpecs> {
    let mut out: PackageSpecs = BTreeMap::new();

    for (package, model) in packages {
        let mut spec = PackageSpec::default();

        for op in &model.operations {
            if !op.released && !show_unreleased_apis {
                continue;
            }

            let path_obj = builder.build_path(op, error_map).with_context(|| {
                format!(
                    "package '{}': operation '{}.{}'",
                    package, op.service, op.operation_id
                )
            })?;

            // Keyed by the (possibly patched) url, then by method.
            let value = serde_json::to_value(&path_obj)?;
            let methods = spec
                .path_dict
                .entry(path_obj.path.clone())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if let Value::Object(map) = methods {
                map.insert(path_obj.method.clone(), value);
            }
        }

        for (name, schema) in model
            .types
            .iter()
            .chain(model.structures.iter())
            .chain(model.enums.iter())
        {
            spec.type_dict.insert(name.clone(), schema.clone());
        }

        out.insert(package.clone(), spec);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn model_with_ops(operations: Vec<OperationInfo>) -> BTreeMap<String, PackageModel> {
        let mut packages = BTreeMap::new();
        packages.insert(
            "cis".to_string(),
            PackageModel {
                operations,
                types: BTreeMap::from([(
                    "com.vmware.cis.session_info".to_string(),
                    json!({"type": "object"}),
                )]),
                structures: BTreeMap::new(),
                enums: BTreeMap::new(),
            },
        );
        packages
    }

    fn op(operation_id: &str, method: &str, path: &str, released: bool) -> OperationInfo {
        OperationInfo {
            service: "com.vmware.cis.session".to_string(),
            operation_id: operation_id.to_string(),
            method: method.to_string(),
            path: path.to_string(),
            documentation: String::new(),
            params: vec![],
            errors: vec![],
            output: None,
            released,
        }
    }

    #[test]
    fn builds_path_and_type_dicts() {
        let packages = model_with_ops(vec![op("get", "GET", "/rest/cis/session", true)]);
        let builder = Dialect::Openapi.builder();
        let specs = build_package_specs(&packages, &BTreeMap::new(), builder.as_ref(), false)
            .expect("build specs");

        let spec = &specs["cis"];
        let methods = spec.path_dict["/rest/cis/session"]
            .as_object()
            .expect("method map");
        assert!(methods.contains_key("get"));
        assert_eq!(
            spec.type_dict["com.vmware.cis.session_info"],
            json!({"type": "object"})
        );
    }

    #[test]
    fn unreleased_operations_are_skipped_unless_enabled() {
        let packages = model_with_ops(vec![
            op("get", "GET", "/rest/cis/session", true),
            op("preview", "GET", "/rest/cis/preview", false),
        ]);
        let builder = Dialect::Openapi.builder();

        let hidden = build_package_specs(&packages, &BTreeMap::new(), builder.as_ref(), false)
            .expect("build specs");
        assert!(!hidden["cis"].path_dict.contains_key("/rest/cis/preview"));

        let shown = build_package_specs(&packages, &BTreeMap::new(), builder.as_ref(), true)
            .expect("build specs");
        assert!(shown["cis"].path_dict.contains_key("/rest/cis/preview"));
    }

    #[test]
    fn metamodel_parses_with_defaults() {
        let model: Metamodel = serde_json::from_value(json!({
            "rest": {
                "cis": {
                    "operations": [{
                        "service": "com.vmware.cis.session",
                        "operation_id": "create",
                        "method": "POST",
                        "path": "/com/vmware/cis/session"
                    }]
                }
            }
        }))
        .expect("parse metamodel");

        let op = &model.rest["cis"].operations[0];
        assert!(op.released);
        assert!(op.params.is_empty());
        assert!(model.api.is_empty());
    }
}
