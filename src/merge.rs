//! Merging the REST-style and API-style specification trees.
//!
//! REST paths live under /rest- and /com/vmware-style prefixes with
//! snake_case type names; /api paths and their CamelCase types occupy a
//! disjoint keyspace. The merge is a plain key union that leans on that
//! convention; it is never verified upstream, so a strict policy exists for
//! runs that would rather fail than silently overwrite.

use crate::Result;
use crate::metamodel::{PackageSpec, PackageSpecs};
use anyhow::bail;
use serde_json::Value;
use std::collections::BTreeMap;

/// How key collisions between the two namespaces are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Fail on the first colliding key, naming the package and key.
    Strict,
    /// Historical behavior: the api-side entry silently wins.
    PermissiveLastWins,
}

#[derive(Debug, Clone, Copy)]
pub struct SpecTreeMerger {
    policy: MergePolicy,
}

impl SpecTreeMerger {
    pub const fn new(policy: MergePolicy) -> Self {
        Self { policy }
    }

    /// Merge the API-style mapping into the REST-style mapping and return
    /// the combined result. Packages present on only one side pass through
    /// unchanged; packages on both sides get a key union of both dicts.
    pub fn merge_api_rest_dicts(
        &self,
        mut rest: PackageSpecs,
        api: PackageSpecs,
    ) -> Result<PackageSpecs> {
        for (package, api_spec) in api {
            match rest.get_mut(&package) {
                Some(rest_spec) => {
                    self.merge_dict(&package, "type", &mut rest_spec.type_dict, api_spec.type_dict)?;
                    self.merge_dict(&package, "path", &mut rest_spec.path_dict, api_spec.path_dict)?;
                }
                None => {
                    rest.insert(package, api_spec);
                }
            }
        }
        Ok(rest)
    }

    fn merge_dict(
        &self,
        package: &str,
        kind: &str,
        extended: &mut BTreeMap<String, Value>,
        added: BTreeMap<String, Value>,
    ) -> Result<()> {
        for (key, value) in added {
            if self.policy == MergePolicy::Strict && extended.contains_key(&key) {
                bail!(
                    "package '{}': {} key '{}' exists in both the rest and api trees",
                    package,
                    kind,
                    key
                );
            }
            extended.insert(key, value);
        }
        Ok(())
    }
}

/// Replace every occurrence of `old_ref` with `new_ref` across a package's
/// path and type trees. References are plain strings, so renaming one schema
/// means a full recursive scan of both dicts.
pub fn rewrite_references(spec: &mut PackageSpec, old_ref: &str, new_ref: &str) {
    for value in spec
        .path_dict
        .values_mut()
        .chain(spec.type_dict.values_mut())
    {
        rewrite_value(value, old_ref, new_ref);
    }
}

fn rewrite_value(value: &mut Value, old_ref: &str, new_ref: &str) {
    match value {
        Value::Object(map) => {
            for v in map.values_mut() {
                rewrite_value(v, old_ref, new_ref);
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_value(item, old_ref, new_ref);
            }
        }
        Value::String(s) if s == old_ref => *s = new_ref.to_string(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn spec(path_key: &str, type_key: &str) -> PackageSpec {
        PackageSpec {
            path_dict: BTreeMap::from([(path_key.to_string(), json!({"get": {}}))]),
            type_dict: BTreeMap::from([(type_key.to_string(), json!({"type": "object"}))]),
        }
    }

    #[test]
    fn one_sided_packages_pass_through_unchanged() {
        let rest = PackageSpecs::from([("only_rest".to_string(), spec("/rest/a", "a"))]);
        let api = PackageSpecs::from([("only_api".to_string(), spec("/api/b", "B"))]);

        let merger = SpecTreeMerger::new(MergePolicy::PermissiveLastWins);
        let merged = merger
            .merge_api_rest_dicts(rest.clone(), api.clone())
            .expect("merge");

        assert_eq!(merged["only_rest"].path_dict, rest["only_rest"].path_dict);
        assert_eq!(merged["only_api"].type_dict, api["only_api"].type_dict);
    }

    #[test]
    fn both_sided_packages_merge_to_the_key_union() {
        let rest = PackageSpecs::from([("pkg".to_string(), spec("/rest/a", "pkg.info"))]);
        let api = PackageSpecs::from([("pkg".to_string(), spec("/api/a", "Pkg.Info"))]);

        let merger = SpecTreeMerger::new(MergePolicy::PermissiveLastWins);
        let merged = merger.merge_api_rest_dicts(rest, api).expect("merge");

        let pkg = &merged["pkg"];
        assert_eq!(
            pkg.path_dict.keys().collect::<Vec<_>>(),
            vec!["/api/a", "/rest/a"]
        );
        assert_eq!(
            pkg.type_dict.keys().collect::<Vec<_>>(),
            vec!["Pkg.Info", "pkg.info"]
        );
    }

    #[test]
    fn permissive_merge_overwrites_silently() {
        let rest = PackageSpecs::from([("pkg".to_string(), spec("/same", "same"))]);
        let mut api_spec = spec("/same", "same");
        api_spec.type_dict.insert("same".to_string(), json!({"marker": "api"}));
        let api = PackageSpecs::from([("pkg".to_string(), api_spec)]);

        let merger = SpecTreeMerger::new(MergePolicy::PermissiveLastWins);
        let merged = merger.merge_api_rest_dicts(rest, api).expect("merge");
        assert_eq!(merged["pkg"].type_dict["same"], json!({"marker": "api"}));
    }

    #[test]
    fn strict_merge_rejects_collisions() {
        let rest = PackageSpecs::from([("pkg".to_string(), spec("/same", "a"))]);
        let api = PackageSpecs::from([("pkg".to_string(), spec("/same", "b"))]);

        let merger = SpecTreeMerger::new(MergePolicy::Strict);
        let err = merger
            .merge_api_rest_dicts(rest, api)
            .expect_err("collision must fail");
        assert!(err.to_string().contains("path key '/same'"));
    }

    #[test]
    fn reference_rewrite_scans_both_trees() {
        let mut spec = PackageSpec {
            path_dict: BTreeMap::from([(
                "/rest/a".to_string(),
                json!({"get": {"responses": {"200": {
                    "schema": {"$ref": "#/definitions/old"}
                }}}}),
            )]),
            type_dict: BTreeMap::from([(
                "wrapper".to_string(),
                json!({"properties": {"inner": {"$ref": "#/definitions/old"}}}),
            )]),
        };

        rewrite_references(&mut spec, "#/definitions/old", "#/definitions/new");

        assert_eq!(
            spec.path_dict["/rest/a"]["get"]["responses"]["200"]["schema"]["$ref"],
            "#/definitions/new"
        );
        assert_eq!(
            spec.type_dict["wrapper"]["properties"]["inner"]["$ref"],
            "#/definitions/new"
        );
    }
}
