//! Unique operation-id assignment for one package's path tree.
//!
//! Candidates derive from the URL template and method. Iteration runs over
//! BTreeMaps, so assignment order is lexicographic by URL template then by
//! method, and identical trees always produce identical ids.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Assign a collision-free operationId to every operation in the tree.
///
/// Collisions take a numeric suffix from a per-candidate counter. Ids ending
/// in `$task` keep the marker after reassignment (the api-explorer and the
/// task patch key off it), so the counter lands before it.
pub fn create_unique_op_ids(path_dict: &mut BTreeMap<String, Value>) {
    let mut taken: BTreeSet<String> = BTreeSet::new();

    for (url, methods) in path_dict.iter_mut() {
        let Value::Object(methods) = methods else {
            continue;
        };
        for (method, op) in methods.iter_mut() {
            let Value::Object(op) = op else {
                continue;
            };

            let task = op
                .get("operationId")
                .and_then(Value::as_str)
                .is_some_and(|id| id.ends_with("$task"));

            let base = derive_op_id(url, method);
            let mut candidate = compose(&base, None, task);
            let mut counter = 1u32;
            while !taken.insert(candidate.clone()) {
                candidate = compose(&base, Some(counter), task);
                counter += 1;
            }

            op.insert("operationId".to_string(), Value::String(candidate));
        }
    }
}

fn compose(base: &str, counter: Option<u32>, task: bool) -> String {
    let mut id = base.to_string();
    if let Some(n) = counter {
        id.push_str(&format!("_{}", n));
    }
    if task {
        id.push_str("$task");
    }
    id
}

/// Human-readable candidate: method plus the meaningful path segments.
/// Namespace mount points and `{var}` template segments add nothing.
fn derive_op_id(url: &str, method: &str) -> String {
    let path = url.split('?').next().unwrap_or(url);
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && !s.starts_with('{'))
        .skip_while(|s| matches!(*s, "rest" | "api" | "com" | "vmware"))
        .collect();

    if segments.is_empty() {
        method.to_string()
    } else {
        format!("{}_{}", method, segments.join("_"))
    }
}
