//! Name normalization: strip the implementation namespace prefix from every
//! identifier in a spec tree, optionally rendering identifiers in CamelCase.
//!
//! Identifiers show up as dictionary keys ("com.vmware.cis.session_info")
//! and inside reference strings ("#/definitions/com.vmware...."). Free-text
//! values such as `summary` and `description` are never rewritten, even when
//! they happen to mention the prefix. The walk mutates trees in place and is
//! idempotent: once the prefix is gone there is nothing left to strip.

use crate::Result;
use crate::metamodel::PackageSpec;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

const NAMESPACE_PREFIX: &str = "com.vmware.";

pub struct NameNormalizer {
    /// Matches the prefix plus the identifier it qualifies, wherever it
    /// appears inside a reference string.
    token: Regex,
    add_camel_case: bool,
}

impl NameNormalizer {
    pub fn new(add_camel_case: bool) -> Result<Self> {
        let token = Regex::new(r"com\.vmware\.([A-Za-z0-9_.$]+)")?;
        Ok(Self {
            token,
            add_camel_case,
        })
    }

    pub fn normalize_package(&self, spec: &mut PackageSpec) {
        self.normalize_dict(&mut spec.path_dict);
        self.normalize_dict(&mut spec.type_dict);
    }

    /// Normalize top-level keys (type names; url keys carry no dotted prefix
    /// and pass through) and everything below them.
    pub fn normalize_dict(&self, dict: &mut BTreeMap<String, Value>) {
        for (key, mut value) in std::mem::take(dict) {
            self.normalize_value(&mut value);
            dict.insert(self.normalize_key(&key), value);
        }
    }

    fn normalize_value(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                let mut replaced = serde_json::Map::new();
                for (key, mut v) in std::mem::take(map) {
                    if key == "$ref" {
                        // References are the only identifier-position
                        // strings; all other string values stay untouched.
                        if let Value::String(s) = &mut v {
                            *s = self.normalize_reference(s);
                        }
                    } else {
                        self.normalize_value(&mut v);
                    }
                    replaced.insert(self.normalize_key(&key), v);
                }
                *map = replaced;
            }
            Value::Array(items) => {
                for item in items {
                    self.normalize_value(item);
                }
            }
            _ => {}
        }
    }

    fn normalize_key(&self, key: &str) -> String {
        match key.strip_prefix(NAMESPACE_PREFIX) {
            Some(rest) => self.render(rest),
            None => key.to_string(),
        }
    }

    fn normalize_reference(&self, reference: &str) -> String {
        self.token
            .replace_all(reference, |caps: &regex::Captures<'_>| {
                self.render(&caps[1])
            })
            .into_owned()
    }

    fn render(&self, identifier: &str) -> String {
        if self.add_camel_case {
            camelize(identifier)
        } else {
            identifier.to_string()
        }
    }
}

/// "vcenter.vm_info" -> "Vcenter.VmInfo". Already-camel segments are stable,
/// so re-rendering changes nothing.
fn camelize(identifier: &str) -> String {
    identifier
        .split('.')
        .map(|segment| segment.split('_').map(capitalize).collect::<String>())
        .collect::<Vec<_>>()
        .join(".")
}

fn capitalize(chunk: &str) -> String {
    let mut chars = chunk.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
