//! Output partitioning: split vs merged emission, per-package artifacts,
//! and the api.json manifest.

use crate::Result;
use crate::dialect::PathBuilder;
use crate::merge::{MergePolicy, SpecTreeMerger};
use crate::metamodel::{PackageSpec, PackageSpecs};
use crate::normalize::NameNormalizer;
use crate::opid;
use anyhow::Context;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Seam to the file-writing collaborator: the pipeline hands over fully
/// formed documents keyed by artifact base name and nothing else.
pub trait SpecWriter {
    fn write_spec(&mut self, name: &str, document: &Value) -> Result<()>;
}

/// Writes pretty-printed JSON files into the output directory.
#[derive(Debug, Clone)]
pub struct JsonFileWriter {
    out_dir: PathBuf,
}

impl JsonFileWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }
}

impl SpecWriter for JsonFileWriter {
    fn write_spec(&mut self, name: &str, document: &Value) -> Result<()> {
        let path = self.out_dir.join(format!("{}.json", name));
        let text = serde_json::to_string_pretty(document)?;
        std::fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
        println!("Wrote {}", path.display());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    pub gen_unique_op_id: bool,
    pub split_api_rest: bool,
    pub merge_policy: MergePolicy,
}

pub struct OutputHandler<'a> {
    rest_specs: PackageSpecs,
    api_specs: PackageSpecs,
    builder: &'a dyn PathBuilder,
    config: OutputConfig,
}

impl<'a> OutputHandler<'a> {
    /// Pre-processing normalizes both namespaces (CamelCase rendering for
    /// the /api trees only) and assigns unique operation ids when enabled.
    pub fn new(
        mut rest_specs: PackageSpecs,
        mut api_specs: PackageSpecs,
        builder: &'a dyn PathBuilder,
        config: OutputConfig,
    ) -> Result<Self> {
        let rest_normalizer = NameNormalizer::new(false)?;
        let api_normalizer = NameNormalizer::new(true)?;
        for spec in rest_specs.values_mut() {
            preprocess(spec, &rest_normalizer, config.gen_unique_op_id);
        }
        for spec in api_specs.values_mut() {
            preprocess(spec, &api_normalizer, config.gen_unique_op_id);
        }

        Ok(Self {
            rest_specs,
            api_specs,
            builder,
            config,
        })
    }

    /// Emit every per-package artifact, then the manifest.
    pub fn output_files(&self, writer: &mut dyn SpecWriter) -> Result<()> {
        if self.config.split_api_rest {
            self.produce_split(writer)?;
        } else {
            self.produce_merged(writer)?;
        }
        self.produce_manifest(writer)
    }

    fn produce_merged(&self, writer: &mut dyn SpecWriter) -> Result<()> {
        let merger = SpecTreeMerger::new(self.config.merge_policy);
        let merged =
            merger.merge_api_rest_dicts(self.rest_specs.clone(), self.api_specs.clone())?;
        for (package, spec) in &merged {
            self.output_spec(writer, package, spec, "")?;
        }
        Ok(())
    }

    fn produce_split(&self, writer: &mut dyn SpecWriter) -> Result<()> {
        for (package, spec) in &self.rest_specs {
            self.output_spec(writer, package, spec, "rest_")?;
        }
        for (package, spec) in &self.api_specs {
            self.output_spec(writer, package, spec, "api_")?;
        }
        Ok(())
    }

    fn output_spec(
        &self,
        writer: &mut dyn SpecWriter,
        package: &str,
        spec: &PackageSpec,
        prefix: &str,
    ) -> Result<()> {
        let document = assemble_document(self.builder, package, spec);
        writer.write_spec(&format!("{}{}", prefix, package), &document)
    }

    /// api.json lists the produced artifact base names; a UI consumes it to
    /// populate its spec dropdown. Set semantics, written after everything
    /// else.
    fn produce_manifest(&self, writer: &mut dyn SpecWriter) -> Result<()> {
        let mut files: BTreeSet<String> = BTreeSet::new();
        for name in self.rest_specs.keys() {
            files.insert(if self.config.split_api_rest {
                format!("rest_{}", name)
            } else {
                name.clone()
            });
        }
        for name in self.api_specs.keys() {
            files.insert(if self.config.split_api_rest {
                format!("api_{}", name)
            } else {
                name.clone()
            });
        }

        let manifest = json!({"files": files.into_iter().collect::<Vec<_>>()});
        writer.write_spec("api", &manifest)
    }
}

fn preprocess(spec: &mut PackageSpec, normalizer: &NameNormalizer, gen_unique_op_id: bool) {
    normalizer.normalize_package(spec);
    if gen_unique_op_id {
        opid::create_unique_op_ids(&mut spec.path_dict);
    }
}

/// Wrap one package's dicts in the dialect envelope. The per-operation
/// `path`/`method` members are dropped here: the paths dict already encodes
/// both as keys.
fn assemble_document(builder: &dyn PathBuilder, package: &str, spec: &PackageSpec) -> Value {
    let mut paths = serde_json::Map::new();
    for (url, methods) in &spec.path_dict {
        let mut methods = methods.clone();
        if let Value::Object(map) = &mut methods {
            for operation in map.values_mut() {
                if let Value::Object(operation) = operation {
                    operation.remove("path");
                    operation.remove("method");
                }
            }
        }
        paths.insert(url.clone(), methods);
    }

    let definitions: serde_json::Map<String, Value> = spec
        .type_dict
        .iter()
        .map(|(name, schema)| (name.clone(), schema.clone()))
        .collect();

    builder.envelope(package, Value::Object(paths), Value::Object(definitions))
}
