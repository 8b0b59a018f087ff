use clap::{Parser, Subcommand};

mod dialect;
mod merge;
mod metamodel;
mod normalize;
mod opid;
mod output;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "specgen")]
#[command(about = "Metamodel to API specification generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate per-package API specification files plus the api.json manifest.
    Generate {
        /// Metamodel JSON produced by the introspection layer.
        #[arg(long)]
        metamodel: String,

        /// Output directory.
        #[arg(short = 'o', long)]
        out: String,

        /// Specification dialect: 2 for Swagger 2.0, 3 for OpenAPI 3.0.
        #[arg(long, default_value = "3")]
        spec: String,

        /// Assign deterministic unique operation ids.
        #[arg(long)]
        unique_op_ids: bool,

        /// Emit one artifact per package and namespace instead of merging.
        #[arg(long)]
        split_api_rest: bool,

        /// Fail on key collisions between the rest and api trees.
        #[arg(long)]
        strict_merge: bool,

        /// Include operations marked unreleased.
        #[arg(long)]
        show_unreleased_apis: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Generate {
            metamodel,
            out,
            spec,
            unique_op_ids,
            split_api_rest,
            strict_merge,
            show_unreleased_apis,
        } => {
            // 1) Parse the metamodel dump.
            let model: metamodel::Metamodel =
                serde_json::from_str(&std::fs::read_to_string(&metamodel)?)?;

            // 2) Select the dialect once; everything downstream takes the
            // builder by reference.
            let dialect = match spec.as_str() {
                "2" => dialect::Dialect::Swagger,
                "3" => dialect::Dialect::Openapi,
                other => anyhow::bail!("unsupported spec dialect '{}' (expected 2 or 3)", other),
            };
            let builder = dialect.builder();

            // 3) Build per-package path/type dicts for both namespaces.
            let rest_specs = metamodel::build_package_specs(
                &model.rest,
                &model.error_map,
                builder.as_ref(),
                show_unreleased_apis,
            )?;
            let api_specs = metamodel::build_package_specs(
                &model.api,
                &model.error_map,
                builder.as_ref(),
                show_unreleased_apis,
            )?;

            // 4) Normalize, assign ids, merge or split, write everything.
            std::fs::create_dir_all(&out)?;
            let config = output::OutputConfig {
                gen_unique_op_id: unique_op_ids,
                split_api_rest,
                merge_policy: if strict_merge {
                    merge::MergePolicy::Strict
                } else {
                    merge::MergePolicy::PermissiveLastWins
                },
            };
            let handler =
                output::OutputHandler::new(rest_specs, api_specs, builder.as_ref(), config)?;
            let mut writer = output::JsonFileWriter::new(&out);
            handler.output_files(&mut writer)?;
        }
    }

    Ok(())
}
