use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;

use si_registry::codegen::protobuf::ProtobufFormatter;
use si_registry::codegen::rust::CodegenRust;
use si_registry::error::{Error, Result};
use si_registry::object::ObjectKind;
use si_registry::registry::Registry;

/// Generate service sources from the schema registry.
///
/// Builds the in-process schema registry and generates protobuf
/// definitions plus the Rust gen/ tree of every declared service.
#[derive(Parser)]
#[command(name = "si-generate", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate .proto files and Rust sources for registered services.
    Generate {
        /// Generate only this service.
        #[arg(long)]
        service: Option<String>,

        /// Directory the sibling si-<service> crates live under.
        #[arg(long, default_value = "..")]
        output_dir: PathBuf,

        /// Output directory for generated .proto files.
        #[arg(long, default_value = "proto")]
        proto_dir: PathBuf,

        /// Skip the rustfmt pass over generated Rust sources.
        #[arg(long)]
        no_format: bool,

        /// Suppress non-error output.
        #[arg(long, short)]
        quiet: bool,
    },

    /// List every registered schema object.
    List {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct ObjectSummary {
    type_name: String,
    service_name: String,
    kind: &'static str,
    methods: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");

        // Print cause chain.
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = std::error::Error::source(cause);
        }

        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let registry = si_registry::schema::application_registry()?;

    match cli.command {
        Commands::Generate {
            service,
            output_dir,
            proto_dir,
            no_format,
            quiet,
        } => {
            let service_names = match service {
                Some(name) => {
                    if registry.objects_for_service(&name).is_empty() {
                        return Err(Error::EmptyService(name));
                    }
                    vec![name]
                }
                None => registry.service_names(),
            };

            for service_name in &service_names {
                generate_service(
                    &registry,
                    service_name,
                    &output_dir,
                    &proto_dir,
                    !no_format,
                    quiet,
                )
                .await?;
            }

            if !quiet {
                eprintln!("Done.");
            }
        }

        Commands::List { json } => {
            let summaries: Vec<ObjectSummary> = registry
                .objects()
                .iter()
                .map(|o| ObjectSummary {
                    type_name: o.type_name.clone(),
                    service_name: o.service_name.clone(),
                    kind: o.kind.label(),
                    methods: o.methods().entries().iter().map(|m| m.name.clone()).collect(),
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                for summary in &summaries {
                    println!(
                        "{}/{} [{}] ({} methods)",
                        summary.service_name,
                        summary.type_name,
                        summary.kind,
                        summary.methods.len()
                    );
                }
            }
        }
    }

    Ok(())
}

async fn generate_service(
    registry: &Registry,
    service_name: &str,
    output_dir: &Path,
    proto_dir: &Path,
    format: bool,
    quiet: bool,
) -> Result<()> {
    let protobuf = ProtobufFormatter::new(registry, service_name)?;
    let changed = protobuf.write_proto(proto_dir).await?;
    if !quiet {
        let state = if changed { "wrote" } else { "unchanged" };
        eprintln!(
            "{state} {}",
            proto_dir.join(protobuf.output_file()).display()
        );
    }

    let codegen = CodegenRust::new(registry, service_name, output_dir, format);
    if !codegen.has_models() {
        return Ok(());
    }

    codegen.generate_gen_mod().await?;
    if codegen.has_service_methods() {
        codegen.generate_gen_service().await?;
    }
    codegen.generate_gen_model_mod().await?;
    for object in registry.objects_for_service(service_name) {
        if object.kind != ObjectKind::BaseObject {
            codegen.generate_gen_model(object).await?;
            if !quiet {
                eprintln!("generated model for {}", object.type_name);
            }
        }
    }

    if codegen.has_entity_integration_services() {
        codegen.generate_gen_agent_mod().await?;
        for agent in codegen.entity_integration_services() {
            codegen.generate_gen_agent(&agent).await?;
            if !quiet {
                eprintln!("generated agent {}", agent.agent_name);
            }
        }
    }

    Ok(())
}
