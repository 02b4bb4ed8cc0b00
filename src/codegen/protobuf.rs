//! Protobuf definition generation.
//!
//! Generates one `.proto` file per service. Every scalar renders as a
//! google wrapper type so absence is distinguishable from the zero value.
//! Field numbers come from two partitions: universal props count up from 1
//! and custom props from 1001, so adding custom fields never renumbers the
//! shared infrastructure fields.
//!
//! The generated output is deterministic: identical registries always
//! produce byte-identical output.

use std::collections::BTreeSet;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::case::{constant_case, pascal_case, snake_case};
use crate::error::{Error, Result};
use crate::object::SchemaObject;
use crate::prop::{NumberKind, Prop, PropKind};
use crate::registry::Registry;
use crate::writer::write_code;

/// Renders the objects of one service as a protobuf file.
#[derive(Debug)]
pub struct ProtobufFormatter<'a> {
    registry: &'a Registry,
    objects: Vec<&'a SchemaObject>,
}

impl<'a> ProtobufFormatter<'a> {
    /// Build a formatter for `service_name`; errors if the registry holds
    /// no objects for it.
    pub fn new(registry: &'a Registry, service_name: &str) -> Result<ProtobufFormatter<'a>> {
        let objects = registry.objects_for_service(service_name);
        if objects.is_empty() {
            return Err(Error::EmptyService(service_name.to_string()));
        }
        Ok(ProtobufFormatter { registry, objects })
    }

    fn first(&self) -> &SchemaObject {
        self.objects[0]
    }

    /// The proto package, `si.<snake(service)>`.
    pub fn package_name(&self) -> String {
        format!("si.{}", snake_case(&self.first().service_name))
    }

    /// File name of the generated proto, `si.<snake(service)>.proto`.
    pub fn output_file(&self) -> String {
        format!("si.{}.proto", snake_case(&self.first().service_name))
    }

    /// The service block: one rpc per method across all objects, or a
    /// `// No Services` marker when nothing has methods.
    pub fn services(&self) -> String {
        if !self.objects.iter().any(|o| !o.methods().is_empty()) {
            return "// No Services".to_string();
        }
        let mut lines = Vec::new();
        lines.push(format!(
            "service {} {{",
            pascal_case(&self.first().service_name)
        ));
        for object in &self.objects {
            for method in object.methods().entries() {
                let method_name =
                    format!("{}{}", pascal_case(&method.parent_name), pascal_case(&method.name));
                lines.push(format!(
                    "  rpc {method_name}({method_name}Request) returns ({method_name}Reply);"
                ));
            }
        }
        lines.push("}".to_string());
        lines.join("\n")
    }

    /// All message and enum definitions: each object's root prop followed
    /// by the request and reply of each of its methods.
    pub fn messages(&self) -> Result<String> {
        let mut results = Vec::new();
        for object in &self.objects {
            results.push(self.message_for_prop_object(&object.root_prop)?);
            for method in object.methods().entries() {
                let Some(data) = method.method() else {
                    return Err(Error::InvalidObject(format!(
                        "non method/action prop '{}' on the methods of {}",
                        method.name, object.type_name
                    )));
                };
                results.push(self.message_for_prop_object(&data.request)?);
                results.push(self.message_for_prop_object(&data.reply)?);
            }
        }
        Ok(results.join("\n"))
    }

    /// Render one object prop as a message (recursing into nested objects
    /// and enums first) or one enum prop as an enum block.
    fn message_for_prop_object(&self, prop: &Prop) -> Result<String> {
        if let PropKind::Enum { variants } = &prop.kind {
            let prefix = constant_case(&self.type_for_prop(prop)?);
            let mut lines = Vec::new();
            lines.push(format!(
                "enum {}{} {{",
                pascal_case(&prop.parent_name),
                pascal_case(&prop.name)
            ));
            lines.push(format!("  {prefix}_UNKNOWN = 0;"));
            for (index, variant) in variants.iter().enumerate() {
                lines.push(format!(
                    "  {prefix}_{} = {};",
                    constant_case(variant),
                    index + 1
                ));
            }
            lines.push("}".to_string());
            return Ok(lines.join("\n"));
        }

        let Some(properties) = prop.properties() else {
            return Err(Error::Unsupported {
                type_name: prop.component_type_name.clone(),
                prop: prop.name.clone(),
                kind: prop.kind_name().to_string(),
            });
        };

        let mut results = Vec::new();
        for child in properties.entries() {
            if child.is_object() || child.is_enum() {
                results.push(self.message_for_prop_object(child)?);
            }
        }

        let message_name = format!(
            "{}{}",
            pascal_case(&prop.parent_name),
            pascal_case(&prop.name)
        );
        results.push(format!("message {message_name} {{"));

        // Two field number partitions: universal props stay stable as
        // custom props come and go.
        let mut universal_base = 0u32;
        let mut custom_base = 1000u32;
        for child in properties.entries() {
            let number = if child.universal {
                universal_base += 1;
                universal_base
            } else {
                custom_base += 1;
                custom_base
            };
            results.push(format!("  {}", self.definition_for_prop(child, number)?));
        }
        results.push("}".to_string());
        Ok(results.join("\n"))
    }

    /// One field line: `[repeated ]<type> <snake(name)> = <number>;`.
    fn definition_for_prop(&self, prop: &Prop, number: u32) -> Result<String> {
        let repeated = if prop.repeated { "repeated " } else { "" };
        Ok(format!(
            "{repeated}{} {} = {number};",
            self.type_for_prop(prop)?,
            snake_case(&prop.name)
        ))
    }

    /// The proto type a prop renders as.
    fn type_for_prop(&self, prop: &Prop) -> Result<String> {
        match &prop.kind {
            PropKind::Bool => Ok("google.protobuf.BoolValue".to_string()),
            PropKind::Text | PropKind::Password | PropKind::Code { .. } | PropKind::Select { .. } => {
                Ok("google.protobuf.StringValue".to_string())
            }
            PropKind::Map => Ok("map<string, google.protobuf.StringValue>".to_string()),
            PropKind::Number { number_kind } => match number_kind {
                NumberKind::Int32 => Ok("google.protobuf.Int32Value".to_string()),
                NumberKind::Uint32 => Ok("google.protobuf.UInt32Value".to_string()),
                NumberKind::Int64 => Ok("google.protobuf.Int64Value".to_string()),
                NumberKind::Uint64 => Ok("google.protobuf.UInt64Value".to_string()),
                // No wrapper type exists for 128 bit integers.
                NumberKind::U128 => Err(Error::Unsupported {
                    type_name: prop.component_type_name.clone(),
                    prop: prop.name.clone(),
                    kind: "u128 number".to_string(),
                }),
            },
            PropKind::Enum { .. } => Ok(format!(
                "{}{}",
                pascal_case(&prop.parent_name),
                pascal_case(&prop.name)
            )),
            PropKind::Object(_) | PropKind::Method(_) | PropKind::Action(_) => Ok(format!(
                "{}.{}{}",
                self.package_name(),
                pascal_case(&prop.parent_name),
                pascal_case(&prop.name)
            )),
            PropKind::Link { lookup } => {
                let real = self.registry.lookup_prop(lookup)?;
                if real.is_object() || real.is_enum() {
                    let owner = self.registry.get(&lookup.type_name)?;
                    let package = if owner.service_name.is_empty() {
                        snake_case(&owner.type_name)
                    } else {
                        snake_case(&owner.service_name)
                    };
                    Ok(format!(
                        "si.{package}.{}{}",
                        pascal_case(&real.parent_name),
                        pascal_case(&real.name)
                    ))
                } else {
                    self.type_for_prop(real)
                }
            }
        }
    }

    /// The import block, or a `// No Imports` marker.
    ///
    /// Wrapper types pull in `google/protobuf/wrappers.proto`; links to
    /// objects in other services pull in that service's generated proto.
    pub fn imports(&self) -> Result<String> {
        let mut set = BTreeSet::new();
        for object in &self.objects {
            self.import_walk(&object.root_prop, &mut set)?;
        }
        if set.is_empty() {
            return Ok("// No Imports".to_string());
        }
        let lines: Vec<String> = set.into_iter().map(|l| format!("import \"{l}\";")).collect();
        Ok(lines.join("\n"))
    }

    fn import_walk(&self, prop: &Prop, set: &mut BTreeSet<String>) -> Result<()> {
        if let Some(lookup) = prop.lookup() {
            let owner = self.registry.get(&lookup.type_name)?;
            let package = if owner.service_name.is_empty() {
                snake_case(&owner.type_name)
            } else {
                snake_case(&owner.service_name)
            };
            let import_path = format!("si-registry/proto/si.{package}.proto");
            let own_prefix = format!("si-registry/proto/{}", self.package_name());
            if !import_path.starts_with(&own_prefix) {
                set.insert(import_path);
            }
        } else {
            set.insert("google/protobuf/wrappers.proto".to_string());
        }
        if let Some(properties) = prop.properties() {
            for child in properties.entries() {
                self.import_walk(child, set)?;
            }
        }
        Ok(())
    }

    /// The complete proto file.
    pub fn generate_string(&self) -> Result<String> {
        let mut out = String::new();
        writeln!(out, "syntax = \"proto3\";").unwrap();
        writeln!(out).unwrap();
        writeln!(out, "package {};", self.package_name()).unwrap();
        writeln!(out).unwrap();
        writeln!(out, "{}", self.imports()?).unwrap();
        writeln!(out).unwrap();
        writeln!(out, "{}", self.services()).unwrap();
        writeln!(out).unwrap();
        writeln!(out, "{}", self.messages()?).unwrap();
        Ok(out)
    }

    /// Write the proto file under `proto_dir`, skipping the write when the
    /// on-disk content already matches. Returns whether the file changed.
    pub async fn write_proto(&self, proto_dir: &Path) -> Result<bool> {
        let path: PathBuf = proto_dir.join(self.output_file());
        let content = self.generate_string()?;
        write_code(&path, &content).await
    }
}
