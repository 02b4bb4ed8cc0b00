//! Rust source generation for service crates.
//!
//! Produces the `gen/` tree of a `si-{service}` crate: model impls,
//! the tonic service implementation, and agent dispatch modules. The
//! formatters return values (type names, snippets, argument lists); file
//! assembly is plain string building on top of them.
//!
//! Some of the emitted code encodes organization policy rather than
//! schema structure. Tenancy scoping in particular is a fixed dispatch
//! on the object's type name and kind, not derived from its fields.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::case::{pascal_case, snake_case};
use crate::error::{Error, Result};
use crate::object::{ObjectKind, SchemaObject};
use crate::prop::{NumberKind, Prop, PropKind};
use crate::registry::Registry;
use crate::writer::{write_code, write_rust_code};

const GENERATED_HEADER: &str = "// Auto-generated code!\n// No touchy!\n";

/// Render flags for [`RustFormatter::rust_type_for_prop`].
///
/// `reference` swaps owned types for borrows (`String` becomes `&str`).
/// `option` wraps non-repeated types in `Option`; repeated props always
/// render as `Vec<T>` and never pick up an `Option` wrapper.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub reference: bool,
    pub option: bool,
}

impl Default for RenderOptions {
    fn default() -> RenderOptions {
        RenderOptions {
            reference: false,
            option: true,
        }
    }
}

/// Value producer for one object's generated Rust.
#[derive(Debug)]
pub struct RustFormatter<'a> {
    registry: &'a Registry,
    object: &'a SchemaObject,
}

impl<'a> RustFormatter<'a> {
    pub fn new(registry: &'a Registry, object: &'a SchemaObject) -> RustFormatter<'a> {
        RustFormatter { registry, object }
    }

    /// The protobuf struct path, `crate::protobuf::{Pascal}`.
    pub fn struct_name(&self) -> String {
        format!("crate::protobuf::{}", pascal_case(&self.object.type_name))
    }

    pub fn type_name(&self) -> String {
        snake_case(&self.object.type_name)
    }

    pub fn error_type(&self) -> String {
        format!(
            "crate::error::{}Error",
            pascal_case(&self.object.service_name)
        )
    }

    pub fn has_create_method(&self) -> bool {
        self.object.methods().get_entry("create").is_ok()
    }

    /// The object's methods in name order.
    pub fn service_methods(&self) -> Vec<&'a Prop> {
        let mut methods: Vec<&Prop> = self.object.methods().entries().iter().collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        methods
    }

    pub fn rust_field_name_for_prop(&self, prop: &Prop) -> String {
        snake_case(&prop.name)
    }

    /// The generated trait method name for a service method, e.g.
    /// `widget_entity_create`.
    pub fn impl_service_method_name(&self, method: &Prop) -> Result<String> {
        Ok(snake_case(&self.rust_type_for_prop(
            method,
            RenderOptions {
                reference: false,
                option: false,
            },
        )?))
    }

    pub fn impl_service_request_type(&self, method: &Prop, opts: RenderOptions) -> Result<String> {
        let Some(data) = method.method() else {
            return Err(Error::InvalidObject(format!(
                "'{}' on {} is not a method",
                method.name, self.object.type_name
            )));
        };
        self.rust_type_for_prop(&data.request, opts)
    }

    pub fn impl_service_reply_type(&self, method: &Prop, opts: RenderOptions) -> Result<String> {
        let Some(data) = method.method() else {
            return Err(Error::InvalidObject(format!(
                "'{}' on {} is not a method",
                method.name, self.object.type_name
            )));
        };
        self.rust_type_for_prop(&data.reply, opts)
    }

    /// The authentication preamble of one service method body.
    pub fn impl_service_auth(&self, method: &Prop) -> Result<String> {
        if let Some(data) = method.method() {
            if data.skip_auth {
                return Ok("// Skipping authentication".to_string());
            }
        }
        let prelude = if self.object.service_name == "account" {
            "crate::authorize"
        } else {
            "si_account::authorize"
        };
        Ok(format!(
            "{prelude}::authnz(&self.db, &request, \"{}\").await?;",
            self.impl_service_method_name(method)?
        ))
    }

    /// The Rust type a prop renders as.
    pub fn rust_type_for_prop(&self, prop: &Prop, opts: RenderOptions) -> Result<String> {
        let mut type_name = match &prop.kind {
            PropKind::Method(_) | PropKind::Action(_) => {
                format!(
                    "{}{}",
                    pascal_case(&prop.parent_name),
                    pascal_case(&prop.name)
                )
            }
            PropKind::Number { number_kind } => match number_kind {
                NumberKind::Int32 => "i32".to_string(),
                NumberKind::Uint32 => "u32".to_string(),
                NumberKind::Int64 => "i64".to_string(),
                NumberKind::Uint64 => "u64".to_string(),
                NumberKind::U128 => "u128".to_string(),
            },
            PropKind::Bool => "bool".to_string(),
            PropKind::Object(_) | PropKind::Enum { .. } => {
                format!(
                    "crate::protobuf::{}{}",
                    pascal_case(&prop.parent_name),
                    pascal_case(&prop.name)
                )
            }
            PropKind::Link { lookup } => {
                let real = self.registry.lookup_prop(lookup)?;
                if real.is_object() || real.is_enum() {
                    let owner = self.registry.get(&lookup.type_name)?;
                    let path = if owner.service_name == self.object.service_name {
                        "crate::protobuf".to_string()
                    } else {
                        format!("si_{}::protobuf", snake_case(&owner.service_name))
                    };
                    format!(
                        "{path}::{}{}",
                        pascal_case(&real.parent_name),
                        pascal_case(&real.name)
                    )
                } else {
                    return self.rust_type_for_prop(real, opts);
                }
            }
            PropKind::Map => "std::collections::HashMap<String, String>".to_string(),
            PropKind::Text
            | PropKind::Password
            | PropKind::Code { .. }
            | PropKind::Select { .. } => "String".to_string(),
        };
        if opts.reference {
            if type_name == "String" {
                type_name = "&str".to_string();
            } else {
                type_name = format!("&{type_name}");
            }
        }
        if prop.repeated {
            type_name = format!("Vec<{type_name}>");
        } else if opts.option {
            type_name = format!("Option<{type_name}>");
        }
        Ok(type_name)
    }

    /// Constructor argument list of the `create` method's request fields.
    pub fn impl_create_new_args(&self) -> Result<String> {
        let mut result = Vec::new();
        if let Ok(create) = self.object.methods().get_entry("create") {
            if let Some(data) = create.method() {
                if let Some(request) = data.request.properties() {
                    for prop in request.entries() {
                        result.push(format!(
                            "{}: {}",
                            snake_case(&prop.name),
                            self.rust_type_for_prop(prop, RenderOptions::default())?
                        ));
                    }
                }
            }
        }
        Ok(result.join(", "))
    }

    pub fn impl_create_pass_new_args(&self) -> String {
        let mut result = Vec::new();
        if let Ok(create) = self.object.methods().get_entry("create") {
            if let Some(data) = create.method() {
                if let Some(request) = data.request.properties() {
                    for prop in request.entries() {
                        result.push(snake_case(&prop.name));
                    }
                }
            }
        }
        result.join(", ")
    }

    pub fn impl_service_method_create_destructure(&self) -> String {
        let mut result = Vec::new();
        if let Ok(create) = self.object.methods().get_entry("create") {
            if let Some(data) = create.method() {
                if let Some(request) = data.request.properties() {
                    for prop in request.entries() {
                        let field_name = snake_case(&prop.name);
                        result.push(format!("let {field_name} = inner.{field_name};"));
                    }
                }
            }
        }
        result.join("\n")
    }

    /// Field assignments inside the generated constructor. Passwords are
    /// encrypted before storage.
    pub fn impl_create_set_properties(&self) -> String {
        let mut result = Vec::new();
        if let Ok(create) = self.object.methods().get_entry("create") {
            if let Some(data) = create.method() {
                if let Some(request) = data.request.properties() {
                    for prop in request.entries() {
                        let variable_name = snake_case(&prop.name);
                        if matches!(prop.kind, PropKind::Password) {
                            result.push(format!(
                                "result_obj.{variable_name} = Some(si_data::password::encrypt_password({variable_name})?);"
                            ));
                        } else {
                            result.push(format!("result_obj.{variable_name} = {variable_name};"));
                        }
                    }
                }
            }
        }
        result.join("\n")
    }

    /// Field-by-field mapping of an internal list result onto the reply.
    pub fn impl_service_method_list_result_to_reply(&self) -> String {
        let mut result = Vec::new();
        if let Ok(list) = self.object.methods().get_entry("list") {
            if let Some(data) = list.method() {
                if let Some(reply) = data.reply.properties() {
                    for prop in reply.entries() {
                        let field_name = snake_case(&prop.name);
                        let value = match field_name.as_str() {
                            "next_page_token" => "Some(list_reply.page_token)".to_string(),
                            "items" => format!("list_reply.{field_name}"),
                            _ => format!("Some(list_reply.{field_name})"),
                        };
                        result.push(format!("{field_name}: {value}"));
                    }
                }
            }
        }
        result.join(", ")
    }

    pub fn natural_key(&self) -> String {
        if self.object.kind == ObjectKind::BaseObject {
            "name".to_string()
        } else {
            snake_case(&self.object.natural_key)
        }
    }

    pub fn is_storable(&self) -> bool {
        self.object.kind != ObjectKind::BaseObject
    }

    pub fn is_migrateable(&self) -> bool {
        self.object.kind != ObjectKind::BaseObject && self.object.migrateable
    }

    pub fn is_entity_object(&self) -> bool {
        self.object.kind == ObjectKind::EntityObject
    }

    pub fn is_entity_action_method(&self, method: &Prop) -> bool {
        matches!(method.kind, PropKind::Action(_))
    }

    pub fn is_entity_edit_method(&self, method: &Prop) -> bool {
        self.is_entity_action_method(method) && method.name.ends_with("Edit")
    }

    /// Methods an agent executes: every action, plus `create`, which runs
    /// against the backing infrastructure rather than only the database.
    pub fn is_agent_dispatch_method(&self, method: &Prop) -> bool {
        self.is_entity_action_method(method) || method.name == "create"
    }

    /// Dispatch name of an edit action: `imageEdit` becomes `edit_image`.
    pub fn entity_edit_method_name(&self, method: &Prop) -> String {
        let name = snake_case(&method.name);
        let base = name.strip_suffix("_edit").unwrap_or(&name);
        format!("edit_{base}")
    }

    /// Tenant-scoping statements for the generated constructor.
    ///
    /// This is organization policy keyed on the object's identity. Billing
    /// accounts and integrations are global; components scope to their
    /// integration and integration service; workspace-level objects chain
    /// up through organization and billing account.
    pub fn impl_create_add_to_tenancy(&self) -> String {
        let mut result: Vec<String> = Vec::new();
        let require_si_properties =
            "si_properties.as_ref().ok_or(si_data::DataError::ValidationError(\"siProperties\".into()))?;";
        let tenant_from = |field: &str| {
            let camel = crate::case::camel_case(field);
            format!(
                "let {field} = si_properties.as_ref().unwrap().{field}.as_ref().ok_or(\n    si_data::DataError::ValidationError(\"siProperties.{camel}\".into()),\n)?;\nsi_storable.add_to_tenant_ids({field});"
            )
        };
        match self.object.type_name.as_str() {
            "billingAccount" | "integration" => {
                result.push("si_storable.add_to_tenant_ids(\"global\");".to_string());
            }
            "integrationService" => {
                result.push("si_storable.add_to_tenant_ids(\"global\");".to_string());
                result.push(require_si_properties.to_string());
                result.push(tenant_from("integration_id"));
            }
            "user" | "group" | "organization" | "integrationInstance" => {
                result.push(require_si_properties.to_string());
                result.push(tenant_from("billing_account_id"));
            }
            "workspace" => {
                result.push(require_si_properties.to_string());
                result.push(tenant_from("billing_account_id"));
                result.push(tenant_from("organization_id"));
            }
            _ if self.object.kind == ObjectKind::ComponentObject => {
                result.push("si_storable.add_to_tenant_ids(\"global\");".to_string());
                result.push(require_si_properties.to_string());
                result.push(tenant_from("integration_id"));
                result.push(tenant_from("integration_service_id"));
            }
            _ => {
                result.push(require_si_properties.to_string());
                result.push(tenant_from("billing_account_id"));
                result.push(tenant_from("organization_id"));
                result.push(tenant_from("workspace_id"));
            }
        }
        result.join("\n")
    }

    /// The body of the generated `validate` implementation.
    pub fn storable_validate_function(&self) -> String {
        let mut result = Vec::new();
        for prop in self.object.fields().entries() {
            if !prop.required {
                continue;
            }
            let prop_name = snake_case(&prop.name);
            if prop.repeated {
                result.push(format!(
                    "if self.{prop_name}.is_empty() {{\n    return Err(si_data::DataError::ValidationError(\"missing required {prop_name} value\".into()));\n}}"
                ));
            } else {
                result.push(format!(
                    "if self.{prop_name}.is_none() {{\n    return Err(si_data::DataError::ValidationError(\"missing required {prop_name} value\".into()));\n}}"
                ));
            }
        }
        result.join("\n")
    }

    fn storable_order_by_fields_by_prop(&self, prop: &Prop, prefix: &str) -> Result<String> {
        let mut results = vec!["\"siStorable.naturalKey\"".to_string()];
        let Some(properties) = prop.properties() else {
            return Err(Error::InvalidObject(format!(
                "order-by fields requested for non object '{}' on {}",
                prop.name, self.object.type_name
            )));
        };
        for child in properties.entries() {
            if child.hidden {
                continue;
            }
            let mut child = child;
            if let Some(lookup) = child.lookup() {
                child = self.registry.lookup_prop(lookup)?;
            }
            if child.is_object() {
                let child_prefix = if prefix.is_empty() {
                    child.name.clone()
                } else {
                    format!("{prefix}.{}", child.name)
                };
                results.push(self.storable_order_by_fields_by_prop(child, &child_prefix)?);
            } else if prefix.is_empty() {
                results.push(format!("\"{}\"", child.name));
            } else {
                results.push(format!("\"{prefix}.{}\"", child.name));
            }
        }
        Ok(results.join(", "))
    }

    /// The ORDER BY allow-list: every queryable dotted path of the object,
    /// with the natural-key sentinel first.
    pub fn storable_order_by_fields_function(&self) -> Result<String> {
        Ok(format!(
            "vec![{}]",
            self.storable_order_by_fields_by_prop(&self.object.root_prop, "")?
        ))
    }

    /// Referential-integrity declarations. Only components get them; every
    /// reference prop under `siProperties` becomes a HasOne/HasMany check.
    pub fn storable_referential_fields_function(&self) -> Result<String> {
        if self.object.kind != ObjectKind::ComponentObject {
            return Ok("Vec::new()".to_string());
        }
        let mut si_properties = self.object.fields().get_entry("siProperties")?;
        if let Some(lookup) = si_properties.lookup() {
            si_properties = self.registry.lookup_prop(lookup)?;
        }
        let Some(properties) = si_properties.properties() else {
            return Err(Error::InvalidObject(format!(
                "siProperties on {} is not an object",
                self.object.type_name
            )));
        };
        let mut fetch_props = Vec::new();
        let mut reference_vec = Vec::new();
        for prop in properties.entries() {
            if !prop.reference {
                continue;
            }
            let item_name = snake_case(&prop.name);
            fetch_props.push(format!(
                "let {item_name} = match &self.si_properties {{\n    Some(cip) => cip\n        .{item_name}\n        .as_ref()\n        .map(String::as_ref)\n        .unwrap_or(\"No {item_name} found for referential integrity check\"),\n    None => \"No {item_name} found for referential integrity check\",\n}};"
            ));
            let variant = if prop.repeated { "HasMany" } else { "HasOne" };
            reference_vec.push(format!(
                "si_data::Reference::{variant}(\"{item_name}\", {item_name})"
            ));
        }
        if fetch_props.is_empty() {
            return Ok("Vec::new()".to_string());
        }
        Ok(format!(
            "{}\nvec![{}]",
            fetch_props.join("\n"),
            reference_vec.join(", ")
        ))
    }
}

/// Value producer for one service's generated service implementation.
#[derive(Debug)]
pub struct RustFormatterService<'a> {
    registry: &'a Registry,
    service_name: String,
    objects: Vec<&'a SchemaObject>,
}

impl<'a> RustFormatterService<'a> {
    pub fn new(registry: &'a Registry, service_name: &str) -> Result<RustFormatterService<'a>> {
        let mut objects = registry.objects_for_service(service_name);
        if objects.is_empty() {
            return Err(Error::EmptyService(service_name.to_string()));
        }
        objects.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        Ok(RustFormatterService {
            registry,
            service_name: service_name.to_string(),
            objects,
        })
    }

    pub fn formatters(&self) -> Vec<RustFormatter<'a>> {
        self.objects
            .iter()
            .map(|o| RustFormatter::new(self.registry, o))
            .collect()
    }

    pub fn has_entities(&self) -> bool {
        self.objects
            .iter()
            .any(|o| o.kind == ObjectKind::EntityObject)
    }

    pub fn has_service_methods(&self) -> bool {
        self.objects.iter().any(|o| !o.methods().is_empty())
    }

    pub fn has_models(&self) -> bool {
        self.objects
            .iter()
            .any(|o| o.kind != ObjectKind::BaseObject)
    }

    /// The generated service struct body. Services with entities carry an
    /// agent client alongside the database handle.
    pub fn impl_service_struct_body(&self) -> String {
        let mut result = vec!["pub db: si_data::Db,".to_string()];
        if self.has_entities() {
            result.push("pub agent: si_cea::AgentClient,".to_string());
        }
        result.join("\n")
    }

    pub fn impl_service_new_constructor_args(&self) -> String {
        if self.has_entities() {
            "db: si_data::Db, agent: si_cea::AgentClient".to_string()
        } else {
            "db: si_data::Db".to_string()
        }
    }

    pub fn impl_service_struct_constructor_return(&self) -> String {
        if self.has_entities() {
            "db, agent".to_string()
        } else {
            "db".to_string()
        }
    }

    /// The tonic server trait this service implements.
    pub fn impl_service_trait_name(&self) -> String {
        format!(
            "crate::protobuf::{}_server::{}",
            snake_case(&self.service_name),
            pascal_case(&self.service_name)
        )
    }

    /// One migrate call per migrateable object.
    pub fn impl_service_migrate(&self) -> String {
        let mut result = Vec::new();
        for fmt in self.formatters() {
            if fmt.is_migrateable() {
                result.push(format!("{}::migrate(&self.db).await?;", fmt.struct_name()));
            }
        }
        result.join("\n")
    }
}

/// One agent dispatch module: the entity actions of one integration
/// service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityIntegrationService {
    pub agent_name: String,
    pub entity_type_name: String,
    pub integration_name: String,
    pub integration_service_name: String,
}

/// File-level generation of a `si-{service}` crate's `gen/` tree.
#[derive(Debug)]
pub struct CodegenRust<'a> {
    registry: &'a Registry,
    service_name: String,
    output_dir: PathBuf,
    format: bool,
}

impl<'a> CodegenRust<'a> {
    pub fn new(
        registry: &'a Registry,
        service_name: &str,
        output_dir: &Path,
        format: bool,
    ) -> CodegenRust<'a> {
        CodegenRust {
            registry,
            service_name: service_name.to_string(),
            output_dir: output_dir.to_path_buf(),
            format,
        }
    }

    fn objects(&self) -> Vec<&'a SchemaObject> {
        self.registry.objects_for_service(&self.service_name)
    }

    pub fn has_models(&self) -> bool {
        self.objects()
            .iter()
            .any(|o| o.kind != ObjectKind::BaseObject)
    }

    pub fn has_service_methods(&self) -> bool {
        self.objects().iter().any(|o| !o.methods().is_empty())
    }

    pub fn has_entity_integration_services(&self) -> bool {
        !self.entity_integration_services().is_empty()
    }

    /// The agent modules this service needs: one per integration service
    /// of each entity, named `{integration}_{integration_service}`.
    pub fn entity_integration_services(&self) -> Vec<EntityIntegrationService> {
        let mut result = Vec::new();
        for object in self.objects() {
            if object.kind != ObjectKind::EntityObject {
                continue;
            }
            for is in &object.integration_services {
                result.push(EntityIntegrationService {
                    agent_name: format!(
                        "{}_{}",
                        snake_case(&is.integration_name),
                        snake_case(&is.integration_service_name)
                    ),
                    entity_type_name: object.type_name.clone(),
                    integration_name: is.integration_name.clone(),
                    integration_service_name: is.integration_service_name.clone(),
                });
            }
        }
        result
    }

    async fn write(&self, relative: &str, code: &str) -> Result<bool> {
        let path = self
            .output_dir
            .join(format!("si-{}", self.service_name))
            .join("src")
            .join(relative);
        if self.format {
            write_rust_code(&path, code).await
        } else {
            write_code(&path, code).await
        }
    }

    /// `gen/mod.rs`.
    pub async fn generate_gen_mod(&self) -> Result<bool> {
        let mut results = vec![GENERATED_HEADER.to_string()];
        if self.has_models() {
            results.push("pub mod model;".to_string());
        }
        if self.has_service_methods() {
            results.push("pub mod service;".to_string());
        }
        if self.has_entity_integration_services() {
            results.push("pub mod agent;".to_string());
        }
        self.write("gen/mod.rs", &format!("{}\n", results.join("\n")))
            .await
    }

    /// `gen/model/mod.rs`: one module per non-base object.
    pub async fn generate_gen_model_mod(&self) -> Result<bool> {
        let mut results = vec![GENERATED_HEADER.to_string()];
        for object in self.objects() {
            if object.kind != ObjectKind::BaseObject {
                results.push(format!("pub mod {};", snake_case(&object.type_name)));
            }
        }
        self.write("gen/model/mod.rs", &format!("{}\n", results.join("\n")))
            .await
    }

    /// `gen/model/{type}.rs`: constructor, tenancy, and storable impls for
    /// one object.
    pub async fn generate_gen_model(&self, object: &SchemaObject) -> Result<bool> {
        let code = self.model_string(object)?;
        self.write(
            &format!("gen/model/{}.rs", snake_case(&object.type_name)),
            &code,
        )
        .await
    }

    fn model_string(&self, object: &SchemaObject) -> Result<String> {
        let fmt = RustFormatter::new(self.registry, object);
        let mut out = String::new();
        writeln!(out, "{GENERATED_HEADER}").unwrap();
        writeln!(out, "impl {} {{", fmt.struct_name()).unwrap();
        if fmt.has_create_method() {
            writeln!(
                out,
                "    pub async fn create(db: &si_data::Db, {}) -> si_data::Result<{}> {{",
                fmt.impl_create_new_args()?,
                fmt.struct_name()
            )
            .unwrap();
            writeln!(out, "        let mut si_storable = si_data::Storable::default();").unwrap();
            writeln!(out, "{}", indent(&fmt.impl_create_add_to_tenancy(), 8)).unwrap();
            writeln!(
                out,
                "        let mut result_obj = {}::default();",
                fmt.struct_name()
            )
            .unwrap();
            writeln!(out, "{}", indent(&fmt.impl_create_set_properties(), 8)).unwrap();
            writeln!(out, "        db.insert(&mut result_obj).await?;").unwrap();
            writeln!(out, "        Ok(result_obj)").unwrap();
            writeln!(out, "    }}").unwrap();
        }
        if fmt.is_migrateable() {
            writeln!(out).unwrap();
            writeln!(
                out,
                "    pub async fn migrate(db: &si_data::Db) -> si_data::Result<()> {{"
            )
            .unwrap();
            writeln!(out, "        db.migrate_component::<{}>().await", fmt.struct_name()).unwrap();
            writeln!(out, "    }}").unwrap();
        }
        writeln!(out, "}}").unwrap();
        if fmt.is_storable() {
            writeln!(out).unwrap();
            writeln!(out, "impl si_data::Storable for {} {{", fmt.struct_name()).unwrap();
            writeln!(out, "    fn type_name() -> &'static str {{").unwrap();
            writeln!(out, "        \"{}\"", fmt.type_name()).unwrap();
            writeln!(out, "    }}").unwrap();
            writeln!(out).unwrap();
            writeln!(out, "    fn natural_key(&self) -> &'static str {{").unwrap();
            writeln!(out, "        \"{}\"", fmt.natural_key()).unwrap();
            writeln!(out, "    }}").unwrap();
            writeln!(out).unwrap();
            writeln!(out, "    fn validate(&self) -> si_data::Result<()> {{").unwrap();
            writeln!(out, "{}", indent(&fmt.storable_validate_function(), 8)).unwrap();
            writeln!(out, "        Ok(())").unwrap();
            writeln!(out, "    }}").unwrap();
            writeln!(out).unwrap();
            writeln!(out, "    fn order_by_fields() -> Vec<&'static str> {{").unwrap();
            writeln!(out, "        {}", fmt.storable_order_by_fields_function()?).unwrap();
            writeln!(out, "    }}").unwrap();
            writeln!(out).unwrap();
            writeln!(
                out,
                "    fn referential_fields(&self) -> Vec<si_data::Reference> {{"
            )
            .unwrap();
            writeln!(
                out,
                "{}",
                indent(&fmt.storable_referential_fields_function()?, 8)
            )
            .unwrap();
            writeln!(out, "    }}").unwrap();
            writeln!(out, "}}").unwrap();
        }
        Ok(out)
    }

    /// `gen/service.rs`: the tonic service implementation.
    pub async fn generate_gen_service(&self) -> Result<bool> {
        let code = self.service_string()?;
        self.write("gen/service.rs", &code).await
    }

    fn service_string(&self) -> Result<String> {
        let service = RustFormatterService::new(self.registry, &self.service_name)?;
        let mut out = String::new();
        writeln!(out, "{GENERATED_HEADER}").unwrap();
        writeln!(out, "#[derive(Clone)]").unwrap();
        writeln!(out, "pub struct Service {{").unwrap();
        writeln!(out, "{}", indent(&service.impl_service_struct_body(), 4)).unwrap();
        writeln!(out, "}}").unwrap();
        writeln!(out).unwrap();
        writeln!(out, "impl Service {{").unwrap();
        writeln!(
            out,
            "    pub fn new({}) -> Service {{",
            service.impl_service_new_constructor_args()
        )
        .unwrap();
        writeln!(
            out,
            "        Service {{ {} }}",
            service.impl_service_struct_constructor_return()
        )
        .unwrap();
        writeln!(out, "    }}").unwrap();
        writeln!(out).unwrap();
        writeln!(out, "    pub async fn migrate(&self) -> si_data::Result<()> {{").unwrap();
        writeln!(out, "{}", indent(&service.impl_service_migrate(), 8)).unwrap();
        writeln!(out, "        Ok(())").unwrap();
        writeln!(out, "    }}").unwrap();
        writeln!(out, "}}").unwrap();
        writeln!(out).unwrap();
        writeln!(out, "#[tonic::async_trait]").unwrap();
        writeln!(
            out,
            "impl {} for Service {{",
            service.impl_service_trait_name()
        )
        .unwrap();
        let mut first = true;
        for fmt in service.formatters() {
            for method in fmt.service_methods() {
                if !first {
                    writeln!(out).unwrap();
                }
                first = false;
                writeln!(out, "{}", indent(&self.service_method_string(&fmt, method)?, 4)).unwrap();
            }
        }
        writeln!(out, "}}").unwrap();
        Ok(out)
    }

    fn service_method_string(&self, fmt: &RustFormatter<'_>, method: &Prop) -> Result<String> {
        let no_wrap = RenderOptions {
            reference: false,
            option: false,
        };
        let method_name = fmt.impl_service_method_name(method)?;
        let request_type = fmt.impl_service_request_type(method, no_wrap)?;
        let reply_type = fmt.impl_service_reply_type(method, no_wrap)?;
        let mut out = String::new();
        writeln!(out, "async fn {method_name}(").unwrap();
        writeln!(out, "    &self,").unwrap();
        writeln!(out, "    request: tonic::Request<{request_type}>,").unwrap();
        writeln!(
            out,
            ") -> std::result::Result<tonic::Response<{reply_type}>, tonic::Status> {{"
        )
        .unwrap();
        writeln!(out, "{}", indent(&fmt.impl_service_auth(method)?, 4)).unwrap();
        writeln!(out, "    let inner = request.into_inner();").unwrap();
        writeln!(
            out,
            "    let reply = crate::model::{}::{method_name}(&self.db, inner).await?;",
            fmt.type_name()
        )
        .unwrap();
        writeln!(out, "    Ok(tonic::Response::new(reply))").unwrap();
        write!(out, "}}").unwrap();
        Ok(out)
    }

    /// `gen/agent/mod.rs`.
    pub async fn generate_gen_agent_mod(&self) -> Result<bool> {
        let mut results = vec![GENERATED_HEADER.to_string()];
        let mut agents: Vec<String> = self
            .entity_integration_services()
            .into_iter()
            .map(|a| a.agent_name)
            .collect();
        agents.sort();
        agents.dedup();
        for agent in agents {
            results.push(format!("pub mod {agent};"));
        }
        self.write("gen/agent/mod.rs", &format!("{}\n", results.join("\n")))
            .await
    }

    /// `gen/agent/{agent}.rs`: the dispatch function routing entity-event
    /// actions to their handlers.
    pub async fn generate_gen_agent(&self, agent: &EntityIntegrationService) -> Result<bool> {
        let code = self.agent_string(agent)?;
        self.write(&format!("gen/agent/{}.rs", agent.agent_name), &code)
            .await
    }

    fn agent_string(&self, agent: &EntityIntegrationService) -> Result<String> {
        let object = self.registry.get(&agent.entity_type_name)?;
        let fmt = RustFormatter::new(self.registry, object);
        let event_type = format!(
            "crate::protobuf::{}Event",
            pascal_case(&object.type_name)
        );
        let mut out = String::new();
        writeln!(out, "{GENERATED_HEADER}").unwrap();
        writeln!(out, "pub async fn dispatch(").unwrap();
        writeln!(out, "    mqtt_client: &si_cea::MqttClient,").unwrap();
        writeln!(out, "    entity_event: &mut {event_type},").unwrap();
        writeln!(out, ") -> si_cea::CeaResult<()> {{").unwrap();
        writeln!(out, "    match entity_event.action_name()? {{").unwrap();
        for method in fmt.service_methods() {
            if !fmt.is_agent_dispatch_method(method) {
                continue;
            }
            let handler = if fmt.is_entity_edit_method(method) {
                fmt.entity_edit_method_name(method)
            } else {
                snake_case(&method.name)
            };
            writeln!(
                out,
                "        \"{}\" => {handler}(mqtt_client, entity_event).await,",
                snake_case(&method.name)
            )
            .unwrap();
        }
        writeln!(
            out,
            "        unknown => Err(si_cea::CeaError::DispatchFunctionMissing("
        )
        .unwrap();
        writeln!(out, "            entity_event.object_type()?.to_string(),").unwrap();
        writeln!(out, "            unknown.to_string(),").unwrap();
        writeln!(out, "        )),").unwrap();
        writeln!(out, "    }}").unwrap();
        writeln!(out, "}}").unwrap();
        Ok(out)
    }
}

fn indent(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<String>>()
        .join("\n")
}
