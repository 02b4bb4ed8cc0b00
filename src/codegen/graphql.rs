//! GraphQL document generation.
//!
//! Builds executable query and mutation documents straight from the
//! schema, with no intermediate schema file. The same object also
//! produces the variable placeholders a form pre-populates with and
//! validates responses against the method's reply shape.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::case::{camel_case, pascal_case};
use crate::error::{Error, Result};
use crate::object::SchemaObject;
use crate::prop::{NumberKind, Prop, PropKind};
use crate::registry::Registry;

/// Per-object association selections: object type name to the
/// association field names to expand.
pub type AssociationSelections = BTreeMap<String, Vec<String>>;

/// Arguments for [`SiGraphql::query`] and [`SiGraphql::mutation`].
#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub method_name: String,
    /// Replaces the computed `camelType` + `PascalMethod` field alias.
    pub override_name: Option<String>,
    /// Replaces the reply's computed selection set.
    pub override_fields: Option<String>,
    pub associations: Option<AssociationSelections>,
}

impl QueryArgs {
    pub fn for_method(method_name: &str) -> QueryArgs {
        QueryArgs {
            method_name: method_name.to_string(),
            ..QueryArgs::default()
        }
    }
}

/// GraphQL document builder for one object.
#[derive(Debug)]
pub struct SiGraphql<'a> {
    registry: &'a Registry,
    object: &'a SchemaObject,
}

impl<'a> SiGraphql<'a> {
    pub fn new(registry: &'a Registry, object: &'a SchemaObject) -> SiGraphql<'a> {
        SiGraphql { registry, object }
    }

    fn lookup_name(&self, method_name: &str, override_name: Option<&str>) -> String {
        match override_name {
            Some(name) => name.to_string(),
            None => format!(
                "{}{}",
                camel_case(&self.object.type_name),
                pascal_case(method_name)
            ),
        }
    }

    /// Check that every required reply field is present in a response and
    /// return the result object under the method's lookup key.
    pub fn validate_result(
        &self,
        method_name: &str,
        data: &Value,
        override_name: Option<&str>,
    ) -> Result<Value> {
        let method = self.object.methods().get_entry(method_name)?;
        let Some(method_data) = method.method() else {
            return Err(Error::InvalidObject(format!(
                "'{method_name}' on {} is not a method",
                self.object.type_name
            )));
        };
        let lookup_name = self.lookup_name(method_name, override_name);
        let result = &data["data"][&lookup_name];
        if let Some(reply) = method_data.reply.properties() {
            for field in reply.entries() {
                if field.required && result[&field.name].is_null() {
                    return Err(Error::Validation(format!(
                        "response incomplete; missing required field {}",
                        field.name
                    )));
                }
            }
        }
        Ok(result.clone())
    }

    /// Placeholder variable values for a method's request, keyed by field
    /// name. Scalars get empty strings, maps and repeated props empty
    /// arrays, objects recurse.
    pub fn variables_object(&self, method_name: &str) -> Result<Value> {
        let method = self.object.methods().get_entry(method_name)?;
        let Some(method_data) = method.method() else {
            return Err(Error::InvalidObject(format!(
                "'{method_name}' on {} is not a method",
                self.object.type_name
            )));
        };
        let mut result = serde_json::Map::new();
        if let Some(request) = method_data.request.properties() {
            for field in request.entries() {
                result.insert(field.name.clone(), field.default_value());
            }
        }
        Ok(Value::Object(result))
    }

    /// The GraphQL type of a prop. `input_type` marks request position,
    /// where object types pick up a `Request` suffix; enums share one type
    /// between both positions.
    pub fn graphql_type_name(&self, prop: &Prop, input_type: bool) -> Result<String> {
        let result = match &prop.kind {
            PropKind::Object(_) | PropKind::Method(_) | PropKind::Action(_) => {
                let request = if input_type { "Request" } else { "" };
                format!(
                    "{}{}{request}",
                    pascal_case(&prop.parent_name),
                    pascal_case(&prop.name)
                )
            }
            PropKind::Enum { .. } => format!(
                "{}{}",
                pascal_case(&prop.parent_name),
                pascal_case(&prop.name)
            ),
            PropKind::Text | PropKind::Password => {
                if prop.name == "id" {
                    "ID".to_string()
                } else {
                    "String".to_string()
                }
            }
            PropKind::Code { .. } | PropKind::Select { .. } | PropKind::Map => "String".to_string(),
            // Only int32 fits in a GraphQL Int; wider kinds ride as
            // strings to avoid silent truncation.
            PropKind::Number { number_kind } => match number_kind {
                NumberKind::Int32 => "Int".to_string(),
                _ => "String".to_string(),
            },
            PropKind::Bool => "Boolean".to_string(),
            PropKind::Link { lookup } => {
                let real = self.registry.lookup_prop(lookup)?;
                let mut real = real.clone();
                real.required = prop.required;
                return self.graphql_type_name(&real, input_type);
            }
        };
        if prop.required {
            Ok(format!("{result}!"))
        } else {
            Ok(result)
        }
    }

    fn association_field_list(
        &self,
        associations: Option<&AssociationSelections>,
        object: &SchemaObject,
    ) -> Result<String> {
        let Some(field_names) = associations.and_then(|a| a.get(&object.type_name)) else {
            return Ok(String::new());
        };
        let mut result = vec!["associations {".to_string()];
        for field_name in field_names {
            let assoc = object.associations.get_by_field_name(field_name)?;
            let assoc_object = self.registry.get(&assoc.type_name)?;
            let assoc_method = assoc_object.methods().get_entry(&assoc.method_name)?;
            let Some(method_data) = assoc_method.method() else {
                return Err(Error::InvalidObject(format!(
                    "'{}' on {} is not a method",
                    assoc.method_name, assoc_object.type_name
                )));
            };
            result.push(format!("{field_name} {{"));
            result.push(self.field_list(&method_data.reply, associations, assoc_object)?);
            result.push("}".to_string());
        }
        result.push("}".to_string());
        Ok(result.join(" "))
    }

    /// The selection set of an object prop: every non-hidden, non-skipped
    /// field, with nested objects braced and associations spliced in.
    pub fn field_list(
        &self,
        prop_object: &Prop,
        associations: Option<&AssociationSelections>,
        object: &SchemaObject,
    ) -> Result<String> {
        let Some(properties) = prop_object.properties() else {
            return Err(Error::InvalidObject(format!(
                "field list requested for non object '{}' on {}",
                prop_object.name, object.type_name
            )));
        };
        let mut result: Vec<String> = Vec::new();
        for prop in properties.entries() {
            if prop.hidden || prop.skip {
                continue;
            }
            result.push(prop.name.clone());
            match &prop.kind {
                PropKind::Object(_) => {
                    result.push("{".to_string());
                    result.push(self.field_list(prop, None, object)?);
                    let assoc = self.association_field_list(associations, object)?;
                    if !assoc.is_empty() {
                        result.push(assoc);
                    }
                    result.push("}".to_string());
                }
                PropKind::Map => {
                    result.push("{ key value }".to_string());
                }
                PropKind::Link { lookup } => {
                    let real = self.registry.lookup_prop(lookup)?;
                    if real.is_object() {
                        result.push("{".to_string());
                        result.push(self.field_list(real, None, object)?);
                        let assoc = self.association_field_list(associations, object)?;
                        if !assoc.is_empty() {
                            result.push(assoc);
                        }
                        result.push("}".to_string());
                    }
                }
                _ => {}
            }
        }
        Ok(result.join(" "))
    }

    fn document(&self, keyword: &str, args: &QueryArgs) -> Result<String> {
        let method = self.object.methods().get_entry(&args.method_name)?;
        let Some(method_data) = method.method() else {
            return Err(Error::InvalidObject(format!(
                "'{}' on {} is not a method",
                args.method_name, self.object.type_name
            )));
        };
        let method_name = self.lookup_name(&args.method_name, args.override_name.as_deref());
        let input_type = keyword == "mutation";

        let mut request_variables = Vec::new();
        let mut input_variables = Vec::new();
        if let Some(request) = method_data.request.properties() {
            for prop in request.entries() {
                request_variables.push(format!(
                    "${}: {}",
                    prop.name,
                    self.graphql_type_name(prop, input_type)?
                ));
                input_variables.push(format!("{}: ${}", prop.name, prop.name));
            }
        }

        let field_list = match &args.override_fields {
            Some(fields) => fields.clone(),
            None => self.field_list(
                &method_data.reply,
                args.associations.as_ref(),
                self.object,
            )?,
        };

        Ok(format!(
            "{keyword} {method_name}({}) {{ {method_name}(input: {{ {} }}) {{ {field_list} }} }}",
            request_variables.join(", "),
            input_variables.join(", ")
        ))
    }

    /// An executable query document for one method.
    pub fn query(&self, args: &QueryArgs) -> Result<String> {
        self.document("query", args)
    }

    /// An executable mutation document for one method. Request-position
    /// object types render with their `Request` suffix here.
    pub fn mutation(&self, args: &QueryArgs) -> Result<String> {
        self.document("mutation", args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_registry;
    use serde_json::json;

    fn widget_registry() -> Registry {
        let mut registry = default_registry().unwrap();
        registry
            .component_and_entity("widget", "Widget", "widget", |t| {
                t.properties_mut()?.add_text("image", "Image", |_| {});
                t.entity
                    .associations
                    .belongs_to("widgetComponent", &["siProperties", "componentId"], |_| {});
                Ok(())
            })
            .unwrap();
        registry
    }

    fn graphql_for<'a>(registry: &'a Registry, type_name: &str) -> SiGraphql<'a> {
        SiGraphql::new(registry, registry.get(type_name).unwrap())
    }

    #[test]
    fn id_props_render_as_graphql_ids() {
        let registry = widget_registry();
        let graphql = graphql_for(&registry, "widgetEntity");
        let entity = registry.get("widgetEntity").unwrap();
        let id = entity.fields().get_entry("id").unwrap();
        assert_eq!(graphql.graphql_type_name(id, false).unwrap(), "ID!");
        let name = entity.fields().get_entry("name").unwrap();
        assert!(
            graphql
                .graphql_type_name(name, false)
                .unwrap()
                .starts_with("String")
        );
    }

    #[test]
    fn only_int32_numbers_render_as_int() {
        let mut registry = default_registry().unwrap();
        registry
            .base("widgetMeta", "Widget Meta", "widget", |o| {
                let fields = o.fields_mut();
                fields.add_number("count", "Count", NumberKind::Int32, |_| {});
                fields.add_number("port", "Port", NumberKind::Uint32, |_| {});
                Ok(())
            })
            .unwrap();
        let graphql = graphql_for(&registry, "widgetMeta");
        let meta = registry.get("widgetMeta").unwrap();
        let count = meta.fields().get_entry("count").unwrap();
        let port = meta.fields().get_entry("port").unwrap();
        assert_eq!(graphql.graphql_type_name(count, false).unwrap(), "Int");
        assert_eq!(graphql.graphql_type_name(port, false).unwrap(), "String");
    }

    #[test]
    fn object_types_take_a_request_suffix_only_in_input_position() {
        let registry = widget_registry();
        let graphql = graphql_for(&registry, "widgetEntity");
        let entity = registry.get("widgetEntity").unwrap();
        let properties = entity.fields().get_entry("properties").unwrap();
        assert_eq!(
            graphql.graphql_type_name(properties, false).unwrap(),
            "WidgetEntityProperties!"
        );
        assert_eq!(
            graphql.graphql_type_name(properties, true).unwrap(),
            "WidgetEntityPropertiesRequest!"
        );
    }

    #[test]
    fn required_props_get_a_bang() {
        let registry = widget_registry();
        let graphql = graphql_for(&registry, "widgetEntity");
        let get = registry
            .get("widgetEntity")
            .unwrap()
            .methods()
            .get_entry("get")
            .unwrap();
        let id = get
            .method()
            .unwrap()
            .request
            .properties()
            .unwrap()
            .get_entry("id")
            .unwrap();
        assert_eq!(graphql.graphql_type_name(id, false).unwrap(), "ID!");
    }

    #[test]
    fn query_documents_compose_variables_and_selection() {
        let registry = widget_registry();
        let graphql = graphql_for(&registry, "widgetEntity");
        let document = graphql.query(&QueryArgs::for_method("get")).unwrap();
        assert!(document.starts_with("query widgetEntityGet($id: ID!)"));
        assert!(document.contains("widgetEntityGet(input: { id: $id })"));
        assert!(document.contains("image"));
    }

    #[test]
    fn mutation_documents_use_the_mutation_keyword() {
        let registry = widget_registry();
        let graphql = graphql_for(&registry, "widgetEntity");
        let document = graphql.mutation(&QueryArgs::for_method("create")).unwrap();
        assert!(document.starts_with("mutation widgetEntityCreate("));
        // request-position object types pick up the Request suffix
        assert!(document.contains("PropertiesRequest"));
    }

    #[test]
    fn associations_expand_into_nested_selections() {
        let registry = widget_registry();
        let graphql = graphql_for(&registry, "widgetEntity");
        let mut associations = AssociationSelections::new();
        associations.insert(
            "widgetEntity".to_string(),
            vec!["widgetComponent".to_string()],
        );
        let document = graphql
            .query(&QueryArgs {
                method_name: "get".to_string(),
                associations: Some(associations),
                ..QueryArgs::default()
            })
            .unwrap();
        assert!(document.contains("associations { widgetComponent {"));
    }

    #[test]
    fn validate_result_requires_every_required_reply_field() {
        let registry = widget_registry();
        let graphql = graphql_for(&registry, "widgetEntity");
        let ok = graphql
            .validate_result(
                "list",
                &json!({ "data": { "widgetEntityList": { "items": [{ "id": "widget:1" }] } } }),
                None,
            )
            .unwrap();
        assert_eq!(ok["items"][0]["id"], "widget:1");

        let err = graphql
            .validate_result("list", &json!({ "data": { "widgetEntityList": {} } }), None)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation failed: response incomplete; missing required field items"
        );
    }

    #[test]
    fn variables_objects_carry_per_kind_placeholders() {
        let registry = widget_registry();
        let graphql = graphql_for(&registry, "widgetEntity");
        let variables = graphql.variables_object("create").unwrap();
        assert_eq!(variables["name"], json!(""));
        assert!(variables.get("properties").is_some());
        // Hidden request fields still need placeholders.
        assert_eq!(variables["workspaceId"], json!(""));
        assert_eq!(variables["changeSetId"], json!(""));
    }
}
