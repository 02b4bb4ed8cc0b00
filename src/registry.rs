//! The schema object registry.
//!
//! A [`Registry`] owns every declared [`SchemaObject`] and is the single
//! context backends resolve links through. Objects enter via the factory
//! methods ([`Registry::base`], [`Registry::system`],
//! [`Registry::component_and_entity`], ...), each of which constructs the
//! object with its kind defaults, hands it to the caller's options closure,
//! finalizes it, and registers it. Duplicate type names are rejected.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::object::{
    ComponentAndEntityObject, SchemaObject, base_object, component_object, entity_event_object,
    entity_object, system_object,
};
use crate::prop::{NumberKind, Prop, PropLookup};

/// Every registered schema object, in declaration order.
#[derive(Debug, Default)]
pub struct Registry {
    objects: Vec<SchemaObject>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    pub fn objects(&self) -> &[SchemaObject] {
        &self.objects
    }

    /// Fetch a registered object by type name.
    pub fn get(&self, type_name: &str) -> Result<&SchemaObject> {
        self.objects
            .iter()
            .find(|o| o.type_name == type_name)
            .ok_or_else(|| Error::ObjectNotFound {
                type_name: type_name.to_string(),
                available: self
                    .objects
                    .iter()
                    .map(|o| o.type_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// All service names with at least one registered object, sorted.
    pub fn service_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self.objects.iter().map(|o| o.service_name.as_str()).collect();
        names.into_iter().map(str::to_string).collect()
    }

    /// Objects belonging to one service, in declaration order.
    pub fn objects_for_service(&self, service_name: &str) -> Vec<&SchemaObject> {
        self.objects
            .iter()
            .filter(|o| o.service_name == service_name)
            .collect()
    }

    /// Resolve a [`PropLookup`] to the prop it addresses.
    ///
    /// With no names the lookup addresses the object's root prop.
    /// Otherwise each name steps through a nested object's properties;
    /// stepping through anything that is not an object is an error.
    pub fn lookup_prop(&self, lookup: &PropLookup) -> Result<&Prop> {
        let object = self.get(&lookup.type_name)?;
        let Some(names) = &lookup.names else {
            return Ok(&object.root_prop);
        };
        let mut current = &object.root_prop;
        for name in names {
            let properties = current.properties().ok_or_else(|| {
                Error::PropLookup(format!(
                    "cannot look up '{name}' on non-object prop '{current_name}' of {type_name}",
                    current_name = current.name,
                    type_name = lookup.type_name,
                ))
            })?;
            current = properties.get_entry(name)?;
        }
        Ok(current)
    }

    fn register(&mut self, mut object: SchemaObject) -> Result<()> {
        if self.objects.iter().any(|o| o.type_name == object.type_name) {
            return Err(Error::DuplicateObject {
                type_name: object.type_name.clone(),
            });
        }
        object.finalize();
        self.objects.push(object);
        Ok(())
    }

    /// Declare and register a bare object.
    pub fn base(
        &mut self,
        type_name: &str,
        display_type_name: &str,
        service_name: &str,
        options: impl FnOnce(&mut SchemaObject) -> Result<()>,
    ) -> Result<()> {
        let mut object = base_object(type_name, display_type_name, service_name);
        options(&mut object)?;
        self.register(object)
    }

    /// Declare and register a stored system object.
    pub fn system(
        &mut self,
        type_name: &str,
        display_type_name: &str,
        service_name: &str,
        options: impl FnOnce(&mut SchemaObject) -> Result<()>,
    ) -> Result<()> {
        let mut object = system_object(type_name, display_type_name, service_name);
        options(&mut object)?;
        self.register(object)
    }

    /// Declare and register a `<base>Component` object.
    pub fn component(
        &mut self,
        type_name: &str,
        display_type_name: &str,
        service_name: &str,
        options: impl FnOnce(&mut SchemaObject) -> Result<()>,
    ) -> Result<()> {
        let mut object = component_object(type_name, display_type_name, service_name);
        options(&mut object)?;
        self.register(object)
    }

    /// Declare and register a `<base>Entity` object.
    pub fn entity(
        &mut self,
        type_name: &str,
        display_type_name: &str,
        service_name: &str,
        options: impl FnOnce(&mut SchemaObject) -> Result<()>,
    ) -> Result<()> {
        let mut object = entity_object(type_name, display_type_name, service_name);
        options(&mut object)?;
        self.register(object)
    }

    /// Declare and register a `<base>EntityEvent` object.
    pub fn entity_event(
        &mut self,
        type_name: &str,
        display_type_name: &str,
        service_name: &str,
        options: impl FnOnce(&mut SchemaObject) -> Result<()>,
    ) -> Result<()> {
        let mut object = entity_event_object(type_name, display_type_name, service_name);
        options(&mut object)?;
        self.register(object)
    }

    /// Declare and register the component/entity/entity-event triple for
    /// one base type.
    pub fn component_and_entity(
        &mut self,
        type_name: &str,
        display_type_name: &str,
        service_name: &str,
        options: impl FnOnce(&mut ComponentAndEntityObject) -> Result<()>,
    ) -> Result<()> {
        let mut triple = ComponentAndEntityObject::new(type_name, display_type_name, service_name);
        options(&mut triple)?;
        self.register(triple.component)?;
        self.register(triple.entity)?;
        self.register(triple.entity_event)
    }
}

/// Build a registry pre-loaded with the shared protocol objects every
/// service links against: storable metadata, the query shape, paging, and
/// the per-kind si property bags.
pub fn default_registry() -> Result<Registry> {
    let mut registry = Registry::new();

    registry.base("dataStorable", "Storable Object Metadata", "data", |o| {
        let fields = o.fields_mut();
        fields.add_text("typeName", "Type Name", |p| {
            p.universal = true;
        });
        fields.add_text("objectId", "Object ID", |p| {
            p.universal = true;
        });
        fields.add_text("billingAccountId", "Billing Account ID", |p| {
            p.universal = true;
        });
        fields.add_text("organizationId", "Organization ID", |p| {
            p.universal = true;
        });
        fields.add_text("workspaceId", "Workspace ID", |p| {
            p.universal = true;
        });
        fields.add_text("tenantIds", "Tenant IDs", |p| {
            p.universal = true;
            p.repeated = true;
        });
        fields.add_text("naturalKey", "Natural Key", |p| {
            p.universal = true;
        });
        fields.add_bool("deleted", "Deleted", |p| {
            p.universal = true;
        });
        Ok(())
    })?;

    registry.base("dataQuery", "Query", "data", |o| {
        let fields = o.fields_mut();
        fields.add_enum("booleanTerm", "Boolean Term", &["and", "or"], |p| {
            p.universal = true;
        });
        fields.add_bool("isNot", "Is Not", |p| {
            p.universal = true;
        });
        fields.add_object("items", "Query Items", |p| {
            p.universal = true;
            p.repeated = true;
            let Some(props) = p.properties_mut() else { return };
            props.add_text("field", "Field", |p| {
                p.universal = true;
                p.required = true;
            });
            props.add_text("value", "Value", |p| {
                p.universal = true;
                p.required = true;
            });
            props.add_enum(
                "comparison",
                "Comparison",
                &["equals", "notEquals", "contains", "like", "notLike"],
                |p| {
                    p.universal = true;
                },
            );
            props.add_enum("fieldType", "Field Type", &["string", "int"], |p| {
                p.universal = true;
            });
        });
        Ok(())
    })?;

    registry.base("dataPageToken", "Page Token", "data", |o| {
        let fields = o.fields_mut();
        fields.add_link("query", "Query", PropLookup::object("dataQuery"), |p| {
            p.universal = true;
        });
        fields.add_number("pageSize", "Page Size", NumberKind::Uint32, |p| {
            p.universal = true;
        });
        fields.add_text("orderBy", "Order By", |p| {
            p.universal = true;
        });
        fields.add_enum(
            "orderByDirection",
            "Order By Direction",
            &["asc", "desc"],
            |p| {
                p.universal = true;
            },
        );
        fields.add_text("itemId", "Item ID", |p| {
            p.universal = true;
        });
        fields.add_text("containedWithin", "Contained Within", |p| {
            p.universal = true;
        });
        Ok(())
    })?;

    registry.base(
        "componentSiProperties",
        "Component SI Properties",
        "data",
        |o| {
            let fields = o.fields_mut();
            fields.add_text("integrationId", "Integration ID", |p| {
                p.universal = true;
                p.required = true;
                p.reference = true;
            });
            fields.add_text("integrationServiceId", "Integration Service ID", |p| {
                p.universal = true;
                p.required = true;
                p.reference = true;
            });
            fields.add_number("version", "Version", NumberKind::Int32, |p| {
                p.universal = true;
            });
            Ok(())
        },
    )?;

    registry.base("entitySiProperties", "Entity SI Properties", "data", |o| {
        let fields = o.fields_mut();
        fields.add_text("billingAccountId", "Billing Account ID", |p| {
            p.universal = true;
        });
        fields.add_text("organizationId", "Organization ID", |p| {
            p.universal = true;
        });
        fields.add_text("workspaceId", "Workspace ID", |p| {
            p.universal = true;
        });
        fields.add_text("integrationId", "Integration ID", |p| {
            p.universal = true;
        });
        fields.add_text("integrationServiceId", "Integration Service ID", |p| {
            p.universal = true;
        });
        fields.add_text("componentId", "Component ID", |p| {
            p.universal = true;
        });
        fields.add_number("version", "Version", NumberKind::Int32, |p| {
            p.universal = true;
        });
        Ok(())
    })?;

    registry.base(
        "entityEventSiProperties",
        "Entity Event SI Properties",
        "data",
        |o| {
            let fields = o.fields_mut();
            fields.add_text("billingAccountId", "Billing Account ID", |p| {
                p.universal = true;
            });
            fields.add_text("organizationId", "Organization ID", |p| {
                p.universal = true;
            });
            fields.add_text("workspaceId", "Workspace ID", |p| {
                p.universal = true;
            });
            fields.add_text("integrationId", "Integration ID", |p| {
                p.universal = true;
            });
            fields.add_text("integrationServiceId", "Integration Service ID", |p| {
                p.universal = true;
            });
            fields.add_text("componentId", "Component ID", |p| {
                p.universal = true;
            });
            fields.add_text("entityId", "Entity ID", |p| {
                p.universal = true;
            });
            Ok(())
        },
    )?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_reports_the_available_objects() {
        let mut registry = Registry::new();
        registry.base("widget", "Widget", "widget", |_| Ok(())).unwrap();
        let err = registry.get("gizmo").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot get object named 'gizmo' in the registry (available: widget)"
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = Registry::new();
        registry.base("widget", "Widget", "widget", |_| Ok(())).unwrap();
        let err = registry
            .base("widget", "Widget", "widget", |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateObject { .. }));
    }

    #[test]
    fn lookup_prop_without_names_returns_the_root_prop() {
        let registry = default_registry().unwrap();
        let root = registry
            .lookup_prop(&PropLookup::object("dataQuery"))
            .unwrap();
        assert_eq!(root.name, "dataQuery");
        assert!(root.is_object());
    }

    #[test]
    fn lookup_prop_walks_dotted_paths() {
        let registry = default_registry().unwrap();
        let prop = registry
            .lookup_prop(&PropLookup::path("dataQuery", &["items", "field"]))
            .unwrap();
        assert_eq!(prop.name, "field");
        assert!(prop.required);
    }

    #[test]
    fn lookup_prop_rejects_paths_through_scalars() {
        let registry = default_registry().unwrap();
        let err = registry
            .lookup_prop(&PropLookup::path("dataQuery", &["isNot", "field"]))
            .unwrap_err();
        assert!(matches!(err, Error::PropLookup(_)));
    }

    #[test]
    fn component_and_entity_registers_the_triple() {
        let mut registry = default_registry().unwrap();
        registry
            .component_and_entity("widget", "Widget", "widget", |t| {
                t.properties_mut()?.add_text("image", "Image", |_| {});
                Ok(())
            })
            .unwrap();
        assert!(registry.get("widgetComponent").is_ok());
        assert!(registry.get("widgetEntity").is_ok());
        assert!(registry.get("widgetEntityEvent").is_ok());
        // finalization moved the edit action onto the entity's methods
        let entity = registry.get("widgetEntity").unwrap();
        assert!(entity.methods().get_entry("imageEdit").is_ok());
    }

    #[test]
    fn service_names_are_sorted_and_deduplicated() {
        let mut registry = default_registry().unwrap();
        registry
            .component_and_entity("widget", "Widget", "widget", |_| Ok(()))
            .unwrap();
        assert_eq!(registry.service_names(), ["data", "widget"]);
    }
}
