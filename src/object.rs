//! Schema object kinds.
//!
//! A [`SchemaObject`] is one declared type: its fields hang off a root
//! object prop and its service methods off a methods prop. The kinds form
//! a ladder, each adding defaults on top of the previous one:
//!
//! * [`base_object`] - bare fields and methods, no infrastructure.
//! * [`system_object`] - adds `id`, `name`, `displayName`, `siStorable`.
//! * [`component_object`] - a `<base>Component` with constraints and
//!   `create` / `pick` methods; migrateable.
//! * [`entity_object`] - a `<base>Entity` with properties, constraints,
//!   `create` / `delete` / `update` methods and a `sync` action; mvcc.
//! * [`entity_event_object`] - a `<base>EntityEvent` recording one action
//!   execution.
//!
//! [`ComponentAndEntityObject`] declares the component, entity, and entity
//! event triple in one shot.

use serde::{Deserialize, Serialize};

use crate::association::AssociationList;
use crate::attr_list::AttrList;
use crate::case::camel_case;
use crate::error::{Error, Result};
use crate::prop::{NumberKind, Prop, PropLookup};

/// Which rung of the object ladder a [`SchemaObject`] sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    BaseObject,
    SystemObject,
    ComponentObject,
    EntityObject,
    EntityEventObject,
}

impl ObjectKind {
    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::BaseObject => "baseObject",
            ObjectKind::SystemObject => "systemObject",
            ObjectKind::ComponentObject => "componentObject",
            ObjectKind::EntityObject => "entityObject",
            ObjectKind::EntityEventObject => "entityEventObject",
        }
    }
}

/// An integration service an entity can be deployed through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationService {
    pub integration_name: String,
    pub integration_service_name: String,
}

/// One declared schema type.
#[derive(Debug, Clone)]
pub struct SchemaObject {
    pub type_name: String,
    pub display_type_name: String,
    pub service_name: String,
    /// For component/entity/entity-event objects, the type name they were
    /// derived from. Empty otherwise.
    pub base_type_name: String,
    pub kind: ObjectKind,
    /// Multi-version concurrency control: rows are change-set addressed.
    pub mvcc: bool,
    /// Migrateable objects get a generated `migrate` call on service start.
    pub migrateable: bool,
    pub natural_key: String,
    pub root_prop: Prop,
    pub methods_prop: Prop,
    pub associations: AssociationList,
    pub integration_services: Vec<IntegrationService>,
}

impl SchemaObject {
    fn new(kind: ObjectKind, type_name: &str, display_type_name: &str, service_name: &str) -> SchemaObject {
        let type_name = camel_case(type_name);
        let service_name = if service_name.is_empty() {
            type_name.clone()
        } else {
            service_name.to_string()
        };
        let root_prop = Prop::new_object(&type_name, display_type_name, "", &type_name);
        let methods_prop = Prop::new_object(
            &type_name,
            &format!("{display_type_name} Methods"),
            "",
            &type_name,
        );
        SchemaObject {
            type_name,
            display_type_name: display_type_name.to_string(),
            service_name,
            base_type_name: String::new(),
            kind,
            mvcc: false,
            migrateable: false,
            natural_key: "name".to_string(),
            root_prop,
            methods_prop,
            associations: AssociationList::new(),
            integration_services: Vec::new(),
        }
    }

    /// The object's fields.
    pub fn fields(&self) -> &AttrList {
        match self.root_prop.properties() {
            Some(props) => props,
            None => unreachable!("root prop is constructed as an object"),
        }
    }

    pub fn fields_mut(&mut self) -> &mut AttrList {
        match self.root_prop.properties_mut() {
            Some(props) => props,
            None => unreachable!("root prop is constructed as an object"),
        }
    }

    /// The object's service methods.
    pub fn methods(&self) -> &AttrList {
        match self.methods_prop.properties() {
            Some(props) => props,
            None => unreachable!("methods prop is constructed as an object"),
        }
    }

    pub fn methods_mut(&mut self) -> &mut AttrList {
        match self.methods_prop.properties_mut() {
            Some(props) => props,
            None => unreachable!("methods prop is constructed as an object"),
        }
    }

    /// The nested constraints of a component object.
    pub fn constraints(&self) -> Result<&AttrList> {
        let prop = self.fields().get_entry("constraints")?;
        prop.properties().ok_or_else(|| {
            Error::InvalidObject(format!(
                "constraints on {} is not an object",
                self.type_name
            ))
        })
    }

    pub fn constraints_mut(&mut self) -> Result<&mut AttrList> {
        let type_name = self.type_name.clone();
        let prop = self.fields_mut().get_entry_mut("constraints")?;
        prop.properties_mut()
            .ok_or_else(|| Error::InvalidObject(format!("constraints on {type_name} is not an object")))
    }

    /// The nested properties of an entity object.
    pub fn properties(&self) -> Result<&AttrList> {
        let prop = self.fields().get_entry("properties")?;
        prop.properties().ok_or_else(|| {
            Error::InvalidObject(format!(
                "properties on {} is not an object",
                self.type_name
            ))
        })
    }

    pub fn properties_mut(&mut self) -> Result<&mut AttrList> {
        let type_name = self.type_name.clone();
        let prop = self.fields_mut().get_entry_mut("properties")?;
        prop.properties_mut()
            .ok_or_else(|| Error::InvalidObject(format!("properties on {type_name} is not an object")))
    }

    /// Add the standard `get` method: fetch one item by id.
    pub fn add_get_method(&mut self) {
        let display = self.display_type_name.clone();
        let type_name = self.type_name.clone();
        self.methods_mut()
            .add_method("get", &format!("Get a {display}"), |p| {
                let Some(m) = p.method_mut() else { return };
                let Some(request) = m.request.properties_mut() else {
                    return;
                };
                request.add_text("id", &format!("{display} ID"), |p| {
                    p.required = true;
                });
                let Some(reply) = m.reply.properties_mut() else { return };
                reply.add_link(
                    "item",
                    &format!("{display} Item"),
                    PropLookup::object(&type_name),
                    |_| {},
                );
            });
    }

    /// Add the standard `list` method: paged query over all items.
    pub fn add_list_method(&mut self) {
        let display = self.display_type_name.clone();
        let type_name = self.type_name.clone();
        self.methods_mut()
            .add_method("list", &format!("List {display}"), |p| {
                p.universal = true;
                let Some(m) = p.method_mut() else { return };
                let Some(request) = m.request.properties_mut() else {
                    return;
                };
                request.add_link("query", "Query", PropLookup::object("dataQuery"), |p| {
                    p.universal = true;
                });
                request.add_number("pageSize", "Page Size", NumberKind::Uint32, |p| {
                    p.universal = true;
                });
                request.add_text("orderBy", "Order By", |p| {
                    p.universal = true;
                });
                request.add_link(
                    "orderByDirection",
                    "Order By Direction",
                    PropLookup::path("dataPageToken", &["orderByDirection"]),
                    |p| {
                        p.universal = true;
                    },
                );
                request.add_text("pageToken", "Page Token", |p| {
                    p.universal = true;
                });
                request.add_text("scopeByTenantId", "Scope By Tenant ID", |p| {
                    p.universal = true;
                });
                let Some(reply) = m.reply.properties_mut() else { return };
                reply.add_link("items", "Items", PropLookup::object(&type_name), |p| {
                    p.universal = true;
                    p.required = true;
                    p.repeated = true;
                });
                reply.add_number("totalCount", "Total Count", NumberKind::Uint32, |p| {
                    p.universal = true;
                });
                reply.add_text("nextPageToken", "Next Page Token", |p| {
                    p.universal = true;
                });
            });
    }

    /// Move edit actions synthesized by an auto-edit properties list onto
    /// the methods list. Called once at registration.
    pub(crate) fn finalize(&mut self) {
        let mut edits = Vec::new();
        if let Ok(prop) = self.fields_mut().get_entry_mut("properties") {
            if let Some(props) = prop.properties_mut() {
                edits = props.take_pending_edits();
            }
        }
        for edit in edits {
            self.methods_mut().add_prop(edit, |_| {});
        }
    }
}

/// Declare a bare object with no infrastructure fields.
pub fn base_object(type_name: &str, display_type_name: &str, service_name: &str) -> SchemaObject {
    SchemaObject::new(ObjectKind::BaseObject, type_name, display_type_name, service_name)
}

/// Declare a stored object with the standard infrastructure fields.
pub fn system_object(type_name: &str, display_type_name: &str, service_name: &str) -> SchemaObject {
    let mut object =
        SchemaObject::new(ObjectKind::SystemObject, type_name, display_type_name, service_name);
    add_system_defaults(&mut object);
    object
}

fn add_system_defaults(object: &mut SchemaObject) {
    let display = object.display_type_name.clone();
    let skip_names = object.type_name.ends_with("EntityEvent");
    let fields = object.fields_mut();
    fields.add_text("id", &format!("{display} ID"), |p| {
        p.universal = true;
        p.read_only = true;
        p.required = true;
    });
    // Entity events are named after their action, not by the caller.
    if !skip_names {
        fields.add_text("name", &format!("{display} Name"), |p| {
            p.universal = true;
            p.read_only = true;
            p.required = true;
        });
        fields.add_text("displayName", &format!("{display} Display Name"), |p| {
            p.universal = true;
            p.read_only = true;
            p.required = true;
        });
    }
    fields.add_link(
        "siStorable",
        "SI Storable",
        PropLookup::object("dataStorable"),
        |p| {
            p.universal = true;
            p.hidden = false;
            p.required = true;
        },
    );
}

/// Declare the `<base>Component` object: the selectable shape of a thing,
/// picked by constraints.
pub fn component_object(base_type_name: &str, display_type_name: &str, service_name: &str) -> SchemaObject {
    let type_name = format!("{base_type_name}Component");
    let display = format!("{display_type_name} Component");
    let mut object = system_object(&type_name, &display, service_name);
    object.kind = ObjectKind::ComponentObject;
    object.base_type_name = base_type_name.to_string();
    object.migrateable = true;

    object.add_get_method();
    object.add_list_method();

    let fields = object.fields_mut();
    fields.add_text("description", "Component Description", |p| {
        p.universal = true;
        p.required = true;
    });
    fields.add_object("constraints", "Component Constraints", |p| {
        p.universal = true;
        p.required = true;
        let Some(props) = p.properties_mut() else { return };
        props.add_text("componentName", "Component Name", |p| {
            p.universal = true;
        });
        props.add_text("componentDisplayName", "Component Display Name", |p| {
            p.universal = true;
        });
    });
    fields.add_link(
        "siProperties",
        "SI Properties",
        PropLookup::object("componentSiProperties"),
        |p| {
            p.universal = true;
            p.required = true;
        },
    );

    let base = base_type_name.to_string();
    object.methods_mut().add_method("create", "Create a Component", |p| {
        p.hidden = true;
        let Some(m) = p.method_mut() else { return };
        m.mutation = true;
        m.is_private = true;
        let Some(request) = m.request.properties_mut() else { return };
        request.add_text("name", "Integration Name", |p| {
            p.required = true;
        });
        request.add_text("displayName", "Integration Display Name", |p| {
            p.required = true;
        });
        request.add_text("description", "Integration Description", |p| {
            p.required = true;
        });
        request.add_link(
            "constraints",
            "Constraints",
            PropLookup::path(&format!("{base}Component"), &["constraints"]),
            |p| {
                p.universal = true;
            },
        );
        request.add_link(
            "siProperties",
            "Si Properties",
            PropLookup::object("componentSiProperties"),
            |p| {
                p.required = true;
            },
        );
        let Some(reply) = m.reply.properties_mut() else { return };
        reply.add_link(
            "item",
            &format!("{base}Component Item"),
            PropLookup::object(format!("{base}Component")),
            |p| {
                p.universal = true;
                p.read_only = true;
            },
        );
    });

    let base = base_type_name.to_string();
    object.methods_mut().add_method("pick", "Pick Component", |p| {
        let Some(m) = p.method_mut() else { return };
        let Some(request) = m.request.properties_mut() else { return };
        request.add_link(
            "constraints",
            "Constraints",
            PropLookup::path(&format!("{base}Component"), &["constraints"]),
            |p| {
                p.universal = true;
            },
        );
        let Some(reply) = m.reply.properties_mut() else { return };
        reply.add_link(
            "implicitConstraints",
            "Implicit Constraints",
            PropLookup::path(&format!("{base}Component"), &["constraints"]),
            |p| {
                p.universal = true;
                p.required = true;
            },
        );
        reply.add_link(
            "component",
            "Chosen Component",
            PropLookup::object(format!("{base}Component")),
            |p| {
                p.universal = true;
            },
        );
    });

    object
}

/// Declare the `<base>Entity` object: a live instance with editable
/// properties, addressed through change sets.
pub fn entity_object(base_type_name: &str, display_type_name: &str, service_name: &str) -> SchemaObject {
    let type_name = format!("{base_type_name}Entity");
    let display = format!("{display_type_name} Entity");
    let mut object = system_object(&type_name, &display, service_name);
    object.kind = ObjectKind::EntityObject;
    object.base_type_name = base_type_name.to_string();
    object.mvcc = true;

    object.add_get_method();
    object.add_list_method();

    let base = base_type_name.to_string();
    let fields = object.fields_mut();
    fields.add_text("description", "Entity Description", |p| {
        p.universal = true;
        p.required = true;
    });
    fields.add_link(
        "siProperties",
        "SI Properties",
        PropLookup::object("entitySiProperties"),
        |p| {
            p.universal = true;
            p.required = true;
        },
    );
    fields.add_object("properties", "Properties", |p| {
        p.universal = true;
        p.required = true;
    });
    fields.add_link(
        "constraints",
        "Constraints",
        PropLookup::path(&format!("{base}Component"), &["constraints"]),
        |p| {
            p.universal = true;
            p.read_only = true;
        },
    );
    fields.add_link(
        "implicitConstraints",
        "Implicit Constraints",
        PropLookup::path(&format!("{base}Component"), &["constraints"]),
        |p| {
            p.universal = true;
            p.read_only = true;
        },
    );

    let base = base_type_name.to_string();
    object.methods_mut().add_method("create", "Create Entity", |p| {
        let Some(m) = p.method_mut() else { return };
        m.mutation = true;
        let Some(request) = m.request.properties_mut() else { return };
        request.add_text("name", "Name", |p| {
            p.required = true;
            p.universal = true;
        });
        request.add_text("displayName", "Display Name", |p| {
            p.required = true;
            p.universal = true;
        });
        request.add_text("description", "Description", |p| {
            p.required = true;
            p.universal = true;
        });
        request.add_text("workspaceId", "Workspace ID", |p| {
            p.required = true;
            p.hidden = true;
        });
        request.add_text("changeSetId", "Change Set ID", |p| {
            p.required = true;
            p.hidden = true;
        });
        request.add_link(
            "properties",
            "Properties",
            PropLookup::path(&format!("{base}Entity"), &["properties"]),
            |p| {
                p.universal = true;
                p.read_only = true;
                p.required = false;
            },
        );
        request.add_link(
            "constraints",
            "Constraints",
            PropLookup::path(&format!("{base}Component"), &["constraints"]),
            |p| {
                p.universal = true;
                p.read_only = true;
            },
        );
        let Some(reply) = m.reply.properties_mut() else { return };
        reply.add_link(
            "item",
            &format!("{base}Entity Item"),
            PropLookup::object(format!("{base}Entity")),
            |p| {
                p.universal = true;
                p.read_only = true;
            },
        );
    });

    let base = base_type_name.to_string();
    object.methods_mut().add_method("delete", "Delete Entity", |p| {
        let Some(m) = p.method_mut() else { return };
        m.mutation = true;
        let Some(request) = m.request.properties_mut() else { return };
        request.add_text("id", &format!("{base}Entity ID"), |p| {
            p.required = true;
        });
        request.add_text("changeSetId", "Change Set ID", |p| {
            p.required = true;
            p.hidden = true;
        });
        let Some(reply) = m.reply.properties_mut() else { return };
        reply.add_link(
            "item",
            &format!("{base} Item"),
            PropLookup::object(format!("{base}Entity")),
            |_| {},
        );
    });

    let base = base_type_name.to_string();
    object.methods_mut().add_method("update", "Update an Entity", |p| {
        let Some(m) = p.method_mut() else { return };
        m.mutation = true;
        let Some(request) = m.request.properties_mut() else { return };
        request.add_text("id", &format!("{base}Entity ID"), |p| {
            p.required = true;
        });
        request.add_text("changeSetId", "Change Set ID", |p| {
            p.required = true;
            p.hidden = true;
        });
        let update_base = base.clone();
        request.add_object("update", &format!("{base} Item Update"), move |p| {
            let Some(props) = p.properties_mut() else { return };
            props.add_link(
                "name",
                "name",
                PropLookup::path(&format!("{update_base}Entity"), &["name"]),
                |p| {
                    p.required = false;
                },
            );
            props.add_link(
                "description",
                "description",
                PropLookup::path(&format!("{update_base}Entity"), &["description"]),
                |p| {
                    p.required = false;
                },
            );
            props.add_link(
                "properties",
                "properties",
                PropLookup::path(&format!("{update_base}Entity"), &["properties"]),
                |p| {
                    p.required = false;
                },
            );
        });
        let Some(reply) = m.reply.properties_mut() else { return };
        reply.add_link(
            "item",
            &format!("{base} Item"),
            PropLookup::object(format!("{base}Entity")),
            |_| {},
        );
    });

    object.methods_mut().add_action("sync", "Sync State", |p| {
        p.universal = true;
        let Some(m) = p.method_mut() else { return };
        m.mutation = true;
    });

    object
}

/// Declare the `<base>EntityEvent` object: the record of one action
/// executed against an entity.
pub fn entity_event_object(base_type_name: &str, display_type_name: &str, service_name: &str) -> SchemaObject {
    let type_name = format!("{base_type_name}EntityEvent");
    let display = format!("{display_type_name} EntityEvent");
    let mut object = system_object(&type_name, &display, service_name);
    object.kind = ObjectKind::EntityEventObject;
    object.base_type_name = base_type_name.to_string();

    let base = base_type_name.to_string();
    let fields = object.fields_mut();
    fields.add_text("actionName", "Action Name", |p| {
        p.universal = true;
        p.required = true;
        p.read_only = true;
    });
    fields.add_text("createTime", "Creation Time", |p| {
        p.universal = true;
        p.read_only = true;
    });
    fields.add_text("updatedTime", "Updated Time", |p| {
        p.universal = true;
        p.read_only = true;
    });
    fields.add_text("finalTime", "Final Time", |p| {
        p.universal = true;
        p.read_only = true;
    });
    fields.add_bool("success", "success", |p| {
        p.universal = true;
        p.read_only = true;
    });
    fields.add_bool("finalized", "Finalized", |p| {
        p.universal = true;
        p.read_only = true;
    });
    fields.add_text("userId", "User ID", |p| {
        p.universal = true;
        p.read_only = true;
    });
    fields.add_text("outputLines", "Output Lines", |p| {
        p.repeated = true;
        p.universal = true;
    });
    fields.add_text("errorLines", "Error Lines", |p| {
        p.repeated = true;
        p.universal = true;
    });
    fields.add_text("errorMessage", "Error Message", |p| {
        p.universal = true;
    });
    fields.add_link(
        "previousEntity",
        "Previous Entity",
        PropLookup::object(format!("{base}Entity")),
        |p| {
            p.universal = true;
            p.hidden = true;
        },
    );
    fields.add_link(
        "inputEntity",
        "Input Entity",
        PropLookup::object(format!("{base}Entity")),
        |p| {
            p.universal = true;
            p.required = true;
            p.hidden = true;
        },
    );
    fields.add_link(
        "outputEntity",
        "Output Entity",
        PropLookup::object(format!("{base}Entity")),
        |p| {
            p.universal = true;
            p.hidden = true;
        },
    );
    fields.add_link(
        "siProperties",
        "SI Properties",
        PropLookup::object("entityEventSiProperties"),
        |p| {
            p.universal = true;
            p.hidden = true;
        },
    );

    object.add_list_method();

    object
}

/// The component/entity/entity-event triple for one base type.
#[derive(Debug, Clone)]
pub struct ComponentAndEntityObject {
    pub component: SchemaObject,
    pub entity: SchemaObject,
    pub entity_event: SchemaObject,
}

impl ComponentAndEntityObject {
    pub fn new(type_name: &str, display_type_name: &str, service_name: &str) -> ComponentAndEntityObject {
        ComponentAndEntityObject {
            component: component_object(type_name, display_type_name, service_name),
            entity: entity_object(type_name, display_type_name, service_name),
            entity_event: entity_event_object(type_name, display_type_name, service_name),
        }
    }

    /// The entity's properties bag, in auto-edit mode: every prop added
    /// here also gets a matching `<name>Edit` action.
    pub fn properties_mut(&mut self) -> Result<&mut AttrList> {
        let props = self.entity.properties_mut()?;
        props.auto_create_edits = true;
        Ok(props)
    }

    /// The component's constraints bag.
    pub fn constraints_mut(&mut self) -> Result<&mut AttrList> {
        self.component.constraints_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prop::PropKind;

    #[test]
    fn system_objects_get_infrastructure_fields() {
        let object = system_object("billingAccount", "Billing Account", "account");
        let names: Vec<&str> = object.fields().entries().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "displayName", "siStorable"]);
        assert_eq!(object.natural_key, "name");
        let storable = object.fields().get_entry("siStorable").unwrap();
        assert_eq!(storable.lookup().unwrap().type_name, "dataStorable");
    }

    #[test]
    fn service_name_falls_back_to_the_type_name() {
        let object = base_object("dataStorable", "Data Storable", "");
        assert_eq!(object.service_name, "dataStorable");
    }

    #[test]
    fn component_objects_are_migrateable_and_carry_constraints() {
        let object = component_object("widget", "Widget", "widget");
        assert_eq!(object.type_name, "widgetComponent");
        assert_eq!(object.kind, ObjectKind::ComponentObject);
        assert!(object.migrateable);
        let constraints = object.constraints().unwrap();
        assert!(constraints.get_entry("componentName").is_ok());
        assert!(constraints.get_entry("componentDisplayName").is_ok());
        let method_names: Vec<&str> =
            object.methods().entries().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(method_names, ["get", "list", "create", "pick"]);
    }

    #[test]
    fn entity_objects_are_mvcc_with_lifecycle_methods() {
        let object = entity_object("widget", "Widget", "widget");
        assert_eq!(object.type_name, "widgetEntity");
        assert!(object.mvcc);
        assert!(!object.migrateable);
        let method_names: Vec<&str> =
            object.methods().entries().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(method_names, ["get", "list", "create", "delete", "update", "sync"]);
        let sync = object.methods().get_entry("sync").unwrap();
        assert!(matches!(sync.kind, PropKind::Action(_)));
        let constraints = object.fields().get_entry("constraints").unwrap();
        assert_eq!(
            constraints.lookup().unwrap(),
            &PropLookup::path("widgetComponent", &["constraints"])
        );
    }

    #[test]
    fn entity_events_skip_the_name_fields() {
        let object = entity_event_object("widget", "Widget", "widget");
        assert_eq!(object.type_name, "widgetEntityEvent");
        assert!(object.fields().get_entry("name").is_err());
        assert!(object.fields().get_entry("displayName").is_err());
        assert!(object.fields().get_entry("actionName").is_ok());
        let input = object.fields().get_entry("inputEntity").unwrap();
        assert!(input.required);
        assert_eq!(input.lookup().unwrap().type_name, "widgetEntity");
    }

    #[test]
    fn triple_properties_are_in_auto_edit_mode() {
        let mut triple = ComponentAndEntityObject::new("widget", "Widget", "widget");
        triple
            .properties_mut()
            .unwrap()
            .add_text("image", "Image", |_| {});
        let mut entity = triple.entity;
        entity.finalize();
        let edit = entity.methods().get_entry("imageEdit").unwrap();
        assert!(matches!(edit.kind, PropKind::Action(_)));
        let data = edit.method().unwrap();
        let property = data
            .request
            .properties()
            .unwrap()
            .get_entry("property")
            .unwrap();
        assert_eq!(
            property.lookup().unwrap(),
            &PropLookup::path("widgetEntity", &["properties", "image"])
        );
    }
}
