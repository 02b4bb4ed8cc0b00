//! The property model.
//!
//! Every field, method, and nested shape in a schema object is a [`Prop`].
//! A prop carries the attributes shared by every kind (name, label,
//! visibility flags, ownership) plus a [`PropKind`] payload with the
//! kind-specific data. Backends dispatch on the kind with exhaustive
//! matches, so adding a kind forces every backend to account for it.
//!
//! # Kind Table
//!
//! | Kind | Payload | Notes |
//! |------|---------|-------|
//! | `Text`, `Password`, `Bool`, `Map` | none | scalars |
//! | `Number` | [`NumberKind`] | width and signedness |
//! | `Code` | language, parsed | parsed TOML decodes via [`Prop::real_value`] |
//! | `Select` | options | label/value pairs for UI menus |
//! | `Enum` | variants | closed string set |
//! | `Link` | [`PropLookup`] | reference to a prop on another object |
//! | `Object` | [`AttrList`] | nested property bag |
//! | `Method`, `Action` | request/reply objects | service operations |

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::attr_list::AttrList;
use crate::case::pascal_case;
use crate::error::{Error, Result};

/// Width and signedness of a number prop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Int32,
    Uint32,
    Int64,
    Uint64,
    U128,
}

/// Address of a prop on a registered object.
///
/// `names` is a dotted path below the object's root prop; `None` addresses
/// the root prop itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropLookup {
    pub type_name: String,
    pub names: Option<Vec<String>>,
}

impl PropLookup {
    /// Address the root prop of `type_name`.
    pub fn object(type_name: impl Into<String>) -> PropLookup {
        PropLookup {
            type_name: type_name.into(),
            names: None,
        }
    }

    /// Address a prop at a dotted path below the root of `type_name`.
    pub fn path(type_name: impl Into<String>, names: &[&str]) -> PropLookup {
        PropLookup {
            type_name: type_name.into(),
            names: Some(names.iter().map(|n| (*n).to_string()).collect()),
        }
    }
}

/// A relationship edge from one prop to a partner prop elsewhere.
#[derive(Debug, Clone)]
pub enum Relationship {
    /// Changing this prop updates the partner.
    Updates { partner: PropLookup },
    /// Either this prop or the partner may be set, not both.
    Either { partner: PropLookup },
}

impl Relationship {
    pub fn partner(&self) -> &PropLookup {
        match self {
            Relationship::Updates { partner } => partner,
            Relationship::Either { partner } => partner,
        }
    }
}

/// One option in a select menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// Payload of an object prop: a nested property bag.
#[derive(Debug, Clone)]
pub struct ObjectData {
    pub properties: AttrList,
}

/// Payload of a method or action prop.
///
/// `request` and `reply` are always object props named
/// `<Name>Request` / `<Name>Reply`.
#[derive(Debug, Clone)]
pub struct MethodData {
    pub request: Box<Prop>,
    pub reply: Box<Prop>,
    pub mutation: bool,
    pub skip_auth: bool,
    pub is_private: bool,
}

/// Kind-specific payload of a [`Prop`].
#[derive(Debug, Clone)]
pub enum PropKind {
    Text,
    Password,
    Bool,
    Map,
    Number { number_kind: NumberKind },
    Code { language: String, parsed: bool },
    Select { options: Vec<SelectOption> },
    Enum { variants: Vec<String> },
    Link { lookup: PropLookup },
    Object(ObjectData),
    Method(MethodData),
    Action(MethodData),
}

/// A single schema property.
#[derive(Debug, Clone)]
pub struct Prop {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub repeated: bool,
    /// Universal props are shared infrastructure fields; they number from a
    /// separate partition in protobuf output.
    pub universal: bool,
    pub read_only: bool,
    /// Hidden props are skipped by the GraphQL backend.
    pub hidden: bool,
    /// Skipped props are omitted from all rendered field lists.
    pub skip: bool,
    /// Reference props borrow in generated Rust signatures.
    pub reference: bool,
    /// Pascal-cased name of the enclosing container, used to build
    /// fully-qualified type names.
    pub parent_name: String,
    /// Type name of the schema object this prop ultimately belongs to.
    pub component_type_name: String,
    pub relationships: Vec<Relationship>,
    pub kind: PropKind,
}

impl Prop {
    pub(crate) fn base(name: impl Into<String>, label: impl Into<String>, kind: PropKind) -> Prop {
        Prop {
            name: name.into(),
            label: label.into(),
            required: false,
            repeated: false,
            universal: false,
            read_only: false,
            hidden: false,
            skip: false,
            reference: false,
            parent_name: String::new(),
            component_type_name: String::new(),
            relationships: Vec::new(),
            kind,
        }
    }

    /// Construct an object prop whose nested attribute list is parented
    /// under `<Pascal(parent_name)><Pascal(name)>`.
    pub(crate) fn new_object(
        name: &str,
        label: &str,
        parent_name: &str,
        component_type_name: &str,
    ) -> Prop {
        let list_parent = format!("{}{}", pascal_case(parent_name), pascal_case(name));
        let mut prop = Prop::base(
            name,
            label,
            PropKind::Object(ObjectData {
                properties: AttrList::new(&list_parent, component_type_name),
            }),
        );
        prop.parent_name = parent_name.to_string();
        prop.component_type_name = component_type_name.to_string();
        prop
    }

    /// Construct a method prop with empty `<Name>Request` / `<Name>Reply`
    /// object props.
    pub(crate) fn new_method(
        name: &str,
        label: &str,
        parent_name: &str,
        component_type_name: &str,
    ) -> Prop {
        let request = Prop::new_object(
            &format!("{}Request", pascal_case(name)),
            &format!("{label} Request"),
            parent_name,
            component_type_name,
        );
        let reply = Prop::new_object(
            &format!("{}Reply", pascal_case(name)),
            &format!("{label} Reply"),
            parent_name,
            component_type_name,
        );
        let mut prop = Prop::base(
            name,
            label,
            PropKind::Method(MethodData {
                request: Box::new(request),
                reply: Box::new(reply),
                mutation: false,
                skip_auth: false,
                is_private: false,
            }),
        );
        prop.parent_name = parent_name.to_string();
        prop.component_type_name = component_type_name.to_string();
        prop
    }

    /// Construct an action prop.
    ///
    /// Actions are methods executed against a live entity: the request is
    /// pre-populated with the target `entityId` and the reply with an
    /// `entityEvent` link to `<componentTypeName>Event`.
    pub(crate) fn new_action(
        name: &str,
        label: &str,
        parent_name: &str,
        component_type_name: &str,
    ) -> Prop {
        let mut prop = Prop::new_method(name, label, parent_name, component_type_name);
        let mut data = match prop.kind {
            PropKind::Method(data) => data,
            _ => unreachable!("new_method always produces a method"),
        };
        if let Some(request) = data.request.properties_mut() {
            request.add_text("entityId", "Entity ID", |p| {
                p.universal = true;
                p.required = true;
            });
        }
        if let Some(reply) = data.reply.properties_mut() {
            let event_lookup = PropLookup::object(format!("{component_type_name}Event"));
            reply.add_link("entityEvent", "Entity Event", event_lookup, |p| {
                p.universal = true;
                p.read_only = true;
            });
        }
        prop.kind = PropKind::Action(data);
        prop
    }

    /// Short name of the kind, for error messages and dispatch tables.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            PropKind::Text => "text",
            PropKind::Password => "password",
            PropKind::Bool => "bool",
            PropKind::Map => "map",
            PropKind::Number { .. } => "number",
            PropKind::Code { .. } => "code",
            PropKind::Select { .. } => "select",
            PropKind::Enum { .. } => "enum",
            PropKind::Link { .. } => "link",
            PropKind::Object(_) => "object",
            PropKind::Method(_) => "method",
            PropKind::Action(_) => "action",
        }
    }

    /// Widget a form editor renders for this prop.
    ///
    /// Repeated props always render as an array editor, whatever their kind.
    pub fn widget_name(&self) -> &'static str {
        if self.repeated {
            return "array";
        }
        match &self.kind {
            PropKind::Text => "text",
            PropKind::Password => "password",
            PropKind::Bool => "checkbox",
            PropKind::Map => "map",
            PropKind::Number { .. } => "number",
            PropKind::Code { .. } => "textArea",
            PropKind::Select { .. } | PropKind::Enum { .. } => "select",
            PropKind::Object(_) => "header",
            PropKind::Link { .. } | PropKind::Method(_) | PropKind::Action(_) => "unknown",
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, PropKind::Object(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, PropKind::Enum { .. })
    }

    pub fn is_link(&self) -> bool {
        matches!(self.kind, PropKind::Link { .. })
    }

    pub fn is_method_or_action(&self) -> bool {
        matches!(self.kind, PropKind::Method(_) | PropKind::Action(_))
    }

    /// Nested properties, when this prop is an object.
    pub fn properties(&self) -> Option<&AttrList> {
        match &self.kind {
            PropKind::Object(data) => Some(&data.properties),
            _ => None,
        }
    }

    pub fn properties_mut(&mut self) -> Option<&mut AttrList> {
        match &mut self.kind {
            PropKind::Object(data) => Some(&mut data.properties),
            _ => None,
        }
    }

    /// Method payload, when this prop is a method or action.
    pub fn method(&self) -> Option<&MethodData> {
        match &self.kind {
            PropKind::Method(data) | PropKind::Action(data) => Some(data),
            _ => None,
        }
    }

    pub fn method_mut(&mut self) -> Option<&mut MethodData> {
        match &mut self.kind {
            PropKind::Method(data) | PropKind::Action(data) => Some(data),
            _ => None,
        }
    }

    /// Link lookup, when this prop is a link.
    pub fn lookup(&self) -> Option<&PropLookup> {
        match &self.kind {
            PropKind::Link { lookup } => Some(lookup),
            _ => None,
        }
    }

    /// The placeholder value a UI form starts from.
    ///
    /// Repeated props always start as an empty list, whatever their kind.
    pub fn default_value(&self) -> Value {
        if self.repeated {
            return json!([]);
        }
        match &self.kind {
            PropKind::Text
            | PropKind::Password
            | PropKind::Code { .. }
            | PropKind::Select { .. }
            | PropKind::Enum { .. } => json!(""),
            PropKind::Bool => json!(false),
            PropKind::Number { .. } => json!(0),
            PropKind::Map => json!({}),
            PropKind::Link { .. } => Value::Null,
            PropKind::Object(data) => data.properties.create_value_object(),
            PropKind::Method(_) | PropKind::Action(_) => Value::Null,
        }
    }

    /// Decode a raw string value according to the prop's kind.
    ///
    /// Parsed TOML code props decode to structured JSON; everything else
    /// passes through as a string. A parsed prop in a language the decoder
    /// does not handle is an error rather than a silent pass-through.
    pub fn real_value(&self, value: &str) -> Result<Value> {
        match &self.kind {
            PropKind::Code { language, parsed } if *parsed => {
                if language != "toml" {
                    return Err(Error::Unsupported {
                        type_name: self.component_type_name.clone(),
                        prop: self.name.clone(),
                        kind: format!("parsed {language} code"),
                    });
                }
                let decoded: toml::Value = toml::from_str(value)?;
                Ok(serde_json::to_value(decoded)?)
            }
            _ => Ok(Value::String(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_request_and_reply_are_named_after_the_method() {
        let method = Prop::new_method("create", "Create", "WidgetEntity", "widgetEntity");
        let data = method.method().unwrap();
        assert_eq!(data.request.name, "CreateRequest");
        assert_eq!(data.reply.name, "CreateReply");
        assert_eq!(data.request.parent_name, "WidgetEntity");
    }

    #[test]
    fn action_prepopulates_entity_id_and_entity_event() {
        let action = Prop::new_action("deploy", "Deploy", "WidgetEntity", "widgetEntity");
        let data = action.method().unwrap();
        let entity_id = data
            .request
            .properties()
            .unwrap()
            .get_entry("entityId")
            .unwrap();
        assert!(entity_id.required);
        assert!(entity_id.universal);
        let event = data
            .reply
            .properties()
            .unwrap()
            .get_entry("entityEvent")
            .unwrap();
        assert_eq!(event.lookup().unwrap().type_name, "widgetEntityEvent");
    }

    #[test]
    fn widget_names_follow_the_prop_kind() {
        let text = Prop::base("name", "Name", PropKind::Text);
        assert_eq!(text.widget_name(), "text");
        let flag = Prop::base("enabled", "Enabled", PropKind::Bool);
        assert_eq!(flag.widget_name(), "checkbox");
        let mut tags = Prop::base("tags", "Tags", PropKind::Text);
        tags.repeated = true;
        assert_eq!(tags.widget_name(), "array");
    }

    #[test]
    fn parsed_toml_code_decodes_to_structured_json() {
        let mut code = Prop::base(
            "kubernetesObject",
            "Kubernetes Object",
            PropKind::Code {
                language: "toml".to_string(),
                parsed: true,
            },
        );
        code.component_type_name = "kubernetesDeploymentEntity".to_string();
        let value = code.real_value("kind = \"Deployment\"\nreplicas = 3\n").unwrap();
        assert_eq!(value["kind"], "Deployment");
        assert_eq!(value["replicas"], 3);
    }

    #[test]
    fn parsed_code_in_an_unhandled_language_is_rejected() {
        let mut code = Prop::base(
            "kubernetesObjectYaml",
            "Kubernetes Object YAML",
            PropKind::Code {
                language: "yaml".to_string(),
                parsed: true,
            },
        );
        code.component_type_name = "kubernetesDeploymentEntity".to_string();
        let err = code.real_value("kind: Deployment").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported property kind 'parsed yaml code' for 'kubernetesObjectYaml' on kubernetesDeploymentEntity"
        );
    }

    #[test]
    fn unparsed_code_stays_a_string() {
        let code = Prop::base(
            "script",
            "Script",
            PropKind::Code {
                language: "sh".to_string(),
                parsed: false,
            },
        );
        assert_eq!(code.real_value("echo hi").unwrap(), json!("echo hi"));
    }

    #[test]
    fn repeated_props_default_to_an_empty_list() {
        let mut text = Prop::base("outputLines", "Output Lines", PropKind::Text);
        text.repeated = true;
        assert_eq!(text.default_value(), json!([]));
    }
}
