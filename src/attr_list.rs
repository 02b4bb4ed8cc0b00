//! Ordered property bags.
//!
//! An [`AttrList`] owns the props of one container (an object's fields, an
//! object's methods, or the body of a nested object). Every prop enters
//! through [`AttrList::add_prop`], which applies the caller's options,
//! propagates container-level read-only, and, for lists in auto-edit mode,
//! synthesizes the matching edit action.

use serde_json::{Map, Value};

use crate::case::{camel_case, pascal_case};
use crate::error::{Error, Result};
use crate::prop::{NumberKind, Prop, PropKind, PropLookup, SelectOption};

/// An ordered list of props belonging to one container.
#[derive(Debug, Clone)]
pub struct AttrList {
    attrs: Vec<Prop>,
    /// Pascal-cased container name new entries inherit as their parent.
    pub parent_name: String,
    /// Type name of the owning schema object.
    pub component_type_name: String,
    /// When set, every entry is forced read-only.
    pub read_only: bool,
    /// When set, adding a prop also synthesizes an `<name>Edit` action.
    pub auto_create_edits: bool,
    pending_edits: Vec<Prop>,
}

impl AttrList {
    pub fn new(parent_name: &str, component_type_name: &str) -> AttrList {
        AttrList {
            attrs: Vec::new(),
            parent_name: parent_name.to_string(),
            component_type_name: component_type_name.to_string(),
            read_only: false,
            auto_create_edits: false,
            pending_edits: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[Prop] {
        &self.attrs
    }

    pub fn entries_mut(&mut self) -> &mut [Prop] {
        &mut self.attrs
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Find a prop by name.
    pub fn get_entry(&self, name: &str) -> Result<&Prop> {
        self.attrs
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::PropNotFound {
                name: name.to_string(),
                type_name: self.component_type_name.clone(),
            })
    }

    pub fn get_entry_mut(&mut self, name: &str) -> Result<&mut Prop> {
        let component_type_name = self.component_type_name.clone();
        self.attrs
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::PropNotFound {
                name: name.to_string(),
                type_name: component_type_name,
            })
    }

    /// Add a fully-constructed prop, applying `options` first.
    ///
    /// This is the single funnel for every `add_*` method.
    pub fn add_prop(&mut self, mut prop: Prop, options: impl FnOnce(&mut Prop)) {
        options(&mut prop);
        if self.read_only {
            prop.read_only = true;
        }
        if self.auto_create_edits {
            self.auto_create_edit_action(&prop);
        }
        self.attrs.push(prop);
    }

    /// Add a prop constructed elsewhere, marking it as a borrowed reference.
    ///
    /// The prop keeps the parent and owner names it was built with.
    pub fn add_existing(&mut self, mut prop: Prop, options: impl FnOnce(&mut Prop)) {
        prop.reference = true;
        self.add_prop(prop, options);
    }

    pub fn add_text(&mut self, name: &str, label: &str, options: impl FnOnce(&mut Prop)) {
        self.add_scalar(name, label, PropKind::Text, options);
    }

    pub fn add_password(&mut self, name: &str, label: &str, options: impl FnOnce(&mut Prop)) {
        self.add_scalar(name, label, PropKind::Password, options);
    }

    pub fn add_bool(&mut self, name: &str, label: &str, options: impl FnOnce(&mut Prop)) {
        self.add_scalar(name, label, PropKind::Bool, options);
    }

    pub fn add_map(&mut self, name: &str, label: &str, options: impl FnOnce(&mut Prop)) {
        self.add_scalar(name, label, PropKind::Map, options);
    }

    pub fn add_number(
        &mut self,
        name: &str,
        label: &str,
        number_kind: NumberKind,
        options: impl FnOnce(&mut Prop),
    ) {
        self.add_scalar(name, label, PropKind::Number { number_kind }, options);
    }

    pub fn add_code(
        &mut self,
        name: &str,
        label: &str,
        language: &str,
        parsed: bool,
        options: impl FnOnce(&mut Prop),
    ) {
        let kind = PropKind::Code {
            language: language.to_string(),
            parsed,
        };
        self.add_scalar(name, label, kind, options);
    }

    pub fn add_select(
        &mut self,
        name: &str,
        label: &str,
        select_options: Vec<SelectOption>,
        options: impl FnOnce(&mut Prop),
    ) {
        let kind = PropKind::Select {
            options: select_options,
        };
        self.add_scalar(name, label, kind, options);
    }

    pub fn add_link(
        &mut self,
        name: &str,
        label: &str,
        lookup: PropLookup,
        options: impl FnOnce(&mut Prop),
    ) {
        self.add_scalar(name, label, PropKind::Link { lookup }, options);
    }

    /// Add an enum prop. Enums are named types in every backend, so the
    /// entry is parented under this container.
    pub fn add_enum(
        &mut self,
        name: &str,
        label: &str,
        variants: &[&str],
        options: impl FnOnce(&mut Prop),
    ) {
        let mut prop = Prop::base(
            name,
            label,
            PropKind::Enum {
                variants: variants.iter().map(|v| (*v).to_string()).collect(),
            },
        );
        prop.parent_name = pascal_case(&self.parent_name);
        prop.component_type_name = self.component_type_name.clone();
        self.add_prop(prop, options);
    }

    /// Add a nested object prop parented under this container.
    pub fn add_object(&mut self, name: &str, label: &str, options: impl FnOnce(&mut Prop)) {
        let prop = Prop::new_object(
            name,
            label,
            &pascal_case(&self.parent_name),
            &self.component_type_name,
        );
        self.add_prop(prop, options);
    }

    /// Add a service method parented under this container.
    pub fn add_method(&mut self, name: &str, label: &str, options: impl FnOnce(&mut Prop)) {
        let prop = Prop::new_method(
            name,
            label,
            &pascal_case(&self.parent_name),
            &self.component_type_name,
        );
        self.add_prop(prop, options);
    }

    /// Add an entity action parented under this container.
    pub fn add_action(&mut self, name: &str, label: &str, options: impl FnOnce(&mut Prop)) {
        let prop = Prop::new_action(
            name,
            label,
            &pascal_case(&self.parent_name),
            &self.component_type_name,
        );
        self.add_prop(prop, options);
    }

    fn add_scalar(&mut self, name: &str, label: &str, kind: PropKind, options: impl FnOnce(&mut Prop)) {
        let mut prop = Prop::base(name, label, kind);
        prop.component_type_name = self.component_type_name.clone();
        self.add_prop(prop, options);
    }

    /// Synthesize the `<name>Edit` action for a prop added in auto-edit mode.
    ///
    /// The action is universal and a mutation; its request carries a
    /// `property` link back to the edited prop. Methods and actions never
    /// get edit actions of their own.
    fn auto_create_edit_action(&mut self, prop: &Prop) {
        if prop.is_method_or_action() {
            return;
        }
        let name = format!("{}Edit", camel_case(&prop.name));
        let label = format!("Edit {} Property", pascal_case(&prop.name));
        let mut action = Prop::new_action(
            &name,
            &label,
            &pascal_case(&self.component_type_name),
            &self.component_type_name,
        );
        action.universal = true;
        if let Some(data) = action.method_mut() {
            data.mutation = true;
            let lookup = PropLookup::path(&self.component_type_name, &["properties", &prop.name]);
            if let Some(request) = data.request.properties_mut() {
                request.add_link("property", "Property", lookup, |p| {
                    p.required = true;
                });
            }
        }
        self.pending_edits.push(action);
    }

    /// Drain edit actions synthesized since the last call. The owning
    /// object moves these onto its methods list at finalization.
    pub fn take_pending_edits(&mut self) -> Vec<Prop> {
        std::mem::take(&mut self.pending_edits)
    }

    /// Build the default value object a UI form starts from.
    pub fn create_value_object(&self) -> Value {
        let mut out = Map::new();
        for prop in &self.attrs {
            if prop.is_method_or_action() {
                continue;
            }
            out.insert(prop.name.clone(), prop.default_value());
        }
        Value::Object(out)
    }

    /// Decode raw string values into their real shapes.
    ///
    /// Parsed code props decode (TOML to JSON); everything else passes
    /// through unchanged. Values with no matching prop are dropped.
    pub fn real_values(&self, values: &Value) -> Result<Value> {
        let mut out = Map::new();
        if let Some(given) = values.as_object() {
            for prop in &self.attrs {
                if let Some(raw) = given.get(&prop.name) {
                    let value = match raw.as_str() {
                        Some(s) => prop.real_value(s)?,
                        None => raw.clone(),
                    };
                    out.insert(prop.name.clone(), value);
                }
            }
        }
        Ok(Value::Object(out))
    }
}
