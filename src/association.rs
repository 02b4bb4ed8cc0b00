//! Associations between schema objects.
//!
//! An association names a sibling object and the method used to fetch it,
//! so the GraphQL backend can splice related objects into a query's field
//! list. The four shapes differ in how the linking value travels:
//!
//! | Shape | Fetch method | Linking value |
//! |-------|--------------|---------------|
//! | `BelongsTo` | `get` | `from_field_path` on this object holds the partner id |
//! | `HasMany` | `list` | partner rows point back at this object's id |
//! | `HasList` | `list` | `from_field_path` on this object holds a list of partner ids |
//! | `InList` | `list` | `to_field_path` on the partner holds a list containing this id |

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssociationKind {
    BelongsTo,
    HasMany,
    HasList,
    InList,
}

/// One association edge to another registered object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    pub kind: AssociationKind,
    /// Type name of the partner object.
    pub type_name: String,
    /// Method on the partner used to fetch it.
    pub method_name: String,
    /// Argument name the linking value is passed under.
    pub method_argument_name: String,
    /// Field name the association renders under; defaults to `type_name`.
    pub field_name: String,
    pub from_field_path: Vec<String>,
    pub to_field_path: Vec<String>,
}

fn to_path(path: &[&str]) -> Vec<String> {
    path.iter().map(|p| (*p).to_string()).collect()
}

/// The associations declared on one schema object.
#[derive(Debug, Clone, Default)]
pub struct AssociationList {
    associations: Vec<Association>,
}

impl AssociationList {
    pub fn new() -> AssociationList {
        AssociationList::default()
    }

    pub fn all(&self) -> &[Association] {
        &self.associations
    }

    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
    }

    /// Find an association by the field name it renders under.
    pub fn get_by_field_name(&self, field_name: &str) -> Result<&Association> {
        self.associations
            .iter()
            .find(|a| a.field_name == field_name)
            .ok_or_else(|| Error::AssociationNotFound {
                field_name: field_name.to_string(),
            })
    }

    /// This object holds the partner's id at `from_field_path`.
    pub fn belongs_to(
        &mut self,
        type_name: &str,
        from_field_path: &[&str],
        options: impl FnOnce(&mut Association),
    ) {
        self.add(
            AssociationKind::BelongsTo,
            type_name,
            "get",
            "id",
            to_path(from_field_path),
            Vec::new(),
            options,
        );
    }

    /// Partner rows point back at this object's id.
    pub fn has_many(&mut self, type_name: &str, options: impl FnOnce(&mut Association)) {
        self.add(
            AssociationKind::HasMany,
            type_name,
            "list",
            "input",
            vec!["id".to_string()],
            Vec::new(),
            options,
        );
    }

    /// This object holds a list of partner ids at `from_field_path`.
    pub fn has_list(
        &mut self,
        type_name: &str,
        from_field_path: &[&str],
        options: impl FnOnce(&mut Association),
    ) {
        self.add(
            AssociationKind::HasList,
            type_name,
            "list",
            "input",
            to_path(from_field_path),
            Vec::new(),
            options,
        );
    }

    /// The partner holds a list at `to_field_path` containing this
    /// object's id.
    pub fn in_list(
        &mut self,
        type_name: &str,
        to_field_path: &[&str],
        options: impl FnOnce(&mut Association),
    ) {
        self.add(
            AssociationKind::InList,
            type_name,
            "list",
            "input",
            vec!["id".to_string()],
            to_path(to_field_path),
            options,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn add(
        &mut self,
        kind: AssociationKind,
        type_name: &str,
        method_name: &str,
        method_argument_name: &str,
        from_field_path: Vec<String>,
        to_field_path: Vec<String>,
        options: impl FnOnce(&mut Association),
    ) {
        let mut association = Association {
            kind,
            type_name: type_name.to_string(),
            method_name: method_name.to_string(),
            method_argument_name: method_argument_name.to_string(),
            field_name: type_name.to_string(),
            from_field_path,
            to_field_path,
        };
        options(&mut association);
        self.associations.push(association);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn belongs_to_defaults_to_get_by_id() {
        let mut list = AssociationList::new();
        list.belongs_to("billingAccount", &["siProperties", "billingAccountId"], |_| {});
        let a = list.get_by_field_name("billingAccount").unwrap();
        assert_eq!(a.kind, AssociationKind::BelongsTo);
        assert_eq!(a.method_name, "get");
        assert_eq!(a.method_argument_name, "id");
        assert_eq!(a.from_field_path, vec!["siProperties", "billingAccountId"]);
    }

    #[test]
    fn has_many_defaults_the_from_path_to_id() {
        let mut list = AssociationList::new();
        list.has_many("workspace", |_| {});
        let a = list.get_by_field_name("workspace").unwrap();
        assert_eq!(a.method_name, "list");
        assert_eq!(a.from_field_path, vec!["id"]);
    }

    #[test]
    fn field_name_can_be_overridden() {
        let mut list = AssociationList::new();
        list.in_list("organization", &["memberIds"], |a| {
            a.field_name = "organizations".to_string();
        });
        assert!(list.get_by_field_name("organizations").is_ok());
        let err = list.get_by_field_name("organization").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot find association for field 'organization'"
        );
    }
}
