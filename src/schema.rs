//! Built-in application schema.
//!
//! Declares the schema objects the generator ships with, on top of the
//! protocol objects from [`default_registry`]. Service crates get their
//! protobuf definitions and `gen/` trees from these declarations.

use crate::error::Result;
use crate::object::IntegrationService;
use crate::prop::{NumberKind, SelectOption};
use crate::registry::{Registry, default_registry};

/// The full application registry: protocol objects plus every declared
/// service.
pub fn application_registry() -> Result<Registry> {
    let mut registry = default_registry()?;

    registry.component_and_entity(
        "kubernetesDeployment",
        "Kubernetes Deployment",
        "kubernetes",
        |t| {
            t.entity.integration_services.push(IntegrationService {
                integration_name: "aws".to_string(),
                integration_service_name: "eksKubernetes".to_string(),
            });

            t.constraints_mut()?.add_select(
                "kubernetesVersion",
                "Kubernetes Version",
                vec![
                    SelectOption {
                        label: "v1.12".to_string(),
                        value: "v1.12".to_string(),
                    },
                    SelectOption {
                        label: "v1.13".to_string(),
                        value: "v1.13".to_string(),
                    },
                    SelectOption {
                        label: "v1.14".to_string(),
                        value: "v1.14".to_string(),
                    },
                    SelectOption {
                        label: "v1.15".to_string(),
                        value: "v1.15".to_string(),
                    },
                ],
                |_| {},
            );

            let properties = t.properties_mut()?;
            properties.add_number("replicas", "Replicas", NumberKind::Uint32, |_| {});
            // Value decoding handles TOML only; YAML passes through raw.
            properties.add_code(
                "kubernetesObjectYaml",
                "Kubernetes Object YAML",
                "yaml",
                false,
                |_| {},
            );

            Ok(())
        },
    )?;

    registry.component_and_entity("awsEks", "AWS EKS Cluster", "aws", |t| {
        t.entity.integration_services.push(IntegrationService {
            integration_name: "aws".to_string(),
            integration_service_name: "eks".to_string(),
        });

        t.constraints_mut()?.add_text("region", "AWS Region", |_| {});

        let properties = t.properties_mut()?;
        properties.add_text("clusterName", "Cluster Name", |_| {});
        properties.add_map("tags", "Tags", |_| {});
        properties.add_text("deploymentIds", "Deployment IDs", |p| {
            p.repeated = true;
            p.hidden = true;
        });

        t.entity.associations.has_list(
            "kubernetesDeploymentEntity",
            &["properties", "deploymentIds"],
            |_| {},
        );

        Ok(())
    })?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;

    #[test]
    fn application_registry_holds_the_declared_triples() {
        let registry = application_registry().unwrap();
        for type_name in [
            "kubernetesDeploymentComponent",
            "kubernetesDeploymentEntity",
            "kubernetesDeploymentEntityEvent",
            "awsEksComponent",
            "awsEksEntity",
            "awsEksEntityEvent",
        ] {
            assert!(registry.get(type_name).is_ok(), "missing {type_name}");
        }
        assert_eq!(
            registry.get("kubernetesDeploymentEntity").unwrap().kind,
            ObjectKind::EntityObject
        );
    }

    #[test]
    fn service_names_cover_protocol_and_application_services() {
        let registry = application_registry().unwrap();
        let names = registry.service_names();
        assert!(names.contains(&"data".to_string()));
        assert!(names.contains(&"kubernetes".to_string()));
        assert!(names.contains(&"aws".to_string()));
    }

    #[test]
    fn auto_edit_properties_become_edit_actions() {
        let registry = application_registry().unwrap();
        let entity = registry.get("kubernetesDeploymentEntity").unwrap();
        let edit = entity.methods().get_entry("kubernetesObjectYamlEdit").unwrap();
        assert!(edit.is_method_or_action());
        let property = edit
            .method()
            .unwrap()
            .request
            .properties()
            .unwrap()
            .get_entry("property")
            .unwrap();
        let lookup = property.lookup().unwrap();
        assert_eq!(lookup.type_name, "kubernetesDeploymentEntity");
        assert_eq!(
            lookup.names.as_deref(),
            Some(&["properties".to_string(), "kubernetesObjectYaml".to_string()][..])
        );
    }
}
