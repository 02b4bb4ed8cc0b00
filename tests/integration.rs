//! End-to-end integration tests for si-registry.
//!
//! These tests declare small schemas through the public factory API and
//! verify the complete pipeline: declaration → registry resolution →
//! protobuf/Rust/GraphQL generation → idempotent file writes.

use si_registry::codegen::graphql::{QueryArgs, SiGraphql};
use si_registry::codegen::protobuf::ProtobufFormatter;
use si_registry::codegen::rust::{CodegenRust, RenderOptions, RustFormatter};
use si_registry::error::Error;
use si_registry::object::{IntegrationService, ObjectKind};
use si_registry::prop::{NumberKind, PropKind, PropLookup};
use si_registry::registry::{Registry, default_registry};
use si_registry::schema::application_registry;
use si_registry::writer::{format_rust_code, rustfmt_available, write_code};

/// Declare a widget component/entity pair with one constraint enum and a
/// couple of typed properties.
fn widget_registry() -> Registry {
    let mut registry = default_registry().unwrap();
    registry
        .component_and_entity("widget", "Widget", "widget", |t| {
            t.entity.integration_services.push(IntegrationService {
                integration_name: "global".to_string(),
                integration_service_name: "core".to_string(),
            });
            t.constraints_mut()?
                .add_enum("size", "Size", &["small", "large"], |_| {});
            let properties = t.properties_mut()?;
            properties.add_text("image", "Image", |_| {});
            properties.add_number("replicas", "Replicas", NumberKind::Uint32, |_| {});
            Ok(())
        })
        .unwrap();
    registry
}

#[test]
fn declaring_a_component_and_entity_registers_the_triple() {
    let registry = widget_registry();

    let component = registry.get("widgetComponent").unwrap();
    assert_eq!(component.kind, ObjectKind::ComponentObject);
    let entity = registry.get("widgetEntity").unwrap();
    assert_eq!(entity.kind, ObjectKind::EntityObject);
    let event = registry.get("widgetEntityEvent").unwrap();
    assert_eq!(event.kind, ObjectKind::EntityEventObject);

    let properties = entity.fields().get_entry("properties").unwrap();
    assert!(matches!(properties.kind, PropKind::Object(_)));
}

#[test]
fn create_reply_links_resolve_to_the_entity_itself() {
    let registry = widget_registry();
    let entity = registry.get("widgetEntity").unwrap();

    let create = entity.methods().get_entry("create").unwrap();
    let item = create
        .method()
        .unwrap()
        .reply
        .properties()
        .unwrap()
        .get_entry("item")
        .unwrap();

    // Links inside auto-generated methods resolve without any manual
    // registration step.
    let real = registry.lookup_prop(item.lookup().unwrap()).unwrap();
    assert!(real.is_object());
    assert_eq!(real.name, "widgetEntity");
}

#[test]
fn uint32_props_render_across_all_three_backends() {
    let registry = widget_registry();

    let protobuf = ProtobufFormatter::new(&registry, "widget").unwrap();
    let messages = protobuf.messages().unwrap();
    assert!(messages.contains("google.protobuf.UInt32Value replicas ="));

    let entity = registry.get("widgetEntity").unwrap();
    let replicas = entity
        .fields()
        .get_entry("properties")
        .unwrap()
        .properties()
        .unwrap()
        .get_entry("replicas")
        .unwrap();

    let rust = RustFormatter::new(&registry, entity);
    assert_eq!(
        rust.rust_type_for_prop(replicas, RenderOptions::default())
            .unwrap(),
        "Option<u32>"
    );

    let graphql = SiGraphql::new(&registry, entity);
    assert_eq!(graphql.graphql_type_name(replicas, false).unwrap(), "String");
}

#[test]
fn repeated_enum_links_stay_vectors() {
    let mut registry = widget_registry();
    registry
        .base("widgetSummary", "Widget Summary", "widget", |o| {
            o.fields_mut().add_link(
                "sizes",
                "Sizes",
                PropLookup::path("widgetComponent", &["constraints", "size"]),
                |p| p.repeated = true,
            );
            Ok(())
        })
        .unwrap();

    let protobuf = ProtobufFormatter::new(&registry, "widget").unwrap();
    let messages = protobuf.messages().unwrap();
    assert!(messages.contains("repeated si.widget.WidgetComponentConstraintsSize sizes ="));

    let summary = registry.get("widgetSummary").unwrap();
    let sizes = summary.fields().get_entry("sizes").unwrap();
    let rust = RustFormatter::new(&registry, summary);
    let rendered = rust
        .rust_type_for_prop(sizes, RenderOptions::default())
        .unwrap();
    assert_eq!(
        rendered,
        "Vec<crate::protobuf::WidgetComponentConstraintsSize>"
    );
}

#[tokio::test]
async fn proto_writes_are_idempotent() {
    let registry = widget_registry();
    let dir = tempdir();

    let protobuf = ProtobufFormatter::new(&registry, "widget").unwrap();
    let changed = protobuf.write_proto(&dir).await.unwrap();
    assert!(changed);
    assert!(dir.join("si.widget.proto").exists());

    let changed_again = protobuf.write_proto(&dir).await.unwrap();
    assert!(!changed_again);

    let proto = std::fs::read_to_string(dir.join("si.widget.proto")).unwrap();
    assert!(proto.starts_with("syntax = \"proto3\";"));
    assert!(proto.contains("package si.widget;"));
}

#[tokio::test]
async fn generated_rust_tree_covers_models_service_and_agents() {
    let registry = application_registry().unwrap();
    let dir = tempdir();

    let codegen = CodegenRust::new(&registry, "kubernetes", &dir, false);
    codegen.generate_gen_mod().await.unwrap();
    codegen.generate_gen_service().await.unwrap();
    codegen.generate_gen_model_mod().await.unwrap();
    for object in registry.objects_for_service("kubernetes") {
        if object.kind != ObjectKind::BaseObject {
            codegen.generate_gen_model(object).await.unwrap();
        }
    }
    codegen.generate_gen_agent_mod().await.unwrap();
    for agent in codegen.entity_integration_services() {
        codegen.generate_gen_agent(&agent).await.unwrap();
    }

    let src = dir.join("si-kubernetes").join("src");
    let gen_mod = std::fs::read_to_string(src.join("gen/mod.rs")).unwrap();
    assert!(gen_mod.starts_with("// Auto-generated code!\n// No touchy!"));
    assert!(gen_mod.contains("pub mod model;"));
    assert!(gen_mod.contains("pub mod service;"));
    assert!(gen_mod.contains("pub mod agent;"));

    let model_mod = std::fs::read_to_string(src.join("gen/model/mod.rs")).unwrap();
    assert!(model_mod.contains("pub mod kubernetes_deployment_entity;"));

    let entity_model =
        std::fs::read_to_string(src.join("gen/model/kubernetes_deployment_entity.rs")).unwrap();
    assert!(entity_model.contains("impl si_data::Storable for crate::protobuf::KubernetesDeploymentEntity {"));
    assert!(entity_model.contains("\"siStorable.naturalKey\""));

    let service = std::fs::read_to_string(src.join("gen/service.rs")).unwrap();
    assert!(service.contains("impl crate::protobuf::kubernetes_server::Kubernetes for Service {"));
    assert!(service.contains("async fn kubernetes_deployment_entity_create("));

    let agent = std::fs::read_to_string(src.join("gen/agent/aws_eks_kubernetes.rs")).unwrap();
    assert!(agent.contains("pub async fn dispatch("));
    assert!(agent.contains("\"kubernetes_object_yaml_edit\" => edit_kubernetes_object_yaml("));
}

#[test]
fn graphql_documents_compose_from_the_schema() {
    let registry = widget_registry();
    let entity = registry.get("widgetEntity").unwrap();
    let graphql = SiGraphql::new(&registry, entity);

    let query = graphql.query(&QueryArgs::for_method("get")).unwrap();
    assert!(query.starts_with("query widgetEntityGet($id: ID!)"));
    assert!(query.contains("widgetEntityGet(input: { id: $id })"));

    let mutation = graphql.mutation(&QueryArgs::for_method("create")).unwrap();
    assert!(mutation.starts_with("mutation widgetEntityCreate("));
}

#[test]
fn generation_is_deterministic_across_fresh_registries() {
    let first = {
        let registry = application_registry().unwrap();
        ProtobufFormatter::new(&registry, "kubernetes")
            .unwrap()
            .generate_string()
            .unwrap()
    };
    let second = {
        let registry = application_registry().unwrap();
        ProtobufFormatter::new(&registry, "kubernetes")
            .unwrap()
            .generate_string()
            .unwrap()
    };
    assert_eq!(first, second);
}

#[test]
fn missing_objects_report_the_available_names() {
    let registry = widget_registry();
    let err = registry.get("bogus").unwrap_err().to_string();
    assert!(err.contains("cannot get object named 'bogus'"));
    assert!(err.contains("widgetEntity"));
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut registry = widget_registry();
    let result = registry.component_and_entity("widget", "Widget", "widget", |_| Ok(()));
    let err = result.unwrap_err();
    assert!(matches!(err, Error::DuplicateObject { .. }));
    assert_eq!(err.to_string(), "object 'widgetComponent' is already registered");
}

#[tokio::test]
async fn identical_content_skips_the_second_write() {
    let dir = tempdir();
    let path = dir.join("out.proto");
    assert!(write_code(&path, "content\n").await.unwrap());
    assert!(!write_code(&path, "content\n").await.unwrap());
}

#[tokio::test]
async fn rustfmt_round_trip() {
    if !rustfmt_available().await {
        eprintln!("skipping: rustfmt not available");
        return;
    }
    let formatted = format_rust_code("pub fn one()->i32{1}")
        .await
        .unwrap();
    assert!(formatted.contains("pub fn one() -> i32 {"));
}

// ── Helpers ────────────────────────────────────────────────────────────

fn tempdir() -> std::path::PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("si-registry-test-{}-{}", std::process::id(), id));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
