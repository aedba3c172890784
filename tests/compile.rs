//! End-to-end tests for the SDSL compiler.
//!
//! These tests drive the public API from raw JSON through the full bundle and
//! check the properties downstream consumers rely on: determinism, the 1:1
//! correspondence of per-feature definitions, graph shape and validation abort.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Value, json};

use sdsl_compiler::kernel::RelationshipType;
use sdsl_compiler::ontology_image::FixedClock;
use sdsl_compiler::schema_gen::Origin;
use sdsl_compiler::{Compiler, CompilerArtifacts, ValidationError};

fn test_compiler() -> Compiler {
    Compiler::new().with_clock(Arc::new(FixedClock(1_700_000_000_000)))
}

fn email_spec() -> Value {
    json!({
        "id": "crm",
        "models": [{"id": "m1", "label": "Customer"}],
        "features": [
            {"id": "f1", "label": "Email", "modelId": "m1"},
            {"id": "f2", "label": "Name"}
        ],
        "engine": {"logicalForm": "fol", "mvc": "react"}
    })
}

fn input() -> Value {
    json!({"user": {"username": "ada"}, "databaseId": "db-1"})
}

fn compile(spec: &Value) -> CompilerArtifacts {
    test_compiler().compile_json(spec, &input()).unwrap()
}

fn edges(bundle: &CompilerArtifacts, kind: RelationshipType) -> Vec<(u64, u64)> {
    bundle
        .kernel
        .graph_store_put
        .snapshot
        .relationships
        .iter()
        .filter(|r| r.kind == kind)
        .map(|r| (r.source, r.target))
        .collect()
}

#[test]
fn email_heuristic_scenario() {
    let bundle = compile(&email_spec());
    let schema = &bundle.schema_generation;

    let udts: Vec<&str> = schema.generated_udts.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(udts, vec!["udt.string", "udt.email"]);
    let udfs: Vec<&str> = schema.generated_udfs.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(udfs, vec!["udf.email.normalize", "udf.email.validate"]);

    assert_eq!(schema.dataframe_definitions[0].udt_id, "udt.email");
    assert_eq!(
        schema.dataframe_definitions[0].udf_ids,
        vec!["udf.email.normalize", "udf.email.validate"]
    );
    assert_eq!(schema.dataframe_definitions[1].udt_id, "udt.string");
    assert!(schema.dataframe_definitions[1].udf_ids.is_empty());

    let snapshot = &bundle.kernel.graph_store_put.snapshot;
    assert_eq!(snapshot.nodes, vec![0, 1000, 2000, 2001]);
    assert_eq!(edges(&bundle, RelationshipType::HasModel), vec![(0, 1000)]);
    assert_eq!(
        edges(&bundle, RelationshipType::HasFeature),
        vec![(0, 2000), (0, 2001)]
    );
    assert_eq!(
        edges(&bundle, RelationshipType::ModelFeature),
        vec![(1000, 2000)]
    );
    assert!(
        snapshot
            .relationships
            .iter()
            .filter(|r| r.kind == RelationshipType::ModelFeature)
            .all(|r| r.target != 2001)
    );
}

#[test]
fn compilation_is_deterministic_with_a_fixed_clock() {
    let first = serde_json::to_value(compile(&email_spec())).unwrap();
    let second = serde_json::to_value(compile(&email_spec())).unwrap();
    assert_eq!(first, second);
}

#[test]
fn only_provenance_timestamp_depends_on_the_clock() {
    let a = compile(&email_spec());
    let b = Compiler::new()
        .with_clock(Arc::new(FixedClock(5)))
        .compile_json(&email_spec(), &input())
        .unwrap();

    let mut a = serde_json::to_value(a).unwrap();
    let mut b = serde_json::to_value(b).unwrap();
    for bundle in [&mut a, &mut b] {
        bundle["ontologyImage"]["tables"]["provenance"][0]["generatedAtUnixMs"] = json!(0);
        bundle["kernel"]["formEvalEvaluate"]["artifacts"]["ontologyImage"]["tables"]
            ["provenance"][0]["generatedAtUnixMs"] = json!(0);
    }
    assert_eq!(a, b);
}

#[test]
fn definitions_correspond_one_to_one_with_features() {
    let spec = json!({
        "id": "shop",
        "models": [{"id": "order", "label": "Order"}, {"id": "item", "label": "Item"}],
        "features": [
            {"id": "total", "label": "Total", "modelId": "order"},
            {"id": "sku", "label": "SKU", "modelId": "item"},
            {"id": "contact", "label": "Contact email"},
            {"id": "note", "label": "Note", "modelId": "order"}
        ],
        "engine": {"logicalForm": "fol", "mvc": "vue"}
    });
    let bundle = compile(&spec);
    let schema = &bundle.schema_generation;

    assert_eq!(schema.dataframe_definitions.len(), 4);
    assert_eq!(schema.dataset_definitions.len(), 4);
    for (df, ds) in schema
        .dataframe_definitions
        .iter()
        .zip(&schema.dataset_definitions)
    {
        assert_eq!(
            ds.reference,
            df.reference.replace("dataframe:def:", "dataset:def:")
        );
        assert_eq!(df.feature_id, ds.feature_id);
    }
    assert_eq!(
        schema.dataframe_definitions[2].reference,
        "dataframe:def:shop:global:contact"
    );

    let rows = &bundle.substrate_mapping.mappings;
    assert_eq!(rows.len(), 4);
    for (row, ds) in rows.iter().zip(&schema.dataset_definitions) {
        assert_eq!(row.dataset_definition_ref, ds.reference);
    }

    assert_eq!(bundle.dataframe.steps.len(), 4 * 5);
    assert_eq!(bundle.dataframe.steps[0].input_ref, "order.source");
    assert_eq!(bundle.dataframe.steps[10].input_ref, "global.source");
}

#[test]
fn node_and_edge_counts_follow_the_specification() {
    let spec = json!({
        "id": "shop",
        "models": [{"id": "order", "label": "Order"}, {"id": "item", "label": "Item"}],
        "features": [
            {"id": "total", "label": "Total", "modelId": "order"},
            {"id": "sku", "label": "SKU", "modelId": "item"},
            {"id": "loose", "label": "Loose"}
        ],
        "engine": {"logicalForm": "fol", "mvc": "vue"}
    });
    let bundle = compile(&spec);
    let snapshot = &bundle.kernel.graph_store_put.snapshot;

    assert_eq!(snapshot.nodes.len(), 1 + 2 + 3);
    assert_eq!(snapshot.relationships.len(), 2 + 3 + 2);
    assert_eq!(snapshot.node_properties["specificationId"].len(), 6);

    let program = &bundle.kernel.form_eval_evaluate.program;
    assert_eq!(program.selected_forms, vec!["order", "item"]);
    assert_eq!(program.application_forms[0].features, vec!["total"]);
}

#[test]
fn unresolved_model_id_drops_only_the_model_edge() {
    let mut spec = email_spec();
    spec["features"][0]["modelId"] = json!("ghost");
    let bundle = compile(&spec);

    assert_eq!(
        edges(&bundle, RelationshipType::HasFeature),
        vec![(0, 2000), (0, 2001)]
    );
    assert!(edges(&bundle, RelationshipType::ModelFeature).is_empty());
    assert_eq!(
        bundle.schema_generation.dataframe_definitions[0].reference,
        "dataframe:def:crm:ghost:f1"
    );
}

#[test]
fn empty_specification_id_aborts_compilation() {
    let mut spec = email_spec();
    spec["id"] = json!("");
    let err = test_compiler().compile_json(&spec, &input()).unwrap_err();
    assert_eq!(err, ValidationError::EmptyString { path: "$.id".into() });
}

#[test]
fn malformed_compiler_input_aborts_compilation() {
    let err = test_compiler()
        .compile_json(&email_spec(), &json!({"user": {"username": "ada"}}))
        .unwrap_err();
    assert!(matches!(err, ValidationError::Structure { .. }));
}

#[test]
fn declared_email_catalog_is_not_duplicated() {
    let mut spec = email_spec();
    spec["udts"] = json!([
        {"id": "udt.email", "label": "Email", "baseType": "string"}
    ]);
    spec["udfs"] = json!([
        {
            "id": "udf.email.normalize",
            "label": "Normalize",
            "inputUdtId": "udt.email",
            "outputType": "string",
            "implementationRef": "custom://normalize",
            "semantics": "normalize"
        },
        {
            "id": "udf.email.validate",
            "label": "Validate",
            "inputUdtId": "udt.email",
            "outputType": "boolean",
            "implementationRef": "custom://validate",
            "semantics": "validate"
        }
    ]);
    let bundle = compile(&spec);
    let schema = &bundle.schema_generation;

    let udt_ids: HashSet<&str> = schema.generated_udts.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(udt_ids.len(), schema.generated_udts.len());
    assert_eq!(schema.generated_udts.len(), 2);
    assert_eq!(schema.generated_udfs.len(), 2);
    assert!(
        schema
            .generated_udfs
            .iter()
            .all(|u| u.source == Origin::SpecDeclared)
    );
    assert_eq!(
        schema.generated_udfs[0].implementation_ref,
        "custom://normalize"
    );

    let capability_ids: Vec<&str> = bundle
        .dataset_sdk_generation
        .nlp_processor
        .capabilities
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    let unique: HashSet<&str> = capability_ids.iter().copied().collect();
    assert_eq!(unique.len(), capability_ids.len());
}

#[test]
fn explicit_udt_binding_wins_over_heuristics() {
    let mut spec = email_spec();
    spec["udts"] = json!([
        {"id": "udt.address", "label": "Address", "baseType": "string", "featureId": "f1"}
    ]);
    let bundle = compile(&spec);
    assert_eq!(
        bundle.schema_generation.dataframe_definitions[0].udt_id,
        "udt.address"
    );
}

#[test]
fn graph_names_default_from_specification_id() {
    let bundle = compile(&email_spec());
    assert_eq!(bundle.kernel.graph_store_put.graph_name, "sdsl-spec-crm");
    assert_eq!(
        bundle.kernel.form_eval_evaluate.output_graph_name,
        "sdsl-spec-crm-compiled"
    );
    assert_eq!(
        bundle.store_contract.knowledge_store.target_ref,
        "sdsl-spec-crm-knowledge-store"
    );

    let bundle = test_compiler()
        .compile_json(
            &email_spec(),
            &json!({
                "user": {"username": "ada"},
                "databaseId": "db-1",
                "graphName": "facts",
                "outputGraphName": "knowledge"
            }),
        )
        .unwrap();
    assert_eq!(bundle.kernel.graph_store_put.graph_name, "facts");
    assert_eq!(bundle.kernel.form_eval_evaluate.output_graph_name, "knowledge");
    assert_eq!(bundle.store_contract.fact_store.graph_ref, "neo4j://factstore/facts");
}

#[test]
fn bundle_serializes_with_camel_case_keys() {
    let json = serde_json::to_value(compile(&email_spec())).unwrap();
    for key in [
        "specification",
        "designSurface",
        "dataframe",
        "substrateMapping",
        "schemaGeneration",
        "datasetSdkGeneration",
        "ontologyImage",
        "storeContract",
        "kernel",
        "mvc",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["kernel"]["graphStorePut"]["facade"], "graph_store");
    assert_eq!(json["kernel"]["formEvalEvaluate"]["op"], "evaluate");
    assert_eq!(
        json["kernel"]["formEvalEvaluate"]["program"]["context"]["runtime_strategy"],
        "fol"
    );
    assert_eq!(
        json["datasetSdkGeneration"]["packageRef"],
        "@organon/sdsl-sdk-crm"
    );
}
