//! Kernel artifacts: the `graph_store.put` and `form_eval.evaluate` calls.
//!
//! Node identity is positional. Node `0` is the specification root; model
//! nodes occupy `[1000, 1000 + models)` and feature nodes
//! `[2000, 2000 + features)`, both in specification order. Edges:
//!
//! - `HAS_MODEL(root, model)` for every model
//! - `HAS_FEATURE(root, feature)` for every feature
//! - `MODEL_FEATURE(model, feature)` only when the feature's `modelId`
//!   resolves to a model of the specification; unresolved ids drop the edge
//!
//! The evaluate call embeds every other builder's output in its artifact bag,
//! which makes its validation the last consistency check of a compilation.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::boundary::ReflectiveBoundaryContract;
use crate::error::ValidationResult;
use crate::ontology_image::OntologyImage;
use crate::program::FormProgram;
use crate::schema_gen::SchemaGeneration;
use crate::sdk::DatasetSdkGeneration;
use crate::specification::{CompilerInput, EngineSpec, Specification, User};
use crate::store_contract::{ThreeStoreContract, default_graph_name};
use crate::substrate::SubstrateMapping;
use crate::validate::{Validate, Validator, checked};

pub const ROOT_NODE: u64 = 0;
pub const MODEL_NODE_OFFSET: u64 = 1000;
pub const FEATURE_NODE_OFFSET: u64 = 2000;

/// Default output graph of the evaluate call.
pub fn default_output_graph_name(spec_id: &str) -> String {
    format!("sdsl-spec-{spec_id}-compiled")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    HasModel,
    HasFeature,
    ModelFeature,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub kind: RelationshipType,
    pub source: u64,
    pub target: u64,
    pub properties: BTreeMap<String, Value>,
}

impl Relationship {
    fn weighted(kind: RelationshipType, source: u64, target: u64) -> Self {
        Self {
            kind,
            source,
            target,
            properties: BTreeMap::from([("weight".to_string(), Value::from(1))]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    pub nodes: Vec<u64>,
    pub relationships: Vec<Relationship>,
    pub node_properties: BTreeMap<String, Vec<Value>>,
}

impl GraphSnapshot {
    /// Positional node/edge snapshot of the specification's models and features.
    pub fn of_specification(spec: &Specification) -> Self {
        let model_node = |index: usize| MODEL_NODE_OFFSET + index as u64;
        let feature_node = |index: usize| FEATURE_NODE_OFFSET + index as u64;

        let mut nodes = Vec::with_capacity(1 + spec.models.len() + spec.features.len());
        nodes.push(ROOT_NODE);
        nodes.extend((0..spec.models.len()).map(model_node));
        nodes.extend((0..spec.features.len()).map(feature_node));

        // A repeated model id resolves to its last model.
        let model_nodes: HashMap<&str, u64> = spec
            .models
            .iter()
            .enumerate()
            .map(|(i, model)| (model.id.as_str(), model_node(i)))
            .collect();

        let mut relationships: Vec<Relationship> = (0..spec.models.len())
            .map(|i| Relationship::weighted(RelationshipType::HasModel, ROOT_NODE, model_node(i)))
            .collect();
        relationships.extend((0..spec.features.len()).map(|i| {
            Relationship::weighted(RelationshipType::HasFeature, ROOT_NODE, feature_node(i))
        }));
        relationships.extend(spec.features.iter().enumerate().filter_map(|(i, feature)| {
            let model = *model_nodes.get(feature.model_id.as_deref()?)?;
            Some(Relationship::weighted(
                RelationshipType::ModelFeature,
                model,
                feature_node(i),
            ))
        }));

        let node_properties = BTreeMap::from([(
            "specificationId".to_string(),
            vec![Value::from(spec.id.as_str()); nodes.len()],
        )]);

        Self {
            nodes,
            relationships,
            node_properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStorePutCall {
    pub kind: &'static str,
    pub facade: &'static str,
    pub op: &'static str,
    pub user: User,
    pub database_id: String,
    pub graph_name: String,
    pub snapshot: GraphSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctrine {
    pub authority: &'static str,
    pub substrate: &'static str,
    pub kernel_role: &'static str,
    pub discipline: &'static str,
}

impl Default for Doctrine {
    fn default() -> Self {
        Self {
            authority: "ts-first",
            substrate: "cypher-driven",
            kernel_role: "cache",
            discipline: "specification-driven",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OntologySummary {
    pub mode: &'static str,
    pub total: usize,
    pub profiles: Vec<String>,
    pub ids: Vec<String>,
}

/// Everything the evaluate call carries besides the program itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationArtifacts {
    pub specification_id: String,
    pub engine: EngineSpec,
    pub doctrine: Doctrine,
    pub boundary_contract: ReflectiveBoundaryContract,
    pub store_contract: ThreeStoreContract,
    pub substrate_mapping: SubstrateMapping,
    pub schema_generation: SchemaGeneration,
    pub dataset_sdk_generation: DatasetSdkGeneration,
    pub ontology_image: OntologyImage,
    pub ontology: OntologySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormEvalEvaluateCall {
    pub kind: &'static str,
    pub facade: &'static str,
    pub op: &'static str,
    pub user: User,
    pub database_id: String,
    pub graph_name: String,
    pub output_graph_name: String,
    pub program: FormProgram,
    pub artifacts: EvaluationArtifacts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelArtifacts {
    pub graph_store_put: GraphStorePutCall,
    pub form_eval_evaluate: FormEvalEvaluateCall,
}

/// Upstream builder outputs the kernel artifacts embed.
#[derive(Debug, Clone, Copy)]
pub struct Upstream<'a> {
    pub schema_generation: &'a SchemaGeneration,
    pub substrate_mapping: &'a SubstrateMapping,
    pub dataset_sdk_generation: &'a DatasetSdkGeneration,
    pub ontology_image: &'a OntologyImage,
    pub store_contract: &'a ThreeStoreContract,
}

pub fn build_kernel_artifacts(
    spec: &Specification,
    input: &CompilerInput,
    upstream: Upstream<'_>,
) -> ValidationResult<KernelArtifacts> {
    let graph_name = input
        .graph_name
        .clone()
        .unwrap_or_else(|| default_graph_name(&spec.id));
    let output_graph_name = input
        .output_graph_name
        .clone()
        .unwrap_or_else(|| default_output_graph_name(&spec.id));

    let snapshot = GraphSnapshot::of_specification(spec);
    tracing::debug!(
        spec = %spec.id,
        nodes = snapshot.nodes.len(),
        relationships = snapshot.relationships.len(),
        "graph snapshot built"
    );

    let graph_store_put = checked(GraphStorePutCall {
        kind: "ApplicationForm",
        facade: "graph_store",
        op: "put",
        user: input.user.clone(),
        database_id: input.database_id.clone(),
        graph_name: graph_name.clone(),
        snapshot,
    })?;

    let form_eval_evaluate = checked(FormEvalEvaluateCall {
        kind: "ApplicationForm",
        facade: "form_eval",
        op: "evaluate",
        user: input.user.clone(),
        database_id: input.database_id.clone(),
        graph_name,
        output_graph_name,
        program: FormProgram::for_specification(spec),
        artifacts: EvaluationArtifacts {
            specification_id: spec.id.clone(),
            engine: spec.engine.clone(),
            doctrine: Doctrine::default(),
            boundary_contract: ReflectiveBoundaryContract::default(),
            store_contract: upstream.store_contract.clone(),
            substrate_mapping: upstream.substrate_mapping.clone(),
            schema_generation: upstream.schema_generation.clone(),
            dataset_sdk_generation: upstream.dataset_sdk_generation.clone(),
            ontology_image: upstream.ontology_image.clone(),
            ontology: OntologySummary {
                mode: "transcendental-logic",
                total: spec.ontologies.len(),
                profiles: spec.ontologies.iter().map(|o| o.profile.clone()).collect(),
                ids: spec.ontology_ids(),
            },
        },
    })?;

    checked(KernelArtifacts {
        graph_store_put,
        form_eval_evaluate,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Validate for GraphSnapshot {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty_list("nodes", &self.nodes)?;
        let nodes: HashSet<u64> = self.nodes.iter().copied().collect();
        for rel in &self.relationships {
            v.invariant(
                "relationships",
                nodes.contains(&rel.source) && nodes.contains(&rel.target),
                || {
                    format!(
                        "{:?}({}, {}) has a dangling endpoint",
                        rel.kind, rel.source, rel.target
                    )
                },
            )?;
        }
        for (name, values) in &self.node_properties {
            v.invariant("nodeProperties", values.len() == self.nodes.len(), || {
                format!(
                    "property {name} has {} values for {} nodes",
                    values.len(),
                    self.nodes.len()
                )
            })?;
        }
        Ok(())
    }
}

impl Validate for GraphStorePutCall {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.nested("user", &self.user)?;
        v.non_empty("databaseId", &self.database_id)?;
        v.non_empty("graphName", &self.graph_name)?;
        v.nested("snapshot", &self.snapshot)
    }
}

impl Validate for EvaluationArtifacts {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("specificationId", &self.specification_id)?;
        v.nested("engine", &self.engine)?;
        v.nested("boundaryContract", &self.boundary_contract)?;
        v.nested("storeContract", &self.store_contract)?;
        v.nested("substrateMapping", &self.substrate_mapping)?;
        v.nested("schemaGeneration", &self.schema_generation)?;
        v.nested("datasetSdkGeneration", &self.dataset_sdk_generation)?;
        v.nested("ontologyImage", &self.ontology_image)?;
        v.field("ontology", |v| {
            v.non_empty_strings("profiles", &self.ontology.profiles)?;
            v.non_empty_strings("ids", &self.ontology.ids)?;
            let listed = self.ontology.ids.len();
            v.invariant("total", self.ontology.total == listed, || {
                format!("{} ontologies counted, {listed} listed", self.ontology.total)
            })
        })?;
        v.invariant(
            "substrateMapping",
            self.substrate_mapping.mappings.len()
                == self.schema_generation.dataframe_definitions.len(),
            || "substrate mapping and schema generation disagree on the feature count".into(),
        )?;
        for (row, def) in self
            .substrate_mapping
            .mappings
            .iter()
            .zip(&self.schema_generation.dataframe_definitions)
        {
            v.invariant(
                "substrateMapping",
                row.feature_id == def.feature_id
                    && row.udt_id == def.udt_id
                    && row.dataframe_definition_ref == def.reference,
                || format!("mapping of feature {} diverges from its definition", row.feature_id),
            )?;
        }
        Ok(())
    }
}

impl Validate for FormEvalEvaluateCall {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.nested("user", &self.user)?;
        v.non_empty("databaseId", &self.database_id)?;
        v.non_empty("graphName", &self.graph_name)?;
        v.non_empty("outputGraphName", &self.output_graph_name)?;
        v.nested("program", &self.program)?;
        v.nested("artifacts", &self.artifacts)
    }
}

impl Validate for KernelArtifacts {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.nested("graphStorePut", &self.graph_store_put)?;
        v.nested("formEvalEvaluate", &self.form_eval_evaluate)?;
        v.invariant(
            "formEvalEvaluate",
            self.form_eval_evaluate.graph_name == self.graph_store_put.graph_name,
            || "evaluate call reads a different graph than the put call writes".into(),
        )
    }
}
