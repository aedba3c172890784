//! Compiler facade: top-level API of the SDSL compiler.
//!
//! A compilation validates both inputs, runs schema generation once, feeds its
//! result to every builder that needs it, assembles the bundle and validates
//! the bundle as a whole. The first violation aborts the call; no partial
//! bundle is ever returned.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::dataframe::{DataFramePlan, Stage, build_dataframe_plan};
use crate::design_surface::{DesignSurface, DesignSurfaceProjector, EntityPropertyAspectProjector};
use crate::error::ValidationResult;
use crate::kernel::{KernelArtifacts, Upstream, build_kernel_artifacts};
use crate::mvc::{MvcArtifacts, build_mvc_artifacts};
use crate::ontology_image::{Clock, OntologyImage, SystemClock, build_ontology_image};
use crate::schema_gen::{SchemaGeneration, build_schema_generation};
use crate::sdk::{DatasetSdkGeneration, build_dataset_sdk_generation};
use crate::specification::{CompilerInput, Specification};
use crate::store_contract::{ThreeStoreContract, build_three_store_contract};
use crate::substrate::{SubstrateMapping, build_substrate_mapping};
use crate::validate::{
    Validate, Validator, checked, validate_compiler_input, validate_specification,
};

/// The complete artifact bundle of one compilation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerArtifacts {
    pub specification: Specification,
    pub design_surface: DesignSurface,
    pub dataframe: DataFramePlan,
    pub substrate_mapping: SubstrateMapping,
    pub schema_generation: SchemaGeneration,
    pub dataset_sdk_generation: DatasetSdkGeneration,
    pub ontology_image: OntologyImage,
    pub store_contract: ThreeStoreContract,
    pub kernel: KernelArtifacts,
    pub mvc: MvcArtifacts,
}

/// The SDSL specification compiler.
///
/// Holds the two host-supplied collaborators: the clock stamping ontology
/// provenance and the design-surface projector. Both are shared, so one
/// compiler can serve concurrent compilations.
#[derive(Clone)]
pub struct Compiler {
    clock: Arc<dyn Clock>,
    projector: Arc<dyn DesignSurfaceProjector>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler").finish_non_exhaustive()
    }
}

impl Compiler {
    /// A compiler with the system clock and the default projector.
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            projector: Arc::new(EntityPropertyAspectProjector),
        }
    }

    /// Replace the provenance clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the design-surface projector.
    pub fn with_projector(mut self, projector: Arc<dyn DesignSurfaceProjector>) -> Self {
        self.projector = projector;
        self
    }

    /// Compile typed inputs into a validated artifact bundle.
    pub fn compile(
        &self,
        spec: &Specification,
        input: &CompilerInput,
    ) -> ValidationResult<CompilerArtifacts> {
        let span = tracing::info_span!("compile", spec = %spec.id);
        let _guard = span.enter();

        spec.validate(&mut Validator::new())?;
        input.validate(&mut Validator::new())?;

        let schema_generation = build_schema_generation(spec)?;
        let dataframe = build_dataframe_plan(spec)?;
        let substrate_mapping = build_substrate_mapping(spec, &schema_generation)?;
        let dataset_sdk_generation = build_dataset_sdk_generation(spec, &schema_generation)?;
        let ontology_image = build_ontology_image(spec, self.clock.as_ref())?;
        let store_contract = build_three_store_contract(spec, input)?;
        let kernel = build_kernel_artifacts(
            spec,
            input,
            Upstream {
                schema_generation: &schema_generation,
                substrate_mapping: &substrate_mapping,
                dataset_sdk_generation: &dataset_sdk_generation,
                ontology_image: &ontology_image,
                store_contract: &store_contract,
            },
        )?;
        let mvc = build_mvc_artifacts(spec)?;

        let bundle = checked(CompilerArtifacts {
            specification: spec.clone(),
            design_surface: self.projector.project(spec),
            dataframe,
            substrate_mapping,
            schema_generation,
            dataset_sdk_generation,
            ontology_image,
            store_contract,
            kernel,
            mvc,
        })?;

        tracing::info!(
            features = bundle.schema_generation.dataframe_definitions.len(),
            udts = bundle.schema_generation.generated_udts.len(),
            udfs = bundle.schema_generation.generated_udfs.len(),
            nodes = bundle.kernel.graph_store_put.snapshot.nodes.len(),
            "specification compiled"
        );
        Ok(bundle)
    }

    /// Compile raw JSON inputs, validating them at the boundary first.
    pub fn compile_json(
        &self,
        specification: &Value,
        compiler_input: &Value,
    ) -> ValidationResult<CompilerArtifacts> {
        let spec = validate_specification(specification)?;
        let input = validate_compiler_input(compiler_input)?;
        self.compile(&spec, &input)
    }
}

/// Compile with the system clock and the default projector.
pub fn compile(spec: &Specification, input: &CompilerInput) -> ValidationResult<CompilerArtifacts> {
    Compiler::new().compile(spec, input)
}

/// Compile raw JSON with the system clock and the default projector.
pub fn compile_json(
    specification: &Value,
    compiler_input: &Value,
) -> ValidationResult<CompilerArtifacts> {
    Compiler::new().compile_json(specification, compiler_input)
}

// ---------------------------------------------------------------------------
// Bundle validation
// ---------------------------------------------------------------------------

impl Validate for CompilerArtifacts {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.nested("specification", &self.specification)?;
        v.nested("designSurface", &self.design_surface)?;
        v.nested("dataframe", &self.dataframe)?;
        v.nested("substrateMapping", &self.substrate_mapping)?;
        v.nested("schemaGeneration", &self.schema_generation)?;
        v.nested("datasetSdkGeneration", &self.dataset_sdk_generation)?;
        v.nested("ontologyImage", &self.ontology_image)?;
        v.nested("storeContract", &self.store_contract)?;
        v.nested("kernel", &self.kernel)?;
        v.nested("mvc", &self.mvc)?;

        let features = self.specification.features.len();
        let schema = &self.schema_generation;
        // Mirroring of dataset definitions is checked by the schema generation itself.
        v.field("schemaGeneration", |v| {
            v.invariant(
                "dataframeDefinitions",
                schema.dataframe_definitions.len() == features,
                || {
                    format!(
                        "{} features but {} dataframe definitions",
                        features,
                        schema.dataframe_definitions.len()
                    )
                },
            )
        })?;

        v.invariant(
            "substrateMapping",
            self.substrate_mapping.mappings.len() == features,
            || "substrate mapping does not cover every feature".into(),
        )?;
        v.invariant(
            "dataframe",
            self.dataframe.steps.len() == features * Stage::ALL.len(),
            || "dataframe plan does not lower every feature through every stage".into(),
        )?;

        let snapshot = &self.kernel.graph_store_put.snapshot;
        v.invariant(
            "kernel",
            snapshot.nodes.len() == 1 + self.specification.models.len() + features,
            || "graph snapshot node count does not match the specification".into(),
        )?;

        let embedded = &self.kernel.form_eval_evaluate.artifacts;
        v.invariant(
            "kernel",
            embedded.schema_generation == self.schema_generation
                && embedded.substrate_mapping == self.substrate_mapping
                && embedded.dataset_sdk_generation == self.dataset_sdk_generation
                && embedded.ontology_image == self.ontology_image
                && embedded.store_contract == self.store_contract,
            || "kernel artifacts embed values that differ from the bundle".into(),
        )
    }
}
