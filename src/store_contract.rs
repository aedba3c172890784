//! Three-store contract: form catalog, fact store, knowledge store.
//!
//! Only the URIs are derived, from the specification id and the optional
//! graph names of the compilation context:
//!
//! | ref | template |
//! |---|---|
//! | form catalog | `neo4j://formdb/specifications/<id>` |
//! | fact graph | `neo4j://factstore/<graphName or sdsl-spec-<id>>` |
//! | fact grounds | `postgres://fact_grounds/<id>` |
//! | knowledge store | `<outputGraphName or sdsl-spec-<id>-knowledge-store>` |
//!
//! Everything else describes the fixed storage architecture.

use serde::Serialize;

use crate::error::ValidationResult;
use crate::sdk::{AgentMonitoring, DRAGONSEED_SDK_REF, DataAccessPolicy};
use crate::specification::{CompilerInput, Specification};
use crate::validate::{Validate, Validator, checked};

/// Default fact graph name when the context does not name one.
pub fn default_graph_name(spec_id: &str) -> String {
    format!("sdsl-spec-{spec_id}")
}

/// Default knowledge-store target when the context does not name one.
pub fn default_knowledge_store_name(spec_id: &str) -> String {
    format!("sdsl-spec-{spec_id}-knowledge-store")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormCatalogContract {
    pub backend: &'static str,
    pub list_ref: String,
    pub finite_catalog: bool,
    pub specification_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrismaTemplate {
    pub template_ref: &'static str,
    pub metamodel_ref: &'static str,
    pub scope: &'static str,
}

/// Filesystem-held grounds for binary media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroundsDomain {
    Image,
    Audio,
    Video,
    Binary,
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilesystemGrounds {
    pub enabled: bool,
    pub backend: &'static str,
    #[serde(rename = "ref")]
    pub reference: String,
    pub domains: Vec<GroundsDomain>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KernelCache {
    pub mode: &'static str,
    pub backends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAugmentation {
    pub dragon_seed_sdk_ref: String,
    pub profile: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactStoreContract {
    pub graph_backend: &'static str,
    pub graph_ref: String,
    pub grounds_backend: &'static str,
    pub grounds_ref: String,
    pub grounds_purpose: &'static str,
    pub grounds_domain: &'static str,
    pub unbounded_facticity: bool,
    pub prisma_template: PrismaTemplate,
    pub postgres_role: &'static str,
    pub filesystem_grounds: FilesystemGrounds,
    pub kernel_cache: KernelCache,
    pub dataset_augmentation: DatasetAugmentation,
    pub data_access: DataAccessPolicy,
    pub agent_monitoring: AgentMonitoring,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRefs {
    pub form_catalog_ref: String,
    pub fact_graph_ref: String,
    pub fact_grounds_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeStoreContract {
    pub target_ref: String,
    pub compile_mode: &'static str,
    pub source_refs: SourceRefs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeStoreContract {
    pub form_catalog: FormCatalogContract,
    pub fact_store: FactStoreContract,
    pub knowledge_store: KnowledgeStoreContract,
}

pub fn build_three_store_contract(
    spec: &Specification,
    input: &CompilerInput,
) -> ValidationResult<ThreeStoreContract> {
    let id = &spec.id;
    let graph_name = input
        .graph_name
        .clone()
        .unwrap_or_else(|| default_graph_name(id));
    let form_catalog_ref = format!("neo4j://formdb/specifications/{id}");
    let fact_graph_ref = format!("neo4j://factstore/{graph_name}");
    let fact_grounds_ref = format!("postgres://fact_grounds/{id}");
    let target_ref = input
        .output_graph_name
        .clone()
        .unwrap_or_else(|| default_knowledge_store_name(id));

    tracing::debug!(spec = %id, %fact_graph_ref, %target_ref, "three-store contract built");

    checked(ThreeStoreContract {
        form_catalog: FormCatalogContract {
            backend: "neo4j",
            list_ref: form_catalog_ref.clone(),
            finite_catalog: true,
            specification_ids: vec![id.clone()],
        },
        fact_store: FactStoreContract {
            graph_backend: "neo4j",
            graph_ref: fact_graph_ref.clone(),
            grounds_backend: "postgres",
            grounds_ref: fact_grounds_ref.clone(),
            grounds_purpose: "fact-grounds-support",
            grounds_domain: "grounds-and-conditions",
            unbounded_facticity: true,
            prisma_template: PrismaTemplate {
                template_ref: "@organon/factstore-prisma-template",
                metamodel_ref: "prisma.metamodel.factstore.v1",
                scope: "single-factstore-metamodel",
            },
            postgres_role: "grounds-and-conditions-maintenance",
            filesystem_grounds: FilesystemGrounds {
                enabled: true,
                backend: "filesystem",
                reference: format!("file://fact_grounds/{id}"),
                domains: vec![
                    GroundsDomain::Image,
                    GroundsDomain::Audio,
                    GroundsDomain::Video,
                    GroundsDomain::Binary,
                    GroundsDomain::Document,
                ],
            },
            kernel_cache: KernelCache {
                mode: "polyglot-dataset-cache",
                backends: vec![
                    "polars".into(),
                    "duckdb".into(),
                    "postgres".into(),
                    "arrow".into(),
                ],
            },
            dataset_augmentation: DatasetAugmentation {
                dragon_seed_sdk_ref: DRAGONSEED_SDK_REF.into(),
                profile: "sdsl-dataset-analyses",
            },
            data_access: DataAccessPolicy::default(),
            agent_monitoring: AgentMonitoring::default(),
        },
        knowledge_store: KnowledgeStoreContract {
            target_ref,
            compile_mode: "transcendental-logic",
            source_refs: SourceRefs {
                form_catalog_ref,
                fact_graph_ref,
                fact_grounds_ref,
            },
        },
    })
}

impl Validate for FormCatalogContract {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("listRef", &self.list_ref)?;
        v.non_empty_strings("specificationIds", &self.specification_ids)
    }
}

impl Validate for FactStoreContract {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("graphRef", &self.graph_ref)?;
        v.non_empty("groundsRef", &self.grounds_ref)?;
        v.field("filesystemGrounds", |v| {
            v.non_empty("ref", &self.filesystem_grounds.reference)?;
            v.non_empty_list("domains", &self.filesystem_grounds.domains)
        })?;
        v.field("kernelCache", |v| {
            v.non_empty_list("backends", &self.kernel_cache.backends)?;
            v.non_empty_strings("backends", &self.kernel_cache.backends)
        })?;
        v.field("datasetAugmentation", |v| {
            v.non_empty("dragonSeedSdkRef", &self.dataset_augmentation.dragon_seed_sdk_ref)
        })?;
        v.nested("agentMonitoring", &self.agent_monitoring)
    }
}

impl Validate for KnowledgeStoreContract {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("targetRef", &self.target_ref)?;
        v.field("sourceRefs", |v| {
            v.non_empty("formCatalogRef", &self.source_refs.form_catalog_ref)?;
            v.non_empty("factGraphRef", &self.source_refs.fact_graph_ref)?;
            v.non_empty("factGroundsRef", &self.source_refs.fact_grounds_ref)
        })
    }
}

impl Validate for ThreeStoreContract {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.nested("formCatalog", &self.form_catalog)?;
        v.nested("factStore", &self.fact_store)?;
        v.nested("knowledgeStore", &self.knowledge_store)?;
        let refs = &self.knowledge_store.source_refs;
        v.invariant(
            "knowledgeStore",
            refs.form_catalog_ref == self.form_catalog.list_ref
                && refs.fact_graph_ref == self.fact_store.graph_ref
                && refs.fact_grounds_ref == self.fact_store.grounds_ref,
            || "knowledge store sources do not match the catalog and fact store".into(),
        )
    }
}
