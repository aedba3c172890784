//! Dataset SDK generation descriptor.
//!
//! Exposes every generated UDF as an NLP processor capability, next to four
//! baseline capabilities (tokenize, embed, extract, classify) that exist
//! regardless of specification content. Capabilities are merged by id with
//! [`prefer_udf_over_baseline`].

use serde::Serialize;

use crate::error::ValidationResult;
use crate::schema_gen::{GeneratedUdf, SchemaGeneration};
use crate::specification::{Specification, UdfSemantics};
use crate::validate::{Validate, Validator, checked};

pub const DRAGONSEED_SDK_REF: &str = "@organon/dragonseed-sdsl-sdk";

/// Operation a capability performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityOperation {
    Tokenize,
    Embed,
    Extract,
    Classify,
    Normalize,
    Validate,
    Enrich,
    Project,
}

impl From<UdfSemantics> for CapabilityOperation {
    fn from(semantics: UdfSemantics) -> Self {
        match semantics {
            UdfSemantics::Validate => Self::Validate,
            UdfSemantics::Normalize => Self::Normalize,
            UdfSemantics::Enrich => Self::Enrich,
            UdfSemantics::Project => Self::Project,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NlpCapability {
    pub id: String,
    pub operation: CapabilityOperation,
    pub implementation_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udf_id: Option<String>,
}

impl NlpCapability {
    fn baseline(name: &str, operation: CapabilityOperation) -> Self {
        Self {
            id: format!("nlp.capability:{name}"),
            operation,
            implementation_ref: format!("nlp://processor/{name}"),
            udf_id: None,
        }
    }
}

impl From<&GeneratedUdf> for NlpCapability {
    fn from(udf: &GeneratedUdf) -> Self {
        Self {
            id: format!("nlp.capability:{}", udf.id),
            operation: udf.semantics.into(),
            implementation_ref: udf.implementation_ref.clone(),
            udf_id: Some(udf.id.clone()),
        }
    }
}

/// The capabilities every SDK carries.
pub fn baseline_capabilities() -> Vec<NlpCapability> {
    vec![
        NlpCapability::baseline("tokenize", CapabilityOperation::Tokenize),
        NlpCapability::baseline("embed", CapabilityOperation::Embed),
        NlpCapability::baseline("extract", CapabilityOperation::Extract),
        NlpCapability::baseline("classify", CapabilityOperation::Classify),
    ]
}

/// Merge UDF-derived capabilities into the baseline, deduplicating by id.
///
/// Baseline entries come first, then UDF-derived ones in UDF order. On an id
/// collision the UDF-derived capability replaces the existing entry in place,
/// so the position of an id is fixed by its first appearance. Among UDFs with
/// the same derived id, the last one wins.
pub fn prefer_udf_over_baseline(
    baseline: Vec<NlpCapability>,
    derived: impl IntoIterator<Item = NlpCapability>,
) -> Vec<NlpCapability> {
    let mut merged: Vec<NlpCapability> = Vec::with_capacity(baseline.len());
    for capability in baseline.into_iter().chain(derived) {
        match merged.iter_mut().find(|c| c.id == capability.id) {
            Some(slot) => *slot = capability,
            None => merged.push(capability),
        }
    }
    merged
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolarsAccess {
    pub postgres: &'static str,
    pub filesystem: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KernelAccess {
    pub neo4j: &'static str,
    pub postgres: &'static str,
    pub filesystem: &'static str,
}

/// Which engine may reach which backend, and how directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataAccessPolicy {
    pub polars: PolarsAccess,
    pub kernel: KernelAccess,
}

impl Default for DataAccessPolicy {
    fn default() -> Self {
        Self {
            polars: PolarsAccess {
                postgres: "partial-direct",
                filesystem: "partial-direct",
            },
            kernel: KernelAccess {
                neo4j: "direct",
                postgres: "direct",
                filesystem: "direct",
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentMonitoring {
    pub enabled: bool,
    pub scope: &'static str,
    pub channels: Vec<String>,
}

impl Default for AgentMonitoring {
    fn default() -> Self {
        Self {
            enabled: true,
            scope: "factstore-structure-observability",
            channels: vec![
                "agent-runtime".into(),
                "dataset-health".into(),
                "cache-health".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragonSeedAugmentation {
    pub enabled: bool,
    pub sdk_ref: String,
    pub analyses: Vec<String>,
}

impl Default for DragonSeedAugmentation {
    fn default() -> Self {
        Self {
            enabled: true,
            sdk_ref: DRAGONSEED_SDK_REF.into(),
            analyses: vec![
                "entity-extraction".into(),
                "relation-extraction".into(),
                "semantic-classification".into(),
                "feature-enrichment".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NlpProcessor {
    pub mode: &'static str,
    pub capabilities: Vec<NlpCapability>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSdkGeneration {
    pub role: &'static str,
    pub language: &'static str,
    pub package_ref: String,
    pub fact_store_target: &'static str,
    pub schema_mappings_ref: &'static str,
    pub data_access: DataAccessPolicy,
    pub dragon_seed_augmentation: DragonSeedAugmentation,
    pub agent_monitoring: AgentMonitoring,
    pub nlp_processor: NlpProcessor,
}

pub fn build_dataset_sdk_generation(
    spec: &Specification,
    schema: &SchemaGeneration,
) -> ValidationResult<DatasetSdkGeneration> {
    let capabilities = prefer_udf_over_baseline(
        baseline_capabilities(),
        schema.generated_udfs.iter().map(NlpCapability::from),
    );
    tracing::debug!(
        spec = %spec.id,
        capabilities = capabilities.len(),
        "dataset sdk descriptor built"
    );

    checked(DatasetSdkGeneration {
        role: "sdsl-sdk-generator",
        language: "typescript",
        package_ref: format!("@organon/sdsl-sdk-{}", spec.id),
        fact_store_target: "sdsl-factstore",
        schema_mappings_ref: "substrateMapping",
        data_access: DataAccessPolicy::default(),
        dragon_seed_augmentation: DragonSeedAugmentation::default(),
        agent_monitoring: AgentMonitoring::default(),
        nlp_processor: NlpProcessor {
            mode: "nlp-driven",
            capabilities,
        },
    })
}

impl Validate for NlpCapability {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("id", &self.id)?;
        v.non_empty("implementationRef", &self.implementation_ref)?;
        v.non_empty_opt("udfId", self.udf_id.as_deref())
    }
}

impl Validate for AgentMonitoring {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty_list("channels", &self.channels)?;
        v.non_empty_strings("channels", &self.channels)
    }
}

impl Validate for DragonSeedAugmentation {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("sdkRef", &self.sdk_ref)?;
        v.non_empty_list("analyses", &self.analyses)?;
        v.non_empty_strings("analyses", &self.analyses)
    }
}

impl Validate for DatasetSdkGeneration {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("packageRef", &self.package_ref)?;
        v.nested("dragonSeedAugmentation", &self.dragon_seed_augmentation)?;
        v.nested("agentMonitoring", &self.agent_monitoring)?;
        v.field("nlpProcessor", |v| {
            let caps = &self.nlp_processor.capabilities;
            v.each("capabilities", caps)?;
            for (i, cap) in caps.iter().enumerate() {
                v.invariant("capabilities", !caps[..i].iter().any(|c| c.id == cap.id), || {
                    format!("duplicate capability id {}", cap.id)
                })?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_gen::Origin;

    fn udf(id: &str, semantics: UdfSemantics) -> GeneratedUdf {
        GeneratedUdf {
            id: id.into(),
            label: id.into(),
            input_udt_id: "udt.string".into(),
            output_type: "string".into(),
            implementation_ref: format!("udf://{id}"),
            semantics,
            source: Origin::SpecDeclared,
        }
    }

    #[test]
    fn baseline_is_always_present() {
        let merged = prefer_udf_over_baseline(baseline_capabilities(), Vec::new());
        let ids: Vec<_> = merged.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "nlp.capability:tokenize",
                "nlp.capability:embed",
                "nlp.capability:extract",
                "nlp.capability:classify",
            ]
        );
    }

    #[test]
    fn udf_capabilities_follow_baseline() {
        let derived = [udf("udf.email.normalize", UdfSemantics::Normalize)];
        let merged =
            prefer_udf_over_baseline(baseline_capabilities(), derived.iter().map(NlpCapability::from));
        assert_eq!(merged.len(), 5);
        let last = merged.last().unwrap();
        assert_eq!(last.id, "nlp.capability:udf.email.normalize");
        assert_eq!(last.operation, CapabilityOperation::Normalize);
        assert_eq!(last.udf_id.as_deref(), Some("udf.email.normalize"));
    }

    #[test]
    fn udf_wins_collision_with_baseline_in_place() {
        let derived = [udf("embed", UdfSemantics::Enrich)];
        let merged =
            prefer_udf_over_baseline(baseline_capabilities(), derived.iter().map(NlpCapability::from));
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[1].id, "nlp.capability:embed");
        assert_eq!(merged[1].operation, CapabilityOperation::Enrich);
        assert_eq!(merged[1].implementation_ref, "udf://embed");
    }

    #[test]
    fn duplicate_capability_ids_fail_validation() {
        let mut sdk = DatasetSdkGeneration {
            role: "sdsl-sdk-generator",
            language: "typescript",
            package_ref: "@organon/sdsl-sdk-x".into(),
            fact_store_target: "sdsl-factstore",
            schema_mappings_ref: "substrateMapping",
            data_access: DataAccessPolicy::default(),
            dragon_seed_augmentation: DragonSeedAugmentation::default(),
            agent_monitoring: AgentMonitoring::default(),
            nlp_processor: NlpProcessor {
                mode: "nlp-driven",
                capabilities: baseline_capabilities(),
            },
        };
        sdk.nlp_processor
            .capabilities
            .push(NlpCapability::baseline("embed", CapabilityOperation::Embed));
        let err = checked(sdk).unwrap_err();
        assert_eq!(err.path(), "$.nlpProcessor.capabilities");
    }
}
