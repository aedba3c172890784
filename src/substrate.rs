//! Substrate mapping: one row per feature linking it to its dataframe and
//! dataset definitions, under a synthetic root dataframe.
//!
//! The root dataframe is tagged `datasetSdkExecuted: false`: the mapping is
//! derived from the specification alone, not from an executed dataset
//! pipeline.

use serde::Serialize;

use crate::error::{ValidationError, ValidationResult};
use crate::schema_gen::SchemaGeneration;
use crate::specification::Specification;
use crate::validate::{Validate, Validator, checked};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootDataFrame {
    pub id: String,
    pub source: &'static str,
    pub produced_by: &'static str,
    pub dataset_sdk_executed: bool,
}

impl RootDataFrame {
    pub fn for_specification(spec_id: &str) -> Self {
        Self {
            id: format!("gdsl-root-dataframe:{spec_id}"),
            source: "gdsl-specification",
            produced_by: "specification-compiler",
            dataset_sdk_executed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstrateMappingRow {
    pub specification_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub feature_id: String,
    pub feature_struct_id: String,
    pub udt_id: String,
    pub udf_ids: Vec<String>,
    pub dataframe_definition_ref: String,
    pub dataset_definition_ref: String,
    pub origin: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstrateMapping {
    pub root_data_frame: RootDataFrame,
    pub mappings: Vec<SubstrateMappingRow>,
}

/// Join schema generation output with the specification.
///
/// A dataframe definition without a mirrored dataset definition is a broken
/// schema-generation invariant and fails loudly instead of falling back.
pub fn build_substrate_mapping(
    spec: &Specification,
    schema: &SchemaGeneration,
) -> ValidationResult<SubstrateMapping> {
    let mappings = schema
        .dataframe_definitions
        .iter()
        .enumerate()
        .map(|(i, definition)| {
            let dataset = schema.dataset_definition(&definition.feature_id).ok_or_else(|| {
                ValidationError::Invariant {
                    path: format!("$.mappings[{i}].datasetDefinitionRef"),
                    message: format!(
                        "no dataset definition mirrors {}",
                        definition.reference
                    ),
                }
            })?;
            Ok(SubstrateMappingRow {
                specification_id: spec.id.clone(),
                model_id: spec
                    .feature(&definition.feature_id)
                    .and_then(|f| f.model_id.clone()),
                feature_id: definition.feature_id.clone(),
                feature_struct_id: definition.feature_struct_id.clone(),
                udt_id: definition.udt_id.clone(),
                udf_ids: definition.udf_ids.clone(),
                dataframe_definition_ref: definition.reference.clone(),
                dataset_definition_ref: dataset.reference.clone(),
                origin: "sdsl-specification",
            })
        })
        .collect::<ValidationResult<Vec<_>>>()?;

    tracing::debug!(spec = %spec.id, rows = mappings.len(), "substrate mapping built");

    checked(SubstrateMapping {
        root_data_frame: RootDataFrame::for_specification(&spec.id),
        mappings,
    })
}

impl Validate for RootDataFrame {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("id", &self.id)?;
        v.invariant("datasetSdkExecuted", !self.dataset_sdk_executed, || {
            "root dataframe must come from the specification, not an executed SDK".into()
        })
    }
}

impl Validate for SubstrateMappingRow {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("specificationId", &self.specification_id)?;
        v.non_empty_opt("modelId", self.model_id.as_deref())?;
        v.non_empty("featureId", &self.feature_id)?;
        v.non_empty("featureStructId", &self.feature_struct_id)?;
        v.non_empty("udtId", &self.udt_id)?;
        v.non_empty_strings("udfIds", &self.udf_ids)?;
        v.non_empty("dataframeDefinitionRef", &self.dataframe_definition_ref)?;
        v.non_empty("datasetDefinitionRef", &self.dataset_definition_ref)
    }
}

impl Validate for SubstrateMapping {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.nested("rootDataFrame", &self.root_data_frame)?;
        v.each("mappings", &self.mappings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_gen::build_schema_generation;
    use crate::specification::{EngineSpec, Feature, Model};

    fn spec() -> Specification {
        Specification {
            id: "crm".into(),
            models: vec![Model {
                id: "m1".into(),
                label: "Customer".into(),
                kind: None,
            }],
            features: vec![
                Feature {
                    id: "f1".into(),
                    label: "Email".into(),
                    model_id: Some("m1".into()),
                    kind: None,
                },
                Feature {
                    id: "f2".into(),
                    label: "Name".into(),
                    model_id: None,
                    kind: None,
                },
            ],
            ontologies: Vec::new(),
            udts: Vec::new(),
            udfs: Vec::new(),
            engine: EngineSpec {
                logical_form: "fol".into(),
                mvc: "react".into(),
            },
        }
    }

    #[test]
    fn one_row_per_feature() {
        let spec = spec();
        let schema = build_schema_generation(&spec).unwrap();
        let mapping = build_substrate_mapping(&spec, &schema).unwrap();

        assert_eq!(mapping.mappings.len(), 2);
        assert_eq!(mapping.root_data_frame.id, "gdsl-root-dataframe:crm");
        assert!(!mapping.root_data_frame.dataset_sdk_executed);

        let row = &mapping.mappings[0];
        assert_eq!(row.model_id.as_deref(), Some("m1"));
        assert_eq!(row.dataframe_definition_ref, "dataframe:def:crm:m1:f1");
        assert_eq!(row.dataset_definition_ref, "dataset:def:crm:m1:f1");
        assert_eq!(row.udt_id, "udt.email");

        assert!(mapping.mappings[1].model_id.is_none());
    }

    #[test]
    fn missing_dataset_definition_fails_loudly() {
        let spec = spec();
        let mut schema = build_schema_generation(&spec).unwrap();
        schema.dataset_definitions.clear();
        let err = build_substrate_mapping(&spec, &schema).unwrap_err();
        assert!(matches!(err, ValidationError::Invariant { .. }));
        assert_eq!(err.path(), "$.mappings[0].datasetDefinitionRef");
    }
}
