//! Schema generation: UDT/UDF inference and per-feature field definitions.
//!
//! Declared types and functions are carried through unchanged and tagged
//! `spec-declared`. Missing ones are synthesized from feature names and tagged
//! `spec-inferred`:
//!
//! - `udt.string` whenever at least one feature exists, as the fallback type
//! - `udt.email`, `udf.email.normalize`, `udf.email.validate` whenever some
//!   feature id or label mentions "email"
//!
//! Every synthesis is guarded by an existence check, so inference over an
//! already augmented catalog changes nothing.
//!
//! Each feature then gets a dataframe definition with the deterministic ref
//! `dataframe:def:<specId>:<modelId|global>:<featureId>`, mirrored 1:1 into a
//! dataset definition under the `dataset:def:` prefix.

use serde::Serialize;

use crate::error::ValidationResult;
use crate::specification::{
    BaseType, Feature, Specification, UdfSemantics, UdfSpec, UdtSpec,
};
use crate::validate::{Validate, Validator, checked};

pub const STRING_UDT_ID: &str = "udt.string";
pub const EMAIL_UDT_ID: &str = "udt.email";
pub const EMAIL_NORMALIZE_UDF_ID: &str = "udf.email.normalize";
pub const EMAIL_VALIDATE_UDF_ID: &str = "udf.email.validate";

pub const DATAFRAME_DEF_PREFIX: &str = "dataframe:def:";
pub const DATASET_DEF_PREFIX: &str = "dataset:def:";

/// Whether a type or function was declared or synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    SpecDeclared,
    SpecInferred,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedUdt {
    pub id: String,
    pub label: String,
    pub base_type: BaseType,
    pub source: Origin,
}

impl From<&UdtSpec> for GeneratedUdt {
    fn from(udt: &UdtSpec) -> Self {
        Self {
            id: udt.id.clone(),
            label: udt.label.clone(),
            base_type: udt.base_type,
            source: Origin::SpecDeclared,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedUdf {
    pub id: String,
    pub label: String,
    pub input_udt_id: String,
    pub output_type: String,
    pub implementation_ref: String,
    pub semantics: UdfSemantics,
    pub source: Origin,
}

impl From<&UdfSpec> for GeneratedUdf {
    fn from(udf: &UdfSpec) -> Self {
        Self {
            id: udf.id.clone(),
            label: udf.label.clone(),
            input_udt_id: udf.input_udt_id.clone(),
            output_type: udf.output_type.clone(),
            implementation_ref: udf.implementation_ref.clone(),
            semantics: udf.semantics,
            source: Origin::SpecDeclared,
        }
    }
}

/// Per-feature field definition. The same shape serves dataframe and
/// dataset definitions; only the `ref` prefix differs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub feature_id: String,
    pub feature_struct_id: String,
    pub udt_id: String,
    pub udf_ids: Vec<String>,
    #[serde(rename = "ref")]
    pub reference: String,
}

/// Output of the schema generation engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaGeneration {
    pub strategy: &'static str,
    pub target: &'static str,
    pub root_data_frame_produced_by_dataset_sdk: bool,
    pub generated_udts: Vec<GeneratedUdt>,
    pub generated_udfs: Vec<GeneratedUdf>,
    pub dataframe_definitions: Vec<FieldDefinition>,
    pub dataset_definitions: Vec<FieldDefinition>,
}

impl SchemaGeneration {
    /// Dataset definition mirroring the dataframe definition of `feature_id`.
    pub fn dataset_definition(&self, feature_id: &str) -> Option<&FieldDefinition> {
        self.dataset_definitions
            .iter()
            .find(|d| d.feature_id == feature_id)
    }
}

/// The merged set of declared and inferred types and functions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeCatalog {
    pub udts: Vec<GeneratedUdt>,
    pub udfs: Vec<GeneratedUdf>,
}

impl TypeCatalog {
    /// Seed the catalog with the specification's declarations.
    pub fn declared(spec: &Specification) -> Self {
        Self {
            udts: spec.udts.iter().map(GeneratedUdt::from).collect(),
            udfs: spec.udfs.iter().map(GeneratedUdf::from).collect(),
        }
    }

    pub fn has_udt(&self, id: &str) -> bool {
        self.udts.iter().any(|u| u.id == id)
    }

    pub fn has_udf(&self, id: &str) -> bool {
        self.udfs.iter().any(|u| u.id == id)
    }

    fn insert_udt(&mut self, id: &str, label: &str) {
        if !self.has_udt(id) {
            self.udts.push(GeneratedUdt {
                id: id.into(),
                label: label.into(),
                base_type: BaseType::String,
                source: Origin::SpecInferred,
            });
        }
    }

    fn insert_udf(
        &mut self,
        id: &str,
        label: &str,
        output_type: &str,
        implementation_ref: &str,
        semantics: UdfSemantics,
    ) {
        if !self.has_udf(id) {
            self.udfs.push(GeneratedUdf {
                id: id.into(),
                label: label.into(),
                input_udt_id: EMAIL_UDT_ID.into(),
                output_type: output_type.into(),
                implementation_ref: implementation_ref.into(),
                semantics,
                source: Origin::SpecInferred,
            });
        }
    }

    /// Synthesize the fallback and email types/functions the features need.
    ///
    /// Idempotent: a second call with the same features is a no-op.
    pub fn infer(&mut self, features: &[Feature]) {
        if !features.is_empty() {
            self.insert_udt(STRING_UDT_ID, "String");
        }
        if features.iter().any(Feature::is_email_like) {
            self.insert_udt(EMAIL_UDT_ID, "Email");
            self.insert_udf(
                EMAIL_NORMALIZE_UDF_ID,
                "Normalize Email",
                "string",
                "udf://email/normalize",
                UdfSemantics::Normalize,
            );
            self.insert_udf(
                EMAIL_VALIDATE_UDF_ID,
                "Validate Email",
                "boolean",
                "udf://email/validate",
                UdfSemantics::Validate,
            );
        }
    }

    /// Ids of all functions consuming `udt_id`, in catalog order.
    pub fn udf_ids_for(&self, udt_id: &str) -> Vec<String> {
        self.udfs
            .iter()
            .filter(|u| u.input_udt_id == udt_id)
            .map(|u| u.id.clone())
            .collect()
    }
}

/// `dataframe:def:<specId>:<scope>:<featureId>`
pub fn dataframe_ref(spec_id: &str, scope: &str, feature_id: &str) -> String {
    format!("{DATAFRAME_DEF_PREFIX}{spec_id}:{scope}:{feature_id}")
}

/// Swap the `dataframe:def:` prefix of a ref for `dataset:def:`.
pub fn dataset_ref(dataframe_ref: &str) -> String {
    dataframe_ref.replacen(DATAFRAME_DEF_PREFIX, DATASET_DEF_PREFIX, 1)
}

/// Resolve the UDT of a feature: explicit binding, then email, then string.
fn resolve_udt_id(spec: &Specification, feature: &Feature) -> String {
    if let Some(explicit) = spec
        .udts
        .iter()
        .find(|u| u.feature_id.as_deref() == Some(feature.id.as_str()))
    {
        return explicit.id.clone();
    }
    if feature.is_email_like() {
        EMAIL_UDT_ID.into()
    } else {
        STRING_UDT_ID.into()
    }
}

/// Run schema generation over a validated specification.
pub fn build_schema_generation(spec: &Specification) -> ValidationResult<SchemaGeneration> {
    let mut catalog = TypeCatalog::declared(spec);
    catalog.infer(&spec.features);

    let dataframe_definitions: Vec<FieldDefinition> = spec
        .features
        .iter()
        .map(|feature| {
            let udt_id = resolve_udt_id(spec, feature);
            FieldDefinition {
                feature_id: feature.id.clone(),
                feature_struct_id: format!("feature-struct:{}", feature.id),
                udf_ids: catalog.udf_ids_for(&udt_id),
                udt_id,
                reference: dataframe_ref(&spec.id, feature.model_scope(), &feature.id),
            }
        })
        .collect();

    let dataset_definitions = dataframe_definitions
        .iter()
        .map(|d| FieldDefinition {
            reference: dataset_ref(&d.reference),
            ..d.clone()
        })
        .collect();

    tracing::debug!(
        spec = %spec.id,
        udts = catalog.udts.len(),
        udfs = catalog.udfs.len(),
        definitions = dataframe_definitions.len(),
        "schema generation complete"
    );

    checked(SchemaGeneration {
        strategy: "model-to-dataframe-schema-generator",
        target: "gdsl-transcendental-logic",
        root_data_frame_produced_by_dataset_sdk: false,
        generated_udts: catalog.udts,
        generated_udfs: catalog.udfs,
        dataframe_definitions,
        dataset_definitions,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Validate for GeneratedUdt {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("id", &self.id)?;
        v.non_empty("label", &self.label)
    }
}

impl Validate for GeneratedUdf {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("id", &self.id)?;
        v.non_empty("label", &self.label)?;
        v.non_empty("inputUdtId", &self.input_udt_id)?;
        v.non_empty("outputType", &self.output_type)?;
        v.non_empty("implementationRef", &self.implementation_ref)
    }
}

impl Validate for FieldDefinition {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("featureId", &self.feature_id)?;
        v.non_empty("featureStructId", &self.feature_struct_id)?;
        v.non_empty("udtId", &self.udt_id)?;
        v.non_empty_strings("udfIds", &self.udf_ids)?;
        v.non_empty("ref", &self.reference)
    }
}

impl Validate for SchemaGeneration {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.each("generatedUdts", &self.generated_udts)?;
        v.each("generatedUdfs", &self.generated_udfs)?;
        v.each("dataframeDefinitions", &self.dataframe_definitions)?;
        v.each("datasetDefinitions", &self.dataset_definitions)?;

        v.invariant(
            "datasetDefinitions",
            self.dataset_definitions.len() == self.dataframe_definitions.len(),
            || {
                format!(
                    "{} dataset definitions for {} dataframe definitions",
                    self.dataset_definitions.len(),
                    self.dataframe_definitions.len()
                )
            },
        )?;
        for (df, ds) in self
            .dataframe_definitions
            .iter()
            .zip(&self.dataset_definitions)
        {
            v.invariant("datasetDefinitions", ds.reference == dataset_ref(&df.reference), || {
                format!("{} does not mirror {}", ds.reference, df.reference)
            })?;
        }
        for def in &self.dataframe_definitions {
            v.invariant(
                "dataframeDefinitions",
                self.generated_udts.iter().any(|u| u.id == def.udt_id),
                || format!("feature {} uses unknown type {}", def.feature_id, def.udt_id),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::EngineSpec;

    fn feature(id: &str, label: &str, model_id: Option<&str>) -> Feature {
        Feature {
            id: id.into(),
            label: label.into(),
            model_id: model_id.map(Into::into),
            kind: None,
        }
    }

    fn spec(features: Vec<Feature>) -> Specification {
        Specification {
            id: "crm".into(),
            models: Vec::new(),
            features,
            ontologies: Vec::new(),
            udts: Vec::new(),
            udfs: Vec::new(),
            engine: EngineSpec {
                logical_form: "fol".into(),
                mvc: "react".into(),
            },
        }
    }

    fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
        items.iter().map(|i| id(i).to_string()).collect()
    }

    #[test]
    fn no_features_means_no_inference() {
        let sg = build_schema_generation(&spec(Vec::new())).unwrap();
        assert!(sg.generated_udts.is_empty());
        assert!(sg.generated_udfs.is_empty());
        assert!(sg.dataframe_definitions.is_empty());
    }

    #[test]
    fn email_feature_synthesizes_email_catalog() {
        let sg = build_schema_generation(&spec(vec![
            feature("f1", "Email", Some("m1")),
            feature("f2", "Name", None),
        ]))
        .unwrap();

        assert_eq!(
            ids(&sg.generated_udts, |u| &u.id),
            vec![STRING_UDT_ID, EMAIL_UDT_ID]
        );
        assert_eq!(
            ids(&sg.generated_udfs, |u| &u.id),
            vec![EMAIL_NORMALIZE_UDF_ID, EMAIL_VALIDATE_UDF_ID]
        );
        assert!(sg.generated_udts.iter().all(|u| u.source == Origin::SpecInferred));

        let email = &sg.dataframe_definitions[0];
        assert_eq!(email.udt_id, EMAIL_UDT_ID);
        assert_eq!(email.udf_ids, vec![EMAIL_NORMALIZE_UDF_ID, EMAIL_VALIDATE_UDF_ID]);
        assert_eq!(email.reference, "dataframe:def:crm:m1:f1");

        let name = &sg.dataframe_definitions[1];
        assert_eq!(name.udt_id, STRING_UDT_ID);
        assert!(name.udf_ids.is_empty());
        assert_eq!(name.reference, "dataframe:def:crm:global:f2");
    }

    #[test]
    fn declared_email_catalog_is_not_duplicated() {
        let mut s = spec(vec![feature("email", "Contact", None)]);
        s.udts.push(UdtSpec {
            id: EMAIL_UDT_ID.into(),
            label: "Mail".into(),
            base_type: BaseType::String,
            feature_id: None,
        });
        s.udfs.push(UdfSpec {
            id: EMAIL_NORMALIZE_UDF_ID.into(),
            label: "Mine".into(),
            input_udt_id: EMAIL_UDT_ID.into(),
            output_type: "string".into(),
            implementation_ref: "udf://custom".into(),
            semantics: UdfSemantics::Normalize,
        });
        s.udfs.push(UdfSpec {
            id: EMAIL_VALIDATE_UDF_ID.into(),
            label: "Mine too".into(),
            input_udt_id: EMAIL_UDT_ID.into(),
            output_type: "boolean".into(),
            implementation_ref: "udf://custom/validate".into(),
            semantics: UdfSemantics::Validate,
        });

        let sg = build_schema_generation(&s).unwrap();
        let email_udts = sg.generated_udts.iter().filter(|u| u.id == EMAIL_UDT_ID).count();
        assert_eq!(email_udts, 1);
        assert_eq!(sg.generated_udfs.len(), 2);
        assert!(sg.generated_udfs.iter().all(|u| u.source == Origin::SpecDeclared));
        assert_eq!(sg.generated_udts[0].label, "Mail");
    }

    #[test]
    fn inference_is_idempotent() {
        let features = vec![feature("f1", "Work Email", None), feature("f2", "Age", None)];
        let mut catalog = TypeCatalog::default();
        catalog.infer(&features);
        let once = catalog.clone();
        catalog.infer(&features);
        assert_eq!(catalog, once);
    }

    #[test]
    fn explicit_binding_wins_over_heuristic() {
        let mut s = spec(vec![feature("email", "Email", None)]);
        s.udts.push(UdtSpec {
            id: "udt.contact".into(),
            label: "Contact".into(),
            base_type: BaseType::Json,
            feature_id: Some("email".into()),
        });
        let sg = build_schema_generation(&s).unwrap();
        assert_eq!(sg.dataframe_definitions[0].udt_id, "udt.contact");
        assert!(sg.dataframe_definitions[0].udf_ids.is_empty());
    }

    #[test]
    fn dataset_definitions_mirror_dataframe_definitions() {
        let sg = build_schema_generation(&spec(vec![
            feature("a", "A", Some("m")),
            feature("b", "B", None),
        ]))
        .unwrap();
        assert_eq!(sg.dataset_definitions.len(), sg.dataframe_definitions.len());
        for (df, ds) in sg.dataframe_definitions.iter().zip(&sg.dataset_definitions) {
            assert_eq!(ds.reference, df.reference.replace("dataframe:def:", "dataset:def:"));
            assert_eq!(ds.udt_id, df.udt_id);
            assert_eq!(ds.udf_ids, df.udf_ids);
        }
    }

    #[test]
    fn broken_mirror_fails_validation() {
        let mut sg = build_schema_generation(&spec(vec![feature("a", "A", None)])).unwrap();
        sg.dataset_definitions[0].reference = "dataset:def:other".into();
        let err = checked(sg).unwrap_err();
        assert_eq!(err.path(), "$.datasetDefinitions");
    }

    #[test]
    fn origin_serializes_kebab_case() {
        let s = serde_json::to_string(&Origin::SpecInferred).unwrap();
        assert_eq!(s, "\"spec-inferred\"");
    }
}
