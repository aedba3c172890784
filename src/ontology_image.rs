//! Ontology image: a flat tabular projection of the specification.
//!
//! Models, features, ontology constraints and queries become rows; one
//! provenance row records when the image was produced. Ontologies are not
//! scoped per feature, so every model and feature row carries every ontology
//! id in the specification.
//!
//! The provenance timestamp is the only non-deterministic value the compiler
//! emits. It is read from an injected [`Clock`].

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::ValidationResult;
use crate::specification::{ConstraintLanguage, QueryLanguage, Specification};
use crate::validate::{Validate, Validator, checked};

/// Wall-clock source for provenance timestamps.
pub trait Clock: Send + Sync {
    /// Milliseconds since the UNIX epoch.
    fn now_unix_ms(&self) -> u64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// A clock pinned to one instant, for reproducible builds and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_unix_ms(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRow {
    pub model_id: String,
    pub label: String,
    pub kind: String,
    pub ontology_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRow {
    pub feature_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub label: String,
    pub kind: String,
    pub ontology_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintRow {
    pub ontology_id: String,
    pub constraint_id: String,
    pub language: ConstraintLanguage,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRow {
    pub ontology_id: String,
    pub query_id: String,
    pub language: QueryLanguage,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceRow {
    pub source: &'static str,
    pub specification_id: String,
    pub runtime_mode: &'static str,
    pub substrate: &'static str,
    pub generated_at_unix_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OntologyTables {
    pub models: Vec<ModelRow>,
    pub features: Vec<FeatureRow>,
    pub constraints: Vec<ConstraintRow>,
    pub queries: Vec<QueryRow>,
    pub provenance: Vec<ProvenanceRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OntologyImage {
    pub image_id: String,
    pub engine: &'static str,
    pub tables: OntologyTables,
}

pub fn build_ontology_image(
    spec: &Specification,
    clock: &dyn Clock,
) -> ValidationResult<OntologyImage> {
    let ontology_ids = spec.ontology_ids();

    let models = spec
        .models
        .iter()
        .map(|m| ModelRow {
            model_id: m.id.clone(),
            label: m.label.clone(),
            kind: m.kind().to_string(),
            ontology_ids: ontology_ids.clone(),
        })
        .collect();

    let features = spec
        .features
        .iter()
        .map(|f| FeatureRow {
            feature_id: f.id.clone(),
            model_id: f.model_id.clone(),
            label: f.label.clone(),
            kind: f.kind().to_string(),
            ontology_ids: ontology_ids.clone(),
        })
        .collect();

    let constraints = spec
        .ontologies
        .iter()
        .flat_map(|o| {
            o.constraints.iter().map(|c| ConstraintRow {
                ontology_id: o.id.clone(),
                constraint_id: c.id.clone(),
                language: c.language,
                text: c.text.clone(),
            })
        })
        .collect();

    let queries = spec
        .ontologies
        .iter()
        .flat_map(|o| {
            o.queries.iter().map(|q| QueryRow {
                ontology_id: o.id.clone(),
                query_id: q.id.clone(),
                language: q.language,
                text: q.text.clone(),
            })
        })
        .collect();

    let generated_at_unix_ms = clock.now_unix_ms();
    tracing::debug!(spec = %spec.id, generated_at_unix_ms, "ontology image built");

    checked(OntologyImage {
        image_id: format!("ontology-image:{}", spec.id),
        engine: "polars",
        tables: OntologyTables {
            models,
            features,
            constraints,
            queries,
            provenance: vec![ProvenanceRow {
                source: "gdsl/sdsl",
                specification_id: spec.id.clone(),
                runtime_mode: "transcendental-logic",
                substrate: "dataframe/dataset",
                generated_at_unix_ms,
            }],
        },
    })
}

impl Validate for ModelRow {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("modelId", &self.model_id)?;
        v.non_empty("label", &self.label)?;
        v.non_empty("kind", &self.kind)?;
        v.non_empty_strings("ontologyIds", &self.ontology_ids)
    }
}

impl Validate for FeatureRow {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("featureId", &self.feature_id)?;
        v.non_empty_opt("modelId", self.model_id.as_deref())?;
        v.non_empty("label", &self.label)?;
        v.non_empty("kind", &self.kind)?;
        v.non_empty_strings("ontologyIds", &self.ontology_ids)
    }
}

impl Validate for ConstraintRow {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("ontologyId", &self.ontology_id)?;
        v.non_empty("constraintId", &self.constraint_id)?;
        v.non_empty("text", &self.text)
    }
}

impl Validate for QueryRow {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("ontologyId", &self.ontology_id)?;
        v.non_empty("queryId", &self.query_id)?;
        v.non_empty("text", &self.text)
    }
}

impl Validate for ProvenanceRow {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("specificationId", &self.specification_id)
    }
}

impl Validate for OntologyImage {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("imageId", &self.image_id)?;
        v.field("tables", |v| {
            v.each("models", &self.tables.models)?;
            v.each("features", &self.tables.features)?;
            v.each("constraints", &self.tables.constraints)?;
            v.each("queries", &self.tables.queries)?;
            v.each("provenance", &self.tables.provenance)
        })
    }
}
