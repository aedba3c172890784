//! Input data model: the SDSL specification and the compilation context.
//!
//! A [`Specification`] is created externally and never mutated by the
//! compiler. Every derived artifact that varies per feature is keyed by
//! [`Feature::id`]; features reference their owning model weakly through
//! `model_id`, and unresolved references are tolerated.

use serde::{Deserialize, Serialize};

use crate::error::ValidationResult;
use crate::validate::{Validate, Validator};

/// Scope used in derived identifiers for features without a model.
pub const GLOBAL_SCOPE: &str = "global";

/// The validated domain specification, the unit of compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specification {
    /// Primary key of the whole compilation.
    pub id: String,
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub ontologies: Vec<Ontology>,
    #[serde(default)]
    pub udts: Vec<UdtSpec>,
    #[serde(default)]
    pub udfs: Vec<UdfSpec>,
    pub engine: EngineSpec,
}

impl Specification {
    /// Look up a feature by id.
    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    /// Features whose `model_id` names `model_id`, in specification order.
    pub fn features_of<'a>(&'a self, model_id: &'a str) -> impl Iterator<Item = &'a Feature> + 'a {
        self.features
            .iter()
            .filter(move |f| f.model_id.as_deref() == Some(model_id))
    }

    /// Ids of all ontologies, in specification order.
    pub fn ontology_ids(&self) -> Vec<String> {
        self.ontologies.iter().map(|o| o.id.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Model {
    /// Declared kind, defaulting to `"model"`.
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("model")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Feature {
    /// Declared kind, defaulting to `"feature"`.
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("feature")
    }

    /// Owning model id, or [`GLOBAL_SCOPE`].
    pub fn model_scope(&self) -> &str {
        self.model_id.as_deref().unwrap_or(GLOBAL_SCOPE)
    }

    /// Whether the id or label mentions "email" (case-insensitive).
    pub fn is_email_like(&self) -> bool {
        contains_email(&self.id) || contains_email(&self.label)
    }
}

fn contains_email(value: &str) -> bool {
    value.to_lowercase().contains("email")
}

/// Primitive carrier of a user-defined type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    String,
    Number,
    Boolean,
    Datetime,
    Json,
}

/// A declared user-defined type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UdtSpec {
    pub id: String,
    pub label: String,
    pub base_type: BaseType,
    /// Explicit binding to a feature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
}

/// What a user-defined function does to its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UdfSemantics {
    Validate,
    Normalize,
    Enrich,
    Project,
}

/// A declared user-defined function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UdfSpec {
    pub id: String,
    pub label: String,
    pub input_udt_id: String,
    pub output_type: String,
    /// Opaque URI of the implementation.
    pub implementation_ref: String,
    pub semantics: UdfSemantics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintLanguage {
    Shacl,
    Owl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLanguage {
    Sparql,
    Cypher,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyConstraint {
    pub id: String,
    pub language: ConstraintLanguage,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyQuery {
    pub id: String,
    pub language: QueryLanguage,
    pub text: String,
}

/// An ontology: constraints and queries over the whole specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ontology {
    pub id: String,
    pub profile: String,
    #[serde(default)]
    pub constraints: Vec<OntologyConstraint>,
    #[serde(default)]
    pub queries: Vec<OntologyQuery>,
}

/// Engine tags: the logical form the kernel runs and the MVC adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSpec {
    pub logical_form: String,
    pub mvc: String,
}

// ---------------------------------------------------------------------------
// Compilation context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Per-call compilation context. Pure configuration, no identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerInput {
    pub user: User,
    pub database_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_graph_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Validate for Specification {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("id", &self.id)?;
        v.each("models", &self.models)?;
        v.each("features", &self.features)?;
        v.each("ontologies", &self.ontologies)?;
        v.each("udts", &self.udts)?;
        v.each("udfs", &self.udfs)?;
        v.nested("engine", &self.engine)
    }
}

impl Validate for Model {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("id", &self.id)?;
        v.non_empty("label", &self.label)?;
        v.non_empty_opt("kind", self.kind.as_deref())
    }
}

impl Validate for Feature {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("id", &self.id)?;
        v.non_empty("label", &self.label)?;
        v.non_empty_opt("modelId", self.model_id.as_deref())?;
        v.non_empty_opt("kind", self.kind.as_deref())
    }
}

impl Validate for UdtSpec {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("id", &self.id)?;
        v.non_empty("label", &self.label)?;
        v.non_empty_opt("featureId", self.feature_id.as_deref())
    }
}

impl Validate for UdfSpec {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("id", &self.id)?;
        v.non_empty("label", &self.label)?;
        v.non_empty("inputUdtId", &self.input_udt_id)?;
        v.non_empty("outputType", &self.output_type)?;
        v.non_empty("implementationRef", &self.implementation_ref)
    }
}

impl Validate for Ontology {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("id", &self.id)?;
        v.non_empty("profile", &self.profile)?;
        v.each("constraints", &self.constraints)?;
        v.each("queries", &self.queries)
    }
}

impl Validate for OntologyConstraint {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("id", &self.id)?;
        v.non_empty("text", &self.text)
    }
}

impl Validate for OntologyQuery {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("id", &self.id)?;
        v.non_empty("text", &self.text)
    }
}

impl Validate for EngineSpec {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("logicalForm", &self.logical_form)?;
        v.non_empty("mvc", &self.mvc)
    }
}

impl Validate for User {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("username", &self.username)
    }
}

impl Validate for CompilerInput {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.nested("user", &self.user)?;
        v.non_empty("databaseId", &self.database_id)?;
        v.non_empty_opt("graphName", self.graph_name.as_deref())?;
        v.non_empty_opt("outputGraphName", self.output_graph_name.as_deref())
    }
}
