//! DataFrame plan: a fixed five-stage lowering chain per feature.
//!
//! Every feature is lowered through the same skeleton,
//! `input → encode → transform → decode → output`, where each step's
//! `outputRef` is the next step's `inputRef`. Chains of different features
//! never share a ref.

use serde::Serialize;

use crate::error::ValidationResult;
use crate::specification::{Feature, Specification};
use crate::validate::{Validate, Validator, checked};

/// Lowering stage tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Input,
    Encode,
    Transform,
    Decode,
    Output,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::Input,
        Stage::Encode,
        Stage::Transform,
        Stage::Decode,
        Stage::Output,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Encode => "encode",
            Self::Transform => "transform",
            Self::Decode => "decode",
            Self::Output => "output",
        }
    }

    /// Fixed operation performed at this stage.
    pub fn operation(self) -> &'static str {
        match self {
            Self::Input => "text.input",
            Self::Encode => "text.encode.lowercase",
            Self::Transform => "text.transform.tokenize",
            Self::Decode => "text.decode.token_count",
            Self::Output => "text.output",
        }
    }

    /// Suffix of the ref this stage produces.
    fn output_suffix(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Encode => "encoded",
            Self::Transform => "tokens",
            Self::Decode => "decoded",
            Self::Output => "output",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoweringStep {
    pub id: String,
    pub stage: Stage,
    pub operation: &'static str,
    pub input_ref: String,
    pub output_ref: String,
    pub feature_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFramePlan {
    pub engine: &'static str,
    pub dataset_id: String,
    pub steps: Vec<LoweringStep>,
}

/// Lower one feature into its five chained steps.
fn lower_feature(feature: &Feature) -> impl Iterator<Item = LoweringStep> + '_ {
    let prefix = format!("feature:{}", feature.id);
    let mut input_ref = format!("{}.source", feature.model_scope());
    Stage::ALL.into_iter().map(move |stage| {
        let output_ref = format!("{prefix}.{}", stage.output_suffix());
        LoweringStep {
            id: format!("{prefix}:{stage}"),
            stage,
            operation: stage.operation(),
            input_ref: std::mem::replace(&mut input_ref, output_ref.clone()),
            output_ref,
            feature_id: feature.id.clone(),
            model_id: feature.model_id.clone(),
        }
    })
}

pub fn build_dataframe_plan(spec: &Specification) -> ValidationResult<DataFramePlan> {
    let steps: Vec<LoweringStep> = spec.features.iter().flat_map(lower_feature).collect();
    tracing::debug!(spec = %spec.id, steps = steps.len(), "dataframe plan built");
    checked(DataFramePlan {
        engine: "polars",
        dataset_id: spec.id.clone(),
        steps,
    })
}

impl Validate for LoweringStep {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("id", &self.id)?;
        v.non_empty("inputRef", &self.input_ref)?;
        v.non_empty("outputRef", &self.output_ref)?;
        v.non_empty("featureId", &self.feature_id)?;
        v.non_empty_opt("modelId", self.model_id.as_deref())
    }
}

impl Validate for DataFramePlan {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("datasetId", &self.dataset_id)?;
        v.each("steps", &self.steps)?;
        v.invariant("steps", self.steps.len() % Stage::ALL.len() == 0, || {
            format!("{} steps is not a whole number of chains", self.steps.len())
        })?;
        for chain in self.steps.chunks(Stage::ALL.len()) {
            for (step, stage) in chain.iter().zip(Stage::ALL) {
                v.invariant("steps", step.stage == stage, || {
                    format!("step {} is out of stage order", step.id)
                })?;
            }
            for pair in chain.windows(2) {
                v.invariant("steps", pair[0].output_ref == pair[1].input_ref, || {
                    format!("step {} does not feed step {}", pair[0].id, pair[1].id)
                })?;
            }
        }
        Ok(())
    }
}
