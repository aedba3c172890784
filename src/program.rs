//! Form-evaluation program handed to the kernel's `form_eval.evaluate`.
//!
//! The program shape is fixed: four morph steps (`spec.validate`,
//! `models.compile`, `features.compile`, then a reflective judgment), one
//! application form per model, and every model selected.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ValidationResult;
use crate::specification::{Model, Specification};
use crate::validate::{Validate, Validator};

pub const SPEC_VALIDATE: &str = "spec.validate";
pub const MODELS_COMPILE: &str = "models.compile";
pub const FEATURES_COMPILE: &str = "features.compile";
pub const ASPECTS_PROJECT: &str = "aspects.project";

/// One step of the morph sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MorphStep {
    Form { op: String },
    Judge { moment: String },
}

impl MorphStep {
    fn form(op: &str) -> Self {
        Self::Form { op: op.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Morph {
    pub patterns: Vec<String>,
    pub steps: Vec<MorphStep>,
}

impl Default for Morph {
    fn default() -> Self {
        Self {
            patterns: [SPEC_VALIDATE, MODELS_COMPILE, FEATURES_COMPILE, ASPECTS_PROJECT]
                .map(String::from)
                .to_vec(),
            steps: vec![
                MorphStep::form(SPEC_VALIDATE),
                MorphStep::form(MODELS_COMPILE),
                MorphStep::form(FEATURES_COMPILE),
                MorphStep::Judge {
                    moment: "reflection".into(),
                },
            ],
        }
    }
}

/// Evaluation context. Keys are snake_case on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramContext {
    pub runtime_strategy: String,
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationForm {
    pub name: String,
    pub domain: &'static str,
    pub features: Vec<String>,
    pub patterns: Vec<String>,
    pub specifications: BTreeMap<String, String>,
}

impl ApplicationForm {
    /// The application form of `model`, listing the features it owns.
    pub fn for_model(spec: &Specification, model: &Model) -> Self {
        Self {
            name: model.id.clone(),
            domain: "ontology-runtime",
            features: spec.features_of(&model.id).map(|f| f.id.clone()).collect(),
            patterns: [SPEC_VALIDATE, FEATURES_COMPILE, ASPECTS_PROJECT]
                .map(String::from)
                .to_vec(),
            specifications: BTreeMap::from([
                ("modelKind".to_string(), model.kind().to_string()),
                ("ontologyCount".to_string(), spec.ontologies.len().to_string()),
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormProgram {
    pub morph: Morph,
    pub context: ProgramContext,
    pub application_forms: Vec<ApplicationForm>,
    pub selected_forms: Vec<String>,
}

impl FormProgram {
    pub fn for_specification(spec: &Specification) -> Self {
        Self {
            morph: Morph::default(),
            context: ProgramContext {
                runtime_strategy: spec.engine.logical_form.clone(),
                conditions: [
                    "specification-driven",
                    "toolchain-first",
                    "given-form-recognition",
                    "ontological-program-feature",
                ]
                .map(String::from)
                .to_vec(),
            },
            application_forms: spec
                .models
                .iter()
                .map(|m| ApplicationForm::for_model(spec, m))
                .collect(),
            selected_forms: spec.models.iter().map(|m| m.id.clone()).collect(),
        }
    }
}

impl Validate for MorphStep {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        match self {
            Self::Form { op } => v.non_empty("op", op),
            Self::Judge { moment } => v.non_empty("moment", moment),
        }
    }
}

impl Validate for ApplicationForm {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("name", &self.name)?;
        v.non_empty_strings("features", &self.features)?;
        v.non_empty_strings("patterns", &self.patterns)
    }
}

impl Validate for FormProgram {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.field("morph", |v| {
            v.non_empty_strings("patterns", &self.morph.patterns)?;
            v.non_empty_list("steps", &self.morph.steps)?;
            v.each("steps", &self.morph.steps)
        })?;
        v.field("context", |v| {
            v.non_empty("runtime_strategy", &self.context.runtime_strategy)
        })?;
        v.each("applicationForms", &self.application_forms)?;
        v.non_empty_strings("selectedForms", &self.selected_forms)?;
        for selected in &self.selected_forms {
            v.invariant(
                "selectedForms",
                self.application_forms.iter().any(|f| &f.name == selected),
                || format!("selected form {selected} has no application form"),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::{EngineSpec, Feature};
    use crate::validate::checked;

    fn spec() -> Specification {
        Specification {
            id: "crm".into(),
            models: vec![
                Model {
                    id: "m1".into(),
                    label: "Customer".into(),
                    kind: None,
                },
                Model {
                    id: "m2".into(),
                    label: "Order".into(),
                    kind: Some("aggregate".into()),
                },
            ],
            features: vec![
                Feature {
                    id: "f1".into(),
                    label: "Email".into(),
                    model_id: Some("m1".into()),
                    kind: None,
                },
                Feature {
                    id: "f2".into(),
                    label: "Total".into(),
                    model_id: Some("m2".into()),
                    kind: None,
                },
                Feature {
                    id: "f3".into(),
                    label: "Phone".into(),
                    model_id: Some("m1".into()),
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
    fn one_application_form_per_model() {
        let program = checked(FormProgram::for_specification(&spec())).unwrap();
        assert_eq!(program.selected_forms, vec!["m1", "m2"]);
        assert_eq!(program.application_forms[0].features, vec!["f1", "f3"]);
        assert_eq!(program.application_forms[1].specifications["modelKind"], "aggregate");
        assert_eq!(program.application_forms[1].specifications["ontologyCount"], "0");
        assert_eq!(program.context.runtime_strategy, "fol");
    }

    #[test]
    fn morph_ends_in_reflective_judgment() {
        let json = serde_json::to_value(Morph::default()).unwrap();
        assert_eq!(json["steps"].as_array().unwrap().len(), 4);
        assert_eq!(json["steps"][0]["kind"], "form");
        assert_eq!(json["steps"][0]["op"], "spec.validate");
        assert_eq!(json["steps"][3]["kind"], "judge");
        assert_eq!(json["steps"][3]["moment"], "reflection");
    }

    #[test]
    fn dangling_selected_form_fails_validation() {
        let mut program = FormProgram::for_specification(&spec());
        program.selected_forms.push("ghost".into());
        let err = checked(program).unwrap_err();
        assert_eq!(err.path(), "$.selectedForms");
    }
}
