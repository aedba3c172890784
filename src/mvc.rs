//! Dashboard descriptor for the MVC adapter named by the engine.

use serde::Serialize;

use crate::error::ValidationResult;
use crate::specification::Specification;
use crate::validate::{Validate, Validator, checked};

pub const CHART_HINTS: [&str; 2] = ["recharts:feature-coverage", "d3:model-feature-graph"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub route: String,
    pub sections: Vec<String>,
    pub chart_hints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MvcArtifacts {
    pub adapter: String,
    pub dashboard: Dashboard,
}

/// One `model:<label>` section per model, then one `feature:<label>` per feature.
pub fn build_mvc_artifacts(spec: &Specification) -> ValidationResult<MvcArtifacts> {
    let sections = spec
        .models
        .iter()
        .map(|m| format!("model:{}", m.label))
        .chain(spec.features.iter().map(|f| format!("feature:{}", f.label)))
        .collect();

    checked(MvcArtifacts {
        adapter: spec.engine.mvc.clone(),
        dashboard: Dashboard {
            route: format!("/dashboard/sdsl/{}", spec.id),
            sections,
            chart_hints: CHART_HINTS.map(String::from).to_vec(),
        },
    })
}

impl Validate for MvcArtifacts {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.non_empty("adapter", &self.adapter)?;
        v.field("dashboard", |v| {
            v.non_empty("route", &self.dashboard.route)?;
            v.non_empty_strings("sections", &self.dashboard.sections)?;
            v.non_empty_strings("chartHints", &self.dashboard.chart_hints)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::{EngineSpec, Feature, Model};

    #[test]
    fn sections_list_models_before_features() {
        let spec = Specification {
            id: "crm".into(),
            models: vec![Model {
                id: "m1".into(),
                label: "Customer".into(),
                kind: None,
            }],
            features: vec![Feature {
                id: "f1".into(),
                label: "Email".into(),
                model_id: None,
                kind: None,
            }],
            ontologies: Vec::new(),
            udts: Vec::new(),
            udfs: Vec::new(),
            engine: EngineSpec {
                logical_form: "fol".into(),
                mvc: "react".into(),
            },
        };

        let mvc = build_mvc_artifacts(&spec).unwrap();
        assert_eq!(mvc.adapter, "react");
        assert_eq!(mvc.dashboard.route, "/dashboard/sdsl/crm");
        assert_eq!(mvc.dashboard.sections, vec!["model:Customer", "feature:Email"]);

        let json = serde_json::to_value(&mvc).unwrap();
        assert_eq!(json["dashboard"]["chartHints"][1], "d3:model-feature-graph");
    }
}
