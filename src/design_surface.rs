//! Entity / properties / aspects design surface.
//!
//! The conversion of a specification into a design surface belongs to the
//! host's design tooling; the compiler only carries its output in the bundle.
//! [`DesignSurfaceProjector`] is the seam, and [`EntityPropertyAspectProjector`]
//! is the projection used when the host does not supply its own.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::ValidationResult;
use crate::specification::Specification;
use crate::validate::{Validate, Validator};

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DesignSurface {
    pub entity: Record,
    pub properties: Vec<Record>,
    pub aspects: Vec<Record>,
}

/// Projects a specification onto a design surface. Must be pure.
pub trait DesignSurfaceProjector: Send + Sync {
    fn project(&self, spec: &Specification) -> DesignSurface;
}

/// Entity = the specification, one property per feature, one aspect per model.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityPropertyAspectProjector;

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

impl DesignSurfaceProjector for EntityPropertyAspectProjector {
    fn project(&self, spec: &Specification) -> DesignSurface {
        let entity = record(json!({
            "id": spec.id,
            "kind": "sdsl-specification",
            "logicalForm": spec.engine.logical_form,
            "modelIds": spec.models.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            "ontologyIds": spec.ontology_ids(),
        }));

        let properties = spec
            .features
            .iter()
            .map(|f| {
                record(json!({
                    "id": f.id,
                    "label": f.label,
                    "kind": f.kind(),
                    "entityId": spec.id,
                    "modelId": f.model_id,
                }))
            })
            .collect();

        let aspects = spec
            .models
            .iter()
            .map(|m| {
                record(json!({
                    "id": m.id,
                    "label": m.label,
                    "kind": m.kind(),
                    "entityId": spec.id,
                    "propertyIds": spec.features_of(&m.id).map(|f| f.id.as_str()).collect::<Vec<_>>(),
                }))
            })
            .collect();

        DesignSurface {
            entity,
            properties,
            aspects,
        }
    }
}

impl Validate for DesignSurface {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.invariant("entity", !self.entity.is_empty(), || {
            "design surface has no entity record".into()
        })
    }
}
