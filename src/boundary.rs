//! Reflective boundary contract between the epistemic processor and the
//! transcendental kernel. Fixed; embedded in the form-evaluation artifacts.

use serde::Serialize;

use crate::error::ValidationResult;
use crate::validate::{Validate, Validator};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpistemicProcessorContract {
    pub runtime: &'static str,
    pub processor: &'static str,
    pub mode: &'static str,
    pub authority: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscendentalKernelContract {
    pub runtime: &'static str,
    pub processor: &'static str,
    pub mode: &'static str,
    pub role: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryHandoffContract {
    pub substrate: &'static str,
    pub invariants: Vec<String>,
    pub proof_obligations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectiveBoundaryContract {
    pub epistemic_processor: EpistemicProcessorContract,
    pub transcendental_kernel: TranscendentalKernelContract,
    pub handoff: BoundaryHandoffContract,
}

impl Default for ReflectiveBoundaryContract {
    fn default() -> Self {
        Self {
            epistemic_processor: EpistemicProcessorContract {
                runtime: "ts-agent-logic",
                processor: "reflective-form",
                mode: "epistemic",
                authority: "sdsl/zod",
            },
            transcendental_kernel: TranscendentalKernelContract {
                runtime: "gds-rust-kernel",
                processor: "program-form-evaluate-apply-print",
                mode: "transcendental-logic",
                role: "cache",
            },
            handoff: BoundaryHandoffContract {
                substrate: "cypher-driven",
                invariants: vec![
                    "program-features-precede-kernel-compilation".into(),
                    "specification-bindings-are-explicit".into(),
                    "graph-refs-resolve-via-store-contract".into(),
                    "entity-property-aspect-encodes-thing-world-law-essential-relations".into(),
                ],
                proof_obligations: vec![
                    "artifact-hooks-validated".into(),
                    "program-form-print-materialized".into(),
                ],
            },
        }
    }
}

impl Validate for ReflectiveBoundaryContract {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()> {
        v.field("handoff", |v| {
            v.non_empty_list("invariants", &self.handoff.invariants)?;
            v.non_empty_strings("invariants", &self.handoff.invariants)?;
            v.non_empty_list("proofObligations", &self.handoff.proof_obligations)?;
            v.non_empty_strings("proofObligations", &self.handoff.proof_obligations)
        })
    }
}
