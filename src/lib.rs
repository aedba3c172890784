// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # sdsl-compiler
//!
//! Compiles one SDSL domain specification (models, features, ontologies,
//! user-defined types and functions) plus a small compilation context into a
//! bundle of cross-referenced artifacts for downstream systems.
//!
//! ## Architecture
//!
//! - **Boundary** (`validate`, `specification`): raw JSON in, typed values out,
//!   every violation reported with its path
//! - **Schema generation** (`schema_gen`): type/function inference and the
//!   per-feature dataframe and dataset definitions every other builder reuses
//! - **Builders** (`dataframe`, `substrate`, `sdk`, `ontology_image`,
//!   `store_contract`, `mvc`, `design_surface`): pure functions of the
//!   specification and the schema generation
//! - **Kernel** (`kernel`, `program`, `boundary`): graph snapshot and
//!   form-evaluation calls embedding the other builders' outputs
//! - **Facade** (`compiler`): orchestration and whole-bundle validation
//!
//! ## Library usage
//!
//! ```no_run
//! use serde_json::json;
//!
//! let bundle = sdsl_compiler::compile_json(
//!     &json!({
//!         "id": "crm",
//!         "models": [{"id": "m1", "label": "Customer"}],
//!         "features": [{"id": "f1", "label": "Email", "modelId": "m1"}],
//!         "engine": {"logicalForm": "fol", "mvc": "react"}
//!     }),
//!     &json!({"user": {"username": "ada"}, "databaseId": "db"}),
//! )
//! .unwrap();
//! assert_eq!(bundle.kernel.graph_store_put.snapshot.nodes, vec![0, 1000, 2000]);
//! ```

pub mod boundary;
pub mod compiler;
pub mod config;
pub mod dataframe;
pub mod design_surface;
pub mod error;
pub mod kernel;
pub mod mvc;
pub mod ontology_image;
pub mod program;
pub mod schema_gen;
pub mod sdk;
pub mod specification;
pub mod store_contract;
pub mod substrate;
pub mod validate;

pub use compiler::{Compiler, CompilerArtifacts, compile, compile_json};
pub use error::{SdslError, SdslResult, ValidationError, ValidationResult};
