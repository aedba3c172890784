//! Schema validation at the compiler boundaries.
//!
//! Raw JSON enters through [`validate_specification`] and
//! [`validate_compiler_input`]: serde enforces the structural shape (field
//! types, enum spellings) and the [`Validate`] trait enforces the value-level
//! contract (non-empty identifiers, non-empty lists, cross-references).
//!
//! The same trait is implemented by every derived artifact, so each builder can
//! hand its output through [`checked`] before returning it, and the
//! orchestrator can validate the assembled bundle as a whole.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ValidationError, ValidationResult};
use crate::specification::{
    CompilerInput, Feature, Model, Ontology, Specification, UdfSpec, UdtSpec,
};

/// One step of a validation path.
#[derive(Debug, Clone, Copy)]
enum Segment {
    Field(&'static str),
    Index(usize),
}

/// Path-tracking cursor handed to [`Validate::validate`].
///
/// Paths render JSONPath-style: `$.features[1].label`.
#[derive(Debug, Default)]
pub struct Validator {
    segments: Vec<Segment>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the current path.
    pub fn path(&self) -> String {
        let mut out = String::from("$");
        for seg in &self.segments {
            match seg {
                Segment::Field(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                Segment::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        out
    }

    fn path_to(&self, field: &'static str) -> String {
        let mut path = self.path();
        path.push('.');
        path.push_str(field);
        path
    }

    fn scoped<T>(
        &mut self,
        seg: Segment,
        f: impl FnOnce(&mut Self) -> ValidationResult<T>,
    ) -> ValidationResult<T> {
        self.segments.push(seg);
        let result = f(self);
        self.segments.pop();
        result
    }

    /// Run `f` with `name` appended to the path.
    pub fn field<T>(
        &mut self,
        name: &'static str,
        f: impl FnOnce(&mut Self) -> ValidationResult<T>,
    ) -> ValidationResult<T> {
        self.scoped(Segment::Field(name), f)
    }

    /// Validate a nested value under `name`.
    pub fn nested<T: Validate + ?Sized>(
        &mut self,
        name: &'static str,
        value: &T,
    ) -> ValidationResult<()> {
        self.field(name, |v| value.validate(v))
    }

    /// Validate every element of a list under `name`.
    pub fn each<T: Validate>(&mut self, name: &'static str, items: &[T]) -> ValidationResult<()> {
        self.field(name, |v| {
            for (i, item) in items.iter().enumerate() {
                v.scoped(Segment::Index(i), |v| item.validate(v))?;
            }
            Ok(())
        })
    }

    /// `value` must be a non-empty string.
    pub fn non_empty(&mut self, name: &'static str, value: &str) -> ValidationResult<()> {
        if value.is_empty() {
            return Err(ValidationError::EmptyString {
                path: self.path_to(name),
            });
        }
        Ok(())
    }

    /// An optional string, when present, must be non-empty.
    pub fn non_empty_opt(
        &mut self,
        name: &'static str,
        value: Option<&str>,
    ) -> ValidationResult<()> {
        match value {
            Some(value) => self.non_empty(name, value),
            None => Ok(()),
        }
    }

    /// Every string in the list must be non-empty.
    pub fn non_empty_strings(
        &mut self,
        name: &'static str,
        items: &[String],
    ) -> ValidationResult<()> {
        self.field(name, |v| {
            for (i, item) in items.iter().enumerate() {
                if item.is_empty() {
                    let mut path = v.path();
                    path.push_str(&format!("[{i}]"));
                    return Err(ValidationError::EmptyString { path });
                }
            }
            Ok(())
        })
    }

    /// The list must contain at least one element.
    pub fn non_empty_list<T>(&mut self, name: &'static str, items: &[T]) -> ValidationResult<()> {
        if items.is_empty() {
            return Err(ValidationError::EmptyList {
                path: self.path_to(name),
            });
        }
        Ok(())
    }

    /// Fail with [`ValidationError::Invariant`] at `name` unless `holds`.
    pub fn invariant(
        &mut self,
        name: &'static str,
        holds: bool,
        message: impl FnOnce() -> String,
    ) -> ValidationResult<()> {
        if !holds {
            return Err(ValidationError::Invariant {
                path: self.path_to(name),
                message: message(),
            });
        }
        Ok(())
    }
}

/// Value-level schema contract.
pub trait Validate {
    fn validate(&self, v: &mut Validator) -> ValidationResult<()>;
}

/// Validate `value` from the root and hand it back on success.
pub fn checked<T: Validate>(value: T) -> ValidationResult<T> {
    value.validate(&mut Validator::new())?;
    Ok(value)
}

/// Deserialize and validate a raw JSON value.
fn parse<T: DeserializeOwned + Validate>(
    raw: &Value,
    locate: impl FnOnce(&Value) -> Option<ValidationError>,
) -> ValidationResult<T> {
    let value: T = serde_json::from_value(raw.clone()).map_err(|e| {
        locate(raw).unwrap_or_else(|| ValidationError::Structure {
            path: "$".into(),
            message: e.to_string(),
        })
    })?;
    checked(value)
}

/// Deserialize each element of `raw.<field>` as `T`, returning the first
/// element that fails with its indexed path.
fn probe_elements<T: DeserializeOwned>(raw: &Value, field: &str) -> Option<ValidationError> {
    let items = raw.get(field)?.as_array()?;
    items.iter().enumerate().find_map(|(i, item)| {
        serde_json::from_value::<T>(item.clone())
            .err()
            .map(|e| ValidationError::Structure {
                path: format!("$.{field}[{i}]"),
                message: e.to_string(),
            })
    })
}

/// Validate a raw specification.
///
/// Structural failures inside one of the entity lists are reported with the
/// index of the offending element; everything else is reported at `$`.
pub fn validate_specification(raw: &Value) -> ValidationResult<Specification> {
    let spec: Specification = parse(raw, |raw| {
        probe_elements::<Model>(raw, "models")
            .or_else(|| probe_elements::<Feature>(raw, "features"))
            .or_else(|| probe_elements::<Ontology>(raw, "ontologies"))
            .or_else(|| probe_elements::<UdtSpec>(raw, "udts"))
            .or_else(|| probe_elements::<UdfSpec>(raw, "udfs"))
    })?;
    tracing::debug!(
        spec = %spec.id,
        models = spec.models.len(),
        features = spec.features.len(),
        "specification validated"
    );
    Ok(spec)
}

/// Validate a raw compiler input.
pub fn validate_compiler_input(raw: &Value) -> ValidationResult<CompilerInput> {
    parse(raw, |_| None)
}
