//! Declarative registry of operations and their parameter schemas.
//!
//! The catalog is owned by the server and can be serialized for the
//! presentation layer, which builds its menus and sliders from it.

mod builtin;
mod operation;
mod params;

use std::collections::HashMap;

use retouch_core::AppError;
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

pub use operation::Operation;
pub use params::{ParamKind, ParamRule, ParamSpec, ParamValue, Parity, ResolvedParams};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Duplicate operation identifier: {0}")]
    Duplicate(String),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownOperation(id) => AppError::UnknownOperation(id),
            CatalogError::InvalidParameter { name, reason } => {
                AppError::InvalidParameter { name, reason }
            }
            CatalogError::Duplicate(id) => {
                AppError::Internal(format!("duplicate operation identifier '{}'", id))
            }
        }
    }
}

/// Schema of one operation.
#[derive(Debug, Clone)]
pub struct OperationSpec {
    pub id: Operation,
    pub aliases: &'static [&'static str],
    pub category: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    pub rules: Vec<ParamRule>,
}

impl OperationSpec {
    pub fn new(id: Operation, category: &'static str, description: &'static str) -> Self {
        Self {
            id,
            aliases: &[],
            category,
            description,
            params: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn alias(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn rule(mut self, rule: ParamRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Resolve raw client parameters against this schema.
    ///
    /// Unknown names are rejected before any value is looked at, then every
    /// declared parameter is defaulted and checked, then cross-parameter rules
    /// run on the resolved values.
    pub fn validate(&self, raw: &Map<String, Value>) -> Result<ResolvedParams, CatalogError> {
        if let Some(unknown) = raw
            .keys()
            .find(|key| !self.params.iter().any(|p| p.name == key.as_str()))
        {
            return Err(CatalogError::InvalidParameter {
                name: unknown.clone(),
                reason: format!("unknown parameter for operation '{}'", self.id),
            });
        }

        let mut resolved = ResolvedParams::new();
        if self.params.is_empty() {
            return Ok(resolved);
        }

        for spec in &self.params {
            let value = spec.resolve(raw.get(spec.name))?;
            resolved.insert(spec.name, value);
        }

        for rule in &self.rules {
            rule.check(&resolved)?;
        }

        Ok(resolved)
    }

    pub fn describe(&self) -> OperationDescriptor {
        OperationDescriptor {
            id: self.id,
            aliases: self.aliases.iter().map(|a| a.to_string()).collect(),
            category: self.category.to_string(),
            description: self.description.to_string(),
            params: self
                .params
                .iter()
                .map(|p| ParamDescriptor {
                    name: p.name.to_string(),
                    kind: p.kind,
                    description: p.description.to_string(),
                    min: p.min,
                    max: p.max,
                    step: p.step,
                    allowed: p.allowed.iter().map(|a| a.to_string()).collect(),
                    odd: matches!(p.parity, Some(Parity::Odd { .. })),
                    default: p.default.to_json(),
                })
                .collect(),
            rules: self.rules.iter().map(ParamRule::describe).collect(),
        }
    }
}

/// Serializable view of an [`OperationSpec`].
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OperationDescriptor {
    pub id: Operation,
    pub aliases: Vec<String>,
    pub category: String,
    pub description: String,
    pub params: Vec<ParamDescriptor>,
    /// Cross-parameter constraints, e.g. `low < high`
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParamDescriptor {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
    /// Value must be odd
    pub odd: bool,
    #[schema(value_type = Object)]
    pub default: Value,
}

/// Registry of operations, looked up by identifier or alias.
#[derive(Debug, Clone)]
pub struct Catalog {
    operations: Vec<OperationSpec>,
    index: HashMap<&'static str, usize>,
}

impl Catalog {
    pub fn new(operations: Vec<OperationSpec>) -> Result<Self, CatalogError> {
        let mut index = HashMap::new();
        for (i, op) in operations.iter().enumerate() {
            for name in std::iter::once(op.id.as_str()).chain(op.aliases.iter().copied()) {
                if index.insert(name, i).is_some() {
                    return Err(CatalogError::Duplicate(name.to_string()));
                }
            }
        }
        Ok(Self { operations, index })
    }

    /// The catalog of every operation shipped with the engine.
    pub fn builtin() -> Self {
        let operations = builtin::operations();
        let mut index = HashMap::new();
        for (i, op) in operations.iter().enumerate() {
            index.insert(op.id.as_str(), i);
            for alias in op.aliases {
                index.insert(*alias, i);
            }
        }
        Self { operations, index }
    }

    pub fn lookup(&self, id: &str) -> Result<&OperationSpec, CatalogError> {
        self.index
            .get(id)
            .map(|&i| &self.operations[i])
            .ok_or_else(|| CatalogError::UnknownOperation(id.to_string()))
    }

    pub fn validate(
        &self,
        spec: &OperationSpec,
        raw: &Map<String, Value>,
    ) -> Result<ResolvedParams, CatalogError> {
        spec.validate(raw)
    }

    /// `lookup` followed by `validate`.
    pub fn resolve(
        &self,
        id: &str,
        raw: &Map<String, Value>,
    ) -> Result<(Operation, ResolvedParams), CatalogError> {
        let spec = self.lookup(id)?;
        let params = spec.validate(raw)?;
        Ok((spec.id, params))
    }

    pub fn operations(&self) -> &[OperationSpec] {
        &self.operations
    }

    pub fn describe(&self) -> Vec<OperationDescriptor> {
        self.operations.iter().map(OperationSpec::describe).collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
