//! Parameter schemas and validation of raw client values.
//!
//! Values outside a parameter's domain are rejected, never clamped or rounded,
//! so the client and server always agree on what was applied.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Integer,
    Real,
    Enum,
}

/// Extra constraint on top of the min/max range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parity {
    /// Value must be odd and at least `min`.
    Odd { min: i64 },
}

/// A validated parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Real(f64),
    Enum(String),
}

impl ParamValue {
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Integer(v) => Value::from(*v),
            ParamValue::Real(v) => Value::from(*v),
            ParamValue::Enum(v) => Value::from(v.as_str()),
        }
    }
}

/// Schema of one operation parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub allowed: &'static [&'static str],
    pub parity: Option<Parity>,
    pub default: ParamValue,
}

impl ParamSpec {
    pub fn integer(name: &'static str, min: i64, max: i64, default: i64) -> Self {
        Self {
            name,
            kind: ParamKind::Integer,
            description: "",
            min: Some(min as f64),
            max: Some(max as f64),
            step: Some(1.0),
            allowed: &[],
            parity: None,
            default: ParamValue::Integer(default),
        }
    }

    pub fn real(name: &'static str, min: f64, max: f64, default: f64) -> Self {
        Self {
            name,
            kind: ParamKind::Real,
            description: "",
            min: Some(min),
            max: Some(max),
            step: None,
            allowed: &[],
            parity: None,
            default: ParamValue::Real(default),
        }
    }

    pub fn choice(name: &'static str, allowed: &'static [&'static str], default: &str) -> Self {
        Self {
            name,
            kind: ParamKind::Enum,
            description: "",
            min: None,
            max: None,
            step: None,
            allowed,
            parity: None,
            default: ParamValue::Enum(default.to_string()),
        }
    }

    pub fn odd(mut self, min: i64) -> Self {
        self.parity = Some(Parity::Odd { min });
        self.step = Some(2.0);
        self
    }

    /// Accept any finite value. Used where the transform normalizes the
    /// input itself, such as rotation angles.
    pub fn unbounded(mut self) -> Self {
        self.min = None;
        self.max = None;
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    fn reject(&self, reason: impl Into<String>) -> CatalogError {
        CatalogError::InvalidParameter {
            name: self.name.to_string(),
            reason: reason.into(),
        }
    }

    /// Parse and check one raw value. `None` (or JSON null) yields the default.
    pub fn resolve(&self, raw: Option<&Value>) -> Result<ParamValue, CatalogError> {
        let raw = match raw {
            None | Some(Value::Null) => return Ok(self.default.clone()),
            Some(v) => v,
        };

        match self.kind {
            ParamKind::Integer => {
                let value = self.parse_integer(raw)?;
                self.check_range(value as f64)?;
                if let Some(Parity::Odd { min }) = self.parity {
                    if value % 2 == 0 || value < min {
                        return Err(self.reject(format!(
                            "must be an odd number >= {}, got {}",
                            min, value
                        )));
                    }
                }
                self.check_step(value as f64)?;
                Ok(ParamValue::Integer(value))
            }
            ParamKind::Real => {
                let value = self.parse_real(raw)?;
                self.check_range(value)?;
                self.check_step(value)?;
                Ok(ParamValue::Real(value))
            }
            ParamKind::Enum => {
                let Value::String(value) = raw else {
                    return Err(self.reject(format!("expected one of {:?}", self.allowed)));
                };
                if !self.allowed.contains(&value.as_str()) {
                    return Err(self.reject(format!(
                        "must be one of {:?}, got '{}'",
                        self.allowed, value
                    )));
                }
                Ok(ParamValue::Enum(value.clone()))
            }
        }
    }

    fn parse_real(&self, raw: &Value) -> Result<f64, CatalogError> {
        let value = match raw {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| self.reject(format!("expected a number, got {}", raw)))?;

        if !value.is_finite() {
            return Err(self.reject("must be a finite number"));
        }
        Ok(value)
    }

    fn parse_integer(&self, raw: &Value) -> Result<i64, CatalogError> {
        if let Value::Number(n) = raw {
            if let Some(v) = n.as_i64() {
                return Ok(v);
            }
        }
        if let Value::String(s) = raw {
            if let Ok(v) = s.trim().parse::<i64>() {
                return Ok(v);
            }
        }
        let value = self.parse_real(raw)?;
        if value.fract() != 0.0 || value.abs() > i64::MAX as f64 {
            return Err(self.reject(format!("must be an integer, got {}", value)));
        }
        Ok(value as i64)
    }

    fn check_range(&self, value: f64) -> Result<(), CatalogError> {
        let below = self.min.is_some_and(|min| value < min);
        let above = self.max.is_some_and(|max| value > max);
        if below || above {
            return Err(self.reject(format!(
                "must be between {} and {}, got {}",
                fmt_bound(self.min),
                fmt_bound(self.max),
                value
            )));
        }
        Ok(())
    }

    /// Values must sit on the grid `min + k * step`. Parity constraints
    /// already pin odd values, so they skip this check.
    fn check_step(&self, value: f64) -> Result<(), CatalogError> {
        let Some(step) = self.step.filter(|s| *s > 0.0) else {
            return Ok(());
        };
        if self.parity.is_some() {
            return Ok(());
        }
        let base = self.min.unwrap_or(0.0);
        let k = (value - base) / step;
        if (k - k.round()).abs() > STEP_TOLERANCE {
            return Err(self.reject(format!(
                "must be {} plus a multiple of {}, got {}",
                base, step, value
            )));
        }
        Ok(())
    }
}

const STEP_TOLERANCE: f64 = 1e-6;

fn fmt_bound(bound: Option<f64>) -> String {
    bound.map_or_else(|| "unbounded".to_string(), |b| b.to_string())
}

/// Constraint spanning more than one parameter.
#[derive(Debug, Clone, Copy)]
pub enum ParamRule {
    /// `lower` must be strictly less than `upper`; reported against `lower`.
    LessThan {
        lower: &'static str,
        upper: &'static str,
    },
}

impl ParamRule {
    pub fn check(&self, params: &ResolvedParams) -> Result<(), CatalogError> {
        match *self {
            ParamRule::LessThan { lower, upper } => {
                let (Some(lo), Some(hi)) = (params.number(lower), params.number(upper)) else {
                    return Ok(());
                };
                if lo >= hi {
                    return Err(CatalogError::InvalidParameter {
                        name: lower.to_string(),
                        reason: format!(
                            "must be less than '{}' ({}), got {}",
                            upper, hi, lo
                        ),
                    });
                }
                Ok(())
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ParamRule::LessThan { lower, upper } => format!("{} < {}", lower, upper),
        }
    }
}

/// Parameters after defaulting and validation, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedParams(BTreeMap<&'static str, ParamValue>);

impl ResolvedParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'static str, value: ParamValue) {
        self.0.insert(name, value);
    }

    pub fn with(mut self, name: &'static str, value: ParamValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Numeric view of an integer or real parameter.
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.0.get(name)? {
            ParamValue::Integer(v) => Some(*v as f64),
            ParamValue::Real(v) => Some(*v),
            ParamValue::Enum(_) => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.0.get(name)? {
            ParamValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.0.get(name)? {
            ParamValue::Enum(v) => Some(v),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reason(err: CatalogError) -> String {
        match err {
            CatalogError::InvalidParameter { reason, .. } => reason,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_uses_default() {
        let spec = ParamSpec::integer("value", 0, 255, 127);
        assert_eq!(spec.resolve(None).unwrap(), ParamValue::Integer(127));
        assert_eq!(
            spec.resolve(Some(&Value::Null)).unwrap(),
            ParamValue::Integer(127)
        );
    }

    #[test]
    fn test_out_of_range_rejected_not_clamped() {
        let spec = ParamSpec::integer("value", 0, 255, 127);
        assert!(reason(spec.resolve(Some(&json!(-1))).unwrap_err()).contains("between 0 and 255"));
        assert!(spec.resolve(Some(&json!(256))).is_err());
        assert_eq!(
            spec.resolve(Some(&json!(255))).unwrap(),
            ParamValue::Integer(255)
        );
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let spec = ParamSpec::integer("value", 0, 255, 127);
        assert_eq!(
            spec.resolve(Some(&json!(" 42 "))).unwrap(),
            ParamValue::Integer(42)
        );
        assert_eq!(
            spec.resolve(Some(&json!(42.0))).unwrap(),
            ParamValue::Integer(42)
        );
        assert!(spec.resolve(Some(&json!("forty"))).is_err());
    }

    #[test]
    fn test_integer_rejects_fractions() {
        let spec = ParamSpec::integer("value", 0, 255, 127);
        assert!(reason(spec.resolve(Some(&json!(12.5))).unwrap_err()).contains("integer"));
        assert!(spec.resolve(Some(&json!("12.5"))).is_err());
    }

    #[test]
    fn test_odd_constraint() {
        let spec = ParamSpec::integer("intensity", 1, 31, 5).odd(3);
        assert!(reason(spec.resolve(Some(&json!(4))).unwrap_err()).contains("odd"));
        assert!(spec.resolve(Some(&json!(1))).is_err());
        assert_eq!(
            spec.resolve(Some(&json!(5))).unwrap(),
            ParamValue::Integer(5)
        );
    }

    #[test]
    fn test_real_rejects_non_numbers() {
        let spec = ParamSpec::real("angle", -720.0, 720.0, 0.0);
        assert!(spec.resolve(Some(&json!(true))).is_err());
        assert!(spec.resolve(Some(&json!("NaN"))).is_err());
        assert!(spec.resolve(Some(&json!("inf"))).is_err());
        assert_eq!(
            spec.resolve(Some(&json!("-12.5"))).unwrap(),
            ParamValue::Real(-12.5)
        );
    }

    #[test]
    fn test_step_grid_enforced() {
        let spec = ParamSpec::real("smoothing", 10.0, 150.0, 75.0).step(5.0);
        assert!(reason(spec.resolve(Some(&json!(12))).unwrap_err()).contains("multiple of 5"));
        assert!(spec.resolve(Some(&json!(12.5))).is_err());
        assert_eq!(
            spec.resolve(Some(&json!(15))).unwrap(),
            ParamValue::Real(15.0)
        );
        assert_eq!(
            spec.resolve(Some(&json!("150"))).unwrap(),
            ParamValue::Real(150.0)
        );

        let spec = ParamSpec::real("c", -20.0, 20.0, 2.0).step(1.0);
        assert!(spec.resolve(Some(&json!(-3))).is_ok());
        assert!(spec.resolve(Some(&json!(0.5))).is_err());
    }

    #[test]
    fn test_unbounded_real_accepts_any_finite_value() {
        let spec = ParamSpec::real("angle", -180.0, 180.0, 0.0).unbounded();
        assert_eq!(
            spec.resolve(Some(&json!(1000))).unwrap(),
            ParamValue::Real(1000.0)
        );
        assert_eq!(
            spec.resolve(Some(&json!(-12.25))).unwrap(),
            ParamValue::Real(-12.25)
        );
        assert!(spec.resolve(Some(&json!("inf"))).is_err());
    }

    #[test]
    fn test_enum_membership() {
        let spec = ParamSpec::choice("direction", &["horizontal", "vertical", "both"], "horizontal");
        assert!(spec.resolve(Some(&json!("vertical"))).is_ok());
        assert!(spec.resolve(Some(&json!("Vertical"))).is_err());
        assert!(spec.resolve(Some(&json!(1))).is_err());
    }

    #[test]
    fn test_less_than_rule() {
        let rule = ParamRule::LessThan {
            lower: "low",
            upper: "high",
        };
        let ok = ResolvedParams::new()
            .with("low", ParamValue::Real(50.0))
            .with("high", ParamValue::Real(150.0));
        assert!(rule.check(&ok).is_ok());

        let equal = ResolvedParams::new()
            .with("low", ParamValue::Real(100.0))
            .with("high", ParamValue::Real(100.0));
        match rule.check(&equal).unwrap_err() {
            CatalogError::InvalidParameter { name, .. } => assert_eq!(name, "low"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
