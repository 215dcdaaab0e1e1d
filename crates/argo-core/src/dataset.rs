//! In-memory labelled dataset: named dimensions, variables laid out over
//! them, and free-form attributes.
//!
//! Variable data is stored flat in row-major order over the variable's
//! dimensions. Every mutation that touches shape goes through [`Dataset`]
//! so that the invariant `data.len() == product(dimension lengths)` holds
//! for every variable at all times.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ArgoError, Result};

/// Canonical point in time once decoding has succeeded.
pub type Instant = DateTime<Utc>;

// ── Attributes ──────────────────────────────────────────────────────────────

/// A single attribute value, on a variable or on the dataset itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Text(String),
    Float(f64),
    Int(i64),
    Floats(Vec<f64>),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view. A one-element `Floats` counts as a scalar.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Int(i) => Some(*i as f64),
            AttrValue::Floats(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

pub type Attributes = BTreeMap<String, AttrValue>;

// ── Variable data ───────────────────────────────────────────────────────────

/// Typed flat storage for one variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VarData {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    Text(Vec<String>),
    /// Already-decoded instants; `None` marks a missing value.
    Instant(Vec<Option<Instant>>),
}

impl VarData {
    pub fn len(&self) -> usize {
        match self {
            VarData::F64(v) => v.len(),
            VarData::F32(v) => v.len(),
            VarData::I32(v) => v.len(),
            VarData::I64(v) => v.len(),
            VarData::Text(v) => v.len(),
            VarData::Instant(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            VarData::F64(_) | VarData::F32(_) | VarData::I32(_) | VarData::I64(_)
        )
    }

    /// Short type tag used in log lines and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            VarData::F64(_) => "f64",
            VarData::F32(_) => "f32",
            VarData::I32(_) => "i32",
            VarData::I64(_) => "i64",
            VarData::Text(_) => "text",
            VarData::Instant(_) => "instant",
        }
    }

    /// Numeric values widened to `f64`, or `None` for text and instants.
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        match self {
            VarData::F64(v) => Some(v.clone()),
            VarData::F32(v) => Some(v.iter().map(|x| f64::from(*x)).collect()),
            VarData::I32(v) => Some(v.iter().map(|x| f64::from(*x)).collect()),
            VarData::I64(v) => Some(v.iter().map(|x| *x as f64).collect()),
            VarData::Text(_) | VarData::Instant(_) => None,
        }
    }

    fn take_along(&self, shape: &[usize], axis: usize, indices: &[usize]) -> VarData {
        match self {
            VarData::F64(v) => VarData::F64(take_along(v, shape, axis, indices)),
            VarData::F32(v) => VarData::F32(take_along(v, shape, axis, indices)),
            VarData::I32(v) => VarData::I32(take_along(v, shape, axis, indices)),
            VarData::I64(v) => VarData::I64(take_along(v, shape, axis, indices)),
            VarData::Text(v) => VarData::Text(take_along(v, shape, axis, indices)),
            VarData::Instant(v) => VarData::Instant(take_along(v, shape, axis, indices)),
        }
    }
}

/// Gather `indices` along `axis` of a row-major array with the given shape.
pub(crate) fn take_along<T: Clone>(
    values: &[T],
    shape: &[usize],
    axis: usize,
    indices: &[usize],
) -> Vec<T> {
    let outer: usize = shape[..axis].iter().product();
    let axis_len = shape[axis];
    let inner: usize = shape[axis + 1..].iter().product();

    let mut out = Vec::with_capacity(outer * indices.len() * inner);
    for o in 0..outer {
        let base = o * axis_len * inner;
        for &i in indices {
            let start = base + i * inner;
            out.extend_from_slice(&values[start..start + inner]);
        }
    }
    out
}

// ── Variable ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub dims: Vec<String>,
    pub data: VarData,
    pub attrs: Attributes,
}

impl Variable {
    pub fn new(name: impl Into<String>, dims: &[&str], data: VarData) -> Self {
        Self {
            name: name.into(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data,
            attrs: Attributes::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }
}

// ── Dataset ─────────────────────────────────────────────────────────────────

/// A named dimension and its current length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    dims: Vec<Dimension>,
    variables: Vec<Variable>,
    attrs: Attributes,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a dimension. Re-declaring with the same length is a no-op.
    pub fn add_dimension(&mut self, name: &str, len: usize) -> Result<()> {
        match self.dims.iter().find(|d| d.name == name) {
            Some(existing) if existing.len == len => Ok(()),
            Some(existing) => Err(ArgoError::ShapeMismatch {
                name: name.to_string(),
                expected: existing.len,
                actual: len,
            }),
            None => {
                self.dims.push(Dimension {
                    name: name.to_string(),
                    len,
                });
                Ok(())
            }
        }
    }

    /// Add a variable whose dimensions are already declared and whose data
    /// length matches their product.
    pub fn add_variable(&mut self, variable: Variable) -> Result<()> {
        if self.has_variable(&variable.name) {
            return Err(ArgoError::DuplicateVariable(variable.name));
        }
        let expected: usize = self.shape_of(&variable.dims)?.iter().product();
        if variable.data.len() != expected {
            return Err(ArgoError::ShapeMismatch {
                name: variable.name,
                expected,
                actual: variable.data.len(),
            });
        }
        self.variables.push(variable);
        Ok(())
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        let pos = self.variables.iter().position(|v| v.name == name)?;
        Some(self.variables.remove(pos))
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// A dataset with no variables carries no data at all.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn dim_len(&self, name: &str) -> Option<usize> {
        self.dims.iter().find(|d| d.name == name).map(|d| d.len)
    }

    /// Snapshot of the current dimension sizes.
    pub fn sizes(&self) -> Vec<Dimension> {
        self.dims.clone()
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(key.to_string(), value.into());
    }

    /// Lengths of the named dimensions, in order.
    pub fn shape_of(&self, dims: &[String]) -> Result<Vec<usize>> {
        dims.iter()
            .map(|d| {
                self.dim_len(d)
                    .ok_or_else(|| ArgoError::UnknownDimension(d.clone()))
            })
            .collect()
    }

    /// Keep only `indices` along `dim`, in the given order, for every
    /// variable laid out over it. Other variables are left alone.
    ///
    /// # Errors
    ///
    /// [`ArgoError::UnknownDimension`] if `dim` is not declared,
    /// [`ArgoError::IndexOutOfRange`] if any index is past its end. Nothing
    /// is modified on error.
    pub fn isel(&mut self, dim: &str, indices: &[usize]) -> Result<()> {
        let len = self
            .dim_len(dim)
            .ok_or_else(|| ArgoError::UnknownDimension(dim.to_string()))?;
        if let Some(&bad) = indices.iter().find(|&&i| i >= len) {
            return Err(ArgoError::IndexOutOfRange {
                dim: dim.to_string(),
                index: bad,
                len,
            });
        }

        let shapes: Vec<Option<(Vec<usize>, usize)>> = self
            .variables
            .iter()
            .map(|v| {
                let axis = v.dims.iter().position(|d| d == dim)?;
                self.shape_of(&v.dims).ok().map(|shape| (shape, axis))
            })
            .collect();

        for (var, shape) in self.variables.iter_mut().zip(shapes) {
            if let Some((shape, axis)) = shape {
                var.data = var.data.take_along(&shape, axis, indices);
            }
        }

        if let Some(d) = self.dims.iter_mut().find(|d| d.name == dim) {
            d.len = indices.len();
        }
        Ok(())
    }
}
