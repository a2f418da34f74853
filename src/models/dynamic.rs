// Generic parameter bag for schema-driven pass editing
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::pipeline::PassKind;

/// A single dynamic parameter value.
///
/// `Unset` is the explicit "do not pass this to the tool" marker and is
/// distinct from a present value that happens to equal the default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Unset,
}

impl ParamValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "boolean",
            ParamValue::Int(_) => "integer",
            ParamValue::Float(_) => "number",
            ParamValue::Str(_) => "string",
            ParamValue::Unset => "null",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, ParamValue::Unset)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<&String> for ParamValue {
    fn from(v: &String) -> Self {
        ParamValue::Str(v.clone())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ParamValue::Unset)
    }
}

/// Closed set of string-valued choices (presets, methods, kernels).
pub trait ParamChoice: Sized + Copy + 'static {
    const VARIANTS: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse(value: &str) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|v| v.as_str() == value)
    }

    fn options() -> Vec<&'static str> {
        Self::VARIANTS.iter().map(|v| v.as_str()).collect()
    }
}

/// Declares a choice enum whose serde names and `as_str` labels are the same table.
macro_rules! param_choice {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant ),+
        }

        impl $crate::models::dynamic::ParamChoice for $name {
            const VARIANTS: &'static [Self] = &[$($name::$variant),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }
        }
    };
}

pub(crate) use param_choice;

/// Runtime value bag for one pass: selected method plus name -> value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicParameters {
    pub filter_id: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub values: BTreeMap<String, ParamValue>,
}

impl DynamicParameters {
    pub fn new(pass: PassKind, enabled: bool, method: Option<&str>) -> Self {
        Self {
            filter_id: pass.filter_id().to_string(),
            enabled,
            method: method.map(str::to_string),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.values.remove(name)
    }
}

/// Strongly-typed pass records that can be edited through a `DynamicParameters` bag.
pub trait DynamicRecord: Sized {
    const PASS: PassKind;

    fn to_dynamic(&self) -> DynamicParameters;

    fn from_dynamic(params: &DynamicParameters) -> Result<Self>;
}

/// Typed reader over a `DynamicParameters` bag.
///
/// Missing names fall back to the supplied default; every name read is
/// recorded so `finish` can reject anything left over.
pub struct ParamReader<'a> {
    pass: PassKind,
    params: &'a DynamicParameters,
    consumed: BTreeSet<&'static str>,
}

impl<'a> ParamReader<'a> {
    pub fn new(pass: PassKind, params: &'a DynamicParameters) -> Result<Self> {
        if params.filter_id != pass.filter_id() {
            return Err(Error::schema_mismatch(
                pass.filter_id(),
                "filterId",
                format!("expected '{}', got '{}'", pass.filter_id(), params.filter_id),
            ));
        }
        Ok(Self {
            pass,
            params,
            consumed: BTreeSet::new(),
        })
    }

    pub fn enabled(&self) -> bool {
        self.params.enabled
    }

    fn take(&mut self, name: &'static str) -> Option<&'a ParamValue> {
        self.consumed.insert(name);
        let params = self.params;
        params.values.get(name)
    }

    fn mismatch(&self, name: &str, reason: String) -> Error {
        Error::schema_mismatch(self.pass.filter_id(), name, reason)
    }

    fn expected(&self, name: &str, expected: &str, got: &ParamValue) -> Error {
        self.mismatch(name, format!("expected {}, got {}", expected, got.type_name()))
    }

    pub fn method<C: ParamChoice>(&self, default: C) -> Result<C> {
        match self.params.method.as_deref() {
            None => Ok(default),
            Some(id) => C::parse(id)
                .ok_or_else(|| self.mismatch("method", format!("unknown method '{}'", id))),
        }
    }

    /// For passes without alternative algorithms.
    pub fn no_method(&self) -> Result<()> {
        match self.params.method.as_deref() {
            None => Ok(()),
            Some(id) => Err(self.mismatch("method", format!("pass has no method '{}'", id))),
        }
    }

    pub fn bool(&mut self, name: &'static str, default: bool) -> Result<bool> {
        match self.take(name) {
            None => Ok(default),
            Some(ParamValue::Bool(b)) => Ok(*b),
            Some(other) => Err(self.expected(name, "boolean", other)),
        }
    }

    pub fn int(&mut self, name: &'static str, default: i32) -> Result<i32> {
        match self.take(name) {
            None => Ok(default),
            Some(value) => self.to_i32(name, value),
        }
    }

    pub fn float(&mut self, name: &'static str, default: f64) -> Result<f64> {
        match self.take(name) {
            None => Ok(default),
            Some(value) => value
                .as_f64()
                .ok_or_else(|| self.expected(name, "number", value)),
        }
    }

    pub fn string(&mut self, name: &'static str, default: &str) -> Result<String> {
        match self.take(name) {
            None => Ok(default.to_string()),
            Some(ParamValue::Str(s)) => Ok(s.clone()),
            Some(other) => Err(self.expected(name, "string", other)),
        }
    }

    pub fn choice<C: ParamChoice>(&mut self, name: &'static str, default: C) -> Result<C> {
        match self.take(name) {
            None => Ok(default),
            Some(ParamValue::Str(s)) => C::parse(s).ok_or_else(|| {
                self.mismatch(
                    name,
                    format!("'{}' is not one of {}", s, C::options().join(", ")),
                )
            }),
            Some(other) => Err(self.expected(name, "string", other)),
        }
    }

    pub fn opt_bool(&mut self, name: &'static str) -> Result<Option<bool>> {
        match self.take(name) {
            None | Some(ParamValue::Unset) => Ok(None),
            Some(ParamValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.expected(name, "boolean or null", other)),
        }
    }

    pub fn opt_int(&mut self, name: &'static str) -> Result<Option<i32>> {
        match self.take(name) {
            None | Some(ParamValue::Unset) => Ok(None),
            Some(value) => self.to_i32(name, value).map(Some),
        }
    }

    pub fn opt_float(&mut self, name: &'static str) -> Result<Option<f64>> {
        match self.take(name) {
            None | Some(ParamValue::Unset) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.expected(name, "number or null", value)),
        }
    }

    pub fn opt_string(&mut self, name: &'static str) -> Result<Option<String>> {
        match self.take(name) {
            None | Some(ParamValue::Unset) => Ok(None),
            Some(ParamValue::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.expected(name, "string or null", other)),
        }
    }

    fn to_i32(&self, name: &str, value: &ParamValue) -> Result<i32> {
        match value {
            ParamValue::Int(i) => i32::try_from(*i)
                .map_err(|_| self.mismatch(name, format!("{} is out of range", i))),
            other => Err(self.expected(name, "integer", other)),
        }
    }

    /// Rejects any value the record did not read.
    pub fn finish(self) -> Result<()> {
        match self
            .params
            .values
            .keys()
            .find(|k| !self.consumed.contains(k.as_str()))
        {
            Some(unknown) => Err(self.mismatch(unknown, "unknown parameter".to_string())),
            None => Ok(()),
        }
    }
}
