// biolighthouse: Build and run cutadapt, flash2 and DADA2 jobs locally or on SLURM.
//
// Copyright 2019 Tanner Dowhy [tanner.dowhy@usask.ca].
//
// Copyrights in this project are retained by contributors. No copyright assignment
// is required to contribute to this project.
//
// Except as otherwise noted (below and/or in individual files), this
// project is licensed under the Apache License, Version 2.0
// <LICENSE-APACHE> or <http://www.apache.org/licenses/LICENSE-2.0> or
// the MIT license, <LICENSE-MIT> or <http://opensource.org/licenses/MIT>,
// at your option.
//

//! Typed option declarations and resolved parameter sets.
//!
//! Every wrapped tool declares its options as a static slice of
//! [OptionSpec]. The values supplied by the user are resolved against that
//! slice into a [ParameterSet], which fills in the declared defaults and
//! checks types and allowed values once, before any command line is built.
//!

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::Error;

/// Declared type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Str,
    Path,
    Int,
    Float,
    Bool,
    List,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Kind::Str => "str",
            Kind::Path => "path",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Bool => "bool",
            Kind::List => "list",
        };
        write!(f, "{}", name)
    }
}

/// Default value of an option as written in a static table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Null,
    Str(&'static str),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// A single option value.
///
/// `Null` stands for an option that was neither supplied nor has a default.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Str(_) => "str",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
        }
    }

    /// Returns true if the value can be stored in an option of `kind`.
    ///
    /// Null fits every kind.
    pub fn fits(&self, kind: Kind) -> bool {
        matches!(
            (self, kind),
            (Value::Null, _)
                | (Value::Str(_), Kind::Str)
                | (Value::Str(_), Kind::Path)
                | (Value::Int(_), Kind::Int)
                | (Value::Float(_), Kind::Float)
                | (Value::Bool(_), Kind::Bool)
                | (Value::List(_), Kind::List)
        )
    }
}

/// Formats a float the way the wrapped tools document their defaults:
/// shortest round-trip form, always with a fractional part.
fn format_float(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Str(x) => write!(f, "{}", x),
            Value::Int(x) => write!(f, "{}", x),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::List(x) => write!(f, "{}", x.join(",")),
        }
    }
}

impl From<DefaultValue> for Value {
    fn from(default: DefaultValue) -> Self {
        match default {
            DefaultValue::Null => Value::Null,
            DefaultValue::Str(x) => Value::Str(x.to_string()),
            DefaultValue::Int(x) => Value::Int(x),
            DefaultValue::Float(x) => Value::Float(x),
            DefaultValue::Bool(x) => Value::Bool(x),
        }
    }
}

impl PartialEq<DefaultValue> for Value {
    fn eq(&self, other: &DefaultValue) -> bool {
        match (self, other) {
            (Value::Null, DefaultValue::Null) => true,
            (Value::Str(a), DefaultValue::Str(b)) => a == b,
            (Value::Int(a), DefaultValue::Int(b)) => a == b,
            (Value::Float(a), DefaultValue::Float(b)) => a == b,
            (Value::Bool(a), DefaultValue::Bool(b)) => a == b,
            _ => false,
        }
    }
}

// Step files may list numbers, e.g. `quality_cutoff = [20, 15]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<RawScalar>),
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawValue::deserialize(deserializer)?;
        let value = match raw {
            RawValue::Bool(x) => Value::Bool(x),
            RawValue::Int(x) => Value::Int(x),
            RawValue::Float(x) => Value::Float(x),
            RawValue::Str(x) => Value::Str(x),
            RawValue::List(items) => Value::List(items.into_iter().map(|item| match item {
                RawScalar::Int(x) => x.to_string(),
                RawScalar::Float(x) => format_float(x),
                RawScalar::Str(x) => x,
            }).collect()),
        };
        Ok(value)
    }
}

/// Declaration of one tool option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: Kind,
    pub default: DefaultValue,
    /// Allowed values, compared against the formatted value. Empty means any.
    pub choices: &'static [&'static str],
    pub required: bool,
}

/// Declares an optional option without a restricted value set.
pub const fn opt(name: &'static str, kind: Kind, default: DefaultValue) -> OptionSpec {
    OptionSpec { name, kind, default, choices: &[], required: false }
}

impl OptionSpec {
    pub const fn choices(self, choices: &'static [&'static str]) -> Self {
        OptionSpec { choices, ..self }
    }

    pub const fn required(self) -> Self {
        OptionSpec { required: true, ..self }
    }

    /// Checks `value` against the declared kind, allowed values and the
    /// required marker.
    ///
    /// Never converts: a value of the wrong kind is an error.
    pub fn check(
        &self,
        value: &Value,
    ) -> Result<(), Error> {
        if value.is_null() {
            if self.required {
                return Err(Error::invalid_option(self.name, "a value is required"));
            }
            return Ok(());
        }
        if !value.fits(self.kind) {
            return Err(Error::invalid_option(
                self.name,
                format!("expected {}, got {} '{}'", self.kind, value.kind_name(), value),
            ));
        }
        if !self.choices.is_empty() {
            let formatted = value.to_string();
            if !self.choices.contains(&formatted.as_str()) {
                return Err(Error::invalid_option(
                    self.name,
                    format!("'{}' is not one of: {}", formatted, self.choices.join(", ")),
                ));
            }
        }
        Ok(())
    }
}

/// Lossless conversions applied to supplied values.
///
/// Step files and `--set` type values by their syntax, so `20` arrives as an
/// integer even for string and list options.
fn widen(
    value: &Value,
    kind: Kind,
) -> Value {
    match (value, kind) {
        (Value::Int(x), Kind::Float) => Value::Float(*x as f64),
        (Value::Int(_) | Value::Float(_), Kind::Str | Kind::Path) => Value::Str(value.to_string()),
        (Value::Str(_) | Value::Int(_) | Value::Float(_), Kind::List) => Value::List(vec![value.to_string()]),
        _ => value.clone(),
    }
}

/// Option values for one tool invocation.
///
/// Created by [ParameterSet::resolve], which guarantees that every declared
/// option has an entry that passed [OptionSpec::check]. The set is not
/// modified afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    values: IndexMap<String, Value>,
}

impl ParameterSet {
    /// Resolve user supplied values against the declared `options`.
    ///
    /// Missing options take their declared default. Integers given for float
    /// options are widened, numbers given for string or path options are
    /// formatted, and a scalar given for a list option becomes a one-element
    /// list. No other conversion is done.
    ///
    /// ## Errors
    ///
    /// Returns [Error::InvalidOption] for unknown option names, values of the
    /// wrong type, values outside of the allowed set, and missing required
    /// options.
    ///
    /// ## Usage
    ///
    /// ```rust
    /// use biolighthouse::params::{opt, DefaultValue, Kind, ParameterSet, Value};
    /// use indexmap::IndexMap;
    ///
    /// let options = [
    ///     opt("error_rate", Kind::Float, DefaultValue::Float(0.1)),
    ///     opt("action", Kind::Str, DefaultValue::Str("trim")).choices(&["trim", "mask", "none"]),
    /// ];
    ///
    /// let mut supplied: IndexMap<String, Value> = IndexMap::new();
    /// supplied.insert("error_rate".to_string(), Value::Int(0));
    ///
    /// let params = ParameterSet::resolve(&options, &supplied).unwrap();
    /// assert_eq!(params.get("error_rate"), Some(&Value::Float(0.0)));
    /// assert_eq!(params.get("action"), Some(&Value::Str("trim".to_string())));
    /// ```
    ///
    pub fn resolve(
        options: &[OptionSpec],
        supplied: &IndexMap<String, Value>,
    ) -> Result<Self, Error> {
        if let Some(unknown) = supplied.keys().find(|name| !options.iter().any(|option| option.name == name.as_str())) {
            return Err(Error::invalid_option(unknown, "not a recognised option"));
        }

        let mut values: IndexMap<String, Value> = IndexMap::with_capacity(options.len());
        for option in options {
            let value = match supplied.get(option.name) {
                Some(value) => widen(value, option.kind),
                None => Value::from(option.default),
            };
            option.check(&value)?;
            values.insert(option.name.to_string(), value);
        }

        Ok(Self { values })
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns the string value of `name`, or None if it is null or not a string.
    pub fn str(
        &self,
        name: &str,
    ) -> Option<&str> {
        match self.values.get(name) {
            Some(Value::Str(x)) => Some(x.as_str()),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}
