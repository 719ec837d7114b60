//! Nested key-value options.
//!
//! This module provides the `Options` tree the solver is configured from.
//! Values are kept as strings and parsed when read, so an option source can
//! be built in code, loaded from JSON, or filled from a command line without
//! knowing the consumer's types. Sub-sections are named `Options` nodes
//! (e.g. the `laplacexy` section of a simulation's input).

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::KError;

/// Option tree node: string values plus named sub-sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Options {
    #[serde(default)]
    values: BTreeMap<String, String>,
    #[serde(default)]
    sections: BTreeMap<String, Options>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: &str, value: impl Display) -> Self {
        self.set(key, value);
        self
    }

    /// Builder form of inserting a whole sub-section.
    pub fn with_section(mut self, name: &str, section: Options) -> Self {
        self.sections.insert(name.to_owned(), section);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Display) -> &mut Self {
        self.values.insert(key.to_owned(), value.to_string());
        self
    }

    pub fn section(&self, name: &str) -> Option<&Options> {
        self.sections.get(name)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Raw string value of `key`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parsed value of `key`, `None` if absent.
    pub fn get<T>(&self, key: &str) -> Result<Option<T>, KError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get_str(key)
            .map(|s| {
                s.trim()
                    .parse::<T>()
                    .map_err(|e| KError::config(format!("option '{key}' = '{s}': {e}")))
            })
            .transpose()
    }

    pub fn get_or<T>(&self, key: &str, default: T) -> Result<T, KError>
    where
        T: FromStr,
        T::Err: Display,
    {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Boolean value of `key`; accepts true/false, yes/no, on/off and 1/0
    /// (case-insensitive).
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, KError> {
        self.get_str(key).map(|s| parse_bool(key, s)).transpose()
    }

    /// Keys with values at this level, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Parse a JSON object: nested objects become sections; strings, numbers
    /// and booleans become values.
    pub fn from_json(text: &str) -> Result<Self, KError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| KError::config(format!("invalid options JSON: {e}")))?;
        Self::from_value(&value, "")
    }

    fn from_value(value: &Value, path: &str) -> Result<Self, KError> {
        let Value::Object(map) = value else {
            return Err(KError::config(format!("options section '{path}' must be a JSON object")));
        };
        let mut opts = Options::new();
        for (key, v) in map {
            let full = if path.is_empty() { key.clone() } else { format!("{path}:{key}") };
            match v {
                Value::Object(_) => {
                    opts.sections.insert(key.clone(), Self::from_value(v, &full)?);
                }
                Value::String(s) => {
                    opts.values.insert(key.clone(), s.clone());
                }
                Value::Number(n) => {
                    opts.values.insert(key.clone(), n.to_string());
                }
                Value::Bool(b) => {
                    opts.values.insert(key.clone(), b.to_string());
                }
                Value::Null | Value::Array(_) => {
                    return Err(KError::config(format!("option '{full}' must be a scalar or object")));
                }
            }
        }
        Ok(opts)
    }
}

fn parse_bool(key: &str, s: &str) -> Result<bool, KError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" | "y" | "t" => Ok(true),
        "false" | "no" | "off" | "0" | "n" | "f" => Ok(false),
        other => Err(KError::config(format!("option '{key}' = '{other}' is not a boolean"))),
    }
}
