//! Section properties
//!
//! Every section owns a [`PropertyRegistry`]. Properties must be declared by
//! the section (with a default value and a description) before the flash
//! content or command-line overrides can set them.

use std::fmt;

use crate::error::{FlashError, Result};

/// Value held by a property
///
/// Values coming from the command line are always strings, so integer
/// accessors also accept string-encoded integers like `"0x1000"`.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// No value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// String value
    Str(String),
    /// List of values, extended (not replaced) by overrides
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Decode the value as an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(s) => parse_int(s).ok(),
            _ => None,
        }
    }

    /// Decode the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(true),
                "false" | "no" | "off" | "0" => Some(false),
                _ => None,
            },
            Self::Int(n) => Some(*n != 0),
            _ => None,
        }
    }

    /// Borrow the value as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the value as a list
    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the value type, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Str(_) => "string",
            Self::List(_) => "list",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "None"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "{}", s),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Parse an integer that can be hex (0x...), octal (0o...), binary (0b...)
/// or decimal, optionally negative
pub fn parse_int(s: &str) -> std::result::Result<i64, String> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e))?
    } else if let Some(oct) = digits.strip_prefix("0o").or_else(|| digits.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8).map_err(|e| format!("invalid octal: {}", e))?
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).map_err(|e| format!("invalid binary: {}", e))?
    } else {
        digits
            .parse::<i64>()
            .map_err(|e| format!("invalid number: {}", e))?
    };

    Ok(if negative { -value } else { value })
}

/// A declared property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Name of the property
    pub name: String,
    /// Current value
    pub value: PropertyValue,
    /// Human readable description
    pub description: String,
}

/// Ordered set of declared properties owned by one entity
#[derive(Debug, Clone, Default)]
pub struct PropertyRegistry {
    owner: String,
    properties: Vec<Property>,
}

impl PropertyRegistry {
    /// Create an empty registry for the named owner
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            properties: Vec::new(),
        }
    }

    /// Name of the entity owning this registry
    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn find(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    fn undeclared(&self, name: &str) -> FlashError {
        FlashError::UndeclaredProperty {
            owner: self.owner.clone(),
            property: name.to_string(),
        }
    }

    /// Declare a property with its default value
    pub fn declare(
        &mut self,
        name: &str,
        value: impl Into<PropertyValue>,
        description: &str,
    ) -> Result<()> {
        if self.is_declared(name) {
            return Err(FlashError::DuplicateProperty {
                owner: self.owner.clone(),
                property: name.to_string(),
            });
        }

        self.properties.push(Property {
            name: name.to_string(),
            value: value.into(),
            description: description.to_string(),
        });
        Ok(())
    }

    /// Check whether a property has been declared
    pub fn is_declared(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Set the value of a declared property
    pub fn set(&mut self, name: &str, value: impl Into<PropertyValue>) -> Result<()> {
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(prop) => {
                prop.value = value.into();
                Ok(())
            }
            None => Err(self.undeclared(name)),
        }
    }

    /// Get the value of a declared property
    pub fn get(&self, name: &str) -> Result<&PropertyValue> {
        self.find(name)
            .map(|p| &p.value)
            .ok_or_else(|| self.undeclared(name))
    }

    fn invalid(&self, name: &str, expected: &'static str, found: &PropertyValue) -> FlashError {
        FlashError::InvalidPropertyValue {
            owner: self.owner.clone(),
            property: name.to_string(),
            expected,
            found: found.to_string(),
        }
    }

    /// Get an integer property, `None` if the property is null
    pub fn get_int(&self, name: &str) -> Result<Option<i64>> {
        let value = self.get(name)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_int()
            .map(Some)
            .ok_or_else(|| self.invalid(name, "integer", value))
    }

    /// Get a boolean property, `None` if the property is null
    pub fn get_bool(&self, name: &str) -> Result<Option<bool>> {
        let value = self.get(name)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_bool()
            .map(Some)
            .ok_or_else(|| self.invalid(name, "bool", value))
    }

    /// Get a string property, `None` if the property is null
    pub fn get_str(&self, name: &str) -> Result<Option<&str>> {
        let value = self.get(name)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_str()
            .map(Some)
            .ok_or_else(|| self.invalid(name, "string", value))
    }

    /// Get a list property
    ///
    /// A null value is an empty list and a scalar is a one-element list, so
    /// that a single value given on the command line still works.
    pub fn get_list(&self, name: &str) -> Result<Vec<PropertyValue>> {
        let value = self.get(name)?;
        Ok(match value.as_list() {
            Some(items) => items.to_vec(),
            None if value.is_null() => Vec::new(),
            None => vec![value.clone()],
        })
    }

    /// Iterate over properties in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    /// Number of declared properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if no property has been declared
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
