//! Declarative flash content and property overrides
//!
//! [`FlashContent`] is the ordered list of sections a flash is made of, as
//! read from a description file. [`PropertyOverrides`] carries the property
//! values given outside of that content (typically on the command line);
//! they are merged into a private copy of the content before the layout is
//! resolved.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::{FlashError, Result};
use crate::property::PropertyValue;

/// Insertion-ordered mapping from property name to value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    entries: Vec<(String, PropertyValue)>,
}

impl PropertyMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value of a key
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Get a mutable reference to the value of a key
    pub fn get_mut(&mut self, key: &str) -> Option<&mut PropertyValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Set a key, keeping its original position if it already exists
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        let key = key.into();
        let value = value.into();
        match self.get_mut(&key) {
            Some(slot) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Iterate over entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<'de> Deserialize<'de> for PropertyMap {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MapVisitor;

        impl<'de> Visitor<'de> for MapVisitor {
            type Value = PropertyMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of section properties")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<PropertyMap, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut map = PropertyMap::new();
                while let Some((key, value)) = access.next_entry::<String, PropertyValue>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(MapVisitor)
    }
}

/// Description of one section in the flash content
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SectionDescriptor {
    /// Unique section name
    pub name: Option<String>,
    /// Template used to instantiate the section
    pub template: Option<String>,
    /// Values for the properties declared by the template
    #[serde(default)]
    pub properties: Option<PropertyMap>,
}

impl SectionDescriptor {
    /// Create a descriptor with a name and a template
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            template: Some(template.into()),
            properties: None,
        }
    }

    /// Builder-style helper to set a property
    pub fn with_property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties
            .get_or_insert_with(PropertyMap::new)
            .insert(key, value);
        self
    }
}

/// Ordered list of sections describing a flash
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FlashContent {
    /// Sections in layout order
    #[serde(default)]
    pub sections: Vec<SectionDescriptor>,
}

impl FlashContent {
    /// Create a content from descriptors
    pub fn new(sections: Vec<SectionDescriptor>) -> Self {
        Self { sections }
    }

    /// Find the descriptor of a section by name
    pub fn section_mut(&mut self, name: &str) -> Option<&mut SectionDescriptor> {
        self.sections
            .iter_mut()
            .find(|s| s.name.as_deref() == Some(name))
    }

    /// Return a copy of this content with the overrides merged in
    ///
    /// For each `(key, value)` override, a list-valued property gets the
    /// value appended; any other property is set or replaced.
    pub fn with_overrides(&self, overrides: &PropertyOverrides) -> Result<FlashContent> {
        let mut content = self.clone();

        for (section_name, properties) in overrides.iter() {
            let section = content
                .section_mut(section_name)
                .ok_or_else(|| FlashError::UnknownSection(section_name.to_string()))?;
            let map = section.properties.get_or_insert_with(PropertyMap::new);

            for (key, value) in properties {
                match map.get_mut(key) {
                    Some(PropertyValue::List(items)) => items.push(value.clone()),
                    _ => map.insert(key.as_str(), value.clone()),
                }
            }
        }

        Ok(content)
    }
}

/// Property values supplied outside of the flash content, keyed by section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyOverrides {
    sections: Vec<(String, Vec<(String, PropertyValue)>)>,
}

impl PropertyOverrides {
    /// Create an empty override set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an override for a section property
    pub fn add(
        &mut self,
        section: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) {
        let section = section.into();
        let entry = (key.into(), value.into());
        match self.sections.iter_mut().find(|(name, _)| *name == section) {
            Some((_, properties)) => properties.push(entry),
            None => self.sections.push((section, vec![entry])),
        }
    }

    /// Parse and add an override written as `section:key=value`
    pub fn parse_entry(&mut self, entry: &str) -> Result<()> {
        let invalid = |reason: &str| FlashError::InvalidOverride {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let (target, value) = entry
            .split_once('=')
            .ok_or_else(|| invalid("expected section:key=value"))?;
        let (section, key) = target
            .split_once(':')
            .ok_or_else(|| invalid("expected section:key before '='"))?;

        let section = section.trim();
        let key = key.trim();
        if section.is_empty() || key.is_empty() {
            return Err(invalid("section and key must not be empty"));
        }

        self.add(section, key, value.trim());
        Ok(())
    }

    /// Iterate over sections and their overrides, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[(String, PropertyValue)])> {
        self.sections
            .iter()
            .map(|(name, props)| (name.as_str(), props.as_slice()))
    }

    /// Check if there is no override
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
