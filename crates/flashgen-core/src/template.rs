//! Section template registry
//!
//! A template is a named factory creating a [`SectionKind`]. Targets register
//! the templates they support on the flash, and the flash content refers to
//! them by name.

use std::collections::HashMap;

use crate::error::{FlashError, Result};
use crate::section::{SectionContext, SectionKind};

/// Factory creating the kind of a section
pub type SectionFactory = Box<dyn Fn(&SectionContext<'_>) -> Result<Box<dyn SectionKind>>>;

/// Mapping from template id to section factory
#[derive(Default)]
pub struct TemplateRegistry {
    factories: HashMap<String, SectionFactory>,
}

impl TemplateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a template id
    pub fn register<F>(&mut self, template: &str, factory: F) -> Result<()>
    where
        F: Fn(&SectionContext<'_>) -> Result<Box<dyn SectionKind>> + 'static,
    {
        if self.factories.contains_key(template) {
            return Err(FlashError::DuplicateTemplate(template.to_string()));
        }

        log::trace!("Registered section template '{}'", template);
        self.factories
            .insert(template.to_string(), Box::new(factory));
        Ok(())
    }

    /// Look up the factory of a template
    ///
    /// `section` is only used to give context in the error.
    pub fn resolve(&self, template: &str, section: &str) -> Result<&SectionFactory> {
        self.factories
            .get(template)
            .ok_or_else(|| FlashError::UnknownTemplate {
                section: section.to_string(),
                template: template.to_string(),
            })
    }

    /// Check if a template is registered
    pub fn contains(&self, template: &str) -> bool {
        self.factories.contains_key(template)
    }

    /// Registered template ids, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("templates", &self.names())
            .finish()
    }
}
