//! Layout resolution
//!
//! Turns the declarative content of a flash into placed sections. This is a
//! pure function of its inputs; [`Flash`](super::Flash) memoizes the result.
//!
//! The work is split in three passes because finalize hooks may need the
//! offset or size of any other section, including the ones declared after
//! them:
//!
//! 1. instantiate every section from its template,
//! 2. give each section its base offset and let it declare its content,
//! 3. finalize every section with a view of the whole layout.

use crate::descriptor::{FlashContent, PropertyOverrides};
use crate::error::{FlashError, Result};
use crate::section::{LayoutView, Section, SectionContext};
use crate::template::TemplateRegistry;

use super::FlashAttributes;

/// Inputs of the layout resolution
pub(crate) struct ResolveInput<'a> {
    pub flash_name: &'a str,
    pub capacity: u64,
    pub attributes: &'a FlashAttributes,
    pub templates: &'a TemplateRegistry,
    pub content: &'a FlashContent,
    pub overrides: &'a PropertyOverrides,
}

/// First section crossing the capacity of the flash
#[derive(Debug, Clone)]
struct Overflow {
    section: String,
    flash: String,
    capacity: u64,
    end: u64,
}

impl Overflow {
    fn error(&self) -> FlashError {
        FlashError::FlashOverflow {
            section: self.section.clone(),
            flash: self.flash.clone(),
            capacity: self.capacity,
            end: self.end,
        }
    }
}

/// Placed and finalized sections of a flash
#[derive(Debug)]
pub struct ResolvedLayout {
    sections: Vec<Section>,
    view: LayoutView,
    overflow: Option<Overflow>,
}

impl ResolvedLayout {
    /// Sections in layout order
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Find a section by name
    pub fn get(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name() == name)
    }

    /// Index of a section in layout order
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.name() == name)
    }

    /// Placements as seen by finalize hooks
    pub fn view(&self) -> &LayoutView {
        &self.view
    }

    /// True if the layout stopped at an overflowing section
    pub fn is_truncated(&self) -> bool {
        self.overflow.is_some()
    }

    /// Fail with [`FlashError::FlashOverflow`] if the layout was truncated
    pub fn check_overflow(&self) -> Result<()> {
        match &self.overflow {
            Some(overflow) => Err(overflow.error()),
            None => Ok(()),
        }
    }
}

/// Resolve the layout of a flash
///
/// Placement stops at the first section crossing the capacity. The sections
/// placed so far are still finalized and the overflow is recorded in the
/// result, so one resolution serves both checked queries and previews.
pub(crate) fn resolve(input: &ResolveInput<'_>) -> Result<ResolvedLayout> {
    let content = input.content.with_overrides(input.overrides)?;

    // Validate descriptors first so that factories can see every name
    let mut names: Vec<String> = Vec::with_capacity(content.sections.len());
    let mut templates: Vec<&str> = Vec::with_capacity(content.sections.len());
    for (index, descriptor) in content.sections.iter().enumerate() {
        let name = descriptor.name.as_deref().ok_or(FlashError::MissingField {
            index,
            field: "name",
        })?;
        let template = descriptor
            .template
            .as_deref()
            .ok_or(FlashError::MissingField {
                index,
                field: "template",
            })?;

        if names.iter().any(|n| n == name) {
            return Err(FlashError::DuplicateSection(name.to_string()));
        }
        names.push(name.to_string());
        templates.push(template);
    }

    // Instantiation pass
    let mut sections = Vec::with_capacity(names.len());
    for (id, (name, template)) in names.iter().zip(&templates).enumerate() {
        let factory = input.templates.resolve(template, name)?;
        let ctx = SectionContext {
            flash_name: input.flash_name,
            name,
            id,
            sections: &names,
        };
        let kind = factory(&ctx)?;
        sections.push(Section::new(&ctx, kind)?);
    }

    // Offset assignment pass
    let mut flash_offset = 0u64;
    let mut placed = 0;
    let mut overflow = None;
    for (section, descriptor) in sections.iter_mut().zip(&content.sections) {
        section.set_alignment(
            input.attributes.section_start_align,
            input.attributes.section_size_align,
        );
        section.set_content(flash_offset, descriptor)?;
        flash_offset = section.end();
        placed += 1;

        if flash_offset > input.capacity {
            log::warn!(
                "Section '{}' overflows flash '{}' (0x{:x} > 0x{:x}), ignoring next sections",
                section.name(),
                input.flash_name,
                flash_offset,
                input.capacity
            );
            overflow = Some(Overflow {
                section: section.name().to_string(),
                flash: input.flash_name.to_string(),
                capacity: input.capacity,
                end: flash_offset,
            });
            break;
        }
    }
    sections.truncate(placed);

    // Finalize pass. A hook failing on a truncated layout reports the
    // overflow, which is the root cause.
    let view = LayoutView::new(sections.iter().map(Section::placement).collect());
    for section in &mut sections {
        section
            .finalize(&view)
            .map_err(|err| overflow.as_ref().map_or(err, Overflow::error))?;
    }

    log::debug!(
        "Resolved layout of flash '{}': {} sections, 0x{:x} bytes used",
        input.flash_name,
        sections.len(),
        flash_offset
    );

    Ok(ResolvedLayout {
        sections,
        view,
        overflow,
    })
}
