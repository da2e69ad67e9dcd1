//! Flash layout container
//!
//! A [`Flash`] owns the declarative content of a flash, the templates its
//! sections can be created from, and the property overrides given outside
//! of the content. The layout is resolved lazily, the first time a query
//! needs it, and cached afterwards:
//!
//! ```ignore
//! let mut flash = Flash::new("flash", 0x80_0000, FlashAttributes::default())?;
//! flashgen_sections::register_all(&mut flash)?;
//! flash.set_content(content);
//!
//! for section in flash.sections()? {
//!     println!("{} at 0x{:x}", section.name(), section.offset());
//! }
//! let image = flash.get_image(None, None)?;
//! ```

mod emit;
mod resolve;

pub use resolve::ResolvedLayout;

use std::path::{Path, PathBuf};

use once_cell::unsync::OnceCell;

use crate::descriptor::{FlashContent, PropertyOverrides};
use crate::error::Result;
use crate::report;
use crate::section::{check_alignment, Section, SectionContext, SectionKind};
use crate::template::TemplateRegistry;

use resolve::{resolve, ResolveInput};

/// Flash-wide attributes applied to every section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlashAttributes {
    /// Alignment of the start offset of each section
    pub section_start_align: Option<u64>,
    /// Alignment of the size of each section
    pub section_size_align: Option<u64>,
}

impl FlashAttributes {
    /// Check that the alignments are powers of two
    pub fn validate(&self) -> Result<()> {
        if let Some(align) = self.section_start_align {
            check_alignment("section start", align)?;
        }
        if let Some(align) = self.section_size_align {
            check_alignment("section size", align)?;
        }
        Ok(())
    }
}

/// A flash made of sections
pub struct Flash {
    name: String,
    capacity: u64,
    image_name: String,
    output_dir: PathBuf,
    attributes: FlashAttributes,
    templates: TemplateRegistry,
    content: FlashContent,
    overrides: PropertyOverrides,
    layout: OnceCell<ResolvedLayout>,
}

impl std::fmt::Debug for Flash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flash")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("image_name", &self.image_name)
            .field("attributes", &self.attributes)
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

impl Flash {
    /// Create an empty flash of `capacity` bytes
    pub fn new(
        name: impl Into<String>,
        capacity: u64,
        attributes: FlashAttributes,
    ) -> Result<Self> {
        attributes.validate()?;
        let name = name.into();
        Ok(Self {
            image_name: format!("{}.bin", name),
            name,
            capacity,
            output_dir: PathBuf::from("."),
            attributes,
            templates: TemplateRegistry::new(),
            content: FlashContent::default(),
            overrides: PropertyOverrides::default(),
            layout: OnceCell::new(),
        })
    }

    /// Flash name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capacity in bytes
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Flash-wide attributes
    pub fn attributes(&self) -> &FlashAttributes {
        &self.attributes
    }

    /// File name of the flash image
    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// Change the file name of the flash image
    pub fn set_image_name(&mut self, image_name: impl Into<String>) {
        self.image_name = image_name.into();
    }

    /// Directory where images and descriptions are written
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Change the directory where images and descriptions are written
    pub fn set_output_dir(&mut self, dir: impl Into<PathBuf>) {
        self.output_dir = dir.into();
    }

    /// Path of the flash image
    pub fn image_path(&self) -> PathBuf {
        self.output_dir.join(&self.image_name)
    }

    /// Register a section template
    pub fn register_template<F>(&mut self, template: &str, factory: F) -> Result<()>
    where
        F: Fn(&SectionContext<'_>) -> Result<Box<dyn SectionKind>> + 'static,
    {
        self.invalidate();
        self.templates.register(template, factory)
    }

    /// Registered templates
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Set the declarative content
    ///
    /// The content is only parsed when a query needs the layout, so that
    /// overrides can still be set afterwards.
    pub fn set_content(&mut self, content: FlashContent) {
        self.invalidate();
        self.content = content;
    }

    /// Declarative content, without overrides
    pub fn content(&self) -> &FlashContent {
        &self.content
    }

    /// Set the property overrides merged into the content
    pub fn set_overrides(&mut self, overrides: PropertyOverrides) {
        self.invalidate();
        self.overrides = overrides;
    }

    /// Property overrides
    pub fn overrides(&self) -> &PropertyOverrides {
        &self.overrides
    }

    fn invalidate(&mut self) {
        self.layout.take();
    }

    fn resolve_input(&self) -> ResolveInput<'_> {
        ResolveInput {
            flash_name: &self.name,
            capacity: self.capacity,
            attributes: &self.attributes,
            templates: &self.templates,
            content: &self.content,
            overrides: &self.overrides,
        }
    }

    /// Resolved layout, computed on first use
    ///
    /// Fails with [`FlashError::FlashOverflow`](crate::FlashError::FlashOverflow)
    /// if the sections do not fit in the flash.
    pub fn layout(&self) -> Result<&ResolvedLayout> {
        let layout = self.preview_layout()?;
        layout.check_overflow()?;
        Ok(layout)
    }

    /// Layout tolerating an overflowing content
    ///
    /// Sections after the first one crossing the capacity are left out.
    /// Shares its cache with [`Flash::layout`].
    pub fn preview_layout(&self) -> Result<&ResolvedLayout> {
        self.layout.get_or_try_init(|| resolve(&self.resolve_input()))
    }

    /// Sections in layout order
    pub fn sections(&self) -> Result<&[Section]> {
        Ok(self.layout()?.sections())
    }

    /// Find a section by name
    pub fn section_by_name(&self, name: &str) -> Result<Option<&Section>> {
        Ok(self.layout()?.get(name))
    }

    /// Index of a section in layout order
    pub fn section_index(&self, name: &str) -> Result<Option<usize>> {
        Ok(self.layout()?.index_of(name))
    }

    /// Tell if no section holds meaningful data
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.sections()?.iter().all(Section::is_empty))
    }

    /// Render the layout table
    ///
    /// Uses the preview layout, so an overflowing content can still be
    /// inspected. Section contents are rendered when `level` is above zero.
    pub fn dump_layout(&self, level: usize) -> Result<String> {
        let layout = self.preview_layout()?;

        let mut headers = vec!["Section offset", "Section name", "Section size"];
        if level > 0 {
            headers.push("Section content");
        }
        let mut table = report::table(&headers);

        for section in layout.sections() {
            let mut row = vec![
                format!("0x{:x}", section.offset()),
                section.name().to_string(),
                format!("0x{:x}", section.size()),
            ];
            if level > 0 {
                row.push(section.dump_table(level - 1));
            }
            table.add_row(row);
        }

        Ok(format!("\nLayout for flash: {}\n{}", self.name, table))
    }

    /// Render the properties of every section
    pub fn dump_section_properties(&self) -> Result<String> {
        let mut table = report::table(&[
            "Section name",
            "Property name",
            "Property value",
            "Property description",
        ]);

        for section in self.sections()? {
            for property in section.properties().iter() {
                table.add_row(vec![
                    section.name().to_string(),
                    property.name.clone(),
                    property.value.to_string(),
                    property.description.clone(),
                ]);
            }
        }

        Ok(format!("Section properties for flash: {}\n{}", self.name, table))
    }
}
