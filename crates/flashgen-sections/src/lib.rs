//! Built-in section templates
//!
//! Each module implements one [`SectionKind`]. [`register_all`] makes all of
//! them available on a flash under the names listed in [`TEMPLATES`].
//!
//! # Example
//!
//! ```ignore
//! let mut flash = Flash::new("flash", 0x10_0000, FlashAttributes::default())?;
//! flashgen_sections::register_all(&mut flash)?;
//! ```

#![warn(rust_2018_idioms)]

pub mod partition_table;
pub mod raw;
pub mod readfs;
pub mod reserved;

use std::fs;
use std::mem::size_of;

use flashgen_core::section::{Content, SectionAllocator, SectionContext, SectionKind};
use flashgen_core::{Flash, FlashError, Result};
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{Immutable, IntoBytes};

/// Partition type of sections holding data
pub const PARTITION_TYPE_DATA: u8 = 0x01;

/// Factory signature shared by the built-in templates
pub type CreateFn = fn(&SectionContext<'_>) -> Result<Box<dyn SectionKind>>;

/// Information about a built-in template
pub struct TemplateInfo {
    /// Template id used in flash descriptions
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
    /// Factory creating the section kind
    pub create: CreateFn,
}

/// All built-in templates
pub const TEMPLATES: &[TemplateInfo] = &[
    TemplateInfo {
        name: raw::TEMPLATE,
        description: "Content of a single file (file=<path>)",
        create: raw::create,
    },
    TemplateInfo {
        name: reserved::TEMPLATE,
        description: "Space kept free, sized with the size property",
        create: reserved::create,
    },
    TemplateInfo {
        name: readfs::TEMPLATE,
        description: "Read-only file system (files=[<path>...], file_align=<n>)",
        create: readfs::create,
    },
    TemplateInfo {
        name: partition_table::TEMPLATE,
        description: "Table of the sections of the flash (version=<n>, include_self=<bool>)",
        create: partition_table::create,
    },
];

/// Register every built-in template on a flash
pub fn register_all(flash: &mut Flash) -> Result<()> {
    for template in TEMPLATES {
        flash.register_template(template.name, template.create)?;
    }
    Ok(())
}

/// Read a file referenced by a section property
pub(crate) fn read_file(path: &str) -> Result<Vec<u8>> {
    let data = fs::read(path).map_err(|e| FlashError::io("section file", path, e))?;
    log::debug!("Read {} bytes from {}", data.len(), path);
    Ok(data)
}

/// Convert an offset or size to a 32-bit little-endian field
pub(crate) fn field_u32(
    section: &str,
    field: &'static str,
    value: u64,
) -> Result<U32<LittleEndian>> {
    u32::try_from(value)
        .map(U32::new)
        .map_err(|_| FlashError::FieldOverflow {
            section: section.to_string(),
            field,
            value,
        })
}

/// Copy a name into a NUL-terminated fixed-size field
///
/// Returns `None` when the name and its terminator do not fit.
pub(crate) fn name_field<const N: usize>(name: &str) -> Option<[u8; N]> {
    let bytes = name.as_bytes();
    if bytes.len() >= N {
        return None;
    }
    let mut field = [0u8; N];
    field[..bytes.len()].copy_from_slice(bytes);
    Some(field)
}

/// Read back a name stored with [`name_field`]
pub(crate) fn field_name(field: &[u8]) -> String {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..len]).into_owned()
}

/// Fixed-layout binary record
pub(crate) trait Record: IntoBytes + Immutable {
    /// One-line rendering for the layout dump
    fn describe(&self) -> String;
}

/// Contiguous records placed at an absolute offset
pub(crate) struct RecordBlock<T> {
    label: &'static str,
    offset: u64,
    pub(crate) records: Vec<T>,
}

impl<T: Record> RecordBlock<T> {
    /// Reserve room for `records` in the allocator
    pub(crate) fn new(label: &'static str, alloc: &mut SectionAllocator, records: Vec<T>) -> Self {
        let offset = alloc.alloc((size_of::<T>() * records.len()) as u64);
        Self::at(label, offset, records)
    }

    /// Records whose room was already reserved at `offset`
    pub(crate) fn at(label: &'static str, offset: u64, records: Vec<T>) -> Self {
        Self {
            label,
            offset,
            records,
        }
    }
}

impl<T: Record> Content for RecordBlock<T> {
    fn pack(&self) -> Vec<u8> {
        self.records.as_slice().as_bytes().to_vec()
    }

    fn describe(&self, level: usize) -> String {
        let mut out = format!(
            "{} @ 0x{:x} (0x{:x} bytes)",
            self.label,
            self.offset,
            self.size()
        );
        if level > 0 {
            for record in &self.records {
                out.push_str("\n  ");
                out.push_str(&record.describe());
            }
        }
        out
    }

    fn size(&self) -> u64 {
        (size_of::<T>() * self.records.len()) as u64
    }
}
